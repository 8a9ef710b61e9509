use std::io::Cursor;
use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

/// Creates a little-endian TIFF buffer with a single two-entry IFD
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    // TIFF header (little-endian)
    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II for little-endian
    buffer.write_u16::<LittleEndian>(42).unwrap();     // TIFF magic number
    buffer.write_u32::<LittleEndian>(8).unwrap();      // IFD offset

    buffer.write_u16::<LittleEndian>(2).unwrap();      // Entry count

    // ImageWidth, LONG
    buffer.write_u16::<LittleEndian>(256).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(800).unwrap();

    // ImageLength, LONG
    buffer.write_u16::<LittleEndian>(257).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(600).unwrap();

    buffer.write_u32::<LittleEndian>(0).unwrap();      // No next IFD

    Cursor::new(buffer)
}

/// Creates a little-endian BigTIFF buffer with a single two-entry IFD
pub fn create_test_bigtiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    buffer.write_u16::<LittleEndian>(0x4949).unwrap();
    buffer.write_u16::<LittleEndian>(43).unwrap();     // BigTIFF version
    buffer.write_u16::<LittleEndian>(8).unwrap();      // Offset size
    buffer.write_u16::<LittleEndian>(0).unwrap();      // Reserved
    buffer.write_u64::<LittleEndian>(16).unwrap();     // IFD offset

    buffer.write_u64::<LittleEndian>(2).unwrap();

    buffer.write_u16::<LittleEndian>(256).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(1024).unwrap();

    buffer.write_u16::<LittleEndian>(257).unwrap();
    buffer.write_u16::<LittleEndian>(4).unwrap();
    buffer.write_u64::<LittleEndian>(1).unwrap();
    buffer.write_u64::<LittleEndian>(768).unwrap();

    buffer.write_u64::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}

/// Creates a big-endian TIFF whose IFD holds inline SHORT pairs, an
/// external DOUBLE triple and an external ASCII string
///
/// Layout: header (8), IFD at 8 with 4 entries (2 + 48 + 4 = 54 bytes),
/// doubles at 62, ASCII at 86.
pub fn create_big_endian_geo_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    buffer.write_u16::<BigEndian>(0x4D4D).unwrap();
    buffer.write_u16::<BigEndian>(42).unwrap();
    buffer.write_u32::<BigEndian>(8).unwrap();

    buffer.write_u16::<BigEndian>(4).unwrap();

    // BitsPerSample: two SHORTs stored inline
    buffer.write_u16::<BigEndian>(258).unwrap();
    buffer.write_u16::<BigEndian>(3).unwrap();
    buffer.write_u32::<BigEndian>(2).unwrap();
    buffer.write_u16::<BigEndian>(16).unwrap();
    buffer.write_u16::<BigEndian>(8).unwrap();

    // SamplesPerPixel: one SHORT, left-justified in the slot
    buffer.write_u16::<BigEndian>(277).unwrap();
    buffer.write_u16::<BigEndian>(3).unwrap();
    buffer.write_u32::<BigEndian>(1).unwrap();
    buffer.write_u16::<BigEndian>(2).unwrap();
    buffer.write_u16::<BigEndian>(0).unwrap();

    // ModelPixelScale: three DOUBLEs at offset 62
    buffer.write_u16::<BigEndian>(33550).unwrap();
    buffer.write_u16::<BigEndian>(12).unwrap();
    buffer.write_u32::<BigEndian>(3).unwrap();
    buffer.write_u32::<BigEndian>(62).unwrap();

    // GDAL_NODATA: ASCII "-9999\0" at offset 86
    buffer.write_u16::<BigEndian>(42113).unwrap();
    buffer.write_u16::<BigEndian>(2).unwrap();
    buffer.write_u32::<BigEndian>(6).unwrap();
    buffer.write_u32::<BigEndian>(86).unwrap();

    buffer.write_u32::<BigEndian>(0).unwrap();

    std::assert_eq!(buffer.len(), 62);
    for v in [10.0f64, 20.0, 0.0] {
        let mut bytes = [0u8; 8];
        BigEndian::write_f64(&mut bytes, v);
        buffer.extend_from_slice(&bytes);
    }
    buffer.extend_from_slice(b"-9999\0");

    Cursor::new(buffer)
}
