//! Tests for the TIFF directory reader

extern crate std;

use std::io::Cursor;

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::tags;
use crate::tiff::errors::TiffError;
use crate::tiff::geo_key_parser::GeoKeyParser;
use crate::tiff::reader::TiffReader;

use super::test_utils::{create_big_endian_geo_buffer, create_test_bigtiff_buffer, create_test_tiff_buffer};

#[test]
fn test_read_classic_tiff() {
    let mut cursor = create_test_tiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    std::assert!(!tiff.is_big_tiff);
    std::assert_eq!(tiff.byte_order, ByteOrder::LittleEndian);
    std::assert_eq!(tiff.ifd_count(), 1);

    let ifd = tiff.main_ifd().unwrap();
    std::assert_eq!(reader.read_tag_u64(&mut cursor, ifd, tags::IMAGE_WIDTH).unwrap(), Some(800));
    std::assert_eq!(reader.read_tag_u64(&mut cursor, ifd, tags::IMAGE_LENGTH).unwrap(), Some(600));
    std::assert_eq!(reader.read_tag_u64(&mut cursor, ifd, tags::COMPRESSION).unwrap(), None);
}

#[test]
fn test_read_bigtiff() {
    let mut cursor = create_test_bigtiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();

    std::assert!(tiff.is_big_tiff);
    std::assert!(reader.is_big_tiff());
    let ifd = tiff.main_ifd().unwrap();
    std::assert_eq!(reader.read_tag_u64(&mut cursor, ifd, tags::IMAGE_WIDTH).unwrap(), Some(1024));
}

#[test]
fn test_big_endian_inline_shorts() {
    let mut cursor = create_big_endian_geo_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    std::assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::BITS_PER_SAMPLE).unwrap(), vec![16, 8]);
    std::assert_eq!(reader.read_tag_u64(&mut cursor, ifd, tags::SAMPLES_PER_PIXEL).unwrap(), Some(2));
}

#[test]
fn test_external_doubles_and_ascii() {
    let mut cursor = create_big_endian_geo_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    std::assert_eq!(
        reader.read_tag_doubles(&mut cursor, ifd, tags::MODEL_PIXEL_SCALE_TAG).unwrap(),
        vec![10.0, 20.0, 0.0]
    );
    std::assert_eq!(reader.read_tag_ascii(&mut cursor, ifd, tags::GDAL_NODATA).unwrap(), "-9999");
    std::assert_eq!(GeoKeyParser::read_nodata(&reader, &mut cursor, ifd).unwrap(), Some(-9999.0));
}

#[test]
fn test_missing_tag_is_reported() {
    let mut cursor = create_test_tiff_buffer();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut cursor).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    std::assert!(matches!(
        reader.read_tag_values(&mut cursor, ifd, tags::STRIP_OFFSETS),
        Err(TiffError::TagNotFound(273))
    ));
}

#[test]
fn test_rejects_non_tiff_data() {
    let mut png_magic = Cursor::new(vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    std::assert!(matches!(
        TiffReader::new().read(&mut png_magic),
        Err(TiffError::InvalidByteOrder(_))
    ));

    let mut bad_version = Cursor::new(vec![0x49, 0x49, 41, 0, 8, 0, 0, 0]);
    std::assert!(matches!(
        TiffReader::new().read(&mut bad_version),
        Err(TiffError::UnsupportedVersion(41))
    ));
}

#[test]
fn test_ifd_offset_past_end() {
    let mut cursor = Cursor::new(vec![0x49, 0x49, 42, 0, 0xFF, 0, 0, 0]);
    std::assert!(TiffReader::new().read(&mut cursor).is_err());
}
