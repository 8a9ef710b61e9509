//! Tests for the byte order module

extern crate std;

use std::io::Cursor;
use byteorder::{LittleEndian, BigEndian, WriteBytesExt};
use crate::io::byte_order::{ByteOrder, ByteOrderHandler, LittleEndianHandler, BigEndianHandler};

#[test]
fn test_byte_order_detection() {
    let mut le = Cursor::new(vec![0x49, 0x49]);
    std::assert_eq!(ByteOrder::detect(&mut le).unwrap(), ByteOrder::LittleEndian);

    let mut be = Cursor::new(vec![0x4D, 0x4D]);
    std::assert_eq!(ByteOrder::detect(&mut be).unwrap(), ByteOrder::BigEndian);
}

#[test]
fn test_byte_order_detection_invalid() {
    let mut buffer = Vec::new();
    buffer.write_u16::<LittleEndian>(0x1234).unwrap();
    let mut cursor = Cursor::new(buffer);

    std::assert!(ByteOrder::detect(&mut cursor).is_err());
}

#[test]
fn test_stream_reads() {
    let mut buffer = Vec::new();
    buffer.write_u16::<BigEndian>(0x1234).unwrap();
    buffer.write_u32::<BigEndian>(0x12345678).unwrap();
    buffer.write_f64::<BigEndian>(2.5).unwrap();
    let mut cursor = Cursor::new(buffer);

    let handler = BigEndianHandler;
    std::assert_eq!(handler.read_u16(&mut cursor).unwrap(), 0x1234);
    std::assert_eq!(handler.read_u32(&mut cursor).unwrap(), 0x12345678);
    std::assert_eq!(handler.read_f64(&mut cursor).unwrap(), 2.5);
}

#[test]
fn test_buffer_uint_access() {
    let bytes = [0x01, 0x02, 0x03, 0x04];
    std::assert_eq!(LittleEndianHandler.get_uint(&bytes, 2), 0x0201);
    std::assert_eq!(BigEndianHandler.get_uint(&bytes, 2), 0x0102);
    std::assert_eq!(BigEndianHandler.get_uint(&bytes, 4), 0x01020304);

    let mut out = [0u8; 4];
    LittleEndianHandler.put_uint(&mut out, 0xAABB, 2);
    std::assert_eq!(&out[..2], &[0xBB, 0xAA]);
}

#[test]
fn test_inline_bytes_restore_slot_order() {
    // A big-endian slot holding SHORTs 16 and 8, as decoded by the entry reader
    let slot_value = 0x0010_0008u64;
    std::assert_eq!(BigEndianHandler.inline_bytes(slot_value, false), vec![0x00, 0x10, 0x00, 0x08]);

    let le_value = 0x0008_0010u64;
    std::assert_eq!(LittleEndianHandler.inline_bytes(le_value, false), vec![0x10, 0x00, 0x08, 0x00]);
    std::assert_eq!(LittleEndianHandler.inline_bytes(le_value, true).len(), 8);
}
