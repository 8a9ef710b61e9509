//! TIFF builder strategy modules
//!
//! This module contains strategy implementations for the TiffBuilder,
//! organized by functionality category.

use std::collections::BTreeMap;

use crate::tiff::ifd::{IFD, IFDEntry};

pub mod basic_tags;
pub mod geo_tags;
pub mod metadata_tags;
pub mod writer;

/// Out-of-line tag payloads keyed by (IFD index, tag)
pub type ExternalData = BTreeMap<(usize, u16), Vec<u8>>;

/// Strip payloads keyed by IFD index
pub type ImageData = BTreeMap<usize, Vec<u8>>;

/// Stores little-endian tag bytes, inline when they fit the 4-byte slot
///
/// Inline values are packed into `value_offset` so the writer emits the
/// original byte sequence; larger payloads go to `external_data` and get
/// their offset assigned at write time.
pub(crate) fn set_tag_data(
    ifd: &mut IFD,
    external_data: &mut ExternalData,
    ifd_index: usize,
    tag: u16,
    field_type: u16,
    count: u64,
    bytes: Vec<u8>,
) {
    if bytes.len() <= 4 {
        let mut slot = [0u8; 4];
        slot[..bytes.len()].copy_from_slice(&bytes);
        external_data.remove(&(ifd_index, tag));
        ifd.add_entry(IFDEntry::new(tag, field_type, count, u32::from_le_bytes(slot) as u64));
    } else {
        ifd.add_entry(IFDEntry::new(tag, field_type, count, 0));
        external_data.insert((ifd_index, tag), bytes);
    }
}

/// Encodes SHORT values little-endian
pub(crate) fn shorts_le(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Encodes DOUBLE values little-endian
pub(crate) fn doubles_le(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Encodes an ASCII value with its NUL terminator
pub(crate) fn ascii_z(text: &str) -> Vec<u8> {
    let mut bytes = text.as_bytes().to_vec();
    bytes.push(0);
    bytes
}
