//! TIFF file format module
//!
//! This module provides structures and functions for reading TIFF and
//! BigTIFF directories and for writing single-strip GeoTIFF files.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub mod sample;
pub mod builder;
mod builders;
pub(crate) mod constants;
pub mod geo_key_parser;
#[cfg(test)]
mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{TiffError, TiffResult};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use sample::SampleType;
pub use types::TIFF;
pub use geo_key_parser::{GeoKeyEntry, GeoKeyParser};
pub use builder::TiffBuilder;
