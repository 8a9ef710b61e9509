//! Pixel sample types
//!
//! Maps the SampleFormat/BitsPerSample tag pair onto a closed set of sample
//! types and converts between raw sample bytes and `f64` values.

use std::fmt;

use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::sample_format;
use crate::tiff::errors::{TiffError, TiffResult};

/// Numeric type of one pixel sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Resolves the sample type from SampleFormat and BitsPerSample
    pub fn from_tiff(format: u16, bits: u16) -> TiffResult<Self> {
        match (format, bits) {
            (sample_format::UNSIGNED, 8) => Ok(SampleType::U8),
            (sample_format::SIGNED, 8) => Ok(SampleType::I8),
            (sample_format::UNSIGNED, 16) => Ok(SampleType::U16),
            (sample_format::SIGNED, 16) => Ok(SampleType::I16),
            (sample_format::UNSIGNED, 32) => Ok(SampleType::U32),
            (sample_format::SIGNED, 32) => Ok(SampleType::I32),
            (sample_format::IEEEFP, 32) => Ok(SampleType::F32),
            (sample_format::IEEEFP, 64) => Ok(SampleType::F64),
            _ => Err(TiffError::UnsupportedSampleLayout(format, bits)),
        }
    }

    /// Bits per sample
    pub fn bits(&self) -> u16 {
        (self.bytes() * 8) as u16
    }

    /// Bytes per sample
    pub fn bytes(&self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// Value of the SampleFormat tag
    pub fn sample_format(&self) -> u16 {
        match self {
            SampleType::U8 | SampleType::U16 | SampleType::U32 => sample_format::UNSIGNED,
            SampleType::I8 | SampleType::I16 | SampleType::I32 => sample_format::SIGNED,
            SampleType::F32 | SampleType::F64 => sample_format::IEEEFP,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    /// Lower-case type name, as recorded in raster metadata
    pub fn name(&self) -> &'static str {
        match self {
            SampleType::U8 => "uint8",
            SampleType::I8 => "int8",
            SampleType::U16 => "uint16",
            SampleType::I16 => "int16",
            SampleType::U32 => "uint32",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        }
    }

    /// Decodes one sample from its raw bytes in file byte order
    pub fn decode(&self, bytes: &[u8], handler: &dyn ByteOrderHandler) -> f64 {
        let raw = handler.get_uint(bytes, self.bytes());
        match self {
            SampleType::U8 | SampleType::U16 | SampleType::U32 => raw as f64,
            SampleType::I8 => raw as u8 as i8 as f64,
            SampleType::I16 => raw as u16 as i16 as f64,
            SampleType::I32 => raw as u32 as i32 as f64,
            SampleType::F32 => f32::from_bits(raw as u32) as f64,
            SampleType::F64 => f64::from_bits(raw),
        }
    }

    /// Appends one sample in little-endian order
    ///
    /// Integer targets round and saturate to the type's range.
    pub fn encode_le(&self, value: f64, out: &mut Vec<u8>) {
        match self {
            SampleType::U8 => out.push(saturate(value, 0.0, u8::MAX as f64) as u8),
            SampleType::I8 => out.push(saturate(value, i8::MIN as f64, i8::MAX as f64) as i8 as u8),
            SampleType::U16 => out.extend_from_slice(
                &(saturate(value, 0.0, u16::MAX as f64) as u16).to_le_bytes()),
            SampleType::I16 => out.extend_from_slice(
                &(saturate(value, i16::MIN as f64, i16::MAX as f64) as i16).to_le_bytes()),
            SampleType::U32 => out.extend_from_slice(
                &(saturate(value, 0.0, u32::MAX as f64) as u32).to_le_bytes()),
            SampleType::I32 => out.extend_from_slice(
                &(saturate(value, i32::MIN as f64, i32::MAX as f64) as i32).to_le_bytes()),
            SampleType::F32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
            SampleType::F64 => out.extend_from_slice(&value.to_le_bytes()),
        }
    }
}

fn saturate(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.round().clamp(min, max)
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
