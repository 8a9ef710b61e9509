//! Handler for PackBits run-length encoded data

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

/// PackBits compression handler (compression code 32773)
///
/// Each run starts with a signed header byte `n`: `0..=127` copies the next
/// `n + 1` bytes literally, `-127..=-1` repeats the next byte `1 - n` times
/// and `-128` is a no-op.
pub struct PackBitsHandler;

impl PackBitsHandler {
    const MAX_RUN: usize = 128;

    fn flush_literal(out: &mut Vec<u8>, literal: &mut Vec<u8>) {
        if !literal.is_empty() {
            out.push((literal.len() - 1) as u8);
            out.extend_from_slice(literal);
            literal.clear();
        }
    }
}

impl CompressionHandler for PackBitsHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() * 2);
        let mut i = 0;

        while i < data.len() {
            let n = data[i] as i8;
            i += 1;

            if n >= 0 {
                let len = n as usize + 1;
                let end = i + len;
                if end > data.len() {
                    return Err(TiffError::GenericError(
                        "PackBits literal run exceeds input".to_string()));
                }
                out.extend_from_slice(&data[i..end]);
                i = end;
            } else if n != -128 {
                let value = *data.get(i).ok_or_else(|| {
                    TiffError::GenericError("PackBits repeat run missing value".to_string())
                })?;
                let count = 1 - n as isize;
                out.extend(std::iter::repeat(value).take(count as usize));
                i += 1;
            }
        }

        Ok(out)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 1);
        let mut literal = Vec::with_capacity(Self::MAX_RUN);
        let mut i = 0;

        while i < data.len() {
            let mut run = 1;
            while i + run < data.len() && data[i + run] == data[i] && run < Self::MAX_RUN {
                run += 1;
            }

            if run >= 3 {
                Self::flush_literal(&mut out, &mut literal);
                out.push((1 - run as isize) as i8 as u8);
                out.push(data[i]);
                i += run;
            } else {
                literal.push(data[i]);
                i += 1;
                if literal.len() == Self::MAX_RUN {
                    Self::flush_literal(&mut out, &mut literal);
                }
            }
        }

        Self::flush_literal(&mut out, &mut literal);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u16 {
        compression::PACKBITS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_reference_sequence() {
        // Sample sequence from the TIFF 6.0 PackBits section
        let packed = [
            0xFE, 0xAA, 0x02, 0x80, 0x00, 0x2A, 0xFD, 0xAA, 0x03, 0x80, 0x00, 0x2A, 0x22,
            0xF7, 0xAA,
        ];
        let expected = [
            0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A, 0xAA, 0xAA, 0xAA, 0xAA, 0x80, 0x00, 0x2A,
            0x22, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA, 0xAA,
        ];
        std::assert_eq!(PackBitsHandler.decompress(&packed).unwrap(), expected.to_vec());
    }

    #[test]
    fn test_long_runs_are_split() {
        let data = vec![7u8; 300];
        let packed = PackBitsHandler.compress(&data).unwrap();
        std::assert!(packed.len() < 10);
        std::assert_eq!(PackBitsHandler.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_truncated_literal_is_error() {
        std::assert!(PackBitsHandler.decompress(&[0x05, 1, 2]).is_err());
    }
}
