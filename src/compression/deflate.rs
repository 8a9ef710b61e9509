//! Handler for Adobe Deflate compressed data

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;

/// Adobe Deflate (zlib) compression handler
///
/// Also used for the legacy code 32946, which carries the same stream.
pub struct AdobeDeflateHandler;

impl CompressionHandler for AdobeDeflateHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed = Vec::with_capacity(data.len() * 4);
        decoder.read_to_end(&mut decompressed)
            .map_err(|e| TiffError::GenericError(format!("Deflate decompression error: {}", e)))?;
        Ok(decompressed)
    }

    fn compress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &'static str {
        "Deflate"
    }

    fn code(&self) -> u16 {
        compression::DEFLATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_restores_input() {
        let handler = AdobeDeflateHandler;
        let data: Vec<u8> = (0..4096u32).map(|i| (i % 7) as u8).collect();
        let compressed = handler.compress(&data).unwrap();
        std::assert!(compressed.len() < data.len());
        std::assert_eq!(handler.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_deflate_rejects_garbage() {
        let handler = AdobeDeflateHandler;
        std::assert!(handler.decompress(&[0xde, 0xad, 0xbe, 0xef]).is_err());
    }
}
