//! Factory for creating compression handlers

use crate::tiff::constants::compression;
use crate::tiff::errors::{TiffError, TiffResult};
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::AdobeDeflateHandler;
use super::packbits::PackBitsHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for the given TIFF compression code
    pub fn create_handler(code: u16) -> TiffResult<Box<dyn CompressionHandler>> {
        match code {
            compression::NONE => Ok(Box::new(UncompressedHandler)),
            compression::DEFLATE | compression::OLD_DEFLATE => Ok(Box::new(AdobeDeflateHandler)),
            compression::ZSTD => Ok(Box::new(ZstdHandler::new())),
            compression::PACKBITS => Ok(Box::new(PackBitsHandler)),
            _ => Err(TiffError::UnsupportedCompression(code as u64)),
        }
    }

    /// Get a handler by name
    pub fn get_handler_by_name(name: &str) -> TiffResult<Box<dyn CompressionHandler>> {
        match name.to_lowercase().as_str() {
            "none" | "uncompressed" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" => Ok(Box::new(AdobeDeflateHandler)),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            "packbits" => Ok(Box::new(PackBitsHandler)),
            _ => Err(TiffError::GenericError(format!("Unknown compression type: {}", name))),
        }
    }

    /// Get all available compression handlers
    pub fn get_available_handlers() -> Vec<Box<dyn CompressionHandler>> {
        vec![
            Box::new(UncompressedHandler),
            Box::new(AdobeDeflateHandler),
            Box::new(ZstdHandler::new()),
            Box::new(PackBitsHandler),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_to_handlers() {
        std::assert_eq!(CompressionFactory::create_handler(8).unwrap().name(), "Deflate");
        std::assert_eq!(CompressionFactory::create_handler(32946).unwrap().name(), "Deflate");
        std::assert_eq!(CompressionFactory::create_handler(32773).unwrap().code(), 32773);
        std::assert!(matches!(
            CompressionFactory::create_handler(5),
            Err(TiffError::UnsupportedCompression(5))
        ));
    }

    #[test]
    fn test_lookup_by_name() {
        std::assert_eq!(CompressionFactory::get_handler_by_name("ZIP").unwrap().code(), 8);
        std::assert!(CompressionFactory::get_handler_by_name("lzw").is_err());
    }
}
