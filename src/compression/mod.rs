//! Compression handling for TIFF files
//!
//! This module implements strategies for the compression methods the native
//! GeoTIFF reader decodes and the tile writer encodes.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;
mod packbits;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use zstd::ZstdHandler;
pub use packbits::PackBitsHandler;
