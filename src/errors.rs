//! Error types for loading, tiling and export

use std::fmt;
use std::io;

use crate::tiff::errors::TiffError;

/// Errors raised by the raster, vector and segmentation layers
#[derive(Debug)]
pub enum FishnetError {
    /// Input path does not exist
    FileNotFound(String),
    /// Grid rows or columns not positive
    InvalidGrid(usize, usize),
    /// Operation needs a loaded image
    NoImageLoaded,
    /// Operation needs a generated grid
    NoGridResult,
    /// A loading backend failed
    Backend { backend: String, message: String },
    /// Dataset handle used after close
    HandleClosed,
    /// Vector output disabled by the capability flags
    VectorUnavailable,
    /// Shapefile read or write failure
    Vector(String),
    /// Invalid configuration value
    Config(String),
    /// I/O error
    Io(io::Error),
    /// Error from the TIFF layer
    Tiff(TiffError),
    /// Error from the image codec
    Image(image::ImageError),
    /// Generic error with message
    Generic(String),
}

impl fmt::Display for FishnetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FishnetError::FileNotFound(path) => write!(f, "File not found: {}", path),
            FishnetError::InvalidGrid(rows, cols) => {
                write!(f, "Invalid grid {}x{}: rows and columns must be positive", rows, cols)
            }
            FishnetError::NoImageLoaded => write!(f, "No image loaded"),
            FishnetError::NoGridResult => write!(f, "No grid result; generate the grid first"),
            FishnetError::Backend { backend, message } => write!(f, "{} failed: {}", backend, message),
            FishnetError::HandleClosed => write!(f, "Dataset handle closed"),
            FishnetError::VectorUnavailable => write!(f, "Vector output is not available in this build"),
            FishnetError::Vector(msg) => write!(f, "Vector error: {}", msg),
            FishnetError::Config(msg) => write!(f, "Configuration error: {}", msg),
            FishnetError::Io(e) => write!(f, "I/O error: {}", e),
            FishnetError::Tiff(e) => write!(f, "{}", e),
            FishnetError::Image(e) => write!(f, "Image error: {}", e),
            FishnetError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FishnetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FishnetError::Io(e) => Some(e),
            FishnetError::Tiff(e) => Some(e),
            FishnetError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FishnetError {
    fn from(error: io::Error) -> Self {
        FishnetError::Io(error)
    }
}

impl From<TiffError> for FishnetError {
    fn from(error: TiffError) -> Self {
        FishnetError::Tiff(error)
    }
}

impl From<image::ImageError> for FishnetError {
    fn from(error: image::ImageError) -> Self {
        FishnetError::Image(error)
    }
}

impl From<String> for FishnetError {
    fn from(msg: String) -> Self {
        FishnetError::Generic(msg)
    }
}

/// Result type for fishnet operations
pub type FishnetResult<T> = Result<T, FishnetError>;
