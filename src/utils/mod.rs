//! Utility modules for common functionality
//!
//! Logging, progress reporting and small helpers shared by the TIFF layer.

pub mod logger;
pub mod progress;
pub(crate) mod string_utils;
pub(crate) mod xml_utils;
