//! Optional backend availability
//!
//! Which loading and vector backends this build offers. The process-wide
//! value is computed once from the cargo features; tests build their own.

use std::fmt;

use lazy_static::lazy_static;

lazy_static! {
    static ref DETECTED: Capabilities = Capabilities::detect();
}

/// Availability of the optional backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Native GeoTIFF parser
    pub geo_backend_a: bool,
    /// `tiff` crate decoder
    pub geo_backend_b: bool,
    /// Shapefile output
    pub vector_libs: bool,
}

impl Capabilities {
    fn detect() -> Self {
        Capabilities {
            geo_backend_a: true,
            geo_backend_b: cfg!(feature = "tiff-decoder"),
            vector_libs: cfg!(feature = "vector"),
        }
    }

    /// The flags of the running build
    pub fn current() -> Self {
        *DETECTED
    }

    /// Only the plain image decoder
    pub fn plain_only() -> Self {
        Capabilities {
            geo_backend_a: false,
            geo_backend_b: false,
            vector_libs: false,
        }
    }

    /// Whether any geo-aware backend is enabled
    pub fn has_geo_backend(&self) -> bool {
        self.geo_backend_a || self.geo_backend_b
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::current()
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |on: bool| if on { "available" } else { "unavailable" };
        writeln!(f, "  Native GeoTIFF parser: {}", flag(self.geo_backend_a))?;
        writeln!(f, "  TIFF decoder: {}", flag(self.geo_backend_b))?;
        write!(f, "  Vector output: {}", flag(self.vector_libs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_matches_features() {
        let caps = Capabilities::current();
        std::assert!(caps.geo_backend_a);
        std::assert_eq!(caps.geo_backend_b, cfg!(feature = "tiff-decoder"));
        std::assert_eq!(caps.vector_libs, cfg!(feature = "vector"));
        std::assert_eq!(Capabilities::default(), caps);
    }

    #[test]
    fn test_plain_only() {
        std::assert!(!Capabilities::plain_only().has_geo_backend());
    }
}
