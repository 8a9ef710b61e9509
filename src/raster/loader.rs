//! Raster loading with backend fallback
//!
//! TIFF paths go through the native parser, then the `tiff` crate decoder,
//! then the plain image decoder; every other path goes straight to the plain
//! decoder. The first backend that succeeds wins.

use std::fmt::Write as _;
use std::path::Path;

use log::{debug, error, warn};

use crate::capabilities::Capabilities;
use crate::compression::CompressionFactory;
use crate::config::DisplayOptions;
use crate::errors::{FishnetError, FishnetResult};

use super::backends::{NativeBackend, PlainBackend, RasterBackend};
#[cfg(feature = "tiff-decoder")]
use super::backends::DecoderBackend;
use super::data::RasterData;

/// Loads rasters through an ordered chain of backends
#[derive(Debug, Clone)]
pub struct RasterLoader {
    capabilities: Capabilities,
    display: DisplayOptions,
}

impl Default for RasterLoader {
    fn default() -> Self {
        RasterLoader::new(Capabilities::current())
    }
}

impl RasterLoader {
    pub fn new(capabilities: Capabilities) -> Self {
        RasterLoader {
            capabilities,
            display: DisplayOptions::default(),
        }
    }

    /// Uses a custom percentile window for display normalization
    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether `path` has a `.tif` or `.tiff` extension, in any case
    pub fn is_tiff_path(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
            .unwrap_or(false)
    }

    /// The backends tried for `path`, in order
    pub fn backend_chain(&self, path: &Path) -> Vec<Box<dyn RasterBackend>> {
        let mut chain: Vec<Box<dyn RasterBackend>> = Vec::new();
        if Self::is_tiff_path(path) {
            if self.capabilities.geo_backend_a {
                chain.push(Box::new(NativeBackend));
            }
            #[cfg(feature = "tiff-decoder")]
            {
                if self.capabilities.geo_backend_b {
                    chain.push(Box::new(DecoderBackend));
                }
            }
        }
        chain.push(Box::new(PlainBackend));
        chain
    }

    /// Loads `path`, reporting failure as an error
    pub fn try_load<P: AsRef<Path>>(&self, path: P) -> FishnetResult<RasterData> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FishnetError::FileNotFound(path.display().to_string()));
        }

        let mut last_error = None;
        for backend in self.backend_chain(path) {
            debug!("Trying {} for {}", backend.name(), path.display());
            match backend.try_load(path, &self.display) {
                Ok(raster) => return Ok(raster),
                Err(e) => {
                    warn!("{}", e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FishnetError::Generic(format!("No backend available for {}", path.display()))
        }))
    }

    /// Loads `path`
    ///
    /// Never fails outright: on error the returned raster carries the
    /// message in `error_message` and the flag is false.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> (RasterData, bool) {
        let path = path.as_ref();
        match self.try_load(path) {
            Ok(raster) => (raster, true),
            Err(e) => {
                error!("Failed to load {}: {}", path.display(), e);
                (RasterData::failed(path, e.to_string()), false)
            }
        }
    }

    /// Human-readable report of the build's loading and output support
    pub fn diagnostic_info(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(report, "fishnet-raster {}", env!("CARGO_PKG_VERSION"));
        let _ = writeln!(report, "Capabilities:");
        let _ = writeln!(report, "{}", self.capabilities);
        let geo = if self.capabilities.has_geo_backend() { "enabled" } else { "disabled" };
        let _ = writeln!(report, "Geo-referenced loading: {}", geo);

        let compressions: Vec<String> = CompressionFactory::get_available_handlers()
            .iter()
            .map(|h| format!("{} ({})", h.name(), h.code()))
            .collect();
        let _ = writeln!(report, "Native compressions: {}", compressions.join(", "));

        let chain: Vec<&str> = self.backend_chain(Path::new("probe.tif"))
            .iter()
            .map(|b| b.name())
            .collect();
        let _ = writeln!(report, "TIFF backend chain: {}", chain.join(" -> "));
        let _ = write!(
            report,
            "Display stretch: p{} - p{}",
            self.display.lower_percentile, self.display.upper_percentile
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiff_extension_detection() {
        std::assert!(RasterLoader::is_tiff_path(Path::new("a/b.TIF")));
        std::assert!(RasterLoader::is_tiff_path(Path::new("b.tiff")));
        std::assert!(!RasterLoader::is_tiff_path(Path::new("b.png")));
        std::assert!(!RasterLoader::is_tiff_path(Path::new("tif")));
    }

    #[test]
    fn test_chain_respects_capabilities() {
        let all = RasterLoader::new(Capabilities {
            geo_backend_a: true,
            geo_backend_b: true,
            vector_libs: true,
        });
        let expected = if cfg!(feature = "tiff-decoder") { 3 } else { 2 };
        std::assert_eq!(all.backend_chain(Path::new("x.tif")).len(), expected);
        std::assert_eq!(all.backend_chain(Path::new("x.jpg")).len(), 1);

        let plain = RasterLoader::new(Capabilities::plain_only());
        let chain = plain.backend_chain(Path::new("x.tif"));
        std::assert_eq!(chain.len(), 1);
        std::assert_eq!(chain[0].name(), "image decoder");
    }

    #[test]
    fn test_missing_file() {
        let (raster, ok) = RasterLoader::default().load("/definitely/not/here.tif");
        std::assert!(!ok);
        std::assert!(raster.image.is_none());
        let message = raster.error_message.clone().unwrap();
        std::assert!(message.starts_with("File not found"));
    }

    #[test]
    fn test_diagnostics_mention_backends() {
        let report = RasterLoader::default().diagnostic_info();
        std::assert!(report.contains("native GeoTIFF parser"));
        std::assert!(report.contains("Deflate"));
        std::assert!(report.contains("Geo-referenced loading: enabled"));

        let plain = RasterLoader::new(Capabilities::plain_only()).diagnostic_info();
        std::assert!(plain.contains("Geo-referenced loading: disabled"));
    }
}
