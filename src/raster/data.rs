//! Loaded raster state

use std::fmt;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::coordinate::{Crs, GeoTransform, Point};
use crate::errors::{FishnetError, FishnetResult};
use crate::extractor::Region;

use super::bands::{self, BandIndices};
use super::handle::DatasetHandle;

/// A loaded raster: display bitmap, geometry, geo metadata and the open
/// dataset it was read from
#[derive(Debug)]
pub struct RasterData {
    pub path: PathBuf,
    /// Display bitmap, always RGB8
    pub image: Option<RgbImage>,
    pub width: u32,
    pub height: u32,
    pub bands_count: usize,
    /// True only when a geo-transform was read
    pub is_geotiff: bool,
    pub is_sentinel: bool,
    pub crs: Option<Crs>,
    pub geo_transform: Option<GeoTransform>,
    pub band_names: Vec<String>,
    pub band_indices: BandIndices,
    /// Ordered key/value metadata
    pub metadata: Vec<(String, String)>,
    pub nodata: Option<f64>,
    /// Set only when loading failed
    pub error_message: Option<String>,
    handle: DatasetHandle,
}

impl RasterData {
    /// Empty state for `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        RasterData {
            path: path.as_ref().to_path_buf(),
            image: None,
            width: 0,
            height: 0,
            bands_count: 0,
            is_geotiff: false,
            is_sentinel: false,
            crs: None,
            geo_transform: None,
            band_names: Vec::new(),
            band_indices: BandIndices::plain_rgb(),
            metadata: Vec::new(),
            nodata: None,
            error_message: None,
            handle: DatasetHandle::none(),
        }
    }

    /// A failed load of `path`
    pub fn failed<P: AsRef<Path>>(path: P, message: String) -> Self {
        let mut raster = RasterData::new(path);
        raster.error_message = Some(message);
        raster
    }

    /// Sets the display bitmap and the matching dimensions
    pub fn set_image(&mut self, image: RgbImage) {
        self.width = image.width();
        self.height = image.height();
        self.image = Some(image);
    }

    /// Sets the band count with default names and the Sentinel flag
    pub fn set_bands_count(&mut self, count: usize) {
        self.bands_count = count;
        self.is_sentinel = bands::is_sentinel(count);
        self.band_names = (1..=count).map(bands::default_band_name).collect();
    }

    pub fn set_handle(&mut self, handle: DatasetHandle) {
        self.handle = handle;
    }

    pub fn handle(&self) -> &DatasetHandle {
        &self.handle
    }

    pub fn handle_mut(&mut self) -> &mut DatasetHandle {
        &mut self.handle
    }

    /// Closes the dataset handle; safe to call repeatedly
    pub fn close(&mut self) {
        self.handle.close();
    }

    pub fn is_loaded(&self) -> bool {
        self.image.is_some()
    }

    /// The display array backing `image`, as interleaved RGB bytes
    pub fn raw_array(&self) -> Option<&[u8]> {
        self.image.as_ref().map(|img| img.as_raw().as_slice())
    }

    /// Sets a metadata key, replacing an existing value in place
    pub fn set_metadata(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.metadata.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.metadata.push((key.to_string(), value)),
        }
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Source file stem, used to name exported files
    pub fn base_name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "raster".to_string())
    }

    /// Format name for display
    pub fn format_name(&self) -> String {
        self.metadata_value("format")
            .map(str::to_string)
            .or_else(|| self.path.extension().map(|e| e.to_string_lossy().to_uppercase()))
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Maps a pixel corner to world coordinates; identity without a transform
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> Point {
        match &self.geo_transform {
            Some(transform) => transform.apply(col, row),
            None => Point::new(col, row),
        }
    }

    /// Reads a raw window of 1-based bands through the dataset handle
    pub fn read_window(&mut self, bands: &[usize], region: &Region) -> FishnetResult<Vec<Vec<f64>>> {
        if !self.handle.is_open() {
            return Err(FishnetError::HandleClosed);
        }
        self.handle.read_window(bands, region)
    }
}

impl Drop for RasterData {
    fn drop(&mut self) {
        self.handle.close();
    }
}

impl fmt::Display for RasterData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Raster: {}", self.path.display())?;
        if let Some(message) = &self.error_message {
            return write!(f, "  Load failed: {}", message);
        }
        writeln!(f, "  Size: {}x{}", self.width, self.height)?;
        writeln!(f, "  Format: {}", self.format_name())?;
        writeln!(f, "  Bands: {}", self.bands_count)?;
        writeln!(f, "  GeoTIFF: {}", self.is_geotiff)?;
        if self.is_geotiff {
            writeln!(f, "  Sentinel-like: {}", self.is_sentinel)?;
            writeln!(f, "  Band combination: {}", self.band_indices)?;
        }
        if let Some(crs) = &self.crs {
            writeln!(f, "  CRS: {}", crs)?;
        }
        if let Some(transform) = &self.geo_transform {
            writeln!(f, "  Transform: {}", transform)?;
            writeln!(f, "  Extent: {}", transform.bounds(self.width, self.height))?;
        }
        if let Some(nodata) = self.nodata {
            writeln!(f, "  NoData: {}", nodata)?;
        }
        for (i, name) in self.band_names.iter().enumerate() {
            writeln!(f, "  Band {}: {}", i + 1, name)?;
        }
        for (key, value) in &self.metadata {
            writeln!(f, "  {}: {}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_reports_extent() {
        let mut raster = RasterData::new("scene.tif");
        raster.set_image(RgbImage::new(10, 5));
        raster.set_bands_count(3);
        raster.geo_transform = Some(GeoTransform::from_gdal([100.0, 1.0, 0.0, 200.0, 0.0, -2.0]));
        raster.is_geotiff = true;

        let text = raster.to_string();
        std::assert!(text.contains("Size: 10x5"));
        std::assert!(text.contains("Extent: [100.000000, 190.000000, 110.000000, 200.000000]"));
    }

    #[test]
    fn test_failed_load_description() {
        let raster = RasterData::failed("missing.tif", "File not found".to_string());
        std::assert!(raster.to_string().contains("Load failed: File not found"));
        std::assert!(!raster.is_loaded());
        std::assert!(raster.raw_array().is_none());
    }
}
