//! GeoTIFF output for raw band windows
//!
//! Writes little-endian, deflate-compressed, single-strip GeoTIFFs that keep
//! the source sample type, geo-reference, nodata value and band names.

use std::path::Path;

use log::debug;

use crate::compression::AdobeDeflateHandler;
use crate::coordinate::{Crs, GeoTransform};
use crate::errors::{FishnetError, FishnetResult};
use crate::tiff::{TiffBuilder, SampleType, IFD};
use crate::utils::xml_utils::GdalMetadata;

use super::bands::default_band_name;

/// Raw samples of a window, one row-major buffer per band
#[derive(Debug, Clone)]
pub struct RasterWindow {
    pub width: u32,
    pub height: u32,
    pub sample_type: SampleType,
    pub bands: Vec<Vec<f64>>,
}

impl RasterWindow {
    /// Pixel-interleaved little-endian sample bytes
    fn interleaved_bytes(&self) -> FishnetResult<Vec<u8>> {
        let pixels = self.width as usize * self.height as usize;
        if self.bands.is_empty() || self.bands.iter().any(|b| b.len() != pixels) {
            return Err(FishnetError::Generic(format!(
                "Window bands do not match {}x{}", self.width, self.height
            )));
        }

        let mut bytes = Vec::with_capacity(pixels * self.bands.len() * self.sample_type.bytes());
        for i in 0..pixels {
            for band in &self.bands {
                self.sample_type.encode_le(band[i], &mut bytes);
            }
        }
        Ok(bytes)
    }
}

/// Geo-reference written alongside a window
#[derive(Debug, Clone, Default)]
pub struct GeoReference<'a> {
    pub transform: Option<GeoTransform>,
    pub crs: Option<&'a Crs>,
    pub nodata: Option<f64>,
    /// Names of the written bands, in output order
    pub band_names: &'a [String],
}

/// Writes `window` as a GeoTIFF at `path`
pub fn write_geotiff(path: &Path, window: &RasterWindow, geo: &GeoReference) -> FishnetResult<()> {
    let pixels = window.interleaved_bytes()?;

    let mut builder = TiffBuilder::new(false);
    let idx = builder.add_ifd(IFD::new(0, 0));
    builder.add_image_structure(idx, window.width, window.height, window.sample_type, window.bands.len() as u16)?;
    builder.setup_single_strip(idx, window.height, &pixels, &AdobeDeflateHandler)?;

    if let Some(transform) = &geo.transform {
        builder.add_geo_transform(idx, transform)?;
    }
    if let Some(crs) = geo.crs {
        builder.add_crs(idx, crs)?;
    }
    if let Some(nodata) = geo.nodata {
        builder.add_nodata_tag(idx, nodata)?;
    }

    let mut metadata = GdalMetadata::default();
    for (i, name) in geo.band_names.iter().enumerate().take(window.bands.len()) {
        if *name != default_band_name(i + 1) {
            metadata.band_descriptions.insert(i, name.clone());
        }
    }
    if !metadata.is_empty() {
        builder.add_gdal_metadata(idx, &metadata)?;
    }
    builder.add_software(idx, concat!("fishnet-raster ", env!("CARGO_PKG_VERSION")))?;

    builder.write(path)?;
    debug!(
        "Wrote {}x{} x {} {} GeoTIFF to {}",
        window.width, window.height, window.bands.len(), window.sample_type, path.display()
    );
    Ok(())
}
