//! Raster loading backends
//!
//! Each backend is a strategy that either produces a complete
//! [`RasterData`] or an error describing why it could not. The loader tries
//! them in order.

mod native;
#[cfg(feature = "tiff-decoder")]
mod decoder;
mod plain;

pub use native::{NativeBackend, NativeDataset};
#[cfg(feature = "tiff-decoder")]
pub use decoder::{open_decoded, DecoderBackend};
pub use plain::PlainBackend;

use std::path::Path;

use log::{debug, info};

use crate::config::DisplayOptions;
use crate::coordinate::{Crs, GeoTransform};
use crate::errors::FishnetResult;
use crate::extractor::Region;

use super::bands::{self, default_band_name};
use super::data::RasterData;
use super::enhance::{enhance_with, RasterArray};
use super::handle::{DatasetHandle, DatasetReader};

/// A strategy for loading a raster from disk
pub trait RasterBackend {
    /// Name used in messages and in the `backend` metadata key
    fn name(&self) -> &'static str;

    /// Loads `path` or reports why it could not
    fn try_load(&self, path: &Path, display: &DisplayOptions) -> FishnetResult<RasterData>;
}

/// Geo metadata read alongside an opened dataset
#[derive(Debug, Clone, Default)]
pub struct GeoInfo {
    pub transform: Option<GeoTransform>,
    pub crs: Option<Crs>,
    pub nodata: Option<f64>,
    /// Band descriptions by 0-based band; missing or empty entries get
    /// default names
    pub band_descriptions: Vec<Option<String>>,
    pub format: &'static str,
}

impl GeoInfo {
    fn band_names(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                self.band_descriptions
                    .get(i)
                    .and_then(|d| d.as_deref())
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| default_band_name(i + 1))
            })
            .collect()
    }
}

/// Builds a raster from an opened geo-aware dataset
///
/// Selects the display bands, reads them in full, stretches them for
/// display and hands ownership of the dataset to the returned raster.
pub(crate) fn build_geo_raster(
    path: &Path,
    backend: &'static str,
    mut reader: Box<dyn DatasetReader>,
    info: GeoInfo,
    display: &DisplayOptions,
) -> FishnetResult<RasterData> {
    let (width, height) = (reader.width(), reader.height());
    let count = reader.band_count();
    let sample_type = reader.sample_type();

    let mut raster = RasterData::new(path);
    raster.set_bands_count(count);
    raster.band_names = info.band_names(count);
    raster.band_indices = bands::select_bands(&raster.band_names);
    raster.geo_transform = info.transform;
    raster.is_geotiff = info.transform.is_some();
    raster.crs = info.crs;
    raster.nodata = info.nodata;

    let [red, green, blue] = raster.band_indices.rgb();
    let mut unique = vec![red];
    for band in [green, blue] {
        if !unique.contains(&band) {
            unique.push(band);
        }
    }
    debug!("{}: reading display bands {:?} of {}", backend, unique, count);

    let windows = reader.read_window(&unique, &Region::new(0, 0, width, height))?;
    let position = |band: usize| unique.iter().position(|&b| b == band).unwrap_or(0);
    let (r, g, b) = (position(red), position(green), position(blue));

    let stacked = RasterArray::stack(
        width as usize,
        height as usize,
        &[&windows[r], &windows[g], &windows[b]],
    )?;
    let image = enhance_with(&stacked, display).into_rgb_image()?;
    raster.set_image(image);

    raster.set_metadata("format", info.format);
    raster.set_metadata("mode", "RGB");
    raster.set_metadata("band_combination", raster.band_indices.combination());
    raster.set_metadata("backend", backend);
    raster.set_metadata("data_type", sample_type.name());
    raster.set_handle(DatasetHandle::new(reader));

    info!(
        "Loaded {} with {}: {}x{}, {} bands, {}",
        path.display(), backend, width, height, count, raster.band_indices
    );
    Ok(raster)
}
