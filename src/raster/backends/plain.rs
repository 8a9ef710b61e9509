//! Plain image backend
//!
//! Decodes anything the `image` crate understands into an RGB bitmap with
//! no geo metadata and no dataset handle.

use std::path::Path;

use image::ImageReader;
use log::info;

use crate::config::DisplayOptions;
use crate::errors::{FishnetError, FishnetResult};
use crate::raster::bands::BandIndices;
use crate::raster::data::RasterData;

use super::RasterBackend;

pub const BACKEND_NAME: &str = "image decoder";

/// Backend C: plain bitmap decode
pub struct PlainBackend;

impl PlainBackend {
    fn load(path: &Path) -> FishnetResult<RasterData> {
        let reader = ImageReader::open(path)?.with_guessed_format()?;
        let format = reader.format()
            .map(|f| format!("{:?}", f).to_uppercase())
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let decoded = reader.decode()?;
        let mode = format!("{:?}", decoded.color());

        let mut raster = RasterData::new(path);
        raster.set_image(decoded.to_rgb8());
        raster.bands_count = 3;
        raster.is_sentinel = false;
        raster.band_names = vec!["Red".to_string(), "Green".to_string(), "Blue".to_string()];
        raster.band_indices = BandIndices::plain_rgb();
        raster.set_metadata("format", format);
        raster.set_metadata("mode", mode);
        raster.set_metadata("backend", BACKEND_NAME);
        raster.set_metadata("data_type", "uint8");

        info!("Loaded {} with {}: {}x{}", path.display(), BACKEND_NAME, raster.width, raster.height);
        Ok(raster)
    }
}

impl RasterBackend for PlainBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn try_load(&self, path: &Path, _display: &DisplayOptions) -> FishnetResult<RasterData> {
        Self::load(path).map_err(|e| FishnetError::Backend {
            backend: BACKEND_NAME.to_string(),
            message: e.to_string(),
        })
    }
}
