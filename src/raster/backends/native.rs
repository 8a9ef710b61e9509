//! Native GeoTIFF backend
//!
//! Parses the TIFF structure directly and decodes windows through the
//! strip and tile extractors.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, warn};

use crate::config::DisplayOptions;
use crate::errors::{FishnetError, FishnetResult};
use crate::extractor::{ImageExtractor, ImageLayout, Region};
use crate::raster::data::RasterData;
use crate::raster::handle::DatasetReader;
use crate::tiff::constants::tags;
use crate::tiff::{GeoKeyParser, SampleType, TiffReader};
use crate::utils::xml_utils::parse_gdal_metadata;

use super::{build_geo_raster, GeoInfo, RasterBackend};

pub const BACKEND_NAME: &str = "native GeoTIFF parser";

/// An open TIFF file positioned on its full-resolution image
pub struct NativeDataset {
    file: BufReader<File>,
    tiff_reader: TiffReader,
    layout: ImageLayout,
}

impl NativeDataset {
    /// Opens `path` and reads its layout and geo metadata
    pub fn open(path: &Path) -> FishnetResult<(Self, GeoInfo)> {
        let mut file = BufReader::new(File::open(path)?);
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.read(&mut file)?;
        let ifd = tiff.main_ifd()
            .ok_or(crate::tiff::TiffError::NoImageDirectory)?;
        debug!("{}", tiff);

        let layout = ImageLayout::from_ifd(&tiff_reader, &mut file, ifd)?;
        let transform = GeoKeyParser::read_geo_transform(&tiff_reader, &mut file, ifd)?;
        let crs = GeoKeyParser::read_crs(&tiff_reader, &mut file, ifd)?;
        let nodata = GeoKeyParser::read_nodata(&tiff_reader, &mut file, ifd)?;

        let mut band_descriptions = vec![None; layout.samples_per_pixel as usize];
        if ifd.has_tag(tags::GDAL_METADATA) {
            match tiff_reader.read_tag_ascii(&mut file, ifd, tags::GDAL_METADATA) {
                Ok(xml) => {
                    let metadata = parse_gdal_metadata(&xml);
                    for (band, slot) in band_descriptions.iter_mut().enumerate() {
                        *slot = metadata.band_description(band).map(str::to_string);
                    }
                }
                Err(e) => warn!("Unreadable GDAL metadata in {}: {}", path.display(), e),
            }
        }

        let info = GeoInfo {
            transform,
            crs,
            nodata,
            band_descriptions,
            format: "GTiff",
        };
        Ok((NativeDataset { file, tiff_reader, layout }, info))
    }

    pub fn layout(&self) -> &ImageLayout {
        &self.layout
    }
}

impl DatasetReader for NativeDataset {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn width(&self) -> u32 {
        self.layout.width
    }

    fn height(&self) -> u32 {
        self.layout.height
    }

    fn band_count(&self) -> usize {
        self.layout.samples_per_pixel as usize
    }

    fn sample_type(&self) -> SampleType {
        self.layout.sample_type
    }

    fn read_window(&mut self, bands: &[usize], region: &Region) -> FishnetResult<Vec<Vec<f64>>> {
        let handler = self.tiff_reader.handler()?;
        let samples: Vec<usize> = bands.iter().map(|b| b.saturating_sub(1)).collect();
        let extractor = ImageExtractor::new(&self.layout, handler);
        Ok(extractor.read_window(&mut self.file, &samples, region)?)
    }
}

/// Backend A: the crate's own GeoTIFF parser
pub struct NativeBackend;

impl RasterBackend for NativeBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn try_load(&self, path: &Path, display: &DisplayOptions) -> FishnetResult<RasterData> {
        let (dataset, info) = NativeDataset::open(path).map_err(|e| FishnetError::Backend {
            backend: BACKEND_NAME.to_string(),
            message: e.to_string(),
        })?;
        build_geo_raster(path, BACKEND_NAME, Box::new(dataset), info, display)
            .map_err(|e| FishnetError::Backend {
                backend: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })
    }
}
