//! `tiff` crate decoder backend
//!
//! Covers the compressions and predictors the native parser does not (LZW,
//! JPEG, floating-point predictor) by decoding the whole image up front.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, warn};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::config::DisplayOptions;
use crate::coordinate::GeoTransform;
use crate::errors::{FishnetError, FishnetResult};
use crate::raster::data::RasterData;
use crate::raster::handle::MemoryDataset;
use crate::tiff::constants::tags;
use crate::tiff::geo_key_parser::parse_nodata;
use crate::tiff::{GeoKeyParser, SampleType};
use crate::utils::xml_utils::parse_gdal_metadata;

use super::{build_geo_raster, GeoInfo, RasterBackend};

pub const BACKEND_NAME: &str = "TIFF decoder";

type FileDecoder = Decoder<BufReader<File>>;

fn decoder_error(e: tiff::TiffError) -> FishnetError {
    FishnetError::Backend {
        backend: BACKEND_NAME.to_string(),
        message: e.to_string(),
    }
}

fn find_doubles(decoder: &mut FileDecoder, tag: u16) -> FishnetResult<Option<Vec<f64>>> {
    decoder
        .find_tag(Tag::from_u16_exhaustive(tag))
        .map_err(decoder_error)?
        .map(|v| v.into_f64_vec().map_err(decoder_error))
        .transpose()
}

fn find_string(decoder: &mut FileDecoder, tag: u16) -> FishnetResult<Option<String>> {
    decoder
        .find_tag(Tag::from_u16_exhaustive(tag))
        .map_err(decoder_error)?
        .map(|v| v.into_string().map_err(decoder_error))
        .transpose()
        .map(|s| s.map(|s| s.trim_end_matches('\0').to_string()))
}

fn read_transform(decoder: &mut FileDecoder) -> FishnetResult<Option<GeoTransform>> {
    if let Some(matrix) = find_doubles(decoder, tags::MODEL_TRANSFORMATION_TAG)? {
        if let Some(transform) = GeoTransform::from_model_transformation(&matrix) {
            return Ok(Some(transform));
        }
        warn!("ModelTransformation tag holds {} values, expected 16", matrix.len());
    }

    let scale = find_doubles(decoder, tags::MODEL_PIXEL_SCALE_TAG)?;
    let tiepoint = find_doubles(decoder, tags::MODEL_TIEPOINT_TAG)?;
    Ok(match (scale, tiepoint) {
        (Some(scale), Some(tiepoint)) => GeoTransform::from_scale_tiepoint(&scale, &tiepoint),
        _ => None,
    })
}

fn read_geo_info(decoder: &mut FileDecoder, bands: usize) -> FishnetResult<GeoInfo> {
    let transform = read_transform(decoder)?;

    let directory = decoder
        .find_tag(Tag::from_u16_exhaustive(tags::GEO_KEY_DIRECTORY_TAG))
        .map_err(decoder_error)?
        .map(|v| v.into_u16_vec().map_err(decoder_error))
        .transpose()?;
    let crs = match directory {
        Some(directory) => {
            let doubles = find_doubles(decoder, tags::GEO_DOUBLE_PARAMS_TAG)?.unwrap_or_default();
            let ascii = find_string(decoder, tags::GEO_ASCII_PARAMS_TAG)?.unwrap_or_default();
            Some(GeoKeyParser::crs_from_parts(directory, doubles, ascii))
        }
        None => None,
    };

    let nodata = find_string(decoder, tags::GDAL_NODATA)?.and_then(|s| parse_nodata(&s));

    let mut band_descriptions = vec![None; bands];
    if let Some(xml) = find_string(decoder, tags::GDAL_METADATA)? {
        let metadata = parse_gdal_metadata(&xml);
        for (band, slot) in band_descriptions.iter_mut().enumerate() {
            *slot = metadata.band_description(band).map(str::to_string);
        }
    }

    Ok(GeoInfo {
        transform,
        crs,
        nodata,
        band_descriptions,
        format: "GTiff",
    })
}

fn into_samples(result: DecodingResult) -> (SampleType, Vec<f64>) {
    match result {
        DecodingResult::U8(d) => (SampleType::U8, d.into_iter().map(f64::from).collect()),
        DecodingResult::I8(d) => (SampleType::I8, d.into_iter().map(f64::from).collect()),
        DecodingResult::U16(d) => (SampleType::U16, d.into_iter().map(f64::from).collect()),
        DecodingResult::I16(d) => (SampleType::I16, d.into_iter().map(f64::from).collect()),
        DecodingResult::U32(d) => (SampleType::U32, d.into_iter().map(f64::from).collect()),
        DecodingResult::I32(d) => (SampleType::I32, d.into_iter().map(f64::from).collect()),
        DecodingResult::F32(d) => (SampleType::F32, d.into_iter().map(f64::from).collect()),
        DecodingResult::F64(d) => (SampleType::F64, d),
        // 64-bit integers are widened to doubles
        DecodingResult::U64(d) => (SampleType::F64, d.into_iter().map(|v| v as f64).collect()),
        DecodingResult::I64(d) => (SampleType::F64, d.into_iter().map(|v| v as f64).collect()),
    }
}

/// Decodes `path` in full into an in-memory dataset plus its geo metadata
pub fn open_decoded(path: &Path) -> FishnetResult<(MemoryDataset, GeoInfo)> {
    let file = BufReader::new(File::open(path)?);
    let mut decoder = Decoder::new(file).map_err(decoder_error)?;
    let (width, height) = decoder.dimensions().map_err(decoder_error)?;
    let (sample_type, samples) = into_samples(decoder.read_image().map_err(decoder_error)?);

    let pixels = width as usize * height as usize;
    if pixels == 0 || samples.len() % pixels != 0 {
        return Err(FishnetError::Backend {
            backend: BACKEND_NAME.to_string(),
            message: format!("{} samples do not fill a {}x{} image", samples.len(), width, height),
        });
    }
    let bands = samples.len() / pixels;
    debug!("Decoded {}x{} x {} {} samples", width, height, bands, sample_type);

    let info = read_geo_info(&mut decoder, bands)?;
    let dataset = MemoryDataset::new(BACKEND_NAME, width, height, bands, sample_type, samples)?;
    Ok((dataset, info))
}

/// Backend B: the `tiff` crate decoder
pub struct DecoderBackend;

impl RasterBackend for DecoderBackend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn try_load(&self, path: &Path, display: &DisplayOptions) -> FishnetResult<RasterData> {
        let (dataset, info) = open_decoded(path)?;
        build_geo_raster(path, BACKEND_NAME, Box::new(dataset), info, display)
            .map_err(|e| FishnetError::Backend {
                backend: BACKEND_NAME.to_string(),
                message: e.to_string(),
            })
    }
}
