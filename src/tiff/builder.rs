//! TIFF file construction utilities
//!
//! [`TiffBuilder`] collects directories, tag payloads and strip data, then
//! hands them to the writer strategy. Tag groups are delegated to the
//! builders in `tiff::builders`.

use log::debug;
use std::path::Path;

use crate::compression::CompressionHandler;
use crate::coordinate::{Crs, GeoTransform};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::sample::SampleType;
use crate::utils::xml_utils::GdalMetadata;

use crate::tiff::builders::basic_tags::BasicTagsBuilder;
use crate::tiff::builders::geo_tags::GeoTagsBuilder;
use crate::tiff::builders::metadata_tags::MetadataBuilder;
use crate::tiff::builders::writer::WriterBuilder;
use crate::tiff::builders::{ExternalData, ImageData};

/// Builder for creating TIFF files
pub struct TiffBuilder {
    is_big_tiff: bool,
    pub ifds: Vec<IFD>,
    image_data: ImageData,
    external_data: ExternalData,
}

impl TiffBuilder {
    /// Create a new TIFF builder
    pub fn new(is_big_tiff: bool) -> Self {
        TiffBuilder {
            is_big_tiff,
            ifds: Vec::new(),
            image_data: ImageData::new(),
            external_data: ExternalData::new(),
        }
    }

    /// Add an IFD to the TIFF, returning its index
    pub fn add_ifd(&mut self, ifd: IFD) -> usize {
        let ifd_index = self.ifds.len();
        self.ifds.push(ifd);
        ifd_index
    }

    /// Split borrow of one directory and the shared tag payloads
    fn parts(&mut self, ifd_index: usize) -> TiffResult<(&mut IFD, &mut ExternalData)> {
        let count = self.ifds.len();
        let ifd = self.ifds.get_mut(ifd_index).ok_or_else(|| {
            TiffError::GenericError(format!("Invalid IFD index {}, only have {} IFDs", ifd_index, count))
        })?;
        Ok((ifd, &mut self.external_data))
    }

    /// Add dimension and sample layout tags
    pub fn add_image_structure(
        &mut self,
        ifd_index: usize,
        width: u32,
        height: u32,
        sample_type: SampleType,
        samples: u16,
    ) -> TiffResult<()> {
        let (ifd, external_data) = self.parts(ifd_index)?;
        BasicTagsBuilder::add_image_structure(
            ifd, external_data, ifd_index, width, height, sample_type, samples);
        Ok(())
    }

    /// Compress the pixel data into a single strip
    pub fn setup_single_strip(
        &mut self,
        ifd_index: usize,
        height: u32,
        pixels: &[u8],
        compression: &dyn CompressionHandler,
    ) -> TiffResult<()> {
        let strip = compression.compress(pixels)?;
        debug!("Strip compressed with {}: {} -> {} bytes", compression.name(), pixels.len(), strip.len());

        let count = self.ifds.len();
        let ifd = self.ifds.get_mut(ifd_index).ok_or_else(|| {
            TiffError::GenericError(format!("Invalid IFD index {}, only have {} IFDs", ifd_index, count))
        })?;
        BasicTagsBuilder::setup_single_strip(
            ifd, &mut self.image_data, ifd_index, height, compression.code(), strip);
        Ok(())
    }

    /// Add the affine placement tags
    pub fn add_geo_transform(&mut self, ifd_index: usize, transform: &GeoTransform) -> TiffResult<()> {
        let (ifd, external_data) = self.parts(ifd_index)?;
        GeoTagsBuilder::add_geo_transform(ifd, external_data, ifd_index, transform);
        Ok(())
    }

    /// Add the CRS GeoKeys
    pub fn add_crs(&mut self, ifd_index: usize, crs: &Crs) -> TiffResult<()> {
        let (ifd, external_data) = self.parts(ifd_index)?;
        GeoTagsBuilder::add_crs(ifd, external_data, ifd_index, crs);
        Ok(())
    }

    /// Add a GDAL NoData tag
    pub fn add_nodata_tag(&mut self, ifd_index: usize, nodata: f64) -> TiffResult<()> {
        let (ifd, external_data) = self.parts(ifd_index)?;
        MetadataBuilder::add_nodata_tag(ifd, external_data, ifd_index, nodata);
        Ok(())
    }

    /// Add a GDAL metadata document
    pub fn add_gdal_metadata(&mut self, ifd_index: usize, metadata: &GdalMetadata) -> TiffResult<()> {
        let (ifd, external_data) = self.parts(ifd_index)?;
        MetadataBuilder::add_gdal_metadata_tag(ifd, external_data, ifd_index, metadata);
        Ok(())
    }

    /// Add the Software tag
    pub fn add_software(&mut self, ifd_index: usize, software: &str) -> TiffResult<()> {
        let (ifd, external_data) = self.parts(ifd_index)?;
        BasicTagsBuilder::add_software(ifd, external_data, ifd_index, software);
        Ok(())
    }

    /// Write the TIFF file to disk
    pub fn write(&self, output_path: &Path) -> TiffResult<()> {
        WriterBuilder::write(
            self.is_big_tiff,
            &self.ifds,
            &self.image_data,
            &self.external_data,
            output_path,
        )
    }
}
