//! Metadata tag strategies
//!
//! GDAL keeps per-dataset extras in two private tags: an ASCII NoData value
//! and an XML metadata document (band descriptions, free-form items).

use log::debug;

use crate::tiff::constants::{field_types, tags};
use crate::tiff::ifd::IFD;
use crate::utils::xml_utils::{self, GdalMetadata};

use super::{ascii_z, set_tag_data, ExternalData};

/// Handles metadata tags in TIFF files
pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Add a GDAL NoData tag to an IFD
    pub fn add_nodata_tag(ifd: &mut IFD, external_data: &mut ExternalData, ifd_index: usize, nodata: f64) {
        let text = format_nodata(nodata);
        debug!("Adding GDAL NoData tag: {}", text);

        let bytes = ascii_z(&text);
        let count = bytes.len() as u64;
        set_tag_data(ifd, external_data, ifd_index, tags::GDAL_NODATA, field_types::ASCII, count, bytes);
    }

    /// Add a GDAL metadata document
    ///
    /// Nothing is written for empty metadata.
    pub fn add_gdal_metadata_tag(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        metadata: &GdalMetadata,
    ) {
        if metadata.is_empty() {
            return;
        }

        let xml = xml_utils::write_gdal_metadata(metadata);
        debug!("Adding GDAL metadata ({} bytes)", xml.len());

        let bytes = ascii_z(&xml);
        let count = bytes.len() as u64;
        set_tag_data(ifd, external_data, ifd_index, tags::GDAL_METADATA, field_types::ASCII, count, bytes);
    }
}

/// Formats a NoData value the way GDAL writes it
pub fn format_nodata(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_nodata() {
        std::assert_eq!(format_nodata(0.0), "0");
        std::assert_eq!(format_nodata(-9999.0), "-9999");
        std::assert_eq!(format_nodata(0.5), "0.5");
        std::assert_eq!(format_nodata(f64::NAN), "nan");
    }
}
