//! GeoTIFF tag strategies
//!
//! This module writes the tags that turn a plain TIFF into a GeoTIFF: the
//! affine placement (pixel scale and tiepoint, or a full transformation
//! matrix for rotated grids) and the CRS GeoKeys.

use log::debug;

use crate::coordinate::{Crs, GeoTransform};
use crate::tiff::constants::{field_types, tags};
use crate::tiff::ifd::IFD;

use super::{ascii_z, doubles_le, set_tag_data, shorts_le, ExternalData};

/// Handles GeoTIFF tags
pub struct GeoTagsBuilder;

impl GeoTagsBuilder {
    /// Add the affine placement of the image
    pub fn add_geo_transform(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        transform: &GeoTransform,
    ) {
        match transform.to_scale_tiepoint() {
            Some((scale, tiepoint)) => {
                debug!("Writing pixel scale {:?} and tiepoint {:?}", scale, tiepoint);
                set_tag_data(ifd, external_data, ifd_index, tags::MODEL_PIXEL_SCALE_TAG,
                             field_types::DOUBLE, 3, doubles_le(&scale));
                set_tag_data(ifd, external_data, ifd_index, tags::MODEL_TIEPOINT_TAG,
                             field_types::DOUBLE, 6, doubles_le(&tiepoint));
            }
            None => {
                debug!("Writing model transformation for rotated grid {}", transform);
                set_tag_data(ifd, external_data, ifd_index, tags::MODEL_TRANSFORMATION_TAG,
                             field_types::DOUBLE, 16, doubles_le(&transform.to_model_transformation()));
            }
        }
    }

    /// Add the GeoKey directory and its parameter tags, verbatim
    pub fn add_crs(ifd: &mut IFD, external_data: &mut ExternalData, ifd_index: usize, crs: &Crs) {
        if crs.geo_key_directory.len() < 4 {
            debug!("CRS {} has no GeoKey directory, skipping", crs);
            return;
        }

        set_tag_data(ifd, external_data, ifd_index, tags::GEO_KEY_DIRECTORY_TAG,
                     field_types::SHORT, crs.geo_key_directory.len() as u64,
                     shorts_le(&crs.geo_key_directory));

        if !crs.double_params.is_empty() {
            set_tag_data(ifd, external_data, ifd_index, tags::GEO_DOUBLE_PARAMS_TAG,
                         field_types::DOUBLE, crs.double_params.len() as u64,
                         doubles_le(&crs.double_params));
        }

        if !crs.ascii_params.is_empty() {
            let bytes = ascii_z(&crs.ascii_params);
            let count = bytes.len() as u64;
            set_tag_data(ifd, external_data, ifd_index, tags::GEO_ASCII_PARAMS_TAG,
                         field_types::ASCII, count, bytes);
        }
    }
}
