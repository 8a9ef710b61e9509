//! GeoTIFF metadata and GeoKey parsing
//!
//! This module interprets the geographic tags of a TIFF directory: the
//! GeoKey directory and its parameter tags (CRS), the pixel scale and
//! tiepoint or transformation tags (affine transform), and GDAL's NoData
//! tag.

use log::{debug, warn};

use crate::coordinate::{Crs, GeoTransform};
use crate::io::SeekableReader;
use crate::tiff::constants::{geo_keys, tags};
use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// One key of the GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    /// GeoKey identifier
    pub key_id: u16,
    /// 0 for inline values, otherwise the tag holding the value
    pub tiff_tag_location: u16,
    /// Number of values
    pub count: u16,
    /// Inline value, or index into the parameter tag
    pub value_offset: u16,
}

impl GeoKeyEntry {
    /// Returns the inline SHORT value of this key, if it has one
    pub fn inline_value(&self) -> Option<u16> {
        (self.tiff_tag_location == 0).then_some(self.value_offset)
    }

    /// Resolves an ASCII key against the GeoAsciiParams contents
    pub fn ascii_value(&self, ascii_params: &str) -> Option<String> {
        if self.tiff_tag_location != tags::GEO_ASCII_PARAMS_TAG {
            return None;
        }
        let start = self.value_offset as usize;
        let end = (start + self.count as usize).min(ascii_params.len());
        ascii_params
            .get(start..end)
            .map(|s| s.trim_end_matches(|c| c == '|' || c == '\0').to_string())
    }
}

/// Parser for GeoTIFF geographic metadata
pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Splits a raw GeoKeyDirectoryTag array into key entries
    ///
    /// The array starts with a 4-value header (version, revision, minor
    /// revision, key count) followed by 4 values per key.
    pub fn parse_geo_key_directory(directory: &[u16]) -> Vec<GeoKeyEntry> {
        if directory.len() < 4 {
            return Vec::new();
        }
        let declared = directory[3] as usize;
        let keys: Vec<GeoKeyEntry> = directory[4..]
            .chunks_exact(4)
            .take(declared)
            .map(|k| GeoKeyEntry {
                key_id: k[0],
                tiff_tag_location: k[1],
                count: k[2],
                value_offset: k[3],
            })
            .collect();

        if keys.len() < declared {
            warn!("GeoKey directory declares {} keys but holds {}", declared, keys.len());
        }
        keys
    }

    /// Resolves the EPSG code named by the keys
    ///
    /// The projected CRS key wins over the geographic one; user-defined
    /// codes resolve to nothing.
    pub fn resolve_epsg(keys: &[GeoKeyEntry]) -> Option<u32> {
        let lookup = |id: u16| {
            keys.iter()
                .find(|k| k.key_id == id)
                .and_then(|k| k.inline_value())
                .filter(|&v| v != 0 && v != geo_keys::USER_DEFINED)
        };

        lookup(geo_keys::PROJECTED_CS_TYPE)
            .or_else(|| lookup(geo_keys::GEOGRAPHIC_TYPE))
            .map(u32::from)
    }

    /// Reads the CRS of a directory, `None` when it has no GeoKey directory
    pub fn read_crs(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Option<Crs>> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(None);
        }

        let directory: Vec<u16> = tiff_reader
            .read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?
            .into_iter()
            .map(|v| v as u16)
            .collect();

        let double_params = if ifd.has_tag(tags::GEO_DOUBLE_PARAMS_TAG) {
            tiff_reader.read_tag_doubles(reader, ifd, tags::GEO_DOUBLE_PARAMS_TAG)?
        } else {
            Vec::new()
        };

        let ascii_params = if ifd.has_tag(tags::GEO_ASCII_PARAMS_TAG) {
            tiff_reader.read_tag_ascii(reader, ifd, tags::GEO_ASCII_PARAMS_TAG)?
        } else {
            String::new()
        };

        Ok(Some(Self::crs_from_parts(directory, double_params, ascii_params)))
    }

    /// Builds a CRS from the raw GeoKey directory and parameter tags
    pub fn crs_from_parts(directory: Vec<u16>, double_params: Vec<f64>, ascii_params: String) -> Crs {
        let keys = Self::parse_geo_key_directory(&directory);
        let epsg = Self::resolve_epsg(&keys);
        let citation = [geo_keys::PROJ_CITATION, geo_keys::GT_CITATION, geo_keys::GEOG_CITATION]
            .iter()
            .filter_map(|id| keys.iter().find(|k| k.key_id == *id))
            .find_map(|k| k.ascii_value(&ascii_params))
            .filter(|s| !s.is_empty());

        debug!("GeoKeys: {} keys, EPSG {:?}, citation {:?}", keys.len(), epsg, citation);

        Crs {
            epsg,
            geo_key_directory: directory,
            double_params,
            ascii_params,
            citation,
        }
    }

    /// Reads the affine transform of a directory
    ///
    /// ModelTransformation takes precedence; otherwise pixel scale plus the
    /// first tiepoint is used.
    pub fn read_geo_transform(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Option<GeoTransform>> {
        if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let matrix = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            if let Some(transform) = GeoTransform::from_model_transformation(&matrix) {
                return Ok(Some(transform));
            }
            warn!("ModelTransformation tag holds {} values, expected 16", matrix.len());
        }

        if ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) && ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
            let scale = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
            let tiepoint = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
            return Ok(GeoTransform::from_scale_tiepoint(&scale, &tiepoint));
        }

        Ok(None)
    }

    /// Reads GDAL's NoData tag
    pub fn read_nodata(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Option<f64>> {
        if !ifd.has_tag(tags::GDAL_NODATA) {
            return Ok(None);
        }
        let text = tiff_reader.read_tag_ascii(reader, ifd, tags::GDAL_NODATA)?;
        Ok(parse_nodata(&text))
    }
}

/// Parses a GDAL NoData string such as `"0"`, `"-9999"` or `"nan"`
pub fn parse_nodata(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    trimmed.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_parsing_and_epsg() {
        let directory = [
            1, 1, 0, 3,
            geo_keys::GT_MODEL_TYPE, 0, 1, geo_keys::MODEL_PROJECTED,
            geo_keys::PROJECTED_CS_TYPE, 0, 1, 32650,
            geo_keys::PROJ_CITATION, tags::GEO_ASCII_PARAMS_TAG, 22, 0,
        ];
        let keys = GeoKeyParser::parse_geo_key_directory(&directory);
        std::assert_eq!(keys.len(), 3);
        std::assert_eq!(GeoKeyParser::resolve_epsg(&keys), Some(32650));
        std::assert_eq!(
            keys[2].ascii_value("WGS 84 / UTM zone 50N|").as_deref(),
            Some("WGS 84 / UTM zone 50N")
        );
    }

    #[test]
    fn test_user_defined_falls_back_to_geographic() {
        let directory = [
            1, 1, 0, 2,
            geo_keys::GEOGRAPHIC_TYPE, 0, 1, 4326,
            geo_keys::PROJECTED_CS_TYPE, 0, 1, geo_keys::USER_DEFINED,
        ];
        let keys = GeoKeyParser::parse_geo_key_directory(&directory);
        std::assert_eq!(GeoKeyParser::resolve_epsg(&keys), Some(4326));
    }

    #[test]
    fn test_truncated_directory() {
        std::assert!(GeoKeyParser::parse_geo_key_directory(&[1, 1]).is_empty());
        let keys = GeoKeyParser::parse_geo_key_directory(&[1, 1, 0, 5, 1024, 0, 1, 1]);
        std::assert_eq!(keys.len(), 1);
    }

    #[test]
    fn test_nodata_strings() {
        std::assert_eq!(parse_nodata(" -9999 "), Some(-9999.0));
        std::assert!(parse_nodata("nan").unwrap().is_nan());
        std::assert_eq!(parse_nodata("abc"), None);
    }
}
