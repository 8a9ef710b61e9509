//! Tests for TIFF construction, read back through the directory reader

extern crate std;

use std::fs::File;

use crate::compression::AdobeDeflateHandler;
use crate::coordinate::{Crs, GeoTransform};
use crate::tiff::builder::TiffBuilder;
use crate::tiff::constants::{compression, photometric, tags};
use crate::tiff::geo_key_parser::GeoKeyParser;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::sample::SampleType;
use crate::utils::xml_utils::{self, GdalMetadata};

fn temp_path(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join("fishnet_tiff_builder_tests");
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(name)
}

#[test]
fn test_written_geotiff_reads_back() {
    let path = temp_path("geo.tif");
    let transform = GeoTransform::from_gdal([500000.0, 10.0, 0.0, 4000000.0, 0.0, -10.0]);
    let crs = Crs::from_epsg(32650);
    let mut metadata = GdalMetadata::default();
    metadata.band_descriptions.insert(0, "B4".to_string());
    metadata.band_descriptions.insert(1, "B3".to_string());

    let pixels: Vec<u8> = (0..4 * 3 * 2).flat_map(|i: u16| (i * 100).to_le_bytes()).collect();

    let mut builder = TiffBuilder::new(false);
    let idx = builder.add_ifd(IFD::new(0, 0));
    builder.add_image_structure(idx, 4, 3, SampleType::U16, 2).unwrap();
    builder.setup_single_strip(idx, 3, &pixels, &AdobeDeflateHandler).unwrap();
    builder.add_geo_transform(idx, &transform).unwrap();
    builder.add_crs(idx, &crs).unwrap();
    builder.add_nodata_tag(idx, 0.0).unwrap();
    builder.add_gdal_metadata(idx, &metadata).unwrap();
    builder.write(&path).unwrap();

    let mut file = File::open(&path).unwrap();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut file).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    std::assert_eq!(reader.read_tag_u64(&mut file, ifd, tags::IMAGE_WIDTH).unwrap(), Some(4));
    std::assert_eq!(reader.read_tag_values(&mut file, ifd, tags::BITS_PER_SAMPLE).unwrap(), vec![16, 16]);
    std::assert_eq!(reader.read_tag_u64(&mut file, ifd, tags::COMPRESSION).unwrap(), Some(compression::DEFLATE as u64));
    std::assert_eq!(
        reader.read_tag_u64(&mut file, ifd, tags::PHOTOMETRIC_INTERPRETATION).unwrap(),
        Some(photometric::BLACK_IS_ZERO as u64)
    );
    std::assert_eq!(reader.read_tag_values(&mut file, ifd, tags::EXTRA_SAMPLES).unwrap(), vec![0]);

    let read_transform = GeoKeyParser::read_geo_transform(&reader, &mut file, ifd).unwrap().unwrap();
    std::assert_eq!(read_transform, transform);

    let read_crs = GeoKeyParser::read_crs(&reader, &mut file, ifd).unwrap().unwrap();
    std::assert_eq!(read_crs.epsg, Some(32650));
    std::assert_eq!(read_crs.geo_key_directory, crs.geo_key_directory);

    std::assert_eq!(GeoKeyParser::read_nodata(&reader, &mut file, ifd).unwrap(), Some(0.0));

    let xml = reader.read_tag_ascii(&mut file, ifd, tags::GDAL_METADATA).unwrap();
    std::assert_eq!(xml_utils::parse_gdal_metadata(&xml), metadata);

    let offsets = reader.read_tag_values(&mut file, ifd, tags::STRIP_OFFSETS).unwrap();
    std::assert_eq!(offsets.len(), 1);
    std::assert_eq!(offsets[0] % 4, 0);

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_rgb_layout_and_rotated_transform() {
    let path = temp_path("rgb_rotated.tif");
    let transform = GeoTransform::from_gdal([10.0, 1.0, 0.5, 20.0, 0.25, -1.0]);

    let mut builder = TiffBuilder::new(false);
    let idx = builder.add_ifd(IFD::new(0, 0));
    builder.add_image_structure(idx, 2, 2, SampleType::U8, 3).unwrap();
    builder.setup_single_strip(idx, 2, &[0u8; 12], &AdobeDeflateHandler).unwrap();
    builder.add_geo_transform(idx, &transform).unwrap();
    builder.add_software(idx, "fishnet-raster").unwrap();
    builder.write(&path).unwrap();

    let mut file = File::open(&path).unwrap();
    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut file).unwrap();
    let ifd = tiff.main_ifd().unwrap();

    std::assert_eq!(
        reader.read_tag_u64(&mut file, ifd, tags::PHOTOMETRIC_INTERPRETATION).unwrap(),
        Some(photometric::RGB as u64)
    );
    std::assert!(!ifd.has_tag(tags::EXTRA_SAMPLES));
    std::assert!(ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG));
    std::assert!(!ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG));
    std::assert_eq!(GeoKeyParser::read_geo_transform(&reader, &mut file, ifd).unwrap(), Some(transform));
    std::assert_eq!(reader.read_tag_ascii(&mut file, ifd, tags::SOFTWARE).unwrap(), "fishnet-raster");

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_invalid_ifd_index() {
    let mut builder = TiffBuilder::new(false);
    std::assert!(builder.add_nodata_tag(3, 0.0).is_err());
}
