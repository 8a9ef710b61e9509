//! Grid and raster to polygon conversion
//!
//! Writes tile grids and polygonized bands as ESRI Shapefiles, and merges
//! polygon files that share a schema.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::capabilities::Capabilities;
use crate::coordinate::{Crs, Point};
use crate::errors::{FishnetError, FishnetResult};
use crate::extractor::Region;
use crate::fishnet::GridTile;
use crate::raster::backends::NativeDataset;
use crate::raster::{write_geotiff, DatasetReader, GeoReference, RasterData, RasterWindow};
use crate::tiff::SampleType;

use super::polygonize::polygonize;
use super::shapefile::{orient_ring, FieldDef, FieldType, FieldValue, PolygonFeature, ShapefileReader, ShapefileWriter};

/// EPSG code assumed when a raster carries no CRS
pub const DEFAULT_EPSG: u32 = 4326;

/// Deletes a file when dropped
struct TempFileGuard {
    path: PathBuf,
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!("Removed temporary {}", self.path.display()),
                Err(e) => warn!("Could not remove temporary {}: {}", self.path.display(), e),
            }
        }
    }
}

/// Output path with a `.shp` extension
fn shp_path(output: &Path) -> PathBuf {
    output.with_extension("shp")
}

/// Converts pixel-space rings to output coordinates with shapefile winding
///
/// The first ring is made clockwise and the rest counter-clockwise.
fn to_output_rings(rings: &[Vec<Point>], raster: &RasterData) -> Vec<Vec<Point>> {
    rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let mut out: Vec<Point> = ring.iter().map(|p| raster.pixel_to_geo(p.x, p.y)).collect();
            orient_ring(&mut out, i == 0);
            out
        })
        .collect()
}

/// Vector conversions gated by the capability flags
#[derive(Debug, Clone, Copy)]
pub struct VectorUtils {
    capabilities: Capabilities,
}

impl Default for VectorUtils {
    fn default() -> Self {
        VectorUtils::new(Capabilities::current())
    }
}

impl VectorUtils {
    pub fn new(capabilities: Capabilities) -> Self {
        VectorUtils { capabilities }
    }

    fn ensure_available(&self) -> FishnetResult<()> {
        if self.capabilities.vector_libs {
            Ok(())
        } else {
            Err(FishnetError::VectorUnavailable)
        }
    }

    /// `.prj` text for the raster's CRS, falling back to EPSG:4326
    fn projection(raster: &RasterData) -> Option<String> {
        let crs = raster.crs.clone().unwrap_or_else(|| Crs::from_epsg(DEFAULT_EPSG));
        let wkt = crs.to_esri_wkt();
        if wkt.is_none() {
            warn!("No ESRI WKT for {}; writing without .prj", crs);
        }
        wkt
    }

    /// Writes one polygon per tile
    ///
    /// Corners go through the raster's transform when it has one and stay
    /// in pixel space otherwise. Columns are `id`, `row`, `col`, `width`,
    /// `height` and then `extra_attributes`, looked up per tile.
    pub fn grid_to_vector_file(
        &self,
        raster: &RasterData,
        tiles: &[GridTile],
        output_path: &Path,
        extra_attributes: &[(String, FieldType)],
    ) -> FishnetResult<String> {
        self.ensure_available()?;

        let mut fields = vec![
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("row", FieldType::Integer),
            FieldDef::new("col", FieldType::Integer),
            FieldDef::new("width", FieldType::Float),
            FieldDef::new("height", FieldType::Float),
        ];
        fields.extend(extra_attributes.iter().map(|(name, t)| FieldDef::new(name, *t)));

        let features: Vec<PolygonFeature> = tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| {
                let (x, y, w, h) = tile.position();
                let (x0, y0, x1, y1) = (x as f64, y as f64, (x + w) as f64, (y + h) as f64);
                let ring = vec![
                    Point::new(x0, y0),
                    Point::new(x1, y0),
                    Point::new(x1, y1),
                    Point::new(x0, y1),
                    Point::new(x0, y0),
                ];

                let mut attributes = vec![
                    FieldValue::Integer(i as i64 + 1),
                    FieldValue::Integer(tile.row() as i64),
                    FieldValue::Integer(tile.col() as i64),
                    FieldValue::Float(w as f64),
                    FieldValue::Float(h as f64),
                ];
                attributes.extend(extra_attributes.iter().map(|(name, _)| {
                    tile.attributes.get(name).cloned().unwrap_or(FieldValue::Null)
                }));

                PolygonFeature {
                    rings: to_output_rings(&[ring], raster),
                    attributes,
                }
            })
            .collect();

        let path = shp_path(output_path);
        ShapefileWriter::write(&path, &fields, &features, Self::projection(raster).as_deref())?;
        info!("Wrote {} grid cells to {}", features.len(), path.display());
        Ok(format!("Wrote {} grid cells to {}", features.len(), path.display()))
    }

    /// Polygonizes one 1-based band
    ///
    /// Pixels greater than `threshold` and not equal to the nodata value
    /// become polygons; 4-connected pixels of equal value form one feature
    /// with an integer `DN` attribute.
    pub fn raster_to_vector(
        &self,
        raster: &mut RasterData,
        output_path: &Path,
        band_index: usize,
        threshold: f64,
    ) -> FishnetResult<String> {
        self.ensure_available()?;
        if !raster.is_loaded() {
            return Err(FishnetError::NoImageLoaded);
        }

        let region = Region::new(0, 0, raster.width, raster.height);
        let windows = if raster.handle().is_open() {
            raster.read_window(&[band_index], &region)?
        } else {
            Self::read_through_temp_file(raster, output_path, band_index, &region)?
        };
        let values = windows
            .into_iter()
            .next()
            .ok_or_else(|| FishnetError::Vector("Band read returned no data".to_string()))?;

        let nodata = raster.nodata;
        let mask = |v: f64| {
            v.is_finite() && v > threshold && nodata.map_or(true, |nd| v != nd)
        };
        let regions = polygonize(&values, raster.width as usize, raster.height as usize, &mask);

        let fields = vec![FieldDef::new("DN", FieldType::Integer)];
        let features: Vec<PolygonFeature> = regions
            .iter()
            .map(|r| PolygonFeature {
                rings: to_output_rings(&r.rings, raster),
                attributes: vec![FieldValue::Integer(r.value as i64)],
            })
            .collect();

        let path = shp_path(output_path);
        ShapefileWriter::write(&path, &fields, &features, Self::projection(raster).as_deref())?;
        info!("Polygonized band {} into {} features at {}", band_index, features.len(), path.display());
        Ok(format!("Wrote {} polygons to {}", features.len(), path.display()))
    }

    /// Writes the display array to `{output}.temp.tif` and reads the band
    /// back through the native parser; the file is always removed
    fn read_through_temp_file(
        raster: &RasterData,
        output_path: &Path,
        band_index: usize,
        region: &Region,
    ) -> FishnetResult<Vec<Vec<f64>>> {
        let image = raster.image.as_ref().ok_or(FishnetError::NoImageLoaded)?;
        let mut temp_name = output_path.as_os_str().to_os_string();
        temp_name.push(".temp.tif");
        let guard = TempFileGuard { path: PathBuf::from(temp_name) };
        if let Some(dir) = guard.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let pixels = image.as_raw();
        let bands: Vec<Vec<f64>> = (0..3)
            .map(|c| pixels.iter().skip(c).step_by(3).map(|&v| f64::from(v)).collect())
            .collect();
        let window = RasterWindow {
            width: raster.width,
            height: raster.height,
            sample_type: SampleType::U8,
            bands,
        };
        let geo = GeoReference {
            transform: raster.geo_transform,
            crs: raster.crs.as_ref(),
            nodata: None,
            band_names: &[],
        };
        write_geotiff(&guard.path, &window, &geo)?;
        debug!("Wrote temporary raster {}", guard.path.display());

        let (mut dataset, _) = NativeDataset::open(&guard.path)?;
        if band_index == 0 || band_index > dataset.band_count() {
            return Err(FishnetError::Generic(format!(
                "Band {} out of range 1..={}", band_index, dataset.band_count()
            )));
        }
        dataset.read_window(&[band_index], region)
    }

    /// Concatenates polygon shapefiles that share a schema
    ///
    /// The schema and projection come from the first input.
    pub fn merge_vector_files(&self, inputs: &[PathBuf], output_path: &Path) -> FishnetResult<String> {
        self.ensure_available()?;
        let (first, rest) = inputs
            .split_first()
            .ok_or_else(|| FishnetError::Vector("No input files to merge".to_string()))?;

        let base = ShapefileReader::read(first)?;
        let mut features = base.features;
        for input in rest {
            let next = ShapefileReader::read(input)?;
            if next.fields != base.fields {
                return Err(FishnetError::Vector(format!(
                    "Schema of {} differs from {}", input.display(), first.display()
                )));
            }
            features.extend(next.features);
        }

        let path = shp_path(output_path);
        ShapefileWriter::write(&path, &base.fields, &features, base.prj.as_deref())?;
        info!("Merged {} files into {} ({} features)", inputs.len(), path.display(), features.len());
        Ok(format!("Merged {} files into {}", inputs.len(), path.display()))
    }
}
