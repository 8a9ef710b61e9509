//! Tile export
//!
//! Writes every tile, the numbered overview, an optional grid shapefile and
//! a plain-text summary log. Geo-referenced tiles are written as GeoTIFFs
//! clipped from the raw bands; if both raw sources fail the display crop is
//! saved as PNG instead.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::ExportOptions;
use crate::errors::{FishnetError, FishnetResult};
use crate::extractor::Region;
use crate::raster::{write_geotiff, DatasetReader, GeoReference, MemoryDataset, RasterData, RasterWindow};
use crate::tiff::SampleType;
use crate::utils::logger::Logger;
use crate::utils::progress::ProgressTracker;
use crate::vector::shapefile::sidecar_paths;

use super::grid::GridTile;
use super::segmentation::FishnetSegmentation;

/// Files produced by one export
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    pub save_dir: PathBuf,
    pub files_count: usize,
    /// Tiles, overview and grid shapefile, in write order
    pub files: Vec<PathBuf>,
}

/// How a tile ended up on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TileOutput {
    Decoded,
    Handle,
    Png,
}

/// Output directories of one export
struct ExportLayout {
    base_name: String,
    save_dir: PathBuf,
    tiles_dir: PathBuf,
}

impl ExportLayout {
    fn new(export_dir: &Path, base_name: String, create_subfolders: bool) -> Self {
        let (save_dir, tiles_dir) = if create_subfolders {
            let save_dir = export_dir.join(format!("{}_分割结果", base_name));
            let tiles_dir = save_dir.join("网格图像");
            (save_dir, tiles_dir)
        } else {
            (export_dir.to_path_buf(), export_dir.to_path_buf())
        };
        ExportLayout { base_name, save_dir, tiles_dir }
    }

    fn tile_path(&self, tile: &GridTile, extension: &str) -> PathBuf {
        self.tiles_dir
            .join(format!("{}_{}_{}.{}", self.base_name, tile.row(), tile.col(), extension))
    }

    fn overview_path(&self) -> PathBuf {
        self.save_dir.join(format!("{}_网格分割示意图.png", self.base_name))
    }

    fn grid_shapefile_path(&self) -> PathBuf {
        self.save_dir.join("vector").join(format!("{}_grid.shp", self.base_name))
    }

    fn log_path(&self) -> PathBuf {
        self.save_dir.join(format!("{}_export.log", self.base_name))
    }
}

/// Decoded copy of the source, opened once per export
#[cfg(feature = "tiff-decoder")]
fn open_clip_source(path: &Path) -> Option<MemoryDataset> {
    match crate::raster::backends::open_decoded(path) {
        Ok((dataset, _)) => Some(dataset),
        Err(e) => {
            debug!("Decoded clip source unavailable: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "tiff-decoder"))]
fn open_clip_source(_path: &Path) -> Option<MemoryDataset> {
    None
}

/// Reads all bands of `region` from `reader` and writes them as a GeoTIFF
fn clip_to_geotiff(
    reader: &mut dyn DatasetReader,
    raster: &RasterData,
    tile: &GridTile,
    region: &Region,
    path: &Path,
) -> FishnetResult<()> {
    let bands: Vec<usize> = (1..=reader.band_count()).collect();
    let samples = reader.read_window(&bands, region)?;
    write_window(raster, tile, region, reader.sample_type(), samples, path)
}

fn write_window(
    raster: &RasterData,
    tile: &GridTile,
    region: &Region,
    sample_type: SampleType,
    bands: Vec<Vec<f64>>,
    path: &Path,
) -> FishnetResult<()> {
    let window = RasterWindow {
        width: region.width,
        height: region.height,
        sample_type,
        bands,
    };
    let geo = GeoReference {
        transform: tile.geo_transform,
        crs: tile.geo_crs.as_ref(),
        nodata: raster.nodata,
        band_names: &raster.band_names,
    };
    write_geotiff(path, &window, &geo)
}

/// Clips through the still-open dataset handle of `raster`
fn clip_through_handle(raster: &mut RasterData, tile: &GridTile, region: &Region, path: &Path) -> FishnetResult<()> {
    let handle = raster.handle();
    let bands: Vec<usize> = (1..=handle.band_count()?).collect();
    let sample_type = handle.sample_type()?;
    let samples = raster.read_window(&bands, region)?;
    write_window(raster, tile, region, sample_type, samples, path)
}

impl FishnetSegmentation {
    /// Exports the current tiles under `export_dir`
    ///
    /// Fails when there is no image or no tiles, or when an output
    /// directory cannot be created. A tile that cannot be written is
    /// skipped; files already written are kept.
    pub fn export_result<P: AsRef<Path>>(&mut self, export_dir: P, options: &ExportOptions) -> FishnetResult<ExportSummary> {
        let result = self.write_export(export_dir.as_ref(), options);
        self.track(result)
    }

    fn write_export(&mut self, export_dir: &Path, options: &ExportOptions) -> FishnetResult<ExportSummary> {
        if self.raster.as_ref().map_or(true, |r| !r.is_loaded()) {
            return Err(FishnetError::NoImageLoaded);
        }
        if self.tiles.is_empty() {
            return Err(FishnetError::NoGridResult);
        }

        let overview = self.overview()?;
        let decoder_enabled = self.loader.capabilities().geo_backend_b;
        let raster = self.raster.as_mut().ok_or(FishnetError::NoImageLoaded)?;
        let layout = ExportLayout::new(export_dir, raster.base_name(), options.create_subfolders);
        fs::create_dir_all(&layout.tiles_dir)?;
        fs::create_dir_all(&layout.save_dir)?;

        let geo_export = raster.is_geotiff && !options.export_as_image;
        let mut clip_source = if geo_export && decoder_enabled {
            open_clip_source(&raster.path)
        } else {
            None
        };

        let mut files = Vec::with_capacity(self.tiles.len() + 1);
        let mut outputs = Vec::with_capacity(self.tiles.len());
        let mut failures = Vec::new();
        let progress = ProgressTracker::new(self.tiles.len() as u64, "Exporting tiles");

        for tile in &self.tiles {
            let written = if geo_export {
                Self::write_geo_tile(raster, clip_source.as_mut(), tile, &layout, &mut failures)
            } else {
                Self::write_png_tile(tile, &layout).map(|path| (path, TileOutput::Png))
            };
            match written {
                Ok((path, output)) => {
                    files.push(path);
                    outputs.push(output);
                }
                Err(e) => {
                    warn!("Tile ({}, {}) not exported: {}", tile.row(), tile.col(), e);
                    failures.push(format!("tile {}_{}: {}", tile.row(), tile.col(), e));
                }
            }
            progress.increment(1);
        }
        progress.finish();

        let overview_path = layout.overview_path();
        match overview.save(&overview_path) {
            Ok(()) => files.push(overview_path),
            Err(e) => {
                warn!("Overview not written: {}", e);
                failures.push(format!("overview: {}", e));
            }
        }

        if options.export_shp && geo_export {
            let shp = layout.grid_shapefile_path();
            match self.vector_utils.grid_to_vector_file(raster, &self.tiles, &shp, &[]) {
                Ok(message) => {
                    debug!("{}", message);
                    files.extend(sidecar_paths(&shp).into_iter().filter(|p| p.exists()));
                }
                Err(e) => {
                    warn!("Grid shapefile not written: {}", e);
                    failures.push(format!("grid shapefile: {}", e));
                }
            }
        }

        let summary = ExportSummary {
            save_dir: layout.save_dir.clone(),
            files_count: files.len(),
            files,
        };
        Self::write_summary_log(&layout, raster, &summary, &outputs, &failures);

        if let Some(last) = failures.last() {
            self.last_error = Some(last.clone());
        }
        info!("Exported {} files to {}", summary.files_count, summary.save_dir.display());
        Ok(summary)
    }

    fn write_png_tile(tile: &GridTile, layout: &ExportLayout) -> FishnetResult<PathBuf> {
        let path = layout.tile_path(tile, "png");
        tile.image_data.save(&path)?;
        Ok(path)
    }

    /// Decoded source first, then the raster's handle, then a PNG crop
    ///
    /// Falling back to PNG appends the handle error to `failures`.
    fn write_geo_tile(
        raster: &mut RasterData,
        clip_source: Option<&mut MemoryDataset>,
        tile: &GridTile,
        layout: &ExportLayout,
        failures: &mut Vec<String>,
    ) -> FishnetResult<(PathBuf, TileOutput)> {
        let (x, y, w, h) = tile.position();
        let region = tile.geo_window.unwrap_or_else(|| Region::new(x, y, w, h));
        let path = layout.tile_path(tile, "tif");

        if let Some(source) = clip_source {
            match clip_to_geotiff(source, raster, tile, &region, &path) {
                Ok(()) => return Ok((path, TileOutput::Decoded)),
                Err(e) => debug!("Decoded clip of tile ({}, {}) failed: {}", tile.row(), tile.col(), e),
            }
        }

        match clip_through_handle(raster, tile, &region, &path) {
            Ok(()) => return Ok((path, TileOutput::Handle)),
            Err(e) => {
                warn!("Tile ({}, {}) saved as PNG without geo-reference: {}", tile.row(), tile.col(), e);
                failures.push(format!("tile {}_{} saved as PNG: {}", tile.row(), tile.col(), e));
            }
        }

        Self::write_png_tile(tile, layout).map(|path| (path, TileOutput::Png))
    }

    fn write_summary_log(
        layout: &ExportLayout,
        raster: &RasterData,
        summary: &ExportSummary,
        outputs: &[TileOutput],
        failures: &[String],
    ) {
        let count = |kind: TileOutput| outputs.iter().filter(|&&o| o == kind).count().to_string();
        let mut entries = vec![
            ("Source".to_string(), raster.path.display().to_string()),
            ("Size".to_string(), format!("{}x{}", raster.width, raster.height)),
            ("GeoTIFF".to_string(), raster.is_geotiff.to_string()),
            ("Tiles from decoded source".to_string(), count(TileOutput::Decoded)),
            ("Tiles from dataset handle".to_string(), count(TileOutput::Handle)),
            ("Tiles as PNG".to_string(), count(TileOutput::Png)),
            ("Files".to_string(), summary.files_count.to_string()),
        ];
        if let Some(crs) = &raster.crs {
            entries.push(("CRS".to_string(), crs.to_string()));
        }
        entries.extend(failures.iter().map(|f| ("Failed".to_string(), f.clone())));

        let written = Logger::new(layout.log_path()).and_then(|logger| {
            logger.log_section("Fishnet export", &entries)?;
            for file in &summary.files {
                logger.log(&format!("  {}", file.display()))?;
            }
            Ok(())
        });
        if let Err(e) = written {
            warn!("Export log not written: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_with_subfolders() {
        let layout = ExportLayout::new(Path::new("/out"), "scene".to_string(), true);
        std::assert_eq!(layout.save_dir, PathBuf::from("/out/scene_分割结果"));
        std::assert_eq!(layout.tiles_dir, PathBuf::from("/out/scene_分割结果/网格图像"));
        std::assert_eq!(layout.overview_path(), PathBuf::from("/out/scene_分割结果/scene_网格分割示意图.png"));
        std::assert_eq!(layout.grid_shapefile_path(), PathBuf::from("/out/scene_分割结果/vector/scene_grid.shp"));
        std::assert_eq!(layout.log_path(), PathBuf::from("/out/scene_分割结果/scene_export.log"));
    }

    #[test]
    fn test_layout_without_subfolders() {
        let layout = ExportLayout::new(Path::new("/out"), "scene".to_string(), false);
        std::assert_eq!(layout.save_dir, PathBuf::from("/out"));
        std::assert_eq!(layout.tiles_dir, PathBuf::from("/out"));
    }

    #[test]
    fn test_export_without_tiles_fails() {
        let mut seg = FishnetSegmentation::default();
        let result = seg.export_result(std::env::temp_dir(), &ExportOptions::default());
        std::assert!(matches!(result, Err(FishnetError::NoImageLoaded)));
        std::assert!(seg.last_error().is_some());
    }
}
