//! Fishnet segmentation engine
//!
//! Holds the loaded raster, the grid parameters and the generated tiles.
//! Every public operation returns a `Result` and also remembers the text of
//! its last failure in `last_error`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use image::imageops;
use log::{debug, info, warn};

use crate::errors::{FishnetError, FishnetResult};
use crate::extractor::Region;
use crate::raster::{RasterData, RasterLoader};
use crate::vector::VectorUtils;

use super::grid::{grid_cells, tile_extent, GridParameters, GridTile, TileCell};
use super::overview::{render_overview, UiImage};

pub const DEFAULT_GRID: (usize, usize) = (4, 4);

/// Description of a freshly loaded image
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: String,
    /// Set only for geo-referenced sources
    pub bands_count: Option<usize>,
    pub crs: Option<String>,
    pub is_sentinel: Option<bool>,
    pub band_combination: Option<String>,
}

impl ImageInfo {
    fn from_raster(raster: &RasterData) -> Self {
        let geo = raster.is_geotiff;
        ImageInfo {
            width: raster.width,
            height: raster.height,
            format: raster.format_name(),
            bands_count: geo.then_some(raster.bands_count),
            crs: if geo { raster.crs.as_ref().map(|c| c.to_string()) } else { None },
            is_sentinel: geo.then_some(raster.is_sentinel),
            band_combination: geo.then(|| raster.band_indices.combination()),
        }
    }
}

impl fmt::Display for ImageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.format)?;
        if let Some(bands) = self.bands_count {
            write!(f, ", {} bands", bands)?;
        }
        if let Some(combination) = &self.band_combination {
            write!(f, ", {}", combination)?;
        }
        if let Some(crs) = &self.crs {
            write!(f, ", {}", crs)?;
        }
        Ok(())
    }
}

/// A tile as handed to a UI layer
#[derive(Debug, Clone)]
pub struct UiTile {
    pub position: (u32, u32, u32, u32),
    pub row: usize,
    pub col: usize,
    pub image: UiImage,
}

/// Splits a loaded raster into a regular grid of tiles
pub struct FishnetSegmentation {
    pub(super) raster: Option<RasterData>,
    pub(super) loader: RasterLoader,
    pub(super) vector_utils: VectorUtils,
    rows: usize,
    cols: usize,
    pub(super) tiles: Vec<GridTile>,
    pub(super) last_error: Option<String>,
}

impl Default for FishnetSegmentation {
    fn default() -> Self {
        FishnetSegmentation::new(RasterLoader::default(), VectorUtils::default())
    }
}

impl FishnetSegmentation {
    pub fn new(loader: RasterLoader, vector_utils: VectorUtils) -> Self {
        FishnetSegmentation {
            raster: None,
            loader,
            vector_utils,
            rows: DEFAULT_GRID.0,
            cols: DEFAULT_GRID.1,
            tiles: Vec::new(),
            last_error: None,
        }
    }

    /// Remembers the message of a failed result
    pub(super) fn track<T>(&mut self, result: FishnetResult<T>) -> FishnetResult<T> {
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }

    /// Loads `path` through the loader's fallback chain
    ///
    /// The previous raster and its tiles are released first.
    pub fn load_image<P: AsRef<Path>>(&mut self, path: P) -> FishnetResult<ImageInfo> {
        self.close();
        let result = self.loader.try_load(path.as_ref()).map(|raster| {
            let info = ImageInfo::from_raster(&raster);
            info!("Loaded {}: {}", raster.path.display(), info);
            self.raster = Some(raster);
            info
        });
        self.track(result)
    }

    /// Sets the grid to `rows` x `cols`; tiles are not regenerated
    pub fn set_grid_parameters(&mut self, (rows, cols): (usize, usize)) -> FishnetResult<GridParameters> {
        let result = self.apply_grid_parameters(rows, cols);
        self.track(result)
    }

    fn apply_grid_parameters(&mut self, rows: usize, cols: usize) -> FishnetResult<GridParameters> {
        if rows == 0 || cols == 0 {
            return Err(FishnetError::InvalidGrid(rows, cols));
        }
        let raster = self.raster.as_ref().ok_or(FishnetError::NoImageLoaded)?;
        let params = GridParameters {
            rows,
            cols,
            grid_count: rows.saturating_mul(cols),
            tile_size: (tile_extent(raster.width, cols), tile_extent(raster.height, rows)),
            image_size: (raster.width, raster.height),
        };
        self.rows = rows;
        self.cols = cols;
        Ok(params)
    }

    pub fn grid_size(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Crops every grid cell out of the display bitmap
    ///
    /// Geo-referenced sources also get each tile's pixel window, moved
    /// transform and CRS. A cell that cannot be cropped is skipped and
    /// recorded in `last_error`.
    pub fn generate_grid(&mut self) -> FishnetResult<&[GridTile]> {
        let result = self.build_tiles();
        let tiles = self.track(result)?;
        self.tiles = tiles;
        Ok(&self.tiles)
    }

    fn build_tiles(&mut self) -> FishnetResult<Vec<GridTile>> {
        let raster = self.raster.as_ref().ok_or(FishnetError::NoImageLoaded)?;
        let image = raster.image.as_ref().ok_or(FishnetError::NoImageLoaded)?;
        let cells = grid_cells(raster.width, raster.height, self.rows, self.cols)?;

        let mut tiles = Vec::with_capacity(cells.len());
        for cell in cells {
            match Self::crop_tile(raster, image, cell) {
                Ok(tile) => tiles.push(tile),
                Err(e) => {
                    warn!("Skipping tile ({}, {}): {}", cell.row, cell.col, e);
                    self.last_error = Some(e.to_string());
                }
            }
        }

        debug!("Generated {} tiles for a {}x{} grid", tiles.len(), self.rows, self.cols);
        Ok(tiles)
    }

    fn crop_tile(raster: &RasterData, image: &image::RgbImage, cell: TileCell) -> FishnetResult<GridTile> {
        if cell.x + cell.width > image.width() || cell.y + cell.height > image.height() {
            return Err(FishnetError::Generic(format!(
                "Tile ({}, {}) lies outside the {}x{} image",
                cell.row, cell.col, image.width(), image.height()
            )));
        }
        let image_data = imageops::crop_imm(image, cell.x, cell.y, cell.width, cell.height).to_image();

        let geo_transform = raster.geo_transform.map(|t| t.window(cell.x, cell.y));
        Ok(GridTile {
            cell,
            image_data,
            geo_window: geo_transform.map(|_| Region::new(cell.x, cell.y, cell.width, cell.height)),
            geo_transform,
            geo_crs: geo_transform.and(raster.crs.clone()),
            attributes: BTreeMap::new(),
        })
    }

    pub fn get_grid_result(&self) -> &[GridTile] {
        &self.tiles
    }

    /// Mutable tiles, for attaching attribute values before export
    pub fn tiles_mut(&mut self) -> &mut [GridTile] {
        &mut self.tiles
    }

    /// Tiles converted to raw RGB888 buffers
    pub fn get_ui_compatible_results(&self) -> Vec<UiTile> {
        self.tiles
            .iter()
            .map(|tile| UiTile {
                position: tile.position(),
                row: tile.row(),
                col: tile.col(),
                image: UiImage::from_rgb(&tile.image_data),
            })
            .collect()
    }

    /// Renders the overview of the current grid in memory
    pub fn create_overview_image_for_ui(&mut self) -> FishnetResult<UiImage> {
        let result = self.overview().map(|img| UiImage::from_rgb(&img));
        self.track(result)
    }

    pub(super) fn overview(&self) -> FishnetResult<image::RgbImage> {
        let raster = self.raster.as_ref().ok_or(FishnetError::NoImageLoaded)?;
        let image = raster.image.as_ref().ok_or(FishnetError::NoImageLoaded)?;
        if self.tiles.is_empty() {
            return Err(FishnetError::NoGridResult);
        }
        Ok(render_overview(image, &self.tiles))
    }

    pub fn raster(&self) -> Option<&RasterData> {
        self.raster.as_ref()
    }

    pub fn raster_mut(&mut self) -> Option<&mut RasterData> {
        self.raster.as_mut()
    }

    pub fn vector_utils(&self) -> &VectorUtils {
        &self.vector_utils
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Releases the raster, its dataset handle and the tiles
    pub fn close(&mut self) {
        if let Some(mut raster) = self.raster.take() {
            raster.close();
            debug!("Released {}", raster.path.display());
        }
        self.tiles.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use image::{Rgb, RgbImage};

    use super::*;
    use crate::coordinate::GeoTransform;
    use crate::raster::{DatasetHandle, MemoryDataset};
    use crate::tiff::SampleType;

    fn raster(width: u32, height: u32) -> RasterData {
        let mut raster = RasterData::new(PathBuf::from("scene.png"));
        raster.set_image(RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 0])));
        raster.set_bands_count(3);
        raster
    }

    fn segmentation_with(raster: RasterData) -> FishnetSegmentation {
        let mut seg = FishnetSegmentation::default();
        seg.raster = Some(raster);
        seg
    }

    #[test]
    fn test_grid_parameters_need_an_image() {
        let mut seg = FishnetSegmentation::default();
        std::assert!(matches!(seg.set_grid_parameters((2, 2)), Err(FishnetError::NoImageLoaded)));
        std::assert!(seg.last_error().is_some());
        std::assert!(matches!(seg.set_grid_parameters((0, 2)), Err(FishnetError::InvalidGrid(0, 2))));
        std::assert_eq!(seg.grid_size(), DEFAULT_GRID);
    }

    #[test]
    fn test_rejected_grid_keeps_previous_parameters() {
        let mut seg = segmentation_with(raster(40, 40));
        seg.set_grid_parameters((2, 5)).unwrap();
        std::assert!(seg.set_grid_parameters((0, 3)).is_err());
        std::assert_eq!(seg.grid_size(), (2, 5));

        seg.close();
        std::assert!(matches!(seg.set_grid_parameters((7, 7)), Err(FishnetError::NoImageLoaded)));
        std::assert_eq!(seg.grid_size(), (2, 5));
    }

    #[test]
    fn test_oversized_grid_yields_single_tile() {
        let mut seg = segmentation_with(raster(30, 20));
        let params = seg.set_grid_parameters((1_000_000, 1_000_000)).unwrap();
        std::assert_eq!(params.tile_size, (0, 0));
        std::assert_eq!(params.grid_count, 1_000_000_000_000);
        let tiles = seg.generate_grid().unwrap();
        std::assert_eq!(tiles.len(), 1);
        std::assert_eq!(tiles[0].position(), (0, 0, 30, 20));
    }

    #[test]
    fn test_grid_parameters_report_tile_size() {
        let mut seg = segmentation_with(raster(101, 60));
        let params = seg.set_grid_parameters((3, 4)).unwrap();
        std::assert_eq!(params.grid_count, 12);
        std::assert_eq!(params.tile_size, (25, 20));
        std::assert_eq!(params.image_size, (101, 60));
        std::assert!(seg.get_grid_result().is_empty());
    }

    #[test]
    fn test_generate_grid_crops_display_bitmap() {
        let mut seg = segmentation_with(raster(10, 6));
        seg.set_grid_parameters((2, 3)).unwrap();
        let tiles = seg.generate_grid().unwrap();
        std::assert_eq!(tiles.len(), 6);
        let last = &tiles[5];
        std::assert_eq!(last.position(), (6, 3, 4, 3));
        std::assert_eq!(*last.image_data.get_pixel(0, 0), Rgb([6, 3, 0]));
        std::assert!(!last.is_georeferenced());
        std::assert!(last.geo_window.is_none());
    }

    #[test]
    fn test_georeferenced_tiles_move_the_origin() {
        let mut source = raster(8, 8);
        source.geo_transform = Some(GeoTransform::from_gdal([1000.0, 2.0, 0.0, 500.0, 0.0, -2.0]));
        source.is_geotiff = true;
        let mut seg = segmentation_with(source);
        seg.set_grid_parameters((2, 2)).unwrap();
        let tiles = seg.generate_grid().unwrap();

        let tile = &tiles[3];
        std::assert_eq!(tile.geo_window, Some(Region::new(4, 4, 4, 4)));
        let transform = tile.geo_transform.unwrap();
        std::assert_eq!((transform.origin_x, transform.origin_y), (1008.0, 492.0));
        std::assert_eq!(transform.pixel_width, 2.0);
    }

    #[test]
    fn test_generate_without_image_fails() {
        let mut seg = FishnetSegmentation::default();
        std::assert!(matches!(seg.generate_grid(), Err(FishnetError::NoImageLoaded)));
        std::assert!(seg.create_overview_image_for_ui().is_err());
    }

    #[test]
    fn test_ui_results_and_overview() {
        let mut seg = segmentation_with(raster(20, 10));
        seg.set_grid_parameters((1, 2)).unwrap();
        seg.generate_grid().unwrap();

        let ui = seg.get_ui_compatible_results();
        std::assert_eq!(ui.len(), 2);
        std::assert_eq!((ui[1].row, ui[1].col), (1, 2));
        std::assert_eq!(ui[1].image.bytes_per_line, 30);

        let overview = seg.create_overview_image_for_ui().unwrap();
        std::assert_eq!((overview.width, overview.height), (20, 10));
        std::assert_eq!(overview.data.len(), 600);
    }

    #[test]
    fn test_close_releases_handle() {
        let mut source = raster(2, 2);
        let dataset = MemoryDataset::new("memory", 2, 2, 1, SampleType::U8, vec![0.0; 4]).unwrap();
        source.set_handle(DatasetHandle::new(Box::new(dataset)));
        let mut seg = segmentation_with(source);
        seg.generate_grid().unwrap();

        seg.close();
        std::assert!(seg.raster().is_none());
        std::assert!(seg.get_grid_result().is_empty());
        seg.close();
    }

    #[test]
    fn test_load_missing_file_records_error() {
        let mut seg = FishnetSegmentation::default();
        let result = seg.load_image("/definitely/not/here.tif");
        std::assert!(matches!(result, Err(FishnetError::FileNotFound(_))));
        std::assert!(seg.last_error().unwrap().contains("here.tif"));
    }
}
