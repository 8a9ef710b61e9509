//! Fishnet grid segmentation
//!
//! Splits a loaded raster into a rows x cols grid of tiles, renders a
//! numbered overview and exports the tiles as PNG or clipped GeoTIFF.

mod export;
pub mod grid;
pub mod overview;
pub mod segmentation;

pub use export::ExportSummary;
pub use grid::{grid_cells, GridParameters, GridTile, TileCell};
pub use overview::{label_scale, render_overview, UiImage};
pub use segmentation::{FishnetSegmentation, ImageInfo, UiTile, DEFAULT_GRID};
