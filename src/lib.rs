//! Raster loading, fishnet grid tiling and geo-referenced tile export
//!
//! [`RasterLoader`] opens GeoTIFFs and plain images through an ordered
//! chain of backends, [`FishnetSegmentation`] splits the result into a grid
//! and exports the tiles, and [`VectorUtils`] writes grids and polygonized
//! bands as shapefiles.

pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod extractor;
pub mod coordinate;
pub mod capabilities;
pub mod config;
pub mod errors;
pub mod raster;
pub mod vector;
pub mod fishnet;
pub mod commands;

pub use capabilities::Capabilities;
pub use config::{DisplayOptions, ExportOptions, FishnetConfig};
pub use coordinate::{BoundingBox, Crs, GeoTransform, Point};
pub use errors::{FishnetError, FishnetResult};
pub use extractor::{ImageExtractor, Region};
pub use fishnet::{ExportSummary, FishnetSegmentation, GridParameters, GridTile, ImageInfo, UiImage};
pub use raster::{enhance_for_display, RasterData, RasterLoader};
pub use tiff::TiffReader;
pub use vector::VectorUtils;
