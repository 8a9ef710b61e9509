//! Raster loading and display preparation
//!
//! [`RasterLoader`] turns a file into a [`RasterData`]: an RGB display
//! bitmap plus the geo metadata and open dataset of the source.

pub mod backends;
pub mod bands;
pub mod data;
pub mod enhance;
pub mod geotiff;
pub mod handle;
pub mod loader;

pub use bands::BandIndices;
pub use data::RasterData;
pub use enhance::{enhance_for_display, ArrayData, RasterArray};
pub use geotiff::{write_geotiff, GeoReference, RasterWindow};
pub use handle::{DatasetHandle, DatasetReader, MemoryDataset};
pub use loader::RasterLoader;
