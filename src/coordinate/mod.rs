//! Coordinate handling for geospatial data
//!
//! This module provides the affine pixel-to-map transform, coordinate
//! reference system descriptors and the small point/box types they share.

mod bbox;
mod point;
mod transform;
mod crs;

// Re-export key types
pub use self::bbox::BoundingBox;
pub use self::point::Point;
pub use self::transform::GeoTransform;
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory, Crs};
