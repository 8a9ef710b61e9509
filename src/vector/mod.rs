//! Polygon vector output
//!
//! Shapefile I/O, band polygonization and the conversions built on them.

pub mod polygonize;
pub mod shapefile;
pub mod vector_utils;

pub use shapefile::{FieldDef, FieldType, FieldValue, PolygonFeature, Shapefile, ShapefileReader, ShapefileWriter};
pub use vector_utils::VectorUtils;
