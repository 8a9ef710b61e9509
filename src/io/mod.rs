//! Low-level I/O helpers shared by the TIFF reader and the dataset handles

pub mod byte_order;

use std::io::{Read, Seek};

/// A reader that can be repositioned
///
/// Tag values and pixel chunks live at arbitrary offsets, so every parser in
/// this crate reads through this trait instead of a concrete file type.
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
