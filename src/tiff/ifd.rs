//! Image File Directory (IFD) structures and methods
//!
//! An IFD is the tag table describing one image inside a TIFF file. The
//! GeoTIFF reader walks the IFD chain, picks the full-resolution image and
//! resolves its tags through [`TiffReader`](crate::tiff::TiffReader); the
//! tile writer builds fresh IFDs through [`TiffBuilder`](crate::tiff::TiffBuilder).

use std::collections::HashMap;
use std::fmt;
use log::trace;

use crate::tiff::constants::{field_types, new_subfile_type, tags};

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in this IFD
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Cached entries for quick lookup
    tag_map: HashMap<u16, IFDEntry>,
}

/// Represents an entry in an Image File Directory (IFD)
///
/// For values that fit in the entry slot, `value_offset` holds the slot
/// decoded as a single integer in file byte order. Otherwise it is the file
/// offset of the value array.
#[derive(Debug, Clone, PartialEq)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values
    pub value_offset: u64,
}

impl IFDEntry {
    /// Creates a new IFD entry
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self {
            tag,
            field_type,
            count,
            value_offset,
        }
    }

    /// Total size of the entry's values in bytes
    pub fn byte_len(&self) -> u64 {
        field_types::size_of(self.field_type) as u64 * self.count
    }

    /// Determines if the value is stored inline in value_offset
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let inline_size = if is_big_tiff { 8 } else { 4 };
        self.byte_len() <= inline_size
    }
}

impl IFD {
    /// Creates a new empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry, replacing any existing entry with the same tag
    pub fn add_entry(&mut self, entry: IFDEntry) {
        trace!("IFD #{}: tag {} type {} count {}", self.number, entry.tag, entry.field_type, entry.count);

        self.entries.retain(|e| e.tag != entry.tag);
        self.tag_map.insert(entry.tag, entry.clone());
        self.entries.push(entry);
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag)
    }

    /// Whether this directory holds a reduced-resolution overview
    pub fn is_overview(&self) -> bool {
        self.tag_map
            .get(&tags::NEW_SUBFILE_TYPE)
            .map(|e| e.value_offset & new_subfile_type::REDUCED_RESOLUTION != 0)
            .unwrap_or(false)
    }

    /// Whether pixel data is organized in tiles rather than strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_OFFSETS)
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        writeln!(f, "  Number of entries: {}", self.entries.len())?;
        for entry in &self.entries {
            writeln!(f, "    tag {} type {} count {} value/offset {}",
                     entry.tag, entry.field_type, entry.count, entry.value_offset)?;
        }
        Ok(())
    }
}
