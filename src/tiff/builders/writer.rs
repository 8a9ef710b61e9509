//! TIFF writing strategies
//!
//! Lays out header, directories, out-of-line tag data and strip data, then
//! writes them with every offset resolved. Output is always little-endian.

use log::debug;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::tiff::constants::{header, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};

use super::{ExternalData, ImageData};

/// Offsets assigned to each directory and data block
struct Layout {
    ifd_offsets: Vec<u64>,
    data_offsets: std::collections::BTreeMap<(usize, u16), u64>,
    end: u64,
}

/// Handles writing TIFF files to disk
pub struct WriterBuilder;

impl WriterBuilder {
    /// Write a complete TIFF file to disk
    pub fn write(
        is_big_tiff: bool,
        ifds: &[IFD],
        image_data: &ImageData,
        external_data: &ExternalData,
        output_path: &Path,
    ) -> TiffResult<()> {
        let sorted_ifds: Vec<IFD> = ifds.iter().map(Self::sorted).collect();
        let header_size = if is_big_tiff { 16 } else { 8 };
        let layout = Self::calculate_layout(&sorted_ifds, external_data, image_data, header_size, is_big_tiff);

        if !is_big_tiff && layout.end > u32::MAX as u64 {
            return Err(TiffError::GenericError(format!(
                "{} bytes do not fit a classic TIFF", layout.end)));
        }
        debug!("Writing TIFF to {} ({} bytes, {} IFDs)", output_path.display(), layout.end, sorted_ifds.len());

        let file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(1024 * 1024, file);

        Self::write_header(&mut writer, is_big_tiff, layout.ifd_offsets.first().copied().unwrap_or(0))?;

        for (i, ifd) in sorted_ifds.iter().enumerate() {
            let next = layout.ifd_offsets.get(i + 1).copied().unwrap_or(0);
            writer.seek(SeekFrom::Start(layout.ifd_offsets[i]))?;
            Self::write_ifd(&mut writer, ifd, i, next, &layout, is_big_tiff)?;
        }

        for (key, data) in external_data {
            if let Some(offset) = layout.data_offsets.get(key) {
                writer.seek(SeekFrom::Start(*offset))?;
                writer.write_all(data)?;
            }
        }

        for (ifd_index, data) in image_data {
            if let Some(offset) = layout.data_offsets.get(&(*ifd_index, tags::STRIP_OFFSETS)) {
                writer.seek(SeekFrom::Start(*offset))?;
                writer.write_all(data)?;
            }
        }

        writer.flush()?;
        let file = writer.into_inner().map_err(|e| TiffError::IoError(e.into_error()))?;
        // Trailing alignment padding
        file.set_len(layout.end)?;
        Ok(())
    }

    /// Entries sorted by tag, as TIFF readers require
    fn sorted(ifd: &IFD) -> IFD {
        let mut sorted = ifd.clone();
        sorted.entries.sort_by_key(|entry| entry.tag);
        sorted
    }

    fn ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
        let n = ifd.entries.len() as u64;
        if is_big_tiff { 8 + 20 * n + 8 } else { 2 + 12 * n + 4 }
    }

    fn align(offset: u64) -> u64 {
        (offset + 3) & !3
    }

    fn calculate_layout(
        ifds: &[IFD],
        external_data: &ExternalData,
        image_data: &ImageData,
        header_size: u64,
        is_big_tiff: bool,
    ) -> Layout {
        let mut current = header_size;
        let mut ifd_offsets = Vec::with_capacity(ifds.len());
        let mut data_offsets = std::collections::BTreeMap::new();

        for ifd in ifds {
            ifd_offsets.push(current);
            current = Self::align(current + Self::ifd_size(ifd, is_big_tiff));
        }

        for (key, data) in external_data {
            data_offsets.insert(*key, current);
            current = Self::align(current + data.len() as u64);
        }

        for (ifd_index, data) in image_data {
            data_offsets.insert((*ifd_index, tags::STRIP_OFFSETS), current);
            current = Self::align(current + data.len() as u64);
        }

        Layout { ifd_offsets, data_offsets, end: current }
    }

    fn write_header(writer: &mut impl Write, is_big_tiff: bool, first_ifd: u64) -> TiffResult<()> {
        writer.write_all(&header::LITTLE_ENDIAN_MARKER)?;
        if is_big_tiff {
            writer.write_all(&header::BIG_TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&header::BIGTIFF_OFFSET_SIZE.to_le_bytes())?;
            writer.write_all(&0u16.to_le_bytes())?;
            writer.write_all(&first_ifd.to_le_bytes())?;
        } else {
            writer.write_all(&header::TIFF_VERSION.to_le_bytes())?;
            writer.write_all(&(first_ifd as u32).to_le_bytes())?;
        }
        Ok(())
    }

    fn write_ifd(
        writer: &mut impl Write,
        ifd: &IFD,
        ifd_index: usize,
        next_offset: u64,
        layout: &Layout,
        is_big_tiff: bool,
    ) -> TiffResult<()> {
        if is_big_tiff {
            writer.write_all(&(ifd.entries.len() as u64).to_le_bytes())?;
        } else {
            writer.write_all(&(ifd.entries.len() as u16).to_le_bytes())?;
        }

        for entry in &ifd.entries {
            let value = layout.data_offsets
                .get(&(ifd_index, entry.tag))
                .copied()
                .unwrap_or(entry.value_offset);
            Self::write_entry(writer, entry, value, is_big_tiff)?;
        }

        if is_big_tiff {
            writer.write_all(&next_offset.to_le_bytes())?;
        } else {
            writer.write_all(&(next_offset as u32).to_le_bytes())?;
        }
        Ok(())
    }

    fn write_entry(writer: &mut impl Write, entry: &IFDEntry, value: u64, is_big_tiff: bool) -> TiffResult<()> {
        writer.write_all(&entry.tag.to_le_bytes())?;
        writer.write_all(&entry.field_type.to_le_bytes())?;
        if is_big_tiff {
            writer.write_all(&entry.count.to_le_bytes())?;
            writer.write_all(&value.to_le_bytes())?;
        } else {
            writer.write_all(&(entry.count as u32).to_le_bytes())?;
            writer.write_all(&(value as u32).to_le_bytes())?;
        }
        Ok(())
    }
}
