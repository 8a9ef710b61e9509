//! TIFF file reader implementation
//!
//! This module implements the TIFF/BigTIFF directory reader that uses the
//! Strategy pattern to handle different byte orders, plus typed accessors
//! for tag values (integers, doubles and ASCII strings).

use log::{debug, warn};
use std::io::SeekFrom;

use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::io::SeekableReader;
use crate::tiff::constants::{field_types, header};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFDEntry, IFD};
use crate::tiff::types::TIFF;
use crate::utils::string_utils;

/// Upper bound on the IFD chain length, guards against offset loops
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF directory structures
pub struct TiffReader {
    /// Current byte order handler
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
    /// Size of the underlying stream, used to validate offsets
    file_size: u64,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            is_big_tiff: false,
            file_size: u64::MAX,
        }
    }

    /// Returns the byte order handler, failing if no header was read yet
    pub fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Reads the header and the whole IFD chain
    ///
    /// 1. Detect byte order (little/big endian)
    /// 2. Check for TIFF or BigTIFF format
    /// 3. Read all IFDs (Image File Directories)
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;
        self.file_size = Self::stream_len(reader)?;

        let byte_order = ByteOrder::detect(reader)?;
        debug!("Detected byte order: {}", byte_order.name());
        self.byte_order_handler = Some(byte_order.create_handler());

        let handler = self.handler()?;
        let version = handler.read_u16(reader)?;
        let is_big_tiff = match version {
            header::TIFF_VERSION => false,
            header::BIG_TIFF_VERSION => {
                let offset_size = handler.read_u16(reader)?;
                let zeros = handler.read_u16(reader)?;
                if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
                    return Err(TiffError::InvalidBigTIFFHeader);
                }
                true
            }
            _ => return Err(TiffError::UnsupportedVersion(version)),
        };

        let first_ifd_offset = if is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };
        self.is_big_tiff = is_big_tiff;
        debug!("First IFD offset: {} (BigTIFF: {})", first_ifd_offset, is_big_tiff);

        if first_ifd_offset < 8 || first_ifd_offset >= self.file_size {
            return Err(TiffError::GenericError(format!(
                "Invalid IFD offset: {} (file size: {})",
                first_ifd_offset, self.file_size
            )));
        }

        let mut tiff = TIFF::new(is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset)?;
        if tiff.ifds.is_empty() {
            return Err(TiffError::NoImageDirectory);
        }

        debug!("Read {} IFDs", tiff.ifds.len());
        Ok(tiff)
    }

    fn stream_len(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
        let current = reader.stream_position()?;
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(current))?;
        Ok(len)
    }

    /// Reads a chain of IFDs starting from the given offset
    ///
    /// A damaged link ends the chain; directories read so far are kept.
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            if ifd_offset >= self.file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, self.file_size);
                break;
            }

            let (ifd, next_offset) = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(result) => result,
                Err(e) => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };
            ifds.push(ifd);

            if next_offset != 0 && (next_offset >= self.file_size || next_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_offset);
                break;
            }
            ifd_offset = next_offset;
        }

        Ok(ifds)
    }

    /// Reads an IFD and the offset of the next one
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<(IFD, u64)> {
        let handler = self.handler()?;
        reader.seek(SeekFrom::Start(offset))?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };

        let entry_size = if self.is_big_tiff { 20 } else { 12 };
        if offset.saturating_add(entry_count.saturating_mul(entry_size)) > self.file_size {
            return Err(TiffError::GenericError(format!(
                "IFD at {} declares {} entries past end of file", offset, entry_count
            )));
        }

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader, handler)?);
        }

        let next_offset = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        debug!("IFD #{} at {}: {} entries, next at {}", number, offset, ifd.entries.len(), next_offset);
        Ok((ifd, next_offset))
    }

    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader, handler: &dyn ByteOrderHandler) -> TiffResult<IFDEntry> {
        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let (count, value_offset) = if self.is_big_tiff {
            (handler.read_u64(reader)?, handler.read_u64(reader)?)
        } else {
            (handler.read_u32(reader)? as u64, handler.read_u32(reader)? as u64)
        };

        Ok(IFDEntry::new(tag, field_type, count, value_offset))
    }

    /// Reads the raw value bytes of an entry, inline or external
    fn read_entry_bytes(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> TiffResult<Vec<u8>> {
        let handler = self.handler()?;
        let byte_len = entry.byte_len();

        if entry.is_value_inline(self.is_big_tiff) {
            let mut bytes = handler.inline_bytes(entry.value_offset, self.is_big_tiff);
            bytes.truncate(byte_len as usize);
            return Ok(bytes);
        }

        if entry.value_offset.saturating_add(byte_len) > self.file_size {
            return Err(TiffError::GenericError(format!(
                "Tag {} data ({} bytes at {}) exceeds file size", entry.tag, byte_len, entry.value_offset
            )));
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut bytes = vec![0u8; byte_len as usize];
        reader.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Reads a tag's values as unsigned integers
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `ifd` - The IFD containing the tag
    /// * `tag` - The tag number to read
    ///
    /// # Returns
    /// One u64 per value; fails with `TagNotFound` when the tag is absent
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let size = match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => 1,
            field_types::SHORT | field_types::SSHORT => 2,
            field_types::LONG | field_types::SLONG => 4,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
            other => return Err(TiffError::UnsupportedFieldType(other)),
        };

        let bytes = self.read_entry_bytes(reader, entry)?;
        let handler = self.handler()?;
        Ok(bytes.chunks_exact(size).map(|chunk| handler.get_uint(chunk, size)).collect())
    }

    /// Reads the first value of an integer tag, if present
    pub fn read_tag_u64(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Option<u64>> {
        if !ifd.has_tag(tag) {
            return Ok(None);
        }
        Ok(self.read_tag_values(reader, ifd, tag)?.first().copied())
    }

    /// Reads a tag's values as doubles
    ///
    /// Accepts DOUBLE, FLOAT, RATIONAL and the integer field types.
    pub fn read_tag_doubles(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<f64>> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        match entry.field_type {
            field_types::DOUBLE | field_types::FLOAT | field_types::RATIONAL | field_types::SRATIONAL => {}
            _ => {
                return Ok(self.read_tag_values(reader, ifd, tag)?
                    .into_iter()
                    .map(|v| v as f64)
                    .collect());
            }
        }

        let bytes = self.read_entry_bytes(reader, entry)?;
        let handler = self.handler()?;
        let values = match entry.field_type {
            field_types::DOUBLE => bytes.chunks_exact(8)
                .map(|c| f64::from_bits(handler.get_uint(c, 8)))
                .collect(),
            field_types::FLOAT => bytes.chunks_exact(4)
                .map(|c| f32::from_bits(handler.get_uint(c, 4) as u32) as f64)
                .collect(),
            field_types::RATIONAL => bytes.chunks_exact(8)
                .map(|c| {
                    let num = handler.get_uint(&c[..4], 4) as f64;
                    let den = handler.get_uint(&c[4..], 4) as f64;
                    if den == 0.0 { 0.0 } else { num / den }
                })
                .collect(),
            _ => bytes.chunks_exact(8)
                .map(|c| {
                    let num = handler.get_uint(&c[..4], 4) as u32 as i32 as f64;
                    let den = handler.get_uint(&c[4..], 4) as u32 as i32 as f64;
                    if den == 0.0 { 0.0 } else { num / den }
                })
                .collect(),
        };

        Ok(values)
    }

    /// Reads an ASCII tag, with trailing NULs removed
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<String> {
        let entry = ifd.get_entry(tag).ok_or(TiffError::TagNotFound(tag))?;
        let mut bytes = self.read_entry_bytes(reader, entry)?;
        string_utils::trim_trailing_nulls(&mut bytes);
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
