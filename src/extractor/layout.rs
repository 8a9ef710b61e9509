//! Image layout resolution
//!
//! Collects everything needed to locate and decode pixel chunks of one
//! image directory: geometry, sample layout, compression, predictor and
//! the strip or tile tables.

use log::debug;

use crate::io::SeekableReader;
use crate::tiff::constants::{compression, planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::sample::SampleType;

/// Resolved storage layout of one image directory
#[derive(Debug, Clone)]
pub struct ImageLayout {
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u16,
    pub sample_type: SampleType,
    /// Samples stored in separate planes (PlanarConfiguration = 2)
    pub planar: bool,
    pub compression: u16,
    pub predictor: u16,
    /// Whether chunks are tiles rather than strips
    pub tiled: bool,
    /// Chunk width; the image width for strips
    pub chunk_width: u32,
    /// Chunk height; RowsPerStrip for strips
    pub chunk_height: u32,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
}

impl ImageLayout {
    /// Reads the layout tags of a directory
    pub fn from_ifd(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Self> {
        let width = tiff_reader.read_tag_u64(reader, ifd, tags::IMAGE_WIDTH)?
            .ok_or(TiffError::MissingDimensions)? as u32;
        let height = tiff_reader.read_tag_u64(reader, ifd, tags::IMAGE_LENGTH)?
            .ok_or(TiffError::MissingDimensions)? as u32;
        if width == 0 || height == 0 {
            return Err(TiffError::MissingDimensions);
        }

        let samples_per_pixel = tiff_reader.read_tag_u64(reader, ifd, tags::SAMPLES_PER_PIXEL)?
            .unwrap_or(1) as u16;
        if samples_per_pixel == 0 {
            return Err(TiffError::GenericError("SamplesPerPixel is 0".to_string()));
        }

        let bits = if ifd.has_tag(tags::BITS_PER_SAMPLE) {
            tiff_reader.read_tag_values(reader, ifd, tags::BITS_PER_SAMPLE)?
        } else {
            vec![1]
        };
        let formats = if ifd.has_tag(tags::SAMPLE_FORMAT) {
            tiff_reader.read_tag_values(reader, ifd, tags::SAMPLE_FORMAT)?
        } else {
            vec![sample_format::UNSIGNED as u64]
        };

        let first_bits = bits.first().copied().unwrap_or(1) as u16;
        let first_format = formats.first().copied().unwrap_or(1) as u16;
        if bits.iter().any(|&b| b as u16 != first_bits) || formats.iter().any(|&f| f as u16 != first_format) {
            return Err(TiffError::GenericError("Mixed sample types are not supported".to_string()));
        }
        let sample_type = SampleType::from_tiff(first_format, first_bits)?;

        let planar = tiff_reader.read_tag_u64(reader, ifd, tags::PLANAR_CONFIGURATION)?
            .map(|v| v as u16 == planar_config::PLANAR)
            .unwrap_or(false);
        let compression = tiff_reader.read_tag_u64(reader, ifd, tags::COMPRESSION)?
            .unwrap_or(compression::NONE as u64) as u16;
        let predictor = tiff_reader.read_tag_u64(reader, ifd, tags::PREDICTOR)?
            .unwrap_or(predictor::NONE as u64) as u16;

        let tiled = ifd.is_tiled();
        let (chunk_width, chunk_height, offsets, byte_counts) = if tiled {
            let tw = tiff_reader.read_tag_u64(reader, ifd, tags::TILE_WIDTH)?
                .ok_or(TiffError::TagNotFound(tags::TILE_WIDTH))? as u32;
            let th = tiff_reader.read_tag_u64(reader, ifd, tags::TILE_LENGTH)?
                .ok_or(TiffError::TagNotFound(tags::TILE_LENGTH))? as u32;
            (
                tw,
                th,
                tiff_reader.read_tag_values(reader, ifd, tags::TILE_OFFSETS)?,
                tiff_reader.read_tag_values(reader, ifd, tags::TILE_BYTE_COUNTS)?,
            )
        } else {
            let rows_per_strip = tiff_reader.read_tag_u64(reader, ifd, tags::ROWS_PER_STRIP)?
                .map(|v| (v as u32).min(height))
                .unwrap_or(height);
            (
                width,
                rows_per_strip,
                tiff_reader.read_tag_values(reader, ifd, tags::STRIP_OFFSETS)?,
                tiff_reader.read_tag_values(reader, ifd, tags::STRIP_BYTE_COUNTS)?,
            )
        };

        if chunk_width == 0 || chunk_height == 0 {
            return Err(TiffError::GenericError("Zero-sized strip or tile".to_string()));
        }

        let layout = ImageLayout {
            width,
            height,
            samples_per_pixel,
            sample_type,
            planar,
            compression,
            predictor,
            tiled,
            chunk_width,
            chunk_height,
            offsets,
            byte_counts,
        };

        let expected = layout.chunk_count();
        if layout.offsets.len() < expected || layout.byte_counts.len() < expected {
            return Err(TiffError::GenericError(format!(
                "Expected {} chunks, found {} offsets and {} byte counts",
                expected, layout.offsets.len(), layout.byte_counts.len()
            )));
        }

        debug!(
            "Layout {}x{}, {} x {}, {} {}x{}, compression {}, predictor {}, planar {}",
            width, height, samples_per_pixel, sample_type,
            if tiled { "tiles" } else { "strips" }, chunk_width, chunk_height,
            compression, predictor, planar
        );
        Ok(layout)
    }

    /// Chunks per row of chunks
    pub fn chunks_across(&self) -> u32 {
        self.width.div_ceil(self.chunk_width)
    }

    /// Rows of chunks
    pub fn chunks_down(&self) -> u32 {
        self.height.div_ceil(self.chunk_height)
    }

    /// Chunks holding one sample plane (all samples for chunky data)
    pub fn chunks_per_plane(&self) -> usize {
        self.chunks_across() as usize * self.chunks_down() as usize
    }

    /// Total number of chunks the tables must describe
    pub fn chunk_count(&self) -> usize {
        if self.planar {
            self.chunks_per_plane() * self.samples_per_pixel as usize
        } else {
            self.chunks_per_plane()
        }
    }

    /// Samples per pixel inside one chunk
    pub fn chunk_samples(&self) -> usize {
        if self.planar { 1 } else { self.samples_per_pixel as usize }
    }

    /// Rows actually stored in the chunk at chunk-row `cy`
    ///
    /// Tiles are always full height; the last strip may be shorter.
    pub fn chunk_rows(&self, cy: u32) -> u32 {
        if self.tiled {
            self.chunk_height
        } else {
            self.chunk_height.min(self.height - cy * self.chunk_height)
        }
    }
}
