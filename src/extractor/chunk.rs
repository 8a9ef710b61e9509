//! Chunk decoding shared by the strip and tile readers

use log::warn;
use std::io::SeekFrom;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::io::byte_order::ByteOrderHandler;
use crate::io::SeekableReader;
use crate::tiff::constants::predictor;
use crate::tiff::errors::{TiffError, TiffResult};

use super::layout::ImageLayout;
use super::region::Region;

/// Reads, decompresses and un-predicts chunks of one image
pub(crate) struct ChunkDecoder<'a> {
    layout: &'a ImageLayout,
    handler: &'a dyn ByteOrderHandler,
    compression: Box<dyn CompressionHandler>,
}

impl<'a> ChunkDecoder<'a> {
    pub fn new(layout: &'a ImageLayout, handler: &'a dyn ByteOrderHandler) -> TiffResult<Self> {
        match layout.predictor {
            predictor::NONE => {}
            predictor::HORIZONTAL_DIFFERENCING if !layout.sample_type.is_float() => {}
            other => return Err(TiffError::UnsupportedPredictor(other)),
        }

        Ok(ChunkDecoder {
            layout,
            handler,
            compression: CompressionFactory::create_handler(layout.compression)?,
        })
    }

    /// Decodes chunk `index` holding `rows` rows of `layout.chunk_width` pixels
    pub fn decode(&self, reader: &mut dyn SeekableReader, index: usize, rows: u32) -> TiffResult<Vec<u8>> {
        let offset = self.layout.offsets[index];
        let byte_count = self.layout.byte_counts[index] as usize;

        reader.seek(SeekFrom::Start(offset))?;
        let mut raw = vec![0u8; byte_count];
        reader.read_exact(&mut raw)?;

        let mut data = self.compression.decompress(&raw)?;

        let row_bytes = self.layout.chunk_width as usize
            * self.layout.chunk_samples()
            * self.layout.sample_type.bytes();
        let expected = row_bytes * rows as usize;
        if data.len() < expected {
            warn!("Chunk {} holds {} bytes, expected {}; padding with zeros", index, data.len(), expected);
            data.resize(expected, 0);
        }

        if self.layout.predictor == predictor::HORIZONTAL_DIFFERENCING {
            self.undo_horizontal_differencing(&mut data[..expected], row_bytes);
        }

        Ok(data)
    }

    /// Reverses TIFF predictor 2 in place, row by row
    fn undo_horizontal_differencing(&self, data: &mut [u8], row_bytes: usize) {
        let size = self.layout.sample_type.bytes();
        let stride = self.layout.chunk_samples() * size;

        if size == 1 {
            for row in data.chunks_exact_mut(row_bytes) {
                for i in stride..row.len() {
                    row[i] = row[i].wrapping_add(row[i - stride]);
                }
            }
            return;
        }

        let mask = if size == 8 { u64::MAX } else { (1u64 << (size * 8)) - 1 };
        for row in data.chunks_exact_mut(row_bytes) {
            let mut pos = stride;
            while pos + size <= row.len() {
                let prev = self.handler.get_uint(&row[pos - stride..pos - stride + size], size);
                let cur = self.handler.get_uint(&row[pos..pos + size], size);
                self.handler.put_uint(&mut row[pos..pos + size], cur.wrapping_add(prev) & mask, size);
                pos += size;
            }
        }
    }

    /// Copies the pixels of a decoded chunk that fall inside `region`
    ///
    /// `sample_offsets[i]` is the sample index within a chunk pixel that
    /// feeds `outputs[i]`; outputs are row-major over the region.
    pub fn copy_to_window(
        &self,
        data: &[u8],
        chunk_x: u32,
        chunk_y: u32,
        rows: u32,
        region: &Region,
        sample_offsets: &[usize],
        outputs: &mut [Vec<f64>],
    ) {
        let size = self.layout.sample_type.bytes();
        let samples = self.layout.chunk_samples();
        let chunk_width = self.layout.chunk_width;

        let x_start = chunk_x.max(region.x);
        let x_end = (chunk_x + chunk_width).min(region.end_x()).min(self.layout.width);
        let y_start = chunk_y.max(region.y);
        let y_end = (chunk_y + rows).min(region.end_y());

        for gy in y_start..y_end {
            let local_row = (gy - chunk_y) as usize;
            let out_row = (gy - region.y) as usize * region.width as usize;
            for gx in x_start..x_end {
                let pixel = (local_row * chunk_width as usize + (gx - chunk_x) as usize) * samples;
                let out_index = out_row + (gx - region.x) as usize;
                for (offset, output) in sample_offsets.iter().zip(outputs.iter_mut()) {
                    let start = (pixel + offset) * size;
                    output[out_index] = self.layout.sample_type.decode(&data[start..start + size], self.handler);
                }
            }
        }
    }
}
