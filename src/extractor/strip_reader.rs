//! Strip-based window extraction
//!
//! Stripped TIFFs store full-width bands of rows, so a window touches every
//! strip between its first and last row.

use log::debug;

use crate::io::SeekableReader;
use crate::tiff::errors::TiffResult;

use super::chunk::ChunkDecoder;
use super::layout::ImageLayout;
use super::region::Region;

/// Reads windows from stripped images
pub struct StripReader<'a> {
    layout: &'a ImageLayout,
    decoder: ChunkDecoder<'a>,
}

impl<'a> StripReader<'a> {
    pub(crate) fn new(layout: &'a ImageLayout, decoder: ChunkDecoder<'a>) -> Self {
        StripReader { layout, decoder }
    }

    /// Fills `outputs` (one per band) with the region's samples
    pub fn read_window(
        &self,
        reader: &mut dyn SeekableReader,
        bands: &[usize],
        region: &Region,
        outputs: &mut [Vec<f64>],
    ) -> TiffResult<()> {
        let rows_per_strip = self.layout.chunk_height;
        let first = region.y / rows_per_strip;
        let last = (region.end_y() - 1) / rows_per_strip;
        debug!("Reading strips {}..={} for {:?}", first, last, region);

        for strip in first..=last {
            let rows = self.layout.chunk_rows(strip);
            let strip_y = strip * rows_per_strip;

            if self.layout.planar {
                for (i, &band) in bands.iter().enumerate() {
                    let index = band * self.layout.chunks_per_plane() + strip as usize;
                    let data = self.decoder.decode(reader, index, rows)?;
                    self.decoder.copy_to_window(
                        &data, 0, strip_y, rows, region, &[0], std::slice::from_mut(&mut outputs[i]));
                }
            } else {
                let data = self.decoder.decode(reader, strip as usize, rows)?;
                self.decoder.copy_to_window(&data, 0, strip_y, rows, region, bands, outputs);
            }
        }

        Ok(())
    }
}
