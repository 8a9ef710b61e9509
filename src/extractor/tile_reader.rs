//! Tile-based window extraction
//!
//! Tiled TIFFs store fixed-size rectangles, padded at the right and bottom
//! edges, so a window only decodes the tiles it intersects.

use log::debug;

use crate::io::SeekableReader;
use crate::tiff::errors::TiffResult;

use super::chunk::ChunkDecoder;
use super::layout::ImageLayout;
use super::region::Region;

/// Reads windows from tiled images
pub struct TileReader<'a> {
    layout: &'a ImageLayout,
    decoder: ChunkDecoder<'a>,
}

impl<'a> TileReader<'a> {
    pub(crate) fn new(layout: &'a ImageLayout, decoder: ChunkDecoder<'a>) -> Self {
        TileReader { layout, decoder }
    }

    /// Fills `outputs` (one per band) with the region's samples
    pub fn read_window(
        &self,
        reader: &mut dyn SeekableReader,
        bands: &[usize],
        region: &Region,
        outputs: &mut [Vec<f64>],
    ) -> TiffResult<()> {
        let (tw, th) = (self.layout.chunk_width, self.layout.chunk_height);
        let across = self.layout.chunks_across() as usize;
        let (tx0, tx1) = (region.x / tw, (region.end_x() - 1) / tw);
        let (ty0, ty1) = (region.y / th, (region.end_y() - 1) / th);
        debug!("Reading tiles ({},{})..=({},{}) for {:?}", tx0, ty0, tx1, ty1, region);

        for ty in ty0..=ty1 {
            for tx in tx0..=tx1 {
                let tile = ty as usize * across + tx as usize;
                let (x, y) = (tx * tw, ty * th);

                if self.layout.planar {
                    for (i, &band) in bands.iter().enumerate() {
                        let index = band * self.layout.chunks_per_plane() + tile;
                        let data = self.decoder.decode(reader, index, th)?;
                        self.decoder.copy_to_window(
                            &data, x, y, th, region, &[0], std::slice::from_mut(&mut outputs[i]));
                    }
                } else {
                    let data = self.decoder.decode(reader, tile, th)?;
                    self.decoder.copy_to_window(&data, x, y, th, region, bands, outputs);
                }
            }
        }

        Ok(())
    }
}
