//! Windowed pixel extraction from TIFF images
//!
//! [`ImageExtractor`] reads a rectangular window of selected bands as `f64`
//! samples, delegating to the strip or tile reader according to the image
//! layout.

mod region;
mod layout;
mod chunk;
mod tile_reader;
mod strip_reader;

pub use region::Region;
pub use layout::ImageLayout;
pub use strip_reader::StripReader;
pub use tile_reader::TileReader;

use crate::io::byte_order::ByteOrderHandler;
use crate::io::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};

use chunk::ChunkDecoder;

/// Facade over the strip and tile readers
pub struct ImageExtractor<'a> {
    layout: &'a ImageLayout,
    handler: &'a dyn ByteOrderHandler,
}

impl<'a> ImageExtractor<'a> {
    pub fn new(layout: &'a ImageLayout, handler: &'a dyn ByteOrderHandler) -> Self {
        ImageExtractor { layout, handler }
    }

    /// Reads `region` of the given 0-based bands
    ///
    /// Returns one row-major buffer of `region.width * region.height`
    /// samples per requested band.
    pub fn read_window(
        &self,
        reader: &mut dyn SeekableReader,
        bands: &[usize],
        region: &Region,
    ) -> TiffResult<Vec<Vec<f64>>> {
        if region.width == 0 || region.height == 0
            || region.end_x() > self.layout.width || region.end_y() > self.layout.height
        {
            return Err(TiffError::GenericError(format!(
                "Window {:?} outside {}x{} image", region, self.layout.width, self.layout.height
            )));
        }
        if let Some(&band) = bands.iter().find(|&&b| b >= self.layout.samples_per_pixel as usize) {
            return Err(TiffError::GenericError(format!(
                "Band {} out of range (image has {})", band + 1, self.layout.samples_per_pixel
            )));
        }

        let mut outputs = vec![vec![0.0; region.pixel_count()]; bands.len()];
        let decoder = ChunkDecoder::new(self.layout, self.handler)?;

        if self.layout.tiled {
            TileReader::new(self.layout, decoder).read_window(reader, bands, region, &mut outputs)?;
        } else {
            StripReader::new(self.layout, decoder).read_window(reader, bands, region, &mut outputs)?;
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::io::byte_order::LittleEndianHandler;
    use crate::tiff::constants::{compression, predictor};
    use crate::tiff::SampleType;

    const WIDTH: u32 = 20;
    const HEIGHT: u32 = 18;
    const BANDS: usize = 3;

    fn value(x: u32, y: u32, band: usize) -> u8 {
        (x + 3 * y + 50 * band as u32) as u8
    }

    /// Uncompressed u8 image stored as `chunk_width` x `chunk_height` chunks
    fn image(tiled: bool, planar: bool, chunk_width: u32, chunk_height: u32) -> (ImageLayout, Vec<u8>) {
        let mut layout = ImageLayout {
            width: WIDTH,
            height: HEIGHT,
            samples_per_pixel: BANDS as u16,
            sample_type: SampleType::U8,
            planar,
            compression: compression::NONE,
            predictor: predictor::NONE,
            tiled,
            chunk_width,
            chunk_height,
            offsets: Vec::new(),
            byte_counts: Vec::new(),
        };

        let mut data = Vec::new();
        let planes = if planar { BANDS } else { 1 };
        for plane in 0..planes {
            for cy in 0..layout.chunks_down() {
                for cx in 0..layout.chunks_across() {
                    let start = data.len();
                    for row in 0..layout.chunk_rows(cy) {
                        for col in 0..chunk_width {
                            let (x, y) = (cx * chunk_width + col, cy * chunk_height + row);
                            let bands = if planar { plane..plane + 1 } else { 0..BANDS };
                            for band in bands {
                                let inside = x < WIDTH && y < HEIGHT;
                                data.push(if inside { value(x, y, band) } else { 0 });
                            }
                        }
                    }
                    layout.offsets.push(start as u64);
                    layout.byte_counts.push((data.len() - start) as u64);
                }
            }
        }
        (layout, data)
    }

    fn expected(region: &Region, band: usize) -> Vec<f64> {
        (region.y..region.end_y())
            .flat_map(|y| (region.x..region.end_x()).map(move |x| value(x, y, band) as f64))
            .collect()
    }

    fn read(layout: &ImageLayout, data: Vec<u8>, bands: &[usize], region: &Region) -> TiffResult<Vec<Vec<f64>>> {
        let handler = LittleEndianHandler;
        ImageExtractor::new(layout, &handler).read_window(&mut Cursor::new(data), bands, region)
    }

    #[test]
    fn test_layouts_agree_on_every_window() {
        let layouts = [
            ("tiled chunky", image(true, false, 8, 8)),
            ("tiled planar", image(true, true, 8, 8)),
            ("striped chunky", image(false, false, WIDTH, 5)),
            ("striped planar", image(false, true, WIDTH, 5)),
        ];
        let regions = [
            Region::new(0, 0, WIDTH, HEIGHT),
            Region::new(17, 16, 1, 1),
            Region::new(6, 3, 11, 9),
            Region::new(15, 14, 5, 4),
        ];

        for (name, (layout, data)) in &layouts {
            for region in &regions {
                let values = read(layout, data.clone(), &[0, 1, 2], region).unwrap();
                for band in 0..BANDS {
                    std::assert_eq!(values[band], expected(region, band), "{} band {} {:?}", name, band, region);
                }
            }
        }
    }

    #[test]
    fn test_single_pixel_across_bands() {
        let (layout, data) = image(true, true, 8, 8);
        let values = read(&layout, data, &[0, 1, 2], &Region::new(17, 16, 1, 1)).unwrap();
        std::assert_eq!(values, vec![vec![65.0], vec![115.0], vec![165.0]]);
    }

    #[test]
    fn test_band_order_follows_request() {
        let (layout, data) = image(false, false, WIDTH, 4);
        let region = Region::new(2, 2, 3, 3);
        let values = read(&layout, data, &[2, 0], &region).unwrap();
        std::assert_eq!(values[0], expected(&region, 2));
        std::assert_eq!(values[1], expected(&region, 0));
    }

    #[test]
    fn test_horizontal_predictor_is_undone() {
        let (mut layout, mut data) = image(false, false, WIDTH, HEIGHT);
        let row_bytes = WIDTH as usize * BANDS;
        for row in data.chunks_exact_mut(row_bytes) {
            for i in (BANDS..row_bytes).rev() {
                row[i] = row[i].wrapping_sub(row[i - BANDS]);
            }
        }
        layout.predictor = predictor::HORIZONTAL_DIFFERENCING;

        let region = Region::new(0, 7, WIDTH, 2);
        let values = read(&layout, data, &[1], &region).unwrap();
        std::assert_eq!(values[0], expected(&region, 1));
    }

    #[test]
    fn test_rejects_windows_and_bands_out_of_range() {
        let (layout, data) = image(true, false, 8, 8);
        std::assert!(read(&layout, data.clone(), &[0], &Region::new(18, 0, 4, 1)).is_err());
        std::assert!(read(&layout, data.clone(), &[0], &Region::new(0, 0, 0, 1)).is_err());
        std::assert!(read(&layout, data, &[3], &Region::new(0, 0, 1, 1)).is_err());
    }

    #[test]
    fn test_unsupported_compression_is_reported() {
        let (mut layout, data) = image(false, false, WIDTH, HEIGHT);
        layout.compression = compression::LZW;
        let result = read(&layout, data, &[0], &Region::new(0, 0, 1, 1));
        std::assert!(matches!(result, Err(TiffError::UnsupportedCompression(5))));
    }
}
