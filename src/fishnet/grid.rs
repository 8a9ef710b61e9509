//! Grid partition of an image into tiles

use std::collections::BTreeMap;
use std::fmt;

use image::RgbImage;

use crate::coordinate::{Crs, GeoTransform};
use crate::errors::{FishnetError, FishnetResult};
use crate::extractor::Region;
use crate::vector::FieldValue;

/// Placement of one tile in pixel space, with 1-based row and column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCell {
    pub row: usize,
    pub col: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Regular tile extent along one axis: `extent / parts`, 0 when `parts`
/// exceeds the extent
pub fn tile_extent(extent: u32, parts: usize) -> u32 {
    u64::try_from(parts)
        .ok()
        .and_then(|parts| u64::from(extent).checked_div(parts))
        .map_or(0, |size| size as u32)
}

/// Indices along one axis that can hold a non-empty tile
///
/// With a zero regular extent only the last index, which absorbs the
/// whole remainder, is kept.
fn axis_indices(tile_extent: u32, parts: usize) -> std::ops::Range<usize> {
    if tile_extent == 0 {
        parts - 1..parts
    } else {
        0..parts
    }
}

/// Splits a `width` x `height` image into a `rows` x `cols` grid
///
/// Every tile is `width / cols` by `height / rows` pixels except the last
/// column and row, which absorb the remainder. Empty tiles are left out.
pub fn grid_cells(width: u32, height: u32, rows: usize, cols: usize) -> FishnetResult<Vec<TileCell>> {
    if rows == 0 || cols == 0 {
        return Err(FishnetError::InvalidGrid(rows, cols));
    }

    let tile_width = tile_extent(width, cols);
    let tile_height = tile_extent(height, rows);
    let row_range = axis_indices(tile_height, rows);
    let col_range = axis_indices(tile_width, cols);
    // a non-zero tile extent bounds the index by the image extent
    let mut cells = Vec::with_capacity(row_range.len().saturating_mul(col_range.len()));

    for row in row_range {
        let y = row as u32 * tile_height;
        let h = if row == rows - 1 { height - y } else { tile_height };
        if h == 0 {
            continue;
        }
        for col in col_range.clone() {
            let x = col as u32 * tile_width;
            let w = if col == cols - 1 { width - x } else { tile_width };
            if w == 0 {
                continue;
            }
            cells.push(TileCell { row: row + 1, col: col + 1, x, y, width: w, height: h });
        }
    }

    Ok(cells)
}

/// Summary of the grid for a loaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridParameters {
    pub rows: usize,
    pub cols: usize,
    pub grid_count: usize,
    /// Regular tile size `(width / cols, height / rows)`
    pub tile_size: (u32, u32),
    pub image_size: (u32, u32),
}

impl fmt::Display for GridParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} grid ({} tiles of {}x{} px) over {}x{} px",
            self.rows, self.cols, self.grid_count,
            self.tile_size.0, self.tile_size.1,
            self.image_size.0, self.image_size.1
        )
    }
}

/// One cell of the generated grid
#[derive(Debug, Clone)]
pub struct GridTile {
    pub cell: TileCell,
    /// Crop of the display bitmap
    pub image_data: RgbImage,
    /// Pixel window in the source raster, for geo-referenced sources
    pub geo_window: Option<Region>,
    /// Source transform moved to the tile origin
    pub geo_transform: Option<GeoTransform>,
    pub geo_crs: Option<Crs>,
    /// Caller-supplied values exported as extra attribute columns
    pub attributes: BTreeMap<String, FieldValue>,
}

impl GridTile {
    /// `(x, y, width, height)` in pixel space
    pub fn position(&self) -> (u32, u32, u32, u32) {
        (self.cell.x, self.cell.y, self.cell.width, self.cell.height)
    }

    pub fn row(&self) -> usize {
        self.cell.row
    }

    pub fn col(&self) -> usize {
        self.cell.col
    }

    pub fn is_georeferenced(&self) -> bool {
        self.geo_transform.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(cells: &[TileCell], width: u32, height: u32) -> Vec<u32> {
        let mut hits = vec![0u32; (width * height) as usize];
        for c in cells {
            for y in c.y..c.y + c.height {
                for x in c.x..c.x + c.width {
                    hits[(y * width + x) as usize] += 1;
                }
            }
        }
        hits
    }

    #[test]
    fn test_remainder_goes_to_last_row_and_column() {
        let cells = grid_cells(1001, 750, 3, 4).unwrap();
        std::assert_eq!(cells.len(), 12);
        std::assert_eq!(cells[3], TileCell { row: 1, col: 4, x: 750, y: 0, width: 251, height: 250 });
        std::assert_eq!(cells[11].height, 250);
        std::assert!(cells.iter().filter(|c| c.col < 4).all(|c| c.width == 250));
    }

    #[test]
    fn test_tiles_cover_image_exactly_once() {
        for (w, h, rows, cols) in [(17, 9, 2, 3), (10, 10, 3, 3), (5, 7, 5, 1), (64, 33, 4, 7)] {
            let cells = grid_cells(w, h, rows, cols).unwrap();
            std::assert_eq!(cells.len(), rows * cols);
            std::assert!(covered(&cells, w, h).iter().all(|&n| n == 1));
        }
    }

    #[test]
    fn test_more_columns_than_pixels_skips_empty_tiles() {
        let cells = grid_cells(3, 2, 1, 5).unwrap();
        // tile width 0: only the last column (absorbing all 3 px) remains
        std::assert_eq!(cells.len(), 1);
        std::assert_eq!((cells[0].x, cells[0].width), (0, 3));
        std::assert!(covered(&cells, 3, 2).iter().all(|&n| n == 1));
    }

    #[test]
    fn test_huge_grid_keeps_only_reachable_cells() {
        let cells = grid_cells(1000, 750, 1_000_000, 1_000_000).unwrap();
        std::assert_eq!(cells, vec![TileCell { row: 1_000_000, col: 1_000_000, x: 0, y: 0, width: 1000, height: 750 }]);

        let wide = grid_cells(10, 4, 2, 1usize << 40).unwrap();
        std::assert_eq!(wide.len(), 2);
        std::assert!(wide.iter().all(|c| c.col == 1usize << 40 && c.width == 10 && c.height == 2));
    }

    #[test]
    fn test_tile_extent_never_truncates_parts() {
        std::assert_eq!(tile_extent(1000, 3), 333);
        std::assert_eq!(tile_extent(1000, 1001), 0);
        std::assert_eq!(tile_extent(u32::MAX, usize::MAX), 0);
    }

    #[test]
    fn test_invalid_grid() {
        std::assert!(matches!(grid_cells(10, 10, 0, 2), Err(FishnetError::InvalidGrid(0, 2))));
        std::assert!(grid_cells(10, 10, 2, 0).is_err());
    }
}
