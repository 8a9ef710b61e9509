//! Grid overview rendering

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use log::warn;

use super::grid::GridTile;

/// Embedded label font, DejaVu Sans Mono
const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSansMono.ttf");

/// Label font size in pixels per unit of label scale
const FONT_SIZE_UNIT: f32 = 6.0;

const GRID_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Raw RGB888 pixels ready for a UI toolkit image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiImage {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub bytes_per_line: u32,
    pub format: &'static str,
}

impl UiImage {
    pub fn from_rgb(image: &RgbImage) -> Self {
        UiImage {
            data: image.as_raw().clone(),
            width: image.width(),
            height: image.height(),
            bytes_per_line: image.width() * 3,
            format: "RGB888",
        }
    }
}

/// Border width and label scale for an image `width` pixels wide
pub fn overview_style(width: u32) -> (u32, u32) {
    match width {
        0..=999 => (2, 2),
        1000..=2999 => (3, 3),
        3000..=5999 => (4, 4),
        _ => (6, 6),
    }
}

/// Label font size for an image `width` pixels wide
pub fn label_scale(width: u32) -> PxScale {
    let (_, scale) = overview_style(width);
    PxScale::from(FONT_SIZE_UNIT * scale as f32)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

/// Draws the outline of the rectangle spanning `[x, x + w] x [y, y + h]`
/// with lines `line` pixels thick, inside the rectangle
fn draw_outline(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, line: u32) {
    let (outer_w, outer_h) = (w.saturating_add(1), h.saturating_add(1));
    for inset in 0..line {
        let shrink = 2 * inset;
        if outer_w <= shrink || outer_h <= shrink {
            break;
        }
        let rect = Rect::at(to_i32(x + inset), to_i32(y + inset)).of_size(outer_w - shrink, outer_h - shrink);
        draw_hollow_rect_mut(image, rect, GRID_COLOR);
    }
}

/// Copies `base` and draws the tile borders and 1-based tile numbers on it
pub fn render_overview(base: &RgbImage, tiles: &[GridTile]) -> RgbImage {
    let mut overview = base.clone();
    let (line, _) = overview_style(base.width());
    let scale = label_scale(base.width());

    let font = match FontRef::try_from_slice(FONT_DATA) {
        Ok(font) => Some(font),
        Err(e) => {
            warn!("Failed to load label font, drawing borders only: {}", e);
            None
        }
    };

    for (i, tile) in tiles.iter().enumerate() {
        let (x, y, w, h) = tile.position();
        draw_outline(&mut overview, x, y, w, h, line);

        if let Some(font) = &font {
            let label = (i + 1).to_string();
            let (text_w, text_h) = text_size(scale, font, &label);
            let background = Rect::at(to_i32(x + 2), to_i32(y + 2)).of_size(text_w + 4, text_h + 4);
            draw_filled_rect_mut(&mut overview, background, LABEL_BACKGROUND);
            draw_text_mut(&mut overview, GRID_COLOR, to_i32(x + 4), to_i32(y + 4), scale, font, &label);
        }
    }

    overview
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::fishnet::grid::grid_cells;

    fn tiles(image: &RgbImage, rows: usize, cols: usize) -> Vec<GridTile> {
        grid_cells(image.width(), image.height(), rows, cols)
            .unwrap()
            .into_iter()
            .map(|cell| GridTile {
                cell,
                image_data: RgbImage::new(cell.width, cell.height),
                geo_window: None,
                geo_transform: None,
                geo_crs: None,
                attributes: BTreeMap::new(),
            })
            .collect()
    }

    #[test]
    fn test_style_grows_with_width() {
        std::assert_eq!(overview_style(999), (2, 2));
        std::assert_eq!(overview_style(1000), (3, 3));
        std::assert_eq!(overview_style(5999), (4, 4));
        std::assert_eq!(overview_style(6000), (6, 6));
        std::assert_eq!(label_scale(500), PxScale::from(12.0));
        std::assert!(label_scale(8000).y > label_scale(2000).y);
    }

    #[test]
    fn test_overview_draws_borders_and_labels() {
        let base = RgbImage::from_pixel(100, 80, Rgb([0, 0, 64]));
        let grid = tiles(&base, 2, 2);
        let overview = render_overview(&base, &grid);

        std::assert_eq!(overview.dimensions(), base.dimensions());
        // border of the second tile starts at x = 50
        std::assert_eq!(*overview.get_pixel(50, 30), GRID_COLOR);
        std::assert_eq!(*overview.get_pixel(51, 30), GRID_COLOR);
        std::assert_eq!(*overview.get_pixel(1, 1), GRID_COLOR);
        // label "1": white box from (2, 2), red glyph blended in from (4, 4)
        std::assert_eq!(*overview.get_pixel(2, 2), LABEL_BACKGROUND);
        let font = FontRef::try_from_slice(FONT_DATA).unwrap();
        let (text_w, text_h) = text_size(label_scale(100), &font, "1");
        std::assert!(text_w > 0 && text_h > 0);
        let inked = (4..4 + text_w)
            .flat_map(|x| (4..4 + text_h).map(move |y| (x, y)))
            .filter(|&(x, y)| {
                let p = overview.get_pixel(x, y);
                p[0] == 255 && p[1] < 255
            })
            .count();
        std::assert!(inked > 0);
        // interior stays untouched and the base is unmodified
        std::assert_eq!(*overview.get_pixel(30, 30), Rgb([0, 0, 64]));
        std::assert_eq!(*base.get_pixel(50, 30), Rgb([0, 0, 64]));
    }

    #[test]
    fn test_ui_image_layout() {
        let image = RgbImage::from_pixel(7, 3, Rgb([1, 2, 3]));
        let ui = UiImage::from_rgb(&image);
        std::assert_eq!(ui.bytes_per_line, 21);
        std::assert_eq!(ui.data.len(), 63);
        std::assert_eq!(ui.format, "RGB888");
    }
}
