//! Affine pixel-to-map transform

use std::fmt;

use super::bbox::BoundingBox;
use super::point::Point;

/// Six-coefficient affine transform in GDAL ordering `[c, a, b, f, d, e]`
///
/// A pixel corner `(col, row)` maps to
/// `x = c + a*col + b*row` and `y = f + d*col + e*row`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// `c`: map X of the top-left corner
    pub origin_x: f64,
    /// `a`: pixel width
    pub pixel_width: f64,
    /// `b`: row rotation
    pub row_rotation: f64,
    /// `f`: map Y of the top-left corner
    pub origin_y: f64,
    /// `d`: column rotation
    pub column_rotation: f64,
    /// `e`: pixel height, negative for north-up images
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Builds a transform from GDAL-ordered coefficients
    pub fn from_gdal(coefficients: [f64; 6]) -> Self {
        let [c, a, b, f, d, e] = coefficients;
        GeoTransform {
            origin_x: c,
            pixel_width: a,
            row_rotation: b,
            origin_y: f,
            column_rotation: d,
            pixel_height: e,
        }
    }

    /// GDAL-ordered coefficients
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.column_rotation,
            self.pixel_height,
        ]
    }

    /// Builds a north-up transform from ModelPixelScale and one ModelTiepoint
    ///
    /// The tiepoint `(i, j, k, x, y, z)` anchors raster position `(i, j)`.
    pub fn from_scale_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Option<Self> {
        if scale.len() < 2 || tiepoint.len() < 6 {
            return None;
        }
        let (sx, sy) = (scale[0], scale[1]);
        Some(GeoTransform {
            origin_x: tiepoint[3] - tiepoint[0] * sx,
            pixel_width: sx,
            row_rotation: 0.0,
            origin_y: tiepoint[4] + tiepoint[1] * sy,
            column_rotation: 0.0,
            pixel_height: -sy,
        })
    }

    /// Builds a transform from a 4x4 ModelTransformation matrix (row-major)
    pub fn from_model_transformation(matrix: &[f64]) -> Option<Self> {
        if matrix.len() < 16 {
            return None;
        }
        Some(GeoTransform {
            origin_x: matrix[3],
            pixel_width: matrix[0],
            row_rotation: matrix[1],
            origin_y: matrix[7],
            column_rotation: matrix[4],
            pixel_height: matrix[5],
        })
    }

    /// Whether the transform has no rotation terms
    pub fn is_north_up(&self) -> bool {
        self.row_rotation == 0.0 && self.column_rotation == 0.0
    }

    /// ModelPixelScale and ModelTiepoint values, for north-up transforms only
    pub fn to_scale_tiepoint(&self) -> Option<([f64; 3], [f64; 6])> {
        if !self.is_north_up() {
            return None;
        }
        Some((
            [self.pixel_width, -self.pixel_height, 0.0],
            [0.0, 0.0, 0.0, self.origin_x, self.origin_y, 0.0],
        ))
    }

    /// Row-major 4x4 ModelTransformation matrix
    pub fn to_model_transformation(&self) -> [f64; 16] {
        [
            self.pixel_width, self.row_rotation, 0.0, self.origin_x,
            self.column_rotation, self.pixel_height, 0.0, self.origin_y,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ]
    }

    /// Maps a pixel-space position to map coordinates
    pub fn apply(&self, col: f64, row: f64) -> Point {
        Point::new(
            self.origin_x + self.pixel_width * col + self.row_rotation * row,
            self.origin_y + self.column_rotation * col + self.pixel_height * row,
        )
    }

    /// Transform of a sub-window whose top-left pixel is `(x, y)`
    ///
    /// Only the origin moves; scale and rotation are kept.
    pub fn window(&self, x: u32, y: u32) -> GeoTransform {
        let origin = self.apply(x as f64, y as f64);
        GeoTransform {
            origin_x: origin.x,
            origin_y: origin.y,
            ..*self
        }
    }

    /// Map extent covered by a `width` x `height` pixel grid
    pub fn bounds(&self, width: u32, height: u32) -> BoundingBox {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(w, 0.0),
            self.apply(w, h),
            self.apply(0.0, h),
        ];
        let mut bbox = BoundingBox::new(corners[0].x, corners[0].y, corners[0].x, corners[0].y);
        for corner in &corners[1..] {
            bbox.include(corner);
        }
        bbox
    }
}

impl fmt::Display for GeoTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [c, a, b, fy, d, e] = self.to_gdal();
        write!(f, "[{}, {}, {}, {}, {}, {}]", c, a, b, fy, d, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_origin_follows_affine() {
        let gt = GeoTransform::from_gdal([500000.0, 10.0, 0.5, 4000000.0, 0.25, -10.0]);
        let win = gt.window(100, 40);
        std::assert_eq!(win.origin_x, 500000.0 + 10.0 * 100.0 + 0.5 * 40.0);
        std::assert_eq!(win.origin_y, 4000000.0 + 0.25 * 100.0 - 10.0 * 40.0);
        std::assert_eq!(win.pixel_width, 10.0);
        std::assert_eq!(win.pixel_height, -10.0);
    }

    #[test]
    fn test_scale_tiepoint_round_trip() {
        let gt = GeoTransform::from_scale_tiepoint(&[30.0, 30.0, 0.0], &[0.0, 0.0, 0.0, 1000.0, 2000.0, 0.0]).unwrap();
        std::assert_eq!(gt.to_gdal(), [1000.0, 30.0, 0.0, 2000.0, 0.0, -30.0]);
        let (scale, tie) = gt.to_scale_tiepoint().unwrap();
        std::assert_eq!(scale, [30.0, 30.0, 0.0]);
        std::assert_eq!(tie[3], 1000.0);
        std::assert_eq!(tie[4], 2000.0);
    }

    #[test]
    fn test_tiepoint_away_from_origin() {
        let gt = GeoTransform::from_scale_tiepoint(&[2.0, 2.0], &[10.0, 5.0, 0.0, 100.0, 50.0, 0.0]).unwrap();
        std::assert_eq!(gt.origin_x, 80.0);
        std::assert_eq!(gt.origin_y, 60.0);
    }

    #[test]
    fn test_rotated_transform_uses_matrix() {
        let gt = GeoTransform::from_gdal([0.0, 1.0, 0.2, 0.0, 0.1, -1.0]);
        std::assert!(gt.to_scale_tiepoint().is_none());
        let back = GeoTransform::from_model_transformation(&gt.to_model_transformation()).unwrap();
        std::assert_eq!(back, gt);
    }

    #[test]
    fn test_bounds() {
        let gt = GeoTransform::from_gdal([100.0, 1.0, 0.0, 200.0, 0.0, -2.0]);
        std::assert_eq!(gt.bounds(10, 5), BoundingBox::new(100.0, 190.0, 110.0, 200.0));
    }
}
