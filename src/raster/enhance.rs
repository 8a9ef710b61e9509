//! Display normalization
//!
//! Turns raw band samples into an 8-bit display array with a percentile
//! stretch. This is the only conversion from raw values to displayable
//! pixels and runs once, when a raster is loaded.

use image::RgbImage;
use log::debug;

use crate::config::DisplayOptions;
use crate::errors::{FishnetError, FishnetResult};

/// Range below which a stretch window is considered degenerate
const MIN_RANGE: f64 = 1e-4;

/// Side of the placeholder returned for empty input
const EMPTY_SIDE: usize = 10;

/// Samples of a raster array
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    U8(Vec<u8>),
    F64(Vec<f64>),
}

/// Pixel-interleaved `[height, width, channels]` array
#[derive(Debug, Clone, PartialEq)]
pub struct RasterArray {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub data: ArrayData,
}

impl RasterArray {
    pub fn from_u8(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Self {
        RasterArray { width, height, channels, data: ArrayData::U8(data) }
    }

    pub fn from_f64(width: usize, height: usize, channels: usize, data: Vec<f64>) -> Self {
        RasterArray { width, height, channels, data: ArrayData::F64(data) }
    }

    /// Interleaves per-band buffers into one array
    ///
    /// Every band must hold `width * height` samples.
    pub fn stack(width: usize, height: usize, bands: &[&[f64]]) -> FishnetResult<Self> {
        let pixels = width * height;
        if let Some(band) = bands.iter().find(|b| b.len() != pixels) {
            return Err(FishnetError::Generic(format!(
                "Band holds {} samples, expected {}", band.len(), pixels
            )));
        }

        let mut data = Vec::with_capacity(pixels * bands.len());
        for i in 0..pixels {
            data.extend(bands.iter().map(|band| band[i]));
        }
        Ok(RasterArray::from_f64(width, height, bands.len(), data))
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ArrayData::U8(d) => d.len(),
            ArrayData::F64(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0 || self.width == 0 || self.height == 0
    }

    /// Converts a 3-channel u8 array into an RGB bitmap
    pub fn into_rgb_image(self) -> FishnetResult<RgbImage> {
        match self.data {
            ArrayData::U8(data) if self.channels == 3 => {
                RgbImage::from_raw(self.width as u32, self.height as u32, data).ok_or_else(|| {
                    FishnetError::Generic("Array size does not match its dimensions".to_string())
                })
            }
            _ => Err(FishnetError::Generic(format!(
                "Expected a 3-channel uint8 array, got {} channels", self.channels
            ))),
        }
    }
}

/// Value at percentile `p` (0..=100) of sorted data, interpolating linearly
/// between the closest ranks
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = (lower + 1).min(n - 1);
            let fraction = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
        }
    }
}

/// Normalizes an array for display with the default 2%/98% stretch
pub fn enhance_for_display(array: &RasterArray) -> RasterArray {
    enhance_with(array, &DisplayOptions::default())
}

/// Normalizes an array for display
///
/// Empty input yields a 10x10x3 black array and u8 input is returned as is.
/// Non-finite samples count as 0. The stretch window falls back to the full
/// value range when the percentile window is degenerate, and to `[0, 1]`
/// when the data is constant.
pub fn enhance_with(array: &RasterArray, options: &DisplayOptions) -> RasterArray {
    if array.is_empty() {
        return RasterArray::from_u8(EMPTY_SIDE, EMPTY_SIDE, 3, vec![0; EMPTY_SIDE * EMPTY_SIDE * 3]);
    }

    let values = match &array.data {
        ArrayData::U8(_) => return array.clone(),
        ArrayData::F64(values) => values,
    };

    let clean: Vec<f64> = values.iter().map(|&v| if v.is_finite() { v } else { 0.0 }).collect();
    let mut sorted = clean.clone();
    sorted.sort_unstable_by(f64::total_cmp);

    let (mut lo, mut hi) = (
        percentile(&sorted, options.lower_percentile),
        percentile(&sorted, options.upper_percentile),
    );
    if hi - lo < MIN_RANGE {
        lo = sorted[0];
        hi = sorted[sorted.len() - 1];
        if hi - lo < MIN_RANGE {
            lo = 0.0;
            hi = 1.0;
        }
    }
    debug!("Display stretch [{}, {}] over {} samples", lo, hi, sorted.len());

    let scale = 255.0 / (hi - lo);
    let data = clean
        .iter()
        .map(|&v| ((v - lo) * scale).clamp(0.0, 255.0) as u8)
        .collect();

    RasterArray::from_u8(array.width, array.height, array.channels, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u8_data(array: &RasterArray) -> &[u8] {
        match &array.data {
            ArrayData::U8(d) => d,
            ArrayData::F64(_) => panic!("expected u8 output"),
        }
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted: Vec<f64> = (0..=10).map(f64::from).collect();
        std::assert_eq!(percentile(&sorted, 0.0), 0.0);
        std::assert_eq!(percentile(&sorted, 50.0), 5.0);
        std::assert!((percentile(&sorted, 2.0) - 0.2).abs() < 1e-12);
        std::assert!((percentile(&sorted, 98.0) - 9.8).abs() < 1e-12);
    }

    #[test]
    fn test_u8_is_identity() {
        let array = RasterArray::from_u8(2, 1, 3, vec![0, 10, 20, 200, 250, 255]);
        std::assert_eq!(enhance_for_display(&array), array);
    }

    #[test]
    fn test_empty_gives_placeholder() {
        let out = enhance_for_display(&RasterArray::from_f64(0, 0, 3, Vec::new()));
        std::assert_eq!((out.width, out.height, out.channels), (10, 10, 3));
        std::assert!(u8_data(&out).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_constant_input() {
        let out = enhance_for_display(&RasterArray::from_f64(4, 4, 1, vec![1234.0; 16]));
        let data = u8_data(&out);
        std::assert!(data.iter().all(|&v| v == data[0]));
    }

    #[test]
    fn test_stretch_stays_in_range() {
        let mut values: Vec<f64> = (0..1000).map(|v| v as f64 * 3.7 - 500.0).collect();
        values[0] = f64::NAN;
        values[1] = f64::INFINITY;
        values[2] = f64::NEG_INFINITY;
        let out = enhance_for_display(&RasterArray::from_f64(100, 10, 1, values));
        let data = u8_data(&out);
        std::assert_eq!(data.len(), 1000);
        std::assert_eq!(data[999], 255);
        std::assert_eq!(data[3], 0);
    }

    #[test]
    fn test_degenerate_percentiles_use_min_max() {
        // 99 zeros and one 10: p2 == p98 == 0, so the window becomes [0, 10]
        let mut values = vec![0.0; 99];
        values.push(10.0);
        let out = enhance_for_display(&RasterArray::from_f64(10, 10, 1, values));
        std::assert_eq!(u8_data(&out)[99], 255);
        std::assert_eq!(u8_data(&out)[0], 0);
    }

    #[test]
    fn test_stack_interleaves() {
        let r = [1.0, 2.0];
        let g = [3.0, 4.0];
        let b = [5.0, 6.0];
        let array = RasterArray::stack(2, 1, &[&r, &g, &b]).unwrap();
        std::assert_eq!(array.data, ArrayData::F64(vec![1.0, 3.0, 5.0, 2.0, 4.0, 6.0]));
        std::assert!(RasterArray::stack(3, 1, &[&r]).is_err());
    }
}
