//! Band combination heuristics
//!
//! Chooses which source bands feed the red, green and blue display channels
//! of a multi-band raster, from band descriptions first and fixed orders
//! otherwise.

use std::fmt;

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

/// Band count above which a raster is treated as Sentinel-2-like
pub const SENTINEL_BAND_THRESHOLD: usize = 10;

lazy_static! {
    static ref RED: Option<Regex> = channel_pattern("red|b4|band4");
    static ref GREEN: Option<Regex> = channel_pattern("green|b3|band3");
    static ref BLUE: Option<Regex> = channel_pattern("blue|b2|band2");
    static ref NIR: Option<Regex> = channel_pattern("nir|b8|band8");
}

fn channel_pattern(tokens: &str) -> Option<Regex> {
    RegexBuilder::new(tokens).case_insensitive(true).build().ok()
}

fn names_channel(pattern: &Option<Regex>, name: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(name))
}

/// Source band numbers feeding the display channels
///
/// Geo backends use 1-based band numbers; the plain image decoder uses
/// 0-based channel positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandIndices {
    pub red: usize,
    pub green: usize,
    pub blue: usize,
    pub nir: Option<usize>,
}

impl BandIndices {
    pub fn new(red: usize, green: usize, blue: usize) -> Self {
        BandIndices { red, green, blue, nir: None }
    }

    /// Channel positions of a plain RGB bitmap
    pub fn plain_rgb() -> Self {
        BandIndices::new(0, 1, 2)
    }

    /// `[red, green, blue]`
    pub fn rgb(&self) -> [usize; 3] {
        [self.red, self.green, self.blue]
    }

    /// Combination string such as `R4G3B2`
    pub fn combination(&self) -> String {
        format!("R{}G{}B{}", self.red, self.green, self.blue)
    }
}

impl fmt::Display for BandIndices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.combination())?;
        if let Some(nir) = self.nir {
            write!(f, " (NIR {})", nir)?;
        }
        Ok(())
    }
}

/// Channels recognised from band descriptions, 1-based
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct DetectedBands {
    red: Option<usize>,
    green: Option<usize>,
    blue: Option<usize>,
    nir: Option<usize>,
}

impl DetectedBands {
    fn rgb(&self) -> Option<(usize, usize, usize)> {
        Some((self.red?, self.green?, self.blue?))
    }
}

/// Matches band descriptions against the channel tokens
///
/// Each band is assigned to the first channel whose tokens it contains; a
/// later band naming the same channel replaces an earlier one.
fn detect_by_name(band_names: &[String]) -> DetectedBands {
    let mut detected = DetectedBands::default();
    for (i, name) in band_names.iter().enumerate() {
        let band = i + 1;
        if names_channel(&RED, name) {
            detected.red = Some(band);
        } else if names_channel(&GREEN, name) {
            detected.green = Some(band);
        } else if names_channel(&BLUE, name) {
            detected.blue = Some(band);
        } else if names_channel(&NIR, name) {
            detected.nir = Some(band);
        }
    }
    detected
}

/// Whether a band count marks a Sentinel-2-like product
pub fn is_sentinel(bands_count: usize) -> bool {
    bands_count > SENTINEL_BAND_THRESHOLD
}

/// Selects the display bands of a geo-referenced raster
///
/// `band_names` has one entry per band. Sentinel-like rasters fall back to
/// 4/3/2 clamped to the band count, other rasters with at least three bands
/// to 1/2/3, and one- or two-band rasters repeat band 1.
pub fn select_bands(band_names: &[String]) -> BandIndices {
    let count = band_names.len();
    if count < 3 {
        return BandIndices::new(1, 1, 1);
    }

    let detected = detect_by_name(band_names);
    let (red, green, blue) = detected.rgb().unwrap_or_else(|| {
        if is_sentinel(count) {
            (4.min(count), 3.min(count), 2.min(count))
        } else {
            (1, 2, 3)
        }
    });

    BandIndices {
        red,
        green,
        blue,
        nir: detected.nir,
    }
}

/// Default description of a 1-based band
pub fn default_band_name(band: usize) -> String {
    format!("Band_{}", band)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn defaults(count: usize) -> Vec<String> {
        (1..=count).map(default_band_name).collect()
    }

    #[test]
    fn test_single_and_two_band() {
        std::assert_eq!(select_bands(&defaults(1)).rgb(), [1, 1, 1]);
        std::assert_eq!(select_bands(&names(&["red", "nir"])).rgb(), [1, 1, 1]);
    }

    #[test]
    fn test_name_detection() {
        let bands = select_bands(&names(&["Blue", "Green", "Red", "NIR"]));
        std::assert_eq!(bands.rgb(), [3, 2, 1]);
        std::assert_eq!(bands.nir, Some(4));
        std::assert_eq!(bands.combination(), "R3G2B1");
    }

    #[test]
    fn test_unnamed_multiband_uses_natural_order() {
        std::assert_eq!(select_bands(&defaults(4)).rgb(), [1, 2, 3]);
    }

    #[test]
    fn test_partial_detection_falls_back() {
        std::assert_eq!(select_bands(&names(&["red", "x", "y"])).rgb(), [1, 2, 3]);
    }

    #[test]
    fn test_sentinel_bands() {
        let sentinel = names(&["B1", "B2", "B3", "B4", "B5", "B6", "B7", "B8", "B8A", "B11", "B12"]);
        let bands = select_bands(&sentinel);
        std::assert!(is_sentinel(sentinel.len()));
        std::assert_eq!(bands.rgb(), [4, 3, 2]);
        std::assert_eq!(bands.nir, Some(9));

        std::assert_eq!(select_bands(&defaults(13)).rgb(), [4, 3, 2]);
    }

    #[test]
    fn test_sentinel_threshold_is_strict() {
        std::assert!(!is_sentinel(10));
        std::assert!(is_sentinel(11));
    }
}
