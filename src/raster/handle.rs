//! Owned dataset handles
//!
//! A loaded raster keeps the dataset it was read from open so that later
//! operations (tile export, polygonization) can re-read raw windows. The
//! handle is owned by exactly one [`RasterData`](super::RasterData); it is
//! released by [`DatasetHandle::close`] or on drop.

use log::debug;

use crate::errors::{FishnetError, FishnetResult};
use crate::extractor::Region;
use crate::tiff::SampleType;

/// Random-access band reads over an open dataset
pub trait DatasetReader: Send {
    /// Name of the backend that opened the dataset
    fn backend_name(&self) -> &'static str;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn band_count(&self) -> usize;

    /// Native sample type of the bands
    fn sample_type(&self) -> SampleType;

    /// Reads `region` of the given 1-based bands
    ///
    /// Returns one row-major buffer per requested band.
    fn read_window(&mut self, bands: &[usize], region: &Region) -> FishnetResult<Vec<Vec<f64>>>;
}

/// Exclusively owned, closable dataset reader
#[derive(Default)]
pub struct DatasetHandle {
    reader: Option<Box<dyn DatasetReader>>,
}

impl DatasetHandle {
    pub fn new(reader: Box<dyn DatasetReader>) -> Self {
        DatasetHandle { reader: Some(reader) }
    }

    /// A handle that was never opened
    pub fn none() -> Self {
        DatasetHandle { reader: None }
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Releases the dataset; further calls do nothing
    pub fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            debug!("Closed {} dataset", reader.backend_name());
        }
    }

    fn reader(&self) -> FishnetResult<&dyn DatasetReader> {
        self.reader.as_deref().ok_or(FishnetError::HandleClosed)
    }

    pub fn backend_name(&self) -> FishnetResult<&'static str> {
        Ok(self.reader()?.backend_name())
    }

    pub fn band_count(&self) -> FishnetResult<usize> {
        Ok(self.reader()?.band_count())
    }

    pub fn sample_type(&self) -> FishnetResult<SampleType> {
        Ok(self.reader()?.sample_type())
    }

    /// Reads `region` of the given 1-based bands
    pub fn read_window(&mut self, bands: &[usize], region: &Region) -> FishnetResult<Vec<Vec<f64>>> {
        let reader = self.reader.as_deref_mut().ok_or(FishnetError::HandleClosed)?;
        if let Some(&band) = bands.iter().find(|&&b| b == 0 || b > reader.band_count()) {
            return Err(FishnetError::Generic(format!(
                "Band {} out of range 1..={}", band, reader.band_count()
            )));
        }
        reader.read_window(bands, region)
    }
}

impl std::fmt::Debug for DatasetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.reader {
            Some(reader) => write!(f, "DatasetHandle({}, open)", reader.backend_name()),
            None => write!(f, "DatasetHandle(closed)"),
        }
    }
}

/// In-memory pixel-interleaved dataset
///
/// Backs the decoder backend, which decodes the whole image up front.
pub struct MemoryDataset {
    backend: &'static str,
    width: u32,
    height: u32,
    bands: usize,
    sample_type: SampleType,
    samples: Vec<f64>,
}

impl MemoryDataset {
    pub fn new(
        backend: &'static str,
        width: u32,
        height: u32,
        bands: usize,
        sample_type: SampleType,
        samples: Vec<f64>,
    ) -> FishnetResult<Self> {
        let expected = width as usize * height as usize * bands;
        if samples.len() < expected {
            return Err(FishnetError::Generic(format!(
                "Decoded {} samples, expected {}", samples.len(), expected
            )));
        }
        Ok(MemoryDataset { backend, width, height, bands, sample_type, samples })
    }
}

impl DatasetReader for MemoryDataset {
    fn backend_name(&self) -> &'static str {
        self.backend
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands
    }

    fn sample_type(&self) -> SampleType {
        self.sample_type
    }

    fn read_window(&mut self, bands: &[usize], region: &Region) -> FishnetResult<Vec<Vec<f64>>> {
        if region.end_x() > self.width || region.end_y() > self.height {
            return Err(FishnetError::Generic(format!(
                "Window {:?} outside {}x{} image", region, self.width, self.height
            )));
        }

        let mut outputs = Vec::with_capacity(bands.len());
        for &band in bands {
            let mut output = Vec::with_capacity(region.pixel_count());
            for y in region.y..region.end_y() {
                let row = y as usize * self.width as usize;
                for x in region.x..region.end_x() {
                    output.push(self.samples[(row + x as usize) * self.bands + band - 1]);
                }
            }
            outputs.push(output);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> MemoryDataset {
        // 3x2 image, 2 bands: band 1 = index, band 2 = index * 10
        let samples = (0..6).flat_map(|i| [i as f64, i as f64 * 10.0]).collect();
        MemoryDataset::new("memory", 3, 2, 2, SampleType::F32, samples).unwrap()
    }

    #[test]
    fn test_window_read() {
        let mut handle = DatasetHandle::new(Box::new(dataset()));
        let window = handle.read_window(&[2, 1], &Region::new(1, 0, 2, 2)).unwrap();
        std::assert_eq!(window[0], vec![10.0, 20.0, 40.0, 50.0]);
        std::assert_eq!(window[1], vec![1.0, 2.0, 4.0, 5.0]);
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_reads() {
        let mut handle = DatasetHandle::new(Box::new(dataset()));
        std::assert!(handle.is_open());
        handle.close();
        handle.close();
        std::assert!(!handle.is_open());
        let result = handle.read_window(&[1], &Region::new(0, 0, 1, 1));
        std::assert!(matches!(result, Err(FishnetError::HandleClosed)));
    }

    #[test]
    fn test_band_range_checked() {
        let mut handle = DatasetHandle::new(Box::new(dataset()));
        std::assert!(handle.read_window(&[0], &Region::new(0, 0, 1, 1)).is_err());
        std::assert!(handle.read_window(&[3], &Region::new(0, 0, 1, 1)).is_err());
    }
}
