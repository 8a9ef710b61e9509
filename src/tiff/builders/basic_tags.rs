//! Basic TIFF tag strategies
//!
//! This module provides functionality for adding the structural tags of a
//! single-strip, pixel-interleaved image: dimensions, sample layout,
//! colour interpretation and the strip itself.

use log::debug;

use crate::tiff::constants::{field_types, photometric, planar_config, tags};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::sample::SampleType;

use super::{ascii_z, set_tag_data, shorts_le, ExternalData, ImageData};

/// Adds basic TIFF tags to an IFD
pub struct BasicTagsBuilder;

impl BasicTagsBuilder {
    /// Add the tags describing image geometry and sample layout
    ///
    /// Three 8-bit samples are declared RGB; any other layout is
    /// MinIsBlack with the samples beyond the first marked as unspecified
    /// extra samples.
    pub fn add_image_structure(
        ifd: &mut IFD,
        external_data: &mut ExternalData,
        ifd_index: usize,
        width: u32,
        height: u32,
        sample_type: SampleType,
        samples: u16,
    ) {
        debug!("Adding image structure: {}x{}, {} x {}", width, height, samples, sample_type);

        ifd.add_entry(IFDEntry::new(tags::IMAGE_WIDTH, field_types::LONG, 1, width as u64));
        ifd.add_entry(IFDEntry::new(tags::IMAGE_LENGTH, field_types::LONG, 1, height as u64));
        ifd.add_entry(IFDEntry::new(tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1, samples as u64));
        ifd.add_entry(IFDEntry::new(tags::PLANAR_CONFIGURATION, field_types::SHORT, 1, planar_config::CHUNKY as u64));

        let per_sample = |value: u16| shorts_le(&vec![value; samples as usize]);
        set_tag_data(ifd, external_data, ifd_index, tags::BITS_PER_SAMPLE,
                     field_types::SHORT, samples as u64, per_sample(sample_type.bits()));
        set_tag_data(ifd, external_data, ifd_index, tags::SAMPLE_FORMAT,
                     field_types::SHORT, samples as u64, per_sample(sample_type.sample_format()));

        let is_rgb = samples == 3 && sample_type == SampleType::U8;
        let interpretation = if is_rgb { photometric::RGB } else { photometric::BLACK_IS_ZERO };
        ifd.add_entry(IFDEntry::new(tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, 1, interpretation as u64));

        if !is_rgb && samples > 1 {
            let extra = samples - 1;
            set_tag_data(ifd, external_data, ifd_index, tags::EXTRA_SAMPLES,
                         field_types::SHORT, extra as u64, shorts_le(&vec![0u16; extra as usize]));
        }
    }

    /// Set up a single strip holding the whole (compressed) image
    ///
    /// StripOffsets is a placeholder; the writer patches in the real offset.
    pub fn setup_single_strip(
        ifd: &mut IFD,
        image_data: &mut ImageData,
        ifd_index: usize,
        height: u32,
        compression: u16,
        strip_data: Vec<u8>,
    ) {
        debug!("Setting up single strip: {} bytes, compression {}", strip_data.len(), compression);

        ifd.add_entry(IFDEntry::new(tags::COMPRESSION, field_types::SHORT, 1, compression as u64));
        ifd.add_entry(IFDEntry::new(tags::STRIP_OFFSETS, field_types::LONG, 1, 0));
        ifd.add_entry(IFDEntry::new(tags::STRIP_BYTE_COUNTS, field_types::LONG, 1, strip_data.len() as u64));
        ifd.add_entry(IFDEntry::new(tags::ROWS_PER_STRIP, field_types::LONG, 1, height as u64));

        image_data.insert(ifd_index, strip_data);
    }

    /// Add the Software tag
    pub fn add_software(ifd: &mut IFD, external_data: &mut ExternalData, ifd_index: usize, software: &str) {
        let bytes = ascii_z(software);
        let count = bytes.len() as u64;
        set_tag_data(ifd, external_data, ifd_index, tags::SOFTWARE, field_types::ASCII, count, bytes);
    }
}
