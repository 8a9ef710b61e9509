//! Tests for the TIFF layer

mod test_utils;
mod byte_order_tests;
mod reader_tests;
mod builder_tests;
