//! GDAL metadata XML handling
//!
//! GDAL stores dataset and band metadata as a small XML document in TIFF
//! tag 42112:
//!
//! ```xml
//! <GDALMetadata>
//!   <Item name="AREA_OR_POINT">Area</Item>
//!   <Item name="DESCRIPTION" sample="0" role="description">B4</Item>
//! </GDALMetadata>
//! ```

use std::collections::BTreeMap;

use log::warn;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Parsed contents of a GDALMetadata document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GdalMetadata {
    /// Dataset-level items, in document order
    pub items: Vec<(String, String)>,
    /// Band descriptions keyed by 0-based sample index
    pub band_descriptions: BTreeMap<usize, String>,
}

impl GdalMetadata {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.band_descriptions.is_empty()
    }

    /// Description of a 0-based band, if present and non-empty
    pub fn band_description(&self, band: usize) -> Option<&str> {
        self.band_descriptions
            .get(&band)
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

/// The attributes of one `<Item>` element
#[derive(Default)]
struct ItemAttributes {
    name: String,
    sample: Option<usize>,
    role: Option<String>,
}

fn item_attributes(start: &BytesStart) -> ItemAttributes {
    let mut attrs = ItemAttributes::default();
    for attr in start.attributes().flatten() {
        let value = match attr.unescape_value() {
            Ok(v) => v.into_owned(),
            Err(_) => continue,
        };
        match attr.key.as_ref() {
            b"name" => attrs.name = value,
            b"sample" => attrs.sample = value.trim().parse().ok(),
            b"role" => attrs.role = Some(value),
            _ => {}
        }
    }
    attrs
}

/// Parse a GDALMetadata document
///
/// Malformed XML yields whatever was read before the error.
pub fn parse_gdal_metadata(xml: &str) -> GdalMetadata {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut metadata = GdalMetadata::default();
    let mut current: Option<ItemAttributes> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Item" => {
                current = Some(item_attributes(e));
                text.clear();
            }
            Ok(Event::Text(e)) => {
                if current.is_some() {
                    match e.unescape() {
                        Ok(t) => text.push_str(&t),
                        Err(err) => warn!("Bad text in GDAL metadata: {}", err),
                    }
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Item" => {
                if let Some(item) = current.take() {
                    match (item.sample, item.role.as_deref()) {
                        (Some(sample), Some("description")) => {
                            metadata.band_descriptions.insert(sample, text.clone());
                        }
                        (None, _) => metadata.items.push((item.name, text.clone())),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Malformed GDAL metadata at {}: {}", reader.buffer_position(), e);
                break;
            }
            _ => {}
        }
    }

    metadata
}

/// Serialize a GDALMetadata document
pub fn write_gdal_metadata(metadata: &GdalMetadata) -> String {
    let mut xml = String::from("<GDALMetadata>\n");
    for (name, value) in &metadata.items {
        xml.push_str(&format!("  <Item name=\"{}\">{}</Item>\n", escape(name.as_str()), escape(value.as_str())));
    }
    for (sample, description) in &metadata.band_descriptions {
        xml.push_str(&format!(
            "  <Item name=\"DESCRIPTION\" sample=\"{}\" role=\"description\">{}</Item>\n",
            sample,
            escape(description.as_str())
        ));
    }
    xml.push_str("</GDALMetadata>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_band_descriptions() {
        let xml = r#"<GDALMetadata>
  <Item name="AREA_OR_POINT">Area</Item>
  <Item name="DESCRIPTION" sample="0" role="description">B4 &amp; red</Item>
  <Item name="DESCRIPTION" sample="2" role="description">B2</Item>
  <Item name="STATISTICS_MEAN" sample="0">12.5</Item>
</GDALMetadata>"#;
        let metadata = parse_gdal_metadata(xml);
        std::assert_eq!(metadata.items, vec![("AREA_OR_POINT".to_string(), "Area".to_string())]);
        std::assert_eq!(metadata.band_description(0), Some("B4 & red"));
        std::assert_eq!(metadata.band_description(1), None);
        std::assert_eq!(metadata.band_description(2), Some("B2"));
    }

    #[test]
    fn test_written_document_parses_back() {
        let mut metadata = GdalMetadata::default();
        metadata.items.push(("SOURCE".to_string(), "a<b".to_string()));
        metadata.band_descriptions.insert(1, "nir".to_string());
        let parsed = parse_gdal_metadata(&write_gdal_metadata(&metadata));
        std::assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_malformed_document_keeps_prefix() {
        let parsed = parse_gdal_metadata("<GDALMetadata><Item name=\"A\">1</Item><Item");
        std::assert_eq!(parsed.items.len(), 1);
    }
}
