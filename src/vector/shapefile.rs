//! ESRI Shapefile polygon I/O
//!
//! A shapefile is a set of sidecar files sharing a stem:
//!
//! - `.shp`: geometry records, big-endian framing with little-endian payload
//! - `.shx`: record offsets into `.shp`
//! - `.dbf`: dBASE III attribute table
//! - `.prj`: ESRI WKT of the CRS
//! - `.cpg`: attribute encoding
//!
//! Only polygon (type 5) files are supported.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, NaiveDate, Utc};
use log::debug;

use crate::coordinate::{BoundingBox, Point};
use crate::errors::{FishnetError, FishnetResult};

const FILE_CODE: i32 = 9994;
const VERSION: i32 = 1000;
const HEADER_LEN: usize = 100;
pub const SHAPE_POLYGON: i32 = 5;
const SHAPE_NULL: i32 = 0;

const DBF_VERSION: u8 = 0x03;
const DBF_HEADER_END: u8 = 0x0D;
const DBF_EOF: u8 = 0x1A;
const DBF_NAME_LEN: usize = 11;
const MAX_CHAR_WIDTH: usize = 254;

/// Attribute column type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Float,
    Text,
}

impl FieldType {
    fn dbf_code(&self) -> u8 {
        match self {
            FieldType::Integer | FieldType::Float => b'N',
            FieldType::Text => b'C',
        }
    }
}

/// Attribute column definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

impl FieldDef {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        FieldDef {
            name: name.to_string(),
            field_type,
        }
    }
}

/// One attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

/// A polygon with its attribute row
///
/// `rings[0]` is the outer ring; the rest are holes. Rings are closed.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonFeature {
    pub rings: Vec<Vec<Point>>,
    pub attributes: Vec<FieldValue>,
}

/// Twice the signed area; positive for counter-clockwise rings (y up)
pub fn signed_area(ring: &[Point]) -> f64 {
    ring.windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum()
}

/// Reverses `ring` if needed so it winds clockwise (y up) when `clockwise`
pub fn orient_ring(ring: &mut [Point], clockwise: bool) {
    let area = signed_area(ring);
    if (clockwise && area > 0.0) || (!clockwise && area < 0.0) {
        ring.reverse();
    }
}

/// Paths of the sidecar files for a `.shp` path
pub fn sidecar_paths(shp_path: &Path) -> Vec<PathBuf> {
    ["shp", "shx", "dbf", "prj", "cpg"]
        .iter()
        .map(|ext| shp_path.with_extension(ext))
        .collect()
}

fn content_words(feature: &PolygonFeature) -> usize {
    if feature.rings.is_empty() {
        return 2;
    }
    let points: usize = feature.rings.iter().map(Vec::len).sum();
    (4 + 32 + 4 + 4 + 4 * feature.rings.len() + 16 * points) / 2
}

fn feature_bounds(feature: &PolygonFeature) -> Option<BoundingBox> {
    let mut bounds: Option<BoundingBox> = None;
    for ring in &feature.rings {
        if let Some(ring_bounds) = BoundingBox::from_points(ring) {
            match bounds.as_mut() {
                Some(b) => b.merge(&ring_bounds),
                None => bounds = Some(ring_bounds),
            }
        }
    }
    bounds
}

fn write_header<W: Write>(out: &mut W, file_words: usize, bounds: &Option<BoundingBox>) -> FishnetResult<()> {
    out.write_i32::<BigEndian>(FILE_CODE)?;
    for _ in 0..5 {
        out.write_i32::<BigEndian>(0)?;
    }
    out.write_i32::<BigEndian>(file_words as i32)?;
    out.write_i32::<LittleEndian>(VERSION)?;
    out.write_i32::<LittleEndian>(SHAPE_POLYGON)?;
    let (min_x, min_y, max_x, max_y) = bounds
        .map(|b| (b.min_x, b.min_y, b.max_x, b.max_y))
        .unwrap_or((0.0, 0.0, 0.0, 0.0));
    for v in [min_x, min_y, max_x, max_y, 0.0, 0.0, 0.0, 0.0] {
        out.write_f64::<LittleEndian>(v)?;
    }
    Ok(())
}

fn write_geometry<W: Write>(out: &mut W, feature: &PolygonFeature) -> FishnetResult<()> {
    let bounds = match feature_bounds(feature) {
        Some(b) => b,
        None => {
            out.write_i32::<LittleEndian>(SHAPE_NULL)?;
            return Ok(());
        }
    };

    out.write_i32::<LittleEndian>(SHAPE_POLYGON)?;
    for v in [bounds.min_x, bounds.min_y, bounds.max_x, bounds.max_y] {
        out.write_f64::<LittleEndian>(v)?;
    }
    let total: usize = feature.rings.iter().map(Vec::len).sum();
    out.write_i32::<LittleEndian>(feature.rings.len() as i32)?;
    out.write_i32::<LittleEndian>(total as i32)?;

    let mut start = 0;
    for ring in &feature.rings {
        out.write_i32::<LittleEndian>(start as i32)?;
        start += ring.len();
    }
    for point in feature.rings.iter().flatten() {
        out.write_f64::<LittleEndian>(point.x)?;
        out.write_f64::<LittleEndian>(point.y)?;
    }
    Ok(())
}

/// Column layout of a dBASE field: (width, decimals)
fn field_layout(field: &FieldDef, features: &[PolygonFeature], column: usize) -> (usize, usize) {
    match field.field_type {
        FieldType::Integer => (10, 0),
        FieldType::Float => (24, 15),
        FieldType::Text => {
            let longest = features
                .iter()
                .filter_map(|f| match f.attributes.get(column) {
                    Some(FieldValue::Text(s)) => Some(s.len()),
                    _ => None,
                })
                .max()
                .unwrap_or(0);
            (longest.max(80).min(MAX_CHAR_WIDTH), 0)
        }
    }
}

fn format_value(value: &FieldValue, field: &FieldDef, width: usize, decimals: usize) -> Vec<u8> {
    let text = match (value, field.field_type) {
        (FieldValue::Null, _) => String::new(),
        (FieldValue::Integer(v), FieldType::Integer) => v.to_string(),
        (FieldValue::Float(v), FieldType::Integer) => (v.round() as i64).to_string(),
        (FieldValue::Integer(v), FieldType::Float) => format!("{:.*}", decimals, *v as f64),
        (FieldValue::Float(v), FieldType::Float) => format!("{:.*}", decimals, v),
        (FieldValue::Text(s), FieldType::Text) => s.clone(),
        (FieldValue::Integer(v), FieldType::Text) => v.to_string(),
        (FieldValue::Float(v), FieldType::Text) => v.to_string(),
        (FieldValue::Text(s), _) => s.trim().parse::<f64>()
            .map(|v| format!("{:.*}", decimals, v))
            .unwrap_or_default(),
    };

    let mut bytes: Vec<u8> = text.into_bytes();
    if bytes.len() > width {
        // Numbers too wide for the column become blanks (read back as null)
        if field.field_type == FieldType::Text {
            bytes.truncate(width);
        } else {
            bytes.clear();
        }
    }
    let pad = width - bytes.len();
    match field.field_type {
        FieldType::Text => {
            bytes.extend(std::iter::repeat(b' ').take(pad));
            bytes
        }
        _ => {
            let mut padded = vec![b' '; pad];
            padded.extend(bytes);
            padded
        }
    }
}

/// Last-update stamp of a dBASE header: years since 1900, month, day
fn dbf_date(date: NaiveDate) -> [u8; 3] {
    [(date.year() - 1900).clamp(0, 255) as u8, date.month() as u8, date.day() as u8]
}

fn write_dbf<W: Write>(out: &mut W, fields: &[FieldDef], features: &[PolygonFeature]) -> FishnetResult<()> {
    let layouts: Vec<(usize, usize)> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| field_layout(f, features, i))
        .collect();
    let record_len = 1 + layouts.iter().map(|l| l.0).sum::<usize>();
    let header_len = 32 + 32 * fields.len() + 1;

    out.write_u8(DBF_VERSION)?;
    out.write_all(&dbf_date(Utc::now().date_naive()))?;
    out.write_u32::<LittleEndian>(features.len() as u32)?;
    out.write_u16::<LittleEndian>(header_len as u16)?;
    out.write_u16::<LittleEndian>(record_len as u16)?;
    out.write_all(&[0u8; 20])?;

    for (field, (width, decimals)) in fields.iter().zip(&layouts) {
        let mut name = [0u8; DBF_NAME_LEN];
        for (slot, byte) in name.iter_mut().zip(field.name.bytes().take(DBF_NAME_LEN - 1)) {
            *slot = byte;
        }
        out.write_all(&name)?;
        out.write_u8(field.field_type.dbf_code())?;
        out.write_all(&[0u8; 4])?;
        out.write_u8(*width as u8)?;
        out.write_u8(*decimals as u8)?;
        out.write_all(&[0u8; 14])?;
    }
    out.write_u8(DBF_HEADER_END)?;

    for feature in features {
        out.write_u8(b' ')?;
        for (i, (field, (width, decimals))) in fields.iter().zip(&layouts).enumerate() {
            let value = feature.attributes.get(i).unwrap_or(&FieldValue::Null);
            out.write_all(&format_value(value, field, *width, *decimals))?;
        }
    }
    out.write_u8(DBF_EOF)?;
    Ok(())
}

/// Writes polygon shapefiles
pub struct ShapefileWriter;

impl ShapefileWriter {
    /// Writes `features` to `shp_path` and its sidecars
    ///
    /// Attribute rows shorter than `fields` are padded with nulls. The
    /// `.prj` file is only written when `prj` is given. Returns the written
    /// paths.
    pub fn write(
        shp_path: &Path,
        fields: &[FieldDef],
        features: &[PolygonFeature],
        prj: Option<&str>,
    ) -> FishnetResult<Vec<PathBuf>> {
        if let Some(dir) = shp_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let bounds = features
            .iter()
            .filter_map(feature_bounds)
            .reduce(|mut a, b| {
                a.merge(&b);
                a
            });

        let record_words: Vec<usize> = features.iter().map(content_words).collect();
        let shp_words = HEADER_LEN / 2 + record_words.iter().map(|w| w + 4).sum::<usize>();
        let shx_words = HEADER_LEN / 2 + 4 * features.len();

        let shp = shp_path.with_extension("shp");
        let shx = shp_path.with_extension("shx");
        let dbf = shp_path.with_extension("dbf");

        let mut shp_out = BufWriter::new(File::create(&shp)?);
        let mut shx_out = BufWriter::new(File::create(&shx)?);
        write_header(&mut shp_out, shp_words, &bounds)?;
        write_header(&mut shx_out, shx_words, &bounds)?;

        let mut offset = HEADER_LEN / 2;
        for (i, (feature, words)) in features.iter().zip(&record_words).enumerate() {
            shp_out.write_i32::<BigEndian>(i as i32 + 1)?;
            shp_out.write_i32::<BigEndian>(*words as i32)?;
            write_geometry(&mut shp_out, feature)?;

            shx_out.write_i32::<BigEndian>(offset as i32)?;
            shx_out.write_i32::<BigEndian>(*words as i32)?;
            offset += words + 4;
        }
        shp_out.flush()?;
        shx_out.flush()?;

        let mut dbf_out = BufWriter::new(File::create(&dbf)?);
        write_dbf(&mut dbf_out, fields, features)?;
        dbf_out.flush()?;

        let cpg = shp_path.with_extension("cpg");
        fs::write(&cpg, "UTF-8")?;

        let mut written = vec![shp, shx, dbf, cpg];
        if let Some(wkt) = prj {
            let prj_path = shp_path.with_extension("prj");
            fs::write(&prj_path, wkt)?;
            written.push(prj_path);
        }

        debug!("Wrote {} polygons to {}", features.len(), shp_path.display());
        Ok(written)
    }
}

/// Contents of a polygon shapefile
#[derive(Debug, Clone, PartialEq)]
pub struct Shapefile {
    pub fields: Vec<FieldDef>,
    pub features: Vec<PolygonFeature>,
    /// `.prj` contents, if present
    pub prj: Option<String>,
}

fn vector_error(path: &Path, message: &str) -> FishnetError {
    FishnetError::Vector(format!("{}: {}", path.display(), message))
}

/// Reads polygon shapefiles
pub struct ShapefileReader;

impl ShapefileReader {
    pub fn read(shp_path: &Path) -> FishnetResult<Shapefile> {
        let shp = shp_path.with_extension("shp");
        let dbf = shp_path.with_extension("dbf");
        if !shp.is_file() {
            return Err(FishnetError::FileNotFound(shp.display().to_string()));
        }

        let geometries = Self::read_geometries(&shp)?;
        let (fields, rows) = if dbf.is_file() {
            Self::read_dbf(&dbf)?
        } else {
            (Vec::new(), Vec::new())
        };
        if !rows.is_empty() && rows.len() != geometries.len() {
            return Err(vector_error(&dbf, "record count differs from geometry count"));
        }

        let features = geometries
            .into_iter()
            .enumerate()
            .map(|(i, rings)| PolygonFeature {
                rings,
                attributes: rows.get(i).cloned().unwrap_or_default(),
            })
            .collect();

        let prj_path = shp_path.with_extension("prj");
        let prj = if prj_path.is_file() {
            Some(fs::read_to_string(prj_path)?)
        } else {
            None
        };

        Ok(Shapefile { fields, features, prj })
    }

    fn read_geometries(path: &Path) -> FishnetResult<Vec<Vec<Vec<Point>>>> {
        let data = fs::read(path)?;
        if data.len() < HEADER_LEN {
            return Err(vector_error(path, "truncated header"));
        }
        let mut header = &data[..HEADER_LEN];
        if header.read_i32::<BigEndian>()? != FILE_CODE {
            return Err(vector_error(path, "not a shapefile"));
        }
        let mut rest = &data[32..36];
        let shape_type = rest.read_i32::<LittleEndian>()?;
        if shape_type != SHAPE_POLYGON && shape_type != SHAPE_NULL {
            return Err(vector_error(path, &format!("unsupported shape type {}", shape_type)));
        }

        let mut cursor = &data[HEADER_LEN..];
        let mut geometries = Vec::new();
        while cursor.len() >= 8 {
            let _record = cursor.read_i32::<BigEndian>()?;
            let words = cursor.read_i32::<BigEndian>()? as usize;
            if cursor.len() < words * 2 {
                return Err(vector_error(path, "truncated record"));
            }
            let (mut content, next) = cursor.split_at(words * 2);
            cursor = next;

            let record_type = content.read_i32::<LittleEndian>()?;
            if record_type == SHAPE_NULL {
                geometries.push(Vec::new());
                continue;
            }
            if record_type != SHAPE_POLYGON {
                return Err(vector_error(path, &format!("unsupported record type {}", record_type)));
            }
            for _ in 0..4 {
                content.read_f64::<LittleEndian>()?;
            }
            let num_parts = content.read_i32::<LittleEndian>()? as usize;
            let num_points = content.read_i32::<LittleEndian>()? as usize;
            let mut starts = Vec::with_capacity(num_parts);
            for _ in 0..num_parts {
                starts.push(content.read_i32::<LittleEndian>()? as usize);
            }
            let mut points = Vec::with_capacity(num_points);
            for _ in 0..num_points {
                let x = content.read_f64::<LittleEndian>()?;
                let y = content.read_f64::<LittleEndian>()?;
                points.push(Point::new(x, y));
            }

            let mut rings = Vec::with_capacity(num_parts);
            for (i, &start) in starts.iter().enumerate() {
                let end = starts.get(i + 1).copied().unwrap_or(num_points);
                if start > end || end > points.len() {
                    return Err(vector_error(path, "invalid part index"));
                }
                rings.push(points[start..end].to_vec());
            }
            geometries.push(rings);
        }
        Ok(geometries)
    }

    fn read_dbf(path: &Path) -> FishnetResult<(Vec<FieldDef>, Vec<Vec<FieldValue>>)> {
        let mut input = BufReader::new(File::open(path)?);
        let mut header = [0u8; 32];
        input.read_exact(&mut header)?;
        let mut counts = &header[4..12];
        let records = counts.read_u32::<LittleEndian>()? as usize;
        let header_len = counts.read_u16::<LittleEndian>()? as usize;
        let _record_len = counts.read_u16::<LittleEndian>()?;

        if header_len < 33 {
            return Err(vector_error(path, "invalid dBASE header"));
        }
        let field_count = (header_len - 33) / 32;
        let mut fields = Vec::with_capacity(field_count);
        let mut layouts = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            let mut descriptor = [0u8; 32];
            input.read_exact(&mut descriptor)?;
            let name_end = descriptor[..DBF_NAME_LEN].iter().position(|&b| b == 0).unwrap_or(DBF_NAME_LEN);
            let name = String::from_utf8_lossy(&descriptor[..name_end]).into_owned();
            let width = descriptor[16] as usize;
            let decimals = descriptor[17] as usize;
            let field_type = match (descriptor[11], decimals) {
                (b'C', _) => FieldType::Text,
                (b'N', 0) => FieldType::Integer,
                (b'N', _) | (b'F', _) => FieldType::Float,
                (other, _) => {
                    return Err(vector_error(path, &format!("unsupported field type '{}'", other as char)));
                }
            };
            fields.push(FieldDef { name, field_type });
            layouts.push(width);
        }

        let mut rest = vec![0u8; header_len - 32 - 32 * field_count];
        input.read_exact(&mut rest)?;

        let mut rows = Vec::with_capacity(records);
        for _ in 0..records {
            let mut flag = [0u8; 1];
            input.read_exact(&mut flag)?;
            let mut row = Vec::with_capacity(fields.len());
            for (field, width) in fields.iter().zip(&layouts) {
                let mut raw = vec![0u8; *width];
                input.read_exact(&mut raw)?;
                let text = String::from_utf8_lossy(&raw);
                let trimmed = text.trim();
                let value = if trimmed.is_empty() {
                    FieldValue::Null
                } else {
                    match field.field_type {
                        FieldType::Integer => trimmed.parse().map(FieldValue::Integer).unwrap_or(FieldValue::Null),
                        FieldType::Float => trimmed.parse().map(FieldValue::Float).unwrap_or(FieldValue::Null),
                        FieldType::Text => FieldValue::Text(text.trim_end().to_string()),
                    }
                };
                row.push(value);
            }
            if flag[0] != b'*' {
                rows.push(row);
            }
        }

        Ok((fields, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x, y),
            Point::new(x, y + size),
            Point::new(x + size, y + size),
            Point::new(x + size, y),
            Point::new(x, y),
        ]
    }

    fn temp_shp(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("fishnet_shapefile_tests");
        fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[test]
    fn test_ring_orientation() {
        let mut ring = square(0.0, 0.0, 1.0);
        std::assert!(signed_area(&ring) < 0.0);
        orient_ring(&mut ring, false);
        std::assert!(signed_area(&ring) > 0.0);
        orient_ring(&mut ring, true);
        std::assert!(signed_area(&ring) < 0.0);
    }

    #[test]
    fn test_dbf_header_carries_update_date() {
        std::assert_eq!(dbf_date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()), [124, 2, 29]);

        let before = dbf_date(Utc::now().date_naive());
        let mut dbf = Vec::new();
        write_dbf(&mut dbf, &[FieldDef::new("id", FieldType::Integer)], &[]).unwrap();
        let after = dbf_date(Utc::now().date_naive());
        std::assert!(dbf[1..4] == before || dbf[1..4] == after);
    }

    #[test]
    fn test_write_and_read_back() {
        let path = temp_shp("squares.shp");
        let fields = vec![
            FieldDef::new("id", FieldType::Integer),
            FieldDef::new("width", FieldType::Float),
            FieldDef::new("label", FieldType::Text),
        ];
        let mut hole = square(2.0, 2.0, 1.0);
        orient_ring(&mut hole, false);
        let features = vec![
            PolygonFeature {
                rings: vec![square(0.0, 0.0, 10.0), hole],
                attributes: vec![FieldValue::Integer(1), FieldValue::Float(10.5), FieldValue::Text("a".into())],
            },
            PolygonFeature {
                rings: vec![square(20.0, 0.0, 5.0)],
                attributes: vec![FieldValue::Integer(2), FieldValue::Null],
            },
        ];

        let written = ShapefileWriter::write(&path, &fields, &features, Some("GEOGCS[\"x\"]")).unwrap();
        std::assert_eq!(written.len(), 5);

        let shp_len = fs::metadata(&path).unwrap().len();
        let expected = 100 + (8 + 4 + 32 + 8 + 8 + 160) + (8 + 4 + 32 + 8 + 4 + 80);
        std::assert_eq!(shp_len, expected as u64);
        std::assert_eq!(fs::metadata(path.with_extension("shx")).unwrap().len(), 116);

        let read = ShapefileReader::read(&path).unwrap();
        std::assert_eq!(read.fields, fields);
        std::assert_eq!(read.features.len(), 2);
        std::assert_eq!(read.features[0].rings, features[0].rings);
        std::assert_eq!(read.features[0].attributes[0], FieldValue::Integer(1));
        std::assert_eq!(read.features[0].attributes[1], FieldValue::Float(10.5));
        std::assert_eq!(read.features[0].attributes[2], FieldValue::Text("a".into()));
        std::assert_eq!(read.features[1].attributes[1], FieldValue::Null);
        std::assert_eq!(read.features[1].attributes[2], FieldValue::Null);
        std::assert_eq!(read.prj.as_deref(), Some("GEOGCS[\"x\"]"));
    }

    #[test]
    fn test_missing_file() {
        let result = ShapefileReader::read(Path::new("/no/such/file.shp"));
        std::assert!(matches!(result, Err(FishnetError::FileNotFound(_))));
    }
}
