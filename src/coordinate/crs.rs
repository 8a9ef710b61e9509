//! Coordinate Reference System handling

use std::fmt;

use crate::tiff::constants::geo_keys;

/// Identifier for common coordinate systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// WGS 84 (EPSG:4326)
    WGS84,
    /// China Geodetic Coordinate System 2000 (EPSG:4490)
    CGCS2000,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// WGS 84 / UTM zone (EPSG:326xx for northern hemisphere, 327xx for southern)
    UTM(u8, bool),
    /// Other EPSG code
    Other(u32),
}

impl CoordinateSystem {
    /// Get the EPSG code for this coordinate system
    pub fn epsg_code(&self) -> u32 {
        match self {
            CoordinateSystem::WGS84 => 4326,
            CoordinateSystem::CGCS2000 => 4490,
            CoordinateSystem::WebMercator => 3857,
            CoordinateSystem::UTM(zone, is_northern) => {
                if *is_northern {
                    32600 + *zone as u32
                } else {
                    32700 + *zone as u32
                }
            },
            CoordinateSystem::Other(code) => *code,
        }
    }

    /// Get a description of this coordinate system
    pub fn description(&self) -> String {
        match self {
            CoordinateSystem::WGS84 => "WGS 84 (EPSG:4326)".to_string(),
            CoordinateSystem::CGCS2000 => "China Geodetic Coordinate System 2000 (EPSG:4490)".to_string(),
            CoordinateSystem::WebMercator => "Web Mercator (EPSG:3857)".to_string(),
            CoordinateSystem::UTM(zone, is_northern) => {
                let hemisphere = if *is_northern { 'N' } else { 'S' };
                format!("WGS 84 / UTM zone {}{} (EPSG:{})", zone, hemisphere, self.epsg_code())
            },
            CoordinateSystem::Other(code) => format!("EPSG:{}", code),
        }
    }

    /// Whether coordinates are longitude/latitude degrees
    pub fn is_geographic(&self) -> bool {
        match self {
            CoordinateSystem::WGS84 | CoordinateSystem::CGCS2000 => true,
            CoordinateSystem::Other(code) => (4000..5000).contains(code),
            _ => false,
        }
    }

    /// ESRI-flavoured WKT, as written to `.prj` sidecar files
    ///
    /// `None` for codes without a built-in definition.
    pub fn to_esri_wkt(&self) -> Option<String> {
        const WGS84_GEOGCS: &str = "GEOGCS[\"GCS_WGS_1984\",DATUM[\"D_WGS_1984\",\
            SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],PRIMEM[\"Greenwich\",0.0],\
            UNIT[\"Degree\",0.0174532925199433]]";

        match self {
            CoordinateSystem::WGS84 => Some(WGS84_GEOGCS.to_string()),
            CoordinateSystem::CGCS2000 => Some(
                "GEOGCS[\"GCS_China_Geodetic_Coordinate_System_2000\",DATUM[\"D_China_2000\",\
                SPHEROID[\"CGCS2000\",6378137.0,298.257222101]],PRIMEM[\"Greenwich\",0.0],\
                UNIT[\"Degree\",0.0174532925199433]]".to_string()
            ),
            CoordinateSystem::WebMercator => Some(format!(
                "PROJCS[\"WGS_1984_Web_Mercator_Auxiliary_Sphere\",{},\
                PROJECTION[\"Mercator_Auxiliary_Sphere\"],PARAMETER[\"False_Easting\",0.0],\
                PARAMETER[\"False_Northing\",0.0],PARAMETER[\"Central_Meridian\",0.0],\
                PARAMETER[\"Standard_Parallel_1\",0.0],PARAMETER[\"Auxiliary_Sphere_Type\",0.0],\
                UNIT[\"Meter\",1.0]]",
                WGS84_GEOGCS
            )),
            CoordinateSystem::UTM(zone, is_northern) => Some(format!(
                "PROJCS[\"WGS_1984_UTM_Zone_{}{}\",{},PROJECTION[\"Transverse_Mercator\"],\
                PARAMETER[\"False_Easting\",500000.0],PARAMETER[\"False_Northing\",{:.1}],\
                PARAMETER[\"Central_Meridian\",{:.1}],PARAMETER[\"Scale_Factor\",0.9996],\
                PARAMETER[\"Latitude_Of_Origin\",0.0],UNIT[\"Meter\",1.0]]",
                zone,
                if *is_northern { 'N' } else { 'S' },
                WGS84_GEOGCS,
                if *is_northern { 0.0 } else { 10_000_000.0 },
                -183.0 + 6.0 * *zone as f64
            )),
            CoordinateSystem::Other(_) => None,
        }
    }
}

/// Factory for creating coordinate systems
pub struct CoordinateSystemFactory;

impl CoordinateSystemFactory {
    /// Create a coordinate system from an EPSG code
    pub fn from_epsg(epsg: u32) -> CoordinateSystem {
        match epsg {
            4326 => CoordinateSystem::WGS84,
            4490 => CoordinateSystem::CGCS2000,
            3857 => CoordinateSystem::WebMercator,
            32601..=32660 => CoordinateSystem::UTM((epsg - 32600) as u8, true),
            32701..=32760 => CoordinateSystem::UTM((epsg - 32700) as u8, false),
            _ => CoordinateSystem::Other(epsg),
        }
    }

    /// Recognizes a coordinate system from a WKT or ESRI name
    pub fn from_wkt(wkt: &str) -> Option<CoordinateSystem> {
        let compact: String = wkt.chars().filter(|c| !c.is_whitespace()).collect::<String>().to_uppercase();

        if let Some(pos) = compact.find("UTM_ZONE_").or_else(|| compact.find("UTMZONE")) {
            let rest = compact[pos..].trim_start_matches("UTM_ZONE_").trim_start_matches("UTMZONE");
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            let zone = digits.parse::<u8>().ok().filter(|z| (1..=60).contains(z))?;
            let is_northern = !rest[digits.len()..].starts_with('S');
            return Some(CoordinateSystem::UTM(zone, is_northern));
        }
        if compact.contains("MERCATOR_AUXILIARY_SPHERE") || compact.contains("PSEUDO-MERCATOR") {
            return Some(CoordinateSystem::WebMercator);
        }
        if compact.starts_with("PROJCS") {
            return None;
        }
        if compact.contains("CHINA_2000") || compact.contains("CGCS2000") {
            return Some(CoordinateSystem::CGCS2000);
        }
        if compact.contains("WGS_1984") || compact.contains("WGS84") {
            return Some(CoordinateSystem::WGS84);
        }
        None
    }
}

/// Coordinate reference system attached to a raster
///
/// The GeoKey directory and its parameter tags are kept verbatim so that a
/// re-exported tile carries exactly the same georeferencing as its source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Crs {
    /// Resolved EPSG code, when the keys name one
    pub epsg: Option<u32>,
    /// Raw GeoKeyDirectoryTag values
    pub geo_key_directory: Vec<u16>,
    /// Raw GeoDoubleParamsTag values
    pub double_params: Vec<f64>,
    /// Raw GeoAsciiParamsTag contents
    pub ascii_params: String,
    /// Citation text from the citation keys
    pub citation: Option<String>,
}

impl Crs {
    /// Builds a CRS with a minimal GeoKey directory for an EPSG code
    ///
    /// Codes that do not fit a GeoKey value slot get a directory without the
    /// CRS key.
    pub fn from_epsg(epsg: u32) -> Self {
        let system = CoordinateSystemFactory::from_epsg(epsg);
        let (model, crs_key) = if system.is_geographic() {
            (geo_keys::MODEL_GEOGRAPHIC, geo_keys::GEOGRAPHIC_TYPE)
        } else {
            (geo_keys::MODEL_PROJECTED, geo_keys::PROJECTED_CS_TYPE)
        };

        let mut keys: Vec<[u16; 4]> = vec![
            [geo_keys::GT_MODEL_TYPE, 0, 1, model],
            [geo_keys::GT_RASTER_TYPE, 0, 1, geo_keys::RASTER_PIXEL_IS_AREA],
        ];
        if let Ok(code) = u16::try_from(epsg) {
            keys.push([crs_key, 0, 1, code]);
        }

        let mut directory = vec![1, 1, 0, keys.len() as u16];
        for key in keys {
            directory.extend_from_slice(&key);
        }

        Crs {
            epsg: Some(epsg),
            geo_key_directory: directory,
            double_params: Vec::new(),
            ascii_params: String::new(),
            citation: None,
        }
    }

    /// The well-known coordinate system behind this CRS, if any
    pub fn coordinate_system(&self) -> Option<CoordinateSystem> {
        if let Some(epsg) = self.epsg {
            return Some(CoordinateSystemFactory::from_epsg(epsg));
        }
        self.citation.as_deref().and_then(CoordinateSystemFactory::from_wkt)
    }

    /// ESRI WKT for the `.prj` sidecar, when one can be produced
    pub fn to_esri_wkt(&self) -> Option<String> {
        self.coordinate_system().and_then(|cs| cs.to_esri_wkt())
    }

    /// Short human-readable name, e.g. `EPSG:32650`
    pub fn description(&self) -> String {
        match (self.epsg, &self.citation) {
            (Some(code), _) => format!("EPSG:{}", code),
            (None, Some(citation)) if !citation.is_empty() => citation.clone(),
            _ => "User-defined".to_string(),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_epsg_builds_projected_directory() {
        let crs = Crs::from_epsg(32650);
        std::assert_eq!(crs.geo_key_directory[..4], [1, 1, 0, 3]);
        std::assert_eq!(crs.geo_key_directory[4..8], [geo_keys::GT_MODEL_TYPE, 0, 1, geo_keys::MODEL_PROJECTED]);
        std::assert_eq!(crs.geo_key_directory[12..16], [geo_keys::PROJECTED_CS_TYPE, 0, 1, 32650]);
        std::assert_eq!(crs.coordinate_system(), Some(CoordinateSystem::UTM(50, true)));
    }

    #[test]
    fn test_geographic_code_uses_geographic_key() {
        let crs = Crs::from_epsg(4326);
        std::assert_eq!(crs.geo_key_directory[7], geo_keys::MODEL_GEOGRAPHIC);
        std::assert_eq!(crs.geo_key_directory[12], geo_keys::GEOGRAPHIC_TYPE);
        std::assert!(crs.to_esri_wkt().unwrap().starts_with("GEOGCS[\"GCS_WGS_1984\""));
    }

    #[test]
    fn test_utm_wkt_parameters() {
        let wkt = CoordinateSystem::UTM(33, false).to_esri_wkt().unwrap();
        std::assert!(wkt.contains("WGS_1984_UTM_Zone_33S"));
        std::assert!(wkt.contains("PARAMETER[\"Central_Meridian\",15.0]"));
        std::assert!(wkt.contains("PARAMETER[\"False_Northing\",10000000.0]"));
    }

    #[test]
    fn test_wkt_recognition() {
        let wkt = CoordinateSystem::UTM(50, true).to_esri_wkt().unwrap();
        std::assert_eq!(CoordinateSystemFactory::from_wkt(&wkt), Some(CoordinateSystem::UTM(50, true)));
        std::assert_eq!(CoordinateSystemFactory::from_wkt("WGS 84"), Some(CoordinateSystem::WGS84));
        std::assert_eq!(CoordinateSystemFactory::from_wkt("PROJCS[\"Lambert\"]"), None);
        std::assert_eq!(CoordinateSystemFactory::from_wkt("WGS 84 / UTM zone 17S").map(|c| c.epsg_code()), Some(32717));
    }

    #[test]
    fn test_unknown_code_has_no_wkt() {
        std::assert!(Crs::from_epsg(2154).to_esri_wkt().is_none());
        std::assert_eq!(Crs::from_epsg(2154).description(), "EPSG:2154");
    }
}
