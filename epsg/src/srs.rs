use crate::result::{Error, Result};
use geo_types::Rect;
use std::collections::BTreeMap;
use std::fmt;

/// Number of Bursa-Wolf (TOWGS84) datum shift parameters
pub const DATUM_SHIFT_LEN: usize = 7;

/// An EPSG coordinate reference system code, the key of every table in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinateSystemCode(u32);

impl CoordinateSystemCode {
    pub const fn new(code: u32) -> Self {
        CoordinateSystemCode(code)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for CoordinateSystemCode {
    fn from(code: u32) -> Self {
        CoordinateSystemCode(code)
    }
}

impl fmt::Display for CoordinateSystemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystemKind {
    Geographic,
    Projected,
}

impl CoordinateSystemKind {
    /// The value stored in the `coord_ref_sys_kind` column
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateSystemKind::Geographic => "geographic",
            CoordinateSystemKind::Projected => "projected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "geographic" => Some(CoordinateSystemKind::Geographic),
            "projected" => Some(CoordinateSystemKind::Projected),
            _ => None,
        }
    }
}

// parameter names are compared the way EPSG lookups compare them
fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Projection parameters keyed by name, e.g. `central_meridian`.
///
/// Names are trimmed and matched case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionParameterSet(BTreeMap<String, f64>);

impl ProjectionParameterSet {
    pub fn new() -> Self {
        ProjectionParameterSet(BTreeMap::new())
    }

    /// Set a parameter, returning the previous value if there was one.
    pub fn insert(&mut self, name: &str, value: f64) -> Option<f64> {
        self.0.insert(normalize_name(name), value)
    }

    /// Fetch a parameter by name.
    /// # Examples
    /// ```
    /// use epsg::srs::ProjectionParameterSet;
    ///
    /// let params: ProjectionParameterSet = [("central_meridian", 9.0)].into_iter().collect();
    /// assert_eq!(params.get("Central_Meridian").unwrap(), 9.0);
    /// assert!(params.get("false_easting").is_err());
    /// ```
    pub fn get(&self, name: &str) -> Result<f64> {
        self.0
            .get(&normalize_name(name))
            .copied()
            .ok_or_else(|| Error::ParameterNotFound(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&normalize_name(name))
    }

    /// Parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copy every parameter of `other` over this set, replacing values that exist in both.
    pub fn overwrite_from(&mut self, other: &ProjectionParameterSet) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), *value);
        }
    }
}

impl<'a> FromIterator<(&'a str, f64)> for ProjectionParameterSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut params = ProjectionParameterSet::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

/// The seven Bursa-Wolf (TOWGS84) parameters: dx, dy, dz, rx, ry, rz, ds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatumShiftParameters([f64; DATUM_SHIFT_LEN]);

impl DatumShiftParameters {
    pub const fn new(values: [f64; DATUM_SHIFT_LEN]) -> Self {
        DatumShiftParameters(values)
    }

    pub fn get(&self, index: usize) -> Result<f64> {
        self.0
            .get(index)
            .copied()
            .ok_or(Error::DatumShiftIndexOutOfRange(index))
    }

    pub fn values(&self) -> &[f64; DATUM_SHIFT_LEN] {
        &self.0
    }
}

impl From<[f64; DATUM_SHIFT_LEN]> for DatumShiftParameters {
    fn from(values: [f64; DATUM_SHIFT_LEN]) -> Self {
        DatumShiftParameters(values)
    }
}

/// A datum shift where only the `Some` slots are specified.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialDatumShift([Option<f64>; DATUM_SHIFT_LEN]);

impl PartialDatumShift {
    pub const fn new(values: [Option<f64>; DATUM_SHIFT_LEN]) -> Self {
        PartialDatumShift(values)
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied().flatten()
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<()> {
        let slot = self
            .0
            .get_mut(index)
            .ok_or(Error::DatumShiftIndexOutOfRange(index))?;
        *slot = Some(value);
        Ok(())
    }

    pub fn values(&self) -> &[Option<f64>; DATUM_SHIFT_LEN] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(Option::is_none)
    }

    /// Fill the specified slots over `base`. A missing base starts from all zeros.
    pub fn apply_to(&self, base: Option<DatumShiftParameters>) -> DatumShiftParameters {
        let mut values = base.map(|b| b.0).unwrap_or([0.0; DATUM_SHIFT_LEN]);
        for (slot, value) in values.iter_mut().zip(self.0.iter()) {
            if let Some(v) = value {
                *slot = *v;
            }
        }
        DatumShiftParameters(values)
    }

    /// Take every slot `other` specifies.
    pub fn overwrite_from(&mut self, other: &PartialDatumShift) {
        for (slot, value) in self.0.iter_mut().zip(other.0.iter()) {
            if value.is_some() {
                *slot = *value;
            }
        }
    }
}

impl From<[f64; DATUM_SHIFT_LEN]> for PartialDatumShift {
    fn from(values: [f64; DATUM_SHIFT_LEN]) -> Self {
        PartialDatumShift(values.map(Some))
    }
}

// WKT quotes a `"` inside a string by doubling it
fn escape_wkt(s: &str) -> String {
    s.replace('"', "\"\"")
}

/// A resolved spatial reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialReferenceDefinition {
    pub code: CoordinateSystemCode,
    pub kind: CoordinateSystemKind,
    pub name: String,
    pub authority: String,
    pub parameters: ProjectionParameterSet,
    pub datum_shift: Option<DatumShiftParameters>,
    /// For projected systems, the geographic system the projection is based on
    pub geographic_code: Option<CoordinateSystemCode>,
    /// Bounds in lon/lat degrees
    pub area_of_use: Option<Rect<f64>>,
}

impl SpatialReferenceDefinition {
    pub fn new(code: CoordinateSystemCode, kind: CoordinateSystemKind, name: &str) -> Self {
        SpatialReferenceDefinition {
            code,
            kind,
            name: name.to_owned(),
            authority: "EPSG".to_owned(),
            parameters: ProjectionParameterSet::new(),
            datum_shift: None,
            geographic_code: None,
            area_of_use: None,
        }
    }

    pub fn get_parameter(&self, name: &str) -> Result<f64> {
        self.parameters.get(name)
    }

    /// Fetch one of the seven TOWGS84 values, `index` runs from 0 (dx) to 6 (ds).
    pub fn get_datum_shift(&self, index: usize) -> Result<f64> {
        self.datum_shift
            .as_ref()
            .ok_or(Error::DatumShiftNotFound(self.code))?
            .get(index)
    }

    /// Overwrite every field the record specifies, leaving the rest untouched.
    pub fn apply_override(&mut self, record: &OverrideRecord) {
        if let Some(name) = &record.name {
            self.name = name.clone();
        }
        self.parameters.overwrite_from(&record.parameters);
        if !record.datum_shift.is_empty() {
            self.datum_shift = Some(record.datum_shift.apply_to(self.datum_shift));
        }
    }

    /// Render as WKT1, e.g. `GEOGCS["MGI",TOWGS84[...],AUTHORITY["EPSG","4312"]]`
    pub fn to_wkt(&self) -> String {
        let keyword = match self.kind {
            CoordinateSystemKind::Geographic => "GEOGCS",
            CoordinateSystemKind::Projected => "PROJCS",
        };
        let mut wkt = format!("{}[\"{}\"", keyword, escape_wkt(&self.name));
        if let Some(shift) = &self.datum_shift {
            let values: Vec<String> = shift.values().iter().map(f64::to_string).collect();
            wkt.push_str(&format!(",TOWGS84[{}]", values.join(",")));
        }
        for (name, value) in self.parameters.iter() {
            wkt.push_str(&format!(",PARAMETER[\"{}\",{}]", escape_wkt(name), value));
        }
        wkt.push_str(&format!(
            ",AUTHORITY[\"{}\",\"{}\"]]",
            escape_wkt(&self.authority),
            self.code
        ));
        wkt
    }
}

/// A correction to the base definition of one code. Only the fields that are set take effect.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideRecord {
    pub code: CoordinateSystemCode,
    pub name: Option<String>,
    pub parameters: ProjectionParameterSet,
    pub datum_shift: PartialDatumShift,
}

impl OverrideRecord {
    pub fn new(code: CoordinateSystemCode) -> Self {
        OverrideRecord {
            code,
            name: None,
            parameters: ProjectionParameterSet::new(),
            datum_shift: PartialDatumShift::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parameters.is_empty() && self.datum_shift.is_empty()
    }

    /// Combine with a record from a later source, whose fields win.
    pub fn merge(&mut self, later: &OverrideRecord) {
        if later.name.is_some() {
            self.name = later.name.clone();
        }
        self.parameters.overwrite_from(&later.parameters);
        self.datum_shift.overwrite_from(&later.datum_shift);
    }
}

/// The definitions and overrides that ship with the crate
pub mod defaults {
    use super::*;

    pub struct SeedDefinition {
        pub code: u32,
        pub name: &'static str,
        pub kind: CoordinateSystemKind,
        pub geographic_code: Option<u32>,
        pub parameters: &'static [(&'static str, f64)],
        pub datum_shift: Option<[f64; DATUM_SHIFT_LEN]>,
        /// min lon, min lat, max lon, max lat
        pub area_of_use: Option<[f64; 4]>,
    }

    impl SeedDefinition {
        pub fn to_definition(&self) -> SpatialReferenceDefinition {
            let mut def = SpatialReferenceDefinition::new(self.code.into(), self.kind, self.name);
            def.parameters = self.parameters.iter().copied().collect();
            def.datum_shift = self.datum_shift.map(DatumShiftParameters::new);
            def.geographic_code = self.geographic_code.map(CoordinateSystemCode::new);
            def.area_of_use = self
                .area_of_use
                .map(|[min_x, min_y, max_x, max_y]| Rect::new((min_x, min_y), (max_x, max_y)));
            def
        }
    }

    pub struct SeedOverride {
        pub code: u32,
        pub name: Option<&'static str>,
        pub parameters: &'static [(&'static str, f64)],
        pub datum_shift: Option<[f64; DATUM_SHIFT_LEN]>,
    }

    impl SeedOverride {
        pub fn to_record(&self) -> OverrideRecord {
            let mut record = OverrideRecord::new(self.code.into());
            record.name = self.name.map(str::to_owned);
            record.parameters = self.parameters.iter().copied().collect();
            if let Some(shift) = self.datum_shift {
                record.datum_shift = shift.into();
            }
            record
        }
    }

    const TRANSVERSE_MERCATOR_ZONE_1: &[(&str, f64)] = &[
        ("latitude_of_origin", 0.0),
        ("central_meridian", 9.0),
        ("scale_factor", 0.9996),
        ("false_easting", 1500000.0),
        ("false_northing", 0.0),
    ];

    const TRANSVERSE_MERCATOR_ZONE_2: &[(&str, f64)] = &[
        ("latitude_of_origin", 0.0),
        ("central_meridian", 15.0),
        ("scale_factor", 0.9996),
        ("false_easting", 2520000.0),
        ("false_northing", 0.0),
    ];

    const MONTE_MARIO_TOWGS84: [f64; DATUM_SHIFT_LEN] =
        [-104.1, -49.1, -9.9, 0.971, -2.917, 0.714, -11.68];

    pub const WGS84: SeedDefinition = SeedDefinition {
        code: 4326,
        name: "WGS 84",
        kind: CoordinateSystemKind::Geographic,
        geographic_code: None,
        parameters: &[],
        datum_shift: Some([0.0; DATUM_SHIFT_LEN]),
        area_of_use: Some([-180.0, -90.0, 180.0, 90.0]),
    };
    pub const MONTE_MARIO: SeedDefinition = SeedDefinition {
        code: 4265,
        name: "Monte Mario",
        kind: CoordinateSystemKind::Geographic,
        geographic_code: None,
        parameters: &[],
        datum_shift: Some(MONTE_MARIO_TOWGS84),
        area_of_use: Some([5.93, 34.76, 18.99, 47.1]),
    };
    pub const MGI: SeedDefinition = SeedDefinition {
        code: 4312,
        name: "MGI",
        kind: CoordinateSystemKind::Geographic,
        geographic_code: None,
        parameters: &[],
        datum_shift: Some([601.705, 84.263, 485.227, 4.7354, 1.3145, 5.393, -2.3887]),
        area_of_use: Some([9.53, 46.4, 17.17, 49.02]),
    };
    pub const MONTE_MARIO_ROME: SeedDefinition = SeedDefinition {
        code: 4806,
        name: "Monte Mario (Rome)",
        kind: CoordinateSystemKind::Geographic,
        geographic_code: None,
        parameters: &[("prime_meridian", 12.4523333333333)],
        datum_shift: Some(MONTE_MARIO_TOWGS84),
        area_of_use: Some([5.93, 34.76, 18.99, 47.1]),
    };
    pub const ITALY_ZONE_1: SeedDefinition = SeedDefinition {
        code: 26591,
        name: "Monte Mario (Rome) / Italy zone 1",
        kind: CoordinateSystemKind::Projected,
        geographic_code: Some(4806),
        parameters: TRANSVERSE_MERCATOR_ZONE_1,
        datum_shift: None,
        area_of_use: Some([5.93, 36.53, 12.0, 47.04]),
    };
    pub const ITALY_ZONE_2: SeedDefinition = SeedDefinition {
        code: 26592,
        name: "Monte Mario (Rome) / Italy zone 2",
        kind: CoordinateSystemKind::Projected,
        geographic_code: Some(4806),
        parameters: TRANSVERSE_MERCATOR_ZONE_2,
        datum_shift: None,
        area_of_use: Some([12.0, 34.76, 18.99, 47.1]),
    };
    pub const UTM_33N: SeedDefinition = SeedDefinition {
        code: 32633,
        name: "WGS 84 / UTM zone 33N",
        kind: CoordinateSystemKind::Projected,
        geographic_code: Some(4326),
        parameters: &[
            ("latitude_of_origin", 0.0),
            ("central_meridian", 15.0),
            ("scale_factor", 0.9996),
            ("false_easting", 500000.0),
            ("false_northing", 0.0),
        ],
        datum_shift: None,
        area_of_use: Some([12.0, 0.0, 18.0, 84.0]),
    };

    pub const DEFINITIONS: &[SeedDefinition] = &[
        WGS84,
        MONTE_MARIO,
        MGI,
        MONTE_MARIO_ROME,
        ITALY_ZONE_1,
        ITALY_ZONE_2,
        UTM_33N,
    ];

    // the base tables give the Italy zone meridians relative to Greenwich
    // even though the geographic system uses the Rome prime meridian
    pub const ITALY_ZONE_1_MERIDIAN: SeedOverride = SeedOverride {
        code: 26591,
        name: None,
        parameters: &[("central_meridian", -3.4523333333333)],
        datum_shift: None,
    };
    pub const ITALY_ZONE_2_MERIDIAN: SeedOverride = SeedOverride {
        code: 26592,
        name: None,
        parameters: &[("central_meridian", 2.5476666666667)],
        datum_shift: None,
    };
    pub const MGI_TOWGS84: SeedOverride = SeedOverride {
        code: 4312,
        name: None,
        parameters: &[],
        datum_shift: Some([577.326, 90.129, 463.919, 5.137, 1.474, 5.297, 2.4232]),
    };

    pub const OVERRIDES: &[SeedOverride] =
        &[ITALY_ZONE_1_MERIDIAN, ITALY_ZONE_2_MERIDIAN, MGI_TOWGS84];
}
