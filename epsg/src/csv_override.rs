//! Reading of override files laid out like `gcs.override.csv` and `pcs.override.csv`.
//!
//! Columns are matched by name, ignoring case:
//! * `COORD_REF_SYS_CODE` (required)
//! * `COORD_REF_SYS_NAME`, an empty cell leaves the name alone
//! * `DX`, `DY`, `DZ`, `RX`, `RY`, `RZ`, `DS`, an empty cell leaves that value alone
//! * `PARAMETER_NAME_n` / `PARAMETER_VALUE_n` for n from 1 to 7
//!
//! Lines starting with `#` are skipped.
use crate::result::{Error, Result};
use crate::srs::{CoordinateSystemCode, OverrideRecord, DATUM_SHIFT_LEN};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const CODE_COLUMN: &str = "COORD_REF_SYS_CODE";
const NAME_COLUMN: &str = "COORD_REF_SYS_NAME";
const DATUM_SHIFT_COLUMNS: [&str; DATUM_SHIFT_LEN] = ["DX", "DY", "DZ", "RX", "RY", "RZ", "DS"];
const MAX_PARAMETERS: usize = 7;

fn invalid(line: u64, reason: String) -> Error {
    Error::InvalidOverrideFile { line, reason }
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

struct Columns {
    code: usize,
    name: Option<usize>,
    datum_shift: [Option<usize>; DATUM_SHIFT_LEN],
    // (name column, value column)
    parameters: Vec<(usize, usize)>,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Result<Self> {
        let line = line_of(header);
        let find = |wanted: &str| header.iter().position(|h| h.eq_ignore_ascii_case(wanted));

        let code = find(CODE_COLUMN)
            .ok_or_else(|| invalid(line, format!("missing {} column", CODE_COLUMN)))?;
        let name = find(NAME_COLUMN);
        let datum_shift = DATUM_SHIFT_COLUMNS.map(find);

        let mut parameters = Vec::new();
        for n in 1..=MAX_PARAMETERS {
            let name_col = find(format!("PARAMETER_NAME_{}", n).as_str());
            let value_col = find(format!("PARAMETER_VALUE_{}", n).as_str());
            match (name_col, value_col) {
                (Some(name_col), Some(value_col)) => parameters.push((name_col, value_col)),
                (None, None) => {}
                _ => {
                    return Err(invalid(
                        line,
                        format!("PARAMETER_NAME_{n} and PARAMETER_VALUE_{n} must appear together"),
                    ))
                }
            }
        }

        Ok(Columns {
            code,
            name,
            datum_shift,
            parameters,
        })
    }

    fn parse_row(&self, row: &StringRecord) -> Result<OverrideRecord> {
        let line = line_of(row);
        let code_field = row.get(self.code).unwrap_or("");
        let code: u32 = code_field
            .parse()
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| {
                invalid(
                    line,
                    format!("invalid coordinate system code `{}`", code_field),
                )
            })?;

        let mut record = OverrideRecord::new(code.into());
        if let Some(col) = self.name {
            let name = row.get(col).unwrap_or("");
            if !name.is_empty() {
                record.name = Some(name.to_owned());
            }
        }
        for (index, col) in self.datum_shift.iter().enumerate() {
            let value = col.map(|c| parse_value(row, c, line)).transpose()?;
            if let Some(value) = value.flatten() {
                record.datum_shift.set(index, value)?;
            }
        }
        for &(name_col, value_col) in &self.parameters {
            let name = row.get(name_col).unwrap_or("");
            if name.is_empty() {
                continue;
            }
            let value = parse_value(row, value_col, line)?
                .ok_or_else(|| invalid(line, format!("parameter `{}` has no value", name)))?;
            record.parameters.insert(name, value);
        }
        Ok(record)
    }
}

fn parse_value(row: &StringRecord, col: usize, line: u64) -> Result<Option<f64>> {
    let field = row.get(col).unwrap_or("");
    if field.is_empty() {
        return Ok(None);
    }
    field
        .parse::<f64>()
        .map(Some)
        .map_err(|_| invalid(line, format!("`{}` is not a number", field)))
}

/// Parse override records from CSV text. Rows repeating a code are merged into the
/// first record for that code, later rows winning.
pub fn read_overrides<R: Read>(reader: R) -> Result<Vec<OverrideRecord>> {
    // headers are read as an ordinary record so they carry a line number
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(reader);
    let mut rows = reader.records();

    let header = match rows.next() {
        Some(header) => header?,
        None => return Ok(Vec::new()),
    };
    let columns = Columns::from_header(&header)?;

    let mut records: Vec<OverrideRecord> = Vec::new();
    let mut seen: HashMap<CoordinateSystemCode, usize> = HashMap::new();
    for row in rows {
        let record = columns.parse_row(&row?)?;
        match seen.get(&record.code) {
            Some(&i) => records[i].merge(&record),
            None => {
                seen.insert(record.code, records.len());
                records.push(record);
            }
        }
    }
    Ok(records)
}

pub fn read_override_file<P: AsRef<Path>>(path: P) -> Result<Vec<OverrideRecord>> {
    let path = path.as_ref();
    let records = read_overrides(File::open(path)?)?;
    debug!(
        target: "epsg::csv",
        "read {} override records from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}
