use crate::csv_override;
use crate::result::Result;
use crate::srs::{defaults, CoordinateSystemCode, OverrideRecord};
use crate::OverrideLoader;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Override records keyed by code, held in memory.
///
/// Records added for a code that already has one are merged into it field by field,
/// so a table built from several sources lets the last source win.
#[derive(Debug, Clone, Default)]
pub struct OverrideTable {
    records: HashMap<CoordinateSystemCode, OverrideRecord>,
}

impl OverrideTable {
    pub fn new() -> Self {
        OverrideTable {
            records: HashMap::new(),
        }
    }

    /// A table holding the overrides that ship with the crate
    pub fn builtin() -> Self {
        defaults::OVERRIDES
            .iter()
            .map(defaults::SeedOverride::to_record)
            .collect()
    }

    /// Read a `gcs.override.csv` / `pcs.override.csv` style file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(csv_override::read_override_file(path)?.into_iter().collect())
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(csv_override::read_overrides(reader)?.into_iter().collect())
    }

    pub fn insert(&mut self, record: OverrideRecord) {
        match self.records.get_mut(&record.code) {
            Some(existing) => existing.merge(&record),
            None => {
                self.records.insert(record.code, record);
            }
        }
    }

    /// Layer every record of `later` over this table.
    pub fn extend(&mut self, later: OverrideTable) {
        for (_, record) in later.records {
            self.insert(record);
        }
    }

    pub fn codes(&self) -> impl Iterator<Item = CoordinateSystemCode> + '_ {
        self.records.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl OverrideLoader for OverrideTable {
    fn load_override(&self, code: CoordinateSystemCode) -> Option<OverrideRecord> {
        self.records.get(&code).cloned()
    }
}

impl FromIterator<OverrideRecord> for OverrideTable {
    fn from_iter<I: IntoIterator<Item = OverrideRecord>>(iter: I) -> Self {
        let mut table = OverrideTable::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}
