pub mod code_table;
pub mod config;
pub mod csv_override;
pub mod override_table;
pub mod resolver;
pub mod result;
mod sql;
pub mod srs;
use crate::result::{Error, Result};
use crate::sql::table_definitions::*;
use crate::srs::{
    defaults, CoordinateSystemCode, CoordinateSystemKind, DatumShiftParameters, OverrideRecord,
    PartialDatumShift, SpatialReferenceDefinition, DATUM_SHIFT_LEN,
};
use geo_types::Rect;
use rusqlite::{params, Connection, DatabaseName, OpenFlags, Row};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

pub use code_table::CodeTable;
pub use config::ResolverConfig;
pub use override_table::OverrideTable;
pub use resolver::Resolver;

/// "EPSG" in ASCII, stored in the `application_id` pragma
const APPLICATION_ID: u32 = 0x45505347;
const USER_VERSION: u32 = 1;

/// Source of base definitions, looked up by code.
pub trait BaseLoader {
    /// Fetch the base definition for `code`, failing with [Error::UnknownCode] if the table
    /// has no entry for it.
    fn load_base(&self, code: CoordinateSystemCode) -> Result<SpatialReferenceDefinition>;
}

/// Source of override records, looked up by code.
pub trait OverrideLoader {
    /// Fetch the override record for `code`. A code without overrides is not an error.
    fn load_override(&self, code: CoordinateSystemCode) -> Option<OverrideRecord>;
}

/// An SQLite file holding the base coordinate system table and the override table.
///
/// The tables are meant to be read into memory once with [EpsgDatabase::code_table] and
/// [EpsgDatabase::override_table] rather than queried per lookup.
pub struct EpsgDatabase {
    /// The underlying rusqlite connection
    ///
    /// Writes made through the connection bypass the checks done when loading,
    /// so take care that every datum shift row is either fully set or fully null.
    pub conn: Connection,
}

struct CoordinateSystemRow {
    code: u32,
    name: String,
    kind: String,
    authority: String,
    geographic_code: Option<u32>,
    datum_shift: [Option<f64>; DATUM_SHIFT_LEN],
    bounds: [Option<f64>; 4],
}

impl CoordinateSystemRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut datum_shift = [None; DATUM_SHIFT_LEN];
        for (i, slot) in datum_shift.iter_mut().enumerate() {
            *slot = row.get(5 + i)?;
        }
        let mut bounds = [None; 4];
        for (i, slot) in bounds.iter_mut().enumerate() {
            *slot = row.get(12 + i)?;
        }
        Ok(CoordinateSystemRow {
            code: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            authority: row.get(3)?,
            geographic_code: row.get(4)?,
            datum_shift,
            bounds,
        })
    }

    fn into_definition(self) -> Result<SpatialReferenceDefinition> {
        let code = CoordinateSystemCode::new(self.code);
        let kind =
            CoordinateSystemKind::parse(&self.kind).ok_or_else(|| Error::InvalidDefinition {
                code,
                reason: format!("unknown coordinate system kind `{}`", self.kind),
            })?;
        let mut definition = SpatialReferenceDefinition::new(code, kind, &self.name);
        definition.authority = self.authority;
        definition.geographic_code = self.geographic_code.map(CoordinateSystemCode::new);
        definition.datum_shift =
            all_or_nothing(self.datum_shift, code, "datum shift")?.map(DatumShiftParameters::new);
        definition.area_of_use = all_or_nothing(self.bounds, code, "area of use")?
            .map(|[min_x, min_y, max_x, max_y]| Rect::new((min_x, min_y), (max_x, max_y)));
        Ok(definition)
    }
}

// a group of nullable columns has to be entirely null or entirely set
fn all_or_nothing<const N: usize>(
    values: [Option<f64>; N],
    code: CoordinateSystemCode,
    what: &str,
) -> Result<Option<[f64; N]>> {
    if values.iter().all(Option::is_none) {
        return Ok(None);
    }
    if values.iter().any(Option::is_none) {
        return Err(Error::InvalidDefinition {
            code,
            reason: format!("{} is only partially set", what),
        });
    }
    Ok(Some(values.map(Option::unwrap_or_default)))
}

fn read_parameter(row: &Row<'_>) -> rusqlite::Result<(u32, String, f64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

impl EpsgDatabase {
    /// Creates a database with the coordinate system and override tables,
    /// seeded with the definitions and overrides that ship with the crate.
    ///
    /// # Examples
    /// ```ignore
    /// # use std::path::Path;
    /// let path = Path::new("./epsg.db");
    /// let db = EpsgDatabase::create(path).unwrap();
    /// ```
    pub fn create<P: AsRef<Path>>(path: P) -> Result<EpsgDatabase> {
        let conn = Connection::open(path)?;
        let db = EpsgDatabase { conn };
        db.conn
            .pragma_update(Some(DatabaseName::Main), "application_id", APPLICATION_ID)?;
        db.conn
            .pragma_update(Some(DatabaseName::Main), "user_version", USER_VERSION)?;
        db.conn.execute(CREATE_COORDINATE_SYSTEM_TABLE, [])?;
        db.conn.execute(CREATE_PROJECTION_PARAMETER_TABLE, [])?;
        db.conn.execute(CREATE_OVERRIDE_TABLE, [])?;
        db.conn.execute(CREATE_OVERRIDE_PARAMETER_TABLE, [])?;
        for seed in defaults::DEFINITIONS {
            db.new_definition(&seed.to_definition())?;
        }
        for seed in defaults::OVERRIDES {
            db.new_override(&seed.to_record())?;
        }
        debug!(
            target: "epsg::db",
            "created EPSG database with {} definitions",
            defaults::DEFINITIONS.len()
        );
        Ok(db)
    }

    /// Open a database, validating it before any table is read.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<EpsgDatabase> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        let application_id: u32 =
            conn.query_row("SELECT * FROM pragma_application_id()", [], |row| {
                row.get(0)
            })?;
        if application_id != APPLICATION_ID {
            warn!(target: "epsg::db", "unexpected application_id {:#x}", application_id);
            return Err(Error::ValidationError);
        }
        let user_version: u32 =
            conn.query_row("SELECT * FROM pragma_user_version()", [], |row| row.get(0))?;
        if user_version > USER_VERSION {
            warn!(
                target: "epsg::db",
                "database version {} is newer than {}",
                user_version,
                USER_VERSION
            );
            return Err(Error::ValidationError);
        }
        let integrity_check: String =
            conn.query_row("SELECT * FROM pragma_integrity_check()", [], |row| {
                row.get(0)
            })?;
        if integrity_check != "ok" {
            warn!(target: "epsg::db", "integrity check failed: {}", integrity_check);
            return Err(Error::ValidationError);
        }
        // use a block to force a drop of stmt and release the borrow
        // so that we can move conn
        {
            let mut stmt = conn.prepare("SELECT * FROM pragma_foreign_key_check()")?;
            let mut rows = stmt.query([])?;
            if rows.next()?.is_some() {
                warn!(target: "epsg::db", "foreign key check failed");
                return Err(Error::ValidationError);
            }
        }
        Ok(EpsgDatabase { conn })
    }

    /// Close the database
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| Error::SQLiteError(e))
    }

    /// Add a base definition. Fails if the code is already present.
    pub fn new_definition(&self, definition: &SpatialReferenceDefinition) -> Result<()> {
        const STMT: &str = "INSERT INTO epsg_coordinate_system VALUES
            (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)";
        const PARAM_STMT: &str = "INSERT INTO epsg_projection_parameter VALUES (?1, ?2, ?3)";
        let shift = definition
            .datum_shift
            .map(|s| (*s.values()).map(Some))
            .unwrap_or([None; DATUM_SHIFT_LEN]);
        let bounds = definition
            .area_of_use
            .map(|r| [Some(r.min().x), Some(r.min().y), Some(r.max().x), Some(r.max().y)])
            .unwrap_or([None; 4]);
        let code = definition.code.get();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            STMT,
            params![
                code,
                definition.name,
                definition.kind.as_str(),
                definition.authority,
                definition.geographic_code.map(CoordinateSystemCode::get),
                shift[0],
                shift[1],
                shift[2],
                shift[3],
                shift[4],
                shift[5],
                shift[6],
                bounds[0],
                bounds[1],
                bounds[2],
                bounds[3],
            ],
        )?;
        for (name, value) in definition.parameters.iter() {
            tx.execute(PARAM_STMT, params![code, name, value])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Store an override record, replacing whatever was stored for the same code.
    pub fn new_override(&self, record: &OverrideRecord) -> Result<()> {
        const STMT: &str =
            "INSERT OR REPLACE INTO epsg_override VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";
        const PARAM_STMT: &str = "INSERT INTO epsg_override_parameter VALUES (?1, ?2, ?3)";
        let shift = record.datum_shift.values();
        let code = record.code.get();

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM epsg_override_parameter WHERE coord_ref_sys_code = ?1",
            params![code],
        )?;
        tx.execute(
            STMT,
            params![
                code, record.name, shift[0], shift[1], shift[2], shift[3], shift[4], shift[5],
                shift[6],
            ],
        )?;
        for (name, value) in record.parameters.iter() {
            tx.execute(PARAM_STMT, params![code, name, value])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Store every record of an override file, returning how many were stored.
    ///
    /// Each record is merged over whatever is already stored for its code, the file's
    /// values winning, the same way override files are layered when loaded into a
    /// [Resolver]. Rows that override nothing are skipped.
    pub fn import_override_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let records = csv_override::read_override_file(&path)?;
        let mut overrides = self.override_table()?;
        let mut stored = 0;
        for record in records.into_iter().filter(|r| !r.is_empty()) {
            let code = record.code;
            overrides.insert(record);
            if let Some(merged) = overrides.load_override(code) {
                self.new_override(&merged)?;
                stored += 1;
            }
        }
        info!(
            target: "epsg::db",
            "imported {} override records from {}",
            stored,
            path.as_ref().display()
        );
        Ok(stored)
    }

    /// Read the whole coordinate system table into memory.
    pub fn code_table(&self) -> Result<CodeTable> {
        let mut definitions = HashMap::new();
        let mut stmt = self.conn.prepare(SELECT_COORDINATE_SYSTEMS)?;
        for row in stmt.query_map([], CoordinateSystemRow::from_row)? {
            let definition = row?.into_definition()?;
            definitions.insert(definition.code, definition);
        }

        let mut stmt = self.conn.prepare(SELECT_PROJECTION_PARAMETERS)?;
        for row in stmt.query_map([], read_parameter)? {
            let (code, name, value) = row?;
            let code = CoordinateSystemCode::new(code);
            let definition = definitions
                .get_mut(&code)
                .ok_or_else(|| Error::InvalidDefinition {
                    code,
                    reason: format!("parameter `{}` has no coordinate system row", name),
                })?;
            definition.parameters.insert(&name, value);
        }

        info!(target: "epsg::db", "loaded {} coordinate systems", definitions.len());
        Ok(definitions.into_values().collect())
    }

    /// Read the whole override table into memory.
    pub fn override_table(&self) -> Result<OverrideTable> {
        let mut records = HashMap::new();
        let mut stmt = self.conn.prepare(SELECT_OVERRIDES)?;
        let rows = stmt.query_map([], |row| {
            let mut record = OverrideRecord::new(CoordinateSystemCode::new(row.get(0)?));
            record.name = row.get(1)?;
            let mut shift = [None; DATUM_SHIFT_LEN];
            for (i, slot) in shift.iter_mut().enumerate() {
                *slot = row.get(2 + i)?;
            }
            record.datum_shift = PartialDatumShift::new(shift);
            Ok(record)
        })?;
        for row in rows {
            let record = row?;
            records.insert(record.code, record);
        }

        let mut stmt = self.conn.prepare(SELECT_OVERRIDE_PARAMETERS)?;
        for row in stmt.query_map([], read_parameter)? {
            let (code, name, value) = row?;
            let code = CoordinateSystemCode::new(code);
            let record = records
                .get_mut(&code)
                .ok_or_else(|| Error::InvalidDefinition {
                    code,
                    reason: format!("override parameter `{}` has no override row", name),
                })?;
            record.parameters.insert(&name, value);
        }

        info!(target: "epsg::db", "loaded {} override records", records.len());
        Ok(records.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use tempfile::tempdir;

    use super::*;

    fn code(c: u32) -> CoordinateSystemCode {
        CoordinateSystemCode::new(c)
    }

    #[test]
    fn create_and_open() {
        let dir = tempdir().unwrap();
        let filename = dir.path().join("create.db");

        let db = EpsgDatabase::create(&filename).unwrap();
        db.close().unwrap();
        let db = EpsgDatabase::open(&filename).unwrap();

        let base = db.code_table().unwrap();
        let builtin = CodeTable::builtin();
        assert_eq!(base.len(), builtin.len());
        for c in builtin.codes() {
            assert_eq!(base.load_base(c).unwrap(), builtin.load_base(c).unwrap());
        }

        let overrides = db.override_table().unwrap();
        let builtin = OverrideTable::builtin();
        assert_eq!(overrides.len(), builtin.len());
        for c in builtin.codes() {
            assert_eq!(overrides.load_override(c), builtin.load_override(c));
        }
        db.close().unwrap();
    }

    #[test]
    fn open_rejects_foreign_file() {
        let dir = tempdir().unwrap();
        let filename = dir.path().join("other.db");
        let conn = Connection::open(&filename).unwrap();
        conn.execute("CREATE TABLE t (x INTEGER)", []).unwrap();
        conn.close().unwrap();

        assert!(matches!(
            EpsgDatabase::open(&filename),
            Err(Error::ValidationError)
        ));
    }

    #[test]
    fn stored_override_is_resolved() {
        let dir = tempdir().unwrap();
        let db = EpsgDatabase::create(dir.path().join("resolve.db")).unwrap();

        let mut def = SpatialReferenceDefinition::new(
            code(2056),
            CoordinateSystemKind::Projected,
            "CH1903+ / LV95",
        );
        def.geographic_code = Some(code(4150));
        def.parameters.insert("false_easting", 2600000.0);
        def.parameters.insert("false_northing", 1200000.0);
        db.new_definition(&def).unwrap();

        let mut record = OverrideRecord::new(code(2056));
        record.parameters.insert("false_northing", 1200001.0);
        db.new_override(&record).unwrap();

        let resolver = Resolver::new(db.code_table().unwrap(), db.override_table().unwrap());
        let srs = resolver.resolve(code(2056)).unwrap();
        assert_eq!(srs.get_parameter("false_easting").unwrap(), 2600000.0);
        assert_eq!(srs.get_parameter("false_northing").unwrap(), 1200001.0);
        assert_eq!(srs.datum_shift, None);
        assert_eq!(srs.area_of_use, None);

        // a duplicate code is refused
        assert!(db.new_definition(&def).is_err());
    }

    #[test]
    fn new_override_replaces() {
        let dir = tempdir().unwrap();
        let db = EpsgDatabase::create(dir.path().join("replace.db")).unwrap();

        let mut record = OverrideRecord::new(code(26591));
        record.parameters.insert("false_easting", 1.0);
        db.new_override(&record).unwrap();

        let overrides = db.override_table().unwrap();
        let stored = overrides.load_override(code(26591)).unwrap();
        assert_eq!(stored.parameters.len(), 1);
        assert!(!stored.parameters.contains("central_meridian"));
    }

    #[test]
    fn import_csv() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("gcs.override.csv");
        fs::write(
            &csv_path,
            "COORD_REF_SYS_CODE,COORD_REF_SYS_NAME,DX,DY,DZ,RX,RY,RZ,DS\n4265,Monte Mario,-50.2,-50.4,84.8,-0.69,-2.012,0.459,-28.08\n",
        )
        .unwrap();
        let db = EpsgDatabase::create(dir.path().join("import.db")).unwrap();
        assert_eq!(db.import_override_csv(&csv_path).unwrap(), 1);

        let resolver = Resolver::new(db.code_table().unwrap(), db.override_table().unwrap());
        let srs = resolver.resolve(code(4265)).unwrap();
        assert_eq!(srs.get_datum_shift(0).unwrap(), -50.2);
        assert_eq!(srs.get_datum_shift(6).unwrap(), -28.08);
    }

    #[test]
    fn import_csv_merges_with_stored_override() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("gcs.override.csv");
        fs::write(&csv_path, "COORD_REF_SYS_CODE,DS\n4312,3.0\n26591,\n").unwrap();
        let db = EpsgDatabase::create(dir.path().join("merge.db")).unwrap();
        // the bare 26591 row overrides nothing
        assert_eq!(db.import_override_csv(&csv_path).unwrap(), 1);

        let resolver = Resolver::new(db.code_table().unwrap(), db.override_table().unwrap());
        let mgi = resolver.resolve(code(4312)).unwrap();
        assert_eq!(mgi.get_datum_shift(6).unwrap(), 3.0);
        assert_eq!(mgi.get_datum_shift(0).unwrap(), 577.326);

        let cm = resolver
            .resolve(code(26591))
            .unwrap()
            .get_parameter("central_meridian")
            .unwrap();
        assert_eq!(cm, -3.4523333333333);

        // loading the same file from a data directory gives the same result
        db.close().unwrap();
        let layered = Resolver::from_config(
            &ResolverConfig::default()
                .with_database(dir.path().join("merge.db"))
                .with_data_dir(dir.path()),
        )
        .unwrap();
        assert_eq!(layered.resolve(code(4312)).unwrap(), mgi);
    }

    #[test]
    fn partial_datum_shift_row_is_invalid() {
        let dir = tempdir().unwrap();
        let db = EpsgDatabase::create(dir.path().join("partial.db")).unwrap();
        db.conn
            .execute(
                "UPDATE epsg_coordinate_system SET dx = NULL WHERE coord_ref_sys_code = 4312",
                [],
            )
            .unwrap();
        assert!(matches!(
            db.code_table(),
            Err(Error::InvalidDefinition { code: c, .. }) if c.get() == 4312
        ));
    }
}
