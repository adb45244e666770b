use crate::code_table::CodeTable;
use crate::config::ResolverConfig;
use crate::override_table::OverrideTable;
use crate::result::Result;
use crate::srs::{CoordinateSystemCode, SpatialReferenceDefinition};
use crate::{BaseLoader, EpsgDatabase, OverrideLoader};
use tracing::{info, trace, warn};

/// Resolves EPSG codes to definitions, applying any override record over the base definition.
///
/// The tables are read-only once the resolver is built, so a resolver can be shared
/// between threads without locking.
/// # Examples
/// ```
/// use epsg::resolver::Resolver;
///
/// let resolver = Resolver::builtin();
/// let srs = resolver.resolve(26591u32).unwrap();
/// assert!((srs.get_parameter("central_meridian").unwrap() - -3.4523333333333).abs() < 5e-6);
/// ```
#[derive(Debug, Clone)]
pub struct Resolver<B = CodeTable, O = OverrideTable> {
    base: B,
    overrides: O,
}

impl<B: BaseLoader, O: OverrideLoader> Resolver<B, O> {
    pub fn new(base: B, overrides: O) -> Self {
        Resolver { base, overrides }
    }

    /// The definition as it appears in the base table, without overrides.
    pub fn load_base<C: Into<CoordinateSystemCode>>(
        &self,
        code: C,
    ) -> Result<SpatialReferenceDefinition> {
        self.base.load_base(code.into())
    }

    /// Look up `code` in the base table and overwrite the fields named by its override record.
    pub fn resolve<C: Into<CoordinateSystemCode>>(
        &self,
        code: C,
    ) -> Result<SpatialReferenceDefinition> {
        let code = code.into();
        let mut definition = self.base.load_base(code)?;
        if let Some(record) = self.overrides.load_override(code) {
            trace!(target: "epsg::resolve", "applying override to EPSG:{}", code);
            definition.apply_override(&record);
        }
        Ok(definition)
    }

    pub fn base(&self) -> &B {
        &self.base
    }

    pub fn overrides(&self) -> &O {
        &self.overrides
    }
}

impl Resolver {
    /// A resolver over the definitions and overrides that ship with the crate
    pub fn builtin() -> Self {
        Resolver::from_tables(CodeTable::builtin(), OverrideTable::builtin())
    }

    pub fn from_tables(base: CodeTable, overrides: OverrideTable) -> Self {
        for code in overrides.codes().filter(|c| !base.contains(*c)) {
            warn!(target: "epsg::resolve", "override for EPSG:{} has no base definition", code);
        }
        Resolver::new(base, overrides)
    }

    /// Build the tables described by `config`, reading the database and override files once.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        let (base, mut overrides) = match &config.database {
            Some(path) => {
                let db = EpsgDatabase::open(path)?;
                let tables = (db.code_table()?, db.override_table()?);
                db.close()?;
                tables
            }
            None => (CodeTable::builtin(), OverrideTable::builtin()),
        };
        for path in config.override_files() {
            overrides.extend(OverrideTable::from_csv_path(&path)?);
        }
        info!(
            target: "epsg::resolve",
            "loaded {} definitions and {} overrides",
            base.len(),
            overrides.len()
        );
        Ok(Resolver::from_tables(base, overrides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GCS_OVERRIDE_FILE, PCS_OVERRIDE_FILE};
    use crate::result::Error;
    use crate::srs::{CoordinateSystemKind, OverrideRecord};
    use std::fs;
    use std::thread;
    use tempfile::tempdir;

    fn code(c: u32) -> CoordinateSystemCode {
        CoordinateSystemCode::new(c)
    }

    #[test]
    fn central_meridian_override() {
        let srs = Resolver::builtin().resolve(code(26591)).unwrap();
        let cm = srs.get_parameter("central_meridian").unwrap();
        assert!((cm - -3.4523333333333).abs() <= 5e-6, "override missed: {}", cm);
    }

    #[test]
    fn towgs84_override() {
        let srs = Resolver::builtin().resolve(code(4312)).unwrap();
        let ds = srs.get_datum_shift(6).unwrap();
        assert!((ds - 2.4232).abs() <= 5e-4, "override missed: {}", ds);
    }

    #[test]
    fn unknown_code() {
        assert!(matches!(
            Resolver::builtin().resolve(code(0)),
            Err(Error::UnknownCode(c)) if c.get() == 0
        ));
    }

    #[test]
    fn no_override_matches_base() {
        let resolver = Resolver::builtin();
        for c in [4326, 4265, 4806, 32633] {
            assert_eq!(resolver.resolve(code(c)).unwrap(), resolver.load_base(code(c)).unwrap());
        }
    }

    #[test]
    fn non_overridden_fields_keep_base_values() {
        let resolver = Resolver::builtin();
        let base = resolver.load_base(code(26592)).unwrap();
        let resolved = resolver.resolve(code(26592)).unwrap();
        assert_eq!(resolved.get_parameter("false_easting").unwrap(), 2520000.0);
        assert_eq!(resolved.get_parameter("scale_factor").unwrap(), 0.9996);
        assert_eq!(resolved.name, base.name);
        assert_eq!(resolved.geographic_code, base.geographic_code);
        assert_ne!(resolved.parameters, base.parameters);
    }

    #[test]
    fn resolve_is_idempotent() {
        let resolver = Resolver::builtin();
        let first = resolver.resolve(code(4312)).unwrap();
        let second = resolver.resolve(code(4312)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn concurrent_resolve() {
        let resolver = Resolver::builtin();
        let expected = resolver.resolve(code(26591)).unwrap();
        thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| resolver.resolve(code(26591)).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
    }

    struct SingleDefinition;

    impl BaseLoader for SingleDefinition {
        fn load_base(&self, c: CoordinateSystemCode) -> Result<SpatialReferenceDefinition> {
            if c.get() != 1234 {
                return Err(Error::UnknownCode(c));
            }
            let mut def =
                SpatialReferenceDefinition::new(c, CoordinateSystemKind::Projected, "custom");
            def.parameters.insert("central_meridian", 1.0);
            Ok(def)
        }
    }

    #[test]
    fn custom_loaders() {
        let mut record = OverrideRecord::new(code(1234));
        record.name = Some("renamed".to_owned());
        let overrides: OverrideTable = std::iter::once(record).collect();
        let resolver = Resolver::new(SingleDefinition, overrides);

        let srs = resolver.resolve(code(1234)).unwrap();
        assert_eq!(srs.name, "renamed");
        assert_eq!(srs.get_parameter("central_meridian").unwrap(), 1.0);
        assert!(resolver.resolve(code(4326)).is_err());
    }

    #[test]
    fn config_without_sources_is_builtin() {
        let resolver = Resolver::from_config(&ResolverConfig::default()).unwrap();
        assert_eq!(resolver.base().len(), CodeTable::builtin().len());
        assert_eq!(resolver.overrides().len(), OverrideTable::builtin().len());
    }

    #[test]
    fn config_layers_override_files() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(GCS_OVERRIDE_FILE),
            "COORD_REF_SYS_CODE,DS\n4312,3.0\n4326,0.5\n",
        )
        .unwrap();
        fs::write(
            dir.path().join(PCS_OVERRIDE_FILE),
            "COORD_REF_SYS_CODE,PARAMETER_NAME_1,PARAMETER_VALUE_1\n32633,false_northing,10\n",
        )
        .unwrap();

        let db_path = dir.path().join("epsg.db");
        EpsgDatabase::create(&db_path).unwrap().close().unwrap();

        let config = ResolverConfig::default()
            .with_database(&db_path)
            .with_data_dir(dir.path());
        let resolver = Resolver::from_config(&config).unwrap();

        let mgi = resolver.resolve(code(4312)).unwrap();
        assert_eq!(mgi.get_datum_shift(6).unwrap(), 3.0);
        // the rest of the database override survives
        assert_eq!(mgi.get_datum_shift(0).unwrap(), 577.326);

        assert_eq!(resolver.resolve(code(4326)).unwrap().get_datum_shift(6).unwrap(), 0.5);
        let utm = resolver.resolve(code(32633)).unwrap();
        assert_eq!(utm.get_parameter("false_northing").unwrap(), 10.0);
        assert_eq!(utm.get_parameter("central_meridian").unwrap(), 15.0);

        let cm = resolver
            .resolve(code(26591))
            .unwrap()
            .get_parameter("central_meridian")
            .unwrap();
        assert!((cm - -3.4523333333333).abs() <= 5e-6);
    }

    #[test]
    fn config_with_missing_database() {
        let dir = tempdir().unwrap();
        let config = ResolverConfig::default().with_database(dir.path().join("missing.db"));
        assert!(Resolver::from_config(&config).is_err());
    }
}
