use std::env;
use std::path::PathBuf;

/// Environment variable naming an EPSG SQLite database to load the tables from
pub const DATABASE_ENV: &str = "EPSG_DATABASE";
/// Environment variable naming a directory searched for override files
pub const DATA_DIR_ENV: &str = "EPSG_DATA";

/// Override file for geographic coordinate systems, looked up in the data directory
pub const GCS_OVERRIDE_FILE: &str = "gcs.override.csv";
/// Override file for projected coordinate systems, looked up in the data directory
pub const PCS_OVERRIDE_FILE: &str = "pcs.override.csv";

/// Where a [Resolver](crate::resolver::Resolver) gets its tables from.
///
/// Without a database the built-in tables are used. Override files found in the data
/// directory are layered over whichever overrides were loaded, `gcs.override.csv` first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolverConfig {
    pub database: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
}

impl ResolverConfig {
    pub fn from_env() -> Self {
        ResolverConfig {
            database: env::var_os(DATABASE_ENV).map(PathBuf::from),
            data_dir: env::var_os(DATA_DIR_ENV).map(PathBuf::from),
        }
    }

    pub fn with_database<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database = Some(path.into());
        self
    }

    pub fn with_data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// The override files that exist in the data directory, in load order
    pub fn override_files(&self) -> Vec<PathBuf> {
        let dir = match &self.data_dir {
            Some(dir) => dir,
            None => return Vec::new(),
        };
        [GCS_OVERRIDE_FILE, PCS_OVERRIDE_FILE]
            .iter()
            .map(|name| dir.join(name))
            .filter(|path| path.is_file())
            .collect()
    }
}
