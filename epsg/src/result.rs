use crate::srs::CoordinateSystemCode;

/// The result returned by many methods within the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("EPSG code {0} is not present in the coordinate system table")]
    UnknownCode(CoordinateSystemCode),
    #[error("Projection parameter `{0}` not found")]
    ParameterNotFound(String),
    #[error("EPSG:{0} has no datum shift parameters")]
    DatumShiftNotFound(CoordinateSystemCode),
    #[error("Datum shift index {0} is out of range, expected 0 to 6")]
    DatumShiftIndexOutOfRange(usize),
    #[error("Stored definition for EPSG:{code} is invalid: {reason}")]
    InvalidDefinition {
        code: CoordinateSystemCode,
        reason: String,
    },
    #[error("Invalid override file at line {line}: {reason}")]
    InvalidOverrideFile { line: u64, reason: String },
    #[error("Error when accessing the SQLite database")]
    SQLiteError(#[from] rusqlite::Error),
    #[error("Error when reading an override file")]
    CsvError(#[from] csv::Error),
    #[error("Error when reading from disk")]
    IoError(#[from] std::io::Error),
    #[error("EPSG database failed validation check when opening")]
    ValidationError,
}
