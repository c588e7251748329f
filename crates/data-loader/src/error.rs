//! Error types for the data-loader crate.
//!
//! Every failure of the ratings store or the CSV ingestion path ends up in
//! [`DataLoadError`]. Callers propagate these instead of treating them as an
//! empty result, so a broken database never looks like "no recommendations".

use thiserror::Error;

/// Errors that can occur while ingesting CSV data or talking to the store
///
/// The `#[derive(Error)]` macro from thiserror implements `std::error::Error`
/// and `Display` from the `#[error(...)]` attributes.
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The CSV reader rejected a record (bad quoting, wrong type, ...)
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// The SQLite ratings store returned an error
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A record was readable but one of its fields made no sense
    ///
    /// This variant stores context about where the error occurred
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: u64,
        reason: String,
    },

    /// A data field had an invalid value
    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    /// Referenced entity doesn't exist (e.g., rating for a movie that was never loaded)
    #[error("Missing reference: {entity} with id {id}")]
    MissingReference { entity: String, id: u32 },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
