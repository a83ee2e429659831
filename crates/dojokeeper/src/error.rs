//! Error types for dojokeeper.
//!
//! Roster lookups never fail: an unknown student or martial art is a silent
//! no-op. Errors only come from the edges of the crate (configuration,
//! storage, date input) and from creating definitions that would break a
//! roster invariant.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for dojokeeper operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// A stored row could not be turned back into a roster value.
    #[error("corrupt {table} row: {message}")]
    CorruptRow {
        /// Table the row came from.
        table: &'static str,
        /// Description of the bad value.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Roster Errors ===
    /// A martial-art definition is unusable.
    #[error("invalid martial art '{name}': {message}")]
    InvalidMartialArt {
        /// Name of the martial art as submitted.
        name: String,
        /// Description of what is wrong with it.
        message: String,
    },

    /// An enrollment names a rank the martial art does not have.
    #[error("rank '{rank}' is not part of {martial_art}")]
    UnknownRank {
        /// The requested rank label.
        rank: String,
        /// Name of the martial art.
        martial_art: String,
    },

    /// An enrollment names a degree outside the martial art's range.
    #[error("degree {degree} is out of range for {martial_art} (max {max_degrees})")]
    DegreeOutOfRange {
        /// The requested degree.
        degree: u32,
        /// Highest degree the art allows.
        max_degrees: u32,
        /// Name of the martial art.
        martial_art: String,
    },

    /// A date string could not be parsed.
    #[error("invalid date '{input}': expected YYYY-MM-DD")]
    InvalidDate {
        /// The text that failed to parse.
        input: String,
    },

    // === I/O Errors ===
    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// A specialized Result type for dojokeeper operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create an invalid martial-art error.
    #[must_use]
    pub fn invalid_martial_art(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMartialArt {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a corrupt row error.
    #[must_use]
    pub fn corrupt_row(table: &'static str, message: impl Into<String>) -> Self {
        Self::CorruptRow {
            table,
            message: message.into(),
        }
    }
}
