//! Database migration system for dojokeeper.
//!
//! Each migration is a list of statements tagged with the schema version it
//! produces. Migrations run in order inside the caller's connection, and the
//! reached version is recorded in the metadata table.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::schema::{CREATE_METADATA_TABLE, SCHEMA_STATEMENTS};

/// Key used to store the schema version in the metadata table.
const VERSION_KEY: &str = "schema_version";

/// Index for "who is enrolled in this art" lookups.
const CREATE_GRADUATION_ART_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_graduations_art ON graduations(martial_art_id)
";

/// Index for per-art attendance counts.
const CREATE_ATTENDANCE_ART_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_attendance_art_date ON attendance(martial_art_id, date)
";

/// Ordered migrations, `(version, statements)`.
const MIGRATIONS: &[(i32, &[&str])] = &[
    (1, SCHEMA_STATEMENTS),
    (2, &[CREATE_GRADUATION_ART_INDEX, CREATE_ATTENDANCE_ART_INDEX]),
];

/// The current schema version.
pub const CURRENT_VERSION: i32 = 2;

/// Bring the database schema up to [`CURRENT_VERSION`].
///
/// # Errors
///
/// Returns an error if a migration fails or the database was written by a
/// newer schema than this build knows.
pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_METADATA_TABLE, [])?;

    let version = get_schema_version(conn)?;
    if version > CURRENT_VERSION {
        return Err(Error::DatabaseMigration {
            message: format!(
                "database schema version {version} is newer than supported version \
                 {CURRENT_VERSION}"
            ),
        });
    }
    if version < CURRENT_VERSION {
        run_migrations(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (fresh database).
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result: std::result::Result<String, rusqlite::Error> = conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        [VERSION_KEY],
        |row| row.get(0),
    );

    match result {
        Ok(value) => value.parse().map_err(|_| Error::DatabaseMigration {
            message: format!("invalid schema version: {value}"),
        }),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
        (VERSION_KEY, version.to_string()),
    )?;
    Ok(())
}

/// Run every migration newer than `from_version`.
fn run_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for (version, _) in MIGRATIONS.iter().filter(|(v, _)| *v > from_version) {
        run_migration(conn, *version)?;
        set_schema_version(conn, *version)?;
    }
    info!(
        "Migrated roster schema from version {} to {}",
        from_version, CURRENT_VERSION
    );
    Ok(())
}

/// Run a specific migration version.
fn run_migration(conn: &Connection, version: i32) -> Result<()> {
    let Some((_, statements)) = MIGRATIONS.iter().find(|(v, _)| *v == version) else {
        return Err(Error::DatabaseMigration {
            message: format!("unknown migration version: {version}"),
        });
    };

    debug!("Applying schema migration {}", version);
    for statement in *statements {
        conn.execute(statement, [])?;
    }
    Ok(())
}
