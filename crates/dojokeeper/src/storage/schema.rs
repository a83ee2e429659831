//! `SQLite` schema definitions for dojokeeper.
//!
//! This module contains the SQL statements for creating the roster tables.

/// SQL statement to create the dojo branch table.
pub const CREATE_DOJOS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS dojos (
    position INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
)
";

/// SQL statement to create the martial-art catalog table.
pub const CREATE_MARTIAL_ARTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS martial_arts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    uses_degrees INTEGER NOT NULL,
    max_degrees INTEGER NOT NULL
)
";

/// SQL statement to create the rank table. `position` is seniority.
pub const CREATE_RANKS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS martial_art_ranks (
    martial_art_id INTEGER NOT NULL REFERENCES martial_arts(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    label TEXT NOT NULL,
    required_classes INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (martial_art_id, position)
)
";

/// SQL statement to create the students table.
pub const CREATE_STUDENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS students (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL,
    password TEXT NOT NULL,
    status TEXT NOT NULL,
    full_name TEXT NOT NULL,
    birth_date TEXT NOT NULL,
    gender TEXT NOT NULL,
    contact_phone TEXT NOT NULL,
    internal_registry TEXT NOT NULL,
    observations TEXT NOT NULL,
    dojo TEXT NOT NULL,
    enrollment_date TEXT NOT NULL
)
";

/// SQL statement to create the graduations table.
///
/// The primary key allows one graduation per student and martial art.
pub const CREATE_GRADUATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS graduations (
    student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    martial_art_id INTEGER NOT NULL REFERENCES martial_arts(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    rank TEXT NOT NULL,
    degree INTEGER NOT NULL,
    last_promotion_date TEXT NOT NULL,
    rank_start_date TEXT NOT NULL,
    PRIMARY KEY (student_id, martial_art_id)
)
";

/// SQL statement to create the attendance table.
pub const CREATE_ATTENDANCE_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS attendance (
    student_id INTEGER NOT NULL REFERENCES students(id) ON DELETE CASCADE,
    martial_art_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    PRIMARY KEY (student_id, martial_art_id, date)
)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DOJOS_TABLE,
    CREATE_MARTIAL_ARTS_TABLE,
    CREATE_RANKS_TABLE,
    CREATE_STUDENTS_TABLE,
    CREATE_GRADUATIONS_TABLE,
    CREATE_ATTENDANCE_TABLE,
    CREATE_METADATA_TABLE,
];

/// Roster tables, children before parents, for clearing a snapshot.
pub const ROSTER_TABLES: &[&str] = &[
    "attendance",
    "graduations",
    "students",
    "martial_art_ranks",
    "martial_arts",
    "dojos",
];
