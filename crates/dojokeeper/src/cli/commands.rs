//! CLI command definitions.
//!
//! This module defines the structure of all `dkeep` subcommands.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::model::{parse_date, Gender, StudentStatus};
use crate::presets::RankPreset;

/// Dojo branch commands.
#[derive(Debug, Subcommand)]
pub enum DojoCommand {
    /// Add a dojo branch
    Add {
        /// Branch name
        name: String,
    },

    /// List dojo branches
    List,
}

/// Martial-art catalog commands.
#[derive(Debug, Subcommand)]
pub enum ArtCommand {
    /// Add a martial art
    Add(ArtAddCommand),

    /// List martial arts with their ranks
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete a martial art and every graduation in it
    Delete {
        /// Martial art id
        id: u64,
    },
}

/// Arguments for adding a martial art.
#[derive(Debug, Args)]
pub struct ArtAddCommand {
    /// Martial art name (defaults to the preset's name)
    #[arg(required_unless_present = "preset")]
    pub name: Option<String>,

    /// Rank labels, lowest first, separated by commas
    #[arg(
        short,
        long,
        value_delimiter = ',',
        required_unless_present = "preset",
        conflicts_with = "preset"
    )]
    pub ranks: Vec<String>,

    /// Use a built-in rank sequence
    #[arg(short, long)]
    pub preset: Option<RankPreset>,

    /// Ranks have no degrees
    #[arg(long)]
    pub no_degrees: bool,

    /// Degrees per rank (defaults to the configured value)
    #[arg(short, long, conflicts_with = "no_degrees")]
    pub max_degrees: Option<u32>,

    /// Classes required for a rank, as RANK=CLASSES (repeatable)
    #[arg(long = "require", value_name = "RANK=CLASSES", value_parser = parse_requirement)]
    pub requirements: Vec<(String, u32)>,
}

/// Student commands.
#[derive(Debug, Subcommand)]
pub enum StudentCommand {
    /// Register a new student
    Register(RegisterCommand),

    /// List students
    List {
        /// Only students of this dojo branch
        #[arg(short, long)]
        dojo: Option<String>,

        /// Only students with this status
        #[arg(short, long)]
        status: Option<StudentStatus>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show one student with graduations and attendance
    Show {
        /// Student id
        id: u64,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Enroll a student in a martial art at a rank
    Enroll(EnrollCommand),

    /// Mark a student active or inactive
    SetStatus {
        /// Student id
        id: u64,

        /// New status (active or inactive)
        status: StudentStatus,
    },
}

/// Arguments for registering a student.
#[derive(Debug, Args)]
pub struct RegisterCommand {
    /// Full name
    pub full_name: String,

    /// Date of birth (YYYY-MM-DD)
    #[arg(short, long, value_parser = parse_date_arg)]
    pub birth_date: NaiveDate,

    /// Dojo branch
    #[arg(short, long)]
    pub dojo: String,

    /// Gender (male, female or other)
    #[arg(short, long, default_value = "male")]
    pub gender: Gender,

    /// Login name
    #[arg(short, long, default_value = "")]
    pub username: String,

    /// Login password
    #[arg(long, default_value = "")]
    pub password: String,

    /// Contact phone number
    #[arg(long, default_value = "")]
    pub phone: String,

    /// Internal registry number
    #[arg(long, default_value = "")]
    pub registry: String,

    /// Free-form notes
    #[arg(long, default_value = "")]
    pub observations: String,

    /// Enrollment date (YYYY-MM-DD, defaults to today)
    #[arg(short, long, value_parser = parse_date_arg)]
    pub enrolled: Option<NaiveDate>,

    /// Register as inactive
    #[arg(long)]
    pub inactive: bool,
}

/// Arguments for enrolling a student in a martial art.
#[derive(Debug, Args)]
pub struct EnrollCommand {
    /// Student id
    pub student: u64,

    /// Martial art id
    pub art: u64,

    /// Starting rank
    #[arg(short, long)]
    pub rank: String,

    /// Starting degree
    #[arg(short, long, default_value = "0")]
    pub degree: u32,

    /// Date the rank was reached (YYYY-MM-DD, defaults to today)
    #[arg(short, long, value_parser = parse_date_arg)]
    pub since: Option<NaiveDate>,
}

/// Attendance commands.
#[derive(Debug, Subcommand)]
pub enum AttendCommand {
    /// Mark students present in a class
    Mark {
        /// Martial art id
        art: u64,

        /// Student ids
        #[arg(required = true, num_args = 1..)]
        students: Vec<u64>,

        /// Class date (YYYY-MM-DD, defaults to today)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },

    /// Show the class roster for a martial art
    Roster {
        /// Martial art id
        art: u64,

        /// Class date (YYYY-MM-DD, defaults to today)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
}

/// Promotion commands.
#[derive(Debug, Subcommand)]
pub enum PromoteCommand {
    /// List students eligible for promotion
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Promote a student one step
    Apply {
        /// Student id
        #[arg(required_unless_present = "all")]
        student: Option<u64>,

        /// Martial art id
        #[arg(required_unless_present = "all")]
        art: Option<u64>,

        /// Promote every eligible student
        #[arg(long, conflicts_with_all = ["student", "art"])]
        all: bool,

        /// Promotion date (YYYY-MM-DD, defaults to today)
        #[arg(short, long, value_parser = parse_date_arg)]
        date: Option<NaiveDate>,
    },
}

/// Dashboard command arguments.
#[derive(Debug, Args)]
pub struct DashboardCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,

    /// Reference date (YYYY-MM-DD, defaults to today)
    #[arg(short, long, value_parser = parse_date_arg)]
    pub date: Option<NaiveDate>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// JSON output
    Json,
}

fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

/// Parse a `RANK=CLASSES` requirement.
fn parse_requirement(s: &str) -> Result<(String, u32), String> {
    let (rank, classes) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected RANK=CLASSES, got '{s}'"))?;
    let rank = rank.trim();
    if rank.is_empty() {
        return Err(format!("missing rank in '{s}'"));
    }
    let classes = classes
        .trim()
        .parse()
        .map_err(|_| format!("invalid class count in '{s}'"))?;
    Ok((rank.to_string(), classes))
}
