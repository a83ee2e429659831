//! Command-line interface for dojokeeper.
//!
//! This module provides the CLI structure for the `dkeep` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ArtAddCommand, ArtCommand, AttendCommand, ConfigCommand, DashboardCommand, DojoCommand,
    EnrollCommand, OutputFormat, PromoteCommand, RegisterCommand, StatusCommand, StudentCommand,
};

/// dkeep - Keep your dojo's roster
///
/// Tracks students, belt ranks, class attendance and monthly fees, and tells
/// you who has earned their next promotion.
#[derive(Debug, Parser)]
#[command(name = "dkeep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage dojo branches
    #[command(subcommand)]
    Dojo(DojoCommand),

    /// Manage the martial-art catalog
    #[command(subcommand)]
    Art(ArtCommand),

    /// Manage students
    #[command(subcommand)]
    Student(StudentCommand),

    /// Record and review class attendance
    #[command(subcommand)]
    Attend(AttendCommand),

    /// Review and apply promotions
    #[command(subcommand)]
    Promote(PromoteCommand),

    /// Show the admin dashboard
    Dashboard(DashboardCommand),

    /// Show database status
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Command {
    /// Check whether the command changes the roster.
    #[must_use]
    pub fn is_mutating(&self) -> bool {
        match self {
            Self::Dojo(cmd) => matches!(cmd, DojoCommand::Add { .. }),
            Self::Art(cmd) => !matches!(cmd, ArtCommand::List { .. }),
            Self::Student(cmd) => !matches!(
                cmd,
                StudentCommand::List { .. } | StudentCommand::Show { .. }
            ),
            Self::Attend(cmd) => matches!(cmd, AttendCommand::Mark { .. }),
            Self::Promote(cmd) => matches!(cmd, PromoteCommand::Apply { .. }),
            Self::Dashboard(_) | Self::Status(_) | Self::Config(_) => false,
        }
    }
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use crate::model::{Gender, StudentStatus};
    use crate::presets::RankPreset;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "dkeep");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let verbosity = |args: &[&str]| parse(args).verbosity();
        assert_eq!(verbosity(&["dkeep", "-q", "status"]), Verbosity::Quiet);
        assert_eq!(verbosity(&["dkeep", "status"]), Verbosity::Normal);
        assert_eq!(verbosity(&["dkeep", "-v", "status"]), Verbosity::Verbose);
        assert_eq!(verbosity(&["dkeep", "-vv", "status"]), Verbosity::Trace);
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["dkeep", "-c", "/custom/config.toml", "dashboard"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_art_add_with_ranks_and_requirements() {
        let cli = parse(&[
            "dkeep",
            "art",
            "add",
            "Judo",
            "--ranks",
            "Branca,Azul,Preta",
            "--require",
            "Branca=30",
            "--require",
            "Azul=60",
            "--no-degrees",
        ]);
        let Command::Art(ArtCommand::Add(add)) = cli.command else {
            panic!("expected art add");
        };
        assert_eq!(add.name.as_deref(), Some("Judo"));
        assert_eq!(add.ranks, vec!["Branca", "Azul", "Preta"]);
        assert_eq!(
            add.requirements,
            vec![("Branca".to_string(), 30), ("Azul".to_string(), 60)]
        );
        assert!(add.no_degrees);
    }

    #[test]
    fn test_parse_art_add_from_preset() {
        let cli = parse(&["dkeep", "art", "add", "--preset", "jiu-jitsu"]);
        let Command::Art(ArtCommand::Add(add)) = cli.command else {
            panic!("expected art add");
        };
        assert_eq!(add.preset, Some(RankPreset::JiuJitsu));
        assert!(add.name.is_none());
    }

    #[test]
    fn test_art_add_needs_ranks_or_preset() {
        let rejects = |args: &[&str]| Cli::try_parse_from(args).is_err();
        assert!(rejects(&["dkeep", "art", "add", "Judo"]));
        assert!(rejects(&[
            "dkeep",
            "art",
            "add",
            "Judo",
            "--ranks",
            "Branca",
            "--preset",
            "jiu-jitsu",
        ]));
    }

    #[test]
    fn test_parse_student_register() {
        let cli = parse(&[
            "dkeep",
            "student",
            "register",
            "Ana Souza",
            "--birth-date",
            "1990-03-15",
            "--dojo",
            "Matriz",
            "--gender",
            "female",
        ]);
        let Command::Student(StudentCommand::Register(register)) = cli.command else {
            panic!("expected student register");
        };
        assert_eq!(register.full_name, "Ana Souza");
        assert_eq!(register.gender, Gender::Female);
        assert!(register.enrolled.is_none());
        assert!(!register.inactive);
    }

    #[test]
    fn test_register_rejects_bad_date() {
        let result = Cli::try_parse_from([
            "dkeep",
            "student",
            "register",
            "Ana",
            "--birth-date",
            "15/03/1990",
            "--dojo",
            "Matriz",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_set_status() {
        let cli = parse(&["dkeep", "student", "set-status", "3", "inactive"]);
        assert!(matches!(
            cli.command,
            Command::Student(StudentCommand::SetStatus {
                id: 3,
                status: StudentStatus::Inactive
            })
        ));
    }

    #[test]
    fn test_parse_attend_mark_many_students() {
        let cli = parse(&["dkeep", "attend", "mark", "1", "4", "5", "--date", "2024-02-07"]);
        let Command::Attend(AttendCommand::Mark { art, students, date }) = cli.command else {
            panic!("expected attend mark");
        };
        assert_eq!(art, 1);
        assert_eq!(students, vec![4, 5]);
        assert!(date.is_some());
    }

    #[test]
    fn test_parse_promote_apply() {
        let cli = parse(&["dkeep", "promote", "apply", "2", "1"]);
        assert!(matches!(
            cli.command,
            Command::Promote(PromoteCommand::Apply {
                student: Some(2),
                art: Some(1),
                all: false,
                ..
            })
        ));

        let cli = parse(&["dkeep", "promote", "apply", "--all"]);
        assert!(matches!(
            cli.command,
            Command::Promote(PromoteCommand::Apply { all: true, .. })
        ));

        assert!(Cli::try_parse_from(["dkeep", "promote", "apply"]).is_err());
    }

    #[test]
    fn test_parse_dashboard_json() {
        let cli = parse(&["dkeep", "dashboard", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Dashboard(DashboardCommand { json: true, .. })
        ));
    }

    #[test]
    fn test_is_mutating() {
        let mutating = |args: &[&str]| parse(args).command.is_mutating();
        assert!(mutating(&["dkeep", "dojo", "add", "Matriz"]));
        assert!(mutating(&["dkeep", "art", "delete", "1"]));
        assert!(mutating(&["dkeep", "attend", "mark", "1", "2"]));
        assert!(!mutating(&["dkeep", "dojo", "list"]));
        assert!(!mutating(&["dkeep", "student", "show", "1"]));
        assert!(!mutating(&["dkeep", "promote", "list"]));
        assert!(!mutating(&["dkeep", "dashboard"]));
    }
}
