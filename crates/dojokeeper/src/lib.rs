//! `dojokeeper` - Roster, attendance and promotion tracking for a martial-arts dojo
//!
//! The roster lives in memory as a [`Dojo`]. On top of it sit the promotion
//! evaluator, the payment and birthday aggregations behind the dashboard,
//! and a `SQLite` snapshot store used by the `dkeep` binary.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod model;
pub mod presets;
pub mod promotion;
pub mod rank_color;
pub mod roster;
pub mod storage;

pub use config::Config;
pub use dashboard::{DashboardSummary, PaymentStatus};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{
    AttendanceRecord, Gender, Graduation, MartialArt, MartialArtId, NewMartialArt, NewStudent,
    Student, StudentId, StudentStatus,
};
pub use promotion::{PromotionCandidate, PromotionOutcome};
pub use rank_color::{rank_fill, RankFill};
pub use roster::Dojo;
pub use storage::{Storage, StorageStats};
