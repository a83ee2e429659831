//! Core roster types for dojokeeper.
//!
//! This module defines the records the rest of the crate works on: martial-art
//! definitions, students, their graduations and their attendance log.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier of a student within one dojo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub u64);

/// Identifier of a martial art within one dojo's catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MartialArtId(pub u64);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MartialArtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a student currently trains at the dojo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudentStatus {
    /// Training and billed monthly.
    #[default]
    Active,
    /// No longer training.
    Inactive,
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl std::str::FromStr for StudentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(format!("unknown status '{other}'")),
        }
    }
}

/// Gender as recorded on the registration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male.
    #[default]
    Male,
    /// Female.
    Female,
    /// Anything else, or not stated.
    Other,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown gender '{other}'")),
        }
    }
}

/// A martial art taught at the dojo and its belt system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MartialArt {
    /// Catalog identifier.
    pub id: MartialArtId,
    /// Display name.
    pub name: String,
    /// Rank labels, most junior first.
    pub ranks: Vec<String>,
    /// Whether ranks are split into degrees.
    pub uses_degrees: bool,
    /// Highest degree within a rank. Always 0 when degrees are unused.
    pub max_degrees: u32,
    /// Classes that must be attended to leave each rank.
    pub promotion_requirements: BTreeMap<String, u32>,
}

impl MartialArt {
    /// Seniority index of `rank`, if the art has it.
    #[must_use]
    pub fn rank_index(&self, rank: &str) -> Option<usize> {
        self.ranks.iter().position(|r| r == rank)
    }

    /// Check whether `rank` is the most senior rank.
    #[must_use]
    pub fn is_last_rank(&self, rank: &str) -> bool {
        self.ranks.last().is_some_and(|last| last == rank)
    }

    /// The rank that follows `rank`, if any.
    #[must_use]
    pub fn next_rank(&self, rank: &str) -> Option<&str> {
        let index = self.rank_index(rank)?;
        self.ranks.get(index + 1).map(String::as_str)
    }

    /// Classes required to leave `rank`. Zero when unconfigured.
    #[must_use]
    pub fn required_classes(&self, rank: &str) -> u32 {
        self.promotion_requirements.get(rank).copied().unwrap_or(0)
    }
}

/// Highest degree count a martial art may use.
pub const MAX_DEGREES: u32 = 10;

/// A martial-art definition as submitted by an operator, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewMartialArt {
    /// Display name.
    pub name: String,
    /// Rank labels, most junior first. Duplicates are dropped.
    pub ranks: Vec<String>,
    /// Whether ranks are split into degrees.
    pub uses_degrees: bool,
    /// Highest degree within a rank.
    pub max_degrees: u32,
    /// Classes that must be attended to leave each rank.
    pub promotion_requirements: BTreeMap<String, u32>,
}

impl NewMartialArt {
    /// Normalize the definition and assign it an id.
    ///
    /// Names and rank labels are trimmed, duplicate ranks keep their first
    /// position, every rank gets a requirement (0 when none was given) and
    /// `max_degrees` is forced to 0 when degrees are unused.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank, no ranks remain, a
    /// requirement names a rank the art does not have, or `max_degrees` is
    /// above [`MAX_DEGREES`].
    pub fn into_martial_art(self, id: MartialArtId) -> Result<MartialArt> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::invalid_martial_art(self.name, "name is required"));
        }
        if self.uses_degrees && self.max_degrees > MAX_DEGREES {
            return Err(Error::invalid_martial_art(
                name,
                format!("max_degrees cannot be greater than {MAX_DEGREES}"),
            ));
        }

        let mut ranks: Vec<String> = Vec::with_capacity(self.ranks.len());
        let submitted = self.ranks.iter().map(|r| r.trim());
        for rank in submitted.filter(|r| !r.is_empty()) {
            if !ranks.iter().any(|r| r == rank) {
                ranks.push(rank.to_string());
            }
        }
        if ranks.is_empty() {
            return Err(Error::invalid_martial_art(name, "at least one rank is required"));
        }

        if let Some(stray) = self
            .promotion_requirements
            .keys()
            .find(|rank| !ranks.iter().any(|r| r == rank.trim()))
        {
            return Err(Error::invalid_martial_art(
                name,
                format!("requirement given for unknown rank '{stray}'"),
            ));
        }

        let requirements: BTreeMap<String, u32> = self
            .promotion_requirements
            .into_iter()
            .map(|(rank, classes)| (rank.trim().to_string(), classes))
            .collect();
        let promotion_requirements = ranks
            .iter()
            .map(|rank| (rank.clone(), requirements.get(rank).copied().unwrap_or(0)))
            .collect();

        Ok(MartialArt {
            id,
            name,
            ranks,
            uses_degrees: self.uses_degrees,
            max_degrees: if self.uses_degrees {
                self.max_degrees
            } else {
                0
            },
            promotion_requirements,
        })
    }
}

/// A student's current standing in one martial art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Graduation {
    /// The martial art this graduation belongs to.
    pub martial_art_id: MartialArtId,
    /// Current rank label.
    pub rank: String,
    /// Current degree within the rank.
    pub degree: u32,
    /// Date of the most recent rank or degree promotion.
    pub last_promotion_date: NaiveDate,
    /// Date the current rank was entered.
    pub rank_start_date: NaiveDate,
}

/// One class attended by a student.
///
/// Ordered by date first so a student's log iterates chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Day of the class.
    pub date: NaiveDate,
    /// Martial art the class was for.
    pub martial_art_id: MartialArtId,
}

/// A student on the dojo roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    /// Roster identifier.
    pub id: StudentId,
    /// Login name.
    pub username: String,
    /// Login password.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// Training status.
    pub status: StudentStatus,
    /// Full legal name.
    pub full_name: String,
    /// Date of birth.
    pub birth_date: NaiveDate,
    /// Gender as registered.
    pub gender: Gender,
    /// Contact phone number.
    pub contact_phone: String,
    /// The dojo's own registry number for the student.
    pub internal_registry: String,
    /// Free-form notes.
    pub observations: String,
    /// Branch the student trains at.
    pub dojo: String,
    /// First day at the dojo; anchors the monthly billing cycle.
    pub enrollment_date: NaiveDate,
    /// One graduation per enrolled martial art, in enrollment order.
    pub graduations: IndexMap<MartialArtId, Graduation>,
    /// Attendance log. A set, so each (date, art) pair appears once.
    pub attendance: BTreeSet<AttendanceRecord>,
}

impl Student {
    /// Check whether the student is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == StudentStatus::Active
    }

    /// The student's graduation in `martial_art_id`, if enrolled.
    #[must_use]
    pub fn graduation(&self, martial_art_id: MartialArtId) -> Option<&Graduation> {
        self.graduations.get(&martial_art_id)
    }

    /// Check whether the student attended `martial_art_id` on `date`.
    #[must_use]
    pub fn attended_on(&self, martial_art_id: MartialArtId, date: NaiveDate) -> bool {
        self.attendance.contains(&AttendanceRecord {
            date,
            martial_art_id,
        })
    }

    /// Classes of `martial_art_id` attended strictly after `date`.
    #[must_use]
    pub fn classes_after(&self, martial_art_id: MartialArtId, date: NaiveDate) -> usize {
        self.attendance
            .iter()
            .filter(|a| a.martial_art_id == martial_art_id && a.date > date)
            .count()
    }

    /// Classes of `martial_art_id` attended on or after `date`.
    #[must_use]
    pub fn classes_since(&self, martial_art_id: MartialArtId, date: NaiveDate) -> usize {
        self.attendance
            .iter()
            .filter(|a| a.martial_art_id == martial_art_id && a.date >= date)
            .count()
    }
}

/// A student as filled in on the registration form, before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    /// Login name.
    pub username: String,
    /// Login password, stored as entered.
    pub password: String,
    /// Initial status.
    pub status: StudentStatus,
    /// Full name.
    pub full_name: String,
    /// Date of birth.
    pub birth_date: NaiveDate,
    /// Gender as registered.
    pub gender: Gender,
    /// Contact phone number.
    pub contact_phone: String,
    /// Registry number kept by the association.
    pub internal_registry: String,
    /// Free-form notes.
    pub observations: String,
    /// Branch the student trains at.
    pub dojo: String,
    /// Date the student joined.
    pub enrollment_date: NaiveDate,
}

impl NewStudent {
    /// Turn the form into a roster entry with no graduations or attendance.
    #[must_use]
    pub fn into_student(self, id: StudentId) -> Student {
        Student {
            id,
            username: self.username,
            password: self.password,
            status: self.status,
            full_name: self.full_name,
            birth_date: self.birth_date,
            gender: self.gender,
            contact_phone: self.contact_phone,
            internal_registry: self.internal_registry,
            observations: self.observations,
            dojo: self.dojo,
            enrollment_date: self.enrollment_date,
            graduations: IndexMap::new(),
            attendance: BTreeSet::new(),
        }
    }
}

/// Parse a `YYYY-MM-DD` date.
///
/// # Errors
///
/// Returns [`Error::InvalidDate`] if `input` is not a calendar date in that
/// format.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| Error::InvalidDate {
        input: input.to_string(),
    })
}
