//! Promotion eligibility and promotion transitions.
//!
//! A rank's class requirement covers the whole rank. Arts with degrees split
//! it evenly over every degree-up plus the final rank change, rounding down,
//! so any remainder is not required on the last step.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info};

use crate::model::{Graduation, MartialArt, MartialArtId, Student, StudentId};

/// A student who has attended enough classes for their next promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PromotionCandidate<'a> {
    /// The student.
    pub student: &'a Student,
    /// The martial art the promotion is in.
    pub martial_art: &'a MartialArt,
    /// The student's graduation before promotion.
    pub graduation: &'a Graduation,
    /// Classes attended strictly after the last promotion.
    pub attended_since_promotion: usize,
    /// Classes needed for the next step.
    pub required_for_step: u32,
}

/// What [`apply_promotion`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromotionOutcome {
    /// The degree went up within the same rank.
    Degree {
        /// Rank the student stays in.
        rank: String,
        /// New degree.
        degree: u32,
    },
    /// The student moved to the next rank at degree 0.
    Rank {
        /// Previous rank.
        from: String,
        /// New rank.
        to: String,
    },
    /// Nothing changed.
    Unchanged,
}

impl PromotionOutcome {
    /// Check whether the promotion changed anything.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Classes needed for one promotion step out of `rank`.
///
/// Without degrees this is the rank's full requirement. With degrees it is
/// `requirement / (max_degrees + 1)`, rounded down.
#[must_use]
pub fn classes_per_step(martial_art: &MartialArt, rank: &str) -> u32 {
    let required = martial_art.required_classes(rank);
    if martial_art.uses_degrees {
        required / martial_art.max_degrees.saturating_add(1)
    } else {
        required
    }
}

/// Check whether a graduation has no promotion left to earn.
#[must_use]
pub fn is_fully_promoted(martial_art: &MartialArt, graduation: &Graduation) -> bool {
    let at_max_rank = martial_art.is_last_rank(&graduation.rank);
    let at_max_degree = martial_art.uses_degrees && graduation.degree == martial_art.max_degrees;
    at_max_rank && (!martial_art.uses_degrees || at_max_degree)
}

/// Find every active student who has earned their next promotion.
///
/// Results follow roster order, then each student's enrollment order.
/// Graduations in an art missing from `martial_arts`, graduations with no
/// promotion left and ranks with no configured requirement are skipped.
#[must_use]
pub fn evaluate_promotions<'a>(
    students: &'a [Student],
    martial_arts: &'a [MartialArt],
) -> Vec<PromotionCandidate<'a>> {
    let mut candidates = Vec::new();

    for student in students.iter().filter(|s| s.is_active()) {
        for graduation in student.graduations.values() {
            let Some(martial_art) = martial_arts
                .iter()
                .find(|art| art.id == graduation.martial_art_id)
            else {
                debug!(
                    "Student {} has a graduation in unknown art {}",
                    student.id, graduation.martial_art_id
                );
                continue;
            };

            if is_fully_promoted(martial_art, graduation) {
                continue;
            }

            if martial_art.required_classes(&graduation.rank) == 0 {
                continue;
            }

            let attended_since_promotion =
                student.classes_after(martial_art.id, graduation.last_promotion_date);
            let required_for_step = classes_per_step(martial_art, &graduation.rank);

            if attended_since_promotion >= required_for_step as usize {
                candidates.push(PromotionCandidate {
                    student,
                    martial_art,
                    graduation,
                    attended_since_promotion,
                    required_for_step,
                });
            }
        }
    }

    candidates
}

/// The graduation a single promotion step leads to, or `None` if there is
/// no step left.
///
/// A degree is awarded while the rank still has degrees left. Otherwise the
/// student moves to the next rank at degree 0 and the rank start resets.
#[must_use]
pub fn next_graduation(
    martial_art: &MartialArt,
    graduation: &Graduation,
    today: NaiveDate,
) -> Option<Graduation> {
    if martial_art.uses_degrees && graduation.degree < martial_art.max_degrees {
        return Some(Graduation {
            degree: graduation.degree + 1,
            last_promotion_date: today,
            ..graduation.clone()
        });
    }

    let next_rank = martial_art.next_rank(&graduation.rank)?;
    Some(Graduation {
        martial_art_id: graduation.martial_art_id,
        rank: next_rank.to_string(),
        degree: 0,
        last_promotion_date: today,
        rank_start_date: today,
    })
}

/// Promote a student one step in a martial art.
///
/// Attendance is not re-checked; callers are expected to offer only
/// candidates from [`evaluate_promotions`]. Unknown students, unknown arts and
/// missing graduations leave the roster untouched.
pub fn apply_promotion(
    students: &mut [Student],
    martial_arts: &[MartialArt],
    student_id: StudentId,
    martial_art_id: MartialArtId,
    today: NaiveDate,
) -> PromotionOutcome {
    let Some(student) = students.iter_mut().find(|s| s.id == student_id) else {
        debug!("Promotion skipped: unknown student {}", student_id);
        return PromotionOutcome::Unchanged;
    };
    let Some(martial_art) = martial_arts.iter().find(|a| a.id == martial_art_id) else {
        debug!("Promotion skipped: unknown martial art {}", martial_art_id);
        return PromotionOutcome::Unchanged;
    };
    let Some(graduation) = student.graduations.get_mut(&martial_art_id) else {
        debug!(
            "Promotion skipped: student {} is not enrolled in {}",
            student_id, martial_art.name
        );
        return PromotionOutcome::Unchanged;
    };

    let Some(next) = next_graduation(martial_art, graduation, today) else {
        debug!(
            "Promotion skipped: student {} already holds the top grade in {}",
            student_id, martial_art.name
        );
        return PromotionOutcome::Unchanged;
    };

    let outcome = if next.rank == graduation.rank {
        PromotionOutcome::Degree {
            rank: next.rank.clone(),
            degree: next.degree,
        }
    } else {
        PromotionOutcome::Rank {
            from: graduation.rank.clone(),
            to: next.rank.clone(),
        }
    };
    *graduation = next;

    info!(
        "Promoted student {} in {}: {:?}",
        student_id, martial_art.name, outcome
    );
    outcome
}
