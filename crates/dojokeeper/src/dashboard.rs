//! Derived roster figures for the admin dashboard.
//!
//! Nothing here is stored: payment status, birthdays and counts are
//! recomputed from the roster every time they are asked for.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::config::DashboardConfig;
use crate::model::{Gender, Graduation, MartialArt, MartialArtId, Student, StudentId};
use crate::promotion::{evaluate_promotions, PromotionCandidate};
use crate::roster::Dojo;

/// Default number of days ahead the birthday list looks.
pub const DEFAULT_BIRTHDAY_WINDOW_DAYS: u32 = 30;

/// Monthly fee status, inferred from the enrollment day-of-month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// This month's fee is not yet due.
    Current,
    /// This month's billing day has passed.
    Due,
    /// The student is inactive and not billed.
    NotApplicable,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Due => write!(f, "due"),
            Self::NotApplicable => write!(f, "n/a"),
        }
    }
}

/// Payment status of `student` on `today`.
///
/// The billing cycle is anchored to the enrollment day-of-month. The month of
/// enrollment is always paid.
#[must_use]
pub fn payment_status(student: &Student, today: NaiveDate) -> PaymentStatus {
    if !student.is_active() {
        return PaymentStatus::NotApplicable;
    }

    let enrolled = student.enrollment_date;
    if enrolled.year() == today.year() && enrolled.month() == today.month() {
        return PaymentStatus::Current;
    }

    if today.day() >= enrolled.day() {
        PaymentStatus::Due
    } else {
        PaymentStatus::Current
    }
}

/// A birthday coming up within the dashboard window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpcomingBirthday<'a> {
    /// Whose birthday it is.
    pub student: &'a Student,
    /// The next occurrence on or after the reference date.
    pub date: NaiveDate,
}

impl UpcomingBirthday<'_> {
    /// The birthday as `DD/MM`.
    #[must_use]
    pub fn display_date(&self) -> String {
        self.date.format("%d/%m").to_string()
    }
}

/// `birth_date`'s month and day in `year`. 29 February becomes 1 March in
/// common years.
fn birthday_in(birth_date: NaiveDate, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, birth_date.month(), birth_date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, 3, 1))
}

/// Students whose next birthday falls within `window_days` of `today`,
/// inclusive at both ends, soonest first.
#[must_use]
pub fn upcoming_birthdays(
    students: &[Student],
    today: NaiveDate,
    window_days: u32,
) -> Vec<UpcomingBirthday<'_>> {
    let window_end = today + Duration::days(i64::from(window_days));

    let mut upcoming: Vec<UpcomingBirthday<'_>> = students
        .iter()
        .filter_map(|student| {
            let mut date = birthday_in(student.birth_date, today.year())?;
            if date < today {
                date = birthday_in(student.birth_date, today.year() + 1)?;
            }
            (date <= window_end).then_some(UpcomingBirthday { student, date })
        })
        .collect();

    upcoming.sort_by_key(|b| b.date);
    upcoming
}

/// Classes of `graduation`'s art attended since the current rank began.
///
/// This window resets only on a rank change. Eligibility uses the
/// last-promotion window instead, see [`evaluate_promotions`].
#[must_use]
pub fn attendance_since_rank_start(student: &Student, graduation: &Graduation) -> usize {
    student.classes_since(graduation.martial_art_id, graduation.rank_start_date)
}

/// Number of students holding each rank of one martial art.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankDistribution {
    /// The martial art.
    pub martial_art_id: MartialArtId,
    /// Its name.
    pub name: String,
    /// Rank label and student count, in rank order. Ranks nobody holds are
    /// left out.
    pub counts: Vec<(String, usize)>,
}

impl RankDistribution {
    fn compute(martial_art: &MartialArt, students: &[Student]) -> Self {
        let counts = martial_art
            .ranks
            .iter()
            .filter_map(|rank| {
                let count = students
                    .iter()
                    .filter_map(|s| s.graduation(martial_art.id))
                    .filter(|g| &g.rank == rank)
                    .count();
                (count > 0).then(|| (rank.clone(), count))
            })
            .collect();

        Self {
            martial_art_id: martial_art.id,
            name: martial_art.name.clone(),
            counts,
        }
    }
}

/// How many of the most recent enrollments the dashboard lists by default.
pub const DEFAULT_RECENT_ENROLLMENTS: usize = 5;

/// Everything the admin dashboard shows, computed in one pass over the roster.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary<'a> {
    /// The day the summary was computed for.
    pub today: NaiveDate,
    /// Students on the roster.
    pub total_students: usize,
    /// Active students.
    pub active_students: usize,
    /// Students registered as male.
    pub male_students: usize,
    /// Students registered as female.
    pub female_students: usize,
    /// Students per dojo branch.
    pub dojo_counts: BTreeMap<String, usize>,
    /// Birthdays in the window.
    pub upcoming_birthdays: Vec<UpcomingBirthday<'a>>,
    /// Active students whose fee is due.
    pub payments_due: Vec<&'a Student>,
    /// Most recently enrolled students, newest first.
    pub latest_enrollments: Vec<&'a Student>,
    /// Rank counts per martial art.
    pub rank_distributions: Vec<RankDistribution>,
    /// Students ready for promotion.
    pub promotion_candidates: Vec<PromotionCandidate<'a>>,
}

impl<'a> DashboardSummary<'a> {
    /// Summarize `dojo` as of `today`.
    #[must_use]
    pub fn compute(dojo: &'a Dojo, today: NaiveDate, settings: &DashboardConfig) -> Self {
        let students = dojo.students();

        let count_gender = |gender: Gender| students.iter().filter(|s| s.gender == gender).count();

        let mut dojo_counts = BTreeMap::new();
        for student in students {
            *dojo_counts.entry(student.dojo.clone()).or_insert(0) += 1;
        }

        let payments_due = students
            .iter()
            .filter(|s| payment_status(s, today) == PaymentStatus::Due)
            .collect();

        let mut latest_enrollments: Vec<&Student> = students.iter().collect();
        latest_enrollments.sort_by(|a, b| b.enrollment_date.cmp(&a.enrollment_date));
        latest_enrollments.truncate(settings.recent_enrollments);

        let rank_distributions = dojo
            .martial_arts()
            .iter()
            .map(|art| RankDistribution::compute(art, students))
            .collect();

        Self {
            today,
            total_students: students.len(),
            active_students: students.iter().filter(|s| s.is_active()).count(),
            male_students: count_gender(Gender::Male),
            female_students: count_gender(Gender::Female),
            dojo_counts,
            upcoming_birthdays: upcoming_birthdays(students, today, settings.birthday_window_days),
            payments_due,
            latest_enrollments,
            rank_distributions,
            promotion_candidates: evaluate_promotions(students, dojo.martial_arts()),
        }
    }

    /// Ids of students whose fee is due.
    #[must_use]
    pub fn due_ids(&self) -> Vec<StudentId> {
        self.payments_due.iter().map(|s| s.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_date, NewStudent, StudentStatus};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn student(id: u64, birth: &str, enrolled: &str) -> Student {
        NewStudent {
            username: format!("s{id}"),
            password: String::new(),
            status: StudentStatus::Active,
            full_name: format!("Student {id}"),
            birth_date: date(birth),
            gender: Gender::Male,
            contact_phone: String::new(),
            internal_registry: String::new(),
            observations: String::new(),
            dojo: "Matriz".to_string(),
            enrollment_date: date(enrolled),
        }
        .into_student(StudentId(id))
    }

    #[test]
    fn test_payment_status_cycle() {
        let s = student(1, "1990-01-01", "2024-01-20");
        assert_eq!(
            payment_status(&s, date("2024-02-19")),
            PaymentStatus::Current
        );
        assert_eq!(payment_status(&s, date("2024-02-20")), PaymentStatus::Due);
        assert_eq!(payment_status(&s, date("2024-02-28")), PaymentStatus::Due);
    }

    #[test]
    fn test_payment_status_enrollment_month_is_paid() {
        let s = student(1, "1990-01-01", "2024-01-05");
        assert_eq!(
            payment_status(&s, date("2024-01-31")),
            PaymentStatus::Current
        );
        // Same month, different year.
        assert_eq!(payment_status(&s, date("2025-01-31")), PaymentStatus::Due);
    }

    #[test]
    fn test_payment_status_inactive() {
        let mut s = student(1, "1990-01-01", "2024-01-20");
        s.status = StudentStatus::Inactive;
        assert_eq!(
            payment_status(&s, date("2024-02-25")),
            PaymentStatus::NotApplicable
        );
    }

    #[test]
    fn test_birthday_in_window() {
        let students = vec![student(1, "1990-03-15", "2024-01-01")];
        let upcoming = upcoming_birthdays(&students, date("2024-03-01"), 30);

        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].date, date("2024-03-15"));
        assert_eq!(upcoming[0].display_date(), "15/03");
    }

    #[test]
    fn test_birthday_window_is_inclusive() {
        let students = vec![
            student(1, "1990-03-01", "2024-01-01"),
            student(2, "1990-03-31", "2024-01-01"),
            student(3, "1990-04-01", "2024-01-01"),
        ];
        let ids: Vec<u64> = upcoming_birthdays(&students, date("2024-03-01"), 30)
            .iter()
            .map(|b| b.student.id.0)
            .collect();

        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_birthday_rolls_into_next_year() {
        let students = vec![
            student(1, "1985-01-05", "2024-01-01"),
            student(2, "1985-12-28", "2024-01-01"),
            student(3, "1985-12-10", "2024-01-01"),
        ];
        let upcoming = upcoming_birthdays(&students, date("2024-12-20"), 30);

        let ordered: Vec<(u64, NaiveDate)> =
            upcoming.iter().map(|b| (b.student.id.0, b.date)).collect();
        assert_eq!(
            ordered,
            vec![(2, date("2024-12-28")), (1, date("2025-01-05"))]
        );
    }

    #[test]
    fn test_leap_day_birthday_in_common_year() {
        let students = vec![student(1, "2000-02-29", "2024-01-01")];
        let upcoming = upcoming_birthdays(&students, date("2025-02-20"), 30);
        assert_eq!(upcoming[0].date, date("2025-03-01"));
    }

    #[test]
    fn test_attendance_since_rank_start_is_inclusive() {
        let mut s = student(1, "1990-01-01", "2024-01-01");
        let art = MartialArtId(1);
        for day in ["2024-02-01", "2024-02-10", "2024-02-20"] {
            s.attendance.insert(crate::model::AttendanceRecord {
                date: date(day),
                martial_art_id: art,
            });
        }
        let graduation = Graduation {
            martial_art_id: art,
            rank: "Branca".to_string(),
            degree: 1,
            last_promotion_date: date("2024-02-10"),
            rank_start_date: date("2024-02-01"),
        };

        assert_eq!(attendance_since_rank_start(&s, &graduation), 3);
        // The eligibility window only sees what came after the degree-up.
        assert_eq!(s.classes_after(art, graduation.last_promotion_date), 1);
    }

    #[test]
    fn test_payment_status_display() {
        assert_eq!(PaymentStatus::Due.to_string(), "due");
        assert_eq!(PaymentStatus::NotApplicable.to_string(), "n/a");
    }
}
