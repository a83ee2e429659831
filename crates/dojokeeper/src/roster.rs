//! The dojo's roster: branches, martial-art catalog and students.
//!
//! A [`Dojo`] is created once and handed to every operation by reference.
//! Each method applies one operator action completely before returning.

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    AttendanceRecord, Graduation, MartialArt, MartialArtId, NewMartialArt, NewStudent, Student,
    StudentId,
};
use crate::promotion::{self, PromotionCandidate, PromotionOutcome};

/// All roster state for one dojo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dojo {
    dojos: Vec<String>,
    martial_arts: Vec<MartialArt>,
    students: Vec<Student>,
    next_martial_art_id: u64,
    next_student_id: u64,
}

impl Dojo {
    /// Create an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a roster from previously saved parts.
    ///
    /// Id counters resume after the largest id present. Attendance kept from
    /// deleted arts counts too, so a new art never inherits old classes.
    #[must_use]
    pub fn from_parts(
        dojos: Vec<String>,
        martial_arts: Vec<MartialArt>,
        students: Vec<Student>,
    ) -> Self {
        let attended_art_ids = students
            .iter()
            .flat_map(|s| s.attendance.iter().map(|r| r.martial_art_id.0));
        let next_martial_art_id = martial_arts
            .iter()
            .map(|a| a.id.0)
            .chain(attended_art_ids)
            .max()
            .unwrap_or(0);
        let next_student_id = students.iter().map(|s| s.id.0).max().unwrap_or(0);
        Self {
            dojos,
            martial_arts,
            students,
            next_martial_art_id,
            next_student_id,
        }
    }

    /// Dojo branch names, in the order they were added.
    #[must_use]
    pub fn dojos(&self) -> &[String] {
        &self.dojos
    }

    /// The martial-art catalog.
    #[must_use]
    pub fn martial_arts(&self) -> &[MartialArt] {
        &self.martial_arts
    }

    /// Every student, in registration order.
    #[must_use]
    pub fn students(&self) -> &[Student] {
        &self.students
    }

    /// The student with `id`, if registered.
    #[must_use]
    pub fn student(&self, id: StudentId) -> Option<&Student> {
        self.students.iter().find(|s| s.id == id)
    }

    /// The martial art with `id`, if in the catalog.
    #[must_use]
    pub fn martial_art(&self, id: MartialArtId) -> Option<&MartialArt> {
        self.martial_arts.iter().find(|a| a.id == id)
    }

    /// Add a branch. Blank and already-known names are ignored.
    ///
    /// Returns `true` if the branch was added.
    pub fn add_dojo(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.dojos.iter().any(|d| d == name) {
            return false;
        }
        self.dojos.push(name.to_string());
        info!("Added dojo '{}'", name);
        true
    }

    /// Add a martial art to the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the definition is invalid, see
    /// [`NewMartialArt::into_martial_art`].
    pub fn add_martial_art(&mut self, form: NewMartialArt) -> Result<MartialArtId> {
        let id = MartialArtId(self.next_martial_art_id + 1);
        let martial_art = form.into_martial_art(id)?;
        self.next_martial_art_id = id.0;
        info!(
            "Added martial art '{}' with {} ranks",
            martial_art.name,
            martial_art.ranks.len()
        );
        self.martial_arts.push(martial_art);
        Ok(id)
    }

    /// Remove a martial art and every graduation in it.
    ///
    /// Attendance records for the art are kept. Returns the removed art, or
    /// `None` if there was no such art.
    pub fn delete_martial_art(&mut self, id: MartialArtId) -> Option<MartialArt> {
        let index = self.martial_arts.iter().position(|a| a.id == id)?;
        let removed = self.martial_arts.remove(index);

        let mut cascaded = 0;
        for student in &mut self.students {
            if student.graduations.shift_remove(&id).is_some() {
                cascaded += 1;
            }
        }

        info!(
            "Deleted martial art '{}' and {} graduations",
            removed.name, cascaded
        );
        Some(removed)
    }

    /// Register a new student.
    pub fn register_student(&mut self, form: NewStudent) -> StudentId {
        let id = StudentId(self.next_student_id + 1);
        self.next_student_id = id.0;
        let student = form.into_student(id);
        info!("Registered student {} ({})", id, student.full_name);
        self.students.push(student);
        id
    }

    /// Replace the registration details of the stored student that has
    /// `student.id`.
    ///
    /// Graduations and attendance are kept as stored; they only change
    /// through [`Dojo::enroll`], [`Dojo::apply_promotion`] and
    /// [`Dojo::record_attendance`]. Returns `false` and changes nothing if no
    /// such student exists.
    pub fn update_student(&mut self, student: Student) -> bool {
        let Some(slot) = self.students.iter_mut().find(|s| s.id == student.id) else {
            debug!("Update skipped: unknown student {}", student.id);
            return false;
        };
        let graduations = std::mem::take(&mut slot.graduations);
        let attendance = std::mem::take(&mut slot.attendance);
        *slot = Student {
            graduations,
            attendance,
            ..student
        };
        info!("Updated student {}", slot.id);
        true
    }

    /// Enroll a student in a martial art at a given rank and degree.
    ///
    /// Replaces an existing graduation in the same art. Both the last
    /// promotion and the rank start are set to `since`. Returns `Ok(false)`
    /// if the student or the art does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the art has no such rank or the degree is above
    /// the art's maximum (any degree above 0 when the art has no degrees).
    pub fn enroll(
        &mut self,
        student_id: StudentId,
        martial_art_id: MartialArtId,
        rank: &str,
        degree: u32,
        since: NaiveDate,
    ) -> Result<bool> {
        let Some(martial_art) = self.martial_arts.iter().find(|a| a.id == martial_art_id) else {
            return Ok(false);
        };
        let Some(student) = self.students.iter_mut().find(|s| s.id == student_id) else {
            return Ok(false);
        };

        if martial_art.rank_index(rank).is_none() {
            return Err(Error::UnknownRank {
                rank: rank.to_string(),
                martial_art: martial_art.name.clone(),
            });
        }
        if degree > martial_art.max_degrees {
            return Err(Error::DegreeOutOfRange {
                degree,
                max_degrees: martial_art.max_degrees,
                martial_art: martial_art.name.clone(),
            });
        }

        student.graduations.insert(
            martial_art_id,
            Graduation {
                martial_art_id,
                rank: rank.to_string(),
                degree,
                last_promotion_date: since,
                rank_start_date: since,
            },
        );
        info!(
            "Enrolled student {} in {} at {} degree {}",
            student_id, martial_art.name, rank, degree
        );
        Ok(true)
    }

    /// Record that a student attended a class.
    ///
    /// Returns `false` if the student does not exist or the class was
    /// already recorded.
    pub fn record_attendance(
        &mut self,
        student_id: StudentId,
        martial_art_id: MartialArtId,
        date: NaiveDate,
    ) -> bool {
        let Some(student) = self.students.iter_mut().find(|s| s.id == student_id) else {
            debug!("Attendance skipped: unknown student {}", student_id);
            return false;
        };
        let inserted = student.attendance.insert(AttendanceRecord {
            date,
            martial_art_id,
        });
        if inserted {
            debug!(
                "Recorded attendance for student {} in art {} on {}",
                student_id, martial_art_id, date
            );
        }
        inserted
    }

    /// Check whether a student attended a martial art's class on `date`.
    #[must_use]
    pub fn is_present(
        &self,
        student_id: StudentId,
        martial_art_id: MartialArtId,
        date: NaiveDate,
    ) -> bool {
        self.student(student_id)
            .is_some_and(|s| s.attended_on(martial_art_id, date))
    }

    /// Active students enrolled in a martial art, sorted by full name.
    #[must_use]
    pub fn attendance_roster(&self, martial_art_id: MartialArtId) -> Vec<&Student> {
        let mut roster: Vec<&Student> = self
            .students
            .iter()
            .filter(|s| s.is_active() && s.graduations.contains_key(&martial_art_id))
            .collect();
        roster.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        roster
    }

    /// Students who have earned their next promotion.
    #[must_use]
    pub fn promotion_candidates(&self) -> Vec<PromotionCandidate<'_>> {
        promotion::evaluate_promotions(&self.students, &self.martial_arts)
    }

    /// Promote a student one step, see [`promotion::apply_promotion`].
    pub fn apply_promotion(
        &mut self,
        student_id: StudentId,
        martial_art_id: MartialArtId,
        today: NaiveDate,
    ) -> PromotionOutcome {
        promotion::apply_promotion(
            &mut self.students,
            &self.martial_arts,
            student_id,
            martial_art_id,
            today,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{parse_date, Gender, StudentStatus};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn karate() -> NewMartialArt {
        NewMartialArt {
            name: "Karate".to_string(),
            ranks: vec!["Branca".to_string(), "Amarela".to_string(), "Preta".to_string()],
            uses_degrees: true,
            max_degrees: 2,
            promotion_requirements: BTreeMap::from([("Branca".to_string(), 6)]),
        }
    }

    fn form(name: &str) -> NewStudent {
        NewStudent {
            username: name.to_lowercase(),
            password: "pw".to_string(),
            status: StudentStatus::Active,
            full_name: name.to_string(),
            birth_date: date("1995-06-01"),
            gender: Gender::Female,
            contact_phone: String::new(),
            internal_registry: String::new(),
            observations: String::new(),
            dojo: "Matriz".to_string(),
            enrollment_date: date("2024-01-15"),
        }
    }

    #[test]
    fn test_add_dojo_ignores_blank_and_duplicates() {
        let mut dojo = Dojo::new();
        assert!(dojo.add_dojo(" Matriz "));
        assert!(!dojo.add_dojo("Matriz"));
        assert!(!dojo.add_dojo("   "));
        assert!(dojo.add_dojo("Filial Norte"));
        assert_eq!(dojo.dojos(), ["Matriz", "Filial Norte"]);
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut dojo = Dojo::new();
        let a = dojo.register_student(form("Ana"));
        let b = dojo.register_student(form("Bruno"));
        assert_eq!((a, b), (StudentId(1), StudentId(2)));

        let art = dojo.add_martial_art(karate()).unwrap();
        assert_eq!(art, MartialArtId(1));
    }

    #[test]
    fn test_invalid_martial_art_does_not_consume_id() {
        let mut dojo = Dojo::new();
        let mut bad = karate();
        bad.ranks.clear();
        assert!(dojo.add_martial_art(bad).is_err());
        assert_eq!(dojo.add_martial_art(karate()).unwrap(), MartialArtId(1));
    }

    #[test]
    fn test_unbounded_degree_count_is_rejected() {
        let mut dojo = Dojo::new();
        let mut wide = karate();
        wide.max_degrees = u32::MAX;
        assert!(matches!(
            dojo.add_martial_art(wide),
            Err(Error::InvalidMartialArt { .. })
        ));
        assert!(dojo.martial_arts().is_empty());
        assert!(dojo.promotion_candidates().is_empty());
    }

    #[test]
    fn test_from_parts_resumes_ids() {
        let mut original = Dojo::new();
        original.register_student(form("Ana"));
        original.register_student(form("Bruno"));
        original.add_martial_art(karate()).unwrap();

        let mut restored = Dojo::from_parts(
            original.dojos().to_vec(),
            original.martial_arts().to_vec(),
            original.students().to_vec(),
        );
        assert_eq!(restored.register_student(form("Carla")), StudentId(3));
        assert_eq!(restored.add_martial_art(karate()).unwrap(), MartialArtId(2));
    }

    #[test]
    fn test_record_attendance_is_idempotent() {
        let mut dojo = Dojo::new();
        let ana = dojo.register_student(form("Ana"));
        let art = dojo.add_martial_art(karate()).unwrap();

        assert!(dojo.record_attendance(ana, art, date("2024-03-01")));
        assert!(!dojo.record_attendance(ana, art, date("2024-03-01")));
        assert!(dojo.record_attendance(ana, art, date("2024-03-02")));

        assert_eq!(dojo.student(ana).unwrap().attendance.len(), 2);
        assert!(dojo.is_present(ana, art, date("2024-03-01")));
        assert!(!dojo.is_present(ana, art, date("2024-03-03")));
    }

    #[test]
    fn test_record_attendance_unknown_student() {
        let mut dojo = Dojo::new();
        let recorded = dojo.record_attendance(StudentId(4), MartialArtId(1), date("2024-03-01"));
        assert!(!recorded);
    }

    #[test]
    fn test_enroll_validates_rank_and_degree() {
        let mut dojo = Dojo::new();
        let ana = dojo.register_student(form("Ana"));
        let art = dojo.add_martial_art(karate()).unwrap();
        let since = date("2024-01-15");

        assert!(matches!(
            dojo.enroll(ana, art, "Coral", 0, since),
            Err(Error::UnknownRank { .. })
        ));
        assert!(matches!(
            dojo.enroll(ana, art, "Branca", 3, since),
            Err(Error::DegreeOutOfRange { .. })
        ));
        assert!(dojo.enroll(ana, art, "Branca", 2, since).unwrap());
        let unknown_student = dojo.enroll(StudentId(99), art, "Branca", 0, since);
        assert!(!unknown_student.unwrap());
        let unknown_art = dojo.enroll(ana, MartialArtId(99), "Branca", 0, since);
        assert!(!unknown_art.unwrap());

        let graduation = dojo.student(ana).unwrap().graduation(art).unwrap();
        assert_eq!(graduation.degree, 2);
        assert_eq!(graduation.rank_start_date, since);
        assert_eq!(graduation.last_promotion_date, since);
    }

    #[test]
    fn test_enroll_without_degrees_requires_zero() {
        let mut dojo = Dojo::new();
        let ana = dojo.register_student(form("Ana"));
        let mut judo = karate();
        judo.uses_degrees = false;
        let art = dojo.add_martial_art(judo).unwrap();

        let since = date("2024-01-15");
        assert!(dojo.enroll(ana, art, "Branca", 1, since).is_err());
        assert!(dojo.enroll(ana, art, "Branca", 0, since).unwrap());
    }

    #[test]
    fn test_enroll_twice_keeps_single_graduation() {
        let mut dojo = Dojo::new();
        let ana = dojo.register_student(form("Ana"));
        let art = dojo.add_martial_art(karate()).unwrap();

        dojo.enroll(ana, art, "Branca", 0, date("2024-01-15")).unwrap();
        dojo.enroll(ana, art, "Amarela", 1, date("2024-02-15")).unwrap();

        let student = dojo.student(ana).unwrap();
        assert_eq!(student.graduations.len(), 1);
        assert_eq!(student.graduation(art).unwrap().rank, "Amarela");
    }

    #[test]
    fn test_delete_martial_art_cascades() {
        let mut dojo = Dojo::new();
        let ana = dojo.register_student(form("Ana"));
        let bruno = dojo.register_student(form("Bruno"));
        let karate_id = dojo.add_martial_art(karate()).unwrap();
        let mut judo = karate();
        judo.name = "Judo".to_string();
        let judo_id = dojo.add_martial_art(judo).unwrap();
        let since = date("2024-01-15");
        dojo.enroll(ana, karate_id, "Branca", 0, since).unwrap();
        dojo.enroll(ana, judo_id, "Branca", 0, since).unwrap();
        dojo.enroll(bruno, judo_id, "Amarela", 0, since).unwrap();

        let removed = dojo.delete_martial_art(judo_id).unwrap();

        assert_eq!(removed.name, "Judo");
        assert!(dojo.martial_art(judo_id).is_none());
        assert!(dojo.student(ana).unwrap().graduation(judo_id).is_none());
        assert!(dojo.student(bruno).unwrap().graduations.is_empty());
        assert!(dojo.student(ana).unwrap().graduation(karate_id).is_some());
        assert!(dojo.delete_martial_art(judo_id).is_none());
    }

    #[test]
    fn test_update_student() {
        let mut dojo = Dojo::new();
        let ana = dojo.register_student(form("Ana"));

        let mut edited = dojo.student(ana).unwrap().clone();
        edited.status = StudentStatus::Inactive;
        assert!(dojo.update_student(edited));
        assert!(!dojo.student(ana).unwrap().is_active());

        let mut ghost = dojo.student(ana).unwrap().clone();
        ghost.id = StudentId(42);
        assert!(!dojo.update_student(ghost));
        assert_eq!(dojo.students().len(), 1);
    }

    #[test]
    fn test_update_student_keeps_graduations_and_attendance() {
        let mut dojo = Dojo::new();
        let judo = dojo
            .add_martial_art(NewMartialArt {
                name: "Judo".to_string(),
                ranks: vec!["Branca".to_string(), "Azul".to_string()],
                ..NewMartialArt::default()
            })
            .unwrap();
        let ana = dojo.register_student(form("Ana"));
        dojo.enroll(ana, judo, "Branca", 0, date("2024-01-15")).unwrap();
        dojo.record_attendance(ana, judo, date("2024-01-16"));

        let mut edited = dojo.student(ana).unwrap().clone();
        edited.full_name = "Ana Souza".to_string();
        let graduation = edited.graduations.get_mut(&judo).unwrap();
        graduation.rank = "Roxa".to_string();
        graduation.degree = 7;
        edited.graduations.insert(
            MartialArtId(99),
            Graduation {
                martial_art_id: MartialArtId(99),
                rank: "Preta".to_string(),
                degree: 0,
                last_promotion_date: date("2024-01-15"),
                rank_start_date: date("2024-01-15"),
            },
        );
        edited.attendance.clear();
        assert!(dojo.update_student(edited));

        let stored = dojo.student(ana).unwrap();
        assert_eq!(stored.full_name, "Ana Souza");
        assert_eq!(stored.graduations.len(), 1);
        let graduation = stored.graduation(judo).unwrap();
        assert_eq!(graduation.rank, "Branca");
        assert_eq!(graduation.degree, 0);
        assert_eq!(stored.attendance.len(), 1);
    }

    #[test]
    fn test_attendance_roster_filters_and_sorts() {
        let mut dojo = Dojo::new();
        let zoe = dojo.register_student(form("Zoe"));
        let ana = dojo.register_student(form("Ana"));
        let carla = dojo.register_student(form("Carla"));
        let _dani = dojo.register_student(form("Dani"));
        let art = dojo.add_martial_art(karate()).unwrap();
        for id in [zoe, ana, carla] {
            dojo.enroll(id, art, "Branca", 0, date("2024-01-15")).unwrap();
        }
        let mut inactive = dojo.student(carla).unwrap().clone();
        inactive.status = StudentStatus::Inactive;
        dojo.update_student(inactive);

        let names: Vec<&str> = dojo
            .attendance_roster(art)
            .iter()
            .map(|s| s.full_name.as_str())
            .collect();
        assert_eq!(names, vec!["Ana", "Zoe"]);
    }

    #[test]
    fn test_promotion_round_trip_through_dojo() {
        let mut dojo = Dojo::new();
        let ana = dojo.register_student(form("Ana"));
        let art = dojo.add_martial_art(karate()).unwrap();
        dojo.enroll(ana, art, "Branca", 0, date("2024-03-01")).unwrap();
        dojo.record_attendance(ana, art, date("2024-03-04"));
        assert!(dojo.promotion_candidates().is_empty());

        dojo.record_attendance(ana, art, date("2024-03-06"));
        assert_eq!(dojo.promotion_candidates().len(), 1);

        let outcome = dojo.apply_promotion(ana, art, date("2024-03-06"));
        assert!(outcome.is_applied());
        // Classes up to the promotion day no longer count.
        assert!(dojo.promotion_candidates().is_empty());
    }
}
