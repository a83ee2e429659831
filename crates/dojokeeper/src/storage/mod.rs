//! Storage layer for dojokeeper.
//!
//! The roster is worked on in memory as a [`Dojo`]. This module keeps a
//! `SQLite` snapshot of it so the CLI can pick up where the last command
//! left off. A save replaces the whole snapshot inside one transaction.

pub mod migrations;
pub mod schema;

use std::collections::{BTreeMap, BTreeSet};
use std::num::TryFromIntError;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use indexmap::IndexMap;
use rusqlite::{params, Connection, Transaction};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{AttendanceRecord, Graduation, MartialArt, MartialArtId, Student, StudentId};
use crate::model::MAX_DEGREES;
use crate::roster::Dojo;

use schema::ROSTER_TABLES;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snapshot storage for a dojo roster.
#[derive(Debug)]
pub struct Storage {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
}

impl Storage {
    /// Open or create a storage database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening roster database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;
        conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA journal_mode=WAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Roster database opened at {}", path.display());
        Ok(Self { path, conn })
    }

    /// Create an in-memory storage instance for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the stored snapshot with `dojo`.
    ///
    /// # Errors
    ///
    /// Returns an error if any write fails; the previous snapshot is then
    /// left in place.
    pub fn save(&mut self, dojo: &Dojo) -> Result<()> {
        let tx = self.conn.transaction()?;

        for table in ROSTER_TABLES {
            tx.execute(&format!("DELETE FROM {table}"), [])?;
        }

        for (position, name) in dojo.dojos().iter().enumerate() {
            tx.execute(
                "INSERT INTO dojos (position, name) VALUES (?1, ?2)",
                params![to_sql_int(position)?, name],
            )?;
        }
        for martial_art in dojo.martial_arts() {
            insert_martial_art(&tx, martial_art)?;
        }
        for student in dojo.students() {
            insert_student(&tx, student)?;
        }

        tx.commit()?;
        debug!(
            "Saved roster snapshot: {} students, {} martial arts",
            dojo.students().len(),
            dojo.martial_arts().len()
        );
        Ok(())
    }

    /// Load the stored snapshot. An empty database yields an empty roster.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails or a stored value cannot be decoded.
    pub fn load(&self) -> Result<Dojo> {
        let dojos = self.load_dojos()?;
        let martial_arts = self.load_martial_arts()?;
        let mut students = self.load_students()?;
        self.load_graduations(&mut students)?;
        self.load_attendance(&mut students)?;

        Ok(Dojo::from_parts(
            dojos,
            martial_arts,
            students.into_values().collect(),
        ))
    }

    /// Get database statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        let count = |table: &str| -> Result<i64> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok(n)
        };

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StorageStats {
            students: count("students")?,
            martial_arts: count("martial_arts")?,
            graduations: count("graduations")?,
            attendance_records: count("attendance")?,
            db_size_bytes,
        })
    }

    fn load_dojos(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM dojos ORDER BY position")?;
        let dojos = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(dojos)
    }

    fn load_martial_arts(&self) -> Result<Vec<MartialArt>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, uses_degrees, max_degrees FROM martial_arts ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, bool>(2)?,
                    row.get::<_, u32>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut martial_arts: IndexMap<i64, MartialArt> = IndexMap::new();
        for (id, name, uses_degrees, max_degrees) in rows {
            if max_degrees > MAX_DEGREES {
                return Err(Error::corrupt_row(
                    "martial_arts",
                    format!("martial art {id} has invalid max_degrees {max_degrees}"),
                ));
            }
            martial_arts.insert(
                id,
                MartialArt {
                    id: MartialArtId(from_sql_id("martial_arts", id)?),
                    name,
                    ranks: Vec::new(),
                    uses_degrees,
                    max_degrees,
                    promotion_requirements: BTreeMap::new(),
                },
            );
        }

        let mut stmt = self.conn.prepare(
            r"
            SELECT martial_art_id, label, required_classes
            FROM martial_art_ranks ORDER BY martial_art_id, position
            ",
        )?;
        let ranks = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (art_id, label, required) in ranks {
            let Some(martial_art) = martial_arts.get_mut(&art_id) else {
                return Err(Error::corrupt_row(
                    "martial_art_ranks",
                    format!("rank '{label}' belongs to unknown martial art {art_id}"),
                ));
            };
            martial_art
                .promotion_requirements
                .insert(label.clone(), required);
            martial_art.ranks.push(label);
        }

        Ok(martial_arts.into_values().collect())
    }

    fn load_students(&self) -> Result<IndexMap<i64, Student>> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT id, username, password, status, full_name, birth_date, gender,
                   contact_phone, internal_registry, observations, dojo, enrollment_date
            FROM students ORDER BY id
            ",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(StudentRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    password: row.get(2)?,
                    status: row.get(3)?,
                    full_name: row.get(4)?,
                    birth_date: row.get(5)?,
                    gender: row.get(6)?,
                    contact_phone: row.get(7)?,
                    internal_registry: row.get(8)?,
                    observations: row.get(9)?,
                    dojo: row.get(10)?,
                    enrollment_date: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut students = IndexMap::with_capacity(rows.len());
        for row in rows {
            let id = row.id;
            students.insert(id, row.into_student()?);
        }
        Ok(students)
    }

    fn load_graduations(&self, students: &mut IndexMap<i64, Student>) -> Result<()> {
        let mut stmt = self.conn.prepare(
            r"
            SELECT student_id, martial_art_id, rank, degree, last_promotion_date, rank_start_date
            FROM graduations ORDER BY student_id, position
            ",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, u32>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (student_id, art_id, rank, degree, last_promotion, rank_start) in rows {
            let martial_art_id = MartialArtId(from_sql_id("graduations", art_id)?);
            let graduation = Graduation {
                martial_art_id,
                rank,
                degree,
                last_promotion_date: parse_stored_date("graduations", &last_promotion)?,
                rank_start_date: parse_stored_date("graduations", &rank_start)?,
            };
            student_mut(students, "graduations", student_id)?
                .graduations
                .insert(martial_art_id, graduation);
        }
        Ok(())
    }

    fn load_attendance(&self, students: &mut IndexMap<i64, Student>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT student_id, martial_art_id, date FROM attendance")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (student_id, art_id, date) in rows {
            let record = AttendanceRecord {
                date: parse_stored_date("attendance", &date)?,
                martial_art_id: MartialArtId(from_sql_id("attendance", art_id)?),
            };
            student_mut(students, "attendance", student_id)?
                .attendance
                .insert(record);
        }
        Ok(())
    }
}

fn insert_martial_art(tx: &Transaction<'_>, martial_art: &MartialArt) -> Result<()> {
    let art_id = to_sql_int(martial_art.id.0)?;
    tx.execute(
        "INSERT INTO martial_arts (id, name, uses_degrees, max_degrees) VALUES (?1, ?2, ?3, ?4)",
        params![
            art_id,
            martial_art.name,
            martial_art.uses_degrees,
            martial_art.max_degrees
        ],
    )?;
    for (position, rank) in martial_art.ranks.iter().enumerate() {
        tx.execute(
            r"
            INSERT INTO martial_art_ranks (martial_art_id, position, label, required_classes)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                art_id,
                to_sql_int(position)?,
                rank,
                martial_art.required_classes(rank)
            ],
        )?;
    }
    Ok(())
}

fn insert_student(tx: &Transaction<'_>, student: &Student) -> Result<()> {
    let student_id = to_sql_int(student.id.0)?;
    tx.execute(
        r"
        INSERT INTO students (id, username, password, status, full_name, birth_date, gender,
                              contact_phone, internal_registry, observations, dojo, enrollment_date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ",
        params![
            student_id,
            student.username,
            student.password,
            student.status.to_string(),
            student.full_name,
            format_date(student.birth_date),
            student.gender.to_string(),
            student.contact_phone,
            student.internal_registry,
            student.observations,
            student.dojo,
            format_date(student.enrollment_date),
        ],
    )?;

    for (position, graduation) in student.graduations.values().enumerate() {
        tx.execute(
            r"
            INSERT INTO graduations (student_id, martial_art_id, position, rank, degree,
                                     last_promotion_date, rank_start_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                student_id,
                to_sql_int(graduation.martial_art_id.0)?,
                to_sql_int(position)?,
                graduation.rank,
                graduation.degree,
                format_date(graduation.last_promotion_date),
                format_date(graduation.rank_start_date),
            ],
        )?;
    }

    for record in &student.attendance {
        tx.execute(
            "INSERT INTO attendance (student_id, martial_art_id, date) VALUES (?1, ?2, ?3)",
            params![
                student_id,
                to_sql_int(record.martial_art_id.0)?,
                format_date(record.date)
            ],
        )?;
    }
    Ok(())
}

/// Raw `students` row, decoded after the query finishes.
struct StudentRow {
    id: i64,
    username: String,
    password: String,
    status: String,
    full_name: String,
    birth_date: String,
    gender: String,
    contact_phone: String,
    internal_registry: String,
    observations: String,
    dojo: String,
    enrollment_date: String,
}

impl StudentRow {
    fn into_student(self) -> Result<Student> {
        Ok(Student {
            id: StudentId(from_sql_id("students", self.id)?),
            username: self.username,
            password: self.password,
            status: self
                .status
                .parse()
                .map_err(|message| Error::corrupt_row("students", message))?,
            full_name: self.full_name,
            birth_date: parse_stored_date("students", &self.birth_date)?,
            gender: self
                .gender
                .parse()
                .map_err(|message| Error::corrupt_row("students", message))?,
            contact_phone: self.contact_phone,
            internal_registry: self.internal_registry,
            observations: self.observations,
            dojo: self.dojo,
            enrollment_date: parse_stored_date("students", &self.enrollment_date)?,
            graduations: IndexMap::new(),
            attendance: BTreeSet::new(),
        })
    }
}

fn student_mut<'a>(
    students: &'a mut IndexMap<i64, Student>,
    table: &'static str,
    student_id: i64,
) -> Result<&'a mut Student> {
    students
        .get_mut(&student_id)
        .ok_or_else(|| Error::corrupt_row(table, format!("unknown student {student_id}")))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_stored_date(table: &'static str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| Error::corrupt_row(table, format!("invalid date '{value}'")))
}

fn to_sql_int<T>(value: T) -> Result<i64>
where
    T: TryInto<i64, Error = TryFromIntError>,
{
    value
        .try_into()
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)).into())
}

fn from_sql_id(table: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::corrupt_row(table, format!("negative id {value}")))
}

/// Statistics about the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStats {
    /// Students stored.
    pub students: i64,
    /// Martial arts stored.
    pub martial_arts: i64,
    /// Graduations stored.
    pub graduations: i64,
    /// Attendance records stored.
    pub attendance_records: i64,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{parse_date, Gender, NewMartialArt, NewStudent, StudentStatus};

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn create_test_storage() -> Storage {
        Storage::open_in_memory().expect("failed to create test storage")
    }

    fn sample_dojo() -> Dojo {
        let mut dojo = Dojo::new();
        dojo.add_dojo("Matriz");
        dojo.add_dojo("Filial Norte");

        let karate = dojo
            .add_martial_art(NewMartialArt {
                name: "Karate".to_string(),
                ranks: vec!["Branca".to_string(), "Amarela".to_string(), "Preta".to_string()],
                uses_degrees: true,
                max_degrees: 2,
                promotion_requirements: BTreeMap::from([("Branca".to_string(), 9)]),
            })
            .unwrap();
        let judo = dojo
            .add_martial_art(NewMartialArt {
                name: "Judo".to_string(),
                ranks: vec!["Branca".to_string(), "Azul".to_string()],
                uses_degrees: false,
                max_degrees: 0,
                promotion_requirements: BTreeMap::new(),
            })
            .unwrap();

        let ana = dojo.register_student(NewStudent {
            username: "ana".to_string(),
            password: "s3cret".to_string(),
            status: StudentStatus::Active,
            full_name: "Ana Souza".to_string(),
            birth_date: date("1990-03-15"),
            gender: Gender::Female,
            contact_phone: "+55 11 99999-0000".to_string(),
            internal_registry: "R-001".to_string(),
            observations: "Asma leve".to_string(),
            dojo: "Matriz".to_string(),
            enrollment_date: date("2024-01-20"),
        });
        dojo.register_student(NewStudent {
            username: "bruno".to_string(),
            password: String::new(),
            status: StudentStatus::Inactive,
            full_name: "Bruno Lima".to_string(),
            birth_date: date("2001-11-02"),
            gender: Gender::Male,
            contact_phone: String::new(),
            internal_registry: String::new(),
            observations: String::new(),
            dojo: "Filial Norte".to_string(),
            enrollment_date: date("2023-05-01"),
        });

        dojo.enroll(ana, judo, "Azul", 0, date("2024-01-20")).unwrap();
        dojo.enroll(ana, karate, "Branca", 1, date("2024-02-01")).unwrap();
        dojo.record_attendance(ana, karate, date("2024-02-05"));
        dojo.record_attendance(ana, karate, date("2024-02-07"));
        dojo.record_attendance(ana, judo, date("2024-02-07"));
        dojo
    }

    #[test]
    fn test_open_in_memory() {
        assert!(Storage::open_in_memory().is_ok());
    }

    #[test]
    fn test_load_empty_database() {
        let storage = create_test_storage();
        assert_eq!(storage.load().unwrap(), Dojo::new());
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let mut storage = create_test_storage();
        let dojo = sample_dojo();

        storage.save(&dojo).unwrap();
        let loaded = storage.load().unwrap();

        assert_eq!(loaded, dojo);
    }

    #[test]
    fn test_graduation_order_survives_reload() {
        let mut storage = create_test_storage();
        storage.save(&sample_dojo()).unwrap();

        let loaded = storage.load().unwrap();
        let order: Vec<u64> = loaded.students()[0]
            .graduations
            .keys()
            .map(|id| id.0)
            .collect();
        assert_eq!(order, vec![2, 1]);
    }

    #[test]
    fn test_save_replaces_previous_snapshot() {
        let mut storage = create_test_storage();
        let mut dojo = sample_dojo();
        storage.save(&dojo).unwrap();

        let judo = dojo.martial_arts()[1].id;
        dojo.delete_martial_art(judo);
        storage.save(&dojo).unwrap();

        let stats = storage.stats().unwrap();
        assert_eq!(stats.martial_arts, 1);
        assert_eq!(stats.graduations, 1);
        assert_eq!(stats.students, 2);
        // Attendance for a deleted art is kept.
        assert_eq!(stats.attendance_records, 3);
        assert_eq!(storage.load().unwrap(), dojo);
    }

    #[test]
    fn test_ids_resume_after_reload() {
        let mut storage = create_test_storage();
        storage.save(&sample_dojo()).unwrap();

        let mut loaded = storage.load().unwrap();
        let id = loaded.register_student(NewStudent {
            username: "carla".to_string(),
            password: String::new(),
            status: StudentStatus::Active,
            full_name: "Carla".to_string(),
            birth_date: date("1999-09-09"),
            gender: Gender::Female,
            contact_phone: String::new(),
            internal_registry: String::new(),
            observations: String::new(),
            dojo: "Matriz".to_string(),
            enrollment_date: date("2024-03-01"),
        });
        assert_eq!(id, StudentId(3));
    }

    #[test]
    fn test_corrupt_status_is_reported() {
        let mut storage = create_test_storage();
        storage.save(&sample_dojo()).unwrap();
        storage
            .conn
            .execute("UPDATE students SET status = 'suspended' WHERE id = 1", [])
            .unwrap();

        let err = storage.load().unwrap_err();
        assert!(matches!(err, Error::CorruptRow { table: "students", .. }));
    }

    #[test]
    fn test_corrupt_date_is_reported() {
        let mut storage = create_test_storage();
        storage.save(&sample_dojo()).unwrap();
        storage
            .conn
            .execute(
                "UPDATE attendance SET date = '07/02/2024' \
                 WHERE rowid = (SELECT MIN(rowid) FROM attendance)",
                [],
            )
            .unwrap();

        let err = storage.load().unwrap_err();
        assert!(err.to_string().contains("07/02/2024"));
    }

    #[test]
    fn test_corrupt_degree_count_is_reported() {
        let mut storage = create_test_storage();
        storage.save(&sample_dojo()).unwrap();
        storage
            .conn
            .execute(
                "UPDATE martial_arts SET max_degrees = 4294967295 WHERE id = 1",
                [],
            )
            .unwrap();

        let err = storage.load().unwrap_err();
        assert!(matches!(err, Error::CorruptRow { table: "martial_arts", .. }));
    }

    #[test]
    fn test_stats_empty() {
        let stats = create_test_storage().stats().unwrap();
        assert_eq!(stats.students, 0);
        assert_eq!(stats.attendance_records, 0);
        assert_eq!(stats.db_size_bytes, 0);
    }

    #[test]
    fn test_path() {
        let storage = create_test_storage();
        assert_eq!(storage.path().to_string_lossy(), ":memory:");
    }

    #[test]
    fn test_open_file_based() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("roster.db");
        let dojo = sample_dojo();

        {
            let mut storage = Storage::open(&db_path).unwrap();
            storage.save(&dojo).unwrap();
            assert_eq!(storage.path(), db_path);
            assert!(storage.stats().unwrap().db_size_bytes > 0);
        }

        let reopened = Storage::open(&db_path).unwrap();
        assert_eq!(reopened.load().unwrap(), dojo);
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let nested_path = dir.path().join("nested/deeper/roster.db");

        let storage = Storage::open(&nested_path).unwrap();
        assert!(nested_path.exists());
        drop(storage);
    }

    #[test]
    fn test_storage_stats_clone() {
        let stats = StorageStats {
            students: 5,
            martial_arts: 2,
            graduations: 7,
            attendance_records: 40,
            db_size_bytes: 512,
        };
        assert_eq!(stats.clone(), stats);
    }
}
