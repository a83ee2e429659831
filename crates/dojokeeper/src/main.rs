//! `dkeep` - CLI for dojokeeper
//!
//! Every command loads the roster snapshot, works on it in memory, and saves
//! it back if it changed anything.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::debug;

use dojokeeper::cli::{
    ArtAddCommand, ArtCommand, AttendCommand, Cli, Command, ConfigCommand, DashboardCommand,
    DojoCommand, EnrollCommand, OutputFormat, PromoteCommand, RegisterCommand, StudentCommand,
};
use dojokeeper::config::MAX_DEGREES_LIMIT;
use dojokeeper::dashboard::{attendance_since_rank_start, payment_status};
use dojokeeper::{
    init_logging, rank_fill, Config, DashboardSummary, Dojo, MartialArtId, NewMartialArt,
    NewStudent, PromotionOutcome, Storage, Student, StudentId, StudentStatus,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;
    let today = Local::now().date_naive();

    let mutating = cli.command.is_mutating();
    match cli.command {
        Command::Config(cmd) => handle_config(&config, cmd),
        Command::Status(cmd) => handle_status(&open_storage(&config)?, cmd.json),
        Command::Dojo(cmd) => with_roster(&config, mutating, |dojo| {
            handle_dojo(dojo, cmd);
            Ok(())
        }),
        Command::Art(cmd) => with_roster(&config, mutating, |dojo| handle_art(dojo, &config, cmd)),
        Command::Student(cmd) => {
            with_roster(&config, mutating, |dojo| handle_student(dojo, today, cmd))
        }
        Command::Attend(cmd) => {
            with_roster(&config, mutating, |dojo| handle_attend(dojo, today, cmd))
        }
        Command::Promote(cmd) => {
            with_roster(&config, mutating, |dojo| handle_promote(dojo, today, cmd))
        }
        Command::Dashboard(cmd) => with_roster(&config, mutating, |dojo| {
            handle_dashboard(dojo, &config, today, &cmd)
        }),
    }
}

fn open_storage(config: &Config) -> Result<Storage> {
    let db_path = config.database_path();
    Storage::open(&db_path)
        .with_context(|| format!("failed to open roster at {}", db_path.display()))
}

/// Load the roster, run `f` on it, and save it back if `mutating`.
fn with_roster<F>(config: &Config, mutating: bool, f: F) -> Result<()>
where
    F: FnOnce(&mut Dojo) -> Result<()>,
{
    let mut storage = open_storage(config)?;
    let mut dojo = storage.load().context("failed to load roster")?;

    f(&mut dojo)?;

    if mutating {
        storage.save(&dojo).context("failed to save roster")?;
        debug!("Roster saved to {}", storage.path().display());
    }
    Ok(())
}

fn handle_dojo(dojo: &mut Dojo, cmd: DojoCommand) {
    match cmd {
        DojoCommand::Add { name } => {
            if dojo.add_dojo(&name) {
                println!("Added dojo '{}'", name.trim());
            } else {
                println!("Dojo '{}' not added (blank or already present)", name.trim());
            }
        }
        DojoCommand::List => {
            for name in dojo.dojos() {
                println!("{name}");
            }
        }
    }
}

fn handle_art(dojo: &mut Dojo, config: &Config, cmd: ArtCommand) -> Result<()> {
    match cmd {
        ArtCommand::Add(add) => {
            let form = new_martial_art(config, add)?;
            let id = dojo.add_martial_art(form)?;
            println!("Added martial art {id}");
        }
        ArtCommand::List { format } => match format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(dojo.martial_arts())?);
            }
            OutputFormat::Table => {
                for art in dojo.martial_arts() {
                    let degrees = if art.uses_degrees {
                        format!("{} degrees", art.max_degrees)
                    } else {
                        "no degrees".to_string()
                    };
                    println!("{:>4}  {} ({degrees})", art.id.0, art.name);
                    for rank in &art.ranks {
                        println!(
                            "        {:<24} {:>4} classes  {}",
                            rank,
                            art.required_classes(rank),
                            rank_fill(rank)
                        );
                    }
                }
            }
        },
        ArtCommand::Delete { id } => match dojo.delete_martial_art(MartialArtId(id)) {
            Some(art) => println!("Deleted martial art '{}'", art.name),
            None => bail!("no martial art with id {id}"),
        },
    }
    Ok(())
}

fn new_martial_art(config: &Config, add: ArtAddCommand) -> Result<NewMartialArt> {
    let uses_degrees = !add.no_degrees;
    let max_degrees = add
        .max_degrees
        .unwrap_or(config.martial_arts.default_max_degrees);
    if max_degrees > MAX_DEGREES_LIMIT {
        bail!("--max-degrees cannot be greater than {MAX_DEGREES_LIMIT}");
    }

    let mut form = match add.preset {
        Some(preset) => preset.new_martial_art(uses_degrees, max_degrees),
        None => NewMartialArt {
            ranks: add.ranks,
            uses_degrees,
            max_degrees,
            ..NewMartialArt::default()
        },
    };
    if let Some(name) = add.name {
        form.name = name;
    }
    form.promotion_requirements.extend(add.requirements);
    Ok(form)
}

fn handle_student(dojo: &mut Dojo, today: NaiveDate, cmd: StudentCommand) -> Result<()> {
    match cmd {
        StudentCommand::Register(register) => {
            let id = dojo.register_student(new_student(register, today));
            println!("Registered student {id}");
        }
        StudentCommand::List {
            dojo: branch,
            status,
            format,
        } => {
            let students: Vec<&Student> = dojo
                .students()
                .iter()
                .filter(|s| branch.as_ref().map_or(true, |b| &s.dojo == b))
                .filter(|s| status.map_or(true, |st| s.status == st))
                .collect();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&students)?),
                OutputFormat::Table => {
                    for student in students {
                        println!(
                            "{:>4}  {:<32} {:<16} {:<8} {}",
                            student.id.0,
                            student.full_name,
                            student.dojo,
                            student.status.to_string(),
                            payment_status(student, today)
                        );
                    }
                }
            }
        }
        StudentCommand::Show { id, json } => {
            let Some(student) = dojo.student(StudentId(id)) else {
                bail!("no student with id {id}");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(student)?);
            } else {
                print_student(dojo, student, today);
            }
        }
        StudentCommand::Enroll(enroll) => handle_enroll(dojo, today, &enroll)?,
        StudentCommand::SetStatus { id, status } => {
            let Some(mut student) = dojo.student(StudentId(id)).cloned() else {
                bail!("no student with id {id}");
            };
            student.status = status;
            dojo.update_student(student);
            println!("Student {id} is now {status}");
        }
    }
    Ok(())
}

fn new_student(register: RegisterCommand, today: NaiveDate) -> NewStudent {
    NewStudent {
        username: register.username,
        password: register.password,
        status: if register.inactive {
            StudentStatus::Inactive
        } else {
            StudentStatus::Active
        },
        full_name: register.full_name,
        birth_date: register.birth_date,
        gender: register.gender,
        contact_phone: register.phone,
        internal_registry: register.registry,
        observations: register.observations,
        dojo: register.dojo,
        enrollment_date: register.enrolled.unwrap_or(today),
    }
}

fn handle_enroll(dojo: &mut Dojo, today: NaiveDate, enroll: &EnrollCommand) -> Result<()> {
    let enrolled = dojo.enroll(
        StudentId(enroll.student),
        MartialArtId(enroll.art),
        &enroll.rank,
        enroll.degree,
        enroll.since.unwrap_or(today),
    )?;
    if !enrolled {
        bail!(
            "no student {} or no martial art {}",
            enroll.student,
            enroll.art
        );
    }
    println!(
        "Student {} enrolled at {} degree {}",
        enroll.student, enroll.rank, enroll.degree
    );
    Ok(())
}

fn print_student(dojo: &Dojo, student: &Student, today: NaiveDate) {
    println!("{} (#{})", student.full_name, student.id);
    println!("  Status:       {}", student.status);
    println!("  Dojo:         {}", student.dojo);
    println!("  Born:         {}", student.birth_date);
    println!("  Enrolled:     {}", student.enrollment_date);
    println!("  Payment:      {}", payment_status(student, today));
    if !student.contact_phone.is_empty() {
        println!("  Phone:        {}", student.contact_phone);
    }
    if !student.internal_registry.is_empty() {
        println!("  Registry:     {}", student.internal_registry);
    }
    if !student.observations.is_empty() {
        println!("  Observations: {}", student.observations);
    }

    for graduation in student.graduations.values() {
        let art_name = dojo
            .martial_art(graduation.martial_art_id)
            .map_or("?", |a| a.name.as_str());
        println!();
        println!("  {art_name}: {} degree {}", graduation.rank, graduation.degree);
        println!("    Badge:               {}", rank_fill(&graduation.rank));
        println!("    Last promotion:      {}", graduation.last_promotion_date);
        println!(
            "    Classes since then:  {}",
            student.classes_after(graduation.martial_art_id, graduation.last_promotion_date)
        );
        println!(
            "    Classes in rank:     {}",
            attendance_since_rank_start(student, graduation)
        );
    }
}

fn handle_attend(dojo: &mut Dojo, today: NaiveDate, cmd: AttendCommand) -> Result<()> {
    match cmd {
        AttendCommand::Mark {
            art,
            students,
            date,
        } => {
            let art_id = MartialArtId(art);
            if dojo.martial_art(art_id).is_none() {
                bail!("no martial art with id {art}");
            }
            let date = date.unwrap_or(today);
            let mut marked = 0;
            for id in students {
                if dojo.record_attendance(StudentId(id), art_id, date) {
                    marked += 1;
                } else {
                    println!("Student {id} skipped (unknown or already marked)");
                }
            }
            println!("Marked {marked} present on {date}");
        }
        AttendCommand::Roster { art, date } => {
            let art_id = MartialArtId(art);
            let Some(martial_art) = dojo.martial_art(art_id) else {
                bail!("no martial art with id {art}");
            };
            let date = date.unwrap_or(today);
            println!("{} on {date}", martial_art.name);
            for student in dojo.attendance_roster(art_id) {
                let mark = if dojo.is_present(student.id, art_id, date) {
                    "x"
                } else {
                    " "
                };
                let rank = student
                    .graduation(art_id)
                    .map_or("", |g| g.rank.as_str());
                println!("  [{mark}] {:>4}  {:<32} {rank}", student.id.0, student.full_name);
            }
        }
    }
    Ok(())
}

fn handle_promote(dojo: &mut Dojo, today: NaiveDate, cmd: PromoteCommand) -> Result<()> {
    match cmd {
        PromoteCommand::List { format } => {
            let candidates = dojo.promotion_candidates();
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&candidates)?),
                OutputFormat::Table => {
                    for c in candidates {
                        println!(
                            "{:>4}  {:<32} {:<20} {} degree {}  ({}/{} classes)",
                            c.student.id.0,
                            c.student.full_name,
                            c.martial_art.name,
                            c.graduation.rank,
                            c.graduation.degree,
                            c.attended_since_promotion,
                            c.required_for_step
                        );
                    }
                }
            }
        }
        PromoteCommand::Apply {
            student,
            art,
            all,
            date,
        } => {
            let date = date.unwrap_or(today);
            let targets: Vec<(StudentId, MartialArtId)> = if all {
                dojo.promotion_candidates()
                    .iter()
                    .map(|c| (c.student.id, c.martial_art.id))
                    .collect()
            } else {
                match (student, art) {
                    (Some(student), Some(art)) => vec![(StudentId(student), MartialArtId(art))],
                    _ => bail!("a student and a martial art are required without --all"),
                }
            };

            for (student_id, art_id) in targets {
                let outcome = dojo.apply_promotion(student_id, art_id, date);
                println!("Student {student_id} in art {art_id}: {}", describe(&outcome));
            }
        }
    }
    Ok(())
}

fn describe(outcome: &PromotionOutcome) -> String {
    match outcome {
        PromotionOutcome::Degree { rank, degree } => {
            format!("now {rank} degree {degree}")
        }
        PromotionOutcome::Rank { from, to } => format!("promoted from {from} to {to}"),
        PromotionOutcome::Unchanged => "unchanged".to_string(),
    }
}

fn handle_dashboard(
    dojo: &Dojo,
    config: &Config,
    today: NaiveDate,
    cmd: &DashboardCommand,
) -> Result<()> {
    let summary = DashboardSummary::compute(dojo, cmd.date.unwrap_or(today), &config.dashboard);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Dashboard for {}", summary.today);
    println!("================");
    println!();
    println!(
        "Students:  {} total, {} active ({} male, {} female)",
        summary.total_students,
        summary.active_students,
        summary.male_students,
        summary.female_students
    );
    for (branch, count) in &summary.dojo_counts {
        println!("  {branch:<24} {count}");
    }

    println!();
    println!(
        "[Birthdays in the next {} days]",
        config.dashboard.birthday_window_days
    );
    for birthday in &summary.upcoming_birthdays {
        println!("  {}  {}", birthday.display_date(), birthday.student.full_name);
    }

    println!();
    println!("[Payments due]");
    for student in &summary.payments_due {
        println!("  {:>4}  {}", student.id.0, student.full_name);
    }

    println!();
    println!("[Latest enrollments]");
    for student in &summary.latest_enrollments {
        println!("  {}  {}", student.enrollment_date, student.full_name);
    }

    for distribution in &summary.rank_distributions {
        println!();
        println!("[{}]", distribution.name);
        for (rank, count) in &distribution.counts {
            println!("  {rank:<24} {count}");
        }
    }

    println!();
    println!("[Ready for promotion]");
    for c in &summary.promotion_candidates {
        println!(
            "  {:>4}  {:<32} {} {}",
            c.student.id.0, c.student.full_name, c.martial_art.name, c.graduation.rank
        );
    }
    Ok(())
}

fn handle_status(storage: &Storage, json: bool) -> Result<()> {
    let stats = storage.stats()?;
    if json {
        let status = serde_json::json!({
            "database_path": storage.path(),
            "students": stats.students,
            "martial_arts": stats.martial_arts,
            "graduations": stats.graduations,
            "attendance_records": stats.attendance_records,
            "db_size_bytes": stats.db_size_bytes,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("dkeep status");
        println!("------------");
        println!("Database:      {}", storage.path().display());
        println!("Students:      {}", stats.students);
        println!("Martial arts:  {}", stats.martial_arts);
        println!("Graduations:   {}", stats.graduations);
        println!("Attendance:    {}", stats.attendance_records);
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:        {}", config.database_path().display());
                println!();
                println!("[Dashboard]");
                println!(
                    "  Birthday window:      {} days",
                    config.dashboard.birthday_window_days
                );
                println!(
                    "  Recent enrollments:   {}",
                    config.dashboard.recent_enrollments
                );
                println!();
                println!("[Martial arts]");
                println!(
                    "  Default max degrees:  {}",
                    config.martial_arts.default_max_degrees
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
