use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rollcall_core::{
    AttendanceResolver, Embedding, EmbeddingExtractor, StudentId, StudentRecord,
};
use rollcall_store::{Database, NewStudent, StudentPatch};

mod config;
mod extractor;

use config::Config;
use extractor::CommandExtractor;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-matching class attendance CLI")]
struct Cli {
    /// Path to a TOML config file (default: $XDG_CONFIG_HOME/rollcall/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Emit machine-readable JSON instead of human-readable tables
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new student from an enrollment photo
    Register {
        /// Class the student belongs to
        #[arg(short, long)]
        class: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        email: String,
        /// Enrollment photo
        image: PathBuf,
    },
    /// Fetch a student's details and attendance report
    Fetch {
        /// Student ID
        id: i64,
    },
    /// Update fields of an existing student (only supplied fields change)
    Update {
        /// Student ID
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        email: Option<String>,
        /// New enrollment photo; the identity vector is re-extracted from it
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Remove a student (attendance history is kept)
    Remove {
        /// Student ID
        id: i64,
    },
    /// List the roster of a class
    Roster {
        class: String,
    },
    /// Mark attendance for one period from a group photo
    Mark {
        #[arg(short, long)]
        class: String,
        /// Period name, e.g. "1st Period"
        #[arg(short, long)]
        period: String,
        /// Attendance date (default: today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Match tolerance override for this run
        #[arg(long)]
        tolerance: Option<f32>,
        /// Group photo
        photo: PathBuf,
    },
    /// Show a student's attendance history
    History {
        /// Student ID
        id: i64,
    },
    /// Delete every student and attendance row
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let mut db = Database::open(&config.db_path)?;

    match cli.command {
        Commands::Register {
            class,
            name,
            age,
            email,
            image,
        } => {
            let image_bytes =
                std::fs::read(&image).with_context(|| format!("reading {}", image.display()))?;
            let encoding = extract_identity(&config, &image_bytes, &image)?;

            let id = db.register(NewStudent {
                class_name: class.clone(),
                name,
                age,
                email,
                image: image_bytes,
                encoding,
            })?;
            println!("Registered student {id} in class {class}");
        }

        Commands::Fetch { id } => {
            let id = StudentId(id);
            let Some(record) = db.get(id)? else {
                bail!("student {id} not found");
            };
            let report = db.attendance_report(id)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "student": record,
                        "report": {
                            "total_periods": report.total_periods,
                            "percentage": report.percentage,
                        },
                    })
                );
            } else {
                println!("ID:      {}", record.id);
                println!("Name:    {}", record.name);
                println!("Age:     {}", record.age);
                println!("Email:   {}", record.email);
                println!("Class:   {}", record.class_name);
                println!(
                    "Face:    {}",
                    if record.encoding.is_some() {
                        "enrolled"
                    } else {
                        "not enrolled (always marked absent)"
                    }
                );
                println!();
                println!("Attendance report");
                println!("  Total periods: {}", report.total_periods);
                println!("  Attended:      {:.2}%", report.percentage);
            }
        }

        Commands::Update {
            id,
            name,
            age,
            email,
            image,
        } => {
            let id = StudentId(id);
            let mut patch = StudentPatch {
                name,
                age,
                email,
                ..StudentPatch::default()
            };

            if let Some(path) = image {
                let image_bytes = std::fs::read(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                match extract_identity(&config, &image_bytes, &path)? {
                    Some(encoding) => patch.encoding = Some(encoding),
                    // New photo without a face: keep the previous identity
                    // vector rather than erase a working enrollment.
                    None => eprintln!("warning: keeping the previously stored identity vector"),
                }
                patch.image = Some(image_bytes);
            }

            db.update(id, patch)?;
            println!("Updated student {id}");
        }

        Commands::Remove { id } => {
            let id = StudentId(id);
            db.remove(id)?;
            println!("Removed student {id} (attendance history kept)");
        }

        Commands::Roster { class } => {
            let roster = db.list_roster(&class)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&roster)?);
            } else if roster.is_empty() {
                println!("No students registered in class {class}");
            } else {
                println!("{:>5}  {:<24} {:>3}  {:<28} FACE", "ID", "NAME", "AGE", "EMAIL");
                for s in &roster {
                    println!(
                        "{:>5}  {:<24} {:>3}  {:<28} {}",
                        s.id,
                        s.name,
                        s.age,
                        s.email,
                        if s.encoding.is_some() { "yes" } else { "no" }
                    );
                }
            }
        }

        Commands::Mark {
            class,
            period,
            date,
            tolerance,
            photo,
        } => {
            let roster = db.list_roster(&class)?;
            if roster.is_empty() {
                bail!("class {class} has no registered students");
            }

            let photo_bytes =
                std::fs::read(&photo).with_context(|| format!("reading {}", photo.display()))?;
            let extractor = CommandExtractor::from_command(&config.extractor)?;
            let observed = extractor.extract(&photo_bytes)?;
            if observed.is_empty() {
                // Valid outcome: an empty photo marks the whole roster absent.
                eprintln!("warning: no faces detected in {}", photo.display());
            }

            let tolerance = tolerance.unwrap_or(config.tolerance);
            let date = date.unwrap_or_else(|| Local::now().date_naive());

            let sheet = AttendanceResolver::new().resolve(&roster, &observed, tolerance)?;
            db.record_sheet(&sheet, date, &period)?;

            let names: HashMap<StudentId, &str> = roster
                .iter()
                .map(|s: &StudentRecord| (s.id, s.name.as_str()))
                .collect();

            if cli.json {
                let entry = |id: &StudentId| {
                    serde_json::json!({ "id": id, "name": names.get(id) })
                };
                println!(
                    "{}",
                    serde_json::json!({
                        "class": class,
                        "date": date.to_string(),
                        "period": period,
                        "tolerance": tolerance,
                        "present": sheet.present.iter().map(entry).collect::<Vec<_>>(),
                        "absent": sheet.absent.iter().map(entry).collect::<Vec<_>>(),
                    })
                );
            } else {
                println!(
                    "Attendance marked for class {class}, {date} {period} (tolerance {tolerance})"
                );
                print_group("Present", &sheet.present, &names);
                print_group("Absent", &sheet.absent, &names);
            }
        }

        Commands::History { id } => {
            let id = StudentId(id);
            let history = db.history(id)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&history)?);
            } else if history.is_empty() {
                println!("No attendance recorded for student {id}");
            } else {
                for record in &history {
                    println!("{}  {:<12} {}", record.date, record.period, record.status);
                }
            }
        }

        Commands::Reset { yes } => {
            if !yes && !confirm_reset()? {
                println!("Aborted");
                return Ok(());
            }
            db.reset()?;
            println!("All students and attendance records deleted");
        }
    }

    Ok(())
}

/// Run the configured extractor over an enrollment photo and apply the
/// no-face policy: reject when `require_face` is set, otherwise enroll
/// without an identity vector (and say so). A photo with several faces uses
/// the first one, matching the extractor's detection order.
fn extract_identity(
    config: &Config,
    image_bytes: &[u8],
    source: &Path,
) -> Result<Option<Embedding>> {
    let extractor = CommandExtractor::from_command(&config.extractor)?;
    let mut embeddings = extractor.extract(image_bytes)?;

    match embeddings.len() {
        0 if config.require_face => {
            bail!(
                "no face detected in {} and require_face is set; registration rejected",
                source.display()
            )
        }
        0 => {
            tracing::warn!(image = %source.display(), "no face detected in enrollment photo");
            eprintln!(
                "warning: no face detected in {}; student will always be marked absent",
                source.display()
            );
            Ok(None)
        }
        n => {
            if n > 1 {
                tracing::warn!(faces = n, "multiple faces in enrollment photo; using the first");
            }
            Ok(Some(embeddings.swap_remove(0)))
        }
    }
}

fn print_group(label: &str, ids: &[StudentId], names: &HashMap<StudentId, &str>) {
    println!();
    println!("{label} ({}):", ids.len());
    for id in ids {
        println!("  {:>5}  {}", id, names.get(id).copied().unwrap_or("?"));
    }
}

fn confirm_reset() -> Result<bool> {
    print!("This deletes every student and attendance record. Type 'yes' to continue: ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "yes")
}
