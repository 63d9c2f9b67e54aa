use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{AttendanceRecord, CsvLedgerFile, Ledger, Roster, Status};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall attendance administration")]
struct Cli {
    /// Roster folder (default: $ROLLCALL_ROSTER_DIR or "Class 10th A")
    #[arg(long, global = true)]
    roster: Option<PathBuf>,
    /// Attendance ledger CSV (default: $ROLLCALL_LEDGER_PATH or "Class 10th A.csv")
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show attendance, listing unseen students as absent
    Attendance {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Mark every ledger row for a student absent
    MarkAbsent {
        /// Student name as registered
        name: String,
    },
    /// Reset the ledger: every registered student absent today
    ClearAll,
    /// List registered students and their image counts
    Roster,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let roster_dir = cli
        .roster
        .unwrap_or_else(|| env_path("ROLLCALL_ROSTER_DIR", "Class 10th A"));
    let ledger_path = cli
        .ledger
        .unwrap_or_else(|| env_path("ROLLCALL_LEDGER_PATH", "Class 10th A.csv"));

    let roster = Roster::open(&roster_dir)
        .with_context(|| format!("opening roster {}", roster_dir.display()))?;
    let mut ledger = Ledger::new(CsvLedgerFile::new(&ledger_path));

    let output = match cli.command {
        Commands::Attendance { json } => attendance(&roster, &ledger, json)?,
        Commands::MarkAbsent { name } => {
            let rows = ledger
                .mark_absent(&name)
                .with_context(|| format!("updating {}", ledger_path.display()))?;
            format!("Marked {name} absent ({rows} rows)")
        }
        Commands::ClearAll => {
            let names = roster.person_names()?;
            ledger
                .reset_all(&names, chrono::Local::now().date_naive())
                .with_context(|| format!("resetting {}", ledger_path.display()))?;
            format!("Attendance reset for {} students", names.len())
        }
        Commands::Roster => roster_listing(&roster)?,
    };

    println!("{output}");
    Ok(())
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

/// JSON row shaped like the daemon's `GET /attendance` (empty date when unseen).
#[derive(Serialize)]
struct JsonRow<'a> {
    date: String,
    name: &'a str,
    attendance: Status,
}

fn attendance(roster: &Roster, ledger: &Ledger<CsvLedgerFile>, json: bool) -> Result<String> {
    let records = ledger.read(&roster.person_names()?)?;
    if json {
        let rows: Vec<JsonRow> = records
            .iter()
            .map(|r| JsonRow {
                date: r.date.map(|d| d.to_string()).unwrap_or_default(),
                name: &r.name,
                attendance: r.attendance,
            })
            .collect();
        return Ok(serde_json::to_string_pretty(&rows)?);
    }
    Ok(render_table(&records))
}

fn render_table(records: &[AttendanceRecord]) -> String {
    let width = records
        .iter()
        .map(|r| r.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("name".len());

    let mut out = format!("{:<10}  {:<width$}  attendance", "date", "name");
    for r in records {
        let date = r.date.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        let status = match r.attendance {
            Status::Present => "Present",
            Status::Absent => "Absent",
        };
        out.push_str(&format!("\n{date:<10}  {:<width$}  {status}", r.name));
    }
    out
}

fn roster_listing(roster: &Roster) -> Result<String> {
    let names = roster.person_names()?;
    if names.is_empty() {
        return Ok("No students registered".into());
    }
    let mut lines = Vec::with_capacity(names.len());
    for name in &names {
        lines.push(format!("{name}\t{} images", roster.image_files(name)?.len()));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
        let cli = Cli::parse_from(["rollcall", "mark-absent", "Alice", "--ledger", "x.csv"]);
        assert!(matches!(cli.command, Commands::MarkAbsent { ref name } if name == "Alice"));
        assert_eq!(cli.ledger, Some(PathBuf::from("x.csv")));
    }

    #[test]
    fn test_render_table() {
        let records = vec![
            AttendanceRecord::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), "Alice", Status::Present),
            AttendanceRecord {
                date: None,
                name: "Bob".into(),
                attendance: Status::Absent,
            },
        ];
        let table = render_table(&records);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "date        name   attendance");
        assert_eq!(lines[1], "2024-03-01  Alice  Present");
        assert_eq!(lines[2], "-           Bob    Absent");
    }

    #[test]
    fn test_attendance_and_roster_listing() {
        let dir = tempfile::tempdir().unwrap();
        let roster = Roster::open(dir.path().join("class")).unwrap();
        roster.write_image("Alice", 0, b"x").unwrap();
        roster.write_image("Alice", 1, b"x").unwrap();
        roster.ensure_person_dir("Bob").unwrap();
        let ledger = Ledger::new(CsvLedgerFile::new(dir.path().join("class.csv")));

        assert_eq!(roster_listing(&roster).unwrap(), "Alice\t2 images\nBob\t0 images");

        let json = attendance(&roster, &ledger, true).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(rows[1]["name"], "Bob");
        assert_eq!(rows[1]["attendance"], "Absent");
        assert_eq!(rows[1]["date"], "");
    }
}
