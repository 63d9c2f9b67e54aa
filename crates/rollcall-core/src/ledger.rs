//! Attendance ledger: dated present/absent rows, one flat CSV table.
//!
//! Every mutation loads the full row list, edits it in memory and hands the
//! whole list back to storage. There is no locking at this level; callers
//! that share a ledger must serialize access themselves.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Column header of the ledger file.
pub const LEDGER_HEADER: [&str; 3] = ["date", "name", "attendance"];

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("attendance ledger not found")]
    NotFound,
    #[error("ledger io: {0}")]
    Io(#[from] io::Error),
    #[error("ledger csv: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Present,
    Absent,
}

impl Status {
    pub fn from_present(present: bool) -> Self {
        if present {
            Status::Present
        } else {
            Status::Absent
        }
    }
}

/// One ledger row. `date` is `None` only for rows synthesized by [`Ledger::read`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: Option<NaiveDate>,
    pub name: String,
    pub attendance: Status,
}

impl AttendanceRecord {
    pub fn new(date: NaiveDate, name: &str, attendance: Status) -> Self {
        Self {
            date: Some(date),
            name: name.to_string(),
            attendance,
        }
    }
}

/// Where the ledger rows live.
///
/// `store` replaces the entire contents; implementations must always persist
/// the header, even for an empty row list.
pub trait LedgerStorage {
    fn exists(&self) -> bool;
    /// Stored rows in order; empty when nothing has been stored yet.
    fn load(&self) -> Result<Vec<AttendanceRecord>, LedgerError>;
    fn store(&mut self, records: &[AttendanceRecord]) -> Result<(), LedgerError>;
}

/// CSV file storage, rewritten wholesale on every store.
#[derive(Debug, Clone)]
pub struct CsvLedgerFile {
    path: PathBuf,
}

impl CsvLedgerFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStorage for CsvLedgerFile {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Result<Vec<AttendanceRecord>, LedgerError> {
        if !self.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&self.path)?;
        reader
            .deserialize()
            .collect::<Result<Vec<AttendanceRecord>, csv::Error>>()
            .map_err(LedgerError::from)
    }

    fn store(&mut self, records: &[AttendanceRecord]) -> Result<(), LedgerError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_path(&self.path)?;
        writer.write_record(LEDGER_HEADER)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        tracing::debug!(path = %self.path.display(), rows = records.len(), "ledger written");
        Ok(())
    }
}

/// In-memory storage; `None` means the ledger was never created.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    rows: Option<Vec<AttendanceRecord>>,
}

impl MemoryStorage {
    pub fn with_rows(rows: Vec<AttendanceRecord>) -> Self {
        Self { rows: Some(rows) }
    }
}

impl LedgerStorage for MemoryStorage {
    fn exists(&self) -> bool {
        self.rows.is_some()
    }

    fn load(&self) -> Result<Vec<AttendanceRecord>, LedgerError> {
        Ok(self.rows.clone().unwrap_or_default())
    }

    fn store(&mut self, records: &[AttendanceRecord]) -> Result<(), LedgerError> {
        self.rows = Some(records.to_vec());
        Ok(())
    }
}

/// The attendance state machine over some [`LedgerStorage`].
#[derive(Debug)]
pub struct Ledger<S> {
    storage: S,
}

impl<S: LedgerStorage> Ledger<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn exists(&self) -> bool {
        self.storage.exists()
    }

    /// Set today's status on the first row for `name`, or append a new row.
    ///
    /// Creates the ledger if it does not exist yet.
    pub fn upsert(&mut self, name: &str, present: bool, today: NaiveDate) -> Result<(), LedgerError> {
        let status = Status::from_present(present);
        let mut records = self.storage.load()?;

        match records.iter_mut().find(|r| r.name == name) {
            Some(row) => {
                row.date = Some(today);
                row.attendance = status;
            }
            None => records.push(AttendanceRecord::new(today, name, status)),
        }

        self.storage.store(&records)?;
        tracing::info!(name, ?status, %today, "attendance updated");
        Ok(())
    }

    /// Stored rows followed by a dateless `Absent` row for every roster name
    /// that has none. Never writes; a missing ledger reads as empty.
    pub fn read<N: AsRef<str>>(&self, roster: &[N]) -> Result<Vec<AttendanceRecord>, LedgerError> {
        let mut records = self.storage.load()?;

        let mut missing = Vec::new();
        for name in roster.iter().map(|n| n.as_ref()) {
            if !records.iter().any(|r| r.name == name) {
                missing.push(AttendanceRecord {
                    date: None,
                    name: name.to_string(),
                    attendance: Status::Absent,
                });
            }
        }

        records.extend(missing);
        Ok(records)
    }

    /// Mark every row for `name` absent, leaving dates alone.
    ///
    /// Returns how many rows matched.
    pub fn mark_absent(&mut self, name: &str) -> Result<usize, LedgerError> {
        if !self.storage.exists() {
            return Err(LedgerError::NotFound);
        }

        let mut records = self.storage.load()?;
        let mut changed = 0;
        for row in records.iter_mut().filter(|r| r.name == name) {
            row.attendance = Status::Absent;
            changed += 1;
        }

        self.storage.store(&records)?;
        tracing::info!(name, rows = changed, "marked absent");
        Ok(changed)
    }

    /// Replace the ledger with one `Absent` row per roster name, dated today.
    pub fn reset_all<N: AsRef<str>>(&mut self, roster: &[N], today: NaiveDate) -> Result<(), LedgerError> {
        if !self.storage.exists() {
            return Err(LedgerError::NotFound);
        }

        let records: Vec<AttendanceRecord> = roster
            .iter()
            .map(|name| AttendanceRecord::new(today, name.as_ref(), Status::Absent))
            .collect();

        self.storage.store(&records)?;
        tracing::info!(persons = records.len(), %today, "ledger reset");
        Ok(())
    }
}
