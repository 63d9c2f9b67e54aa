//! Request workflows: registration, recognition and the ledger endpoints.

use crate::engine::EngineHandle;
use crate::error::ServiceError;
use chrono::NaiveDate;
use rollcall_core::photo;
use rollcall_core::{CsvLedgerFile, Ledger, LedgerError, MatchOutcome, Roster, Status};
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// One row of `GET /attendance`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceEntry {
    /// `YYYY-MM-DD`, or empty for a student with no row yet.
    pub date: String,
    /// `{roster folder}/{student}`.
    pub name: String,
    pub attendance: Status,
}

/// Shared service state handed to every request handler.
#[derive(Clone)]
pub struct Service {
    engine: EngineHandle,
    roster: Roster,
    ledger: Arc<Mutex<Ledger<CsvLedgerFile>>>,
    images_per_registration: usize,
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

impl Service {
    pub fn new(
        engine: EngineHandle,
        roster: Roster,
        ledger: Ledger<CsvLedgerFile>,
        images_per_registration: usize,
    ) -> Self {
        Self {
            engine,
            roster,
            ledger: Arc::new(Mutex::new(ledger)),
            images_per_registration,
        }
    }

    /// Run a ledger operation on the blocking pool, one at a time.
    async fn with_ledger<T, F>(&self, op: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&mut Ledger<CsvLedgerFile>, &Roster) -> Result<T, LedgerError> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = Arc::clone(&self.ledger);
        let roster = self.roster.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = ledger
                .lock()
                .map_err(|_| LedgerError::Io(std::io::Error::other("ledger lock poisoned")))?;
            op(&mut *guard, &roster)
        })
        .await
        .map_err(|e| ServiceError::Storage(format!("ledger task failed: {e}")))?
        .map_err(ServiceError::from)
    }

    /// Store the student's images, grow the gallery and seed an absent row.
    ///
    /// Every slot is checked before anything touches disk. After that there
    /// is no rollback: a failing slot leaves earlier slots written and enrolled.
    pub async fn register(&self, form: &HashMap<String, String>) -> Result<String, ServiceError> {
        let name = form
            .get("name")
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::MissingField("No name found in request".into()))?;
        self.roster.person_dir(name)?;

        let mut payloads = Vec::with_capacity(self.images_per_registration);
        for i in 0..self.images_per_registration {
            let key = format!("image{i}");
            match form.get(&key).filter(|v| !v.trim().is_empty()) {
                Some(payload) => payloads.push(payload),
                None => {
                    return Err(ServiceError::MissingField(format!(
                        "No image data found for {key}"
                    )))
                }
            }
        }

        self.roster.ensure_person_dir(name)?;

        for (i, payload) in payloads.into_iter().enumerate() {
            let slot_failed = |cause: String| {
                tracing::error!(name, slot = i, %cause, "registration: error saving image");
                ServiceError::Decode(format!("Error saving image{i}"))
            };

            let bytes = photo::decode_base64(photo::strip_data_uri(payload))
                .map_err(|e| slot_failed(e.to_string()))?;
            self.roster
                .write_image(name, i, &bytes)
                .map_err(|e| slot_failed(e.to_string()))?;

            // Re-encode the whole directory, not only the new file.
            let images = self
                .roster
                .image_files(name)
                .map_err(|e| slot_failed(e.to_string()))?;
            let added = self
                .engine
                .enroll(name, images)
                .await
                .map_err(|e| slot_failed(e.to_string()))?;
            tracing::debug!(name, slot = i, added, "registration: slot enrolled");
        }

        let student = name.to_string();
        self.with_ledger(move |ledger, _| ledger.upsert(&student, false, today()))
            .await?;

        tracing::info!(name, images = self.images_per_registration, "student registered");
        Ok(format!(
            "Student '{name}' registered successfully with {} images",
            self.images_per_registration
        ))
    }

    /// Recognize every face in the photo and mark known students present.
    pub async fn recognize(&self, image_data: Option<&str>) -> Result<Vec<MatchOutcome>, ServiceError> {
        let payload = image_data
            .map(photo::strip_data_uri)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServiceError::MissingField("No image data found in request".into()))?;

        let image = photo::decode_photo(payload).map_err(|e| {
            tracing::error!(error = %e, "recognize: error decoding image");
            ServiceError::Decode("Error decoding image".into())
        })?;

        let outcomes = self.engine.recognize(image).await?;

        let present: Vec<String> = outcomes
            .iter()
            .filter_map(MatchOutcome::name)
            .map(str::to_string)
            .collect();
        if !present.is_empty() {
            self.with_ledger(move |ledger, _| {
                let today = today();
                present
                    .iter()
                    .try_for_each(|name| ledger.upsert(name, true, today))
            })
            .await?;
        }

        tracing::info!(
            faces = outcomes.len(),
            recognized = ?outcomes.iter().map(MatchOutcome::label).collect::<Vec<_>>(),
            "photo processed"
        );
        Ok(outcomes)
    }

    /// Ledger rows merged with an absent row for every unseen student.
    pub async fn attendance(&self) -> Result<Vec<AttendanceEntry>, ServiceError> {
        let folder = self.roster.folder_name();
        let records = self
            .with_ledger(|ledger, roster| {
                let names = roster.person_names().map_err(roster_io)?;
                ledger.read(&names)
            })
            .await?;

        Ok(records
            .into_iter()
            .map(|r| AttendanceEntry {
                date: r.date.map(|d| d.to_string()).unwrap_or_default(),
                name: format!("{folder}/{}", r.name),
                attendance: r.attendance,
            })
            .collect())
    }

    pub async fn mark_absent(&self, student_name: Option<&str>) -> Result<usize, ServiceError> {
        let name = student_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServiceError::MissingField("Student name is required".into()))?
            .to_string();

        self.with_ledger(move |ledger, _| ledger.mark_absent(&name))
            .await
    }

    /// Reset the ledger to every registered student absent today.
    pub async fn clear_all(&self) -> Result<(), ServiceError> {
        self.with_ledger(|ledger, roster| {
            let names = roster.person_names().map_err(roster_io)?;
            ledger.reset_all(&names, today())
        })
        .await
    }

    /// Map `/{folder}/{path}` onto a file inside the roster, or `NotFound`.
    pub fn asset(&self, folder: &str, path: &str) -> Result<PathBuf, ServiceError> {
        if folder != self.roster.folder_name() {
            return Err(ServiceError::NotFound(format!("{folder}/{path}")));
        }
        Ok(self.roster.resolve_asset(path)?)
    }
}

fn roster_io(err: rollcall_core::RosterError) -> LedgerError {
    match err {
        rollcall_core::RosterError::Io(e) => LedgerError::Io(e),
        other => LedgerError::Io(std::io::Error::other(other.to_string())),
    }
}
