//! Append-only record store
//!
//! Keeps two JSON Lines logs in a data directory:
//! - `history.jsonl`: one [`PredictionRecord`] per estimate
//! - `feedback.jsonl`: one [`FeedbackRecord`] per human correction
//!
//! The first line of each log is a schema header. Appends and clears are
//! serialized by a single writer lock per store, and each record is written
//! with one `write_all`, so concurrent writers never interleave. Reads take
//! no lock and skip lines they cannot parse, which covers a line observed
//! mid-append.
//!
//! `recent_predictions` scans the whole history log. That is fine for the
//! sizes this tool sees; a much larger log would want a reverse index.

use crate::models::{Confidence, FeedbackRecord, PredictionRecord, StoryPoints};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

/// Version written into both log headers
pub const SCHEMA_VERSION: u32 = 1;

pub const HISTORY_FILE: &str = "history.jsonl";
pub const FEEDBACK_FILE: &str = "feedback.jsonl";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record store unavailable at {}: {source}", path.display())]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

fn unavailable(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Unavailable {
        path: path.to_path_buf(),
        source,
    }
}

/// First line of every log
#[derive(Debug, Serialize, Deserialize)]
struct SchemaHeader {
    schema: String,
    version: u32,
    fields: Vec<String>,
}

#[derive(Clone, Copy)]
struct LogSchema {
    name: &'static str,
    fields: &'static [&'static str],
}

const PREDICTION_SCHEMA: LogSchema = LogSchema {
    name: "prediction",
    fields: &[
        "id",
        "timestamp",
        "user_story",
        "predicted_points",
        "confidence",
        "model",
    ],
};

const FEEDBACK_SCHEMA: LogSchema = LogSchema {
    name: "feedback",
    fields: &["id", "timestamp", "prediction_id", "user_story", "actual_points"],
};

impl LogSchema {
    fn header_line(self) -> Result<String, StoreError> {
        let header = SchemaHeader {
            schema: self.name.to_string(),
            version: SCHEMA_VERSION,
            fields: self.fields.iter().map(|f| f.to_string()).collect(),
        };
        let mut line = serde_json::to_string(&header)?;
        line.push('\n');
        Ok(line)
    }
}

/// Durable prediction and feedback logs
pub struct RecordStore {
    data_dir: PathBuf,
    history_path: PathBuf,
    feedback_path: PathBuf,
    write_lock: Mutex<()>,
}

impl RecordStore {
    /// Open the store, creating the directory and any missing log.
    ///
    /// Existing non-empty logs are left as they are.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir).map_err(unavailable(&data_dir))?;

        let store = Self {
            history_path: data_dir.join(HISTORY_FILE),
            feedback_path: data_dir.join(FEEDBACK_FILE),
            data_dir,
            write_lock: Mutex::new(()),
        };

        {
            let _guard = store.lock();
            ensure_log(&store.history_path, PREDICTION_SCHEMA)?;
            ensure_log(&store.feedback_path, FEEDBACK_SCHEMA)?;
        }

        debug!("Record store ready at {}", store.data_dir.display());
        Ok(store)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log a prediction and return its new id
    pub fn append_prediction(
        &self,
        user_story: &str,
        predicted_points: StoryPoints,
        confidence: Confidence,
        model: &str,
    ) -> Result<String, StoreError> {
        self.record_prediction(user_story, predicted_points, confidence, model)
            .map(|record| record.id)
    }

    /// Log a prediction and return the record exactly as written
    pub fn record_prediction(
        &self,
        user_story: &str,
        predicted_points: StoryPoints,
        confidence: Confidence,
        model: &str,
    ) -> Result<PredictionRecord, StoreError> {
        let record = PredictionRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            user_story: user_story.to_string(),
            predicted_points,
            confidence,
            model: model.to_string(),
        };
        self.append(&self.history_path, PREDICTION_SCHEMA, &record)?;
        Ok(record)
    }

    /// Log a correction and return the feedback record's id.
    ///
    /// `prediction_id` is stored as given; it may name a cleared or unknown
    /// prediction.
    pub fn append_feedback(
        &self,
        prediction_id: &str,
        user_story: &str,
        actual_points: u32,
    ) -> Result<String, StoreError> {
        let record = FeedbackRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            prediction_id: prediction_id.to_string(),
            user_story: user_story.to_string(),
            actual_points,
        };
        self.append(&self.feedback_path, FEEDBACK_SCHEMA, &record)?;
        Ok(record.id)
    }

    fn append<T: Serialize>(&self, path: &Path, schema: LogSchema, record: &T) -> Result<(), StoreError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock();
        // The log may have been removed since open
        ensure_log(path, schema)?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .open(path)
            .map_err(unavailable(path))?;
        // A write cut short earlier leaves a line without its newline
        if ends_mid_line(&mut file).map_err(unavailable(path))? {
            warn!("Terminating a partial line at the end of {}", path.display());
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes()).map_err(unavailable(path))?;
        file.sync_data().map_err(unavailable(path))?;
        Ok(())
    }

    /// Up to `limit` predictions, newest first.
    ///
    /// Never fails: an unreadable log yields an empty list.
    pub fn recent_predictions(&self, limit: usize) -> Vec<PredictionRecord> {
        if limit == 0 {
            return Vec::new();
        }
        match read_records::<PredictionRecord>(&self.history_path) {
            Ok(records) => records.into_iter().rev().take(limit).collect(),
            Err(e) => {
                warn!("Error reading history: {}", e);
                Vec::new()
            }
        }
    }

    /// Drop every prediction, keeping the schema header.
    ///
    /// The feedback log is not touched.
    pub fn clear_predictions(&self) -> Result<(), StoreError> {
        let header = PREDICTION_SCHEMA.header_line()?;
        let tmp_path = self.history_path.with_extension("jsonl.tmp");

        let _guard = self.lock();
        std::fs::write(&tmp_path, header).map_err(unavailable(&tmp_path))?;
        std::fs::rename(&tmp_path, &self.history_path).map_err(unavailable(&self.history_path))?;
        Ok(())
    }

    /// All feedback in append order
    pub fn feedback_records(&self) -> Result<Vec<FeedbackRecord>, StoreError> {
        read_records(&self.feedback_path)
    }

    /// Summary of the feedback log
    pub fn feedback_stats(&self) -> Result<FeedbackStats, StoreError> {
        Ok(FeedbackStats::from_records(&self.feedback_records()?))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn history_path(&self) -> &Path {
        &self.history_path
    }

    pub fn feedback_path(&self) -> &Path {
        &self.feedback_path
    }
}

/// Write the header if the log is missing or empty
fn ensure_log(path: &Path, schema: LogSchema) -> Result<(), StoreError> {
    let needs_header = match std::fs::metadata(path) {
        Ok(meta) => meta.len() == 0,
        Err(e) if e.kind() == ErrorKind::NotFound => true,
        Err(e) => return Err(unavailable(path)(e)),
    };
    if needs_header {
        std::fs::write(path, schema.header_line()?).map_err(unavailable(path))?;
    }
    Ok(())
}

fn ends_mid_line(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Parse every record line, skipping the header and anything malformed
fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(unavailable(path)(e)),
    };

    let mut records = Vec::new();
    for (index, line) in content.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        if index == 0 && serde_json::from_slice::<SchemaHeader>(line).is_ok() {
            continue;
        }
        match serde_json::from_slice::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => debug!(
                "Skipping malformed line {} in {}: {}",
                index + 1,
                path.display(),
                e
            ),
        }
    }
    Ok(records)
}

/// Feedback log statistics
#[derive(Debug, Default)]
pub struct FeedbackStats {
    pub total: usize,
    /// actual points -> number of corrections
    pub by_points: BTreeMap<u32, usize>,
    /// Corrections whose prediction id appears more than once
    pub repeated_predictions: usize,
}

impl FeedbackStats {
    pub fn from_records(records: &[FeedbackRecord]) -> Self {
        let mut by_points = BTreeMap::new();
        let mut per_prediction: BTreeMap<&str, usize> = BTreeMap::new();
        for record in records {
            *by_points.entry(record.actual_points).or_insert(0) += 1;
            *per_prediction.entry(record.prediction_id.as_str()).or_insert(0) += 1;
        }
        let repeated_predictions = per_prediction.values().filter(|&&n| n > 1).sum();

        Self {
            total: records.len(),
            by_points,
            repeated_predictions,
        }
    }
}

impl std::fmt::Display for FeedbackStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Feedback Statistics:")?;
        writeln!(f, "  Total corrections: {}", self.total)?;
        if self.repeated_predictions > 0 {
            writeln!(
                f,
                "  Corrections sharing a prediction id: {}",
                self.repeated_predictions
            )?;
        }
        writeln!(f, "\n  By actual points:")?;
        for (points, count) in &self.by_points {
            writeln!(
                f,
                "    {:>2}: {} ({:.1}%)",
                points,
                count,
                *count as f64 / self.total as f64 * 100.0
            )?;
        }
        Ok(())
    }
}
