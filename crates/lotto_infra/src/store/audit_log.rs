//! Append-only JSONL audit log of exported batch payloads.
//!
//! One line per `AuditRecord`. Opening an existing file replays it and
//! rebuilds the record-id index; a malformed line fails the open with its
//! 1-based line number. Blank lines are skipped.
//!
//! Record ids are the xxhash64 of the payload's JSON, so exporting the same
//! payload twice is rejected as a duplicate.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use lotto_core::batch::StrategyPayload;
use lotto_core::seed::{format_seed_hash, seed_to_u64};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// xxhash64 of the payload JSON (hex string).
    pub record_id: String,
    /// Request seed, duplicated from the payload config for grepping.
    pub seed: String,
    pub payload: StrategyPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditLogError {
    #[error("audit log io failed: {reason}")]
    Io { reason: String },

    #[error("audit log line {line} malformed: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("audit record already exists: {record_id}")]
    DuplicateRecord { record_id: String },

    #[error("audit record serialization failed: {reason}")]
    Serialize { reason: String },
}

impl From<io::Error> for AuditLogError {
    fn from(e: io::Error) -> Self {
        Self::Io {
            reason: e.to_string(),
        }
    }
}

// --- Metrics ------------------------------------------------------------

#[derive(Debug, Default)]
pub struct AuditLogMetrics {
    appends_total: u64,
    write_errors: u64,
    duplicate_rejects: u64,
}

impl AuditLogMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn appends_total(&self) -> u64 {
        self.appends_total
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    pub fn duplicate_rejects(&self) -> u64 {
        self.duplicate_rejects
    }
}

// --- Audit log ----------------------------------------------------------

#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    record_ids: HashSet<String>,
}

impl AuditLog {
    /// Open (or lazily create) the log at `path`, replaying existing lines.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditLogError> {
        let path = path.as_ref().to_path_buf();
        let record_ids = read_records(&path)?
            .into_iter()
            .map(|r| r.record_id)
            .collect::<HashSet<_>>();
        tracing::info!(path = %path.display(), records = record_ids.len(), "audit log opened");
        Ok(Self { path, record_ids })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.record_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.record_ids.is_empty()
    }

    pub fn contains(&self, record_id: &str) -> bool {
        self.record_ids.contains(record_id)
    }

    /// Append one payload. The line is written before the index is updated.
    pub fn append(
        &mut self,
        payload: &StrategyPayload,
        metrics: &mut AuditLogMetrics,
    ) -> Result<AuditRecord, AuditLogError> {
        let payload_json = serde_json::to_string(payload).map_err(|e| {
            metrics.write_errors += 1;
            AuditLogError::Serialize {
                reason: e.to_string(),
            }
        })?;
        let record_id = format_seed_hash(seed_to_u64(&payload_json));
        if self.record_ids.contains(&record_id) {
            metrics.duplicate_rejects += 1;
            return Err(AuditLogError::DuplicateRecord { record_id });
        }

        let record = AuditRecord {
            record_id,
            seed: payload.config.seed.clone(),
            payload: payload.clone(),
        };
        write_record(&self.path, &record).inspect_err(|e| {
            metrics.write_errors += 1;
            tracing::warn!(error = %e, path = %self.path.display(), "audit append failed");
        })?;

        self.record_ids.insert(record.record_id.clone());
        metrics.appends_total += 1;
        Ok(record)
    }

    /// Read every record back, in append order.
    pub fn replay(&self) -> Result<Vec<AuditRecord>, AuditLogError> {
        read_records(&self.path)
    }
}

fn write_record(path: &Path, record: &AuditRecord) -> Result<(), AuditLogError> {
    let line = serde_json::to_string(record).map_err(|e| AuditLogError::Serialize {
        reason: e.to_string(),
    })?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.write_all(b"\n")?;
    file.flush()?;
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<AuditRecord>, AuditLogError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: AuditRecord =
            serde_json::from_str(&line).map_err(|e| AuditLogError::Malformed {
                line: idx + 1,
                reason: e.to_string(),
            })?;
        records.push(record);
    }
    Ok(records)
}
