//! Result stores: where a finished run's outputs are committed.
//!
//! A commit replaces the current assignment set as a whole and appends the
//! run's lottery log to history. Either all of it becomes visible or none.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ea_core::entities::{Assignment, LotteryRecord};
use ea_core::ids::RunId;
use ea_io::canonical_json::write_canonical;
use ea_io::loader::load_json;
use ea_io::IoError;
use thiserror::Error;
use tracing::{debug, info};

use crate::build_run_record::RunRecordDoc;
use crate::stats::RunStats;
use crate::RunOutputs;

pub const ASSIGNMENTS_FILE: &str = "assignments.json";
pub const LATEST_RUN_FILE: &str = "latest_run.json";
pub const LOTTERY_LOG_FILE: &str = "lottery_log.json";
pub const RUN_RECORD_FILE: &str = "run_record.json";
pub const STATS_FILE: &str = "stats.json";
pub const RUNS_DIR: &str = "runs";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("write failed: {0}")]
    Write(String),
    #[error("read failed: {0}")]
    Read(String),
    #[error("stored run is inconsistent: {0}")]
    Corrupt(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub trait ResultStore {
    /// Atomically replace the current assignments with `outputs.assignments`
    /// and record the run's lottery log, statistics and run record.
    fn commit(&mut self, outputs: &RunOutputs) -> Result<(), StoreError>;
}

// ------------------------------------------------------------------------------------------------
// In-memory
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryStore {
    current: Vec<Assignment>,
    latest: Option<RunRecordDoc>,
    history: BTreeMap<RunId, Vec<LotteryRecord>>,
    fail_next: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit` fail with `StoreError::Unavailable(reason)`.
    pub fn arm_failure(&mut self, reason: impl Into<String>) {
        self.fail_next = Some(reason.into());
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.current
    }

    pub fn latest_run(&self) -> Option<&RunRecordDoc> {
        self.latest.as_ref()
    }

    pub fn lottery_history(&self) -> &BTreeMap<RunId, Vec<LotteryRecord>> {
        &self.history
    }
}

impl ResultStore for MemoryStore {
    fn commit(&mut self, outputs: &RunOutputs) -> Result<(), StoreError> {
        if let Some(reason) = self.fail_next.take() {
            return Err(StoreError::Unavailable(reason));
        }
        self.history
            .insert(outputs.run_record.id.clone(), outputs.lottery_log.clone());
        self.current = outputs.assignments.clone();
        self.latest = Some(outputs.run_record.clone());
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// JSON directory
// ------------------------------------------------------------------------------------------------

/// Layout under `root`:
///
/// ```text
/// runs/<run-hex>/{assignments,lottery_log,stats,run_record}.json   (one dir per run)
/// latest_run.json                                                  (commit point)
/// ```
///
/// Per-run files are written first; replacing `latest_run.json` by atomic
/// rename is the only step that changes what readers see. The current
/// assignment set is the one in the run dir `latest_run.json` points at.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn run_dir(&self, id: &RunId) -> PathBuf {
        self.root.join(RUNS_DIR).join(id.as_hex())
    }

    /// Outputs of the run `latest_run.json` points at; `None` before the first commit.
    pub fn load_latest(&self) -> Result<Option<RunOutputs>, StoreError> {
        let latest = self.root.join(LATEST_RUN_FILE);
        if !latest.exists() {
            return Ok(None);
        }
        let run_record: RunRecordDoc = load_json(&latest).map_err(read_err)?;
        let dir = self.run_dir(&run_record.id);
        let stored: RunRecordDoc = load_json(&dir.join(RUN_RECORD_FILE)).map_err(read_err)?;
        if stored != run_record {
            return Err(StoreError::Corrupt(format!(
                "{} differs from {}",
                latest.display(),
                dir.join(RUN_RECORD_FILE).display()
            )));
        }
        let assignments: Vec<Assignment> = load_json(&dir.join(ASSIGNMENTS_FILE)).map_err(read_err)?;
        let lottery_log: Vec<LotteryRecord> = load_json(&dir.join(LOTTERY_LOG_FILE)).map_err(read_err)?;
        let stats: RunStats = load_json(&dir.join(STATS_FILE)).map_err(read_err)?;
        Ok(Some(RunOutputs { run_record, assignments, lottery_log, stats }))
    }

    /// Current assignment set, resolved through `latest_run.json`; empty
    /// before the first commit.
    pub fn load_current_assignments(&self) -> Result<Vec<Assignment>, StoreError> {
        Ok(self.load_latest()?.map(|o| o.assignments).unwrap_or_default())
    }
}

impl ResultStore for JsonDirStore {
    fn commit(&mut self, outputs: &RunOutputs) -> Result<(), StoreError> {
        let dir = self.run_dir(&outputs.run_record.id);
        write(&dir.join(ASSIGNMENTS_FILE), &outputs.assignments)?;
        write(&dir.join(LOTTERY_LOG_FILE), &outputs.lottery_log)?;
        write(&dir.join(STATS_FILE), &outputs.stats)?;
        write(&dir.join(RUN_RECORD_FILE), &outputs.run_record)?;
        debug!(dir = %dir.display(), "run artifacts written");

        write(&self.root.join(LATEST_RUN_FILE), &outputs.run_record)?;
        info!(run = %outputs.run_record.id, root = %self.root.display(), "results committed");
        Ok(())
    }
}

fn write<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    write_canonical(path, value).map_err(|e| StoreError::Write(e.to_string()))
}

fn read_err(e: IoError) -> StoreError {
    StoreError::Read(e.to_string())
}
