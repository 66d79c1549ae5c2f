//! ea_pipeline — one allocation run end to end:
//! validate → classify → priority → waves → fallback → stats → run record → commit.
//!
//! Allocation itself is pure (`ea_algo::allocate`); this crate only wires
//! loaded inputs to it, derives statistics and ids, and hands the finished
//! outputs to a `ResultStore`. Nothing is stored unless the whole run succeeded.

use ea_algo::{AllocError, AuditSummary};
use ea_core::entities::{Assignment, LotteryRecord};
use ea_core::rng::TieRng;
use ea_io::hasher;
use ea_io::loader::LoadedContext;
use ea_io::IoError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

pub mod build_run_record;
pub mod stats;
pub mod store;
pub mod validate;

pub use build_run_record::{build_run_record, verify_run_id, RecordInputs, RunRecordDoc, SeedSource};
pub use stats::{compute_stats, RunStats};
pub use store::{JsonDirStore, MemoryStore, ResultStore, StoreError};
pub use validate::{validate, Severity, ValidationIssue, ValidationReport};

/// Engine identifiers, recorded verbatim in every run record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMeta {
    pub vendor: String,
    pub name: String,
    pub version: String,
    pub build: String,
}

impl EngineMeta {
    /// Values baked in at build time (`EA_ENGINE_VENDOR`, `EA_ENGINE_NAME`,
    /// `EA_ENGINE_BUILD`), falling back to the crate metadata.
    pub fn from_build_env() -> Self {
        Self {
            vendor: option_env!("EA_ENGINE_VENDOR").unwrap_or("ea").to_string(),
            name: option_env!("EA_ENGINE_NAME").unwrap_or("elective-allocation").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            build: option_env!("EA_ENGINE_BUILD").unwrap_or("dev").to_string(),
        }
    }
}

/// Loaded inputs plus run-scoped settings.
#[derive(Debug, Clone)]
pub struct PipelineCtx {
    pub inputs: LoadedContext,
    pub engine_meta: EngineMeta,
    /// RFC3339 UTC; stamps the run id and every lottery record of the run.
    pub executed_utc: String,
}

/// Everything a committed run consists of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutputs {
    pub run_record: RunRecordDoc,
    /// Canonical order: `(student, track, course)`.
    pub assignments: Vec<Assignment>,
    pub lottery_log: Vec<LotteryRecord>,
    pub stats: RunStats,
}

/// Single error surface for a run. Unplaced students are not errors; they
/// show up in `RunStats`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no selections submitted; nothing to allocate")]
    InputEmpty,
    #[error("malformed input: {0}")]
    MalformedRecord(String),
    #[error("manifest: {0}")]
    Manifest(String),
    #[error("results could not be stored: {0}")]
    PersistenceFailure(String),
    #[error("audit failed: {0}")]
    Audit(String),
    #[error("io: {0}")]
    Io(String),
    #[error("allocation failed: {0}")]
    Allocate(String),
    #[error("build: {0}")]
    Build(String),
}

impl From<IoError> for PipelineError {
    fn from(e: IoError) -> Self {
        use PipelineError::*;
        match e {
            IoError::Record { .. } | IoError::Json { .. } | IoError::Invalid(_) => MalformedRecord(e.to_string()),
            IoError::Manifest(m) => Manifest(m),
            IoError::Path(m) => Io(m),
            IoError::Hash(m) => Build(format!("hash: {m}")),
        }
    }
}

impl From<AllocError> for PipelineError {
    fn from(e: AllocError) -> Self {
        match e {
            AllocError::MissingLevel(_) | AllocError::UnknownCourse(_) => PipelineError::MalformedRecord(e.to_string()),
            AllocError::CapacityExceeded(_) | AllocError::TrackAlreadyFilled { .. } => {
                PipelineError::Allocate(e.to_string())
            }
        }
    }
}

/// A store whose pointer disagrees with its own run is an audit failure;
/// everything else is a persistence failure.
impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Corrupt(_) => PipelineError::Audit(e.to_string()),
            _ => PipelineError::PersistenceFailure(e.to_string()),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Orchestration
// ------------------------------------------------------------------------------------------------

/// Validation only; no RNG, no allocation.
pub fn validate_ctx(ctx: &PipelineCtx) -> ValidationReport {
    let i = &ctx.inputs;
    validate(&i.students, &i.courses, &i.selections, &i.params)
}

/// Run the engine over `ctx` and return the outputs without storing them.
pub fn run_with_ctx(ctx: &PipelineCtx) -> Result<RunOutputs, PipelineError> {
    let inputs = &ctx.inputs;
    if inputs.selections.is_empty() {
        return Err(PipelineError::InputEmpty);
    }

    let report = validate_ctx(ctx);
    for w in report.warnings() {
        warn!(code = w.code, "{}", w.message);
    }
    if let Some(first) = report.errors().next() {
        let n = report.errors().count();
        return Err(PipelineError::MalformedRecord(format!(
            "{}: {} ({n} error(s) total)",
            first.code, first.message
        )));
    }

    let (mut rng, seed_source) = match inputs.params.tie_seed {
        Some(seed) => (TieRng::from_seed_u64(seed), SeedSource::Fixed),
        None => (TieRng::from_entropy(), SeedSource::Entropy),
    };
    let tie_seed = rng.seed();
    info!(seed = tie_seed, source = ?seed_source, "tie seed");

    let outcome = ea_algo::allocate(
        &inputs.students,
        &inputs.courses,
        &inputs.selections,
        &inputs.params,
        &mut rng,
        &ctx.executed_utc,
    )?;
    let stats = compute_stats(inputs.students.len(), &inputs.courses, &outcome);

    // Effective params may differ from the file (CLI overrides).
    let mut digests = inputs.digests.clone();
    digests.params = hasher::sha256_canonical(&inputs.params)?;

    let run_record = build_run_record(&RecordInputs {
        executed_utc: &ctx.executed_utc,
        engine: &ctx.engine_meta,
        digests: &digests,
        params: &inputs.params,
        tie_seed,
        seed_source,
        assignments: &outcome.assignments,
        lottery_log: &outcome.lottery_log,
        stats: &stats,
    })?;
    info!(
        run = %run_record.id,
        assignments = stats.total_assignments,
        lotteries = stats.lotteries.count,
        unassigned = stats.unassigned,
        "run complete"
    );

    Ok(RunOutputs {
        run_record,
        assignments: outcome.assignments,
        lottery_log: outcome.lottery_log,
        stats,
    })
}

/// Run, then commit. On a store failure the outputs are dropped and the
/// store keeps its previous state.
pub fn run_and_commit(ctx: &PipelineCtx, store: &mut dyn ResultStore) -> Result<RunOutputs, PipelineError> {
    let outputs = run_with_ctx(ctx)?;
    store.commit(&outputs)?;
    Ok(outputs)
}

/// Re-check stored outputs: ids against content, then the lottery log
/// against the assignments.
pub fn audit_outputs(outputs: &RunOutputs) -> Result<AuditSummary, PipelineError> {
    let rec = &outputs.run_record;
    if !verify_run_id(rec)? {
        return Err(PipelineError::Audit(format!("run id {} does not match the record", rec.id)));
    }
    if hasher::assignment_set_id(&outputs.assignments)? != rec.outputs.assignment_set_id {
        return Err(PipelineError::Audit("assignment set does not match the run record".into()));
    }
    if hasher::lottery_log_id(&outputs.lottery_log)? != rec.outputs.lottery_log_id {
        return Err(PipelineError::Audit("lottery log does not match the run record".into()));
    }
    if hasher::sha256_canonical(&outputs.stats)? != rec.outputs.stats_sha256 {
        return Err(PipelineError::Audit("statistics do not match the run record".into()));
    }
    ea_algo::verify_lottery_log(&outputs.lottery_log, &outputs.assignments)
        .map_err(|e| PipelineError::Audit(e.to_string()))
}
