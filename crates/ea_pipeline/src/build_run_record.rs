// crates/ea_pipeline/src/build_run_record.rs
//
// Assemble the run record: engine meta, input digests, effective params,
// tie seed and its source, output ids and a short statistics summary.
//
// The record is first built without its id; the id is then
// RUN:<timestamp>-<sha256(canonical record without id)>.

use ea_core::entities::{Assignment, LotteryRecord};
use ea_core::ids::{AssignmentSetId, LotteryLogId, RunId};
use ea_core::variables::EngineParams;
use ea_io::hasher;
use ea_io::loader::InputSha256;
use serde::{Deserialize, Serialize};

use crate::stats::RunStats;
use crate::{EngineMeta, PipelineError};

/// Where the tie seed came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    /// `tie_seed` in params or `--seed`.
    Fixed,
    /// Drawn from OS entropy at run start.
    Entropy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecordDoc {
    pub id: RunId,
    pub timestamp_utc: String,
    pub engine: EngineMeta,
    pub inputs: InputDigestsDoc,
    pub params: EngineParams,
    pub tie_seed: u64,
    pub seed_source: SeedSource,
    pub outputs: OutputsDoc,
    pub summary: SummaryDoc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDigestsDoc {
    pub students_sha256: String,
    pub courses_sha256: String,
    pub selections_sha256: String,
    pub params_sha256: String,
}

impl From<&InputSha256> for InputDigestsDoc {
    fn from(d: &InputSha256) -> Self {
        Self {
            students_sha256: d.students.clone(),
            courses_sha256: d.courses.clone(),
            selections_sha256: d.selections.clone(),
            params_sha256: d.params.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputsDoc {
    pub assignment_set_id: AssignmentSetId,
    pub assignment_count: u32,
    pub lottery_log_id: LotteryLogId,
    pub lottery_count: u32,
    pub stats_sha256: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryDoc {
    pub students: u32,
    pub priority: u32,
    pub regular: u32,
    pub assignments: u32,
    pub lotteries: u32,
    pub fully_assigned: u32,
    pub partially_assigned: u32,
    pub unassigned: u32,
}

impl From<&RunStats> for SummaryDoc {
    fn from(s: &RunStats) -> Self {
        Self {
            students: s.considered_students,
            priority: s.priority_students,
            regular: s.regular_students,
            assignments: s.total_assignments,
            lotteries: s.lotteries.count,
            fully_assigned: s.fully_assigned,
            partially_assigned: s.partially_assigned,
            unassigned: s.unassigned,
        }
    }
}

/// Borrowed view of everything the record is derived from.
pub struct RecordInputs<'a> {
    pub executed_utc: &'a str,
    pub engine: &'a EngineMeta,
    pub digests: &'a InputSha256,
    pub params: &'a EngineParams,
    pub tie_seed: u64,
    pub seed_source: SeedSource,
    pub assignments: &'a [Assignment],
    pub lottery_log: &'a [LotteryRecord],
    pub stats: &'a RunStats,
}

/// Mirror of `RunRecordDoc` without `id`; this is what the id hashes.
#[derive(Serialize)]
struct RunRecordNoId<'a> {
    timestamp_utc: &'a str,
    engine: &'a EngineMeta,
    inputs: &'a InputDigestsDoc,
    params: &'a EngineParams,
    tie_seed: u64,
    seed_source: SeedSource,
    outputs: &'a OutputsDoc,
    summary: &'a SummaryDoc,
}

pub fn build_run_record(inp: &RecordInputs<'_>) -> Result<RunRecordDoc, PipelineError> {
    let timestamp_utc = hasher::normalize_rfc3339_utc_seconds(inp.executed_utc)?;

    let outputs = OutputsDoc {
        assignment_set_id: hasher::assignment_set_id(inp.assignments)?,
        assignment_count: inp.assignments.len() as u32,
        lottery_log_id: hasher::lottery_log_id(inp.lottery_log)?,
        lottery_count: inp.lottery_log.len() as u32,
        stats_sha256: hasher::sha256_canonical(inp.stats)?,
    };
    let inputs = InputDigestsDoc::from(inp.digests);
    let summary = SummaryDoc::from(inp.stats);

    let no_id = RunRecordNoId {
        timestamp_utc: &timestamp_utc,
        engine: inp.engine,
        inputs: &inputs,
        params: inp.params,
        tie_seed: inp.tie_seed,
        seed_source: inp.seed_source,
        outputs: &outputs,
        summary: &summary,
    };
    let id = hasher::run_id_from_canonical(&timestamp_utc, &no_id)?;

    Ok(RunRecordDoc {
        id,
        timestamp_utc,
        engine: inp.engine.clone(),
        inputs,
        params: inp.params.clone(),
        tie_seed: inp.tie_seed,
        seed_source: inp.seed_source,
        outputs,
        summary,
    })
}

/// Recompute the id of a stored record; `false` means it was altered.
pub fn verify_run_id(doc: &RunRecordDoc) -> Result<bool, PipelineError> {
    let no_id = RunRecordNoId {
        timestamp_utc: &doc.timestamp_utc,
        engine: &doc.engine,
        inputs: &doc.inputs,
        params: &doc.params,
        tie_seed: doc.tie_seed,
        seed_source: doc.seed_source,
        outputs: &doc.outputs,
        summary: &doc.summary,
    };
    Ok(hasher::run_id_from_canonical(&doc.timestamp_utc, &no_id)? == doc.id)
}
