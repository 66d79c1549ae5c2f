//! ea_report — pure report model over a finished run, plus renderers.
//!
//! - No I/O; callers pass `RunOutputs` already in memory (fresh or loaded from a store).
//! - Percent strings use one decimal without float math (`ea_core::rounding`).
//! - Section order and list order are stable: lotteries in draw order,
//!   courses by id, students by id.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::fmt;

use ea_core::entities::{Assignment, LotteryRecord, PlacementRank};
use ea_core::ids::{CourseId, StudentId};
use ea_core::rounding::format_tenths;
use ea_pipeline::stats::FALLBACK_BUCKET;
use ea_pipeline::RunOutputs;
use serde::Serialize;

#[cfg(feature = "render_html")]
mod render_html;
#[cfg(feature = "render_json")]
mod render_json;

#[cfg(feature = "render_html")]
pub use render_html::render_html;
#[cfg(feature = "render_json")]
pub use render_json::render_json;

/// Winners / losers shown per lottery before the list is cut.
pub const LOTTERY_NAME_CAP: usize = 10;
/// Students listed in the per-student sample by default.
pub const DEFAULT_STUDENT_SAMPLE: usize = 10;

// ===== Errors =====

#[derive(Debug)]
pub enum ReportError {
    Template(String),
    Serialize(String),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Template(m) => write!(f, "template error: {m}"),
            ReportError::Serialize(m) => write!(f, "serialize error: {m}"),
        }
    }
}

impl std::error::Error for ReportError {}

// ===== Model =====

#[derive(Clone, Debug, Serialize)]
pub struct ReportModel {
    pub cover: SectionCover,
    pub overview: SectionOverview,
    pub lottery_stats: SectionLotteryStats,
    pub lotteries: Vec<LotteryView>,
    pub utilization: Vec<CourseRow>,
    pub rank_distribution: Vec<RankBucket>,
    pub student_sample: Vec<StudentRow>,
    pub integrity: SectionIntegrity,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionCover {
    pub title: String,
    pub run_id: String,
    pub timestamp_utc: String,
    pub engine: String,
    pub tie_seed: u64,
    pub seed_source: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionOverview {
    pub total_students: u32,
    pub considered_students: u32,
    pub priority_students: u32,
    pub regular_students: u32,
    pub required_tracks: Vec<String>,
    pub total_assignments: u32,
    pub priority_assignments: u32,
    pub regular_assignments: u32,
    pub fallback_assignments: u32,
    pub fully_assigned: u32,
    pub partially_assigned: u32,
    pub unassigned: u32,
    pub priority_fully_assigned: u32,
    pub regular_fully_assigned: u32,
    pub unplaced_slots: u32,
    pub overall_utilization: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionLotteryStats {
    pub lotteries: u32,
    pub candidates: u64,
    pub winners: u64,
    pub losers: u64,
    pub success_rate: String,
    /// Courses that needed at least one draw, by id.
    pub per_course: Vec<CourseLotteries>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CourseLotteries {
    pub course_id: String,
    pub course_name: String,
    pub lotteries: u32,
    pub candidates: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct LotteryView {
    pub sequence: u32,
    pub course_id: String,
    pub course_name: String,
    pub track: String,
    pub wave: u32,
    pub candidates: u32,
    pub seats: u32,
    pub executed_utc: String,
    pub winners: Vec<String>,
    /// Winners beyond `LOTTERY_NAME_CAP`.
    pub winners_more: u32,
    pub losers: Vec<String>,
    pub losers_more: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct CourseRow {
    pub course_id: String,
    pub name: String,
    pub track: String,
    pub capacity: u32,
    pub assigned: u32,
    pub utilization: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankBucket {
    /// "1", "2", ... or "fallback"
    pub rank: String,
    pub count: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct StudentRow {
    pub student_id: String,
    pub is_priority: bool,
    pub placements: Vec<PlacementView>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlacementView {
    pub track: String,
    pub course_id: String,
    pub course_name: String,
    pub rank: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SectionIntegrity {
    pub run_id: String,
    pub assignment_set_id: String,
    pub lottery_log_id: String,
    pub stats_sha256: String,
    pub students_sha256: String,
    pub courses_sha256: String,
    pub selections_sha256: String,
    pub params_sha256: String,
}

// ===== API =====

/// Build the report model. `student_sample` caps the per-student section
/// (first students by id among those holding at least one placement).
pub fn build_model(run: &RunOutputs, student_sample: usize) -> ReportModel {
    let rec = &run.run_record;
    let stats = &run.stats;
    let names: BTreeMap<&CourseId, &str> =
        stats.courses.iter().map(|c| (&c.course_id, c.name.as_str())).collect();
    let name_of = |id: &CourseId| names.get(id).map_or_else(|| id.to_string(), |n| (*n).to_string());

    let cover = SectionCover {
        title: "Elective Allocation Report".to_string(),
        run_id: rec.id.to_string(),
        timestamp_utc: rec.timestamp_utc.clone(),
        engine: format!("{}/{} v{} ({})", rec.engine.vendor, rec.engine.name, rec.engine.version, rec.engine.build),
        tie_seed: rec.tie_seed,
        seed_source: format!("{:?}", rec.seed_source).to_lowercase(),
    };

    let overview = SectionOverview {
        total_students: stats.total_students,
        considered_students: stats.considered_students,
        priority_students: stats.priority_students,
        regular_students: stats.regular_students,
        required_tracks: stats.required_tracks.iter().map(|t| t.to_string()).collect(),
        total_assignments: stats.total_assignments,
        priority_assignments: stats.priority_assignments,
        regular_assignments: stats.regular_assignments,
        fallback_assignments: stats.fallback_assignments,
        fully_assigned: stats.fully_assigned,
        partially_assigned: stats.partially_assigned,
        unassigned: stats.unassigned,
        priority_fully_assigned: stats.priority_fully_assigned,
        regular_fully_assigned: stats.regular_fully_assigned,
        unplaced_slots: stats.unplaced.len() as u32,
        overall_utilization: pct(stats.overall_utilization_tenths),
    };

    let mut per_course: BTreeMap<&CourseId, CourseLotteries> = BTreeMap::new();
    for r in &run.lottery_log {
        let e = per_course.entry(&r.course_id).or_insert_with(|| CourseLotteries {
            course_id: r.course_id.to_string(),
            course_name: r.course_name.clone(),
            lotteries: 0,
            candidates: 0,
        });
        e.lotteries += 1;
        e.candidates += u64::from(r.candidates);
    }
    let lottery_stats = SectionLotteryStats {
        lotteries: stats.lotteries.count,
        candidates: stats.lotteries.candidates,
        winners: stats.lotteries.winners,
        losers: stats.lotteries.losers,
        success_rate: pct(stats.lotteries.success_tenths),
        per_course: per_course.into_values().collect(),
    };

    let utilization = stats
        .courses
        .iter()
        .map(|c| CourseRow {
            course_id: c.course_id.to_string(),
            name: c.name.clone(),
            track: c.track.to_string(),
            capacity: c.capacity,
            assigned: c.assigned,
            utilization: pct(c.utilization_tenths),
        })
        .collect();

    let integrity = SectionIntegrity {
        run_id: rec.id.to_string(),
        assignment_set_id: rec.outputs.assignment_set_id.to_string(),
        lottery_log_id: rec.outputs.lottery_log_id.to_string(),
        stats_sha256: rec.outputs.stats_sha256.clone(),
        students_sha256: rec.inputs.students_sha256.clone(),
        courses_sha256: rec.inputs.courses_sha256.clone(),
        selections_sha256: rec.inputs.selections_sha256.clone(),
        params_sha256: rec.inputs.params_sha256.clone(),
    };

    ReportModel {
        cover,
        overview,
        lottery_stats,
        lotteries: run.lottery_log.iter().map(lottery_view).collect(),
        utilization,
        rank_distribution: rank_buckets(&stats.rank_distribution),
        student_sample: student_rows(&run.assignments, student_sample, &name_of),
        integrity,
    }
}

// ===== Helpers =====

fn pct(tenths: Option<u32>) -> String {
    tenths.map_or_else(|| "n/a".to_string(), format_tenths)
}

fn capped<'a>(ids: impl Iterator<Item = &'a StudentId>) -> (Vec<String>, u32) {
    let all: Vec<&StudentId> = ids.collect();
    let more = all.len().saturating_sub(LOTTERY_NAME_CAP) as u32;
    (all.into_iter().take(LOTTERY_NAME_CAP).map(|s| s.to_string()).collect(), more)
}

fn lottery_view(r: &LotteryRecord) -> LotteryView {
    let (winners, winners_more) = capped(r.winners());
    let (losers, losers_more) = capped(r.losers());
    LotteryView {
        sequence: r.sequence,
        course_id: r.course_id.to_string(),
        course_name: r.course_name.clone(),
        track: r.track.to_string(),
        wave: r.wave,
        candidates: r.candidates,
        seats: r.seats,
        executed_utc: r.executed_utc.clone(),
        winners,
        winners_more,
        losers,
        losers_more,
    }
}

/// Numeric ranks ascending, then the fallback bucket.
fn rank_buckets(dist: &BTreeMap<String, u32>) -> Vec<RankBucket> {
    let mut stated: Vec<(u32, u32)> = dist
        .iter()
        .filter_map(|(k, &n)| k.parse::<u32>().ok().map(|r| (r, n)))
        .collect();
    stated.sort_unstable();
    let mut out: Vec<RankBucket> =
        stated.into_iter().map(|(r, n)| RankBucket { rank: r.to_string(), count: n }).collect();
    if let Some(&n) = dist.get(FALLBACK_BUCKET) {
        out.push(RankBucket { rank: FALLBACK_BUCKET.to_string(), count: n });
    }
    out
}

/// Assignments arrive in canonical (student, track, course) order.
fn student_rows(assignments: &[Assignment], limit: usize, name_of: &dyn Fn(&CourseId) -> String) -> Vec<StudentRow> {
    let mut rows: Vec<StudentRow> = Vec::new();
    for a in assignments {
        let fresh = rows.last().map_or(true, |r| r.student_id != a.student_id.as_str());
        if fresh {
            if rows.len() == limit {
                break;
            }
            rows.push(StudentRow { student_id: a.student_id.to_string(), is_priority: a.is_priority, placements: vec![] });
        }
        if let Some(row) = rows.last_mut() {
            row.placements.push(PlacementView {
                track: a.track.to_string(),
                course_id: a.course_id.to_string(),
                course_name: name_of(&a.course_id),
                rank: match a.rank {
                    PlacementRank::Stated(r) => r.to_string(),
                    PlacementRank::Fallback => FALLBACK_BUCKET.to_string(),
                },
            });
        }
    }
    rows
}
