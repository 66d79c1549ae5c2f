//! Pure allocation entry point: records and a draw source in, assignments,
//! lottery log and final seat counts out. Nothing here touches storage.

use std::collections::{BTreeMap, BTreeSet};

use ea_core::determinism::sort_canonical;
use ea_core::entities::{Assignment, Course, LotteryRecord, Selection, Student};
use ea_core::ids::{CourseId, StudentId, TrackId};
use ea_core::rng::TieSource;
use ea_core::variables::EngineParams;
use tracing::info;

use crate::audit::LotteryAuditor;
use crate::book::AssignmentBook;
use crate::capacity::CapacityTracker;
use crate::choices::SelectionIndex;
use crate::fallback::{allocate_fallback, FallbackSummary};
use crate::priority::allocate_priority;
use crate::tiers::classify;
use crate::waves::{run_waves, WaveCtx, WaveSummary};
use crate::AllocError;

#[derive(Clone, Debug)]
pub struct AllocationOutcome {
    /// Canonical order: `(student, track, course)`.
    pub assignments: Vec<Assignment>,
    /// Draw order: wave, then encounter order.
    pub lottery_log: Vec<LotteryRecord>,
    pub capacity: CapacityTracker,
    pub required_tracks: BTreeSet<TrackId>,
    /// Considered students by cohort, in input order.
    pub priority: Vec<StudentId>,
    pub regular: Vec<StudentId>,
    pub priority_placed: u32,
    pub waves: WaveSummary,
    pub fallback: FallbackSummary,
}

/// Run every stage once over a fresh capacity map.
///
/// Students without any selection are left out unless
/// `params.include_students_without_selections` is set.
pub fn allocate<R: TieSource>(
    students: &[Student],
    courses: &[Course],
    selections: &[Selection],
    params: &EngineParams,
    rng: &mut R,
    executed_utc: &str,
) -> Result<AllocationOutcome, AllocError> {
    let mut tracker = CapacityTracker::new(courses);
    let required: BTreeSet<TrackId> = match &params.required_tracks {
        Some(list) => list.iter().copied().collect(),
        None => tracker.tracks(),
    };
    let catalog: BTreeMap<CourseId, &Course> = courses.iter().map(|c| (c.id.clone(), c)).collect();
    let choices = SelectionIndex::build(selections, &tracker, &required)?;

    let selecting: BTreeSet<&StudentId> = selections.iter().map(|s| &s.student_id).collect();
    let considered = students
        .iter()
        .filter(|s| params.include_students_without_selections || selecting.contains(&s.id));
    let cohorts = classify(considered, params)?;
    info!(
        priority = cohorts.priority.len(),
        regular = cohorts.regular.len(),
        courses = tracker.len(),
        tracks = required.len(),
        "cohorts classified"
    );

    let mut book = AssignmentBook::new();
    let priority_placed = allocate_priority(&cohorts.priority, &choices, &mut tracker, &mut book)?;
    info!(placed = priority_placed, "priority allocation done");

    let mut auditor = LotteryAuditor::new();
    let waves = run_waves(
        &cohorts.regular,
        &choices,
        &catalog,
        WaveCtx {
            tracker: &mut tracker,
            book: &mut book,
            auditor: &mut auditor,
            rng: &mut *rng,
            executed_utc,
        },
    )?;
    info!(
        waves = waves.waves,
        direct = waves.direct,
        drawn = waves.drawn,
        lotteries = auditor.len(),
        "preference waves done"
    );

    let fallback = allocate_fallback(&cohorts, &required, &mut tracker, &mut book, rng)?;
    info!(placed = fallback.placed, unplaced = fallback.unplaced.len(), "fallback done");

    let mut assignments = book.into_assignments();
    sort_canonical(&mut assignments);

    Ok(AllocationOutcome {
        assignments,
        lottery_log: auditor.into_log(),
        capacity: tracker,
        required_tracks: required,
        priority: cohorts.priority.iter().map(|s| s.id.clone()).collect(),
        regular: cohorts.regular.iter().map(|s| s.id.clone()).collect(),
        priority_placed,
        waves,
        fallback,
    })
}
