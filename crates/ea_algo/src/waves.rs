//! Preference-wave allocator for the regular cohort.
//!
//! Wave `r` gathers, per course, the regular students who ranked it `r` and
//! still lack a seat in its track. A group that fits is seated whole; an
//! oversubscribed group goes through a tie-break draw whose record is written
//! to the auditor before any winner is seated. Waves run in ascending rank.

use std::collections::BTreeMap;

use ea_core::entities::{Course, PlacementRank, Student};
use ea_core::ids::{CourseId, StudentId};
use ea_core::rng::TieSource;
use tracing::debug;

use crate::audit::{Draw, LotteryAuditor};
use crate::book::AssignmentBook;
use crate::capacity::CapacityTracker;
use crate::choices::SelectionIndex;
use crate::AllocError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WaveSummary {
    pub waves: u32,
    /// Seats placed without a draw.
    pub direct: u32,
    /// Seats placed as lottery winners.
    pub drawn: u32,
    /// (course, wave) groups skipped because the course was already full.
    pub skipped_full: u32,
}

/// Shared state a wave pass mutates.
pub struct WaveCtx<'r, R: TieSource> {
    pub tracker: &'r mut CapacityTracker,
    pub book: &'r mut AssignmentBook,
    pub auditor: &'r mut LotteryAuditor,
    pub rng: &'r mut R,
    pub executed_utc: &'r str,
}

pub fn run_waves<R: TieSource>(
    cohort: &[&Student],
    choices: &SelectionIndex,
    catalog: &BTreeMap<CourseId, &Course>,
    ctx: WaveCtx<'_, R>,
) -> Result<WaveSummary, AllocError> {
    let WaveCtx { tracker, book, auditor, rng, executed_utc } = ctx;
    let max_rank = choices.max_rank(cohort.iter().map(|s| &s.id));
    let mut summary = WaveSummary::default();

    for wave in 1..=max_rank {
        summary.waves += 1;
        let groups = group_for_wave(wave, cohort, choices, book);

        for (course_id, mut group) in groups {
            let available = tracker
                .available(&course_id)
                .ok_or_else(|| AllocError::UnknownCourse(course_id.clone()))?;
            if available == 0 {
                summary.skipped_full += 1;
                debug!(course = %course_id, wave, demand = group.len(), "course full, group skipped");
                continue;
            }

            if (available as usize) >= group.len() {
                for student in &group {
                    book.seat(tracker, student, &course_id, false, PlacementRank::Stated(wave))?;
                }
                summary.direct += group.len() as u32;
                continue;
            }

            rng.shuffle(&mut group);
            let course = catalog
                .get(&course_id)
                .ok_or_else(|| AllocError::UnknownCourse(course_id.clone()))?;
            let rec = auditor.record(
                Draw {
                    course_id: &course_id,
                    course_name: &course.name,
                    track: course.track,
                    wave,
                    seats: available,
                    permutation: &group,
                },
                executed_utc,
            );
            debug!(
                course = %course_id,
                wave,
                candidates = rec.candidates,
                seats = rec.seats,
                sequence = rec.sequence,
                "lottery drawn"
            );
            for student in &group[..available as usize] {
                book.seat(tracker, student, &course_id, false, PlacementRank::Stated(wave))?;
            }
            summary.drawn += available;
        }
    }
    Ok(summary)
}

/// Demand per course for one wave, in cohort order within each group.
fn group_for_wave(
    wave: u32,
    cohort: &[&Student],
    choices: &SelectionIndex,
    book: &AssignmentBook,
) -> BTreeMap<CourseId, Vec<StudentId>> {
    let mut groups: BTreeMap<CourseId, Vec<StudentId>> = BTreeMap::new();
    for student in cohort {
        for choice in choices.of(&student.id).iter().filter(|c| c.rank == wave) {
            if !book.has_track(&student.id, choice.track) {
                groups.entry(choice.course_id.clone()).or_default().push(student.id.clone());
            }
        }
    }
    groups
}
