//! Fallback allocator: fills tracks left empty after the priority pass and
//! all waves, from whatever seats remain.
//!
//! Priority students are served before regular ones. For each missing track
//! one course with room is picked uniformly at random; if none has room the
//! student stays unplaced in that track. No lottery record is written here.

use std::collections::BTreeSet;

use ea_core::entities::PlacementRank;
use ea_core::ids::{StudentId, TrackId};
use ea_core::rng::TieSource;
use tracing::{debug, warn};

use crate::book::AssignmentBook;
use crate::capacity::CapacityTracker;
use crate::tiers::Cohorts;
use crate::AllocError;

/// A (student, track) pair no course could absorb.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Unplaced {
    pub student_id: StudentId,
    pub track: TrackId,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FallbackSummary {
    pub placed: u32,
    pub unplaced: Vec<Unplaced>,
}

pub fn allocate_fallback<R: TieSource>(
    cohorts: &Cohorts<'_>,
    required: &BTreeSet<TrackId>,
    tracker: &mut CapacityTracker,
    book: &mut AssignmentBook,
    rng: &mut R,
) -> Result<FallbackSummary, AllocError> {
    let mut summary = FallbackSummary::default();

    for (student, is_priority) in cohorts.in_precedence_order() {
        for track in book.missing_tracks(&student.id, required) {
            let open = tracker.with_room_in_track(track);
            let Some(pick) = rng.choose_index(open.len()) else {
                warn!(student = %student.id, %track, "no course with free seats; left unplaced");
                summary.unplaced.push(Unplaced { student_id: student.id.clone(), track });
                continue;
            };
            let course = open[pick].clone();
            debug!(student = %student.id, %track, course = %course, options = open.len(), "fallback pick");
            book.seat(tracker, &student.id, &course, is_priority, PlacementRank::Fallback)?;
            summary.placed += 1;
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ea_core::entities::{Course, Student};
    use ea_core::ids::CourseId;
    use ea_core::rng::TieRng;

    fn sid(s: &str) -> StudentId { s.parse().unwrap() }
    fn cid(s: &str) -> CourseId { s.parse().unwrap() }
    fn course(id: &str, track: u16, capacity: u32) -> Course {
        Course { id: cid(id), name: id.into(), track: TrackId(track), capacity }
    }

    #[test]
    fn fills_every_missing_track_when_room_exists() {
        let courses = vec![course("C-A", 1, 1), course("C-B", 2, 1), course("C-C", 2, 1)];
        let mut tracker = CapacityTracker::new(&courses);
        let required = tracker.tracks();
        let s1 = Student { id: sid("s1"), level: Some(1), protected: false };
        let cohorts = Cohorts { priority: vec![], regular: vec![&s1] };
        let mut book = AssignmentBook::new();
        let mut rng = TieRng::from_seed_u64(11);

        let out = allocate_fallback(&cohorts, &required, &mut tracker, &mut book, &mut rng).unwrap();
        assert_eq!(out.placed, 2);
        assert!(out.unplaced.is_empty());
        assert!(book.assignments().iter().all(|a| a.rank == PlacementRank::Fallback && !a.is_priority));
    }

    #[test]
    fn priority_served_first_and_leftover_student_unplaced() {
        let courses = vec![course("C-A", 1, 1)];
        let mut tracker = CapacityTracker::new(&courses);
        let required = tracker.tracks();
        let p = Student { id: sid("p1"), level: Some(4), protected: false };
        let r = Student { id: sid("r1"), level: Some(1), protected: false };
        let cohorts = Cohorts { priority: vec![&p], regular: vec![&r] };
        let mut book = AssignmentBook::new();
        let mut rng = TieRng::from_seed_u64(0);

        let out = allocate_fallback(&cohorts, &required, &mut tracker, &mut book, &mut rng).unwrap();
        assert_eq!(out.placed, 1);
        assert_eq!(book.assignments()[0].student_id, sid("p1"));
        assert!(book.assignments()[0].is_priority);
        assert_eq!(out.unplaced, vec![Unplaced { student_id: sid("r1"), track: TrackId(1) }]);
    }
}
