//! Priority allocator: greedy, cohort-ordered, no randomness.
//!
//! Each priority student walks their choices in ascending rank across all
//! tracks and takes every course that still has a seat in a track they have
//! not filled yet. Runs to completion before any regular demand is looked at.

use ea_core::entities::{PlacementRank, Student};

use crate::book::AssignmentBook;
use crate::capacity::CapacityTracker;
use crate::choices::SelectionIndex;
use crate::AllocError;

/// Returns the number of seats placed.
pub fn allocate_priority(
    cohort: &[&Student],
    choices: &SelectionIndex,
    tracker: &mut CapacityTracker,
    book: &mut AssignmentBook,
) -> Result<u32, AllocError> {
    let mut placed = 0u32;
    for student in cohort {
        for choice in choices.of(&student.id) {
            if book.has_track(&student.id, choice.track) || !tracker.has_room(&choice.course_id) {
                continue;
            }
            book.seat(
                tracker,
                &student.id,
                &choice.course_id,
                true,
                PlacementRank::Stated(choice.rank),
            )?;
            placed += 1;
        }
    }
    Ok(placed)
}
