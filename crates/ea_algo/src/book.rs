//! Assignments made so far in a run, with a per-student index of filled tracks.

use std::collections::{BTreeMap, BTreeSet};

use ea_core::entities::{Assignment, PlacementRank};
use ea_core::ids::{CourseId, StudentId, TrackId};

use crate::capacity::CapacityTracker;
use crate::AllocError;

#[derive(Clone, Debug, Default)]
pub struct AssignmentBook {
    assignments: Vec<Assignment>,
    filled: BTreeMap<StudentId, BTreeSet<TrackId>>,
}

impl AssignmentBook {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn has_track(&self, student: &StudentId, track: TrackId) -> bool {
        self.filled.get(student).map_or(false, |t| t.contains(&track))
    }

    /// Tracks in `required` the student does not hold yet, ascending.
    pub fn missing_tracks(&self, student: &StudentId, required: &BTreeSet<TrackId>) -> Vec<TrackId> {
        match self.filled.get(student) {
            Some(held) => required.difference(held).copied().collect(),
            None => required.iter().copied().collect(),
        }
    }

    /// Reserve one seat in `course` and record the placement.
    ///
    /// Both the one-per-track check and the capacity check happen before any
    /// state changes, so a failed call leaves tracker and book untouched.
    pub fn seat(
        &mut self,
        tracker: &mut CapacityTracker,
        student: &StudentId,
        course: &CourseId,
        is_priority: bool,
        rank: PlacementRank,
    ) -> Result<(), AllocError> {
        let track = tracker
            .track_of(course)
            .ok_or_else(|| AllocError::UnknownCourse(course.clone()))?;
        if self.has_track(student, track) {
            return Err(AllocError::TrackAlreadyFilled { student: student.clone(), track });
        }
        tracker.reserve(course, 1)?;
        self.filled.entry(student.clone()).or_default().insert(track);
        self.assignments.push(Assignment {
            student_id: student.clone(),
            course_id: course.clone(),
            track,
            is_priority,
            rank,
        });
        Ok(())
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn into_assignments(self) -> Vec<Assignment> {
        self.assignments
    }
}
