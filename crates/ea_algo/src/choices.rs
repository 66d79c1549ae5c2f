//! Per-student ranked choices, resolved against the course catalog.

use std::collections::{BTreeMap, BTreeSet};

use ea_core::entities::Selection;
use ea_core::ids::{CourseId, StudentId, TrackId};

use crate::capacity::CapacityTracker;
use crate::AllocError;

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Choice {
    pub rank: u32,
    pub track: TrackId,
    pub course_id: CourseId,
}

/// Selections grouped by student, each list sorted by `(rank, track, course)`.
#[derive(Clone, Debug, Default)]
pub struct SelectionIndex {
    by_student: BTreeMap<StudentId, Vec<Choice>>,
}

impl SelectionIndex {
    /// Build the index. Selections in tracks outside `tracks` are dropped.
    pub fn build(
        selections: &[Selection],
        catalog: &CapacityTracker,
        tracks: &BTreeSet<TrackId>,
    ) -> Result<Self, AllocError> {
        let mut by_student: BTreeMap<StudentId, Vec<Choice>> = BTreeMap::new();
        for sel in selections {
            let track = catalog
                .track_of(&sel.course_id)
                .ok_or_else(|| AllocError::UnknownCourse(sel.course_id.clone()))?;
            if !tracks.contains(&track) {
                continue;
            }
            by_student.entry(sel.student_id.clone()).or_default().push(Choice {
                rank: sel.rank,
                track,
                course_id: sel.course_id.clone(),
            });
        }
        for list in by_student.values_mut() {
            list.sort();
        }
        Ok(Self { by_student })
    }

    /// Choices for `student` in ascending rank order (empty if none).
    pub fn of(&self, student: &StudentId) -> &[Choice] {
        self.by_student.get(student).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Largest rank present among `students`; 0 if none has a choice.
    pub fn max_rank<'s, I>(&self, students: I) -> u32
    where
        I: IntoIterator<Item = &'s StudentId>,
    {
        students
            .into_iter()
            .flat_map(|s| self.of(s).iter().map(|c| c.rank))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ea_core::entities::Course;

    fn sid(s: &str) -> StudentId { s.parse().unwrap() }
    fn cid(s: &str) -> CourseId { s.parse().unwrap() }
    fn sel(s: &str, c: &str, rank: u32) -> Selection {
        Selection { student_id: sid(s), course_id: cid(c), rank }
    }

    fn catalog() -> CapacityTracker {
        let mk = |id: &str, t: u16| Course { id: cid(id), name: id.into(), track: TrackId(t), capacity: 3 };
        CapacityTracker::new(&[mk("C-A", 1), mk("C-B", 2), mk("C-C", 3)])
    }

    fn all_tracks() -> BTreeSet<TrackId> {
        [TrackId(1), TrackId(2), TrackId(3)].into_iter().collect()
    }

    #[test]
    fn sorted_by_rank_then_track() {
        let idx = SelectionIndex::build(
            &[sel("s1", "C-C", 1), sel("s1", "C-A", 2), sel("s1", "C-B", 1)],
            &catalog(),
            &all_tracks(),
        )
        .unwrap();
        let got: Vec<(u32, &str)> = idx.of(&sid("s1")).iter().map(|c| (c.rank, c.course_id.as_str())).collect();
        assert_eq!(got, vec![(1, "C-B"), (1, "C-C"), (2, "C-A")]);
        assert_eq!(idx.max_rank([&sid("s1")]), 2);
        assert!(idx.of(&sid("nobody")).is_empty());
    }

    #[test]
    fn unknown_course_rejected() {
        let err = SelectionIndex::build(&[sel("s1", "C-X", 1)], &catalog(), &all_tracks()).unwrap_err();
        assert_eq!(err, AllocError::UnknownCourse(cid("C-X")));
    }

    #[test]
    fn tracks_outside_required_set_are_dropped() {
        let only_one: BTreeSet<TrackId> = [TrackId(1)].into_iter().collect();
        let idx = SelectionIndex::build(&[sel("s1", "C-A", 1), sel("s1", "C-B", 1)], &catalog(), &only_one).unwrap();
        assert_eq!(idx.of(&sid("s1")).len(), 1);
    }
}
