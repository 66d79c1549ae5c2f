//! Determinism utilities: stable ordering for records.
//!
//! Every collection the engine iterates over is walked in a fixed order so
//! that, for a fixed seed, a run is reproducible byte for byte.

use core::cmp::Ordering;

use crate::entities::{Assignment, Course, Selection};
use crate::ids::{CourseId, StudentId};

/* -------------------------------------------------------------------------- */
/*                               Stable Ordering                              */
/* -------------------------------------------------------------------------- */

/// A **total**, stable order for values that must sort canonically.
pub trait StableOrd {
    fn stable_cmp(&self, other: &Self) -> Ordering;
}

impl StableOrd for StudentId {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl StableOrd for CourseId {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl StableOrd for Course {
    /// Catalog order is `(track, course_id)`.
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.track
            .cmp(&other.track)
            .then_with(|| self.id.stable_cmp(&other.id))
    }
}

impl StableOrd for Selection {
    /// `(student_id, rank, course_id)`.
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.student_id
            .stable_cmp(&other.student_id)
            .then(self.rank.cmp(&other.rank))
            .then_with(|| self.course_id.stable_cmp(&other.course_id))
    }
}

impl StableOrd for Assignment {
    /// `(student_id, track, course_id)`.
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        self.student_id
            .stable_cmp(&other.student_id)
            .then(self.track.cmp(&other.track))
            .then_with(|| self.course_id.stable_cmp(&other.course_id))
    }
}

/* -------------------------------------------------------------------------- */
/*                            Canonical sort helpers                          */
/* -------------------------------------------------------------------------- */

#[inline]
pub fn sort_canonical<T: StableOrd>(xs: &mut [T]) {
    xs.sort_by(|a, b| a.stable_cmp(b));
}
