//! Run-scoped seat counter: course → (assigned, capacity).
//!
//! Owned by one run and passed by `&mut` to each allocator stage in turn.
//! Keyed by `CourseId` in a `BTreeMap` so every walk is in course-id order.

use std::collections::{BTreeMap, BTreeSet};

use ea_core::entities::Course;
use ea_core::ids::{CourseId, TrackId};

use crate::AllocError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Seat {
    pub track: TrackId,
    pub capacity: u32,
    pub assigned: u32,
}

impl Seat {
    #[inline]
    pub fn available(&self) -> u32 {
        self.capacity.saturating_sub(self.assigned)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CapacityTracker {
    seats: BTreeMap<CourseId, Seat>,
}

impl CapacityTracker {
    pub fn new(courses: &[Course]) -> Self {
        let seats = courses
            .iter()
            .map(|c| {
                (
                    c.id.clone(),
                    Seat { track: c.track, capacity: c.capacity, assigned: 0 },
                )
            })
            .collect();
        Self { seats }
    }

    #[inline]
    pub fn seat(&self, course: &CourseId) -> Option<&Seat> {
        self.seats.get(course)
    }

    #[inline]
    pub fn track_of(&self, course: &CourseId) -> Option<TrackId> {
        self.seats.get(course).map(|s| s.track)
    }

    /// Free seats; `None` for an unknown course.
    #[inline]
    pub fn available(&self, course: &CourseId) -> Option<u32> {
        self.seats.get(course).map(Seat::available)
    }

    #[inline]
    pub fn has_room(&self, course: &CourseId) -> bool {
        self.available(course).map_or(false, |n| n > 0)
    }

    /// Take `n` seats. Fails without mutating if the course is unknown or
    /// lacks `n` free seats.
    pub fn reserve(&mut self, course: &CourseId, n: u32) -> Result<(), AllocError> {
        let seat = self
            .seats
            .get_mut(course)
            .ok_or_else(|| AllocError::UnknownCourse(course.clone()))?;
        if seat.available() < n {
            return Err(AllocError::CapacityExceeded(course.clone()));
        }
        seat.assigned += n;
        Ok(())
    }

    /// Courses in `track` that still have free seats, in course-id order.
    pub fn with_room_in_track(&self, track: TrackId) -> Vec<&CourseId> {
        self.seats
            .iter()
            .filter(|(_, s)| s.track == track && s.available() > 0)
            .map(|(id, _)| id)
            .collect()
    }

    /// Every track present in the catalog.
    pub fn tracks(&self) -> BTreeSet<TrackId> {
        self.seats.values().map(|s| s.track).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CourseId, &Seat)> + '_ {
        self.seats.iter()
    }

    pub fn total_capacity(&self) -> u64 {
        self.seats.values().map(|s| s.capacity as u64).sum()
    }

    pub fn total_assigned(&self) -> u64 {
        self.seats.values().map(|s| s.assigned as u64).sum()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(id: &str, track: u16, capacity: u32) -> Course {
        Course { id: id.parse().unwrap(), name: id.into(), track: TrackId(track), capacity }
    }

    fn cid(s: &str) -> CourseId { s.parse().unwrap() }

    #[test]
    fn reserve_respects_capacity() {
        let mut t = CapacityTracker::new(&[course("C-A", 1, 2)]);
        assert_eq!(t.available(&cid("C-A")), Some(2));
        t.reserve(&cid("C-A"), 2).unwrap();
        assert!(!t.has_room(&cid("C-A")));
        assert_eq!(t.reserve(&cid("C-A"), 1), Err(AllocError::CapacityExceeded(cid("C-A"))));
        assert_eq!(t.seat(&cid("C-A")).unwrap().assigned, 2);
    }

    #[test]
    fn unknown_course_is_an_error() {
        let mut t = CapacityTracker::new(&[]);
        assert_eq!(t.available(&cid("C-X")), None);
        assert_eq!(t.reserve(&cid("C-X"), 1), Err(AllocError::UnknownCourse(cid("C-X"))));
    }

    #[test]
    fn zero_capacity_course_never_has_room() {
        let t = CapacityTracker::new(&[course("C-Z", 1, 0)]);
        assert!(!t.has_room(&cid("C-Z")));
        assert!(t.with_room_in_track(TrackId(1)).is_empty());
    }

    #[test]
    fn room_listing_is_per_track_in_id_order() {
        let mut t = CapacityTracker::new(&[
            course("C-B", 1, 1),
            course("C-A", 1, 1),
            course("C-C", 2, 1),
        ]);
        let got: Vec<&str> = t.with_room_in_track(TrackId(1)).iter().map(|c| c.as_str()).collect();
        assert_eq!(got, vec!["C-A", "C-B"]);

        t.reserve(&cid("C-A"), 1).unwrap();
        let got: Vec<&str> = t.with_room_in_track(TrackId(1)).iter().map(|c| c.as_str()).collect();
        assert_eq!(got, vec!["C-B"]);
        assert_eq!(t.tracks().len(), 2);
        assert_eq!(t.total_capacity(), 3);
        assert_eq!(t.total_assigned(), 1);
    }
}
