//! Input records (students, courses, selections) and engine output records
//! (assignments, lottery records).
//!
//! Inputs are read-only snapshots supplied per run. Outputs are created only
//! during a run; a run supersedes every assignment of any prior run.

use crate::ids::{CourseId, StudentId, TrackId};

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Reserved wire value marking a fallback placement ("placed by availability").
/// Stated ranks must be strictly below this value.
pub const FALLBACK_RANK_SENTINEL: u32 = 99;

/// A student as supplied by the roster collaborator.
///
/// `level` is optional on the wire; a missing level is a malformed record and
/// aborts classification.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Student {
    pub id: StudentId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub level: Option<u8>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub protected: bool,
}

/// A course seat pool within exactly one track.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Course {
    pub id: CourseId,
    pub name: String,
    pub track: TrackId,
    pub capacity: u32,
}

/// One ranked choice: `rank` 1 is most preferred within the course's track.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Selection {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub rank: u32,
}

/// Rank under which an assignment was made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlacementRank {
    /// Placed through the student's stated preference at this rank.
    Stated(u32),
    /// Placed by the fallback stage into any course with free seats.
    Fallback,
}

impl PlacementRank {
    /// Wire form: the stated rank, or [`FALLBACK_RANK_SENTINEL`].
    #[inline]
    pub fn as_wire(self) -> u32 {
        match self {
            PlacementRank::Stated(r) => r,
            PlacementRank::Fallback => FALLBACK_RANK_SENTINEL,
        }
    }

    #[inline]
    pub fn from_wire(v: u32) -> Self {
        if v == FALLBACK_RANK_SENTINEL {
            PlacementRank::Fallback
        } else {
            PlacementRank::Stated(v)
        }
    }
}

#[cfg(feature = "serde")]
impl Serialize for PlacementRank {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u32(self.as_wire())
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for PlacementRank {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = u32::deserialize(d)?;
        if v == 0 {
            return Err(serde::de::Error::invalid_value(
                serde::de::Unexpected::Unsigned(0),
                &"a positive rank",
            ));
        }
        Ok(PlacementRank::from_wire(v))
    }
}

/// One engine placement: a student holds `course_id` in that course's track.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Assignment {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub track: TrackId,
    pub is_priority: bool,
    pub rank: PlacementRank,
}

/// A single candidate's outcome inside a draw, in permutation order.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LotteryEntry {
    pub student_id: StudentId,
    pub won: bool,
}

/// Immutable audit account of one oversubscribed (course, wave) draw.
///
/// `entries` holds the full drawn permutation; the first `seats` entries won.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LotteryRecord {
    /// 1-based position in the run's lottery log.
    pub sequence: u32,
    pub course_id: CourseId,
    pub course_name: String,
    pub track: TrackId,
    pub wave: u32,
    pub candidates: u32,
    pub seats: u32,
    pub executed_utc: String,
    pub entries: Vec<LotteryEntry>,
}

impl LotteryRecord {
    pub fn winners(&self) -> impl Iterator<Item = &StudentId> + '_ {
        self.entries.iter().filter(|e| e.won).map(|e| &e.student_id)
    }

    pub fn losers(&self) -> impl Iterator<Item = &StudentId> + '_ {
        self.entries.iter().filter(|e| !e.won).map(|e| &e.student_id)
    }

    pub fn winner_count(&self) -> usize {
        self.entries.iter().filter(|e| e.won).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> StudentId { s.parse().unwrap() }

    #[test]
    fn placement_rank_wire_form() {
        assert_eq!(PlacementRank::Stated(2).as_wire(), 2);
        assert_eq!(PlacementRank::Fallback.as_wire(), FALLBACK_RANK_SENTINEL);
        assert_eq!(PlacementRank::from_wire(99), PlacementRank::Fallback);
        assert_eq!(PlacementRank::from_wire(1), PlacementRank::Stated(1));
        assert!(PlacementRank::Stated(1) < PlacementRank::Fallback);
    }

    #[test]
    fn lottery_record_partitions_entries() {
        let rec = LotteryRecord {
            sequence: 1,
            course_id: "C-ART".parse().unwrap(),
            course_name: "Art".into(),
            track: TrackId(1),
            wave: 1,
            candidates: 3,
            seats: 2,
            executed_utc: "2026-03-02T09:00:00Z".into(),
            entries: vec![
                LotteryEntry { student_id: sid("s3"), won: true },
                LotteryEntry { student_id: sid("s1"), won: true },
                LotteryEntry { student_id: sid("s2"), won: false },
            ],
        };
        assert_eq!(rec.winner_count(), 2);
        let losers: Vec<&str> = rec.losers().map(|s| s.as_str()).collect();
        assert_eq!(losers, vec!["s2"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn assignment_rank_serializes_as_integer() {
        let a = Assignment {
            student_id: sid("s1"),
            course_id: "C-ART".parse().unwrap(),
            track: TrackId(1),
            is_priority: false,
            rank: PlacementRank::Fallback,
        };
        let v = serde_json::to_value(&a).unwrap();
        assert_eq!(v["rank"], 99);
        let back: Assignment = serde_json::from_value(v).unwrap();
        assert_eq!(back, a);
    }
}
