//! Run statistics computed from an `AllocationOutcome`.
//!
//! Integer-first: percentages are stored in tenths (`333` = 33.3%) and are
//! `None` when the denominator is zero. Every collection is ordered.

use std::collections::{BTreeMap, BTreeSet};

use ea_algo::AllocationOutcome;
use ea_core::entities::{Course, PlacementRank};
use ea_core::ids::{CourseId, StudentId, TrackId};
use ea_core::rounding::percent_tenths;
use serde::{Deserialize, Serialize};

/// Key used in `rank_distribution` for fallback placements.
pub const FALLBACK_BUCKET: &str = "fallback";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Students in the roster.
    pub total_students: u32,
    /// Students the engine considered (roster minus those without selections
    /// unless they are included by params).
    pub considered_students: u32,
    pub priority_students: u32,
    pub regular_students: u32,
    pub required_tracks: Vec<TrackId>,

    pub total_assignments: u32,
    pub priority_assignments: u32,
    pub regular_assignments: u32,
    pub fallback_assignments: u32,

    pub lotteries: LotteryTotals,

    pub fully_assigned: u32,
    pub partially_assigned: u32,
    pub unassigned: u32,
    pub priority_fully_assigned: u32,
    pub regular_fully_assigned: u32,
    /// Every (student, track) the fallback could not fill.
    pub unplaced: Vec<UnplacedSlot>,

    /// Stated rank (as a decimal string) or `"fallback"` → placement count.
    pub rank_distribution: BTreeMap<String, u32>,
    /// Sorted by course id.
    pub courses: Vec<CourseUsage>,
    pub total_capacity: u64,
    pub total_assigned_seats: u64,
    pub overall_utilization_tenths: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryTotals {
    /// Oversubscription events.
    pub count: u32,
    pub candidates: u64,
    pub winners: u64,
    pub losers: u64,
    /// winners / candidates
    pub success_tenths: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplacedSlot {
    pub student_id: StudentId,
    pub track: TrackId,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseUsage {
    pub course_id: CourseId,
    pub name: String,
    pub track: TrackId,
    pub capacity: u32,
    pub assigned: u32,
    pub utilization_tenths: Option<u32>,
}

pub fn compute_stats(total_students: usize, courses: &[Course], out: &AllocationOutcome) -> RunStats {
    let priority_set: BTreeSet<&StudentId> = out.priority.iter().collect();

    let mut held: BTreeMap<&StudentId, u32> = BTreeMap::new();
    let mut rank_distribution: BTreeMap<String, u32> = BTreeMap::new();
    let (mut priority_assignments, mut fallback_assignments) = (0u32, 0u32);
    for a in &out.assignments {
        *held.entry(&a.student_id).or_default() += 1;
        if a.is_priority {
            priority_assignments += 1;
        }
        let bucket = match a.rank {
            PlacementRank::Stated(r) => r.to_string(),
            PlacementRank::Fallback => {
                fallback_assignments += 1;
                FALLBACK_BUCKET.to_string()
            }
        };
        *rank_distribution.entry(bucket).or_default() += 1;
    }

    let need = out.required_tracks.len() as u32;
    let (mut fully, mut partially, mut none) = (0u32, 0u32, 0u32);
    let (mut prio_full, mut reg_full) = (0u32, 0u32);
    for sid in out.priority.iter().chain(out.regular.iter()) {
        let n = held.get(sid).copied().unwrap_or(0);
        if n >= need {
            fully += 1;
            if priority_set.contains(sid) {
                prio_full += 1;
            } else {
                reg_full += 1;
            }
        } else if n == 0 {
            none += 1;
        } else {
            partially += 1;
        }
    }

    let mut lotteries = LotteryTotals { count: out.lottery_log.len() as u32, ..Default::default() };
    for rec in &out.lottery_log {
        lotteries.candidates += u64::from(rec.candidates);
        let w = rec.winner_count() as u64;
        lotteries.winners += w;
        lotteries.losers += u64::from(rec.candidates).saturating_sub(w);
    }
    lotteries.success_tenths = percent_tenths(lotteries.winners, lotteries.candidates);

    let mut usage: Vec<CourseUsage> = courses
        .iter()
        .map(|c| {
            let assigned = out.capacity.seat(&c.id).map_or(0, |s| s.assigned);
            CourseUsage {
                course_id: c.id.clone(),
                name: c.name.clone(),
                track: c.track,
                capacity: c.capacity,
                assigned,
                utilization_tenths: percent_tenths(u64::from(assigned), u64::from(c.capacity)),
            }
        })
        .collect();
    usage.sort_by(|a, b| a.course_id.cmp(&b.course_id));
    usage.dedup_by(|a, b| a.course_id == b.course_id);

    let total_capacity = out.capacity.total_capacity();
    let total_assigned_seats = out.capacity.total_assigned();

    RunStats {
        total_students: total_students as u32,
        considered_students: (out.priority.len() + out.regular.len()) as u32,
        priority_students: out.priority.len() as u32,
        regular_students: out.regular.len() as u32,
        required_tracks: out.required_tracks.iter().copied().collect(),
        total_assignments: out.assignments.len() as u32,
        priority_assignments,
        regular_assignments: out.assignments.len() as u32 - priority_assignments,
        fallback_assignments,
        lotteries,
        fully_assigned: fully,
        partially_assigned: partially,
        unassigned: none,
        priority_fully_assigned: prio_full,
        regular_fully_assigned: reg_full,
        unplaced: out
            .fallback
            .unplaced
            .iter()
            .map(|u| UnplacedSlot { student_id: u.student_id.clone(), track: u.track })
            .collect(),
        rank_distribution,
        courses: usage,
        total_capacity,
        total_assigned_seats,
        overall_utilization_tenths: percent_tenths(total_assigned_seats, total_capacity),
    }
}
