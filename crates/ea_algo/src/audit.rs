//! Lottery auditor: the append-only log of tie-break draws, and a verifier
//! that checks a log against the assignment set it produced.
//!
//! A record is written when the draw is made, before any winner is seated.
//! Records are ordered by wave, then by encounter order inside the wave.

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};

use ea_core::entities::{Assignment, LotteryEntry, LotteryRecord, PlacementRank};
use ea_core::ids::{CourseId, StudentId, TrackId};

/// Append-only lottery log for one run.
#[derive(Clone, Debug, Default)]
pub struct LotteryAuditor {
    records: Vec<LotteryRecord>,
}

/// One draw, described before it is committed to the log.
#[derive(Clone, Debug)]
pub struct Draw<'a> {
    pub course_id: &'a CourseId,
    pub course_name: &'a str,
    pub track: TrackId,
    pub wave: u32,
    pub seats: u32,
    /// Full drawn permutation of the candidate group.
    pub permutation: &'a [StudentId],
}

impl LotteryAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the record for `draw`. The first `seats` students of the
    /// permutation are the winners.
    pub fn record(&mut self, draw: Draw<'_>, executed_utc: &str) -> &LotteryRecord {
        let seats = draw.seats as usize;
        let entries = draw
            .permutation
            .iter()
            .enumerate()
            .map(|(i, s)| LotteryEntry { student_id: s.clone(), won: i < seats })
            .collect();
        let sequence = self.records.len() as u32 + 1;
        self.records.push(LotteryRecord {
            sequence,
            course_id: draw.course_id.clone(),
            course_name: draw.course_name.to_owned(),
            track: draw.track,
            wave: draw.wave,
            candidates: draw.permutation.len() as u32,
            seats: draw.seats,
            executed_utc: executed_utc.to_owned(),
            entries,
        });
        &self.records[self.records.len() - 1]
    }

    pub fn records(&self) -> &[LotteryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_log(self) -> Vec<LotteryRecord> {
        self.records
    }
}

// ----------------------------- Verification -----------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditError {
    SequenceGap { expected: u32, found: u32 },
    WaveOrder { sequence: u32 },
    CandidateCount { sequence: u32 },
    NotOversubscribed { sequence: u32 },
    WinnerCount { sequence: u32, expected: u32, found: u32 },
    PartitionOrder { sequence: u32 },
    DuplicateCandidate { sequence: u32, student: StudentId },
    RepeatedCandidate { course: CourseId, student: StudentId },
    WinnerNotAssigned { sequence: u32, student: StudentId },
    LoserAssigned { sequence: u32, student: StudentId },
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditError::SequenceGap { expected, found } => {
                write!(f, "lottery sequence gap: expected {expected}, found {found}")
            }
            AuditError::WaveOrder { sequence } => write!(f, "lottery {sequence}: wave out of order"),
            AuditError::CandidateCount { sequence } => {
                write!(f, "lottery {sequence}: candidate count does not match entries")
            }
            AuditError::NotOversubscribed { sequence } => {
                write!(f, "lottery {sequence}: seats not below candidate count")
            }
            AuditError::WinnerCount { sequence, expected, found } => {
                write!(f, "lottery {sequence}: expected {expected} winners, found {found}")
            }
            AuditError::PartitionOrder { sequence } => {
                write!(f, "lottery {sequence}: winners are not the permutation prefix")
            }
            AuditError::DuplicateCandidate { sequence, student } => {
                write!(f, "lottery {sequence}: student {student} listed twice")
            }
            AuditError::RepeatedCandidate { course, student } => {
                write!(f, "student {student} drawn in more than one lottery for {course}")
            }
            AuditError::WinnerNotAssigned { sequence, student } => {
                write!(f, "lottery {sequence}: winner {student} holds no matching assignment")
            }
            AuditError::LoserAssigned { sequence, student } => {
                write!(f, "lottery {sequence}: loser {student} holds the course")
            }
        }
    }
}

impl std::error::Error for AuditError {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub lotteries: u32,
    pub candidates: u64,
    pub winners: u64,
    pub losers: u64,
}

/// Check a lottery log on its own and against the assignments of the same run.
///
/// From the log alone: contiguous sequence, non-decreasing waves, counts that
/// match entries, winners are exactly the first `seats` entries of the
/// permutation, no student drawn twice for one course. Against assignments:
/// every winner holds the course at the wave's rank, no loser holds it.
pub fn verify_lottery_log(
    log: &[LotteryRecord],
    assignments: &[Assignment],
) -> Result<AuditSummary, AuditError> {
    let held: BTreeMap<(&StudentId, &CourseId), PlacementRank> = assignments
        .iter()
        .map(|a| ((&a.student_id, &a.course_id), a.rank))
        .collect();

    let mut seen_per_course: BTreeMap<&CourseId, BTreeSet<&StudentId>> = BTreeMap::new();
    let mut summary = AuditSummary::default();
    let mut last_wave = 0u32;

    for (i, rec) in log.iter().enumerate() {
        let expected = i as u32 + 1;
        if rec.sequence != expected {
            return Err(AuditError::SequenceGap { expected, found: rec.sequence });
        }
        let seq = rec.sequence;
        if rec.wave < last_wave {
            return Err(AuditError::WaveOrder { sequence: seq });
        }
        last_wave = rec.wave;

        if rec.candidates as usize != rec.entries.len() {
            return Err(AuditError::CandidateCount { sequence: seq });
        }
        if rec.seats >= rec.candidates {
            return Err(AuditError::NotOversubscribed { sequence: seq });
        }
        let winners = rec.winner_count() as u32;
        if winners != rec.seats {
            return Err(AuditError::WinnerCount { sequence: seq, expected: rec.seats, found: winners });
        }
        let seats = rec.seats as usize;
        if rec.entries.iter().enumerate().any(|(pos, e)| e.won != (pos < seats)) {
            return Err(AuditError::PartitionOrder { sequence: seq });
        }

        let mut in_record = BTreeSet::new();
        let seen = seen_per_course.entry(&rec.course_id).or_default();
        for e in &rec.entries {
            if !in_record.insert(&e.student_id) {
                return Err(AuditError::DuplicateCandidate { sequence: seq, student: e.student_id.clone() });
            }
            if !seen.insert(&e.student_id) {
                return Err(AuditError::RepeatedCandidate {
                    course: rec.course_id.clone(),
                    student: e.student_id.clone(),
                });
            }
            let holding = held.get(&(&e.student_id, &rec.course_id));
            if e.won {
                if holding != Some(&PlacementRank::Stated(rec.wave)) {
                    return Err(AuditError::WinnerNotAssigned { sequence: seq, student: e.student_id.clone() });
                }
            } else if holding.is_some() {
                return Err(AuditError::LoserAssigned { sequence: seq, student: e.student_id.clone() });
            }
        }

        summary.lotteries += 1;
        summary.candidates += rec.candidates as u64;
        summary.winners += winners as u64;
        summary.losers += (rec.candidates - winners) as u64;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(s: &str) -> StudentId { s.parse().unwrap() }
    fn cid(s: &str) -> CourseId { s.parse().unwrap() }

    const TS: &str = "2026-03-02T09:00:00Z";

    fn won(student: &str, course: &str, wave: u32) -> Assignment {
        Assignment {
            student_id: sid(student),
            course_id: cid(course),
            track: TrackId(1),
            is_priority: false,
            rank: PlacementRank::Stated(wave),
        }
    }

    fn one_draw() -> (Vec<LotteryRecord>, Vec<Assignment>) {
        let course = cid("C-ART");
        let perm = vec![sid("s3"), sid("s1"), sid("s2")];
        let mut auditor = LotteryAuditor::new();
        let rec = auditor.record(
            Draw { course_id: &course, course_name: "Art", track: TrackId(1), wave: 1, seats: 2, permutation: &perm },
            TS,
        );
        assert_eq!(rec.sequence, 1);
        assert_eq!(rec.candidates, 3);
        (auditor.into_log(), vec![won("s3", "C-ART", 1), won("s1", "C-ART", 1)])
    }

    #[test]
    fn record_marks_prefix_as_winners() {
        let (log, _) = one_draw();
        let winners: Vec<&str> = log[0].winners().map(|s| s.as_str()).collect();
        assert_eq!(winners, vec!["s3", "s1"]);
        assert_eq!(log[0].executed_utc, TS);
    }

    #[test]
    fn consistent_log_verifies() {
        let (log, assignments) = one_draw();
        let s = verify_lottery_log(&log, &assignments).unwrap();
        assert_eq!(s, AuditSummary { lotteries: 1, candidates: 3, winners: 2, losers: 1 });
    }

    #[test]
    fn winner_without_assignment_is_caught() {
        let (log, mut assignments) = one_draw();
        assignments.pop();
        assert_eq!(
            verify_lottery_log(&log, &assignments),
            Err(AuditError::WinnerNotAssigned { sequence: 1, student: sid("s1") })
        );
    }

    #[test]
    fn loser_holding_course_is_caught() {
        let (log, mut assignments) = one_draw();
        assignments.push(won("s2", "C-ART", 3));
        assert_eq!(
            verify_lottery_log(&log, &assignments),
            Err(AuditError::LoserAssigned { sequence: 1, student: sid("s2") })
        );
    }

    #[test]
    fn tampered_outcome_is_caught() {
        let (mut log, assignments) = one_draw();
        log[0].entries[2].won = true;
        log[0].entries[1].won = false;
        assert_eq!(verify_lottery_log(&log, &assignments), Err(AuditError::PartitionOrder { sequence: 1 }));

        let (mut log, assignments) = one_draw();
        log[0].sequence = 2;
        assert_eq!(
            verify_lottery_log(&log, &assignments),
            Err(AuditError::SequenceGap { expected: 1, found: 2 })
        );
    }

    #[test]
    fn same_student_in_two_draws_for_one_course_is_caught() {
        let (mut log, assignments) = one_draw();
        let mut second = log[0].clone();
        second.sequence = 2;
        second.wave = 2;
        log.push(second);
        assert!(matches!(
            verify_lottery_log(&log, &assignments),
            Err(AuditError::RepeatedCandidate { .. })
        ));
    }
}
