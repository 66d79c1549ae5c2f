// crates/ea_algo/src/lib.rs
#![forbid(unsafe_code)]

//! Allocation algorithms. Pure computation over `ea_core` records: no I/O,
//! randomness only through an injected [`ea_core::rng::TieSource`].
//!
//! Stage order inside one run:
//! 1. [`tiers::classify`] splits students into priority and regular cohorts.
//! 2. [`priority::allocate_priority`] drains capacity for the priority cohort.
//! 3. [`waves::run_waves`] resolves regular demand rank by rank, drawing
//!    audited lotteries for oversubscribed courses.
//! 4. [`fallback::allocate_fallback`] fills missing tracks from leftover seats.
//!
//! [`engine::allocate`] strings the stages together.

use core::fmt;

use ea_core::ids::{CourseId, StudentId, TrackId};

pub mod audit;
pub mod book;
pub mod capacity;
pub mod choices;
pub mod engine;
pub mod fallback;
pub mod priority;
pub mod tiers;
pub mod waves;

pub use audit::{verify_lottery_log, AuditError, AuditSummary, LotteryAuditor};
pub use book::AssignmentBook;
pub use capacity::{CapacityTracker, Seat};
pub use choices::{Choice, SelectionIndex};
pub use engine::{allocate, AllocationOutcome};
pub use fallback::{FallbackSummary, Unplaced};
pub use tiers::{classify, Cohorts};

// ----------------------------- Errors -----------------------------

/// Failures that abort an allocation run. Unplaceable students are not errors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// Student record has no level; classification cannot proceed.
    MissingLevel(StudentId),
    /// Selection references a course absent from the catalog.
    UnknownCourse(CourseId),
    /// A reservation would push the course past its capacity.
    CapacityExceeded(CourseId),
    /// A second placement was attempted in a track the student already holds.
    TrackAlreadyFilled { student: StudentId, track: TrackId },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocError::MissingLevel(s) => write!(f, "student {s} has no level"),
            AllocError::UnknownCourse(c) => write!(f, "unknown course {c}"),
            AllocError::CapacityExceeded(c) => write!(f, "capacity exceeded for course {c}"),
            AllocError::TrackAlreadyFilled { student, track } => {
                write!(f, "student {student} already placed in track {track}")
            }
        }
    }
}

impl std::error::Error for AllocError {}
