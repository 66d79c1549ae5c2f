//! ea_core — Core types, parameters, ordering helpers, and seeded tie RNG.
//!
//! This crate is **I/O-free**. It defines the stable types used across the
//! engine (`ea_io`, `ea_algo`, `ea_pipeline`, `ea_report`, `ea_cli`).
//!
//! - Record tokens: `StudentId`, `CourseId`, numeric `TrackId`
//! - Output IDs: `ASG:`, `LOT:`, `RUN:`
//! - Entities: `Student`, `Course`, `Selection`, `Assignment`, `LotteryRecord`
//! - Engine parameters (`EngineParams`) with domain validation
//! - Deterministic ordering helpers
//! - Seedable RNG (ChaCha20) for **tie-break draws and fallback picks only**
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod determinism;
pub mod entities;
pub mod ids;
pub mod rng;
pub mod variables;

pub mod errors {
    use core::fmt;

    /// Parameter-domain failures. Token parsing has its own `ids::IdError`.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        DomainOutOfRange(&'static str),
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::DomainOutOfRange(k) => write!(f, "domain out of range: {k}"),
            }
        }
    }

    impl std::error::Error for CoreError {}
}

pub mod rounding {
    //! Integer-first percentage helpers (no floats in artifacts).

    /// Percentage of `num / den` in **tenths** of a percent, rounded half-up.
    /// Returns `None` when `den == 0`.
    ///
    /// `percent_tenths(1, 3) == Some(333)` (33.3%).
    pub fn percent_tenths(num: u64, den: u64) -> Option<u32> {
        if den == 0 {
            return None;
        }
        let scaled = (num as u128) * 1000 + (den as u128) / 2;
        Some((scaled / den as u128) as u32)
    }

    /// Render tenths as a one-decimal percent string without float math.
    pub fn format_tenths(tenths: u32) -> String {
        format!("{}.{}%", tenths / 10, tenths % 10)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn tenths_round_half_up() {
            assert_eq!(percent_tenths(1, 3), Some(333));
            assert_eq!(percent_tenths(2, 3), Some(667));
            assert_eq!(percent_tenths(42, 42), Some(1000));
            assert_eq!(percent_tenths(0, 42), Some(0));
            assert_eq!(percent_tenths(1, 0), None);
        }

        #[test]
        fn format_one_decimal() {
            assert_eq!(format_tenths(333), "33.3%");
            assert_eq!(format_tenths(1000), "100.0%");
            assert_eq!(format_tenths(5), "0.5%");
        }
    }
}

pub use entities::{
    Assignment, Course, LotteryEntry, LotteryRecord, PlacementRank, Selection, Student,
    FALLBACK_RANK_SENTINEL,
};
pub use ids::{CourseId, StudentId, TrackId};
pub use rng::{TieRng, TieSource};
pub use variables::EngineParams;
