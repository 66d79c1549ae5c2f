//! Engine parameters with safe defaults and domain validation.

use crate::errors::CoreError;
use crate::ids::TrackId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Senior-most level in the default four-level school structure.
pub const DEFAULT_SENIOR_LEVEL: u8 = 4;

/// Per-run engine configuration.
///
/// Every field has a default; a params file only needs to name what it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct EngineParams {
    /// Senior-most tier. Students at this level are priority; students one
    /// level below are priority only when protected.
    pub senior_level: u8,
    /// Tracks every student must hold a seat in. `None` means every track
    /// present in the course catalog.
    pub required_tracks: Option<Vec<TrackId>>,
    /// Also place students who submitted no selections (fallback only).
    pub include_students_without_selections: bool,
    /// Fixed draw seed. Absent means a seed is drawn from OS entropy and
    /// recorded in the run record.
    pub tie_seed: Option<u64>,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            senior_level: DEFAULT_SENIOR_LEVEL,
            required_tracks: None,
            include_students_without_selections: false,
            tie_seed: None,
        }
    }
}

impl EngineParams {
    /// Priority flag: senior level, or next-junior level with the protected flag.
    #[inline]
    pub fn is_priority(&self, level: u8, protected: bool) -> bool {
        level == self.senior_level || (protected && level == self.senior_level.saturating_sub(1))
    }

    pub fn validate_domains(&self) -> Result<(), CoreError> {
        if self.senior_level < 2 {
            return Err(CoreError::DomainOutOfRange("senior_level"));
        }
        if let Some(tracks) = &self.required_tracks {
            if tracks.is_empty() {
                return Err(CoreError::DomainOutOfRange("required_tracks"));
            }
            if tracks.iter().any(|t| t.get() == 0) {
                return Err(CoreError::DomainOutOfRange("required_tracks"));
            }
        }
        Ok(())
    }
}
