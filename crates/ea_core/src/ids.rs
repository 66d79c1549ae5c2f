//! crates/ea_core/src/ids.rs
//! Record tokens (students, courses, tracks) and canonical output IDs.
//! Deterministic, ASCII-only, strict shapes; no I/O.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors returned when validating or parsing IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdError {
    NonAscii,
    TooLong,
    BadShape,
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdError::NonAscii => write!(f, "id must be ASCII without NUL"),
            IdError::TooLong => write!(f, "id too long"),
            IdError::BadShape => write!(f, "id has an invalid shape"),
        }
    }
}

impl std::error::Error for IdError {}

const MAX_ID_LEN: usize = 256;
const HEX64_LEN: usize = 64;
const TOKEN_MAX_LEN: usize = 64;

#[inline]
fn is_ascii_no_nul(s: &str) -> bool {
    !s.as_bytes().iter().any(|&b| b == 0 || b > 0x7F)
}

/// Lowercase hex (length must be exactly 64).
#[inline]
pub fn is_valid_sha256(s: &str) -> bool {
    s.len() == HEX64_LEN
        && s.as_bytes()
            .iter()
            .all(|&b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Record token: ^[A-Za-z0-9_.:@-]{1,64}$ (ASCII only).
///
/// `@` is admitted so institutional e-mail handles can serve as student ids.
#[inline]
pub fn is_valid_token(s: &str) -> bool {
    let bs = s.as_bytes();
    let len = bs.len();
    if len == 0 || len > TOKEN_MAX_LEN || !is_ascii_no_nul(s) {
        return false;
    }
    bs.iter()
        .all(|&b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b':' | b'-' | b'@'))
}

macro_rules! simple_string_newtype {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
        pub struct $name(String);

        impl $name {
            #[inline] pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl TryFrom<&str> for $name {
            type Error = IdError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;
            #[inline]
            fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
        }

        impl From<$name> for String {
            #[inline]
            fn from(value: $name) -> String { value.0 }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str { &self.0 }
        }
    }
}

// === Record tokens: StudentId, CourseId (no prefixes) ===

simple_string_newtype!(
    /// Student token: ^[A-Za-z0-9_.:@-]{1,64}$
    StudentId
);
simple_string_newtype!(
    /// Course token: ^[A-Za-z0-9_.:@-]{1,64}$
    CourseId
);

fn parse_token(s: &str) -> Result<String, IdError> {
    if !is_ascii_no_nul(s) { return Err(IdError::NonAscii); }
    if s.len() > TOKEN_MAX_LEN { return Err(IdError::TooLong); }
    if !is_valid_token(s) { return Err(IdError::BadShape); }
    Ok(s.to_owned())
}

impl FromStr for StudentId {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_token(s).map(StudentId)
    }
}

impl FromStr for CourseId {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_token(s).map(CourseId)
    }
}

/// Parallel track number. Tracks are small positive integers (1, 2, 3, ...).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TrackId(pub u16);

impl TrackId {
    #[inline] pub fn get(self) -> u16 { self.0 }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

// === Prefixed output IDs: ASG, LOT, RUN ===

simple_string_newtype!(
    /// "ASG:" + 64-hex lowercase (digest of the canonical assignment set)
    AssignmentSetId
);
simple_string_newtype!(
    /// "LOT:" + 64-hex lowercase (digest of the canonical lottery log)
    LotteryLogId
);
simple_string_newtype!(
    /// "RUN:" + <RFC3339 UTC 'YYYY-MM-DDTHH:MM:SSZ'> + "-" + 64-hex lowercase
    RunId
);

#[inline]
fn is_prefixed_hex(s: &str, prefix: &str) -> bool {
    s.len() == prefix.len() + HEX64_LEN
        && s.starts_with(prefix)
        && is_valid_sha256(&s[prefix.len()..])
}

/// Strict RFC3339 "YYYY-MM-DDTHH:MM:SSZ"
#[inline]
pub fn is_rfc3339_utc_20(ts: &str) -> bool {
    let b = ts.as_bytes();
    if b.len() != 20 { return false; }
    let digits = |r: core::ops::Range<usize>| b[r].iter().all(|c| c.is_ascii_digit());
    digits(0..4)
        && b[4] == b'-'
        && digits(5..7)
        && b[7] == b'-'
        && digits(8..10)
        && b[10] == b'T'
        && digits(11..13)
        && b[13] == b':'
        && digits(14..16)
        && b[16] == b':'
        && digits(17..19)
        && b[19] == b'Z'
}

#[inline]
fn is_run_shape(s: &str) -> bool {
    // "RUN:" + ts(20) + "-" + hex64
    if s.len() != 4 + 20 + 1 + HEX64_LEN { return false; }
    if !s.starts_with("RUN:") { return false; }
    if !is_rfc3339_utc_20(&s[4..24]) { return false; }
    if s.as_bytes()[24] != b'-' { return false; }
    is_valid_sha256(&s[25..])
}

fn parse_output_id(s: &str, ok: impl Fn(&str) -> bool) -> Result<String, IdError> {
    if !is_ascii_no_nul(s) { return Err(IdError::NonAscii); }
    if s.len() > MAX_ID_LEN { return Err(IdError::TooLong); }
    if !ok(s) { return Err(IdError::BadShape); }
    Ok(s.to_owned())
}

impl FromStr for AssignmentSetId {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_output_id(s, |x| is_prefixed_hex(x, "ASG:")).map(AssignmentSetId)
    }
}
impl AssignmentSetId {
    #[inline] pub fn as_hex(&self) -> &str { &self.0[4..] }
}

impl FromStr for LotteryLogId {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_output_id(s, |x| is_prefixed_hex(x, "LOT:")).map(LotteryLogId)
    }
}
impl LotteryLogId {
    #[inline] pub fn as_hex(&self) -> &str { &self.0[4..] }
}

impl FromStr for RunId {
    type Err = IdError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_output_id(s, is_run_shape).map(RunId)
    }
}

impl RunId {
    /// Embedded timestamp (RFC3339 UTC).
    #[inline]
    pub fn timestamp_utc(&self) -> &str {
        &self.0[4..24]
    }

    /// Digest part of the id; used to name per-run directories.
    #[inline]
    pub fn as_hex(&self) -> &str {
        &self.0[25..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    #[test]
    fn tokens() {
        for ok in ["A", "a", "9", "_", ".", ":", "-", "ana.perez@school.cl", "C-ROBOTICS"] {
            assert!(is_valid_token(ok), "{ok}");
            let _s: StudentId = ok.parse().unwrap();
            let _c: CourseId = ok.parse().unwrap();
        }
        let long = "x".repeat(65);
        for bad in ["", " ", "é", "with space", long.as_str()] {
            assert!(!is_valid_token(bad), "{bad}");
            assert!(bad.parse::<StudentId>().is_err());
        }
    }

    #[test]
    fn token_errors_name_the_cause() {
        let at_limit = "x".repeat(64);
        assert!(at_limit.parse::<StudentId>().is_ok());
        for n in [65, 200, 257] {
            assert_eq!("x".repeat(n).parse::<CourseId>(), Err(IdError::TooLong), "len {n}");
        }
        assert_eq!("é".parse::<StudentId>(), Err(IdError::NonAscii));
        assert_eq!("with space".parse::<StudentId>(), Err(IdError::BadShape));
        assert_eq!("".parse::<StudentId>(), Err(IdError::BadShape));
    }

    #[test]
    fn output_ids() {
        let asg: AssignmentSetId = format!("ASG:{HEX}").parse().unwrap();
        let lot: LotteryLogId = format!("LOT:{HEX}").parse().unwrap();
        let run: RunId = format!("RUN:2026-03-02T09:00:00Z-{HEX}").parse().unwrap();

        assert_eq!(asg.as_hex(), HEX);
        assert_eq!(lot.as_hex(), HEX);
        assert_eq!(run.timestamp_utc(), "2026-03-02T09:00:00Z");
        assert_eq!(run.as_hex(), HEX);

        assert!("ASG:DEADBEEF".parse::<AssignmentSetId>().is_err());
        assert!(format!("LOT:{}", HEX.to_uppercase()).parse::<LotteryLogId>().is_err());
        assert!(format!("RUN:2026-03-02 09:00:00Z-{HEX}").parse::<RunId>().is_err());
    }

    #[test]
    fn track_display() {
        assert_eq!(TrackId(2).to_string(), "P2");
        assert!(TrackId(1) < TrackId(3));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_rejects_bad_tokens() {
        let ok: StudentId = serde_json::from_str("\"s-001\"").unwrap();
        assert_eq!(ok.as_str(), "s-001");
        assert!(serde_json::from_str::<StudentId>("\"bad id\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"s-001\"");
    }
}
