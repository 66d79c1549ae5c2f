//! crates/ea_io/src/hasher.rs
//!
//! Deterministic hashing and id builders for run artifacts.
//!
//! - `sha256_canonical(..)` for JSON values/structs (goes through canonical_json).
//! - `sha256_hex(..)` / `sha256_file(..)` for raw bytes.
//! - `ASG:` and `LOT:` ids hash the canonical assignment set / lottery log;
//!   `RUN:` prefixes an RFC3339 UTC timestamp to the hash of the run record.
//!
//! Hex digests are lowercase.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use ea_core::entities::{Assignment, LotteryRecord};
use ea_core::ids::{AssignmentSetId, LotteryLogId, RunId};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::IoError;

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over the **canonical JSON bytes** of any serializable value.
pub fn sha256_canonical<T: Serialize + ?Sized>(value: &T) -> Result<String, IoError> {
    Ok(sha256_hex(&to_canonical_bytes(value)?))
}

/// SHA-256 over a file's raw bytes.
pub fn sha256_file(path: &Path) -> Result<String, IoError> {
    let f = File::open(path).map_err(|e| IoError::Hash(format!("{}: {e}", path.display())))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = r.read(&mut buf).map_err(|e| IoError::Hash(format!("{}: {e}", path.display())))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/* ---------------------------- Artifact id builders ---------------------------- */

/// `ASG:<hex>` over the assignment set in the order given (callers pass canonical order).
pub fn assignment_set_id(assignments: &[Assignment]) -> Result<AssignmentSetId, IoError> {
    let hex = sha256_canonical(assignments)?;
    format!("ASG:{hex}")
        .parse()
        .map_err(|e| IoError::Hash(format!("assignment set id: {e}")))
}

/// `LOT:<hex>` over the lottery log in draw order.
pub fn lottery_log_id(log: &[LotteryRecord]) -> Result<LotteryLogId, IoError> {
    let hex = sha256_canonical(log)?;
    format!("LOT:{hex}")
        .parse()
        .map_err(|e| IoError::Hash(format!("lottery log id: {e}")))
}

/* --------------------------------- RUN ids --------------------------------- */

/// Normalize to `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Accepts a trailing `Z` or `±00:00`, with optional fractional seconds
/// (dropped). Any other offset is rejected.
pub fn normalize_rfc3339_utc_seconds(ts: &str) -> Result<String, IoError> {
    let bad = || IoError::Invalid(format!("timestamp must be RFC3339 UTC: {ts}"));
    if ts.len() < 20 || !ts.is_ascii() {
        return Err(bad());
    }
    let head = &ts[..19];
    let num = |r: core::ops::Range<usize>| head[r].parse::<u32>().map_err(|_| bad());
    let b = head.as_bytes();
    if b[4] != b'-' || b[7] != b'-' || b[10] != b'T' || b[13] != b':' || b[16] != b':' {
        return Err(bad());
    }
    let (_y, m, d, hh, mm, ss) = (num(0..4)?, num(5..7)?, num(8..10)?, num(11..13)?, num(14..16)?, num(17..19)?);
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) || hh > 23 || mm > 59 || ss > 59 {
        return Err(bad());
    }

    let mut rest = &ts[19..];
    if let Some(frac) = rest.strip_prefix('.') {
        let digits = frac.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || digits > 9 {
            return Err(bad());
        }
        rest = &frac[digits..];
    }
    if !matches!(rest, "Z" | "+00:00" | "-00:00") {
        return Err(bad());
    }
    Ok(format!("{head}Z"))
}

/// `RUN:<timestamp>-<hex>` where `<hex>` hashes the canonical run payload.
pub fn run_id_from_canonical<T: Serialize + ?Sized>(timestamp_utc: &str, payload: &T) -> Result<RunId, IoError> {
    let ts = normalize_rfc3339_utc_seconds(timestamp_utc)?;
    let hex = sha256_canonical(payload)?;
    format!("RUN:{ts}-{hex}")
        .parse()
        .map_err(|e| IoError::Hash(format!("run id: {e}")))
}
