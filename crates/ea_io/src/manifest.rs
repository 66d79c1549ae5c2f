// crates/ea_io/src/manifest.rs
//
// A manifest names the input files of one run: students, courses, selections
// and an optional params file. Paths are resolved relative to the manifest's
// directory; URL schemes are rejected. Optional sha256 expectations are
// checked over the canonical JSON bytes of each file.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::canonical_json::{read_json_value, to_canonical_json_bytes};
use crate::hasher::sha256_hex;
use crate::looks_like_url;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Optional label; not part of any artifact.
    #[serde(default)]
    pub id: Option<String>,

    pub students_path: String,
    pub courses_path: String,
    pub selections_path: String,
    #[serde(default)]
    pub params_path: Option<String>,

    #[serde(default)]
    pub inputs_sha256: Option<InputDigests>,
}

/// Expected lowercase 64-hex digests, keyed like the manifest path fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputDigests {
    #[serde(default)]
    pub students_path: Option<String>,
    #[serde(default)]
    pub courses_path: Option<String>,
    #[serde(default)]
    pub selections_path: Option<String>,
    #[serde(default)]
    pub params_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    pub students_path: PathBuf,
    pub courses_path: PathBuf,
    pub selections_path: PathBuf,
    pub params_path: Option<PathBuf>,
    pub digests: Option<InputDigests>,
}

#[derive(Debug)]
pub enum ManifestError {
    Empty(&'static str),
    UrlPath(&'static str, String),
    Io(&'static str, String),
    NotAFile(&'static str, String),
    DigestShape(&'static str, String),
    DigestMismatch(&'static str, String),
    DigestForMissing(&'static str),
}

impl std::fmt::Display for ManifestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ManifestError::*;
        match self {
            Empty(k) => write!(f, "field must not be empty: {k}"),
            UrlPath(k, v) => write!(f, "path must be local (no scheme) for {k}: {v}"),
            Io(k, v) => write!(f, "cannot access {k}: {v}"),
            NotAFile(k, v) => write!(f, "path is not a file for {k}: {v}"),
            DigestShape(k, v) => write!(f, "invalid sha256 format for {k}: {v}"),
            DigestMismatch(k, v) => write!(f, "sha256 mismatch for {k}: {v}"),
            DigestForMissing(k) => write!(f, "digest supplied for missing input: {k}"),
        }
    }
}

impl std::error::Error for ManifestError {}

const MAX_MANIFEST_BYTES: u64 = 1024 * 1024;

// ---------- validation (shape, offline policy, digest shapes) ----------

fn check_path(label: &'static str, path: &str) -> Result<(), ManifestError> {
    if path.trim().is_empty() {
        return Err(ManifestError::Empty(label));
    }
    if looks_like_url(path) {
        return Err(ManifestError::UrlPath(label, path.to_string()));
    }
    Ok(())
}

fn check_digest(label: &'static str, hex: &Option<String>) -> Result<(), ManifestError> {
    match hex {
        Some(h) if !ea_core::ids::is_valid_sha256(h) => Err(ManifestError::DigestShape(label, h.clone())),
        _ => Ok(()),
    }
}

/// Validate shape and offline policy. No I/O.
pub fn validate_manifest(man: &Manifest) -> Result<(), ManifestError> {
    check_path("students_path", &man.students_path)?;
    check_path("courses_path", &man.courses_path)?;
    check_path("selections_path", &man.selections_path)?;
    if let Some(p) = &man.params_path {
        check_path("params_path", p)?;
    }

    if let Some(d) = &man.inputs_sha256 {
        check_digest("students_path", &d.students_path)?;
        check_digest("courses_path", &d.courses_path)?;
        check_digest("selections_path", &d.selections_path)?;
        check_digest("params_path", &d.params_path)?;
        if d.params_path.is_some() && man.params_path.is_none() {
            return Err(ManifestError::DigestForMissing("params_path"));
        }
    }
    Ok(())
}

// ---------- resolution ----------

fn join_under(base: &Path, rel: &str) -> PathBuf {
    let p = Path::new(rel);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base.join(p)
    }
}

fn must_exist_file(label: &'static str, p: &Path) -> Result<(), ManifestError> {
    let md = fs::metadata(p).map_err(|e| ManifestError::Io(label, format!("{} ({e})", p.display())))?;
    if !md.is_file() {
        return Err(ManifestError::NotAFile(label, p.display().to_string()));
    }
    Ok(())
}

/// Resolve paths under `base_dir` and check each input is an existing file.
pub fn resolve_paths(base_dir: &Path, man: &Manifest) -> Result<ResolvedManifest, ManifestError> {
    let students = join_under(base_dir, &man.students_path);
    let courses = join_under(base_dir, &man.courses_path);
    let selections = join_under(base_dir, &man.selections_path);
    let params = man.params_path.as_deref().map(|s| join_under(base_dir, s));

    must_exist_file("students_path", &students)?;
    must_exist_file("courses_path", &courses)?;
    must_exist_file("selections_path", &selections)?;
    if let Some(p) = &params {
        must_exist_file("params_path", p)?;
    }

    Ok(ResolvedManifest {
        students_path: students,
        courses_path: courses,
        selections_path: selections,
        params_path: params,
        digests: man.inputs_sha256.clone(),
    })
}

// ---------- digests ----------

/// Canonical-JSON sha256 of a JSON file.
pub fn canonical_file_sha256(p: &Path) -> Result<String, ManifestError> {
    let v = read_json_value(p).map_err(|e| ManifestError::Io("read", e.to_string()))?;
    let bytes = to_canonical_json_bytes(&v).map_err(|e| ManifestError::Io("canonicalize", e.to_string()))?;
    Ok(sha256_hex(&bytes))
}

/// Verify every digest the manifest supplies. `Ok(())` when none are given.
pub fn verify_digests(resolved: &ResolvedManifest) -> Result<(), ManifestError> {
    let Some(d) = &resolved.digests else { return Ok(()) };

    fn check_one(path: &Path, expect_hex: &str, label: &'static str) -> Result<(), ManifestError> {
        let got = canonical_file_sha256(path)?;
        if got != expect_hex {
            return Err(ManifestError::DigestMismatch(label, format!("expected={expect_hex} got={got}")));
        }
        Ok(())
    }

    if let Some(hex) = &d.students_path {
        check_one(&resolved.students_path, hex, "students_path")?;
    }
    if let Some(hex) = &d.courses_path {
        check_one(&resolved.courses_path, hex, "courses_path")?;
    }
    if let Some(hex) = &d.selections_path {
        check_one(&resolved.selections_path, hex, "selections_path")?;
    }
    match (&resolved.params_path, &d.params_path) {
        (Some(p), Some(hex)) => check_one(p, hex, "params_path")?,
        (None, Some(_)) => return Err(ManifestError::DigestForMissing("params_path")),
        _ => {}
    }
    Ok(())
}

// ---------- top-level ----------

/// Load → validate → resolve (under the manifest's directory) → verify digests.
pub fn load_verify_manifest(manifest_path: &Path) -> Result<ResolvedManifest, ManifestError> {
    let f = fs::File::open(manifest_path)
        .map_err(|e| ManifestError::Io("read", format!("{} ({e})", manifest_path.display())))?;
    let mut buf = Vec::new();
    f.take(MAX_MANIFEST_BYTES)
        .read_to_end(&mut buf)
        .map_err(|e| ManifestError::Io("read", format!("{} ({e})", manifest_path.display())))?;

    let man: Manifest = serde_json::from_slice(&buf)
        .map_err(|e| ManifestError::Io("parse", format!("{} ({e})", manifest_path.display())))?;
    validate_manifest(&man)?;

    let base = manifest_path
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let resolved = resolve_paths(&base, &man)?;
    verify_digests(&resolved)?;
    Ok(resolved)
}
