//! Loader: read local JSON inputs (manifest → students → courses → selections
//! → params), turn wire records into typed `ea_core` records, and return a
//! `LoadedContext` for the pipeline. No network I/O.
//!
//! Wire shapes (top-level arrays):
//! - students:   `{"id", "level"?, "protected"?}`
//! - courses:    `{"id", "name"?, "track", "capacity"}`
//! - selections: `{"student_id", "course_id", "rank"}`
//!
//! A student's `level` may be absent here; the classifier rejects it later.
//! Every other missing required field is reported with the record's index.

use std::path::{Path, PathBuf};

use ea_core::entities::{Course, Selection, Student};
use ea_core::ids::{CourseId, TrackId};
use ea_core::variables::EngineParams;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::canonical_json::{read_json_value, to_canonical_json_bytes};
use crate::hasher::{sha256_canonical, sha256_hex};
use crate::manifest::{self as man, ResolvedManifest};
use crate::IoError;

/// SHA-256 of each input's canonical JSON; params hash covers the effective params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSha256 {
    pub students: String,
    pub courses: String,
    pub selections: String,
    pub params: String,
}

#[derive(Debug, Clone)]
pub struct LoadedContext {
    pub students: Vec<Student>,
    pub courses: Vec<Course>,
    pub selections: Vec<Selection>,
    pub params: EngineParams,
    pub digests: InputSha256,
}

/// Explicit input paths, for callers that do not use a manifest.
#[derive(Debug, Clone)]
pub struct InputPaths {
    pub students: PathBuf,
    pub courses: PathBuf,
    pub selections: PathBuf,
    pub params: Option<PathBuf>,
}

impl From<ResolvedManifest> for InputPaths {
    fn from(r: ResolvedManifest) -> Self {
        Self {
            students: r.students_path,
            courses: r.courses_path,
            selections: r.selections_path,
            params: r.params_path,
        }
    }
}

// ----------------------------- Wire records -----------------------------

#[derive(Deserialize)]
struct RawStudent {
    id: Option<String>,
    #[serde(default)]
    level: Option<u8>,
    #[serde(default)]
    protected: bool,
}

#[derive(Deserialize)]
struct RawCourse {
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    track: Option<u16>,
    capacity: Option<u32>,
}

#[derive(Deserialize)]
struct RawSelection {
    student_id: Option<String>,
    course_id: Option<String>,
    rank: Option<u32>,
}

// ----------------------------- Orchestration -----------------------------

/// Manifest → resolved paths (digests verified) → typed inputs.
pub fn load_all_from_manifest(path: &Path) -> Result<LoadedContext, IoError> {
    let resolved = man::load_verify_manifest(path)?;
    load_all(&InputPaths::from(resolved))
}

pub fn load_all(paths: &InputPaths) -> Result<LoadedContext, IoError> {
    let (students, students_sha) = load_students(&paths.students)?;
    let (courses, courses_sha) = load_courses(&paths.courses)?;
    let (selections, selections_sha) = load_selections(&paths.selections)?;
    let params = match &paths.params {
        Some(p) => load_params(p)?,
        None => EngineParams::default(),
    };
    let params_sha = sha256_canonical(&params)?;
    debug!(
        students = students.len(),
        courses = courses.len(),
        selections = selections.len(),
        "inputs loaded"
    );

    Ok(LoadedContext {
        students,
        courses,
        selections,
        params,
        digests: InputSha256 {
            students: students_sha,
            courses: courses_sha,
            selections: selections_sha,
            params: params_sha,
        },
    })
}

// ----------------------------- Targeted loaders -----------------------------

pub fn load_students(path: &Path) -> Result<(Vec<Student>, String), IoError> {
    let (items, sha) = read_array(path)?;
    let students = parse_records(items, "student", |i, r: RawStudent| {
        Ok(Student {
            id: token(required(r.id, "student", i, "id")?, "student", i)?,
            level: r.level,
            protected: r.protected,
        })
    })?;
    Ok((students, sha))
}

pub fn load_courses(path: &Path) -> Result<(Vec<Course>, String), IoError> {
    let (items, sha) = read_array(path)?;
    let courses = parse_records(items, "course", |i, r: RawCourse| {
        let id: CourseId = token(required(r.id, "course", i, "id")?, "course", i)?;
        let track = required(r.track, "course", i, "track")?;
        if track == 0 {
            return Err(record_err("course", i, "track must be positive"));
        }
        Ok(Course {
            name: r.name.unwrap_or_else(|| id.to_string()),
            id,
            track: TrackId(track),
            capacity: required(r.capacity, "course", i, "capacity")?,
        })
    })?;
    Ok((courses, sha))
}

pub fn load_selections(path: &Path) -> Result<(Vec<Selection>, String), IoError> {
    let (items, sha) = read_array(path)?;
    let selections = parse_records(items, "selection", |i, r: RawSelection| {
        Ok(Selection {
            student_id: token(required(r.student_id, "selection", i, "student_id")?, "selection", i)?,
            course_id: token(required(r.course_id, "selection", i, "course_id")?, "selection", i)?,
            rank: required(r.rank, "selection", i, "rank")?,
        })
    })?;
    Ok((selections, sha))
}

pub fn load_params(path: &Path) -> Result<EngineParams, IoError> {
    let v = read_json_value(path)?;
    let params: EngineParams = serde_json::from_value(v).map_err(|e| IoError::Json {
        pointer: path.display().to_string(),
        msg: e.to_string(),
    })?;
    params
        .validate_domains()
        .map_err(|e| IoError::Invalid(format!("params: {e}")))?;
    Ok(params)
}

/// Read back any JSON artifact (used for stored assignments / lottery logs).
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, IoError> {
    let v = read_json_value(path)?;
    serde_json::from_value(v).map_err(|e| IoError::Json {
        pointer: path.display().to_string(),
        msg: e.to_string(),
    })
}

// ----------------------------- Helpers -----------------------------

fn read_array(path: &Path) -> Result<(Vec<Value>, String), IoError> {
    let v = read_json_value(path)?;
    let sha = sha256_hex(&to_canonical_json_bytes(&v)?);
    match v {
        Value::Array(items) => Ok((items, sha)),
        _ => Err(IoError::Invalid(format!("{}: expected a JSON array", path.display()))),
    }
}

fn parse_records<R, T, F>(items: Vec<Value>, kind: &'static str, mut f: F) -> Result<Vec<T>, IoError>
where
    R: DeserializeOwned,
    F: FnMut(usize, R) -> Result<T, IoError>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            let raw: R = serde_json::from_value(v).map_err(|e| record_err(kind, i, &e.to_string()))?;
            f(i, raw)
        })
        .collect()
}

fn record_err(kind: &'static str, index: usize, msg: &str) -> IoError {
    IoError::Record { kind, index, msg: msg.to_string() }
}

fn required<T>(v: Option<T>, kind: &'static str, index: usize, field: &str) -> Result<T, IoError> {
    v.ok_or_else(|| record_err(kind, index, &format!("missing field `{field}`")))
}

fn token<T>(s: String, kind: &'static str, index: usize) -> Result<T, IoError>
where
    T: TryFrom<String, Error = ea_core::ids::IdError>,
{
    T::try_from(s.clone()).map_err(|e| record_err(kind, index, &format!("bad id {s:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, body).unwrap();
        p
    }

    fn paths(dir: &Path, students: &str, courses: &str, selections: &str) -> InputPaths {
        InputPaths {
            students: write(dir, "students.json", students),
            courses: write(dir, "courses.json", courses),
            selections: write(dir, "selections.json", selections),
            params: None,
        }
    }

    #[test]
    fn loads_typed_records() {
        let dir = tempfile::tempdir().unwrap();
        let p = paths(
            dir.path(),
            r#"[{"id":"s1","level":4},{"id":"s2","level":3,"protected":true},{"id":"s3"}]"#,
            r#"[{"id":"C-ART","name":"Art","track":1,"capacity":42},{"id":"C-LAB","track":2,"capacity":0}]"#,
            r#"[{"student_id":"s1","course_id":"C-ART","rank":1}]"#,
        );
        let ctx = load_all(&p).unwrap();
        assert_eq!(ctx.students.len(), 3);
        assert!(ctx.students[1].protected);
        assert_eq!(ctx.students[2].level, None);
        assert_eq!(ctx.courses[1].name, "C-LAB");
        assert_eq!(ctx.courses[1].capacity, 0);
        assert_eq!(ctx.selections[0].rank, 1);
        assert_eq!(ctx.params, EngineParams::default());
        assert_eq!(ctx.digests.selections.len(), 64);
    }

    #[test]
    fn missing_selection_field_names_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let p = paths(
            dir.path(),
            r#"[{"id":"s1","level":4}]"#,
            r#"[{"id":"C-ART","track":1,"capacity":1}]"#,
            r#"[{"student_id":"s1","course_id":"C-ART","rank":1},{"student_id":"s1","rank":2}]"#,
        );
        match load_all(&p) {
            Err(IoError::Record { kind, index, msg }) => {
                assert_eq!((kind, index), ("selection", 1));
                assert!(msg.contains("course_id"), "{msg}");
            }
            other => panic!("expected record error, got {other:?}"),
        }
    }

    #[test]
    fn bad_values_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let p = paths(dir.path(), r#"[{"id":"s 1"}]"#, "[]", "[]");
        assert!(matches!(load_all(&p), Err(IoError::Record { kind: "student", index: 0, .. })));

        let p = paths(dir.path(), "[]", r#"[{"id":"C","track":0,"capacity":1}]"#, "[]");
        assert!(matches!(load_all(&p), Err(IoError::Record { kind: "course", .. })));

        let p = paths(dir.path(), "[]", r#"[{"id":"C","track":1,"capacity":-1}]"#, "[]");
        assert!(matches!(load_all(&p), Err(IoError::Record { kind: "course", .. })));

        let p = paths(dir.path(), r#"{"students":[]}"#, "[]", "[]");
        assert!(matches!(load_all(&p), Err(IoError::Invalid(_))));
    }

    #[test]
    fn params_file_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(dir.path(), "params.json", r#"{"tie_seed":42,"required_tracks":[1,2]}"#);
        let p = load_params(&good).unwrap();
        assert_eq!(p.tie_seed, Some(42));
        assert_eq!(p.required_tracks, Some(vec![TrackId(1), TrackId(2)]));

        let bad = write(dir.path(), "bad.json", r#"{"senior_level":0}"#);
        assert!(matches!(load_params(&bad), Err(IoError::Invalid(_))));
    }

    #[test]
    fn digest_ignores_key_order_and_whitespace() {
        let dir = tempfile::tempdir().unwrap();
        let a = write(dir.path(), "a.json", r#"[{"id":"s1","level":4}]"#);
        let b = write(dir.path(), "b.json", "[ { \"level\": 4, \"id\": \"s1\" } ]");
        assert_eq!(load_students(&a).unwrap().1, load_students(&b).unwrap().1);
    }
}
