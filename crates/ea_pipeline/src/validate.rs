//! crates/ea_pipeline/src/validate.rs
//! Structural & semantic checks on loaded inputs before any allocation.
//! Pure, deterministic, no RNG. Errors abort the run; warnings are reported.

use std::collections::{BTreeMap, BTreeSet};

use ea_core::entities::{Course, Selection, Student, FALLBACK_RANK_SENTINEL};
use ea_core::ids::{CourseId, StudentId, TrackId};
use ea_core::variables::EngineParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

/// Where the issue occurred.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityRef {
    Root,
    Student(StudentId),
    Course(CourseId),
    /// Index into the selections input.
    Selection(usize),
    Param(&'static str),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub where_: EntityRef,
}

/// pass = no Error-severity issue.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub pass: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> + '_ {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

pub fn validate(
    students: &[Student],
    courses: &[Course],
    selections: &[Selection],
    params: &EngineParams,
) -> ValidationReport {
    let mut issues = Vec::new();

    if selections.is_empty() {
        issues.push(err("Selections.Empty", "no selections submitted", EntityRef::Root));
    }
    issues.extend(check_params(params, courses));
    issues.extend(check_students(students));
    issues.extend(check_courses(courses));
    issues.extend(check_selections(students, courses, selections));

    sort_issues_stably(&mut issues);
    ValidationReport {
        pass: !issues.iter().any(|i| i.severity == Severity::Error),
        issues,
    }
}

// ------------------------------------------------------------------------------------------------
// Checks
// ------------------------------------------------------------------------------------------------

fn check_params(params: &EngineParams, courses: &[Course]) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    if let Err(e) = params.validate_domains() {
        out.push(err("Params.Domain", &e.to_string(), EntityRef::Param("params")));
    }
    if let Some(tracks) = &params.required_tracks {
        let catalog: BTreeSet<TrackId> = courses.iter().map(|c| c.track).collect();
        for t in tracks.iter().filter(|t| !catalog.contains(t)) {
            out.push(warn(
                "Params.TrackWithoutCourses",
                &format!("required track {t} has no courses; every student stays unplaced there"),
                EntityRef::Param("required_tracks"),
            ));
        }
    }
    out
}

fn check_students(students: &[Student]) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for s in students {
        if !seen.insert(&s.id) {
            out.push(err("Student.Duplicate", &format!("student {} listed twice", s.id), EntityRef::Student(s.id.clone())));
        }
        if s.level.is_none() {
            out.push(err("Student.MissingLevel", &format!("student {} has no level", s.id), EntityRef::Student(s.id.clone())));
        }
    }
    out
}

fn check_courses(courses: &[Course]) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    let mut seen = BTreeSet::new();
    for c in courses {
        if !seen.insert(&c.id) {
            out.push(err("Course.Duplicate", &format!("course {} listed twice", c.id), EntityRef::Course(c.id.clone())));
        }
        if c.capacity == 0 {
            out.push(warn("Course.ZeroCapacity", &format!("course {} has no seats", c.id), EntityRef::Course(c.id.clone())));
        }
    }
    out
}

/// Rank domain, referential integrity, and per-student uniqueness:
/// one course per (track, rank) and each course at most once.
fn check_selections(students: &[Student], courses: &[Course], selections: &[Selection]) -> Vec<ValidationIssue> {
    let mut out = Vec::new();
    let known_students: BTreeSet<&StudentId> = students.iter().map(|s| &s.id).collect();
    let track_of: BTreeMap<&CourseId, TrackId> = courses.iter().map(|c| (&c.id, c.track)).collect();

    let mut ranks_seen: BTreeSet<(&StudentId, TrackId, u32)> = BTreeSet::new();
    let mut courses_seen: BTreeSet<(&StudentId, &CourseId)> = BTreeSet::new();

    for (i, sel) in selections.iter().enumerate() {
        let at = EntityRef::Selection(i);
        if sel.rank == 0 {
            out.push(err("Selection.ZeroRank", "rank must be at least 1", at.clone()));
        } else if sel.rank >= FALLBACK_RANK_SENTINEL {
            out.push(err(
                "Selection.RankReserved",
                &format!("rank {} is reserved for fallback placements (max {})", sel.rank, FALLBACK_RANK_SENTINEL - 1),
                at.clone(),
            ));
        }
        if !known_students.contains(&sel.student_id) {
            out.push(err("Selection.UnknownStudent", &format!("unknown student {}", sel.student_id), at.clone()));
        }
        let Some(&track) = track_of.get(&sel.course_id) else {
            out.push(err("Selection.UnknownCourse", &format!("unknown course {}", sel.course_id), at));
            continue;
        };
        if !courses_seen.insert((&sel.student_id, &sel.course_id)) {
            out.push(err(
                "Selection.DuplicateCourse",
                &format!("student {} selected course {} more than once", sel.student_id, sel.course_id),
                at.clone(),
            ));
        }
        if !ranks_seen.insert((&sel.student_id, track, sel.rank)) {
            out.push(err(
                "Selection.DuplicateRank",
                &format!("student {} used rank {} twice in track {track}", sel.student_id, sel.rank),
                at,
            ));
        }
    }

    let selecting: BTreeSet<&StudentId> = selections.iter().map(|s| &s.student_id).collect();
    let silent = students.iter().filter(|s| !selecting.contains(&s.id)).count();
    if silent > 0 {
        out.push(warn(
            "Students.WithoutSelections",
            &format!("{silent} student(s) submitted no selections"),
            EntityRef::Root,
        ));
    }
    out
}

// ------------------------------------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------------------------------------

fn err(code: &'static str, msg: &str, where_: EntityRef) -> ValidationIssue {
    ValidationIssue { severity: Severity::Error, code, message: msg.to_string(), where_ }
}

fn warn(code: &'static str, msg: &str, where_: EntityRef) -> ValidationIssue {
    ValidationIssue { severity: Severity::Warning, code, message: msg.to_string(), where_ }
}

/// Severity, then code, then location, then message.
fn sort_issues_stably(issues: &mut [ValidationIssue]) {
    issues.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.code.cmp(b.code))
            .then_with(|| a.where_.cmp(&b.where_))
            .then_with(|| a.message.cmp(&b.message))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn st(id: &str, level: Option<u8>) -> Student {
        Student { id: id.parse().unwrap(), level, protected: false }
    }
    fn course(id: &str, track: u16, capacity: u32) -> Course {
        Course { id: id.parse().unwrap(), name: id.into(), track: TrackId(track), capacity }
    }
    fn sel(s: &str, c: &str, rank: u32) -> Selection {
        Selection { student_id: s.parse().unwrap(), course_id: c.parse().unwrap(), rank }
    }

    #[test]
    fn clean_inputs_pass() {
        let r = validate(
            &[st("s1", Some(4)), st("s2", Some(1))],
            &[course("C-A", 1, 2), course("C-B", 2, 2)],
            &[sel("s1", "C-A", 1), sel("s1", "C-B", 1), sel("s2", "C-A", 1)],
            &EngineParams::default(),
        );
        assert!(r.pass, "{:?}", r.issues);
        assert_eq!(r.errors().count(), 0);
    }

    #[test]
    fn empty_selections_is_an_error() {
        let r = validate(&[st("s1", Some(4))], &[course("C-A", 1, 2)], &[], &EngineParams::default());
        assert!(!r.pass);
        assert!(r.has_code("Selections.Empty"));
    }

    #[test]
    fn selection_problems_are_all_reported() {
        let r = validate(
            &[st("s1", Some(4))],
            &[course("C-A", 1, 2), course("C-B", 1, 2)],
            &[
                sel("s1", "C-A", 1),
                sel("s1", "C-B", 1),  // same track, same rank
                sel("s1", "C-A", 2),  // same course again
                sel("s1", "C-X", 3),  // unknown course
                sel("ghost", "C-A", 1),
                sel("s1", "C-B", 0),
                sel("s1", "C-B", 99),
            ],
            &EngineParams::default(),
        );
        assert!(!r.pass);
        for code in [
            "Selection.DuplicateRank",
            "Selection.DuplicateCourse",
            "Selection.UnknownCourse",
            "Selection.UnknownStudent",
            "Selection.ZeroRank",
            "Selection.RankReserved",
        ] {
            assert!(r.has_code(code), "missing {code}: {:?}", r.issues);
        }
    }

    #[test]
    fn missing_level_and_duplicates() {
        let r = validate(
            &[st("s1", None), st("s2", Some(1)), st("s2", Some(1))],
            &[course("C-A", 1, 0), course("C-A", 1, 1)],
            &[sel("s2", "C-A", 1)],
            &EngineParams::default(),
        );
        assert!(r.has_code("Student.MissingLevel"));
        assert!(r.has_code("Student.Duplicate"));
        assert!(r.has_code("Course.Duplicate"));
        assert!(r.warnings().any(|i| i.code == "Course.ZeroCapacity"));
        assert!(r.warnings().any(|i| i.code == "Students.WithoutSelections"));
        // errors sort ahead of warnings
        assert_eq!(r.issues[0].severity, Severity::Error);
    }

    #[test]
    fn required_track_without_courses_warns() {
        let params = EngineParams { required_tracks: Some(vec![TrackId(1), TrackId(4)]), ..Default::default() };
        let r = validate(&[st("s1", Some(1))], &[course("C-A", 1, 1)], &[sel("s1", "C-A", 1)], &params);
        assert!(r.pass);
        assert!(r.has_code("Params.TrackWithoutCourses"));
    }
}
