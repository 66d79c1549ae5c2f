// Shared builders for pipeline integration tests.
#![allow(dead_code)]

use ea_core::entities::{Assignment, Course, Selection, Student};
use ea_core::ids::{CourseId, StudentId, TrackId};
use ea_core::variables::EngineParams;
use ea_io::loader::{InputSha256, LoadedContext};
use ea_pipeline::{EngineMeta, PipelineCtx};

pub const TS: &str = "2026-03-02T09:00:00Z";

pub fn sid(s: &str) -> StudentId {
    s.parse().unwrap()
}

pub fn cid(s: &str) -> CourseId {
    s.parse().unwrap()
}

pub fn student(id: &str, level: u8) -> Student {
    Student { id: sid(id), level: Some(level), protected: false }
}

pub fn protected(id: &str, level: u8) -> Student {
    Student { id: sid(id), level: Some(level), protected: true }
}

pub fn course(id: &str, track: u16, capacity: u32) -> Course {
    Course { id: cid(id), name: format!("Course {id}"), track: TrackId(track), capacity }
}

pub fn sel(s: &str, c: &str, rank: u32) -> Selection {
    Selection { student_id: sid(s), course_id: cid(c), rank }
}

pub fn seeded(seed: u64) -> EngineParams {
    EngineParams { tie_seed: Some(seed), ..EngineParams::default() }
}

pub fn ctx(students: Vec<Student>, courses: Vec<Course>, selections: Vec<Selection>, params: EngineParams) -> PipelineCtx {
    let zero = "0".repeat(64);
    PipelineCtx {
        inputs: LoadedContext {
            students,
            courses,
            selections,
            params,
            digests: InputSha256 {
                students: zero.clone(),
                courses: zero.clone(),
                selections: zero.clone(),
                params: zero,
            },
        },
        engine_meta: EngineMeta {
            vendor: "test".into(),
            name: "ea".into(),
            version: "0.0.0".into(),
            build: "test".into(),
        },
        executed_utc: TS.into(),
    }
}

pub fn holders<'a>(assignments: &'a [Assignment], course: &str) -> Vec<&'a str> {
    assignments
        .iter()
        .filter(|a| a.course_id.as_str() == course)
        .map(|a| a.student_id.as_str())
        .collect()
}
