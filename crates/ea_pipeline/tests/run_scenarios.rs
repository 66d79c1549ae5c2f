//! End-to-end runs through `run_with_ctx` / `run_and_commit` with in-memory stores.

mod common;

use std::collections::{BTreeMap, BTreeSet};

use common::*;
use ea_core::entities::PlacementRank;
use ea_core::ids::TrackId;
use ea_core::variables::EngineParams;
use ea_pipeline::{
    audit_outputs, run_and_commit, run_with_ctx, MemoryStore, PipelineError, SeedSource,
};

#[test]
fn priority_students_take_every_seat_they_rank_first() {
    let ctx = ctx(
        vec![student("P1", 4), protected("P2", 3), student("R1", 1), student("R2", 2)],
        vec![course("C-A", 1, 2)],
        vec![sel("P1", "C-A", 1), sel("P2", "C-A", 1), sel("R1", "C-A", 1), sel("R2", "C-A", 1)],
        seeded(7),
    );
    let out = run_with_ctx(&ctx).unwrap();

    assert_eq!(holders(&out.assignments, "C-A"), ["P1", "P2"]);
    assert!(out.assignments.iter().all(|a| a.is_priority && a.rank == PlacementRank::Stated(1)));
    // the course was already full when the first wave reached it
    assert!(out.lottery_log.is_empty());
    assert_eq!(out.stats.priority_students, 2);
    assert_eq!(out.stats.unassigned, 2);
}

#[test]
fn oversubscribed_course_draws_exactly_once() {
    let ctx = ctx(
        vec![student("R1", 1), student("R2", 1), student("R3", 2)],
        vec![course("C-A", 1, 2)],
        vec![sel("R1", "C-A", 1), sel("R2", "C-A", 1), sel("R3", "C-A", 1)],
        seeded(11),
    );
    let out = run_with_ctx(&ctx).unwrap();

    assert_eq!(out.lottery_log.len(), 1);
    let rec = &out.lottery_log[0];
    assert_eq!((rec.candidates, rec.seats, rec.wave), (3, 2, 1));
    assert_eq!(rec.executed_utc, TS);
    let winners: BTreeSet<&str> = rec.winners().map(|s| s.as_str()).collect();
    let losers: Vec<&str> = rec.losers().map(|s| s.as_str()).collect();
    assert_eq!(winners.len(), 2);
    assert_eq!(losers.len(), 1);

    let assigned: BTreeSet<&str> = holders(&out.assignments, "C-A").into_iter().collect();
    assert_eq!(assigned, winners);
    assert!(!assigned.contains(losers[0]));
}

#[test]
fn single_seat_left_after_priority_goes_to_one_lottery_winner() {
    let ctx = ctx(
        vec![student("S1", 4), student("S2", 1), student("S3", 2), student("S4", 3)],
        vec![course("C-A", 1, 2)],
        vec![sel("S1", "C-A", 1), sel("S2", "C-A", 1), sel("S3", "C-A", 1), sel("S4", "C-A", 1)],
        seeded(2026),
    );
    let out = run_with_ctx(&ctx).unwrap();

    assert_eq!(out.assignments.len(), 2);
    let s1 = out.assignments.iter().find(|a| a.student_id == sid("S1")).unwrap();
    assert!(s1.is_priority);

    assert_eq!(out.lottery_log.len(), 1);
    let rec = &out.lottery_log[0];
    assert_eq!((rec.candidates, rec.seats), (3, 1));
    let pool: BTreeSet<&str> = rec.entries.iter().map(|e| e.student_id.as_str()).collect();
    assert_eq!(pool, BTreeSet::from(["S2", "S3", "S4"]));

    let winner = rec.winners().next().unwrap();
    assert!(out.assignments.iter().any(|a| &a.student_id == winner && !a.is_priority));
    assert_eq!(out.stats.unassigned, 2);
    assert_eq!(out.stats.unplaced.len(), 2);
    assert!(out.stats.unplaced.iter().all(|u| u.track == TrackId(1) && &u.student_id != winner));
}

#[test]
fn fallback_leaves_a_track_empty_only_when_it_is_full() {
    let ctx = ctx(
        vec![student("R1", 1), student("R2", 1), student("R3", 1)],
        vec![course("C-A", 1, 1), course("C-B", 1, 1), course("C-X", 2, 1)],
        vec![sel("R1", "C-A", 1), sel("R2", "C-A", 1), sel("R3", "C-A", 1)],
        seeded(5),
    );
    let out = run_with_ctx(&ctx).unwrap();

    let mut load: BTreeMap<&str, u32> = BTreeMap::new();
    for a in &out.assignments {
        *load.entry(a.course_id.as_str()).or_default() += 1;
    }
    for c in &ctx.inputs.courses {
        assert!(load.get(c.id.as_str()).copied().unwrap_or(0) <= c.capacity);
    }

    for s in &ctx.inputs.students {
        for track in [TrackId(1), TrackId(2)] {
            let held = out.assignments.iter().filter(|a| a.student_id == s.id && a.track == track).count();
            assert!(held <= 1);
            if held == 0 {
                let all_full = ctx
                    .inputs
                    .courses
                    .iter()
                    .filter(|c| c.track == track)
                    .all(|c| load.get(c.id.as_str()).copied().unwrap_or(0) == c.capacity);
                assert!(all_full, "{} unplaced in {track} while seats remain", s.id);
            }
        }
    }

    assert_eq!(out.lottery_log.len(), 1);
    assert_eq!(out.stats.fallback_assignments, 2);
    assert_eq!(out.stats.unplaced.len(), 3);
    assert!(out
        .assignments
        .iter()
        .filter(|a| a.course_id == cid("C-B") || a.course_id == cid("C-X"))
        .all(|a| a.rank == PlacementRank::Fallback));
}

#[test]
fn same_seed_same_run() {
    let build = || {
        ctx(
            (1..=12).map(|i| student(&format!("S{i:02}"), (i % 4 + 1) as u8)).collect(),
            vec![course("C-A", 1, 3), course("C-B", 1, 2), course("C-C", 2, 4), course("C-D", 2, 1)],
            (1..=12)
                .flat_map(|i| {
                    let s = format!("S{i:02}");
                    [sel(&s, "C-A", 1), sel(&s, "C-B", 2), sel(&s, "C-D", 1), sel(&s, "C-C", 2)]
                })
                .collect(),
            seeded(42),
        )
    };
    let a = run_with_ctx(&build()).unwrap();
    let b = run_with_ctx(&build()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.run_record.tie_seed, 42);
    assert_eq!(a.run_record.seed_source, SeedSource::Fixed);
    assert!(!a.lottery_log.is_empty());
}

#[test]
fn entropy_seed_is_recorded_and_replays() {
    let students: Vec<_> = (1..=6).map(|i| student(&format!("S{i}"), 1)).collect();
    let selections: Vec<_> = (1..=6).map(|i| sel(&format!("S{i}"), "C-A", 1)).collect();
    let first = ctx(students.clone(), vec![course("C-A", 1, 2)], selections.clone(), EngineParams::default());
    let out = run_with_ctx(&first).unwrap();
    assert_eq!(out.run_record.seed_source, SeedSource::Entropy);
    assert_eq!(out.assignments.len(), 2);

    let replay = ctx(students, vec![course("C-A", 1, 2)], selections, seeded(out.run_record.tie_seed));
    let again = run_with_ctx(&replay).unwrap();
    assert_eq!(again.assignments, out.assignments);
    assert_eq!(again.lottery_log, out.lottery_log);
    assert_ne!(again.run_record.id, out.run_record.id);
}

#[test]
fn no_selections_is_rejected_before_anything_is_stored() {
    let ctx = ctx(vec![student("S1", 4)], vec![course("C-A", 1, 2)], vec![], seeded(1));
    let mut store = MemoryStore::new();
    assert!(matches!(run_and_commit(&ctx, &mut store), Err(PipelineError::InputEmpty)));
    assert!(store.latest_run().is_none());
    assert!(store.assignments().is_empty());
}

#[test]
fn malformed_inputs_abort_the_run() {
    let mut missing_level = student("S2", 1);
    missing_level.level = None;
    let ctx_level = ctx(
        vec![student("S1", 4), missing_level],
        vec![course("C-A", 1, 2)],
        vec![sel("S1", "C-A", 1), sel("S2", "C-A", 1)],
        seeded(1),
    );
    match run_with_ctx(&ctx_level) {
        Err(PipelineError::MalformedRecord(msg)) => assert!(msg.contains("Student.MissingLevel"), "{msg}"),
        other => panic!("expected malformed record, got {other:?}"),
    }

    let ctx_course = ctx(
        vec![student("S1", 4)],
        vec![course("C-A", 1, 2)],
        vec![sel("S1", "C-GONE", 1)],
        seeded(1),
    );
    assert!(matches!(run_with_ctx(&ctx_course), Err(PipelineError::MalformedRecord(_))));
}

#[test]
fn failed_commit_keeps_previous_results() {
    let first = ctx(
        vec![student("S1", 1), student("S2", 1)],
        vec![course("C-A", 1, 2)],
        vec![sel("S1", "C-A", 1), sel("S2", "C-A", 1)],
        seeded(3),
    );
    let mut store = MemoryStore::new();
    let committed = run_and_commit(&first, &mut store).unwrap();

    let second = ctx(
        vec![student("S1", 1), student("S2", 1), student("S3", 1)],
        vec![course("C-A", 1, 1)],
        vec![sel("S1", "C-A", 1), sel("S2", "C-A", 1), sel("S3", "C-A", 1)],
        seeded(4),
    );
    store.arm_failure("disk full");
    match run_and_commit(&second, &mut store) {
        Err(PipelineError::PersistenceFailure(msg)) => assert!(msg.contains("disk full")),
        other => panic!("expected persistence failure, got {other:?}"),
    }
    assert_eq!(store.assignments(), committed.assignments.as_slice());
    assert_eq!(store.latest_run(), Some(&committed.run_record));
    assert_eq!(store.lottery_history().len(), 1);

    // a later successful run replaces the set and adds to history
    let replaced = run_and_commit(&second, &mut store).unwrap();
    assert_eq!(store.assignments(), replaced.assignments.as_slice());
    assert_eq!(store.lottery_history().len(), 2);
}

#[test]
fn audit_accepts_fresh_outputs_and_catches_edits() {
    let ctx = ctx(
        vec![student("R1", 1), student("R2", 1), student("R3", 1)],
        vec![course("C-A", 1, 1), course("C-B", 1, 2)],
        vec![sel("R1", "C-A", 1), sel("R2", "C-A", 1), sel("R3", "C-A", 1), sel("R3", "C-B", 2)],
        seeded(9),
    );
    let out = run_with_ctx(&ctx).unwrap();
    let summary = audit_outputs(&out).unwrap();
    assert_eq!(summary.lotteries, 1);
    assert_eq!((summary.candidates, summary.winners, summary.losers), (3, 1, 2));

    let mut edited = out.clone();
    edited.lottery_log[0].entries.swap(0, 1);
    assert!(matches!(audit_outputs(&edited), Err(PipelineError::Audit(_))));

    let mut dropped = out.clone();
    dropped.assignments.pop();
    assert!(matches!(audit_outputs(&dropped), Err(PipelineError::Audit(_))));

    let mut renamed = out;
    renamed.run_record.engine.build = "other".into();
    assert!(matches!(audit_outputs(&renamed), Err(PipelineError::Audit(_))));
}
