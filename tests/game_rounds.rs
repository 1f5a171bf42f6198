mod common;

use std::time::{Duration, Instant};

use pose_round_backend::game::engine::{RoundEnd, TickOutcome, Verdict};
use pose_round_backend::game::GameEngine;

use common::fixtures;

fn finish_round(engine: &mut GameEngine, now: &mut Instant) -> RoundEnd {
    loop {
        *now += Duration::from_secs(1);
        if let TickOutcome::RoundEnded(end) = engine.tick(*now) {
            return end;
        }
    }
}

#[test]
fn matching_pose_at_expiry_scores_and_shortens_next_round() {
    let mut now = Instant::now();
    let mut engine = GameEngine::with_seed(11, now);
    let target = engine.target_pose();

    // Nine seconds of countdown, then the player strikes the pose.
    for _ in 0..9 {
        now += Duration::from_secs(1);
        assert!(matches!(engine.tick(now), TickOutcome::Counting { .. }));
    }
    let progress = engine.observe_frame(&fixtures::frame_for(target));
    assert!(progress >= 0.65, "progress={progress}");

    let end = finish_round(&mut engine, &mut now);
    assert!(matches!(end.verdict, Verdict::Awarded(_)));
    assert!(end.next_pose_needed);
    assert_eq!(engine.session().score, 1);
    assert_eq!(engine.session().lives, 3);
    assert_eq!(engine.round().interval_secs, 9);
    assert_eq!(engine.round().remaining_secs, 9);

    let next = engine.set_pose_idx_different(None);
    assert_ne!(next, target);
}

#[test]
fn three_misses_end_the_game_and_restart_recovers() {
    let mut now = Instant::now();
    let mut engine = GameEngine::with_seed(12, now);

    for expected_lives in [2_u8, 1, 0] {
        engine.observe_frame(&fixtures::torso_only());
        let end = finish_round(&mut engine, &mut now);
        match end.verdict {
            Verdict::Penalized { lives_left, .. } => assert_eq!(lives_left, expected_lives),
            other => panic!("expected a penalty, got {other:?}"),
        }
        if end.next_pose_needed {
            engine.set_pose_idx_different(None);
        }
    }
    assert!(engine.is_game_over());
    assert_eq!(engine.round().remaining_secs, 0);

    now += Duration::from_secs(1);
    assert_eq!(engine.tick(now), TickOutcome::Idle);
    let before = engine.target_pose();
    assert_eq!(engine.set_pose_idx_different(Some("T-Pose")), before);

    engine.restart(now);
    let snap = engine.snapshot(now);
    assert_eq!(snap.lives, 3);
    assert_eq!(snap.score, 0);
    assert_eq!(snap.interval_secs, 10);
    assert_eq!(snap.remaining_secs, 10);
    assert!(!snap.game_over);
    assert!(snap.award_lock_held && snap.life_lock_held);
    assert_ne!(snap.target_pose, before);

    // Restart grace swallows a stray penalty, then normal play resumes.
    assert_eq!(engine.penalize(now + Duration::from_millis(500)), None);
    assert_eq!(engine.session().lives, 3);
    assert_eq!(engine.penalize(now + Duration::from_millis(1300)), Some(2));
}

#[test]
fn duplicate_award_within_round_is_ignored() {
    let now = Instant::now();
    let mut engine = GameEngine::with_seed(13, now);

    assert!(engine.award(now).is_some());
    assert!(engine.award(now + Duration::from_millis(100)).is_none());
    assert!(engine.award(now + Duration::from_secs(5)).is_none());
    assert_eq!(engine.session().score, 1);
    assert_eq!(engine.round().interval_secs, 9);
}

#[test]
fn snapshot_serializes_in_camel_case() {
    let now = Instant::now();
    let engine = GameEngine::with_seed(14, now);
    let json = serde_json::to_value(engine.snapshot(now)).unwrap();

    for key in [
        "targetPose",
        "remainingSecs",
        "intervalSecs",
        "progress",
        "poseMatched",
        "round",
        "lives",
        "score",
        "gameOver",
    ] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert!(fixtures::selectable_names().contains(&json["targetPose"].as_str().unwrap()));
}
