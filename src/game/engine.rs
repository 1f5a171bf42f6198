use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::constants::{
    INITIAL_INTERVAL_SECS, MAX_LIVES, MIN_INTERVAL_SECS, RESTART_GRACE_MS, ROUND_LOCK_WINDOW_MS,
    SUCCESS_THRESHOLD,
};
use crate::game::guards::ActionLock;
use crate::game::selector::{choose_different, random_pose};
use crate::pose::{Landmark, LandmarkSmoother, PoseDefinition};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    pub target_pose: PoseDefinition,
    pub remaining_secs: u32,
    pub interval_secs: u32,
    pub progress: f64,
    /// Round token, starts at 1 and grows by one per round and per restart.
    pub round: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub lives: u8,
    pub score: u32,
    pub game_over: bool,
    /// Leaderboard `completedCount` from the last successful commit.
    pub completed_total: Option<u64>,
}

/// Everything a client needs to render the game, one message per update.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub target_pose: PoseDefinition,
    pub remaining_secs: u32,
    pub interval_secs: u32,
    pub progress: f64,
    pub pose_matched: bool,
    pub round: u64,
    pub lives: u8,
    pub score: u32,
    pub game_over: bool,
    pub award_lock_held: bool,
    pub life_lock_held: bool,
    pub completed_total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Award {
    pub round: u64,
    pub pose: PoseDefinition,
    pub score: u32,
    pub interval_secs: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Awarded(Award),
    AwardSuppressed,
    Penalized { lives_left: u8, game_over: bool },
    PenaltySuppressed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundEnd {
    pub round: u64,
    pub pose: PoseDefinition,
    pub progress: f64,
    pub verdict: Verdict,
    /// The caller must pick the next target (`set_pose_idx_different`).
    pub next_pose_needed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Game over; nothing counts down.
    Idle,
    Counting { remaining_secs: u32 },
    RoundEnded(RoundEnd),
}

/// Round/lives/timer state machine for one play session.
///
/// The engine never reads the clock; every time-dependent call takes `now`.
pub struct GameEngine {
    round: RoundState,
    session: SessionState,
    smoother: LandmarkSmoother,
    pose_matched: bool,
    award_lock: ActionLock,
    life_lock: ActionLock,
    rng: StdRng,
}

impl GameEngine {
    pub fn new(now: Instant) -> Self {
        Self::with_rng(StdRng::from_entropy(), now)
    }

    pub fn with_seed(seed: u64, now: Instant) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), now)
    }

    fn with_rng(mut rng: StdRng, now: Instant) -> Self {
        let window = Duration::from_millis(ROUND_LOCK_WINDOW_MS);
        let target_pose = random_pose(&mut rng);
        Self {
            round: RoundState {
                target_pose,
                remaining_secs: INITIAL_INTERVAL_SECS,
                interval_secs: INITIAL_INTERVAL_SECS,
                progress: 0.0,
                round: 1,
            },
            session: SessionState {
                lives: MAX_LIVES,
                score: 0,
                game_over: false,
                completed_total: None,
            },
            smoother: LandmarkSmoother::default(),
            pose_matched: false,
            award_lock: ActionLock::new("award", window, now),
            life_lock: ActionLock::new("life", window, now),
            rng,
        }
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn target_pose(&self) -> PoseDefinition {
        self.round.target_pose
    }

    pub fn is_game_over(&self) -> bool {
        self.session.game_over
    }

    /// Smooths one frame, scores it against the target and stores the progress.
    pub fn observe_frame(&mut self, raw: &[Landmark]) -> f64 {
        let smoothed = self.smoother.apply(raw);
        let pose = self.round.target_pose;
        self.round.progress = pose.score(&smoothed);
        self.pose_matched = pose.matches(&smoothed);
        self.round.progress
    }

    /// One timer tick (1 Hz).
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if self.session.game_over {
            self.round.remaining_secs = 0;
            return TickOutcome::Idle;
        }

        self.round.remaining_secs = self.round.remaining_secs.saturating_sub(1);
        if self.round.remaining_secs > 0 {
            return TickOutcome::Counting {
                remaining_secs: self.round.remaining_secs,
            };
        }

        let round = self.round.round;
        let pose = self.round.target_pose;
        let progress = self.round.progress;

        let verdict = if progress >= SUCCESS_THRESHOLD {
            match self.award(now) {
                Some(award) => Verdict::Awarded(award),
                None => Verdict::AwardSuppressed,
            }
        } else {
            match self.penalize(now) {
                Some(lives_left) => Verdict::Penalized {
                    lives_left,
                    game_over: self.session.game_over,
                },
                None => Verdict::PenaltySuppressed,
            }
        };

        let next_pose_needed = if self.session.game_over {
            self.round.remaining_secs = 0;
            false
        } else {
            self.round.remaining_secs = self.round.interval_secs;
            self.round.round += 1;
            true
        };

        tracing::info!(
            round,
            pose = %pose,
            progress,
            verdict = ?verdict,
            lives = self.session.lives,
            score = self.session.score,
            "Round ended"
        );

        TickOutcome::RoundEnded(RoundEnd {
            round,
            pose,
            progress,
            verdict,
            next_pose_needed,
        })
    }

    /// Score +1 and shorten the interval, at most once per round.
    pub fn award(&mut self, now: Instant) -> Option<Award> {
        if self.session.game_over {
            return None;
        }
        if self.award_lock.try_acquire(self.round.round, now).is_err() {
            tracing::info!(round = self.round.round, "Award already processed, skipping");
            return None;
        }

        self.session.score += 1;
        self.round.interval_secs = self
            .round
            .interval_secs
            .saturating_sub(1)
            .max(MIN_INTERVAL_SECS);

        Some(Award {
            round: self.round.round,
            pose: self.round.target_pose,
            score: self.session.score,
            interval_secs: self.round.interval_secs,
        })
    }

    /// Lose one life, at most once per round. Returns the lives left.
    pub fn penalize(&mut self, now: Instant) -> Option<u8> {
        if self.session.game_over {
            return None;
        }
        if self.life_lock.try_acquire(self.round.round, now).is_err() {
            tracing::info!(round = self.round.round, "Life loss already processed, skipping");
            return None;
        }

        self.session.lives = self.session.lives.saturating_sub(1);
        if self.session.lives == 0 {
            self.session.game_over = true;
            self.round.remaining_secs = 0;
            tracing::info!(score = self.session.score, "Game over");
        }
        Some(self.session.lives)
    }

    /// Switches to a new target that differs from the current one.
    ///
    /// `requested` is a pose name from the control channel, if any. A new
    /// target starts from zero progress and a fresh smoother.
    pub fn set_pose_idx_different(&mut self, requested: Option<&str>) -> PoseDefinition {
        if self.session.game_over {
            return self.round.target_pose;
        }
        let next = choose_different(self.round.target_pose, requested, &mut self.rng);
        self.begin_target(next);
        next
    }

    fn begin_target(&mut self, pose: PoseDefinition) {
        self.round.target_pose = pose;
        self.round.progress = 0.0;
        self.pose_matched = false;
        self.smoother.reset();
    }

    pub fn restart(&mut self, now: Instant) {
        self.session.lives = MAX_LIVES;
        self.session.game_over = false;
        self.session.score = 0;
        self.round.interval_secs = INITIAL_INTERVAL_SECS;
        self.round.remaining_secs = INITIAL_INTERVAL_SECS;
        self.round.round += 1;

        let next = choose_different(self.round.target_pose, None, &mut self.rng);
        self.begin_target(next);

        let grace = Duration::from_millis(RESTART_GRACE_MS);
        self.award_lock.force_hold(now, grace);
        self.life_lock.force_hold(now, grace);

        tracing::info!(round = self.round.round, pose = %next, "Game restarted");
    }

    pub fn record_completed_total(&mut self, completed: u64) {
        self.session.completed_total = Some(completed);
    }

    pub fn snapshot(&self, now: Instant) -> GameSnapshot {
        GameSnapshot {
            target_pose: self.round.target_pose,
            remaining_secs: self.round.remaining_secs,
            interval_secs: self.round.interval_secs,
            progress: self.round.progress,
            pose_matched: self.pose_matched,
            round: self.round.round,
            lives: self.session.lives,
            score: self.session.score,
            game_over: self.session.game_over,
            award_lock_held: self.award_lock.is_held(now),
            life_lock_held: self.life_lock.is_held(now),
            completed_total: self.session.completed_total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::scorer::fixtures;

    fn engine(now: Instant) -> GameEngine {
        GameEngine::with_seed(42, now)
    }

    /// Ticks until the current round ends and returns that outcome.
    fn run_round(e: &mut GameEngine, start: Instant) -> (RoundEnd, Instant) {
        let mut now = start;
        loop {
            now += Duration::from_secs(1);
            if let TickOutcome::RoundEnded(end) = e.tick(now) {
                return (end, now);
            }
        }
    }

    fn pose_frame(pose: PoseDefinition) -> Vec<Landmark> {
        match pose {
            PoseDefinition::TPose => fixtures::t_pose(),
            PoseDefinition::YPose => fixtures::y_pose(),
            PoseDefinition::ArmsDown => fixtures::arms_down(),
            PoseDefinition::LPose => fixtures::l_pose(),
        }
    }

    #[test]
    fn starts_in_initial_state() {
        let e = engine(Instant::now());
        assert_eq!(e.session().lives, 3);
        assert_eq!(e.round().interval_secs, 10);
        assert_eq!(e.round().remaining_secs, 10);
        assert!(e.target_pose().is_selectable());
        assert!(!e.is_game_over());
    }

    #[test]
    fn tick_counts_down_without_ending() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        assert_eq!(
            e.tick(t0 + Duration::from_secs(1)),
            TickOutcome::Counting { remaining_secs: 9 }
        );
    }

    #[test]
    fn successful_round_awards_and_shortens_interval() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        let prior = e.target_pose();
        e.observe_frame(&pose_frame(prior));
        assert!(e.round().progress >= SUCCESS_THRESHOLD);

        let (end, _) = run_round(&mut e, t0);
        match end.verdict {
            Verdict::Awarded(ref a) => {
                assert_eq!(a.score, 1);
                assert_eq!(a.interval_secs, 9);
            }
            ref other => panic!("unexpected verdict {other:?}"),
        }
        assert!(end.next_pose_needed);
        assert_eq!(e.round().remaining_secs, 9);
        assert_eq!(e.session().score, 1);

        let next = e.set_pose_idx_different(None);
        assert_ne!(next, prior);
        assert_eq!(e.round().progress, 0.0);
    }

    #[test]
    fn progress_at_expiry_uses_latest_frame() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        e.round.progress = 0.7;
        e.round.remaining_secs = 1;
        let outcome = e.tick(t0 + Duration::from_secs(1));
        assert!(matches!(
            outcome,
            TickOutcome::RoundEnded(RoundEnd {
                verdict: Verdict::Awarded(_),
                ..
            })
        ));
    }

    #[test]
    fn interval_is_floored_at_minimum() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        let mut now = t0;
        for expected in [9, 8, 7, 6, 5, 4, 3, 3, 3] {
            e.round.progress = 1.0;
            let (_, at) = run_round(&mut e, now);
            now = at + Duration::from_secs(2);
            assert_eq!(e.round().interval_secs, expected);
        }
    }

    #[test]
    fn failed_round_costs_a_life() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        e.round.progress = 0.2;
        let (end, _) = run_round(&mut e, t0);
        assert_eq!(
            end.verdict,
            Verdict::Penalized {
                lives_left: 2,
                game_over: false
            }
        );
        assert_eq!(e.round().remaining_secs, 10);
        assert!(end.next_pose_needed);
    }

    #[test]
    fn last_life_ends_the_game() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        e.session.lives = 1;
        e.round.progress = 0.2;
        let pose = e.target_pose();

        let (end, at) = run_round(&mut e, t0);
        assert_eq!(
            end.verdict,
            Verdict::Penalized {
                lives_left: 0,
                game_over: true
            }
        );
        assert!(!end.next_pose_needed);
        assert!(e.is_game_over());
        assert_eq!(e.round().remaining_secs, 0);

        assert_eq!(e.tick(at + Duration::from_secs(1)), TickOutcome::Idle);
        assert_eq!(e.set_pose_idx_different(None), pose);
        assert_eq!(e.target_pose(), pose);
        assert_eq!(e.round().remaining_secs, 0);
    }

    #[test]
    fn lives_never_go_negative() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        let mut now = t0;
        for _ in 0..3 {
            e.round.progress = 0.0;
            let (_, at) = run_round(&mut e, now);
            now = at + Duration::from_secs(2);
        }
        assert_eq!(e.session().lives, 0);
        assert!(e.is_game_over());
        assert_eq!(e.penalize(now), None);
        assert_eq!(e.session().lives, 0);
    }

    #[test]
    fn double_award_in_window_mutates_once() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        assert!(e.award(t0).is_some());
        assert!(e.award(t0 + Duration::from_millis(500)).is_none());
        assert_eq!(e.session().score, 1);
        assert_eq!(e.round().interval_secs, 9);
    }

    #[test]
    fn double_penalty_in_window_mutates_once() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        assert_eq!(e.penalize(t0), Some(2));
        assert_eq!(e.penalize(t0 + Duration::from_millis(100)), None);
        assert_eq!(e.session().lives, 2);
    }

    #[test]
    fn restart_resets_everything() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        e.session.lives = 0;
        e.session.game_over = true;
        e.session.score = 4;
        e.round.interval_secs = 5;
        e.round.remaining_secs = 0;
        e.round.progress = 0.9;
        let before = e.target_pose();

        let now = t0 + Duration::from_secs(30);
        e.restart(now);

        assert_eq!(e.session().lives, 3);
        assert!(!e.is_game_over());
        assert_eq!(e.session().score, 0);
        assert_eq!(e.round().interval_secs, 10);
        assert_eq!(e.round().remaining_secs, 10);
        assert_eq!(e.round().progress, 0.0);
        assert_ne!(e.target_pose(), before);

        let snap = e.snapshot(now + Duration::from_millis(1299));
        assert!(snap.award_lock_held);
        assert!(snap.life_lock_held);
        assert!(e.penalize(now + Duration::from_millis(1000)).is_none());
        assert!(!e.snapshot(now + Duration::from_millis(1300)).award_lock_held);
    }

    #[test]
    fn new_target_resets_smoother() {
        let t0 = Instant::now();
        let mut e = engine(t0);
        e.begin_target(PoseDefinition::TPose);
        e.observe_frame(&fixtures::t_pose());

        assert_eq!(e.set_pose_idx_different(Some("Arms Down")), PoseDefinition::ArmsDown);
        // Without a reset the T-pose history would drag the arms-down score down.
        let p = e.observe_frame(&fixtures::arms_down());
        assert!((p - 0.85).abs() < 1e-6, "progress={p}");
    }

    #[test]
    fn snapshot_serializes_camel_case() {
        let e = engine(Instant::now());
        let json = serde_json::to_value(e.snapshot(Instant::now())).unwrap();
        assert_eq!(json["lives"], 3);
        assert_eq!(json["intervalSecs"], 10);
        assert!(json.get("targetPose").is_some());
        assert!(json.get("awardLockHeld").is_some());
    }
}
