use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::control::{ControlHandle, ControlHub};
use crate::game::PoseSelector;
use crate::pose::detector::{LandmarkDetector, UnavailableDetector};
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    store: Arc<Store>,
    config: Arc<Config>,
    control: ControlHandle,
    detector: Arc<dyn LandmarkDetector>,
    play_sessions: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
    started_at: Instant,
}

/// Holds one play-session slot; released on drop.
#[derive(Debug)]
pub struct SessionPermit {
    counter: Arc<AtomicUsize>,
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

impl AppState {
    /// Starts the control hub on the current runtime.
    pub fn new(store: Arc<Store>, config: &Config, shutdown_tx: broadcast::Sender<()>) -> Self {
        let (control, _hub_task) = ControlHub::spawn(shutdown_tx.subscribe());
        Self::with_detector(store, config, control, Arc::new(UnavailableDetector), shutdown_tx)
    }

    pub fn with_detector(
        store: Arc<Store>,
        config: &Config,
        control: ControlHandle,
        detector: Arc<dyn LandmarkDetector>,
        shutdown_tx: broadcast::Sender<()>,
    ) -> Self {
        Self {
            store,
            config: Arc::new(config.clone()),
            control,
            detector,
            play_sessions: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
            started_at: Instant::now(),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    pub fn detector(&self) -> &Arc<dyn LandmarkDetector> {
        &self.detector
    }

    /// Selector for a new play session, honouring `CONTROL_CHANNEL_ENABLED`.
    pub fn pose_selector(&self) -> PoseSelector {
        if self.config.control.enabled {
            PoseSelector::new(Some(self.control.clone()), self.config.control.reply_timeout())
        } else {
            PoseSelector::local()
        }
    }

    /// `None` when `MAX_PLAY_SESSIONS` are already running.
    pub fn try_acquire_session(&self) -> Option<SessionPermit> {
        let max = self.config.session.max_play_sessions;
        self.play_sessions
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()?;
        Some(SessionPermit {
            counter: self.play_sessions.clone(),
        })
    }

    pub fn active_sessions(&self) -> usize {
        self.play_sessions.load(Ordering::Acquire)
    }

    pub fn shutdown_rx(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn shutdown_tx(&self) -> &broadcast::Sender<()> {
        &self.shutdown_tx
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;

    use crate::config::Config;
    use crate::store::Store;

    use super::*;

    fn state_with_limit(dir: &tempfile::TempDir, max: usize) -> AppState {
        let mut cfg = Config::from_env();
        cfg.session.max_play_sessions = max;
        let store = Arc::new(Store::open(dir.path().join("state.sled").to_str().unwrap()).unwrap());
        let (tx, _) = broadcast::channel(4);
        AppState::new(store, &cfg, tx)
    }

    #[tokio::test]
    async fn session_permits_are_bounded_and_released() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = state_with_limit(&tmp, 2);

        let a = state.try_acquire_session().unwrap();
        let _b = state.try_acquire_session().unwrap();
        assert!(state.try_acquire_session().is_none());
        assert_eq!(state.active_sessions(), 2);

        drop(a);
        assert_eq!(state.active_sessions(), 1);
        assert!(state.try_acquire_session().is_some());
    }

    #[tokio::test]
    async fn shutdown_receiver_can_clone() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let state = state_with_limit(&tmp, 1);

        let mut rx1 = state.shutdown_rx();
        let mut rx2 = state.shutdown_rx();
        state.shutdown_tx().send(()).unwrap();
        rx1.recv().await.unwrap();
        rx2.recv().await.unwrap();
    }
}
