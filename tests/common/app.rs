use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use pose_round_backend::config::{Config, ControlConfig, LeaderboardConfig, SessionConfig};
use pose_round_backend::routes::build_router;
use pose_round_backend::state::AppState;
use pose_round_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub config: Config,
    pub shutdown_tx: broadcast::Sender<()>,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn store(&self) -> &Arc<Store> {
        self.state.store()
    }
}

/// 直接构造 Config，避免使用 set_var 造成多线程测试环境变量竞态
pub fn test_config(sled_path: String) -> Config {
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 0,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path,
        cors_origin: "http://localhost:5173".to_string(),
        control: ControlConfig {
            enabled: true,
            reply_timeout_ms: 400,
        },
        session: SessionConfig {
            frame_publish_interval_ms: 150,
            max_play_sessions: 4,
        },
        leaderboard: LeaderboardConfig {
            default_limit: 10,
            max_limit: 100,
        },
    }
}

pub async fn spawn_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("pose-round-test.sled");
    let mut config = test_config(sled_path.to_string_lossy().to_string());
    configure(&mut config);

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(store, &config, shutdown_tx.clone());
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        config,
        shutdown_tx,
        _temp_dir: temp_dir,
    }
}

pub async fn spawn_test_app() -> TestApp {
    spawn_with(|_| {}).await
}
