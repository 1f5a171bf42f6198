/// 地标 EMA 平滑系数
pub const SMOOTHING_ALPHA: f64 = 0.4;

/// 回合结束时判定成功的进度阈值
pub const SUCCESS_THRESHOLD: f64 = 0.65;

/// 每局初始生命数
pub const MAX_LIVES: u8 = 3;

/// 首回合时长（秒）
pub const INITIAL_INTERVAL_SECS: u32 = 10;

/// 回合时长下限（秒）
pub const MIN_INTERVAL_SECS: u32 = 3;

/// 奖励/扣命锁的自动释放窗口（毫秒）
pub const ROUND_LOCK_WINDOW_MS: u64 = 1200;

/// 重新开始后两把锁强制持有的宽限期（毫秒）
pub const RESTART_GRACE_MS: u64 = 1300;

/// 回合计时器周期（毫秒）
pub const TICK_PERIOD_MS: u64 = 1000;

/// 帧驱动的状态推送最小间隔（毫秒）
pub const DEFAULT_FRAME_PUBLISH_INTERVAL_MS: u64 = 150;

/// 控制通道回复等待时长（毫秒）
pub const DEFAULT_CONTROL_REPLY_TIMEOUT_MS: u64 = 400;

/// 排行榜默认返回条数
pub const DEFAULT_LEADERBOARD_LIMIT: usize = 10;

/// 排行榜最大返回条数
pub const MAX_LEADERBOARD_LIMIT: usize = 100;

/// 同时在线的游戏会话上限
pub const DEFAULT_MAX_PLAY_SESSIONS: usize = 256;

/// 玩家昵称最大字符数
pub const MAX_PLAYER_NAME_CHARS: usize = 40;

/// 姿态地标数量（MediaPipe Pose），索引不小于该值的地标一律丢弃
pub const MAX_LANDMARK_INDEX: usize = 33;
