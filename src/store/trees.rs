pub const PLAYERS: &str = "players";
pub const LEADERBOARD_INDEX: &str = "leaderboard_index";
pub const IDENTITIES: &str = "identities";
pub const META: &str = "meta";
