/// 公共验证函数模块
/// 玩家昵称与客户端标识的输入校验，供 REST 路由和会话共用。
use crate::constants::MAX_PLAYER_NAME_CHARS;

pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// 规范化玩家昵称：去除首尾空白和控制字符，截断到上限；为空时使用默认昵称
pub fn normalize_player_name(raw: Option<&str>) -> String {
    let cleaned: String = raw
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return DEFAULT_PLAYER_NAME.to_string();
    }
    trimmed.chars().take(MAX_PLAYER_NAME_CHARS).collect::<String>().trim_end().to_string()
}

/// 验证客户端标识：1-128 字符，只允许字母、数字、下划线和连字符
pub fn validate_client_key(key: &str) -> Result<(), &'static str> {
    if key.is_empty() || key.len() > 128 {
        return Err("clientKey must be 1-128 characters");
    }
    if !key
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err("clientKey may only contain letters, digits, '_' and '-'");
    }
    Ok(())
}
