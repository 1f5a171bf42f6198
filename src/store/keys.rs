use crate::store::StoreError;

const MAX_ID_LEN: usize = 128;

/// id 与客户端标识会成为 sled 键的一段，因此拒绝 `:` 和控制字符
fn validate_segment(kind: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() || value.len() > MAX_ID_LEN {
        return Err(StoreError::Validation(format!(
            "{kind} must be 1-{MAX_ID_LEN} bytes"
        )));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(StoreError::Validation(format!(
            "{kind} may only contain letters, digits, '-' and '_'"
        )));
    }
    Ok(())
}

pub fn player_key(player_id: &str) -> Result<String, StoreError> {
    validate_segment("player id", player_id)?;
    Ok(player_id.to_string())
}

/// 字节序升序即完成数降序、准确率降序、id 升序
pub fn leaderboard_index_key(completed_count: u64, accuracy: f64, player_id: &str) -> String {
    let acc = (accuracy.clamp(0.0, 1.0) * 1e12).round() as u64;
    format!(
        "{:020}:{:020}:{}",
        u64::MAX - completed_count,
        u64::MAX - acc,
        player_id
    )
}

pub fn identity_key(identity_id: &str) -> Result<String, StoreError> {
    validate_segment("identity id", identity_id)?;
    Ok(format!("id:{identity_id}"))
}

pub fn identity_client_index_key(client_key: &str) -> Result<String, StoreError> {
    validate_segment("client key", client_key)?;
    Ok(format!("client:{client_key}"))
}
