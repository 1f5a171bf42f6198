use crate::store::operations::players::PlayerRecord;
use crate::store::{keys, Store, StoreError};

pub(crate) const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_leaderboard_index", m002_leaderboard_index),
    ]
}

/// 执行所有未应用的数据库迁移。
///
/// - 每个迁移必须幂等：迁移函数成功后、写入版本号前进程崩溃，重启后会再次执行。
/// - 版本号在每个迁移完成后立即持久化。
/// - 只允许向前，`set_version` 拒绝降级。
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version <= current {
            tracing::debug!(version, name, "Migration already applied, skipping");
            continue;
        }
        tracing::info!(version, name, "Running migration");
        func(store)?;
        set_version(store, version)?;
        tracing::info!(version, name, "Migration complete");
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.meta.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("corrupt version marker ({} bytes)", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .meta
        .insert(VERSION_KEY.as_bytes(), version.to_be_bytes().to_vec())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

/// 根据玩家记录重建排行索引
fn m002_leaderboard_index(store: &Store) -> Result<(), StoreError> {
    store.leaderboard_index.clear()?;
    for item in store.players.iter() {
        let (key, value) = item?;
        let record: PlayerRecord = Store::deserialize(&value)?;
        let index_key =
            keys::leaderboard_index_key(record.completed_count, record.accuracy, &record.id);
        store
            .leaderboard_index
            .insert(index_key.as_bytes(), key.as_ref())?;
    }
    Ok(())
}
