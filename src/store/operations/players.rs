use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionResult;
use sled::Transactional;

use crate::store::keys;
use crate::store::{abort_on_serde, Store, StoreError};

/// 排行榜中的玩家记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    pub completed_count: u64,
    pub total_attempts: u64,
    pub accuracy: f64,
    pub last_pose: String,
    pub last_updated: DateTime<Utc>,
}

impl PlayerRecord {
    fn first_completion(id: &str, name: &str, pose: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            completed_count: 1,
            total_attempts: 1,
            accuracy: 1.0,
            last_pose: pose.to_string(),
            last_updated: now,
        }
    }

    fn with_completion(mut self, pose: &str, now: DateTime<Utc>) -> Self {
        self.completed_count += 1;
        self.total_attempts += 1;
        self.accuracy = self.completed_count as f64 / self.total_attempts as f64;
        self.last_pose = pose.to_string();
        self.last_updated = now;
        self
    }

    fn index_key(&self) -> String {
        keys::leaderboard_index_key(self.completed_count, self.accuracy, &self.id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub player: PlayerRecord,
}

impl Store {
    /// 记录一次成功回合，返回新的 `completedCount`。
    ///
    /// 读取、计算、写入与排行索引更新在同一个 sled 事务中完成，同一玩家的并发
    /// 提交不会丢失计数。已有记录的昵称保持不变。
    pub fn record_completion(
        &self,
        player_id: &str,
        name: &str,
        pose: &str,
    ) -> Result<u64, StoreError> {
        let key = keys::player_key(player_id)?;
        let now = Utc::now();

        let completed = (&self.players, &self.leaderboard_index).transaction(
            |(tx_players, tx_index)| -> ConflictableTransactionResult<u64, StoreError> {
                let record = match tx_players.get(key.as_bytes())? {
                    Some(raw) => {
                        let previous: PlayerRecord =
                            serde_json::from_slice(&raw).map_err(abort_on_serde)?;
                        tx_index.remove(previous.index_key().as_bytes())?;
                        previous.with_completion(pose, now)
                    }
                    None => PlayerRecord::first_completion(player_id, name, pose, now),
                };

                let bytes = serde_json::to_vec(&record).map_err(abort_on_serde)?;
                tx_players.insert(key.as_bytes(), bytes)?;
                tx_index.insert(record.index_key().as_bytes(), key.as_bytes())?;
                Ok(record.completed_count)
            },
        )?;

        tracing::debug!(player_id, completed, pose, "Completion recorded");
        Ok(completed)
    }

    pub fn get_player(&self, player_id: &str) -> Result<Option<PlayerRecord>, StoreError> {
        let key = keys::player_key(player_id)?;
        match self.players.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// 按 `completedCount` 降序、`accuracy` 降序返回前若干名玩家
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let mut out = Vec::with_capacity(limit.min(64));
        for item in self.leaderboard_index.iter() {
            if out.len() >= limit {
                break;
            }
            let (_, player_key) = item?;
            let Some(raw) = self.players.get(&player_key)? else {
                tracing::warn!(
                    key = %String::from_utf8_lossy(&player_key),
                    "Leaderboard index points at a missing player"
                );
                continue;
            };
            let player: PlayerRecord = Self::deserialize(&raw)?;
            out.push(LeaderboardEntry {
                rank: out.len() + 1,
                player,
            });
        }
        Ok(out)
    }

    pub fn count_players(&self) -> usize {
        self.players.len()
    }
}
