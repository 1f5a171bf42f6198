use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::transaction::ConflictableTransactionResult;

use crate::store::keys;
use crate::store::{abort_on_serde, Store, StoreError};

/// 匿名玩家身份
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// 创建匿名身份。
    ///
    /// 带 `client_key` 时，同一客户端之前签发的身份会被替换，旧 id 随之失效。
    pub fn create_anonymous_identity(
        &self,
        client_key: Option<&str>,
    ) -> Result<Identity, StoreError> {
        let identity = Identity {
            id: uuid::Uuid::new_v4().to_string(),
            client_key: client_key.map(str::to_string),
            created_at: Utc::now(),
        };
        let id_key = keys::identity_key(&identity.id)?;

        let Some(client_key) = client_key else {
            self.identities
                .insert(id_key.as_bytes(), Self::serialize(&identity)?)?;
            tracing::debug!(identity_id = %identity.id, "Anonymous identity created");
            return Ok(identity);
        };

        let index_key = keys::identity_client_index_key(client_key)?;
        let bytes = Self::serialize(&identity)?;

        self.identities.transaction(
            |tx| -> ConflictableTransactionResult<(), StoreError> {
                if let Some(previous_id) = tx.get(index_key.as_bytes())? {
                    let previous_id = String::from_utf8(previous_id.to_vec()).map_err(|e| {
                        sled::transaction::ConflictableTransactionError::Abort(
                            StoreError::Validation(format!("corrupt identity index: {e}")),
                        )
                    })?;
                    let previous_key = format!("id:{previous_id}");
                    if let Some(raw) = tx.get(previous_key.as_bytes())? {
                        let _: Identity = serde_json::from_slice(&raw).map_err(abort_on_serde)?;
                        tx.remove(previous_key.as_bytes())?;
                    }
                }
                tx.insert(id_key.as_bytes(), bytes.clone())?;
                tx.insert(index_key.as_bytes(), identity.id.as_bytes())?;
                Ok(())
            },
        )?;

        tracing::debug!(identity_id = %identity.id, "Identity issued for client key");
        Ok(identity)
    }

    pub fn get_identity(&self, identity_id: &str) -> Result<Option<Identity>, StoreError> {
        let key = keys::identity_key(identity_id)?;
        match self.identities.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// 格式非法的 id 视为无效
    pub fn is_identity_active(&self, identity_id: &str) -> bool {
        matches!(self.get_identity(identity_id), Ok(Some(_)))
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn open() -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("db").to_str().unwrap()).unwrap();
        (dir, store)
    }

    #[test]
    fn anonymous_identity_is_persisted() {
        let (_dir, store) = open();
        let identity = store.create_anonymous_identity(None).unwrap();
        assert!(store.is_identity_active(&identity.id));
        assert_eq!(store.get_identity(&identity.id).unwrap(), Some(identity));
    }

    #[test]
    fn client_key_reissue_replaces_previous_identity() {
        let (_dir, store) = open();
        let first = store.create_anonymous_identity(Some("browser-1")).unwrap();
        let second = store.create_anonymous_identity(Some("browser-1")).unwrap();

        assert_ne!(first.id, second.id);
        assert!(!store.is_identity_active(&first.id));
        assert!(store.is_identity_active(&second.id));
        assert_eq!(second.client_key.as_deref(), Some("browser-1"));
    }

    #[test]
    fn different_client_keys_coexist() {
        let (_dir, store) = open();
        let a = store.create_anonymous_identity(Some("a")).unwrap();
        let b = store.create_anonymous_identity(Some("b")).unwrap();
        assert!(store.is_identity_active(&a.id));
        assert!(store.is_identity_active(&b.id));
    }

    #[test]
    fn bad_client_key_is_rejected() {
        let (_dir, store) = open();
        let err = store.create_anonymous_identity(Some("no spaces")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(!store.is_identity_active("not:valid"));
    }
}
