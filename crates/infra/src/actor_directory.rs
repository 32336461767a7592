//! # アクターディレクトリ
//!
//! アクター ID から表示名・役職を解決する。解決結果はイベントペイロードの
//! 表示用にだけ使い、担当者の照合には使わない。
//!
//! ## シードデータ
//!
//! インメモリ実装は JSON 配列から構築できる:
//!
//! ```json
//! [
//!   { "id": "0190a0b2-...", "display_name": "Dr. Robert", "role": "Principal" }
//! ]
//! ```

use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use docflow_domain::{
    actor::{ActorId, ActorProfile},
    value_objects::DisplayName,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::InfraError;

/// アクターディレクトリトレイト
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// ID の完全一致でプロフィールを解決する
    async fn resolve(&self, actor_id: &ActorId) -> Result<Option<ActorProfile>, InfraError>;
}

/// シード JSON の 1 レコード
#[derive(Debug, Deserialize)]
struct SeedRecord {
    id:           Uuid,
    display_name: String,
    role:         String,
}

/// インメモリのアクターディレクトリ
#[derive(Debug, Clone, Default)]
pub struct InMemoryActorDirectory {
    profiles: Arc<HashMap<ActorId, ActorProfile>>,
}

impl InMemoryActorDirectory {
    pub fn new(profiles: impl IntoIterator<Item = ActorProfile>) -> Self {
        let profiles = profiles
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();
        Self {
            profiles: Arc::new(profiles),
        }
    }

    /// JSON 文字列から構築する
    ///
    /// # Errors
    ///
    /// - `Serialization`: JSON として不正な場合
    /// - `InvalidSeed`: 表示名が空または長すぎる場合、同じ ID が重複している場合
    pub fn from_json_str(json: &str) -> Result<Self, InfraError> {
        let records: Vec<SeedRecord> = serde_json::from_str(json)?;

        let mut profiles = HashMap::with_capacity(records.len());
        for record in records {
            let id = ActorId::from_uuid(record.id);
            let display_name = DisplayName::new(record.display_name)
                .map_err(|e| InfraError::invalid_seed(format!("アクター {}: {}", id, e)))?;
            let profile = ActorProfile::new(id.clone(), display_name, record.role);
            if profiles.insert(id.clone(), profile).is_some() {
                return Err(InfraError::invalid_seed(format!(
                    "アクター ID が重複しています: {}",
                    id
                )));
            }
        }

        Ok(Self {
            profiles: Arc::new(profiles),
        })
    }

    /// JSON ファイルから構築する
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, InfraError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ActorDirectory for InMemoryActorDirectory {
    async fn resolve(&self, actor_id: &ActorId) -> Result<Option<ActorProfile>, InfraError> {
        Ok(self.profiles.get(actor_id).cloned())
    }
}
