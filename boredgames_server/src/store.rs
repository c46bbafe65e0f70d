use boredgames_core::{Game, GameId};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key {key} not found in datastore")]
    NotFound { key: String },
    #[error("key {key} already exists in datastore")]
    AlreadyExists { key: String },
    #[error("internal datastore error occurred: {details}")]
    Internal { details: String },
}

/// 游戏的持久化接口，以游戏 id 为键
pub trait GameStore: Send + Sync {
    fn list(&self) -> Result<Vec<Game>, StoreError>;
    fn insert(&self, game: &Game) -> Result<(), StoreError>;
    fn get(&self, id: GameId) -> Result<Game, StoreError>;
    fn update(&self, game: &Game) -> Result<(), StoreError>;
    fn delete(&self, id: GameId) -> Result<(), StoreError>;
}

/// 内存存储。每局游戏以 JSON 字节保存，读出来的总是一份独立的副本，
/// 调用方之间不会共享可变状态。
#[derive(Default)]
pub struct MemoryStore {
    games: DashMap<GameId, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode(game: &Game) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(game).map_err(|e| StoreError::Internal {
            details: format!("could not encode game {}: {}", game.id, e),
        })
    }

    fn decode(id: &GameId, bytes: &[u8]) -> Result<Game, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Internal {
            details: format!("could not decode game {}: {}", id, e),
        })
    }
}

impl GameStore for MemoryStore {
    /// 按 id 排序，输出稳定
    fn list(&self) -> Result<Vec<Game>, StoreError> {
        let mut games = self
            .games
            .iter()
            .map(|entry| Self::decode(entry.key(), entry.value()))
            .collect::<Result<Vec<_>, _>>()?;
        games.sort_by_key(|g| g.id);
        Ok(games)
    }

    fn insert(&self, game: &Game) -> Result<(), StoreError> {
        let bytes = Self::encode(game)?;
        match self.games.entry(game.id) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists { key: game.id.to_string() }),
            Entry::Vacant(slot) => {
                slot.insert(bytes);
                Ok(())
            }
        }
    }

    fn get(&self, id: GameId) -> Result<Game, StoreError> {
        let bytes = self.games.get(&id).ok_or_else(|| StoreError::NotFound { key: id.to_string() })?;
        Self::decode(&id, bytes.value())
    }

    fn update(&self, game: &Game) -> Result<(), StoreError> {
        let bytes = Self::encode(game)?;
        let mut stored = self
            .games
            .get_mut(&game.id)
            .ok_or_else(|| StoreError::NotFound { key: game.id.to_string() })?;
        *stored = bytes;
        Ok(())
    }

    fn delete(&self, id: GameId) -> Result<(), StoreError> {
        self.games
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound { key: id.to_string() })
    }
}
