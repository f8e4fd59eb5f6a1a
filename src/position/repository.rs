use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::score::Period;
use crate::shared::AppError;

/// Last-observed rank per (board, user). Mutated by the position check
/// itself (read-then-overwrite).
#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn get_last_rank(&self, board: &Period, user_id: &str)
        -> Result<Option<u32>, AppError>;
    async fn set_last_rank(
        &self,
        board: &Period,
        user_id: &str,
        rank: u32,
    ) -> Result<(), AppError>;
}

/// In-memory implementation for development and testing.
pub struct InMemoryPositionRepository {
    positions: Mutex<HashMap<(String, String), u32>>,
}

impl Default for InMemoryPositionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPositionRepository {
    pub fn new() -> Self {
        Self {
            positions: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PositionRepository for InMemoryPositionRepository {
    async fn get_last_rank(
        &self,
        board: &Period,
        user_id: &str,
    ) -> Result<Option<u32>, AppError> {
        let positions = self.positions.lock().unwrap();
        Ok(positions
            .get(&(board.to_string(), user_id.to_string()))
            .copied())
    }

    async fn set_last_rank(
        &self,
        board: &Period,
        user_id: &str,
        rank: u32,
    ) -> Result<(), AppError> {
        let mut positions = self.positions.lock().unwrap();
        positions.insert((board.to_string(), user_id.to_string()), rank);
        Ok(())
    }
}
