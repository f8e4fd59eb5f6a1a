use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::shared::AppError;

/// The player's call for a round: will the next token's market cap be higher
/// or lower than the current one?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Guess {
    Higher,
    Lower,
}

impl Guess {
    pub fn opposite(self) -> Self {
        match self {
            Guess::Higher => Guess::Lower,
            Guess::Lower => Guess::Higher,
        }
    }

    /// Whether this guess is correct for the given pair of market caps.
    /// Equal caps count as correct in either direction.
    pub fn matches(self, current_cap: u64, next_cap: u64) -> bool {
        match self {
            Guess::Higher => next_cap >= current_cap,
            Guess::Lower => next_cap <= current_cap,
        }
    }
}

/// One recorded guess inside a run's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuessRecord {
    pub round_number: u32,
    pub current_token_id: String,
    pub next_token_id: String,
    pub guess: Guess,
    pub timestamp: DateTime<Utc>,
}

/// A completed playthrough, immutable once submitted. The unit the
/// replay validator judges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub user_id: String,
    pub seed: String,
    pub started_at: DateTime<Utc>,
    pub claimed_streak: u32,
    #[serde(default)]
    pub reprieves_used: u32,
    pub guesses: Vec<GuessRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub token_id: String,
    pub market_cap: u64,
}

/// A frozen view of the token pool at run time.
///
/// The list order is part of the deterministic sequencing contract: the
/// sequencer selects indices into this list, so validation must use the
/// same snapshot ordering the game client was served.
#[derive(Debug, Clone)]
pub struct TokenSnapshot {
    tokens: Vec<TokenInfo>,
    by_id: HashMap<String, usize>,
}

impl TokenSnapshot {
    pub fn new(tokens: Vec<TokenInfo>) -> Self {
        let by_id = tokens
            .iter()
            .enumerate()
            .map(|(index, token)| (token.token_id.clone(), index))
            .collect();
        Self { tokens, by_id }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token_at(&self, index: usize) -> Option<&TokenInfo> {
        self.tokens.get(index)
    }

    pub fn market_cap(&self, token_id: &str) -> Option<u64> {
        self.by_id
            .get(token_id)
            .map(|index| self.tokens[*index].market_cap)
    }

    pub fn token_ids(&self) -> Vec<String> {
        self.tokens.iter().map(|t| t.token_id.clone()).collect()
    }
}

/// Collaborator supplying the market-data snapshot runs are validated
/// against. Real ingestion lives outside the engine.
#[async_trait]
pub trait TokenPoolProvider: Send + Sync {
    async fn snapshot(&self) -> Result<TokenSnapshot, AppError>;
}

/// Fixed snapshot provider for development and testing.
pub struct StaticTokenPool {
    snapshot: TokenSnapshot,
}

impl StaticTokenPool {
    pub fn new(snapshot: TokenSnapshot) -> Self {
        Self { snapshot }
    }
}

#[async_trait]
impl TokenPoolProvider for StaticTokenPool {
    async fn snapshot(&self) -> Result<TokenSnapshot, AppError> {
        Ok(self.snapshot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_matches_handles_equal_caps_both_ways() {
        assert!(Guess::Higher.matches(100, 200));
        assert!(!Guess::Higher.matches(200, 100));
        assert!(Guess::Lower.matches(200, 100));
        assert!(!Guess::Lower.matches(100, 200));

        assert!(Guess::Higher.matches(150, 150));
        assert!(Guess::Lower.matches(150, 150));
    }

    #[test]
    fn snapshot_lookup_by_id() {
        let snapshot = TokenSnapshot::new(vec![
            TokenInfo {
                token_id: "btc".to_string(),
                market_cap: 900,
            },
            TokenInfo {
                token_id: "eth".to_string(),
                market_cap: 400,
            },
        ]);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.market_cap("btc"), Some(900));
        assert_eq!(snapshot.market_cap("doge"), None);
        assert_eq!(snapshot.token_at(1).unwrap().token_id, "eth");
    }
}
