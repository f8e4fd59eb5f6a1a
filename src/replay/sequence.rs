use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use thiserror::Error;

use super::models::TokenSnapshot;

/// How many recently-drawn tokens are held out of the draw pool. Bounded so
/// small pools always leave at least one candidate.
const RECENT_WINDOW_CAP: usize = 8;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("token pool must hold at least two tokens, got {0}")]
    PoolTooSmall(usize),
}

/// Deterministic token-pair stream for one run.
///
/// `seed → sha256 → ChaCha8 → index selection`: the same seed over the same
/// snapshot ordering reproduces the same pair for every round, which is what
/// lets a submitted guess log be verified without storing per-round state.
pub struct TokenSequencer {
    rng: ChaCha8Rng,
    token_ids: Vec<String>,
    recent: VecDeque<usize>,
    window: usize,
    current: usize,
    next: usize,
}

impl TokenSequencer {
    pub fn new(seed: &str, snapshot: &TokenSnapshot) -> Result<Self, SequenceError> {
        if snapshot.len() < 2 {
            return Err(SequenceError::PoolTooSmall(snapshot.len()));
        }

        let digest = Sha256::digest(seed.as_bytes());
        let mut seed_bytes = [0u8; 32];
        seed_bytes.copy_from_slice(&digest);

        let mut sequencer = Self {
            rng: ChaCha8Rng::from_seed(seed_bytes),
            token_ids: snapshot.token_ids(),
            recent: VecDeque::new(),
            window: RECENT_WINDOW_CAP.min(snapshot.len() - 2),
            current: 0,
            next: 0,
        };
        sequencer.current = sequencer.draw(None);
        sequencer.next = sequencer.draw(Some(sequencer.current));
        Ok(sequencer)
    }

    /// The (current, next) token ids of the round the sequencer is on.
    pub fn pair(&self) -> (&str, &str) {
        (&self.token_ids[self.current], &self.token_ids[self.next])
    }

    /// Moves to the following round: the next token becomes current and a
    /// fresh next token is drawn.
    pub fn advance(&mut self) {
        self.current = self.next;
        self.next = self.draw(Some(self.current));
    }

    fn draw(&mut self, exclude: Option<usize>) -> usize {
        let available: Vec<usize> = (0..self.token_ids.len())
            .filter(|index| Some(*index) != exclude && !self.recent.contains(index))
            .collect();
        let picked = available[self.rng.random_range(0..available.len())];

        self.recent.push_back(picked);
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
        picked
    }
}
