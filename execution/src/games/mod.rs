//! Minigame rules.
//!
//! Every game here is a plain state machine: it is fed player decisions and randomness
//! and hands back effect records. Timing, messaging and payouts belong to the caller.
//! - Massacre (elimination)
//! - Hidden Beast (social deduction)
//! - Hanged Cookie (word guessing)
//! - Bingo
//! - Blackjack

pub mod bingo;
pub mod blackjack;
pub mod deduction;
pub mod elimination;
pub mod hangman;
pub mod narration;

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use shadowspire_types::PlayerId;
use thiserror::Error;

/// Deterministic random number generator.
///
/// Seeded from a base seed, the session id and a round number so a replay with the
/// same inputs yields the same game.
#[derive(Clone)]
pub struct GameRng {
    inner: ChaCha20Rng,
}

impl GameRng {
    /// Create a new RNG from a base seed, session id and round number.
    pub fn new(seed: u64, session_id: u64, round: u32) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&seed.to_be_bytes());
        bytes[8..16].copy_from_slice(&session_id.to_be_bytes());
        bytes[16..20].copy_from_slice(&round.to_be_bytes());
        Self {
            inner: ChaCha20Rng::from_seed(bytes),
        }
    }

    /// Get a random u8 value.
    pub fn next_u8(&mut self) -> u8 {
        self.inner.gen()
    }

    /// Get a random value in range [0, max). Returns 0 when max is 0.
    pub fn next_bounded(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        self.inner.gen_range(0..max)
    }

    /// Get a random value in the inclusive range [low, high].
    pub fn range(&mut self, low: u8, high: u8) -> u8 {
        if low >= high {
            return low;
        }
        self.inner.gen_range(low..=high)
    }

    /// True with probability `p` (clamped to [0, 1]).
    pub fn chance(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    pub fn coin(&mut self) -> bool {
        self.chance(0.5)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }

    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        slice.choose(&mut self.inner)
    }

    /// Pick from a weighted table. Entries with zero weight are never picked.
    pub fn weighted<T: Copy>(&mut self, table: &[(T, u32)]) -> Option<T> {
        let total: u32 = table.iter().map(|(_, weight)| weight).sum();
        if total == 0 {
            return None;
        }
        let mut roll = self.inner.gen_range(0..total);
        for (item, weight) in table {
            if roll < *weight {
                return Some(*item);
            }
            roll -= weight;
        }
        None
    }

    /// Draw `count` distinct values from the inclusive range [low, high].
    pub fn sample_range(&mut self, low: u8, high: u8, count: usize) -> Vec<u8> {
        let mut pool: Vec<u8> = (low..=high).collect();
        self.shuffle(&mut pool);
        pool.truncate(count);
        pool
    }

    /// Draw a card from the deck without replacement.
    /// Cards are 0-51: suit = card/13, rank = card%13.
    pub fn draw_card(&mut self, deck: &mut Vec<u8>) -> Option<u8> {
        if deck.is_empty() {
            return None;
        }
        let idx = self.next_bounded(deck.len());
        Some(deck.swap_remove(idx))
    }

    /// Create a shuffled deck of 52 cards.
    pub fn create_deck(&mut self) -> Vec<u8> {
        let mut deck: Vec<u8> = (0..52).collect();
        self.shuffle(&mut deck);
        deck
    }
}

/// Error during game execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("need at least {min} participants, got {got}")]
    InsufficientParticipants { min: usize, got: usize },
    #[error("at most {max} participants allowed, got {got}")]
    TooManyParticipants { max: usize, got: usize },
    #[error("{0} is not part of this game")]
    NotParticipant(PlayerId),
    #[error("{0} is not an eligible target")]
    InvalidTarget(PlayerId),
    #[error("{0} does not hold the role for this action")]
    WrongRole(PlayerId),
    #[error("action not available this round")]
    NotAvailable,
    #[error("invalid guess")]
    InvalidGuess,
    #[error("invalid bet")]
    InvalidBet,
    #[error("game already complete")]
    GameAlreadyComplete,
}

/// Remove duplicate players keeping first-seen order.
pub(crate) fn dedupe(players: &[PlayerId]) -> Vec<PlayerId> {
    let mut out = Vec::with_capacity(players.len());
    for player in players {
        if !out.contains(player) {
            out.push(*player);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_rng_deterministic() {
        let mut rng1 = GameRng::new(7, 1, 0);
        let mut rng2 = GameRng::new(7, 1, 0);

        for _ in 0..100 {
            assert_eq!(rng1.next_u8(), rng2.next_u8());
        }
    }

    #[test]
    fn test_game_rng_different_sessions() {
        let mut rng1 = GameRng::new(7, 1, 0);
        let mut rng2 = GameRng::new(7, 2, 0);

        let seq1: Vec<u8> = (0..16).map(|_| rng1.next_u8()).collect();
        let seq2: Vec<u8> = (0..16).map(|_| rng2.next_u8()).collect();
        assert_ne!(seq1, seq2);
    }

    #[test]
    fn test_game_rng_bounded() {
        let mut rng = GameRng::new(7, 1, 0);
        for _ in 0..1000 {
            assert!(rng.next_bounded(52) < 52);
            let value = rng.range(5, 40);
            assert!((5..=40).contains(&value));
        }
        assert_eq!(rng.next_bounded(0), 0);
        assert_eq!(rng.range(9, 9), 9);
    }

    #[test]
    fn test_game_rng_weighted_skips_zero() {
        let mut rng = GameRng::new(7, 1, 0);
        let table = [('a', 0), ('b', 3), ('c', 0)];
        for _ in 0..200 {
            assert_eq!(rng.weighted(&table), Some('b'));
        }
        assert_eq!(rng.weighted::<char>(&[]), None);
    }

    #[test]
    fn test_game_rng_sample_range_distinct() {
        let mut rng = GameRng::new(7, 1, 0);
        let mut sample = rng.sample_range(16, 30, 5);
        assert_eq!(sample.len(), 5);
        sample.sort_unstable();
        sample.dedup();
        assert_eq!(sample.len(), 5);
        assert!(sample.iter().all(|n| (16..=30).contains(n)));
    }

    #[test]
    fn test_game_rng_deck() {
        let mut rng = GameRng::new(7, 1, 0);
        let mut deck = rng.create_deck();
        assert_eq!(deck.len(), 52);

        let mut seen = [false; 52];
        for card in &deck {
            assert!(!seen[*card as usize], "Duplicate card: {}", card);
            seen[*card as usize] = true;
        }

        let card = rng.draw_card(&mut deck).expect("Failed to draw card from deck");
        assert_eq!(deck.len(), 51);
        assert!(!deck.contains(&card));
    }

    #[test]
    fn test_dedupe_keeps_order() {
        let players = [PlayerId(3), PlayerId(1), PlayerId(3), PlayerId(2)];
        assert_eq!(dedupe(&players), vec![PlayerId(3), PlayerId(1), PlayerId(2)]);
    }
}
