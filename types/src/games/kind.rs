use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::{
    BINGO_MIN_PARTICIPANTS, HIDDEN_BEAST_MAX_PARTICIPANTS, HIDDEN_BEAST_MIN_PARTICIPANTS,
    MASSACRE_MAX_PARTICIPANTS, MASSACRE_MIN_PARTICIPANTS,
};

/// Minigame families run by the session engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Elimination tournament.
    Massacre,
    /// Social deduction.
    HiddenBeast,
    /// Word guessing.
    HangedCookie,
    Bingo,
    Blackjack,
}

impl GameKind {
    pub const ALL: [GameKind; 5] = [
        GameKind::Massacre,
        GameKind::HiddenBeast,
        GameKind::HangedCookie,
        GameKind::Bingo,
        GameKind::Blackjack,
    ];

    /// Smallest roster that may leave the lobby.
    pub fn min_participants(&self) -> usize {
        match self {
            GameKind::Massacre => MASSACRE_MIN_PARTICIPANTS,
            GameKind::HiddenBeast => HIDDEN_BEAST_MIN_PARTICIPANTS,
            GameKind::Bingo => BINGO_MIN_PARTICIPANTS,
            GameKind::HangedCookie | GameKind::Blackjack => 1,
        }
    }

    /// Lobby capacity, if bounded.
    pub fn max_participants(&self) -> Option<usize> {
        match self {
            GameKind::Massacre => Some(MASSACRE_MAX_PARTICIPANTS),
            GameKind::HiddenBeast => Some(HIDDEN_BEAST_MAX_PARTICIPANTS),
            GameKind::HangedCookie | GameKind::Blackjack => Some(1),
            GameKind::Bingo => None,
        }
    }

    /// Whether the game gathers players in a lobby before starting.
    pub fn has_lobby(&self) -> bool {
        matches!(
            self,
            GameKind::Massacre | GameKind::HiddenBeast | GameKind::Bingo
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Massacre => "massacre",
            GameKind::HiddenBeast => "hiddenbeast",
            GameKind::HangedCookie => "hangedcookie",
            GameKind::Bingo => "bingo",
            GameKind::Blackjack => "blackjack",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown game: {0}")]
pub struct UnknownGame(pub String);

impl FromStr for GameKind {
    type Err = UnknownGame;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        GameKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or(UnknownGame(lowered))
    }
}
