use serde::{Deserialize, Serialize};
use std::fmt;

use super::GameKind;
use crate::{ChannelKey, PlayerId};

/// Phase tags a session moves through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Lobby,
    Intro,
    Day,
    Night,
    Actions,
    Discussion,
    Voting,
    Guessing,
    Drawing,
    Dealing,
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Lobby => "lobby",
            Phase::Intro => "intro",
            Phase::Day => "day",
            Phase::Night => "night",
            Phase::Actions => "actions",
            Phase::Discussion => "discussion",
            Phase::Voting => "voting",
            Phase::Guessing => "guessing",
            Phase::Drawing => "drawing",
            Phase::Dealing => "dealing",
            Phase::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Metadata of one session. Game payloads live with the engine that runs the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub channel: ChannelKey,
    pub kind: GameKind,
    pub host: PlayerId,
    /// Join order, used for display only.
    pub participants: Vec<PlayerId>,
    /// Unix timestamp (milliseconds) of creation.
    pub created_at_ms: u64,
    pub phase: Phase,
    pub round: u32,
    /// Unix timestamp (milliseconds) at which the current phase closes.
    pub deadline_ms: Option<u64>,
}

impl SessionInfo {
    pub fn new(
        channel: ChannelKey,
        kind: GameKind,
        host: PlayerId,
        participants: Vec<PlayerId>,
        created_at_ms: u64,
    ) -> Self {
        let mut info = Self {
            channel,
            kind,
            host,
            participants: Vec::with_capacity(participants.len()),
            created_at_ms,
            phase: Phase::Lobby,
            round: 0,
            deadline_ms: None,
        };
        for player in participants {
            info.add_participant(player);
        }
        info
    }

    pub fn contains_participant(&self, player: &PlayerId) -> bool {
        self.participants.contains(player)
    }

    /// Returns true if the player was added, false if already present.
    pub fn add_participant(&mut self, player: PlayerId) -> bool {
        if self.contains_participant(&player) {
            return false;
        }
        self.participants.push(player);
        true
    }

    /// Returns true if the player was present.
    pub fn remove_participant(&mut self, player: &PlayerId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p != player);
        before != self.participants.len()
    }

    pub fn is_host(&self, player: &PlayerId) -> bool {
        self.host == *player
    }
}
