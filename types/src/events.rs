use serde::{Deserialize, Serialize};

use crate::{
    games::{GameKind, Phase, Role},
    ChannelKey, PlayerId,
};

/// Outcome events published by the session engine.
///
/// Observers (dashboards, audit logs, tests) subscribe to these instead of parsing
/// narration text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    SessionCreated {
        channel: ChannelKey,
        kind: GameKind,
        host: PlayerId,
    },
    SessionStarted {
        channel: ChannelKey,
        kind: GameKind,
        participants: Vec<PlayerId>,
    },
    PhaseChanged {
        channel: ChannelKey,
        kind: GameKind,
        phase: Phase,
        round: u32,
    },
    ParticipantEliminated {
        channel: ChannelKey,
        kind: GameKind,
        player: PlayerId,
        /// Revealed role, for games that have roles.
        role: Option<Role>,
    },
    ParticipantRevived {
        channel: ChannelKey,
        kind: GameKind,
        player: PlayerId,
    },
    /// Terminal win. `reward` is paid to each winner.
    GameWon {
        channel: ChannelKey,
        kind: GameKind,
        winners: Vec<PlayerId>,
        reward: u64,
    },
    /// Terminal loss with no payout (word not found, no survivor, time out).
    GameLost {
        channel: ChannelKey,
        kind: GameKind,
    },
    RewardCredited {
        channel: ChannelKey,
        player: PlayerId,
        amount: u64,
    },
    /// A payout that still failed after every retry; needs manual reconciliation.
    RewardFailed {
        channel: ChannelKey,
        player: PlayerId,
        amount: u64,
        reason: String,
    },
    SessionEnded {
        channel: ChannelKey,
        kind: GameKind,
        cancelled: bool,
    },
}

impl Event {
    pub fn channel(&self) -> ChannelKey {
        match self {
            Event::SessionCreated { channel, .. }
            | Event::SessionStarted { channel, .. }
            | Event::PhaseChanged { channel, .. }
            | Event::ParticipantEliminated { channel, .. }
            | Event::ParticipantRevived { channel, .. }
            | Event::GameWon { channel, .. }
            | Event::GameLost { channel, .. }
            | Event::RewardCredited { channel, .. }
            | Event::RewardFailed { channel, .. }
            | Event::SessionEnded { channel, .. } => *channel,
        }
    }
}
