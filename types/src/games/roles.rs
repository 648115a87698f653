use serde::{Deserialize, Serialize};
use std::fmt;

use crate::PlayerId;

/// Hidden Beast roles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Scans a player for a clue about their role.
    Detective,
    /// Revives a fallen player from round two onward.
    Medic,
    /// Wins alone by being voted out.
    Trickster,
    /// Shields one player from the Beast each round.
    Guardian,
    /// The antagonist.
    Beast,
    /// Default role.
    Cookie,
}

impl Role {
    /// Special roles in dealing order; everyone after them is a [Role::Cookie].
    pub const SPECIAL: [Role; 5] = [
        Role::Detective,
        Role::Medic,
        Role::Trickster,
        Role::Guardian,
        Role::Beast,
    ];

    pub fn is_antagonist(&self) -> bool {
        matches!(self, Role::Beast)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::Detective => "Detective",
            Role::Medic => "Healer",
            Role::Trickster => "Trickster",
            Role::Guardian => "Guardian",
            Role::Beast => "Beast",
            Role::Cookie => "Cookie",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A recorded ballot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteChoice {
    Target(PlayerId),
    Skip,
}
