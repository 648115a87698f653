use serde::{Deserialize, Serialize};

use super::MAX_HEALTH;
use crate::PlayerId;

/// Massacre participant.
///
/// Fields are private so that `alive` always mirrors `health > 0`; every mutation goes
/// through [ParticipantState::damage] or [ParticipantState::heal].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantState {
    player: PlayerId,
    health: u8,
    injuries: Vec<String>,
    alive: bool,
}

impl ParticipantState {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            health: MAX_HEALTH,
            injuries: Vec::new(),
            alive: true,
        }
    }

    pub fn player(&self) -> PlayerId {
        self.player
    }

    pub fn health(&self) -> u8 {
        self.health
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn injuries(&self) -> &[String] {
        &self.injuries
    }

    /// Apply damage, saturating at zero.
    ///
    /// Returns true only on the hit that kills, so death narration fires once.
    pub fn damage(&mut self, amount: u8) -> bool {
        if !self.alive {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.alive = false;
            return true;
        }
        false
    }

    /// Heal up to [MAX_HEALTH]. Dead participants cannot be healed.
    ///
    /// Returns the health actually restored.
    pub fn heal(&mut self, amount: u8) -> u8 {
        if !self.alive {
            return 0;
        }
        let before = self.health;
        self.health = self.health.saturating_add(amount).min(MAX_HEALTH);
        self.health - before
    }

    pub fn add_injury(&mut self, injury: impl Into<String>) {
        self.injuries.push(injury.into());
    }
}
