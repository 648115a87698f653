//! Shared types for shadowspire minigames.
//!
//! Nothing in this crate performs I/O. The execution crate owns game rules and the
//! node crate owns timing, messaging and persistence collaborators; both speak in the
//! identifiers, session records and events defined here.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod events;
pub mod games;

pub use events::Event;

/// Opaque chat-platform user id. The engine never owns player data beyond this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<@{}>", self.0)
    }
}

impl From<u64> for PlayerId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Chat channel a session is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelKey(pub u64);

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for ChannelKey {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
