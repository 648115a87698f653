//! Game rules for shadowspire minigames.
//!
//! Everything here is synchronous and deterministic given a [games::GameRng], except the
//! [ledger::Ledger] contract which the node awaits.

pub mod games;
pub mod ledger;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use games::{GameError, GameRng};
pub use ledger::{Ledger, LedgerError, MemoryLedger};
