//! Test doubles.

use crate::ledger::{Ledger, LedgerError, MemoryLedger};
use async_trait::async_trait;
use shadowspire_types::PlayerId;
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU32, Ordering},
};

/// Players `1..=n`.
pub fn roster(n: u64) -> Vec<PlayerId> {
    (1..=n).map(PlayerId).collect()
}

/// A [MemoryLedger] whose first `failures` credits fail with [LedgerError::Unavailable].
pub struct FlakyLedger {
    inner: MemoryLedger,
    failures: AtomicU32,
    credit_attempts: AtomicU32,
}

impl FlakyLedger {
    pub fn new(failures: u32) -> Self {
        Self {
            inner: MemoryLedger::new(),
            failures: AtomicU32::new(failures),
            credit_attempts: AtomicU32::new(0),
        }
    }

    /// A ledger on which every credit fails.
    pub fn broken() -> Self {
        Self::new(u32::MAX)
    }

    /// Credit calls seen so far, failed ones included.
    pub fn credit_attempts(&self) -> u32 {
        self.credit_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for FlakyLedger {
    async fn credit(&self, player: PlayerId, amount: u64) -> Result<u64, LedgerError> {
        self.credit_attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failed {
            return Err(LedgerError::Unavailable("injected failure".to_string()));
        }
        self.inner.credit(player, amount).await
    }

    async fn debit(&self, player: PlayerId, amount: u64) -> Result<u64, LedgerError> {
        self.inner.debit(player, amount).await
    }

    async fn grant_item(
        &self,
        player: PlayerId,
        item: &str,
        quantity: u32,
    ) -> Result<(), LedgerError> {
        self.inner.grant_item(player, item, quantity).await
    }

    async fn balance(&self, player: PlayerId) -> Result<u64, LedgerError> {
        self.inner.balance(player).await
    }

    async fn items(&self, player: PlayerId) -> Result<BTreeMap<String, u32>, LedgerError> {
        self.inner.items(player).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_flaky_ledger_recovers() {
        let ledger = FlakyLedger::new(2);
        let player = PlayerId(1);
        assert!(ledger.credit(player, 10).await.is_err());
        assert!(ledger.credit(player, 10).await.is_err());
        assert_eq!(ledger.credit(player, 10).await.unwrap(), 10);
        assert_eq!(ledger.credit_attempts(), 3);
        assert_eq!(ledger.balance(player).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_broken_ledger_never_credits() {
        let ledger = FlakyLedger::broken();
        for _ in 0..5 {
            assert!(ledger.credit(PlayerId(1), 10).await.is_err());
        }
        assert_eq!(ledger.balance(PlayerId(1)).await.unwrap(), 0);
        assert_eq!(roster(3), vec![PlayerId(1), PlayerId(2), PlayerId(3)]);
    }
}
