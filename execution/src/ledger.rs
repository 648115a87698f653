//! Reward ledger.
//!
//! Games never touch a store directly: they credit, debit and grant items through
//! [Ledger]. [MemoryLedger] serializes every mutation per player so concurrent credits
//! and debits on the same account never lose an update.

use async_trait::async_trait;
use shadowspire_types::PlayerId;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient funds: needed {needed}, available {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Balance and inventory store.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Add `amount` and return the new balance.
    async fn credit(&self, player: PlayerId, amount: u64) -> Result<u64, LedgerError>;

    /// Remove `amount` and return the new balance. Fails without mutating when the
    /// balance is too low.
    async fn debit(&self, player: PlayerId, amount: u64) -> Result<u64, LedgerError>;

    async fn grant_item(&self, player: PlayerId, item: &str, quantity: u32)
        -> Result<(), LedgerError>;

    async fn balance(&self, player: PlayerId) -> Result<u64, LedgerError>;

    async fn items(&self, player: PlayerId) -> Result<BTreeMap<String, u32>, LedgerError>;
}

#[derive(Clone, Debug, Default)]
struct Account {
    balance: u64,
    items: BTreeMap<String, u32>,
}

/// In-memory [Ledger].
#[derive(Default)]
pub struct MemoryLedger {
    accounts: Mutex<HashMap<PlayerId, Arc<tokio::sync::Mutex<Account>>>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn account(&self, player: PlayerId) -> Arc<tokio::sync::Mutex<Account>> {
        let mut accounts = match self.accounts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        accounts.entry(player).or_default().clone()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn credit(&self, player: PlayerId, amount: u64) -> Result<u64, LedgerError> {
        let account = self.account(player);
        let mut account = account.lock().await;
        account.balance = account.balance.saturating_add(amount);
        debug!(player = %player, amount, balance = account.balance, "credited");
        Ok(account.balance)
    }

    async fn debit(&self, player: PlayerId, amount: u64) -> Result<u64, LedgerError> {
        let account = self.account(player);
        let mut account = account.lock().await;
        if account.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                needed: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        debug!(player = %player, amount, balance = account.balance, "debited");
        Ok(account.balance)
    }

    async fn grant_item(
        &self,
        player: PlayerId,
        item: &str,
        quantity: u32,
    ) -> Result<(), LedgerError> {
        let account = self.account(player);
        let mut account = account.lock().await;
        let held = account.items.entry(item.to_string()).or_default();
        *held = held.saturating_add(quantity);
        Ok(())
    }

    async fn balance(&self, player: PlayerId) -> Result<u64, LedgerError> {
        let account = self.account(player);
        let balance = account.lock().await.balance;
        Ok(balance)
    }

    async fn items(&self, player: PlayerId) -> Result<BTreeMap<String, u32>, LedgerError> {
        let account = self.account(player);
        let items = account.lock().await.items.clone();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_credit_debit() {
        let ledger = MemoryLedger::new();
        let player = PlayerId(1);
        assert_eq!(ledger.balance(player).await.unwrap(), 0);
        assert_eq!(ledger.credit(player, 500).await.unwrap(), 500);
        assert_eq!(ledger.debit(player, 200).await.unwrap(), 300);
        assert_eq!(
            ledger.debit(player, 301).await,
            Err(LedgerError::InsufficientFunds {
                needed: 301,
                available: 300
            })
        );
        assert_eq!(ledger.balance(player).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_grant_item_accumulates() {
        let ledger = MemoryLedger::new();
        let player = PlayerId(2);
        ledger.grant_item(player, "orchid locket", 1).await.unwrap();
        ledger.grant_item(player, "orchid locket", 2).await.unwrap();
        let items = ledger.items(player).await.unwrap();
        assert_eq!(items.get("orchid locket"), Some(&3));
        assert!(ledger.items(PlayerId(3)).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mutations_not_lost() {
        let ledger = Arc::new(MemoryLedger::new());
        let player = PlayerId(7);
        ledger.credit(player, 1_000).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..200u64 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    ledger.credit(player, 3).await.unwrap();
                } else {
                    ledger.debit(player, 1).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(ledger.balance(player).await.unwrap(), 1_000 + 100 * 3 - 100);
    }
}
