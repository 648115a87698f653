//! Reward payouts.
//!
//! Every ledger write made on a player's behalf goes through [Payout]: transient
//! failures are retried with doubling backoff, and a write that still fails is reported
//! to the channel with the player and amount so it can be reconciled by hand. Terminal
//! awards are additionally guarded by the session's one-shot resolution flag.

use crate::{messenger::Narrator, registry::Session, PayoutPolicy};
use prometheus_client::metrics::counter::Counter;
use shadowspire_execution::{Ledger, LedgerError};
use shadowspire_types::{games::CURRENCY, Event, PlayerId};
use std::{future::Future, sync::Arc};
use tokio::{sync::broadcast, time::sleep};
use tracing::{debug, error, info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayoutReport {
    Credited {
        player: PlayerId,
        amount: u64,
        balance: u64,
    },
    Failed {
        player: PlayerId,
        amount: u64,
        error: LedgerError,
    },
}

#[derive(Clone)]
pub struct Payout {
    ledger: Arc<dyn Ledger>,
    policy: PayoutPolicy,
    narrator: Narrator,
    events: broadcast::Sender<Event>,
    credited: Counter,
    failed: Counter,
}

impl Payout {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        policy: PayoutPolicy,
        narrator: Narrator,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            ledger,
            policy,
            narrator,
            events,
            credited: Counter::default(),
            failed: Counter::default(),
        }
    }

    /// Count outcomes on shared counters.
    pub fn with_counters(mut self, credited: Counter, failed: Counter) -> Self {
        self.credited = credited;
        self.failed = failed;
        self
    }

    fn emit(&self, event: Event) {
        if let Err(e) = self.events.send(event) {
            debug!("no event subscribers: {}", e);
        }
    }

    async fn with_retry<F, Fut>(
        &self,
        player: PlayerId,
        amount: u64,
        mut op: F,
    ) -> Result<u64, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<u64, LedgerError>>,
    {
        let attempts = self.policy.attempts.max(1);
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(balance) => return Ok(balance),
                // Retrying cannot fix a low balance
                Err(err @ LedgerError::InsufficientFunds { .. }) => return Err(err),
                Err(err) if attempt >= attempts => return Err(err),
                Err(err) => {
                    warn!(player = %player, amount, attempt, ?err, "ledger write failed, retrying");
                    sleep(backoff).await;
                    backoff = std::cmp::min(backoff.saturating_mul(2), self.policy.max_backoff);
                }
            }
        }
    }

    async fn report_failure(&self, player: PlayerId, amount: u64, err: &LedgerError, verb: &str) {
        error!(channel = %self.narrator.channel(), player = %player, amount, ?err, "payout failed");
        self.failed.inc();
        self.narrator
            .say(format!(
                "⚠️ Could not {verb} **{amount} {CURRENCY}** for {player} ({err}). \
                 An admin needs to settle this by hand."
            ))
            .await;
        self.emit(Event::RewardFailed {
            channel: self.narrator.channel(),
            player,
            amount,
            reason: err.to_string(),
        });
    }

    /// Credit `amount` to `player`.
    pub async fn pay(&self, player: PlayerId, amount: u64) -> PayoutReport {
        let ledger = self.ledger.clone();
        let result = self
            .with_retry(player, amount, || ledger.credit(player, amount))
            .await;
        match result {
            Ok(balance) => {
                info!(channel = %self.narrator.channel(), player = %player, amount, balance, "reward credited");
                self.credited.inc();
                self.emit(Event::RewardCredited {
                    channel: self.narrator.channel(),
                    player,
                    amount,
                });
                PayoutReport::Credited {
                    player,
                    amount,
                    balance,
                }
            }
            Err(error) => {
                self.report_failure(player, amount, &error, "credit").await;
                PayoutReport::Failed {
                    player,
                    amount,
                    error,
                }
            }
        }
    }

    /// Debit `amount` from `player`. Insufficient funds are returned without a report.
    pub async fn charge(&self, player: PlayerId, amount: u64) -> Result<u64, LedgerError> {
        let ledger = self.ledger.clone();
        let result = self
            .with_retry(player, amount, || ledger.debit(player, amount))
            .await;
        if let Err(err @ LedgerError::Unavailable(_)) = &result {
            self.report_failure(player, amount, err, "debit").await;
        }
        result
    }

    /// Claim the session's terminal resolution and pay every winner.
    ///
    /// Returns `None` if the session was already resolved; nothing is paid twice.
    pub async fn award(
        &self,
        session: &Session,
        winners: &[(PlayerId, u64)],
    ) -> Option<Vec<PayoutReport>> {
        if !session.try_resolve() {
            error!(
                channel = %session.channel(),
                kind = ?session.kind(),
                "terminal resolution attempted twice"
            );
            return None;
        }
        let mut reports = Vec::with_capacity(winners.len());
        for (player, amount) in winners {
            reports.push(self.pay(*player, *amount).await);
        }
        Some(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{mocks::ScriptedMessenger, registry::Registry};
    use shadowspire_execution::{mocks::FlakyLedger, MemoryLedger};
    use shadowspire_types::{games::GameKind, ChannelKey};
    use std::time::Duration;

    fn policy() -> PayoutPolicy {
        PayoutPolicy {
            attempts: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(2),
        }
    }

    fn payout(
        ledger: Arc<dyn Ledger>,
    ) -> (
        Payout,
        Arc<ScriptedMessenger>,
        broadcast::Receiver<Event>,
    ) {
        let messenger = Arc::new(ScriptedMessenger::new());
        let (events, receiver) = broadcast::channel(16);
        let narrator = Narrator::new(messenger.clone(), ChannelKey(1));
        (Payout::new(ledger, policy(), narrator, events), messenger, receiver)
    }

    #[tokio::test(start_paused = true)]
    async fn test_award_is_idempotent() {
        let ledger = Arc::new(MemoryLedger::new());
        let (payout, _, _) = payout(ledger.clone());
        let registry = Registry::new();
        let (session, _inbox) = registry
            .create(ChannelKey(1), GameKind::Massacre, PlayerId(1), vec![])
            .unwrap();

        let first = payout.award(&session, &[(PlayerId(2), 10_000)]).await;
        assert_eq!(first.map(|r| r.len()), Some(1));
        assert!(payout.award(&session, &[(PlayerId(2), 10_000)]).await.is_none());
        assert_eq!(ledger.balance(PlayerId(2)).await.unwrap(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried() {
        let ledger = Arc::new(FlakyLedger::new(1));
        let (payout, messenger, mut events) = payout(ledger.clone());
        let report = payout.pay(PlayerId(3), 500).await;
        assert_eq!(
            report,
            PayoutReport::Credited {
                player: PlayerId(3),
                amount: 500,
                balance: 500
            }
        );
        assert_eq!(ledger.credit_attempts(), 2);
        assert!(messenger.channel_messages(ChannelKey(1)).is_empty());
        assert!(matches!(
            events.try_recv().unwrap(),
            Event::RewardCredited { amount: 500, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_reported() {
        let ledger = Arc::new(FlakyLedger::broken());
        let (payout, messenger, mut events) = payout(ledger.clone());
        let failed = Counter::default();
        let payout = payout.with_counters(Counter::default(), failed.clone());

        let report = payout.pay(PlayerId(4), 1_000).await;
        assert!(matches!(report, PayoutReport::Failed { amount: 1_000, .. }));
        assert_eq!(ledger.credit_attempts(), 3);
        assert_eq!(failed.get(), 1);
        assert!(messenger.said(ChannelKey(1), "1000"));
        assert!(messenger.said(ChannelKey(1), &PlayerId(4).to_string()));
        assert!(matches!(
            events.try_recv().unwrap(),
            Event::RewardFailed { amount: 1_000, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_charge_insufficient_not_retried() {
        let ledger = Arc::new(MemoryLedger::new());
        let (payout, messenger, _) = payout(ledger.clone());
        ledger.credit(PlayerId(5), 10).await.unwrap();
        assert_eq!(
            payout.charge(PlayerId(5), 50).await,
            Err(LedgerError::InsufficientFunds {
                needed: 50,
                available: 10
            })
        );
        assert_eq!(payout.charge(PlayerId(5), 10).await, Ok(0));
        assert!(messenger.channel_messages(ChannelKey(1)).is_empty());
    }
}
