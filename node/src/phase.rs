//! Timed phase controller.
//!
//! A phase waits until its deadline passes, its [Collector] reports completion, or the
//! session is cancelled. Input arriving during the phase is offered to the collector;
//! an optional tick lets the collector refresh live messages without holding up
//! resolution. Resolution consumes the collector, so it runs at most once per phase and
//! never after cancellation.

use crate::registry::{Inbox, Input, InputKind, Session};
use async_trait::async_trait;
use shadowspire_types::{games::Phase, Event, PlayerId};
use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tokio::{
    sync::broadcast,
    time::{interval_at, sleep_until, Instant, Interval, MissedTickBehavior},
};
use tracing::{debug, info};

/// The session was torn down while suspended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("session cancelled")]
pub struct Cancelled;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhaseEnd {
    /// The deadline passed.
    Elapsed,
    /// The collector finished early.
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseSpec {
    pub phase: Phase,
    pub round: u32,
    pub duration: Duration,
    pub tick: Option<Duration>,
}

impl PhaseSpec {
    pub fn new(phase: Phase, round: u32, duration: Duration) -> Self {
        Self {
            phase,
            round,
            duration,
            tick: None,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = Some(tick);
        self
    }
}

/// Input-collection contract of one phase.
#[async_trait]
pub trait Collector: Send {
    type Output: Send;

    /// Offer one input. Returns whether it was accepted.
    fn accept(&mut self, input: Input) -> bool;

    /// Early-completion condition.
    fn is_complete(&self) -> bool {
        false
    }

    /// Called every tick with the time left in the phase.
    async fn tick(&mut self, _remaining: Duration) {}

    fn resolve(self, end: PhaseEnd) -> Self::Output;
}

/// Takes the first text input from one player.
pub struct FirstText {
    from: PlayerId,
    text: Option<String>,
}

impl FirstText {
    pub fn new(from: PlayerId) -> Self {
        Self { from, text: None }
    }
}

impl Collector for FirstText {
    type Output = Option<String>;

    fn accept(&mut self, input: Input) -> bool {
        if input.player != self.from || self.text.is_some() {
            return false;
        }
        match input.kind {
            InputKind::Text(text) => {
                self.text = Some(text);
                true
            }
            _ => false,
        }
    }

    fn is_complete(&self) -> bool {
        self.text.is_some()
    }

    fn resolve(self, _end: PhaseEnd) -> Option<String> {
        self.text
    }
}

fn deadline_ms(duration: Duration) -> u64 {
    SystemTime::now()
        .checked_add(duration)
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Drives one session's phases strictly in sequence.
pub struct PhaseController {
    session: Arc<Session>,
    inbox: Inbox,
    events: broadcast::Sender<Event>,
}

impl PhaseController {
    pub fn new(session: Arc<Session>, inbox: Inbox, events: broadcast::Sender<Event>) -> Self {
        Self {
            session,
            inbox,
            events,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn emit(&self, event: Event) {
        if let Err(e) = self.events.send(event) {
            debug!("no event subscribers: {}", e);
        }
    }

    /// Fail fast if the session was torn down.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.session.is_cancelled() {
            return Err(Cancelled);
        }
        Ok(())
    }

    /// Record a phase change on the session and announce it.
    pub fn enter(&self, phase: Phase, round: u32, duration: Option<Duration>) {
        let (channel, kind) = self.session.update(|info| {
            info.phase = phase;
            info.round = round;
            info.deadline_ms = duration.map(deadline_ms);
            (info.channel, info.kind)
        });
        debug!(channel = %channel, kind = ?kind, %phase, round, "phase begin");
        self.emit(Event::PhaseChanged {
            channel,
            kind,
            phase,
            round,
        });
    }

    /// Enter a phase, run it to its end and resolve it.
    pub async fn run<C: Collector>(
        &mut self,
        spec: PhaseSpec,
        collector: C,
    ) -> Result<C::Output, Cancelled> {
        self.checkpoint()?;
        self.enter(spec.phase, spec.round, Some(spec.duration));
        self.collect(spec, collector).await
    }

    /// Run a phase without touching the session's phase tag (the lobby sets its own).
    pub async fn collect<C: Collector>(
        &mut self,
        spec: PhaseSpec,
        mut collector: C,
    ) -> Result<C::Output, Cancelled> {
        self.checkpoint()?;
        let cancel = self.session.cancel_token();
        let start = Instant::now();
        let deadline = start + spec.duration;
        let timer = sleep_until(deadline);
        tokio::pin!(timer);
        let mut ticker = spec.tick.map(|period| {
            let mut ticker = interval_at(start + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        let end = loop {
            if collector.is_complete() {
                break PhaseEnd::Completed;
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(channel = %self.session.channel(), phase = %spec.phase, "phase cancelled");
                    return Err(Cancelled);
                }
                _ = &mut timer => break PhaseEnd::Elapsed,
                input = self.inbox.recv() => match input {
                    Some(input) => {
                        collector.accept(input);
                    }
                    None => return Err(Cancelled),
                },
                _ = next_tick(&mut ticker) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    collector.tick(remaining).await;
                }
            }
        };
        self.checkpoint()?;
        debug!(channel = %self.session.channel(), phase = %spec.phase, ?end, "phase end");
        Ok(collector.resolve(end))
    }

    /// Suspend for `duration`, discarding input. Does not change the session phase.
    pub async fn pause(&mut self, duration: Duration) -> Result<(), Cancelled> {
        let cancel = self.session.cancel_token();
        let timer = tokio::time::sleep(duration);
        tokio::pin!(timer);
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Cancelled),
                _ = &mut timer => return Ok(()),
                input = self.inbox.recv() => {
                    if input.is_none() {
                        return Err(Cancelled);
                    }
                }
            }
        }
    }
}
