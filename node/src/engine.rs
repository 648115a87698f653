//! The session engine.
//!
//! [Engine] turns player commands into sessions: it checks lobby rules, registers the
//! session, spawns its driver task and routes later input to it. Every session task is
//! tracked so [Engine::shutdown] can cancel and drain them.

use crate::{
    games::{run_session, SessionContext, Setup},
    messenger::{Messenger, Narrator},
    payout::Payout,
    phase::PhaseController,
    registry::{Inbox, Input, Registry, RegistryError, Session},
    ValidatedConfig,
};
use prometheus_client::{
    encoding::text::encode, metrics::counter::Counter, registry::Registry as MetricsRegistry,
};
use shadowspire_execution::{GameRng, Ledger, LedgerError};
use shadowspire_types::{
    games::{GameKind, Phase},
    ChannelKey, Event, PlayerId,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Capacity of the outcome event channel.
const EVENT_BUFFER: usize = 1_024;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{kind} needs at least {min} players (got {got})")]
    InsufficientParticipants {
        kind: GameKind,
        min: usize,
        got: usize,
    },
    #[error("the {kind} lobby is full ({max} players)")]
    LobbyFull { kind: GameKind, max: usize },
    #[error("only the host can do that")]
    NotHost,
    #[error("{player} already joined")]
    AlreadyJoined { player: PlayerId },
    #[error("{player} is not in the lobby")]
    NotJoined { player: PlayerId },
    #[error("the {kind} game has already started")]
    AlreadyStarted { kind: GameKind },
    #[error("there is no {kind} lobby in {channel}")]
    NoLobby { channel: ChannelKey, kind: GameKind },
    #[error("{kind} does not use a lobby")]
    LobbyUnsupported { kind: GameKind },
    #[error("{player} may not grant currency")]
    NotAdmin { player: PlayerId },
    #[error("bets must be positive")]
    InvalidBet,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Engine counters, registered once on a prometheus registry.
#[derive(Clone, Default)]
pub struct Metrics {
    pub sessions_started: Counter,
    pub sessions_finished: Counter,
    pub session_conflicts: Counter,
    pub payouts_credited: Counter,
    pub payouts_failed: Counter,
}

impl Metrics {
    fn register(&self, registry: &mut MetricsRegistry) {
        registry.register(
            "sessions_started",
            "Number of sessions created",
            self.sessions_started.clone(),
        );
        registry.register(
            "sessions_finished",
            "Number of session tasks that ended",
            self.sessions_finished.clone(),
        );
        registry.register(
            "session_conflicts",
            "Number of sessions refused because one was already active",
            self.session_conflicts.clone(),
        );
        registry.register(
            "payouts_credited",
            "Number of rewards written to the ledger",
            self.payouts_credited.clone(),
        );
        registry.register(
            "payouts_failed",
            "Number of ledger writes that failed after every retry",
            self.payouts_failed.clone(),
        );
    }
}

pub struct Engine {
    config: Arc<ValidatedConfig>,
    messenger: Arc<dyn Messenger>,
    ledger: Arc<dyn Ledger>,
    registry: Arc<Registry>,
    events: broadcast::Sender<Event>,
    metrics: Metrics,
    metrics_registry: MetricsRegistry,
    tracker: TaskTracker,
    seed: u64,
}

impl Engine {
    pub fn new(
        config: ValidatedConfig,
        messenger: Arc<dyn Messenger>,
        ledger: Arc<dyn Ledger>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let metrics = Metrics::default();
        let mut metrics_registry = MetricsRegistry::with_prefix("shadowspire");
        metrics.register(&mut metrics_registry);
        let seed = config.rng_seed.unwrap_or_else(rand::random);
        Self {
            config: Arc::new(config),
            messenger,
            ledger,
            registry: Arc::new(Registry::new()),
            events,
            metrics,
            metrics_registry,
            tracker: TaskTracker::new(),
            seed,
        }
    }

    /// Subscribe to outcome events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Render every engine metric in the text exposition format.
    pub fn encode_metrics(&self) -> String {
        let mut buffer = String::new();
        if let Err(err) = encode(&mut buffer, &self.metrics_registry) {
            warn!(?err, "failed to encode metrics");
        }
        buffer
    }

    fn emit(&self, event: Event) {
        if let Err(e) = self.events.send(event) {
            debug!("no event subscribers: {}", e);
        }
    }

    async fn say(&self, channel: ChannelKey, content: impl Into<String>) {
        Narrator::new(self.messenger.clone(), channel)
            .say(content)
            .await;
    }

    fn create(
        &self,
        channel: ChannelKey,
        kind: GameKind,
        host: PlayerId,
        participants: Vec<PlayerId>,
    ) -> Result<(Arc<Session>, Inbox), EngineError> {
        match self.registry.create(channel, kind, host, participants) {
            Ok(created) => {
                self.metrics.sessions_started.inc();
                self.emit(Event::SessionCreated {
                    channel,
                    kind,
                    host,
                });
                Ok(created)
            }
            Err(err) => {
                self.metrics.session_conflicts.inc();
                info!(channel = %channel, kind = ?kind, host = %host, "session refused: already active");
                Err(err.into())
            }
        }
    }

    fn payout(&self, channel: ChannelKey) -> Payout {
        Payout::new(
            self.ledger.clone(),
            self.config.payout,
            Narrator::new(self.messenger.clone(), channel),
            self.events.clone(),
        )
        .with_counters(
            self.metrics.payouts_credited.clone(),
            self.metrics.payouts_failed.clone(),
        )
    }

    fn spawn(&self, session: Arc<Session>, inbox: Inbox, setup: Setup) {
        let narrator = Narrator::new(self.messenger.clone(), session.channel());
        let mut ctx = SessionContext {
            controller: PhaseController::new(session.clone(), inbox, self.events.clone()),
            narrator,
            payout: self.payout(session.channel()),
            config: self.config.clone(),
            rng: GameRng::new(self.seed, session.id(), 0),
        };
        let registry = self.registry.clone();
        let events = self.events.clone();
        let finished = self.metrics.sessions_finished.clone();
        self.tracker.spawn(async move {
            let cancelled = run_session(&mut ctx, setup).await.is_err();
            registry.release(&session);
            finished.inc();
            info!(
                channel = %session.channel(),
                kind = ?session.kind(),
                id = session.id(),
                cancelled,
                "session finished"
            );
            let ended = Event::SessionEnded {
                channel: session.channel(),
                kind: session.kind(),
                cancelled,
            };
            if let Err(e) = events.send(ended) {
                debug!("no event subscribers: {}", e);
            }
        });
    }

    fn lobby(&self, channel: ChannelKey, kind: GameKind) -> Result<Arc<Session>, EngineError> {
        self.registry
            .get(channel, kind)
            .filter(|_| kind.has_lobby())
            .ok_or(EngineError::NoLobby { channel, kind })
    }

    /// Open a lobby. The host is not joined automatically.
    pub async fn open_lobby(
        &self,
        channel: ChannelKey,
        kind: GameKind,
        host: PlayerId,
    ) -> Result<Arc<Session>, EngineError> {
        if !kind.has_lobby() {
            return Err(EngineError::LobbyUnsupported { kind });
        }
        let (session, inbox) = self.create(channel, kind, host, Vec::new())?;
        self.say(
            channel,
            format!(
                "🎮 {host} opened a **{kind}** lobby. Type `!join` to enter; the host starts \
                 with `!start {kind}`. It closes in {} minutes if never started.",
                self.config.lobby_timeout.as_secs() / 60
            ),
        )
        .await;
        self.spawn(session.clone(), inbox, Setup::Lobby);
        Ok(session)
    }

    /// Join the `kind` lobby open in `channel`.
    pub async fn join(
        &self,
        channel: ChannelKey,
        kind: GameKind,
        player: PlayerId,
    ) -> Result<usize, EngineError> {
        let session = self.lobby(channel, kind)?;
        let joined = session.update(|info| {
            if info.phase != Phase::Lobby {
                return Err(EngineError::AlreadyStarted { kind });
            }
            if let Some(max) = kind.max_participants() {
                if info.participants.len() >= max {
                    return Err(EngineError::LobbyFull { kind, max });
                }
            }
            if !info.add_participant(player) {
                return Err(EngineError::AlreadyJoined { player });
            }
            Ok(info.participants.len())
        })?;
        info!(channel = %channel, kind = ?kind, player = %player, joined, "player joined");
        self.say(
            channel,
            format!("➕ {player} joined the {kind} lobby ({joined} in)."),
        )
        .await;
        Ok(joined)
    }

    pub async fn leave(
        &self,
        channel: ChannelKey,
        kind: GameKind,
        player: PlayerId,
    ) -> Result<usize, EngineError> {
        let session = self.lobby(channel, kind)?;
        let remaining = session.update(|info| {
            if info.phase != Phase::Lobby {
                return Err(EngineError::AlreadyStarted { kind });
            }
            if !info.remove_participant(&player) {
                return Err(EngineError::NotJoined { player });
            }
            Ok(info.participants.len())
        })?;
        info!(channel = %channel, kind = ?kind, player = %player, remaining, "player left");
        self.say(
            channel,
            format!("➖ {player} left the {kind} lobby ({remaining} in)."),
        )
        .await;
        Ok(remaining)
    }

    /// Start a lobby. Only the host may start, and only with enough players.
    pub fn start(
        &self,
        channel: ChannelKey,
        kind: GameKind,
        player: PlayerId,
    ) -> Result<(), EngineError> {
        let session = self.lobby(channel, kind)?;
        if session.host() != player {
            return Err(EngineError::NotHost);
        }
        let min = kind.min_participants();
        // The lobby timer may race this flip; whichever changes the phase first wins
        session.update(|info| {
            if info.phase != Phase::Lobby {
                return Err(EngineError::AlreadyStarted { kind });
            }
            let got = info.participants.len();
            if got < min {
                return Err(EngineError::InsufficientParticipants { kind, min, got });
            }
            info.phase = Phase::Intro;
            Ok(())
        })?;
        session.send_input(Input::start(player));
        Ok(())
    }

    /// Tear down a session. Only its host may cancel it.
    pub async fn cancel(
        &self,
        channel: ChannelKey,
        kind: GameKind,
        player: PlayerId,
    ) -> Result<(), EngineError> {
        let session = self
            .registry
            .get(channel, kind)
            .ok_or(RegistryError::NotFound { channel, kind })?;
        if session.host() != player {
            return Err(EngineError::NotHost);
        }
        self.registry.end(channel, kind)?;
        info!(channel = %channel, kind = ?kind, host = %player, "session cancelled");
        self.say(channel, format!("🛑 The {kind} game was cancelled by the host."))
            .await;
        Ok(())
    }

    /// Start a word-guessing game for `player`.
    pub fn hanged_cookie(
        &self,
        channel: ChannelKey,
        player: PlayerId,
    ) -> Result<Arc<Session>, EngineError> {
        let (session, inbox) = self.create(channel, GameKind::HangedCookie, player, vec![player])?;
        self.spawn(session.clone(), inbox, Setup::HangedCookie);
        Ok(session)
    }

    /// Deal a blackjack hand. The bet is debited before the hand starts, so a balance
    /// never backs two hands at once.
    pub async fn blackjack(
        &self,
        channel: ChannelKey,
        player: PlayerId,
        bet: u64,
    ) -> Result<Arc<Session>, EngineError> {
        if bet == 0 {
            return Err(EngineError::InvalidBet);
        }
        let payout = self.payout(channel);
        let balance = payout.charge(player, bet).await?;
        debug!(channel = %channel, player = %player, bet, balance, "blackjack bet held");
        match self.create(channel, GameKind::Blackjack, player, vec![player]) {
            Ok((session, inbox)) => {
                self.spawn(session.clone(), inbox, Setup::Blackjack { bet });
                Ok(session)
            }
            Err(err) => {
                payout.pay(player, bet).await;
                Err(err)
            }
        }
    }

    /// Credit currency directly. Only configured admins may grant.
    pub async fn grant(
        &self,
        admin: PlayerId,
        player: PlayerId,
        amount: u64,
    ) -> Result<u64, EngineError> {
        if !self.config.admins.contains(&admin) {
            warn!(admin = %admin, player = %player, amount, "grant refused");
            return Err(EngineError::NotAdmin { player: admin });
        }
        let balance = self.ledger.credit(player, amount).await?;
        info!(admin = %admin, player = %player, amount, balance, "currency granted");
        Ok(balance)
    }

    pub async fn balance(&self, player: PlayerId) -> Result<u64, EngineError> {
        Ok(self.ledger.balance(player).await?)
    }

    /// Deliver free text to every session in `channel`. Returns how many accepted it.
    pub fn route_text(&self, channel: ChannelKey, player: PlayerId, text: &str) -> usize {
        self.route(channel, Input::text(player, text))
    }

    /// Deliver a shared-selection answer to every session in `channel`.
    pub fn route_choice(&self, channel: ChannelKey, player: PlayerId, option: &str) -> usize {
        self.route(channel, Input::choice(player, option))
    }

    fn route(&self, channel: ChannelKey, input: Input) -> usize {
        self.registry
            .in_channel(channel)
            .iter()
            .filter(|session| session.send_input(input.clone()))
            .count()
    }

    /// Cancel every session and wait for their tasks to finish.
    pub async fn shutdown(&self) {
        let sessions = self.registry.all();
        info!(sessions = sessions.len(), "shutting down");
        for session in sessions {
            if let Err(err) = self.registry.end(session.channel(), session.kind()) {
                debug!(?err, "session already gone");
            }
        }
        self.tracker.close();
        self.tracker.wait().await;
    }
}
