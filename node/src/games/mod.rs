//! Session drivers.
//!
//! Each session runs as one task: the lobby (if the game has one), then the game's phase
//! loop, then the terminal payout. Drivers return [Cancelled] from any suspension point
//! once the session is torn down and never resolve after that.

pub mod bingo;
pub mod blackjack;
pub mod hanged_cookie;
pub mod hidden_beast;
pub mod massacre;

use crate::{
    messenger::{MessageHandle, Narrator},
    payout::{Payout, PayoutReport},
    phase::{Cancelled, Collector, PhaseController, PhaseEnd, PhaseSpec},
    registry::{Input, InputKind, Session},
    ValidatedConfig,
};
use shadowspire_execution::{games::hangman::HiddenWord, GameRng};
use shadowspire_types::{
    games::{GameKind, Phase, Role, CURRENCY},
    Event, PlayerId,
};
use std::{sync::Arc, time::Duration};
use tracing::{info, warn};

/// How a session task begins.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Setup {
    /// Gather players until the host starts.
    Lobby,
    HangedCookie,
    Blackjack { bet: u64 },
}

/// Everything a driver needs to run one session.
pub struct SessionContext {
    pub controller: PhaseController,
    pub narrator: Narrator,
    pub payout: Payout,
    pub config: Arc<ValidatedConfig>,
    pub rng: GameRng,
}

impl SessionContext {
    pub fn session(&self) -> Arc<Session> {
        self.controller.session().clone()
    }

    pub fn emit(&self, event: Event) {
        self.controller.emit(event);
    }

    pub async fn say(&self, content: impl Into<String>) -> Option<MessageHandle> {
        self.narrator.say(content).await
    }

    pub async fn pause(&mut self, duration: Duration) -> Result<(), Cancelled> {
        self.controller.pause(duration).await
    }

    /// Post a line, then hold for the narration delay.
    pub async fn narrate(&mut self, content: impl Into<String>) -> Result<(), Cancelled> {
        self.say(content).await;
        let delay = self.config.narration_delay;
        self.pause(delay).await
    }

    /// Privately ask `player` to pick one of `targets` within the choice timeout.
    pub async fn ask(
        &self,
        player: PlayerId,
        prompt: impl Into<String>,
        targets: &[PlayerId],
    ) -> Result<Option<PlayerId>, Cancelled> {
        let cancel = self.controller.session().cancel_token();
        self.narrator
            .ask_player(player, prompt, targets, self.config.choice_timeout, &cancel)
            .await
    }

    pub fn eliminated(&self, player: PlayerId, role: Option<Role>) {
        let session = self.controller.session();
        self.emit(Event::ParticipantEliminated {
            channel: session.channel(),
            kind: session.kind(),
            player,
            role,
        });
    }

    /// Terminal win: pay `reward` to each winner. Runs at most once per session.
    pub async fn win(&self, winners: Vec<PlayerId>, reward: u64) {
        let session = self.session();
        let awards: Vec<(PlayerId, u64)> = winners.iter().map(|p| (*p, reward)).collect();
        let Some(reports) = self.payout.award(&session, &awards).await else {
            return;
        };
        info!(channel = %session.channel(), kind = ?session.kind(), winners = winners.len(), reward, "game won");
        self.emit(Event::GameWon {
            channel: session.channel(),
            kind: session.kind(),
            winners,
            reward,
        });
        let paid: Vec<String> = reports
            .iter()
            .filter_map(|r| match r {
                PayoutReport::Credited { player, .. } => Some(player.to_string()),
                PayoutReport::Failed { .. } => None,
            })
            .collect();
        if !paid.is_empty() {
            self.say(format!(
                "💰 {} received **{reward} {CURRENCY}**{}.",
                paid.join(", "),
                if paid.len() > 1 { " each" } else { "" }
            ))
            .await;
        }
    }

    /// Terminal loss with no payout. Runs at most once per session.
    pub fn lose(&self) {
        let session = self.controller.session();
        if !session.try_resolve() {
            return;
        }
        info!(channel = %session.channel(), kind = ?session.kind(), "game lost");
        self.emit(Event::GameLost {
            channel: session.channel(),
            kind: session.kind(),
        });
    }
}

/// Waits for the host's start signal.
struct StartSignal {
    host: PlayerId,
    started: bool,
}

impl Collector for StartSignal {
    type Output = bool;

    fn accept(&mut self, input: Input) -> bool {
        if input.player == self.host && input.kind == InputKind::Start {
            self.started = true;
        }
        self.started
    }

    fn is_complete(&self) -> bool {
        self.started
    }

    fn resolve(self, _end: PhaseEnd) -> bool {
        self.started
    }
}

/// Hold the lobby open until the host starts it or it times out.
///
/// Returns false if the lobby expired.
async fn await_start(ctx: &mut SessionContext) -> Result<bool, Cancelled> {
    let session = ctx.session();
    let spec = PhaseSpec::new(Phase::Lobby, 0, ctx.config.lobby_timeout);
    let signal = StartSignal {
        host: session.host(),
        started: false,
    };
    if ctx.controller.collect(spec, signal).await? {
        return Ok(true);
    }
    // The host may have started in the same instant the timer fired
    let expired = session.update(|info| {
        if info.phase == Phase::Lobby {
            info.phase = Phase::Finished;
            true
        } else {
            false
        }
    });
    if !expired {
        return Ok(true);
    }
    info!(channel = %session.channel(), kind = ?session.kind(), "lobby expired");
    ctx.say(format!(
        "⌛ The {} lobby closed because it was never started.",
        session.kind()
    ))
    .await;
    Ok(false)
}

/// Drive a session from its first phase to its end.
pub async fn run_session(ctx: &mut SessionContext, setup: Setup) -> Result<(), Cancelled> {
    let session = ctx.session();
    match setup {
        Setup::Lobby => {
            if !await_start(ctx).await? {
                return Ok(());
            }
            let roster = session.read(|info| info.participants.clone());
            info!(channel = %session.channel(), kind = ?session.kind(), players = roster.len(), "session started");
            ctx.emit(Event::SessionStarted {
                channel: session.channel(),
                kind: session.kind(),
                participants: roster.clone(),
            });
            match session.kind() {
                GameKind::Massacre => massacre::play(ctx, &roster).await,
                GameKind::HiddenBeast => hidden_beast::play(ctx, &roster).await,
                GameKind::Bingo => bingo::play(ctx, &roster).await,
                kind => {
                    warn!(?kind, "game has no lobby");
                    Ok(())
                }
            }
        }
        Setup::HangedCookie => {
            let word = HiddenWord::random(&mut ctx.rng);
            hanged_cookie::play(ctx, session.host(), word).await
        }
        Setup::Blackjack { bet } => blackjack::play(ctx, session.host(), bet).await,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        mocks::ScriptedMessenger,
        registry::{Inbox, Registry},
        Config,
    };
    use shadowspire_execution::{Ledger, MemoryLedger};
    use shadowspire_types::ChannelKey;
    use tokio::sync::broadcast;

    pub(crate) struct Harness {
        pub registry: Registry,
        pub messenger: Arc<ScriptedMessenger>,
        pub ledger: Arc<MemoryLedger>,
        pub events: broadcast::Sender<Event>,
        pub config: Arc<ValidatedConfig>,
    }

    impl Harness {
        pub fn new() -> Self {
            let (events, _) = broadcast::channel(1024);
            Self {
                registry: Registry::new(),
                messenger: Arc::new(ScriptedMessenger::new()),
                ledger: Arc::new(MemoryLedger::new()),
                events,
                config: Arc::new(Config::default().validate().unwrap()),
            }
        }

        pub fn context(&self, session: Arc<Session>, inbox: Inbox, seed: u64) -> SessionContext {
            let narrator = Narrator::new(self.messenger.clone(), session.channel());
            let ledger: Arc<dyn Ledger> = self.ledger.clone();
            SessionContext {
                payout: Payout::new(
                    ledger,
                    self.config.payout,
                    narrator.clone(),
                    self.events.clone(),
                ),
                controller: PhaseController::new(session.clone(), inbox, self.events.clone()),
                narrator,
                config: self.config.clone(),
                rng: GameRng::new(seed, session.id(), 0),
            }
        }

        pub fn session(
            &self,
            kind: GameKind,
            players: &[PlayerId],
        ) -> (Arc<Session>, SessionContext) {
            let (session, inbox) = self
                .registry
                .create(ChannelKey(1), kind, players[0], players.to_vec())
                .unwrap();
            let ctx = self.context(session.clone(), inbox, 7);
            (session, ctx)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_win_pays_once() {
        let harness = Harness::new();
        let mut events = harness.events.subscribe();
        let (_, ctx) = harness.session(GameKind::Massacre, &[PlayerId(1), PlayerId(2)]);
        ctx.win(vec![PlayerId(2)], 10_000).await;
        ctx.win(vec![PlayerId(2)], 10_000).await;
        ctx.lose();
        assert_eq!(harness.ledger.balance(PlayerId(2)).await.unwrap(), 10_000);

        let mut won = 0;
        while let Ok(event) = events.try_recv() {
            match event {
                Event::GameWon { .. } => won += 1,
                Event::GameLost { .. } => panic!("lost after win"),
                _ => {}
            }
        }
        assert_eq!(won, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lobby_expires() {
        let harness = Harness::new();
        let (session, mut ctx) = harness.session(GameKind::Bingo, &[PlayerId(1)]);
        let start = tokio::time::Instant::now();
        run_session(&mut ctx, Setup::Lobby).await.unwrap();
        assert_eq!(start.elapsed(), harness.config.lobby_timeout);
        assert_eq!(session.info().phase, Phase::Finished);
        assert!(harness.messenger.said(ChannelKey(1), "never started"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lobby_ignores_start_from_others() {
        let harness = Harness::new();
        let (session, mut ctx) = harness.session(GameKind::Bingo, &[PlayerId(1)]);
        session.send_input(Input {
            player: PlayerId(2),
            kind: InputKind::Start,
        });
        assert!(!await_start(&mut ctx).await.unwrap());
    }
}
