//! Terminal chat host.
//!
//! Channel messages and private messages are printed to stdout. Private prompts stay
//! pending until the player answers them with `!choose` or the prompt times out.

use crate::messenger::{ChoiceResponse, ChoiceSet, DeliveryFailure, MessageHandle, Messenger};
use async_trait::async_trait;
use futures::channel::oneshot;
use shadowspire_types::{
    games::{GameKind, UnknownGame},
    ChannelKey, PlayerId,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};
use thiserror::Error;
use tracing::debug;

/// One line typed in a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Open(GameKind),
    /// Join a lobby; without a game, the only open lobby in the channel.
    Join(Option<GameKind>),
    Leave(Option<GameKind>),
    Start(GameKind),
    Cancel(GameKind),
    HangedCookie,
    Blackjack(u64),
    Grant(u64),
    Balance,
    Choose(String),
    Metrics,
    /// Anything else: guesses, bingo claims, chatter.
    Text(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error(transparent)]
    UnknownGame(#[from] UnknownGame),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim();
        let mut words = line.split_whitespace();
        let Some(head) = words.next().filter(|w| w.starts_with('!')) else {
            return Ok(Command::Text(line.to_string()));
        };
        let arg = words.next();
        let game = |usage| -> Result<GameKind, CommandError> {
            Ok(arg
                .ok_or(CommandError::Usage(usage))?
                .parse::<GameKind>()?)
        };
        let optional_game = || -> Result<Option<GameKind>, CommandError> {
            Ok(arg.map(str::parse::<GameKind>).transpose()?)
        };
        let amount = |usage| -> Result<u64, CommandError> {
            arg.and_then(|a| a.parse().ok())
                .ok_or(CommandError::Usage(usage))
        };
        let command = match head.to_ascii_lowercase().as_str() {
            "!massacre" => Command::Open(GameKind::Massacre),
            "!hiddenbeast" => Command::Open(GameKind::HiddenBeast),
            "!bingo" => Command::Open(GameKind::Bingo),
            "!join" => Command::Join(optional_game()?),
            "!leave" => Command::Leave(optional_game()?),
            "!start" => Command::Start(game("!start <game>")?),
            "!cancel" => Command::Cancel(game("!cancel <game>")?),
            "!hangedcookie" => Command::HangedCookie,
            "!blackjack" => Command::Blackjack(amount("!blackjack <bet>")?),
            "!grant" => Command::Grant(amount("!grant <amount>")?),
            "!balance" => Command::Balance,
            "!choose" => Command::Choose(
                arg.ok_or(CommandError::Usage("!choose <option>"))?
                    .to_string(),
            ),
            "!metrics" => Command::Metrics,
            _ => Command::Text(line.to_string()),
        };
        Ok(command)
    }
}

struct Pending {
    options: ChoiceSet,
    reply: oneshot::Sender<String>,
}

#[derive(Default)]
pub struct ConsoleMessenger {
    next_handle: AtomicU64,
    pending: Mutex<HashMap<PlayerId, Pending>>,
}

impl ConsoleMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<PlayerId, Pending>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn handle(&self) -> MessageHandle {
        MessageHandle(self.next_handle.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Whether `player` has an open private prompt.
    pub fn is_waiting(&self, player: PlayerId) -> bool {
        self.pending().contains_key(&player)
    }

    /// Answer `player`'s open prompt. Returns false if there is none or `option` is not
    /// one of its keys.
    pub fn answer(&self, player: PlayerId, option: &str) -> bool {
        let mut pending = self.pending();
        let offered = pending
            .get(&player)
            .is_some_and(|p| p.options.contains(option));
        if !offered {
            return false;
        }
        match pending.remove(&player) {
            Some(p) => p.reply.send(option.to_string()).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send_channel_message(
        &self,
        channel: ChannelKey,
        content: String,
    ) -> Result<MessageHandle, DeliveryFailure> {
        let handle = self.handle();
        println!("[{channel}] ({}) {content}", handle.0);
        Ok(handle)
    }

    async fn send_private_message(
        &self,
        player: PlayerId,
        content: String,
        choice: Option<ChoiceSet>,
    ) -> Result<MessageHandle, DeliveryFailure> {
        let handle = self.handle();
        println!("[dm {player}] {content}");
        if let Some(choice) = choice {
            for option in choice.options {
                println!("[dm {player}]   !choose {}  ({})", option.key, option.label);
            }
        }
        Ok(handle)
    }

    async fn await_choice(
        &self,
        player: PlayerId,
        options: ChoiceSet,
        timeout: Duration,
    ) -> ChoiceResponse {
        let (reply, answer) = oneshot::channel();
        if let Some(previous) = self.pending().insert(player, Pending { options, reply }) {
            debug!(player = %player, offered = previous.options.options.len(), "replaced open prompt");
        }
        let response = match tokio::time::timeout(timeout, answer).await {
            Ok(Ok(key)) => ChoiceResponse::Chosen(key),
            Ok(Err(_)) | Err(_) => ChoiceResponse::TimedOut,
        };
        if response == ChoiceResponse::TimedOut {
            self.pending().remove(&player);
        }
        response
    }

    async fn edit_message(
        &self,
        handle: MessageHandle,
        content: String,
    ) -> Result<(), DeliveryFailure> {
        if handle.0 == 0 || handle.0 > self.next_handle.load(Ordering::Relaxed) {
            return Err(DeliveryFailure::UnknownMessage(handle));
        }
        println!("[edit {}] {content}", handle.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("!start HiddenBeast"),
            Ok(Command::Start(GameKind::HiddenBeast))
        );
        assert_eq!(Command::parse("!join"), Ok(Command::Join(None)));
        assert_eq!(
            Command::parse("!leave bingo"),
            Ok(Command::Leave(Some(GameKind::Bingo)))
        );
        assert_eq!(Command::parse("!blackjack 250"), Ok(Command::Blackjack(250)));
        assert_eq!(
            Command::parse("!blackjack lots"),
            Err(CommandError::Usage("!blackjack <bet>"))
        );
        assert_eq!(
            Command::parse("!choose skip"),
            Ok(Command::Choose("skip".to_string()))
        );
        assert!(matches!(
            Command::parse("!cancel poker"),
            Err(CommandError::UnknownGame(_))
        ));
        assert_eq!(
            Command::parse("  oven mitt "),
            Ok(Command::Text("oven mitt".to_string()))
        );
        assert_eq!(Command::parse("!dance"), Ok(Command::Text("!dance".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_resolves_prompt() {
        let console = Arc::new(ConsoleMessenger::new());
        let options = ChoiceSet::players(&[PlayerId(2), PlayerId(3)]);
        let waiter = {
            let console = console.clone();
            tokio::spawn(async move {
                console
                    .await_choice(PlayerId(1), options, Duration::from_secs(60))
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert!(console.is_waiting(PlayerId(1)));
        assert!(!console.answer(PlayerId(1), "9"));
        assert!(console.answer(PlayerId(1), "3"));
        assert_eq!(
            waiter.await.unwrap(),
            ChoiceResponse::Chosen("3".to_string())
        );
        assert!(!console.is_waiting(PlayerId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_times_out() {
        let console = ConsoleMessenger::new();
        let options = ChoiceSet::players(&[PlayerId(2)]);
        let response = console
            .await_choice(PlayerId(1), options, Duration::from_secs(5))
            .await;
        assert_eq!(response, ChoiceResponse::TimedOut);
        assert!(!console.is_waiting(PlayerId(1)));
        assert!(!console.answer(PlayerId(1), "2"));
    }

    #[tokio::test]
    async fn test_edit_unknown_message() {
        let console = ConsoleMessenger::new();
        assert!(console
            .edit_message(MessageHandle(1), "x".to_string())
            .await
            .is_err());
        let handle = console
            .send_channel_message(ChannelKey(1), "hello".to_string())
            .await
            .unwrap();
        assert!(console.edit_message(handle, "bye".to_string()).await.is_ok());
    }
}
