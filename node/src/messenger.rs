//! Chat host collaborator.
//!
//! The engine talks to players only through [Messenger]. [Narrator] wraps a messenger
//! for one channel and applies the delivery rules every game shares: channel sends are
//! best effort, and a private message that cannot be delivered is narrated publicly.

use crate::phase::Cancelled;
use async_trait::async_trait;
use shadowspire_types::{ChannelKey, PlayerId};
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reference to a sent message, used for later edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageHandle(pub u64);

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    #[error("{0} has private messages disabled")]
    PrivateClosed(PlayerId),
    #[error("unknown message {0:?}")]
    UnknownMessage(MessageHandle),
    #[error("transport error: {0}")]
    Transport(String),
}

/// One selectable option of an interactive prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChoiceOption {
    pub key: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn player(player: PlayerId) -> Self {
        Self {
            key: player.0.to_string(),
            label: player.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChoiceSet {
    pub options: Vec<ChoiceOption>,
}

impl ChoiceSet {
    pub fn players(players: &[PlayerId]) -> Self {
        Self {
            options: players.iter().copied().map(ChoiceOption::player).collect(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.options.iter().any(|o| o.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChoiceResponse {
    Chosen(String),
    TimedOut,
}

/// Capabilities the engine needs from a chat host.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_channel_message(
        &self,
        channel: ChannelKey,
        content: String,
    ) -> Result<MessageHandle, DeliveryFailure>;

    async fn send_private_message(
        &self,
        player: PlayerId,
        content: String,
        choice: Option<ChoiceSet>,
    ) -> Result<MessageHandle, DeliveryFailure>;

    /// Wait for `player` to pick one of `options`. Must return within `timeout`.
    async fn await_choice(
        &self,
        player: PlayerId,
        options: ChoiceSet,
        timeout: Duration,
    ) -> ChoiceResponse;

    async fn edit_message(
        &self,
        handle: MessageHandle,
        content: String,
    ) -> Result<(), DeliveryFailure>;
}

/// A [Messenger] bound to one session's channel.
#[derive(Clone)]
pub struct Narrator {
    messenger: Arc<dyn Messenger>,
    channel: ChannelKey,
}

impl Narrator {
    pub fn new(messenger: Arc<dyn Messenger>, channel: ChannelKey) -> Self {
        Self { messenger, channel }
    }

    pub fn channel(&self) -> ChannelKey {
        self.channel
    }

    /// Post to the channel. Failures are logged and the game carries on.
    pub async fn say(&self, content: impl Into<String>) -> Option<MessageHandle> {
        match self
            .messenger
            .send_channel_message(self.channel, content.into())
            .await
        {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!(channel = %self.channel, ?err, "channel message failed");
                None
            }
        }
    }

    pub async fn edit(&self, handle: Option<MessageHandle>, content: impl Into<String>) {
        let Some(handle) = handle else {
            return;
        };
        if let Err(err) = self.messenger.edit_message(handle, content.into()).await {
            debug!(channel = %self.channel, ?err, "edit failed");
        }
    }

    /// Send a private message; if it cannot be delivered, post `fallback` publicly.
    ///
    /// Returns whether the private message arrived.
    pub async fn whisper(
        &self,
        player: PlayerId,
        content: impl Into<String>,
        fallback: impl Into<String>,
    ) -> bool {
        match self
            .messenger
            .send_private_message(player, content.into(), None)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                warn!(channel = %self.channel, player = %player, ?err, "private message failed");
                self.say(fallback).await;
                false
            }
        }
    }

    /// Send a private message whose loss does not matter.
    pub async fn whisper_quietly(&self, player: PlayerId, content: impl Into<String>) {
        if let Err(err) = self
            .messenger
            .send_private_message(player, content.into(), None)
            .await
        {
            debug!(player = %player, ?err, "private message dropped");
        }
    }

    /// Privately ask `player` to pick one of `targets`.
    ///
    /// `Ok(None)` covers every non-answer: DMs closed, timeout, or an answer outside the
    /// offered set. None of them is posted to the channel.
    pub async fn ask_player(
        &self,
        player: PlayerId,
        prompt: impl Into<String>,
        targets: &[PlayerId],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<Option<PlayerId>, Cancelled> {
        if targets.is_empty() {
            return Ok(None);
        }
        let options = ChoiceSet::players(targets);
        if let Err(err) = self
            .messenger
            .send_private_message(player, prompt.into(), Some(options.clone()))
            .await
        {
            // The recipient of a prompt stays secret
            warn!(channel = %self.channel, player = %player, ?err, "prompt undeliverable");
            return Ok(None);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Cancelled),
            response = self.messenger.await_choice(player, options.clone(), timeout) => response,
        };
        match response {
            ChoiceResponse::Chosen(key) if options.contains(&key) => Ok(targets
                .iter()
                .find(|p| p.0.to_string() == key)
                .copied()),
            ChoiceResponse::Chosen(key) => {
                debug!(player = %player, key, "choice outside offered set");
                Ok(None)
            }
            ChoiceResponse::TimedOut => {
                debug!(player = %player, "choice timed out");
                Ok(None)
            }
        }
    }
}
