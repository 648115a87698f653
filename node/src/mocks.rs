//! Scripted chat host for tests.

use crate::messenger::{ChoiceResponse, ChoiceSet, DeliveryFailure, MessageHandle, Messenger};
use async_trait::async_trait;
use shadowspire_types::{ChannelKey, PlayerId};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::Mutex,
    time::Duration,
};

/// Everything the engine sent, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Record {
    Channel {
        channel: ChannelKey,
        handle: MessageHandle,
        content: String,
    },
    Private {
        player: PlayerId,
        content: String,
        choice: Option<ChoiceSet>,
    },
    Edit {
        handle: MessageHandle,
        content: String,
    },
}

/// A scripted reply to one private prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Answer {
    /// Pick the option with this key.
    Key(String),
    /// Pick the n-th offered option.
    Index(usize),
    /// Let the prompt time out.
    Silent,
}

#[derive(Default)]
struct State {
    records: Vec<Record>,
    scripts: HashMap<PlayerId, VecDeque<Answer>>,
    closed: HashSet<PlayerId>,
    next_handle: u64,
}

/// [Messenger] that records traffic and answers prompts from per-player scripts.
///
/// Unscripted prompts wait out their full timeout, which the paused test clock skips.
#[derive(Default)]
pub struct ScriptedMessenger {
    state: Mutex<State>,
}

impl ScriptedMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Make private messages to `player` fail.
    pub fn close_private(&self, player: PlayerId) {
        self.state().closed.insert(player);
    }

    /// Queue answers for `player`'s next prompts.
    pub fn script(&self, player: PlayerId, answers: impl IntoIterator<Item = Answer>) {
        self.state()
            .scripts
            .entry(player)
            .or_default()
            .extend(answers);
    }

    pub fn records(&self) -> Vec<Record> {
        self.state().records.clone()
    }

    pub fn channel_messages(&self, channel: ChannelKey) -> Vec<String> {
        self.state()
            .records
            .iter()
            .filter_map(|r| match r {
                Record::Channel {
                    channel: c,
                    content,
                    ..
                } if *c == channel => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn private_messages(&self, player: PlayerId) -> Vec<String> {
        self.state()
            .records
            .iter()
            .filter_map(|r| match r {
                Record::Private {
                    player: p, content, ..
                } if *p == player => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> usize {
        self.state()
            .records
            .iter()
            .filter(|r| matches!(r, Record::Edit { .. }))
            .count()
    }

    /// Whether any channel message in `channel` contains `needle`.
    pub fn said(&self, channel: ChannelKey, needle: &str) -> bool {
        self.channel_messages(channel)
            .iter()
            .any(|m| m.contains(needle))
    }

    fn handle(state: &mut State) -> MessageHandle {
        state.next_handle += 1;
        MessageHandle(state.next_handle)
    }
}

#[async_trait]
impl Messenger for ScriptedMessenger {
    async fn send_channel_message(
        &self,
        channel: ChannelKey,
        content: String,
    ) -> Result<MessageHandle, DeliveryFailure> {
        let mut state = self.state();
        let handle = Self::handle(&mut state);
        state.records.push(Record::Channel {
            channel,
            handle,
            content,
        });
        Ok(handle)
    }

    async fn send_private_message(
        &self,
        player: PlayerId,
        content: String,
        choice: Option<ChoiceSet>,
    ) -> Result<MessageHandle, DeliveryFailure> {
        let mut state = self.state();
        if state.closed.contains(&player) {
            return Err(DeliveryFailure::PrivateClosed(player));
        }
        let handle = Self::handle(&mut state);
        state.records.push(Record::Private {
            player,
            content,
            choice,
        });
        Ok(handle)
    }

    async fn await_choice(
        &self,
        player: PlayerId,
        options: ChoiceSet,
        timeout: Duration,
    ) -> ChoiceResponse {
        let answer = self
            .state()
            .scripts
            .get_mut(&player)
            .and_then(VecDeque::pop_front);
        let chosen = match answer {
            Some(Answer::Key(key)) => Some(key),
            Some(Answer::Index(idx)) => options.options.get(idx).map(|o| o.key.clone()),
            Some(Answer::Silent) | None => None,
        };
        match chosen {
            Some(key) => ChoiceResponse::Chosen(key),
            None => {
                tokio::time::sleep(timeout).await;
                ChoiceResponse::TimedOut
            }
        }
    }

    async fn edit_message(
        &self,
        handle: MessageHandle,
        content: String,
    ) -> Result<(), DeliveryFailure> {
        let mut state = self.state();
        if handle.0 == 0 || handle.0 > state.next_handle {
            return Err(DeliveryFailure::UnknownMessage(handle));
        }
        state.records.push(Record::Edit { handle, content });
        Ok(())
    }
}
