//! Session registry.
//!
//! At most one [Session] exists per (channel, game kind). Creation is an atomic
//! check-and-insert under a single lock, so two near-simultaneous starts on the same
//! channel yield exactly one session and one [RegistryError::SessionConflict].

use shadowspire_types::{
    games::{GameKind, SessionInfo},
    ChannelKey, PlayerId,
};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a {kind} session is already active in {channel}")]
    SessionConflict { channel: ChannelKey, kind: GameKind },
    #[error("no {kind} session in {channel}")]
    NotFound { channel: ChannelKey, kind: GameKind },
}

/// Player input routed to a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Input {
    pub player: PlayerId,
    pub kind: InputKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputKind {
    /// Free chat text (guesses, bingo claims).
    Text(String),
    /// An answer to the channel's shared selection (votes).
    Choice(String),
    /// The host started the lobby.
    Start,
}

impl Input {
    pub fn text(player: PlayerId, text: impl Into<String>) -> Self {
        Self {
            player,
            kind: InputKind::Text(text.into()),
        }
    }

    pub fn choice(player: PlayerId, option: impl Into<String>) -> Self {
        Self {
            player,
            kind: InputKind::Choice(option.into()),
        }
    }

    pub fn start(player: PlayerId) -> Self {
        Self {
            player,
            kind: InputKind::Start,
        }
    }
}

/// Receiving half of a session's input mailbox. Owned by the task driving the session.
pub type Inbox = mpsc::UnboundedReceiver<Input>;

/// One in-progress minigame bound to a channel.
pub struct Session {
    id: u64,
    info: RwLock<SessionInfo>,
    cancel: CancellationToken,
    resolved: AtomicBool,
    inputs: mpsc::UnboundedSender<Input>,
}

impl Session {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> ChannelKey {
        self.read(|info| info.channel)
    }

    pub fn kind(&self) -> GameKind {
        self.read(|info| info.kind)
    }

    pub fn host(&self) -> PlayerId {
        self.read(|info| info.host)
    }

    /// Snapshot of the session metadata.
    pub fn info(&self) -> SessionInfo {
        self.read(SessionInfo::clone)
    }

    pub fn read<T>(&self, f: impl FnOnce(&SessionInfo) -> T) -> T {
        let info = match self.info.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&info)
    }

    /// Mutate the metadata under the session lock.
    pub fn update<T>(&self, f: impl FnOnce(&mut SessionInfo) -> T) -> T {
        let mut info = match self.info.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut info)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Claim the session's terminal resolution. Returns true exactly once.
    pub fn try_resolve(&self) -> bool {
        self.resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.load(Ordering::Acquire)
    }

    /// Queue input for the session. Returns false once the session has stopped reading.
    pub fn send_input(&self, input: Input) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.inputs.send(input).is_ok()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

/// Active sessions keyed by (channel, kind).
#[derive(Default)]
pub struct Registry {
    sessions: Mutex<HashMap<(ChannelKey, GameKind), Arc<Session>>>,
    next_id: AtomicU64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<(ChannelKey, GameKind), Arc<Session>>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Create a session, refusing if one is already active for `channel` and `kind`.
    pub fn create(
        &self,
        channel: ChannelKey,
        kind: GameKind,
        host: PlayerId,
        participants: Vec<PlayerId>,
    ) -> Result<(Arc<Session>, Inbox), RegistryError> {
        let mut sessions = self.sessions();
        if sessions.contains_key(&(channel, kind)) {
            debug!(channel = %channel, kind = ?kind, "session conflict");
            return Err(RegistryError::SessionConflict { channel, kind });
        }
        let (sender, inbox) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let session = Arc::new(Session {
            id,
            info: RwLock::new(SessionInfo::new(
                channel,
                kind,
                host,
                participants,
                now_ms(),
            )),
            cancel: CancellationToken::new(),
            resolved: AtomicBool::new(false),
            inputs: sender,
        });
        sessions.insert((channel, kind), session.clone());
        info!(channel = %channel, kind = ?kind, host = %host, id, "session created");
        Ok((session, inbox))
    }

    pub fn get(&self, channel: ChannelKey, kind: GameKind) -> Option<Arc<Session>> {
        self.sessions().get(&(channel, kind)).cloned()
    }

    /// Remove and cancel the session for `channel` and `kind`.
    pub fn end(&self, channel: ChannelKey, kind: GameKind) -> Result<Arc<Session>, RegistryError> {
        let session = self
            .sessions()
            .remove(&(channel, kind))
            .ok_or(RegistryError::NotFound { channel, kind })?;
        session.cancel();
        info!(channel = %channel, kind = ?kind, id = session.id(), "session ended");
        Ok(session)
    }

    /// Remove `session` if it is still the registered one for its key. A later session
    /// on the same key is left alone.
    pub fn release(&self, session: &Session) -> bool {
        let key = (session.channel(), session.kind());
        let mut sessions = self.sessions();
        let current = sessions.get(&key).is_some_and(|s| s.id() == session.id());
        if current {
            sessions.remove(&key);
        }
        drop(sessions);
        session.cancel();
        current
    }

    /// Sessions bound to `channel`, in no particular order.
    pub fn in_channel(&self, channel: ChannelKey) -> Vec<Arc<Session>> {
        self.sessions()
            .iter()
            .filter(|((c, _), _)| *c == channel)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<Session>> {
        self.sessions().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_get_end() {
        let registry = Registry::new();
        let channel = ChannelKey(1);
        let (session, _inbox) = registry
            .create(channel, GameKind::Bingo, PlayerId(9), vec![])
            .unwrap();
        assert_eq!(registry.get(channel, GameKind::Bingo).unwrap().id(), session.id());
        assert!(registry.get(channel, GameKind::Massacre).is_none());

        // Same channel, different kind is independent
        registry
            .create(channel, GameKind::Massacre, PlayerId(9), vec![])
            .unwrap();
        assert_eq!(registry.in_channel(channel).len(), 2);

        let ended = registry.end(channel, GameKind::Bingo).unwrap();
        assert!(ended.is_cancelled());
        assert_eq!(
            registry.end(channel, GameKind::Bingo).err(),
            Some(RegistryError::NotFound {
                channel,
                kind: GameKind::Bingo
            })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_conflict() {
        let registry = Registry::new();
        registry
            .create(ChannelKey(1), GameKind::HiddenBeast, PlayerId(1), vec![])
            .unwrap();
        let err = registry
            .create(ChannelKey(1), GameKind::HiddenBeast, PlayerId(2), vec![])
            .err();
        assert_eq!(
            err,
            Some(RegistryError::SessionConflict {
                channel: ChannelKey(1),
                kind: GameKind::HiddenBeast
            })
        );
    }

    #[test]
    fn test_concurrent_create_single_winner() {
        let registry = Arc::new(Registry::new());
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8u64)
            .map(|i| {
                let registry = registry.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry
                        .create(ChannelKey(5), GameKind::Massacre, PlayerId(i), vec![])
                        .map(|_| ())
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, RegistryError::SessionConflict { .. })));
    }

    #[test]
    fn test_release_keeps_newer_session() {
        let registry = Registry::new();
        let (old, _inbox) = registry
            .create(ChannelKey(3), GameKind::Bingo, PlayerId(1), vec![])
            .unwrap();
        registry.end(ChannelKey(3), GameKind::Bingo).unwrap();
        let (new, _inbox) = registry
            .create(ChannelKey(3), GameKind::Bingo, PlayerId(1), vec![])
            .unwrap();
        assert!(!registry.release(&old));
        assert_eq!(registry.get(ChannelKey(3), GameKind::Bingo).unwrap().id(), new.id());
        assert!(registry.release(&new));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_resolve_once_and_inputs() {
        let registry = Registry::new();
        let (session, mut inbox) = registry
            .create(ChannelKey(4), GameKind::HangedCookie, PlayerId(1), vec![PlayerId(1)])
            .unwrap();
        assert!(session.try_resolve());
        assert!(!session.try_resolve());
        assert!(session.is_resolved());

        assert!(session.send_input(Input::text(PlayerId(1), "a")));
        assert_eq!(inbox.try_recv().unwrap(), Input::text(PlayerId(1), "a"));
        session.cancel();
        assert!(!session.send_input(Input::text(PlayerId(1), "b")));
    }
}
