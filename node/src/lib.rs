use serde::{Deserialize, Serialize};
use shadowspire_types::PlayerId;
use std::{str::FromStr, time::Duration};
use thiserror::Error;
use tracing::Level;

pub mod console;
pub mod engine;
pub mod games;
pub mod messenger;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod payout;
pub mod phase;
pub mod registry;

/// Configuration for the [engine::Engine].
///
/// Every field is optional in the YAML file; omitted fields take the defaults below.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_level: String,
    pub json_logs: bool,
    pub rng_seed: Option<u64>,
    /// Player ids allowed to mint currency with `!grant`.
    pub admins: Vec<u64>,

    pub choice_timeout_secs: u64,
    pub discussion_secs: u64,
    pub vote_secs: u64,
    pub rules_delay_secs: u64,
    pub countdown_tick_secs: u64,
    pub scoreboard_tick_secs: u64,

    pub massacre_discussion_secs: u64,
    pub massacre_max_days: u32,
    pub narration_delay_ms: u64,

    pub guess_timeout_secs: u64,
    pub bingo_draw_secs: u64,
    pub lobby_timeout_secs: u64,

    pub payout_attempts: u32,
    pub payout_backoff_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            rng_seed: None,
            admins: Vec::new(),
            choice_timeout_secs: 180,
            discussion_secs: 90,
            vote_secs: 60,
            rules_delay_secs: 10,
            countdown_tick_secs: 10,
            scoreboard_tick_secs: 1,
            massacre_discussion_secs: 30,
            massacre_max_days: 30,
            narration_delay_ms: 2_000,
            guess_timeout_secs: 90,
            bingo_draw_secs: 20,
            lobby_timeout_secs: 1_800,
            payout_attempts: 3,
            payout_backoff_ms: 200,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: u64 },
    #[error("{field} must be at least {min} (got {value})")]
    TooSmall {
        field: &'static str,
        min: u64,
        value: u64,
    },
}

/// Retry schedule for ledger writes made on a player's behalf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayoutPolicy {
    /// Total attempts per write (including the first attempt).
    pub attempts: u32,
    /// Delay after the first failure; doubles after each further failure.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub log_level: Level,
    pub json_logs: bool,
    pub rng_seed: Option<u64>,
    pub admins: Vec<PlayerId>,

    pub choice_timeout: Duration,
    pub discussion: Duration,
    pub vote: Duration,
    pub rules_delay: Duration,
    pub countdown_tick: Duration,
    pub scoreboard_tick: Duration,

    pub massacre_discussion: Duration,
    pub massacre_max_days: u32,
    pub narration_delay: Duration,

    pub guess_timeout: Duration,
    pub bingo_draw: Duration,
    pub lobby_timeout: Duration,

    pub payout: PayoutPolicy,
}

fn non_zero(field: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidNonZero { field, value });
    }
    Ok(value)
}

fn secs(field: &'static str, value: u64) -> Result<Duration, ConfigError> {
    non_zero(field, value).map(Duration::from_secs)
}

fn millis(field: &'static str, value: u64) -> Result<Duration, ConfigError> {
    non_zero(field, value).map(Duration::from_millis)
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        non_zero("massacre_max_days", u64::from(self.massacre_max_days))?;
        if self.payout_attempts < 2 {
            return Err(ConfigError::TooSmall {
                field: "payout_attempts",
                min: 2,
                value: u64::from(self.payout_attempts),
            });
        }
        let initial_backoff = millis("payout_backoff_ms", self.payout_backoff_ms)?;

        Ok(ValidatedConfig {
            log_level,
            json_logs: self.json_logs,
            rng_seed: self.rng_seed,
            admins: self.admins.into_iter().map(PlayerId).collect(),
            choice_timeout: secs("choice_timeout_secs", self.choice_timeout_secs)?,
            discussion: secs("discussion_secs", self.discussion_secs)?,
            vote: secs("vote_secs", self.vote_secs)?,
            rules_delay: secs("rules_delay_secs", self.rules_delay_secs)?,
            countdown_tick: secs("countdown_tick_secs", self.countdown_tick_secs)?,
            scoreboard_tick: secs("scoreboard_tick_secs", self.scoreboard_tick_secs)?,
            massacre_discussion: secs("massacre_discussion_secs", self.massacre_discussion_secs)?,
            massacre_max_days: self.massacre_max_days,
            narration_delay: millis("narration_delay_ms", self.narration_delay_ms)?,
            guess_timeout: secs("guess_timeout_secs", self.guess_timeout_secs)?,
            bingo_draw: secs("bingo_draw_secs", self.bingo_draw_secs)?,
            lobby_timeout: secs("lobby_timeout_secs", self.lobby_timeout_secs)?,
            payout: PayoutPolicy {
                attempts: self.payout_attempts,
                initial_backoff,
                max_backoff: initial_backoff.saturating_mul(8),
            },
        })
    }
}
