use anyhow::Context;
use clap::Parser;
use shadowspire_execution::MemoryLedger;
use shadowspire_node::{
    console::{Command, ConsoleMessenger},
    engine::{Engine, EngineError},
    messenger::Messenger,
    Config,
};
use shadowspire_types::{
    games::{GameKind, Phase},
    ChannelKey, PlayerId,
};
use std::{path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run shadowspire minigames from the terminal.", long_about = None)]
struct Args {
    /// YAML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

const NAME_THE_GAME: &str = "Name the game: there is not exactly one open lobby here.";

/// The lobby a bare `!join`/`!leave` refers to: the only one open in the channel.
fn only_lobby(engine: &Engine, channel: ChannelKey) -> Option<GameKind> {
    let lobbies: Vec<GameKind> = engine
        .registry()
        .in_channel(channel)
        .iter()
        .filter(|s| s.kind().has_lobby() && s.read(|info| info.phase == Phase::Lobby))
        .map(|s| s.kind())
        .collect();
    match lobbies.as_slice() {
        [kind] => Some(*kind),
        _ => None,
    }
}

async fn dispatch(
    engine: &Engine,
    console: &ConsoleMessenger,
    channel: ChannelKey,
    player: PlayerId,
    command: Command,
) -> Result<Option<String>, EngineError> {
    let reply = match command {
        Command::Open(kind) => {
            engine.open_lobby(channel, kind, player).await?;
            None
        }
        Command::Join(kind) => match kind.or_else(|| only_lobby(engine, channel)) {
            Some(kind) => {
                engine.join(channel, kind, player).await?;
                None
            }
            None => Some(NAME_THE_GAME.to_string()),
        },
        Command::Leave(kind) => match kind.or_else(|| only_lobby(engine, channel)) {
            Some(kind) => {
                engine.leave(channel, kind, player).await?;
                None
            }
            None => Some(NAME_THE_GAME.to_string()),
        },
        Command::Start(kind) => {
            engine.start(channel, kind, player)?;
            None
        }
        Command::Cancel(kind) => {
            engine.cancel(channel, kind, player).await?;
            None
        }
        Command::HangedCookie => {
            engine.hanged_cookie(channel, player)?;
            None
        }
        Command::Blackjack(bet) => {
            engine.blackjack(channel, player, bet).await?;
            None
        }
        Command::Grant(amount) => {
            let balance = engine.grant(player, player, amount).await?;
            Some(format!("{player} now has {balance}."))
        }
        Command::Balance => {
            let balance = engine.balance(player).await?;
            Some(format!("{player} has {balance}."))
        }
        Command::Choose(option) => {
            // A private prompt takes precedence over the channel's shared vote
            if !console.answer(player, &option)
                && engine.route_choice(channel, player, &option) == 0
            {
                Some(format!("{player}, there is nothing to choose right now."))
            } else {
                None
            }
        }
        Command::Metrics => Some(engine.encode_metrics()),
        Command::Text(text) => {
            engine.route_text(channel, player, &text);
            None
        }
    };
    Ok(reply)
}

/// Split `<channel> <player> <text>`.
fn split_line(line: &str) -> Option<(ChannelKey, PlayerId, &str)> {
    let mut parts = line.trim().splitn(3, char::is_whitespace);
    let channel = parts.next()?.parse().ok()?;
    let player = parts.next()?.parse().ok()?;
    let text = parts.next().unwrap_or_default();
    Some((ChannelKey(channel), PlayerId(player), text))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Load config
    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("could not read config file {}", path.display()))?;
            serde_yaml::from_str::<Config>(&raw).context("could not parse config file")?
        }
        None => Config::default(),
    };
    let config = config.validate().context("invalid configuration")?;

    // Create logger
    let logger = tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_writer(std::io::stderr);
    if config.json_logs {
        logger.json().init();
    } else {
        logger.init();
    }

    // Start engine
    let console = Arc::new(ConsoleMessenger::new());
    let messenger: Arc<dyn Messenger> = console.clone();
    let engine = Engine::new(config, messenger.clone(), Arc::new(MemoryLedger::new()));
    info!("ready: type `<channel> <player> <command>`");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
            line = lines.next_line() => line.context("failed to read stdin")?,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }
        let Some((channel, player, text)) = split_line(&line) else {
            warn!(line = %line, "expected `<channel> <player> <text>`");
            continue;
        };
        let reply = match Command::parse(text) {
            Ok(command) => match dispatch(&engine, &console, channel, player, command).await {
                Ok(reply) => reply,
                Err(err) => Some(format!("⚠️ {err}")),
            },
            Err(err) => Some(format!("⚠️ {err}")),
        };
        if let Some(reply) = reply {
            if let Err(err) = messenger.send_channel_message(channel, reply).await {
                warn!(?err, "reply undeliverable");
            }
        }
    }

    engine.shutdown().await;
    Ok(())
}
