//! Bingo: numbers are called on a timer and players race to claim the line and fill prizes.

use super::SessionContext;
use crate::{
    phase::{Cancelled, Collector, PhaseEnd, PhaseSpec},
    registry::{Input, InputKind},
};
use shadowspire_execution::games::bingo::{Bingo, ClaimKind, ClaimOutcome};
use shadowspire_types::{
    games::{Phase, CURRENCY},
    PlayerId,
};
use tracing::{debug, info, warn};

/// Claims made during one call window. Ends the window on the first award.
struct Claims<'a> {
    game: &'a mut Bingo,
    results: Vec<(PlayerId, ClaimOutcome)>,
}

impl Collector for Claims<'_> {
    type Output = Vec<(PlayerId, ClaimOutcome)>;

    fn accept(&mut self, input: Input) -> bool {
        let InputKind::Text(text) = &input.kind else {
            return false;
        };
        let Some(kind) = ClaimKind::parse(text) else {
            return false;
        };
        match self.game.claim(input.player, kind) {
            Ok(ClaimOutcome::NotReady) => {
                debug!(player = %input.player, ?kind, "claim not ready");
                false
            }
            Ok(outcome) => {
                self.results.push((input.player, outcome));
                true
            }
            Err(err) => {
                debug!(player = %input.player, ?err, "claim refused");
                false
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.results
            .iter()
            .any(|(_, outcome)| matches!(outcome, ClaimOutcome::Awarded { .. }))
    }

    fn resolve(self, _end: PhaseEnd) -> Self::Output {
        self.results
    }
}

fn history(game: &Bingo) -> String {
    game.history()
        .into_iter()
        .map(|(letter, numbers)| {
            let numbers: Vec<String> = numbers.iter().map(u8::to_string).collect();
            format!("**{letter}**: {}", numbers.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn play(ctx: &mut SessionContext, roster: &[PlayerId]) -> Result<(), Cancelled> {
    let mut game = match Bingo::new(roster, &mut ctx.rng) {
        Ok(game) => game,
        Err(err) => {
            warn!(?err, "bingo could not start");
            ctx.say(format!("Bingo cannot begin: {err}.")).await;
            ctx.lose();
            return Ok(());
        }
    };

    ctx.controller.enter(Phase::Intro, 0, None);
    ctx.say(format!(
        "🎱 **Bingo!** A number is called every {}s. Type `BINGO` for a line \
         ({} {CURRENCY}) or `FILL` for a full card ({} {CURRENCY}).",
        ctx.config.bingo_draw.as_secs(),
        ClaimKind::Line.reward(),
        ClaimKind::Fill.reward(),
    ))
    .await;
    let players: Vec<PlayerId> = game.players().copied().collect();
    for player in players {
        let Some(card) = game.card(&player).map(|c| c.render()) else {
            continue;
        };
        ctx.narrator
            .whisper(
                player,
                format!("🎱 Your card:\n```\n{card}\n```"),
                format!("📪 {player} has private messages closed. Their card:\n```\n{card}\n```"),
            )
            .await;
    }

    let mut filled = false;
    while !filled {
        let Some(call) = game.draw() else {
            break;
        };
        ctx.say(format!(
            "🔔 **{}-{}** (call #{})",
            call.letter, call.number, call.index
        ))
        .await;
        let round = u32::try_from(call.index).unwrap_or(u32::MAX);
        let spec = PhaseSpec::new(Phase::Drawing, round, ctx.config.bingo_draw);
        let collector = Claims {
            game: &mut game,
            results: Vec::new(),
        };
        let results = ctx.controller.run(spec, collector).await?;

        for (player, outcome) in results {
            match outcome {
                ClaimOutcome::Awarded {
                    kind: ClaimKind::Line,
                    reward,
                } => {
                    info!(player = %player, reward, "bingo line claimed");
                    ctx.say(format!("✅ **BINGO!** {player} completed a line."))
                        .await;
                    ctx.payout.pay(player, reward).await;
                }
                ClaimOutcome::Awarded {
                    kind: ClaimKind::Fill,
                    reward,
                } => {
                    info!(player = %player, reward, "bingo card filled");
                    filled = true;
                    ctx.controller.enter(Phase::Finished, round, None);
                    ctx.say(format!(
                        "🏁 **FILL!** {player} filled their card after {} calls.\n{}",
                        call.index,
                        history(&game)
                    ))
                    .await;
                    ctx.win(vec![player], reward).await;
                }
                ClaimOutcome::AlreadyClaimed { by } => {
                    ctx.say(format!("{player}, that prize already went to {by}."))
                        .await;
                }
                ClaimOutcome::NotReady => {}
            }
        }
    }

    if !filled {
        ctx.controller.enter(Phase::Finished, 0, None);
        ctx.say(format!(
            "🎱 Every number has been called and nobody filled a card.\n{}",
            history(&game)
        ))
        .await;
        ctx.lose();
    }
    Ok(())
}
