//! Massacre: the elimination tournament.

use super::SessionContext;
use crate::phase::Cancelled;
use shadowspire_execution::games::{
    elimination::{Effect, Massacre, Period, PeriodPlan, SpecialOutcome},
    narration::{effect_lines, massacre_ending, special_intro, special_line},
};
use shadowspire_types::{
    games::{Phase, MASSACRE_REWARD},
    PlayerId,
};
use tracing::warn;

fn scoreboard(game: &Massacre, period: Period, day: u32) -> String {
    let mut standings: Vec<_> = game.participants().iter().collect();
    // Living first, then by health; the sort is stable so roster order breaks ties
    standings.sort_by_key(|p| (!p.is_alive(), std::cmp::Reverse(p.health())));
    let label = match period {
        Period::Day => "Day",
        Period::Night => "Night",
    };
    let mut board = format!("📊 **Standings after {label} {day}**");
    for participant in standings {
        let marker = if participant.is_alive() { "❤️" } else { "💀" };
        board.push_str(&format!(
            "\n{marker} {} {}",
            participant.health(),
            participant.player()
        ));
        if !participant.injuries().is_empty() {
            board.push_str(&format!(" ({})", participant.injuries().join(", ")));
        }
    }
    board
}

pub async fn play(ctx: &mut SessionContext, roster: &[PlayerId]) -> Result<(), Cancelled> {
    let mut game = match Massacre::new(roster, ctx.config.massacre_max_days) {
        Ok(game) => game,
        Err(err) => {
            warn!(?err, "massacre could not start");
            ctx.say(format!("The massacre cannot begin: {err}.")).await;
            ctx.lose();
            return Ok(());
        }
    };

    ctx.controller.enter(Phase::Intro, 0, None);
    let names: Vec<String> = roster.iter().map(PlayerId::to_string).collect();
    ctx.narrate(format!(
        "🩸 **The Massacre begins.** {} cookies enter the arena: {}.\nOnly one walks out.",
        roster.len(),
        names.join(", ")
    ))
    .await?;

    while !game.is_over() {
        let period = game.period();
        let day = game.day();
        let phase = match period {
            Period::Day => Phase::Day,
            Period::Night => Phase::Night,
        };
        ctx.controller.enter(phase, day, None);
        let header = match period {
            Period::Day => format!("☀️ **Day {day}** dawns over the arena."),
            Period::Night => format!("🌙 **Night {day}** falls."),
        };
        ctx.say(header).await;

        let plan = match game.plan_period(&mut ctx.rng) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(?err, "massacre period refused");
                break;
            }
        };
        match plan {
            PeriodPlan::Special(kind) => {
                ctx.narrate(special_intro(kind)).await?;
                for outcome in game.run_special(&mut ctx.rng) {
                    let line = special_line(kind, &outcome, &mut ctx.rng);
                    if let SpecialOutcome::Died { player, .. } = outcome {
                        ctx.eliminated(player, None);
                    }
                    ctx.narrate(line).await?;
                }
            }
            PeriodPlan::Regular(order) => {
                for actor in order {
                    // Killed earlier in this pass
                    let Some(effect) = game.act(actor, &mut ctx.rng) else {
                        continue;
                    };
                    for line in effect_lines(&effect, period, &mut ctx.rng) {
                        ctx.say(line).await;
                    }
                    if let Effect::Attack {
                        target,
                        damage,
                        remaining,
                        ..
                    } = &effect
                    {
                        ctx.narrator
                            .whisper_quietly(
                                *target,
                                format!(
                                    "🩸 {actor} hit you for **{damage}** health. You have {remaining} left."
                                ),
                            )
                            .await;
                    }
                    if let Some(dead) = effect.killed() {
                        ctx.eliminated(dead, None);
                    }
                    let delay = ctx.config.narration_delay;
                    ctx.pause(delay).await?;
                }
            }
        }
        game.end_period();
        ctx.say(scoreboard(&game, period, day)).await;

        if !game.is_over() {
            let talk = ctx.config.massacre_discussion;
            ctx.controller.enter(Phase::Discussion, day, Some(talk));
            ctx.say(format!(
                "💬 The survivors catch their breath. {} seconds to talk.",
                talk.as_secs()
            ))
            .await;
            ctx.pause(talk).await?;
        }
    }

    ctx.controller.enter(Phase::Finished, game.day(), None);
    let winner = match game.finish() {
        Ok(winner) => winner,
        Err(err) => {
            warn!(?err, "massacre finished twice");
            return Ok(());
        }
    };
    let ending = massacre_ending(&mut ctx.rng);
    let verdict = if winner.last_standing {
        format!("🏆 {} is the last cookie standing!", winner.player)
    } else {
        format!(
            "🏆 Nobody else outlasted the carnage. {} wins with {} health left.",
            winner.player, winner.health
        )
    };
    ctx.say(format!("{ending}\n{verdict}")).await;
    ctx.win(vec![winner.player], MASSACRE_REWARD).await;
    Ok(())
}
