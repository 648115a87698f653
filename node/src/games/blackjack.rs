//! Blackjack: one auto-played hand against the dealer.
//!
//! The bet is debited before the session starts. A win pays back twice the bet, a push
//! returns it, and a loss writes nothing more. A hand torn down before settlement
//! returns the bet.

use super::SessionContext;
use crate::phase::Cancelled;
use shadowspire_execution::games::blackjack::{self, card_label, hand_label, hand_value, Outcome, Round};
use shadowspire_types::{
    games::{Phase, CURRENCY},
    Event, PlayerId,
};
use tracing::{info, warn};

/// Return a held bet, claiming the session's resolution.
async fn refund(ctx: &SessionContext, player: PlayerId, bet: u64) {
    if ctx.session().try_resolve() {
        info!(player = %player, bet, "blackjack bet returned");
        ctx.payout.pay(player, bet).await;
    }
}

async fn deal(
    ctx: &mut SessionContext,
    player: PlayerId,
    bet: u64,
    round: &Round,
) -> Result<(), Cancelled> {
    ctx.controller.enter(Phase::Dealing, 1, None);
    let opening = round.player.get(..2).unwrap_or_default();
    let upcard = round.dealer.first().map(|c| card_label(*c)).unwrap_or_default();
    ctx.narrate(format!(
        "🃏 {player} bets **{bet} {CURRENCY}**.\nYour hand: {} ({})\nDealer shows: {upcard}",
        hand_label(opening),
        hand_value(opening).0
    ))
    .await?;
    for card in round.player_draws() {
        ctx.narrate(format!("➕ {player} draws {}", card_label(*card)))
            .await?;
    }
    ctx.narrate(format!(
        "Dealer reveals: {} ({})",
        hand_label(&round.dealer),
        round.dealer_total()
    ))
    .await
}

pub async fn play(ctx: &mut SessionContext, player: PlayerId, bet: u64) -> Result<(), Cancelled> {
    let round = match blackjack::play(bet, &mut ctx.rng) {
        Ok(round) => round,
        Err(err) => {
            warn!(?err, "blackjack refused");
            ctx.say(format!("Blackjack cannot begin: {err}. Your bet is returned."))
                .await;
            refund(ctx, player, bet).await;
            return Ok(());
        }
    };

    if let Err(cancelled) = deal(ctx, player, bet, &round).await {
        refund(ctx, player, bet).await;
        return Err(cancelled);
    }

    ctx.controller.enter(Phase::Finished, 1, None);
    let totals = format!("{} against {}", round.player_total(), round.dealer_total());
    match round.outcome {
        Outcome::Win => {
            ctx.say(format!("🎉 {player} wins with {totals}!")).await;
            ctx.win(vec![player], bet.saturating_mul(2)).await;
        }
        Outcome::Bust | Outcome::Lose => {
            let session = ctx.session();
            if !session.try_resolve() {
                return Ok(());
            }
            let verdict = if round.outcome == Outcome::Bust {
                format!("💥 {player} busts with {}.", round.player_total())
            } else {
                format!("😞 {player} loses with {totals}.")
            };
            info!(player = %player, bet, "blackjack bet lost");
            ctx.say(format!("{verdict} The house keeps **{bet} {CURRENCY}**."))
                .await;
            ctx.emit(Event::GameLost {
                channel: session.channel(),
                kind: session.kind(),
            });
        }
        Outcome::Push => {
            if ctx.session().try_resolve() {
                info!(player = %player, bet, "blackjack push");
                ctx.say(format!("🤝 Push at {totals}. {player} gets their bet back."))
                    .await;
                ctx.payout.pay(player, bet).await;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::tests::Harness;
    use shadowspire_execution::{GameRng, Ledger};
    use shadowspire_types::{games::GameKind, ChannelKey};

    /// Every outcome settles the held bet exactly once.
    #[tokio::test(start_paused = true)]
    async fn test_settlement_matches_outcome() {
        for seed in 0..20 {
            let harness = Harness::new();
            let player = PlayerId(1);
            harness.ledger.credit(player, 1_000).await.unwrap();
            harness.ledger.debit(player, 100).await.unwrap();
            let (session, inbox) = harness
                .registry
                .create(ChannelKey(1), GameKind::Blackjack, player, vec![player])
                .unwrap();
            let mut ctx = harness.context(session.clone(), inbox, seed);
            let mut replay = GameRng::new(seed, session.id(), 0);
            let expected = blackjack::play(100, &mut replay).unwrap().outcome;

            play(&mut ctx, player, 100).await.unwrap();
            assert!(session.is_resolved());
            let balance = harness.ledger.balance(player).await.unwrap();
            let expected_balance = 1_000 + expected.settlement(100);
            assert_eq!(i64::try_from(balance).unwrap(), expected_balance, "seed {seed}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_returns_bet() {
        let harness = Harness::new();
        let player = PlayerId(1);
        harness.ledger.credit(player, 500).await.unwrap();
        harness.ledger.debit(player, 100).await.unwrap();
        let (session, mut ctx) = harness.session(GameKind::Blackjack, &[player]);
        session.cancel();
        assert_eq!(play(&mut ctx, player, 100).await, Err(Cancelled));
        assert!(session.is_resolved());
        assert_eq!(harness.ledger.balance(player).await.unwrap(), 500);
    }
}
