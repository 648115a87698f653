//! Hanged Cookie: the host guesses a hidden word one letter (or word) at a time.

use super::SessionContext;
use crate::phase::{Cancelled, FirstText, PhaseSpec};
use shadowspire_execution::{
    games::hangman::{GuessOutcome, HiddenWord, WordState},
    GameError,
};
use shadowspire_types::{
    games::{Phase, HANGED_COOKIE_REWARD},
    PlayerId,
};
use tracing::{debug, info};

fn board(word: &HiddenWord) -> String {
    let tried: String = word.guessed_letters().collect();
    let mut board = format!(
        "```\n{}\n```\n`{}`  ({} lives left)",
        word.gallows(),
        word.display(),
        word.lives()
    );
    if !tried.is_empty() {
        board.push_str(&format!("\nTried: `{tried}`"));
    }
    board
}

fn describe(outcome: &GuessOutcome) -> String {
    match outcome {
        GuessOutcome::Revealed { letter, positions } => {
            format!("✅ **{letter}** appears {positions} time(s)!")
        }
        GuessOutcome::Missed { letter } => format!("❌ No **{letter}** in this word."),
        GuessOutcome::RepeatedLetter { letter } => {
            format!("🔁 You already tried **{letter}**.")
        }
        GuessOutcome::Solved => "🎯 That's the word!".to_string(),
        GuessOutcome::WrongWord => "❌ That's not the word.".to_string(),
        GuessOutcome::RepeatedWord => "🔁 You already tried that word.".to_string(),
    }
}

pub async fn play(
    ctx: &mut SessionContext,
    guesser: PlayerId,
    mut word: HiddenWord,
) -> Result<(), Cancelled> {
    ctx.controller.enter(Phase::Intro, 0, None);
    ctx.say(format!(
        "🍪 **Hanged Cookie!** {guesser}, save the cookie by guessing the word. \
         Type a letter or the whole word.\n{}",
        board(&word)
    ))
    .await;

    let mut turn = 0;
    while word.state() == WordState::Active {
        turn += 1;
        let spec = PhaseSpec::new(Phase::Guessing, turn, ctx.config.guess_timeout);
        let Some(text) = ctx.controller.run(spec, FirstText::new(guesser)).await? else {
            word.expire();
            info!(player = %guesser, "word guess timed out");
            ctx.say(format!(
                "⌛ {guesser} went quiet. The cookie is hanged. The word was **{}**.",
                word.word()
            ))
            .await;
            break;
        };
        // Commands typed by the guesser are not guesses
        if text.trim_start().starts_with('!') {
            debug!(player = %guesser, "ignored command during guessing");
            continue;
        }
        match word.guess(&text) {
            Ok(outcome) => {
                ctx.say(format!("{}\n{}", describe(&outcome), board(&word)))
                    .await;
            }
            Err(GameError::InvalidGuess) => {
                ctx.say("Guesses must be letters only.").await;
            }
            Err(err) => {
                debug!(?err, "guess refused");
                break;
            }
        }
    }

    ctx.controller.enter(Phase::Finished, turn, None);
    match word.state() {
        WordState::Won => {
            ctx.say(format!(
                "🎉 {guesser} saved the cookie! The word was **{}**.",
                word.word()
            ))
            .await;
            ctx.win(vec![guesser], HANGED_COOKIE_REWARD).await;
        }
        WordState::Lost | WordState::Active => {
            if word.lives() == 0 {
                ctx.say(format!(
                    "💀 Out of lives. The cookie is hanged. The word was **{}**.",
                    word.word()
                ))
                .await;
            }
            ctx.lose();
        }
    }
    Ok(())
}
