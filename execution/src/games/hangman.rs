//! Hanged Cookie: a word-guessing game.

use super::{GameError, GameRng};
use shadowspire_types::games::{HANGED_COOKIE_LIVES, HIDDEN_LETTER};
use std::collections::{BTreeSet, HashSet};

/// Word pool. Entries are upper-cased when a game starts.
pub const WORDS: [&str; 48] = [
    "cookie",
    "shadow",
    "pure vanilla",
    "jambound",
    "kingdom",
    "darkness",
    "realm",
    "arena",
    "void",
    "chaos",
    "meaningless",
    "deceitful",
    "madness",
    "crimson",
    "jester",
    "nightmare",
    "laughter",
    "corruption",
    "mirror",
    "abyss",
    "trickster",
    "betrayal",
    "eclipse",
    "puppet",
    "vengeance",
    "whispers",
    "shadow realm",
    "milkshake",
    "riddle",
    "illusion",
    "paranoia",
    "melancholy",
    "revelation",
    "candy apple",
    "black sapphire",
    "spire",
    "knowledge",
    "fountain",
    "false prophet",
    "cursed wisdom",
    "fool’s crown",
    "midnight tea",
    "oracle",
    "sweet poison",
    "book of deceit",
    "hollow laughter",
    "the masquerade",
    "mockery",
];

/// Gallows drawings indexed by lives lost.
pub const GALLOWS: [&str; 7] = [
    "  +---+\n  |   |\n      |\n      |\n      |\n      |\n=========",
    "  +---+\n  |   |\n  O   |\n      |\n      |\n      |\n=========",
    "  +---+\n  |   |\n  O   |\n  |   |\n      |\n      |\n=========",
    "  +---+\n  |   |\n  O   |\n /|   |\n      |\n      |\n=========",
    "  +---+\n  |   |\n  O   |\n /|\\  |\n      |\n      |\n=========",
    "  +---+\n  |   |\n  O   |\n /|\\  |\n /    |\n      |\n=========",
    "  +---+\n  |   |\n  O   |\n /|\\  |\n / \\  |\n      |\n=========",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WordState {
    Active,
    Won,
    Lost,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuessOutcome {
    /// The letter occurs `positions` times and is now revealed.
    Revealed { letter: char, positions: usize },
    /// Wrong letter; one life lost.
    Missed { letter: char },
    /// Letter already tried; no cost.
    RepeatedLetter { letter: char },
    /// The whole word was guessed.
    Solved,
    /// Wrong word; one life lost.
    WrongWord,
    /// Wrong word already tried; no cost.
    RepeatedWord,
}

pub struct HiddenWord {
    word: Vec<char>,
    revealed: Vec<bool>,
    guessed: BTreeSet<char>,
    wrong_words: HashSet<String>,
    lives: u8,
    state: WordState,
}

impl HiddenWord {
    pub fn new(word: &str, lives: u8) -> Self {
        let word: Vec<char> = word.trim().to_uppercase().chars().collect();
        // Spaces and punctuation are shown from the start
        let revealed = word.iter().map(|c| !c.is_alphabetic()).collect();
        Self {
            word,
            revealed,
            guessed: BTreeSet::new(),
            wrong_words: HashSet::new(),
            lives,
            state: WordState::Active,
        }
    }

    /// Draw a word from [WORDS] with the standard number of lives.
    pub fn random(rng: &mut GameRng) -> Self {
        let word = rng.choose(&WORDS).copied().unwrap_or(WORDS[0]);
        Self::new(word, HANGED_COOKIE_LIVES)
    }

    pub fn word(&self) -> String {
        self.word.iter().collect()
    }

    pub fn lives(&self) -> u8 {
        self.lives
    }

    pub fn lives_lost(&self) -> u8 {
        HANGED_COOKIE_LIVES.saturating_sub(self.lives)
    }

    pub fn state(&self) -> WordState {
        self.state
    }

    pub fn guessed_letters(&self) -> impl Iterator<Item = &char> {
        self.guessed.iter()
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed.iter().all(|r| *r)
    }

    /// The word with unrevealed letters masked, letters separated by spaces and words by
    /// a wider gap.
    pub fn display(&self) -> String {
        self.word
            .iter()
            .zip(&self.revealed)
            .map(|(c, shown)| match (c, shown) {
                (' ', _) => "  ".to_string(),
                (c, true) => c.to_string(),
                (_, false) => HIDDEN_LETTER.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn gallows(&self) -> &'static str {
        let idx = usize::from(self.lives_lost()).min(GALLOWS.len() - 1);
        GALLOWS[idx]
    }

    /// Apply one guess. Single alphabetic characters are letter guesses; anything longer
    /// is a guess at the whole word.
    pub fn guess(&mut self, input: &str) -> Result<GuessOutcome, GameError> {
        if self.state != WordState::Active {
            return Err(GameError::GameAlreadyComplete);
        }
        let normalized = input.trim().to_uppercase();
        let mut chars = normalized.chars();
        let outcome = match (chars.next(), chars.next()) {
            (None, _) => return Err(GameError::InvalidGuess),
            (Some(letter), None) => {
                if !letter.is_alphabetic() {
                    return Err(GameError::InvalidGuess);
                }
                self.guess_letter(letter)
            }
            _ => self.guess_word(normalized),
        };
        if self.is_revealed() {
            self.state = WordState::Won;
        } else if self.lives == 0 {
            self.state = WordState::Lost;
        }
        Ok(outcome)
    }

    /// End an active game as lost (e.g. the guesser went quiet).
    pub fn expire(&mut self) {
        if self.state == WordState::Active {
            self.state = WordState::Lost;
        }
    }

    fn guess_letter(&mut self, letter: char) -> GuessOutcome {
        if !self.guessed.insert(letter) {
            return GuessOutcome::RepeatedLetter { letter };
        }
        let mut positions = 0;
        for (c, shown) in self.word.iter().zip(self.revealed.iter_mut()) {
            if *c == letter {
                *shown = true;
                positions += 1;
            }
        }
        if positions == 0 {
            self.lives = self.lives.saturating_sub(1);
            return GuessOutcome::Missed { letter };
        }
        GuessOutcome::Revealed { letter, positions }
    }

    fn guess_word(&mut self, guess: String) -> GuessOutcome {
        if guess.chars().eq(self.word.iter().copied()) {
            self.revealed.iter_mut().for_each(|shown| *shown = true);
            return GuessOutcome::Solved;
        }
        if !self.wrong_words.insert(guess) {
            return GuessOutcome::RepeatedWord;
        }
        self.lives = self.lives.saturating_sub(1);
        GuessOutcome::WrongWord
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_wrong_letter_costs_once() {
        let mut game = HiddenWord::new("cookie", 6);
        assert_eq!(game.guess("z").unwrap(), GuessOutcome::Missed { letter: 'Z' });
        assert_eq!(game.lives(), 5);
        assert_eq!(
            game.guess("Z").unwrap(),
            GuessOutcome::RepeatedLetter { letter: 'Z' }
        );
        assert_eq!(game.lives(), 5);
        assert_eq!(game.state(), WordState::Active);
    }

    #[test]
    fn test_full_word_first_guess_wins() {
        let mut game = HiddenWord::new("pure vanilla", 6);
        assert_eq!(game.guess("  Pure Vanilla ").unwrap(), GuessOutcome::Solved);
        assert_eq!(game.state(), WordState::Won);
        assert!(game.is_revealed());
        assert_eq!(game.guess("a"), Err(GameError::GameAlreadyComplete));
    }

    #[test]
    fn test_letters_reveal_all_positions_and_win() {
        let mut game = HiddenWord::new("cookie", 6);
        assert_eq!(
            game.guess("o").unwrap(),
            GuessOutcome::Revealed {
                letter: 'O',
                positions: 2
            }
        );
        assert_eq!(game.display(), "❒ O O ❒ ❒ ❒");
        for letter in ["c", "k", "i"] {
            game.guess(letter).unwrap();
            assert_eq!(game.state(), WordState::Active);
        }
        game.guess("e").unwrap();
        assert_eq!(game.state(), WordState::Won);
        assert_eq!(game.lives(), 6);
    }

    #[test]
    fn test_wrong_word_costs_once_per_word() {
        let mut game = HiddenWord::new("abyss", 6);
        assert_eq!(game.guess("abbey").unwrap(), GuessOutcome::WrongWord);
        assert_eq!(game.guess("ABBEY").unwrap(), GuessOutcome::RepeatedWord);
        assert_eq!(game.lives(), 5);
    }

    #[test]
    fn test_out_of_lives_loses() {
        let mut game = HiddenWord::new("void", 2);
        game.guess("x").unwrap();
        assert_eq!(game.state(), WordState::Active);
        game.guess("q").unwrap();
        assert_eq!(game.state(), WordState::Lost);
        assert_eq!(game.lives(), 0);
        assert_eq!(game.guess("v"), Err(GameError::GameAlreadyComplete));
    }

    #[test]
    fn test_non_letters_shown_and_rejected() {
        let game = HiddenWord::new("fool’s crown", 6);
        assert_eq!(game.display(), "❒ ❒ ❒ ❒ ’ ❒    ❒ ❒ ❒ ❒ ❒");

        let mut game = HiddenWord::new("void", 6);
        assert_eq!(game.guess("7"), Err(GameError::InvalidGuess));
        assert_eq!(game.guess("   "), Err(GameError::InvalidGuess));
        assert_eq!(game.lives(), 6);
    }

    #[test]
    fn test_expire_only_when_active() {
        let mut game = HiddenWord::new("void", 6);
        game.guess("void").unwrap();
        game.expire();
        assert_eq!(game.state(), WordState::Won);

        let mut game = HiddenWord::new("void", 6);
        game.expire();
        assert_eq!(game.state(), WordState::Lost);
    }

    #[test]
    fn test_gallows_tracks_lives_lost() {
        let mut game = HiddenWord::new("void", HANGED_COOKIE_LIVES);
        assert_eq!(game.gallows(), GALLOWS[0]);
        game.guess("x").unwrap();
        assert_eq!(game.gallows(), GALLOWS[1]);
    }

    #[test]
    fn test_random_word_uppercase() {
        let mut rng = GameRng::new(1, 1, 0);
        let game = HiddenWord::random(&mut rng);
        assert_eq!(game.word(), game.word().to_uppercase());
        assert_eq!(game.lives(), HANGED_COOKIE_LIVES);
    }
}
