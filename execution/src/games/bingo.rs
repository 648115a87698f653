//! Bingo: 75-ball with one-shot line and full-card prizes.

use super::{dedupe, GameError, GameRng};
use shadowspire_types::{
    games::{
        BINGO_CARD_SIZE, BINGO_FILL_REWARD, BINGO_LINE_REWARD, BINGO_MAX_NUMBER,
        BINGO_MIN_PARTICIPANTS,
    },
    PlayerId,
};
use std::collections::{BTreeMap, BTreeSet};

pub const LETTERS: [char; BINGO_CARD_SIZE] = ['B', 'I', 'N', 'G', 'O'];

/// Numbers per column (B is 1-15, I is 16-30, ...).
const COLUMN_SPAN: u8 = 15;

const CENTER: usize = BINGO_CARD_SIZE / 2;

/// Column letter for a called number.
pub fn letter_for(number: u8) -> char {
    let column = usize::from(number.saturating_sub(1) / COLUMN_SPAN);
    LETTERS[column.min(BINGO_CARD_SIZE - 1)]
}

/// A 5x5 card. `cells[col][row]`; the centre is a free space and starts marked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BingoCard {
    cells: [[Option<u8>; BINGO_CARD_SIZE]; BINGO_CARD_SIZE],
    marked: [[bool; BINGO_CARD_SIZE]; BINGO_CARD_SIZE],
}

impl BingoCard {
    pub fn generate(rng: &mut GameRng) -> Self {
        let mut cells = [[None; BINGO_CARD_SIZE]; BINGO_CARD_SIZE];
        for (col, column) in cells.iter_mut().enumerate() {
            let low = col as u8 * COLUMN_SPAN + 1;
            let numbers = rng.sample_range(low, low + COLUMN_SPAN - 1, BINGO_CARD_SIZE);
            for (cell, number) in column.iter_mut().zip(numbers) {
                *cell = Some(number);
            }
        }
        cells[CENTER][CENTER] = None;
        let mut marked = [[false; BINGO_CARD_SIZE]; BINGO_CARD_SIZE];
        marked[CENTER][CENTER] = true;
        Self { cells, marked }
    }

    pub fn cell(&self, col: usize, row: usize) -> Option<u8> {
        self.cells.get(col).and_then(|c| c.get(row)).copied().flatten()
    }

    pub fn is_marked(&self, col: usize, row: usize) -> bool {
        self.marked
            .get(col)
            .and_then(|c| c.get(row))
            .copied()
            .unwrap_or(false)
    }

    /// Mark `number` if present. Returns true if a cell was marked.
    pub fn mark(&mut self, number: u8) -> bool {
        for (col, column) in self.cells.iter().enumerate() {
            for (row, cell) in column.iter().enumerate() {
                if *cell == Some(number) {
                    self.marked[col][row] = true;
                    return true;
                }
            }
        }
        false
    }

    /// Any complete row, column or diagonal.
    pub fn has_line(&self) -> bool {
        let n = BINGO_CARD_SIZE;
        let m = &self.marked;
        (0..n).any(|row| (0..n).all(|col| m[col][row]))
            || (0..n).any(|col| (0..n).all(|row| m[col][row]))
            || (0..n).all(|i| m[i][i])
            || (0..n).all(|i| m[i][n - 1 - i])
    }

    pub fn is_full(&self) -> bool {
        self.marked.iter().flatten().all(|m| *m)
    }

    /// Text grid with a header row; marked cells are bracketed.
    pub fn render(&self) -> String {
        let mut out = LETTERS
            .iter()
            .map(|l| format!(" {l:^4}"))
            .collect::<String>();
        for row in 0..BINGO_CARD_SIZE {
            out.push('\n');
            for col in 0..BINGO_CARD_SIZE {
                let label = match self.cells[col][row] {
                    None => "FREE".to_string(),
                    Some(n) => n.to_string(),
                };
                if self.marked[col][row] && self.cells[col][row].is_some() {
                    out.push_str(&format!(" [{label:>2}]"));
                } else {
                    out.push_str(&format!(" {label:^4}"));
                }
            }
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimKind {
    /// Typed as `BINGO`.
    Line,
    /// Typed as `FILL`.
    Fill,
}

impl ClaimKind {
    /// Parse a chat input. Case and surrounding whitespace are ignored.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_uppercase().as_str() {
            "BINGO" => Some(ClaimKind::Line),
            "FILL" => Some(ClaimKind::Fill),
            _ => None,
        }
    }

    pub fn reward(&self) -> u64 {
        match self {
            ClaimKind::Line => BINGO_LINE_REWARD,
            ClaimKind::Fill => BINGO_FILL_REWARD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaimOutcome {
    Awarded { kind: ClaimKind, reward: u64 },
    /// The player's card does not qualify (yet).
    NotReady,
    /// Someone already took this prize.
    AlreadyClaimed { by: PlayerId },
}

/// A called number.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Call {
    pub number: u8,
    pub letter: char,
    /// 1-based count of numbers called so far.
    pub index: usize,
}

pub struct Bingo {
    cards: BTreeMap<PlayerId, BingoCard>,
    /// Remaining numbers; calls pop from the back.
    pending: Vec<u8>,
    called: Vec<u8>,
    line_ready: BTreeSet<PlayerId>,
    fill_ready: BTreeSet<PlayerId>,
    line_winner: Option<PlayerId>,
    fill_winner: Option<PlayerId>,
}

impl Bingo {
    pub fn new(players: &[PlayerId], rng: &mut GameRng) -> Result<Self, GameError> {
        let players = dedupe(players);
        if players.len() < BINGO_MIN_PARTICIPANTS {
            return Err(GameError::InsufficientParticipants {
                min: BINGO_MIN_PARTICIPANTS,
                got: players.len(),
            });
        }
        let cards = players
            .into_iter()
            .map(|p| (p, BingoCard::generate(rng)))
            .collect();
        let mut pending: Vec<u8> = (1..=BINGO_MAX_NUMBER).collect();
        rng.shuffle(&mut pending);
        Ok(Self {
            cards,
            pending,
            called: Vec::new(),
            line_ready: BTreeSet::new(),
            fill_ready: BTreeSet::new(),
            line_winner: None,
            fill_winner: None,
        })
    }

    pub fn card(&self, player: &PlayerId) -> Option<&BingoCard> {
        self.cards.get(player)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.cards.keys()
    }

    pub fn called(&self) -> &[u8] {
        &self.called
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn is_line_ready(&self, player: &PlayerId) -> bool {
        self.line_ready.contains(player)
    }

    pub fn is_fill_ready(&self, player: &PlayerId) -> bool {
        self.fill_ready.contains(player)
    }

    /// The game ends on a full-card claim or once every number is called.
    pub fn is_finished(&self) -> bool {
        self.fill_winner.is_some() || self.pending.is_empty()
    }

    /// Call the next number and mark it on every card.
    pub fn draw(&mut self) -> Option<Call> {
        if self.fill_winner.is_some() {
            return None;
        }
        let number = self.pending.pop()?;
        self.called.push(number);
        for (player, card) in self.cards.iter_mut() {
            if !card.mark(number) {
                continue;
            }
            if card.is_full() {
                self.fill_ready.insert(*player);
            }
            if card.has_line() {
                self.line_ready.insert(*player);
            }
        }
        Some(Call {
            number,
            letter: letter_for(number),
            index: self.called.len(),
        })
    }

    /// Claim a prize. Each prize is awarded once per game.
    pub fn claim(&mut self, player: PlayerId, kind: ClaimKind) -> Result<ClaimOutcome, GameError> {
        if !self.cards.contains_key(&player) {
            return Err(GameError::NotParticipant(player));
        }
        if self.fill_winner.is_some() && kind == ClaimKind::Line {
            return Err(GameError::GameAlreadyComplete);
        }
        let (winner, ready) = match kind {
            ClaimKind::Line => (&mut self.line_winner, &self.line_ready),
            ClaimKind::Fill => (&mut self.fill_winner, &self.fill_ready),
        };
        if let Some(by) = winner {
            return Ok(ClaimOutcome::AlreadyClaimed { by: *by });
        }
        if !ready.contains(&player) {
            return Ok(ClaimOutcome::NotReady);
        }
        *winner = Some(player);
        Ok(ClaimOutcome::Awarded {
            kind,
            reward: kind.reward(),
        })
    }

    /// Called numbers grouped by column letter, in call order.
    pub fn history(&self) -> Vec<(char, Vec<u8>)> {
        LETTERS
            .iter()
            .map(|letter| {
                let numbers = self
                    .called
                    .iter()
                    .copied()
                    .filter(|n| letter_for(*n) == *letter)
                    .collect();
                (*letter, numbers)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_columns_in_range() {
        for seed in 0..20 {
            let mut rng = GameRng::new(seed, 1, 0);
            let card = BingoCard::generate(&mut rng);
            for col in 0..BINGO_CARD_SIZE {
                let low = col as u8 * 15 + 1;
                let mut seen = Vec::new();
                for row in 0..BINGO_CARD_SIZE {
                    if col == 2 && row == 2 {
                        assert_eq!(card.cell(col, row), None);
                        assert!(card.is_marked(col, row));
                        continue;
                    }
                    let n = card.cell(col, row).unwrap();
                    assert!((low..low + 15).contains(&n));
                    assert!(!seen.contains(&n));
                    seen.push(n);
                }
            }
        }
    }

    #[test]
    fn test_letter_for() {
        assert_eq!(letter_for(1), 'B');
        assert_eq!(letter_for(15), 'B');
        assert_eq!(letter_for(16), 'I');
        assert_eq!(letter_for(45), 'N');
        assert_eq!(letter_for(46), 'G');
        assert_eq!(letter_for(75), 'O');
    }

    #[test]
    fn test_line_through_free_space() {
        let mut rng = GameRng::new(3, 1, 0);
        let mut card = BingoCard::generate(&mut rng);
        for col in [0, 1, 3, 4] {
            assert!(!card.has_line());
            let n = card.cell(col, 2).unwrap();
            assert!(card.mark(n));
        }
        assert!(card.has_line());
        assert!(!card.is_full());
        assert!(!card.mark(0));
    }

    #[test]
    fn test_full_draw_ends_game() {
        let mut rng = GameRng::new(5, 1, 0);
        let mut game = Bingo::new(&[PlayerId(1), PlayerId(2)], &mut rng).unwrap();
        let mut seen = BTreeSet::new();
        while let Some(call) = game.draw() {
            assert!(seen.insert(call.number));
            assert_eq!(call.index, seen.len());
            assert_eq!(call.letter, letter_for(call.number));
        }
        assert_eq!(seen.len(), 75);
        assert!(game.is_finished());
        assert!(game.is_fill_ready(&PlayerId(1)));
        assert!(game.is_line_ready(&PlayerId(2)));
        let history = game.history();
        assert_eq!(history.len(), 5);
        assert!(history.iter().all(|(_, nums)| nums.len() == 15));
    }

    #[test]
    fn test_claims_are_one_shot() {
        let mut rng = GameRng::new(8, 1, 0);
        let (a, b) = (PlayerId(1), PlayerId(2));
        let mut game = Bingo::new(&[a, b], &mut rng).unwrap();

        assert_eq!(game.claim(a, ClaimKind::Line).unwrap(), ClaimOutcome::NotReady);
        assert_eq!(
            game.claim(PlayerId(9), ClaimKind::Line),
            Err(GameError::NotParticipant(PlayerId(9)))
        );

        while !(game.is_line_ready(&a) && game.is_line_ready(&b)) {
            game.draw().unwrap();
        }
        assert_eq!(
            game.claim(a, ClaimKind::Line).unwrap(),
            ClaimOutcome::Awarded {
                kind: ClaimKind::Line,
                reward: BINGO_LINE_REWARD
            }
        );
        assert_eq!(
            game.claim(b, ClaimKind::Line).unwrap(),
            ClaimOutcome::AlreadyClaimed { by: a }
        );

        while !game.is_fill_ready(&b) {
            game.draw().unwrap();
        }
        assert_eq!(
            game.claim(b, ClaimKind::Fill).unwrap(),
            ClaimOutcome::Awarded {
                kind: ClaimKind::Fill,
                reward: BINGO_FILL_REWARD
            }
        );
        assert!(game.is_finished());
        assert_eq!(game.draw(), None);
        assert_eq!(
            game.claim(a, ClaimKind::Fill).unwrap(),
            ClaimOutcome::AlreadyClaimed { by: b }
        );
    }

    #[test]
    fn test_claim_parse() {
        assert_eq!(ClaimKind::parse(" bingo "), Some(ClaimKind::Line));
        assert_eq!(ClaimKind::parse("FILL"), Some(ClaimKind::Fill));
        assert_eq!(ClaimKind::parse("bingo!"), None);
    }

    #[test]
    fn test_render_marks_called() {
        let mut rng = GameRng::new(2, 1, 0);
        let mut card = BingoCard::generate(&mut rng);
        let n = card.cell(0, 0).unwrap();
        card.mark(n);
        let text = card.render();
        assert!(text.contains("FREE"));
        assert!(text.contains(&format!("[{n:>2}]")));
        assert_eq!(text.lines().count(), 6);
    }
}
