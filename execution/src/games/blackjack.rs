//! Blackjack, auto-played.
//!
//! The player draws while under [BLACKJACK_STAND_TOTAL] and a coin flip says so; the
//! dealer draws while under the same total. Cards are 0-51: suit = card/13,
//! rank = card%13.

use super::{GameError, GameRng};
use shadowspire_types::games::BLACKJACK_STAND_TOTAL;

const RANKS: [&str; 13] = [
    "A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K",
];
const SUITS: [char; 4] = ['♠', '♥', '♦', '♣'];

/// Calculate hand value. Returns (value, is_soft).
pub fn hand_value(cards: &[u8]) -> (u8, bool) {
    let mut value: u16 = 0;
    let mut aces: u8 = 0;

    for &card in cards {
        let rank = card_rank(card) + 1; // 1=Ace, 2-10, 11=J, 12=Q, 13=K
        if rank == 1 {
            aces += 1;
            value += 11;
        } else if rank >= 10 {
            value += 10;
        } else {
            value += rank as u16;
        }
    }

    while value > 21 && aces > 0 {
        value -= 10;
        aces -= 1;
    }

    let is_soft = aces > 0 && value <= 21;
    (value.min(255) as u8, is_soft)
}

/// Check if hand is a blackjack (21 with 2 cards).
pub fn is_blackjack(cards: &[u8]) -> bool {
    cards.len() == 2 && hand_value(cards).0 == 21
}

/// Get card rank (0-12).
fn card_rank(card: u8) -> u8 {
    card % 13
}

/// Short label such as `10♥`.
pub fn card_label(card: u8) -> String {
    let rank = RANKS[usize::from(card_rank(card))];
    let suit = SUITS[usize::from(card / 13) % SUITS.len()];
    format!("{rank}{suit}")
}

pub fn hand_label(cards: &[u8]) -> String {
    cards
        .iter()
        .map(|card| card_label(*card))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Player went over 21.
    Bust,
    /// Dealer bust or player higher.
    Win,
    /// Dealer higher.
    Lose,
    Push,
}

impl Outcome {
    /// Net change to player balance (positive = add, negative = deduct).
    pub fn settlement(&self, bet: u64) -> i64 {
        let bet = i64::try_from(bet).unwrap_or(i64::MAX);
        match self {
            Outcome::Win => bet,
            Outcome::Bust | Outcome::Lose => -bet,
            Outcome::Push => 0,
        }
    }
}

/// A played round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub bet: u64,
    /// Final player hand; the first two cards are the opening deal.
    pub player: Vec<u8>,
    /// Final dealer hand; the first card was shown face up.
    pub dealer: Vec<u8>,
    pub outcome: Outcome,
}

impl Round {
    /// Cards the player drew after the opening deal.
    pub fn player_draws(&self) -> &[u8] {
        self.player.get(2..).unwrap_or_default()
    }

    pub fn player_total(&self) -> u8 {
        hand_value(&self.player).0
    }

    pub fn dealer_total(&self) -> u8 {
        hand_value(&self.dealer).0
    }
}

/// Deal and auto-play one round.
pub fn play(bet: u64, rng: &mut GameRng) -> Result<Round, GameError> {
    if bet == 0 {
        return Err(GameError::InvalidBet);
    }
    let mut deck = rng.create_deck();
    let mut draw = |rng: &mut GameRng| rng.draw_card(&mut deck);

    let mut player = Vec::with_capacity(6);
    let mut dealer = Vec::with_capacity(6);
    for _ in 0..2 {
        player.extend(draw(rng));
        dealer.extend(draw(rng));
    }

    while hand_value(&player).0 < BLACKJACK_STAND_TOTAL && rng.coin() {
        match draw(rng) {
            Some(card) => player.push(card),
            None => break,
        }
    }
    while hand_value(&dealer).0 < BLACKJACK_STAND_TOTAL {
        match draw(rng) {
            Some(card) => dealer.push(card),
            None => break,
        }
    }

    let outcome = settle(hand_value(&player).0, hand_value(&dealer).0);
    Ok(Round {
        bet,
        player,
        dealer,
        outcome,
    })
}

fn settle(player: u8, dealer: u8) -> Outcome {
    if player > 21 {
        Outcome::Bust
    } else if dealer > 21 || player > dealer {
        Outcome::Win
    } else if player == dealer {
        Outcome::Push
    } else {
        Outcome::Lose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_value() {
        // Ace of spades + King of spades
        assert_eq!(hand_value(&[0, 12]), (21, true));
        assert!(is_blackjack(&[0, 12]));
        // Two aces + nine
        assert_eq!(hand_value(&[0, 13, 8]), (21, true));
        // Ten, six, king
        assert_eq!(hand_value(&[9, 5, 12]), (26, false));
    }

    #[test]
    fn test_settle() {
        assert_eq!(settle(22, 18), Outcome::Bust);
        assert_eq!(settle(22, 23), Outcome::Bust);
        assert_eq!(settle(15, 23), Outcome::Win);
        assert_eq!(settle(20, 18), Outcome::Win);
        assert_eq!(settle(18, 18), Outcome::Push);
        assert_eq!(settle(17, 19), Outcome::Lose);
        assert_eq!(Outcome::Lose.settlement(50), -50);
        assert_eq!(Outcome::Push.settlement(50), 0);
    }

    #[test]
    fn test_play_rules() {
        assert_eq!(play(0, &mut GameRng::new(1, 1, 0)), Err(GameError::InvalidBet));
        for seed in 0..200 {
            let mut rng = GameRng::new(seed, 7, 0);
            let round = play(10, &mut rng).unwrap();
            assert!(round.player.len() >= 2);
            assert!(round.dealer_total() >= BLACKJACK_STAND_TOTAL);
            if !round.player_draws().is_empty() {
                let before = hand_value(&round.player[..round.player.len() - 1]).0;
                assert!(before < BLACKJACK_STAND_TOTAL);
            }
            assert_eq!(
                round.outcome,
                settle(round.player_total(), round.dealer_total())
            );
            let mut cards: Vec<u8> = round.player.iter().chain(&round.dealer).copied().collect();
            let dealt = cards.len();
            cards.sort_unstable();
            cards.dedup();
            assert_eq!(cards.len(), dealt);
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(card_label(0), "A♠");
        assert_eq!(card_label(22), "10♥");
        assert_eq!(hand_label(&[12, 51]), "K♠ K♣");
    }
}
