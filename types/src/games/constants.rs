/// Health every massacre participant starts with (and the heal ceiling).
pub const MAX_HEALTH: u8 = 100;

/// Reward paid to the massacre survivor.
pub const MASSACRE_REWARD: u64 = 10_000;

/// Massacre lobby capacity.
pub const MASSACRE_MAX_PARTICIPANTS: usize = 25;

/// Minimum roster for a massacre.
pub const MASSACRE_MIN_PARTICIPANTS: usize = 2;

/// Chance that a Day or Night is replaced by a special event.
pub const SPECIAL_EVENT_CHANCE: f64 = 0.10;

/// Hidden Beast lobby capacity.
pub const HIDDEN_BEAST_MAX_PARTICIPANTS: usize = 15;

/// Minimum roster for Hidden Beast (one of each special role).
pub const HIDDEN_BEAST_MIN_PARTICIPANTS: usize = 5;

/// Paid to every non-Beast participant (alive or fallen) when the Beast is gone.
pub const INNOCENT_REWARD: u64 = 100;

/// Paid to each surviving Beast when it reaches parity.
pub const BEAST_REWARD: u64 = 1_000;

/// Paid to the Trickster when voted out.
pub const TRICKSTER_REWARD: u64 = 1_000;

/// Times a detective may scan the same target in one game.
pub const MAX_SCANS_PER_TARGET: u8 = 2;

/// Wrong guesses allowed in the word game.
pub const HANGED_COOKIE_LIVES: u8 = 6;

/// Reward for saving the hanged cookie.
pub const HANGED_COOKIE_REWARD: u64 = 1_000;

/// Placeholder shown for an unrevealed letter.
pub const HIDDEN_LETTER: char = '❒';

/// Bingo reward for the first completed line.
pub const BINGO_LINE_REWARD: u64 = 500;

/// Bingo reward for the first full card.
pub const BINGO_FILL_REWARD: u64 = 5_000;

/// Highest bingo number.
pub const BINGO_MAX_NUMBER: u8 = 75;

/// Bingo card edge length.
pub const BINGO_CARD_SIZE: usize = 5;

/// Minimum bingo roster.
pub const BINGO_MIN_PARTICIPANTS: usize = 1;

/// Dealer and auto-player stop drawing at this total.
pub const BLACKJACK_STAND_TOTAL: u8 = 17;

/// Currency display name.
pub const CURRENCY: &str = "Light of Deceit";
