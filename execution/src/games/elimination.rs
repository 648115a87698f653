//! Massacre: an elimination tournament.
//!
//! The tournament alternates Day and Night periods. In a regular period every living
//! participant acts once, in an order shuffled at the start of the period; each action
//! is applied before the next actor rolls, so a participant killed earlier in the period
//! is skipped and cannot be targeted. With [SPECIAL_EVENT_CHANCE] the whole period is
//! replaced by a special event that hits every living participant.
//!
//! The driver loop is:
//!
//! ```text
//! while !game.is_over() {
//!     match game.plan_period(rng)? {
//!         PeriodPlan::Special(kind) => game.run_special(rng),
//!         PeriodPlan::Regular(order) => for actor in order { game.act(actor, rng) },
//!     }
//!     game.end_period();
//! }
//! game.finish()
//! ```

use super::{dedupe, GameError, GameRng};
use shadowspire_types::{
    games::{
        ParticipantState, MASSACRE_MAX_PARTICIPANTS, MASSACRE_MIN_PARTICIPANTS,
        SPECIAL_EVENT_CHANCE,
    },
    PlayerId,
};
use std::{fmt, ops::RangeInclusive};

/// Attack damage during the Day.
pub const DAY_ATTACK: RangeInclusive<u8> = 15..=40;
/// Attack damage during the Night.
pub const NIGHT_ATTACK: RangeInclusive<u8> = 25..=50;
pub const SELF_INJURY: RangeInclusive<u8> = 5..=15;
pub const HEAL: RangeInclusive<u8> = 10..=25;
/// Damage every living participant takes from a special event.
pub const SPECIAL_DAMAGE: RangeInclusive<u8> = 10..=30;
pub const SPECIAL_HEAL: RangeInclusive<u8> = 10..=30;

/// Injury tags recorded by self-injury.
pub const INJURIES: [&str; 5] = [
    "scratched arm",
    "twisted ankle",
    "bruised ribs",
    "sprained wrist",
    "bitten hand",
];

/// Outcome categories an actor may roll.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Attack,
    Heal,
    SelfInjury,
    Alliance,
    Hide,
}

/// Per-actor weights (out of 100).
pub const ACTION_WEIGHTS: [(ActionKind, u32); 5] = [
    (ActionKind::Attack, 35),
    (ActionKind::Heal, 10),
    (ActionKind::SelfInjury, 20),
    (ActionKind::Alliance, 15),
    (ActionKind::Hide, 20),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Period {
    Day,
    Night,
}

impl Period {
    fn attack_range(&self) -> RangeInclusive<u8> {
        match self {
            Period::Day => DAY_ATTACK,
            Period::Night => NIGHT_ATTACK,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day => f.write_str("day"),
            Period::Night => f.write_str("night"),
        }
    }
}

/// Events that replace a whole period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialKind {
    HalloweenNight,
    BloodRain,
    MadFeast,
    ShadowStorm,
    VoidReckoning,
}

impl SpecialKind {
    pub const ALL: [SpecialKind; 5] = [
        SpecialKind::HalloweenNight,
        SpecialKind::BloodRain,
        SpecialKind::MadFeast,
        SpecialKind::ShadowStorm,
        SpecialKind::VoidReckoning,
    ];
}

/// State change produced by one actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Attack {
        actor: PlayerId,
        target: PlayerId,
        damage: u8,
        /// Target health after the hit.
        remaining: u8,
        killed: bool,
    },
    Heal {
        actor: PlayerId,
        /// Health actually restored.
        amount: u8,
    },
    SelfInjury {
        actor: PlayerId,
        injury: &'static str,
        damage: u8,
        killed: bool,
    },
    Alliance {
        actor: PlayerId,
        partner: PlayerId,
    },
    Hide {
        actor: PlayerId,
    },
}

impl Effect {
    /// The participant this effect killed, if any.
    pub fn killed(&self) -> Option<PlayerId> {
        match self {
            Effect::Attack {
                target,
                killed: true,
                ..
            } => Some(*target),
            Effect::SelfInjury {
                actor,
                killed: true,
                ..
            } => Some(*actor),
            _ => None,
        }
    }
}

/// Per-participant result of a special event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialOutcome {
    Died { player: PlayerId, damage: u8 },
    Hurt { player: PlayerId, damage: u8 },
    Recovered { player: PlayerId, damage: u8, heal: u8 },
}

impl SpecialOutcome {
    pub fn player(&self) -> PlayerId {
        match self {
            SpecialOutcome::Died { player, .. }
            | SpecialOutcome::Hurt { player, .. }
            | SpecialOutcome::Recovered { player, .. } => *player,
        }
    }
}

/// What the next period will be.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeriodPlan {
    Special(SpecialKind),
    /// Living participants in the order they act.
    Regular(Vec<PlayerId>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Winner {
    pub player: PlayerId,
    pub health: u8,
    /// False when the winner was picked by the health tiebreak.
    pub last_standing: bool,
}

pub struct Massacre {
    participants: Vec<ParticipantState>,
    day: u32,
    period: Period,
    periods_run: u32,
    max_periods: u32,
    finished: bool,
}

impl Massacre {
    /// Start a tournament. `max_days` bounds the run to `max_days` Day+Night pairs.
    pub fn new(roster: &[PlayerId], max_days: u32) -> Result<Self, GameError> {
        let roster = dedupe(roster);
        if roster.len() < MASSACRE_MIN_PARTICIPANTS {
            return Err(GameError::InsufficientParticipants {
                min: MASSACRE_MIN_PARTICIPANTS,
                got: roster.len(),
            });
        }
        if roster.len() > MASSACRE_MAX_PARTICIPANTS {
            return Err(GameError::TooManyParticipants {
                max: MASSACRE_MAX_PARTICIPANTS,
                got: roster.len(),
            });
        }
        Ok(Self {
            participants: roster.into_iter().map(ParticipantState::new).collect(),
            day: 1,
            period: Period::Day,
            periods_run: 0,
            max_periods: max_days.max(1).saturating_mul(2),
            finished: false,
        })
    }

    /// All participants in roster order, dead ones included.
    pub fn participants(&self) -> &[ParticipantState] {
        &self.participants
    }

    pub fn participant(&self, player: &PlayerId) -> Option<&ParticipantState> {
        self.participants.iter().find(|p| p.player() == *player)
    }

    pub fn alive(&self) -> Vec<PlayerId> {
        self.participants
            .iter()
            .filter(|p| p.is_alive())
            .map(|p| p.player())
            .collect()
    }

    pub fn alive_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_alive()).count()
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn periods_run(&self) -> u32 {
        self.periods_run
    }

    pub fn is_over(&self) -> bool {
        self.finished || self.alive_count() <= 1 || self.periods_run >= self.max_periods
    }

    /// Decide whether the coming period is a special event or a regular pass.
    pub fn plan_period(&self, rng: &mut GameRng) -> Result<PeriodPlan, GameError> {
        if self.is_over() {
            return Err(GameError::GameAlreadyComplete);
        }
        if rng.chance(SPECIAL_EVENT_CHANCE) {
            let kind = *rng
                .choose(&SpecialKind::ALL)
                .unwrap_or(&SpecialKind::HalloweenNight);
            return Ok(PeriodPlan::Special(kind));
        }
        let mut order = self.alive();
        rng.shuffle(&mut order);
        Ok(PeriodPlan::Regular(order))
    }

    /// Resolve one actor's turn. Returns `None` if the actor is dead or unknown.
    pub fn act(&mut self, actor: PlayerId, rng: &mut GameRng) -> Option<Effect> {
        let actor_idx = self.index_of(&actor)?;
        if !self.participants[actor_idx].is_alive() {
            return None;
        }
        let targets: Vec<usize> = self
            .participants
            .iter()
            .enumerate()
            .filter(|(idx, p)| *idx != actor_idx && p.is_alive())
            .map(|(idx, _)| idx)
            .collect();
        let kind = rng.weighted(&ACTION_WEIGHTS).unwrap_or(ActionKind::Hide);

        let effect = match kind {
            ActionKind::Attack => match rng.choose(&targets).copied() {
                Some(target_idx) => {
                    let damage = roll(rng, self.period.attack_range());
                    let target = &mut self.participants[target_idx];
                    let killed = target.damage(damage);
                    Effect::Attack {
                        actor,
                        target: target.player(),
                        damage,
                        remaining: target.health(),
                        killed,
                    }
                }
                None => Effect::Hide { actor },
            },
            ActionKind::Heal => {
                let amount = roll(rng, HEAL);
                let amount = self.participants[actor_idx].heal(amount);
                Effect::Heal { actor, amount }
            }
            ActionKind::SelfInjury => {
                let damage = roll(rng, SELF_INJURY);
                let injury = *rng.choose(&INJURIES).unwrap_or(&INJURIES[0]);
                let participant = &mut self.participants[actor_idx];
                participant.add_injury(injury);
                let killed = participant.damage(damage);
                Effect::SelfInjury {
                    actor,
                    injury,
                    damage,
                    killed,
                }
            }
            ActionKind::Alliance => match rng.choose(&targets).copied() {
                Some(partner_idx) => Effect::Alliance {
                    actor,
                    partner: self.participants[partner_idx].player(),
                },
                None => Effect::Hide { actor },
            },
            ActionKind::Hide => Effect::Hide { actor },
        };
        Some(effect)
    }

    /// Apply a special event to every living participant, in roster order.
    pub fn run_special(&mut self, rng: &mut GameRng) -> Vec<SpecialOutcome> {
        let mut outcomes = Vec::new();
        for participant in self.participants.iter_mut().filter(|p| p.is_alive()) {
            let player = participant.player();
            let damage = roll(rng, SPECIAL_DAMAGE);
            if participant.damage(damage) {
                outcomes.push(SpecialOutcome::Died { player, damage });
            } else if rng.coin() {
                outcomes.push(SpecialOutcome::Hurt { player, damage });
            } else {
                let heal = participant.heal(roll(rng, SPECIAL_HEAL));
                outcomes.push(SpecialOutcome::Recovered {
                    player,
                    damage,
                    heal,
                });
            }
        }
        outcomes
    }

    /// Close the current period and move Day to Night or Night to the next Day.
    pub fn end_period(&mut self) {
        self.periods_run += 1;
        match self.period {
            Period::Day => self.period = Period::Night,
            Period::Night => {
                self.period = Period::Day;
                self.day += 1;
            }
        }
    }

    /// Declare the winner. Succeeds once; later calls return [GameError::GameAlreadyComplete].
    ///
    /// The winner is the last participant standing. Otherwise (iteration bound hit, or
    /// everyone died) the highest health wins, ties going to roster order.
    pub fn finish(&mut self) -> Result<Winner, GameError> {
        if self.finished {
            return Err(GameError::GameAlreadyComplete);
        }
        if !self.is_over() {
            return Err(GameError::NotAvailable);
        }
        self.finished = true;

        let alive = self.alive_count();
        let pool: Vec<&ParticipantState> = if alive > 0 {
            self.participants.iter().filter(|p| p.is_alive()).collect()
        } else {
            self.participants.iter().collect()
        };
        // Strict comparison keeps the earliest roster entry on ties
        let mut best = pool[0];
        for candidate in &pool[1..] {
            if candidate.health() > best.health() {
                best = *candidate;
            }
        }
        Ok(Winner {
            player: best.player(),
            health: best.health(),
            last_standing: alive == 1,
        })
    }

    /// Run every remaining period without pauses and declare the winner.
    pub fn run(&mut self, rng: &mut GameRng) -> Result<Winner, GameError> {
        while !self.is_over() {
            match self.plan_period(rng)? {
                PeriodPlan::Special(_) => {
                    self.run_special(rng);
                }
                PeriodPlan::Regular(order) => {
                    for actor in order {
                        self.act(actor, rng);
                    }
                }
            }
            self.end_period();
        }
        self.finish()
    }

    fn index_of(&self, player: &PlayerId) -> Option<usize> {
        self.participants.iter().position(|p| p.player() == *player)
    }
}

fn roll(rng: &mut GameRng, range: RangeInclusive<u8>) -> u8 {
    rng.range(*range.start(), *range.end())
}
