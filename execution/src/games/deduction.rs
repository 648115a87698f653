//! Hidden Beast: social deduction.
//!
//! A round runs Guardian, Detective, Medic and Beast actions in that order, then
//! discussion and a vote. Win conditions are checked at the start of every round
//! ([HiddenBeast::check_winner]) before any action runs, and the Trickster's win is
//! decided by the vote itself.

use super::{dedupe, GameError, GameRng};
use shadowspire_types::{
    games::{
        Role, VoteChoice, BEAST_REWARD, HIDDEN_BEAST_MAX_PARTICIPANTS,
        HIDDEN_BEAST_MIN_PARTICIPANTS, INNOCENT_REWARD, MAX_SCANS_PER_TARGET, TRICKSTER_REWARD,
    },
    PlayerId,
};
use std::collections::{BTreeMap, HashMap};

/// Terminal outcome of a game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// The Beast is gone. Every non-Beast participant, living or fallen, wins.
    Innocents { winners: Vec<PlayerId> },
    /// The Beasts reached parity with the innocents.
    Beast { winners: Vec<PlayerId> },
    /// The Trickster was voted out.
    Trickster { player: PlayerId },
}

impl Verdict {
    pub fn winners(&self) -> Vec<PlayerId> {
        match self {
            Verdict::Innocents { winners } | Verdict::Beast { winners } => winners.clone(),
            Verdict::Trickster { player } => vec![*player],
        }
    }

    /// Reward paid to each winner.
    pub fn reward(&self) -> u64 {
        match self {
            Verdict::Innocents { .. } => INNOCENT_REWARD,
            Verdict::Beast { .. } => BEAST_REWARD,
            Verdict::Trickster { .. } => TRICKSTER_REWARD,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The Detective learns a clue about `role`.
    Clue { target: PlayerId, role: Role },
    /// This target was already scanned the maximum number of times.
    LimitReached { target: PlayerId },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HuntOutcome {
    /// The Guardian shielded the victim.
    Blocked { victim: PlayerId },
    Killed { victim: PlayerId, role: Role },
}

/// Result of closing a vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TallyResult {
    /// Nobody voted.
    NoVotes,
    /// Skip strictly outnumbered the leading candidate (or every ballot was a skip).
    Skipped { skips: usize, top: usize },
    /// `target` had the most votes; `tied` lists every candidate sharing that count.
    Elected {
        target: PlayerId,
        votes: usize,
        tied: Vec<PlayerId>,
    },
}

/// Ballots of one voting round. Later ballots overwrite earlier ones.
#[derive(Clone, Debug)]
pub struct VoteTally {
    /// Living players, who are both the voters and the candidates.
    eligible: Vec<PlayerId>,
    ballots: HashMap<PlayerId, VoteChoice>,
}

impl VoteTally {
    pub fn new(eligible: Vec<PlayerId>) -> Self {
        Self {
            eligible,
            ballots: HashMap::new(),
        }
    }

    pub fn eligible(&self) -> &[PlayerId] {
        &self.eligible
    }

    /// Record (or replace) a ballot.
    pub fn cast(&mut self, voter: PlayerId, choice: VoteChoice) -> Result<(), GameError> {
        if !self.eligible.contains(&voter) {
            return Err(GameError::NotParticipant(voter));
        }
        if let VoteChoice::Target(target) = choice {
            if !self.eligible.contains(&target) {
                return Err(GameError::InvalidTarget(target));
            }
        }
        self.ballots.insert(voter, choice);
        Ok(())
    }

    pub fn ballot(&self, voter: &PlayerId) -> Option<VoteChoice> {
        self.ballots.get(voter).copied()
    }

    pub fn ballots_cast(&self) -> usize {
        self.ballots.len()
    }

    /// Every eligible voter has a ballot.
    pub fn is_complete(&self) -> bool {
        self.ballots.len() == self.eligible.len()
    }

    /// Votes per candidate in eligible order, and the skip count.
    pub fn counts(&self) -> (Vec<(PlayerId, usize)>, usize) {
        let mut per_target: BTreeMap<PlayerId, usize> = BTreeMap::new();
        let mut skips = 0;
        for choice in self.ballots.values() {
            match choice {
                VoteChoice::Target(target) => *per_target.entry(*target).or_default() += 1,
                VoteChoice::Skip => skips += 1,
            }
        }
        let counts = self
            .eligible
            .iter()
            .map(|p| (*p, per_target.get(p).copied().unwrap_or(0)))
            .collect();
        (counts, skips)
    }

    /// Close the vote. Ties among the leaders are broken uniformly at random.
    pub fn resolve(&self, rng: &mut GameRng) -> TallyResult {
        if self.ballots.is_empty() {
            return TallyResult::NoVotes;
        }
        let (counts, skips) = self.counts();
        let top = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
        if top == 0 || skips > top {
            return TallyResult::Skipped { skips, top };
        }
        let tied: Vec<PlayerId> = counts
            .iter()
            .filter(|(_, n)| *n == top)
            .map(|(p, _)| *p)
            .collect();
        let target = tied[rng.next_bounded(tied.len())];
        TallyResult::Elected {
            target,
            votes: top,
            tied,
        }
    }
}

/// Outcome of a vote applied to the game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    NoVotes,
    Skipped { skips: usize, top: usize },
    Eliminated { player: PlayerId, role: Role, votes: usize },
}

pub struct HiddenBeast {
    /// Dealing order; also the display order for alive and fallen lists.
    roster: Vec<PlayerId>,
    roles: HashMap<PlayerId, Role>,
    alive: Vec<PlayerId>,
    /// Fallen players with the role they held when eliminated, in elimination order.
    fallen: Vec<(PlayerId, Role)>,
    /// Scans per target by the Detective.
    scans: HashMap<PlayerId, u8>,
    round: u32,
    protected: Option<PlayerId>,
    verdict: Option<Verdict>,
}

impl HiddenBeast {
    /// Shuffle the roster and deal roles: the first five get the special roles, the rest
    /// are Cookies.
    pub fn deal(players: &[PlayerId], rng: &mut GameRng) -> Result<Self, GameError> {
        let mut roster = dedupe(players);
        if roster.len() < HIDDEN_BEAST_MIN_PARTICIPANTS {
            return Err(GameError::InsufficientParticipants {
                min: HIDDEN_BEAST_MIN_PARTICIPANTS,
                got: roster.len(),
            });
        }
        if roster.len() > HIDDEN_BEAST_MAX_PARTICIPANTS {
            return Err(GameError::TooManyParticipants {
                max: HIDDEN_BEAST_MAX_PARTICIPANTS,
                got: roster.len(),
            });
        }
        rng.shuffle(&mut roster);
        let roles = roster
            .iter()
            .enumerate()
            .map(|(idx, player)| {
                let role = Role::SPECIAL.get(idx).copied().unwrap_or(Role::Cookie);
                (*player, role)
            })
            .collect();
        Ok(Self {
            alive: roster.clone(),
            roster,
            roles,
            fallen: Vec::new(),
            scans: HashMap::new(),
            round: 0,
            protected: None,
            verdict: None,
        })
    }

    /// Players with their current role, in dealing order.
    pub fn roles(&self) -> Vec<(PlayerId, Role)> {
        self.roster
            .iter()
            .filter_map(|p| self.roles.get(p).map(|r| (*p, *r)))
            .collect()
    }

    pub fn role_of(&self, player: &PlayerId) -> Option<Role> {
        self.roles.get(player).copied()
    }

    pub fn roster(&self) -> &[PlayerId] {
        &self.roster
    }

    pub fn alive(&self) -> &[PlayerId] {
        &self.alive
    }

    pub fn fallen(&self) -> &[(PlayerId, Role)] {
        &self.fallen
    }

    pub fn is_alive(&self, player: &PlayerId) -> bool {
        self.alive.contains(player)
    }

    /// Fallen participants may not speak in the game channel.
    pub fn is_silenced(&self, player: &PlayerId) -> bool {
        self.roles.contains_key(player) && !self.is_alive(player)
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn verdict(&self) -> Option<&Verdict> {
        self.verdict.as_ref()
    }

    /// Living holder of `role`.
    pub fn holder(&self, role: Role) -> Option<PlayerId> {
        self.alive
            .iter()
            .find(|p| self.roles.get(p) == Some(&role))
            .copied()
    }

    /// Round-start win check. Once a verdict exists it is returned unchanged.
    pub fn check_winner(&mut self) -> Option<Verdict> {
        if let Some(verdict) = &self.verdict {
            return Some(verdict.clone());
        }
        let beasts: Vec<PlayerId> = self
            .alive
            .iter()
            .filter(|p| self.role_of(p) == Some(Role::Beast))
            .copied()
            .collect();
        let innocents = self.alive.len() - beasts.len();

        let verdict = if beasts.is_empty() {
            let winners = self
                .roster
                .iter()
                .filter(|p| match self.fallen_role(p) {
                    Some(role) => !role.is_antagonist(),
                    None => self.role_of(p).is_some_and(|r| !r.is_antagonist()),
                })
                .copied()
                .collect();
            Verdict::Innocents { winners }
        } else if beasts.len() >= innocents {
            Verdict::Beast { winners: beasts }
        } else {
            return None;
        };
        self.verdict = Some(verdict.clone());
        Some(verdict)
    }

    /// Begin the next round and clear last round's protection.
    pub fn begin_round(&mut self) -> Result<u32, GameError> {
        if self.verdict.is_some() {
            return Err(GameError::GameAlreadyComplete);
        }
        self.round += 1;
        self.protected = None;
        Ok(self.round)
    }

    /// Living players other than `actor`.
    pub fn others(&self, actor: &PlayerId) -> Vec<PlayerId> {
        self.alive.iter().filter(|p| *p != actor).copied().collect()
    }

    /// Shield `target` from this round's hunt.
    pub fn protect(&mut self, guardian: PlayerId, target: PlayerId) -> Result<(), GameError> {
        self.require_actor(&guardian, Role::Guardian)?;
        if target == guardian || !self.is_alive(&target) {
            return Err(GameError::InvalidTarget(target));
        }
        self.protected = Some(target);
        Ok(())
    }

    pub fn protected(&self) -> Option<PlayerId> {
        self.protected
    }

    /// Scan `target` for a clue. Each target may be scanned at most
    /// [MAX_SCANS_PER_TARGET] times per game.
    pub fn scan(&mut self, detective: PlayerId, target: PlayerId) -> Result<ScanOutcome, GameError> {
        self.require_actor(&detective, Role::Detective)?;
        if target == detective || !self.is_alive(&target) {
            return Err(GameError::InvalidTarget(target));
        }
        let count = self.scans.entry(target).or_default();
        if *count >= MAX_SCANS_PER_TARGET {
            return Ok(ScanOutcome::LimitReached { target });
        }
        *count += 1;
        let role = self.role_of(&target).unwrap_or(Role::Cookie);
        Ok(ScanOutcome::Clue { target, role })
    }

    /// Fallen players the Medic may revive this round. Empty on round one.
    pub fn revive_options(&self) -> Vec<PlayerId> {
        if self.round <= 1 {
            return Vec::new();
        }
        self.fallen.iter().map(|(p, _)| *p).collect()
    }

    /// Bring a fallen player back as a Cookie.
    pub fn revive(&mut self, medic: PlayerId, target: PlayerId) -> Result<(), GameError> {
        self.require_actor(&medic, Role::Medic)?;
        if self.round <= 1 {
            return Err(GameError::NotAvailable);
        }
        let idx = self
            .fallen
            .iter()
            .position(|(p, _)| *p == target)
            .ok_or(GameError::InvalidTarget(target))?;
        self.fallen.remove(idx);
        self.roles.insert(target, Role::Cookie);
        self.alive.push(target);
        let order = &self.roster;
        self.alive
            .sort_by_key(|p| order.iter().position(|r| r == p).unwrap_or(usize::MAX));
        Ok(())
    }

    /// The Beast attacks `victim`.
    pub fn hunt(&mut self, beast: PlayerId, victim: PlayerId) -> Result<HuntOutcome, GameError> {
        self.require_actor(&beast, Role::Beast)?;
        if victim == beast || !self.is_alive(&victim) {
            return Err(GameError::InvalidTarget(victim));
        }
        if self.protected == Some(victim) {
            return Ok(HuntOutcome::Blocked { victim });
        }
        let role = self.eliminate(victim);
        Ok(HuntOutcome::Killed { victim, role })
    }

    /// Open a vote among the living.
    pub fn open_vote(&self) -> VoteTally {
        VoteTally::new(self.alive.clone())
    }

    /// Close a vote and apply it. Voting out the Trickster ends the game.
    pub fn resolve_vote(
        &mut self,
        tally: &VoteTally,
        rng: &mut GameRng,
    ) -> Result<VoteOutcome, GameError> {
        if self.verdict.is_some() {
            return Err(GameError::GameAlreadyComplete);
        }
        match tally.resolve(rng) {
            TallyResult::NoVotes => Ok(VoteOutcome::NoVotes),
            TallyResult::Skipped { skips, top } => Ok(VoteOutcome::Skipped { skips, top }),
            TallyResult::Elected { target, votes, .. } => {
                if !self.is_alive(&target) {
                    return Err(GameError::InvalidTarget(target));
                }
                let role = self.eliminate(target);
                if role == Role::Trickster {
                    self.verdict = Some(Verdict::Trickster { player: target });
                }
                Ok(VoteOutcome::Eliminated {
                    player: target,
                    role,
                    votes,
                })
            }
        }
    }

    fn eliminate(&mut self, player: PlayerId) -> Role {
        self.alive.retain(|p| *p != player);
        let role = self.role_of(&player).unwrap_or(Role::Cookie);
        self.fallen.push((player, role));
        role
    }

    fn fallen_role(&self, player: &PlayerId) -> Option<Role> {
        self.fallen
            .iter()
            .find(|(p, _)| p == player)
            .map(|(_, role)| *role)
    }

    fn require_actor(&self, actor: &PlayerId, role: Role) -> Result<(), GameError> {
        if self.verdict.is_some() {
            return Err(GameError::GameAlreadyComplete);
        }
        if !self.roles.contains_key(actor) {
            return Err(GameError::NotParticipant(*actor));
        }
        if !self.is_alive(actor) || self.role_of(actor) != Some(role) {
            return Err(GameError::WrongRole(*actor));
        }
        Ok(())
    }
}
