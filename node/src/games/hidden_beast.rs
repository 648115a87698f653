//! Hidden Beast: the social-deduction game.
//!
//! Each round runs the private role actions in a fixed order (Guardian, Detective, Medic,
//! Beast), then a public discussion and a vote. The win check happens at the start of
//! every round, before any action is collected.

use super::SessionContext;
use crate::{
    messenger::{MessageHandle, Narrator},
    phase::{Cancelled, Collector, PhaseEnd, PhaseSpec},
    registry::{Input, InputKind},
};
use async_trait::async_trait;
use shadowspire_execution::games::{
    deduction::{HiddenBeast, HuntOutcome, ScanOutcome, Verdict, VoteOutcome, VoteTally},
    narration::{clue, role_briefing},
};
use shadowspire_types::{
    games::{Phase, Role, VoteChoice},
    Event, PlayerId,
};
use std::time::Duration;
use tracing::{debug, warn};

const RULES: &str = "📜 **How to play**\n\
Each round the special roles act in secret: the Guardian shields someone, the Detective \
studies someone, the Healer may revive the fallen, and the Beast hunts.\n\
Then everyone talks, and the living vote with `!choose <player id>` or `!choose skip`.\n\
Skip wins only if it has strictly more votes than the leading player.\n\
Innocents win when the Beast is gone; the Beast wins once it matches the innocents. \
The Trickster wins alone by getting voted out.";

/// Parse a vote option: `skip`, a bare id, or a mention.
fn parse_vote(option: &str) -> Option<VoteChoice> {
    let option = option.trim();
    if option.eq_ignore_ascii_case("skip") {
        return Some(VoteChoice::Skip);
    }
    let digits = option.trim_start_matches("<@").trim_end_matches('>');
    digits.parse().ok().map(|id| VoteChoice::Target(PlayerId(id)))
}

fn vote_board(tally: &VoteTally, remaining: Duration) -> String {
    let (counts, skips) = tally.counts();
    let mut board = format!(
        "🗳️ **Votes** ({}/{} cast, {}s left)",
        tally.ballots_cast(),
        tally.eligible().len(),
        remaining.as_secs()
    );
    for (player, votes) in counts {
        board.push_str(&format!("\n{player}: {votes}"));
    }
    board.push_str(&format!("\nSkip: {skips}"));
    board
}

fn status_board(game: &HiddenBeast) -> String {
    let alive: Vec<String> = game.alive().iter().map(PlayerId::to_string).collect();
    let mut board = format!("🧾 **Still standing** ({}): {}", alive.len(), alive.join(", "));
    if !game.fallen().is_empty() {
        let fallen: Vec<String> = game
            .fallen()
            .iter()
            .map(|(player, role)| format!("{player} ({role})"))
            .collect();
        board.push_str(&format!("\n🪦 **Fallen**: {}", fallen.join(", ")));
    }
    board
}

const SILENCED: &str =
    "🤫 You have fallen and can no longer speak. Your messages are ignored until the game ends.";

/// Discussion countdown. Chat from fallen players is dropped, and each of them is told
/// so once, at the next tick.
struct Discussion {
    narrator: Narrator,
    countdown: Option<MessageHandle>,
    silenced: Vec<PlayerId>,
    reminded: Vec<PlayerId>,
    unreminded: Vec<PlayerId>,
}

impl Discussion {
    fn new(narrator: Narrator, countdown: Option<MessageHandle>, silenced: Vec<PlayerId>) -> Self {
        Self {
            narrator,
            countdown,
            silenced,
            reminded: Vec::new(),
            unreminded: Vec::new(),
        }
    }

    async fn remind(&mut self) {
        for player in std::mem::take(&mut self.unreminded) {
            self.narrator.whisper_quietly(player, SILENCED).await;
            self.reminded.push(player);
        }
    }
}

#[async_trait]
impl Collector for Discussion {
    type Output = Vec<PlayerId>;

    fn accept(&mut self, input: Input) -> bool {
        let player = input.player;
        if self.silenced.contains(&player)
            && !self.reminded.contains(&player)
            && !self.unreminded.contains(&player)
        {
            debug!(player = %player, "chat from a fallen player dropped");
            self.unreminded.push(player);
        }
        false
    }

    async fn tick(&mut self, remaining: Duration) {
        self.remind().await;
        self.narrator
            .edit(
                self.countdown,
                format!("💬 **Discussion**: {}s left.", remaining.as_secs()),
            )
            .await;
    }

    fn resolve(self, _end: PhaseEnd) -> Vec<PlayerId> {
        self.unreminded
    }
}

/// Shared vote with a live scoreboard. Ends early once every living player voted.
struct Ballots {
    tally: VoteTally,
    narrator: Narrator,
    board: Option<MessageHandle>,
}

#[async_trait]
impl Collector for Ballots {
    type Output = VoteTally;

    fn accept(&mut self, input: Input) -> bool {
        let InputKind::Choice(option) = &input.kind else {
            return false;
        };
        let Some(choice) = parse_vote(option) else {
            return false;
        };
        match self.tally.cast(input.player, choice) {
            Ok(()) => true,
            Err(err) => {
                debug!(player = %input.player, ?err, "ballot rejected");
                false
            }
        }
    }

    fn is_complete(&self) -> bool {
        self.tally.is_complete()
    }

    async fn tick(&mut self, remaining: Duration) {
        self.narrator
            .edit(self.board, vote_board(&self.tally, remaining))
            .await;
    }

    fn resolve(self, _end: PhaseEnd) -> VoteTally {
        self.tally
    }
}

async fn guardian_turn(ctx: &SessionContext, game: &mut HiddenBeast) -> Result<(), Cancelled> {
    let Some(guardian) = game.holder(Role::Guardian) else {
        return Ok(());
    };
    let targets = game.others(&guardian);
    let prompt = "🛡️ Who will you shield from the Beast tonight?";
    if let Some(target) = ctx.ask(guardian, prompt, &targets).await? {
        match game.protect(guardian, target) {
            Ok(()) => {
                ctx.narrator
                    .whisper_quietly(guardian, format!("You keep watch over {target} tonight."))
                    .await
            }
            Err(err) => warn!(?err, "protection refused"),
        }
    }
    Ok(())
}

async fn detective_turn(ctx: &mut SessionContext, game: &mut HiddenBeast) -> Result<(), Cancelled> {
    let Some(detective) = game.holder(Role::Detective) else {
        return Ok(());
    };
    let targets = game.others(&detective);
    let prompt = "🔎 Whose secrets will you study tonight?";
    let Some(target) = ctx.ask(detective, prompt, &targets).await? else {
        return Ok(());
    };
    let report = match game.scan(detective, target) {
        Ok(ScanOutcome::Clue { target, role }) => {
            format!("🔎 You study {target}...\n*{}*", clue(role, &mut ctx.rng))
        }
        Ok(ScanOutcome::LimitReached { target }) => {
            format!("🔎 You have studied {target} enough. Their trail has gone cold.")
        }
        Err(err) => {
            warn!(?err, "scan refused");
            return Ok(());
        }
    };
    ctx.narrator.whisper_quietly(detective, report).await;
    Ok(())
}

async fn medic_turn(ctx: &SessionContext, game: &mut HiddenBeast) -> Result<(), Cancelled> {
    let Some(medic) = game.holder(Role::Medic) else {
        return Ok(());
    };
    let options = game.revive_options();
    if options.is_empty() {
        return Ok(());
    }
    let prompt = "🌿 You may bring one fallen player back. Who will you revive?";
    let Some(target) = ctx.ask(medic, prompt, &options).await? else {
        return Ok(());
    };
    match game.revive(medic, target) {
        Ok(()) => {
            ctx.say(format!("✨ {target} has been pulled back from the brink!"))
                .await;
            let session = ctx.session();
            ctx.emit(Event::ParticipantRevived {
                channel: session.channel(),
                kind: session.kind(),
                player: target,
            });
        }
        Err(err) => warn!(?err, "revive refused"),
    }
    Ok(())
}

async fn beast_turn(ctx: &SessionContext, game: &mut HiddenBeast) -> Result<(), Cancelled> {
    let Some(beast) = game.holder(Role::Beast) else {
        return Ok(());
    };
    let targets = game.others(&beast);
    let prompt = "🐺 Choose your prey.";
    let Some(victim) = ctx.ask(beast, prompt, &targets).await? else {
        ctx.say("🌫️ The night passes quietly. The Beast did not strike.")
            .await;
        return Ok(());
    };
    match game.hunt(beast, victim) {
        Ok(HuntOutcome::Blocked { victim }) => {
            ctx.say(format!(
                "🛡️ Something lunged at {victim} in the dark, but an unseen guardian turned it away."
            ))
            .await;
        }
        Ok(HuntOutcome::Killed { victim, .. }) => {
            ctx.say(format!("🩸 {victim} was found torn apart at dawn."))
                .await;
            ctx.eliminated(victim, None);
        }
        Err(err) => warn!(?err, "hunt refused"),
    }
    Ok(())
}

async fn discussion(ctx: &mut SessionContext, game: &HiddenBeast, round: u32) -> Result<(), Cancelled> {
    let duration = ctx.config.discussion;
    let countdown = ctx
        .say(format!("💬 **Discussion**: {}s left.", duration.as_secs()))
        .await;
    let spec =
        PhaseSpec::new(Phase::Discussion, round, duration).with_tick(ctx.config.countdown_tick);
    let silenced = game
        .roster()
        .iter()
        .filter(|p| game.is_silenced(p))
        .copied()
        .collect();
    let collector = Discussion::new(ctx.narrator.clone(), countdown, silenced);
    for player in ctx.controller.run(spec, collector).await? {
        ctx.narrator.whisper_quietly(player, SILENCED).await;
    }
    ctx.narrator.edit(countdown, "💬 Discussion is over.").await;
    Ok(())
}

async fn vote(ctx: &mut SessionContext, game: &mut HiddenBeast, round: u32) -> Result<(), Cancelled> {
    let duration = ctx.config.vote;
    let tally = game.open_vote();
    let candidates: Vec<String> = tally
        .eligible()
        .iter()
        .map(|p| format!("{p} (`{}`)", p.0))
        .collect();
    ctx.say(format!(
        "🗳️ **Vote!** Candidates: {}. Use `!choose <id>` or `!choose skip`.",
        candidates.join(", ")
    ))
    .await;
    let board = ctx.say(vote_board(&tally, duration)).await;
    let spec = PhaseSpec::new(Phase::Voting, round, duration).with_tick(ctx.config.scoreboard_tick);
    let collector = Ballots {
        tally,
        narrator: ctx.narrator.clone(),
        board,
    };
    let tally = ctx.controller.run(spec, collector).await?;
    ctx.narrator
        .edit(board, vote_board(&tally, Duration::ZERO))
        .await;

    match game.resolve_vote(&tally, &mut ctx.rng) {
        Ok(VoteOutcome::NoVotes) => {
            ctx.say("🤐 Nobody voted. No one is eliminated.").await;
        }
        Ok(VoteOutcome::Skipped { skips, top }) => {
            ctx.say(format!(
                "⏭️ Skip wins ({skips} against {top}). No one is eliminated."
            ))
            .await;
        }
        Ok(VoteOutcome::Eliminated {
            player,
            role,
            votes,
        }) => {
            ctx.say(format!(
                "⚖️ {player} was voted out with {votes} vote(s). They were the **{role}**."
            ))
            .await;
            ctx.eliminated(player, Some(role));
        }
        Err(err) => warn!(?err, "vote could not be applied"),
    }
    Ok(())
}

async fn conclude(ctx: &SessionContext, game: &HiddenBeast, verdict: Verdict) {
    ctx.controller.enter(Phase::Finished, game.round(), None);
    let headline = match &verdict {
        Verdict::Innocents { .. } => "🎉 **The Beast has fallen!** The innocents win.".to_string(),
        Verdict::Beast { .. } => {
            "🐺 **The Beast has taken the spire.** No one is left to stop it.".to_string()
        }
        Verdict::Trickster { player } => {
            format!("🃏 **{player} was the Trickster!** They fooled everyone and win alone.")
        }
    };
    let reveal: Vec<String> = game
        .roles()
        .into_iter()
        .map(|(player, role)| format!("{player}: {role}"))
        .collect();
    ctx.say(format!("{headline}\n**Roles**\n{}", reveal.join("\n")))
        .await;
    ctx.win(verdict.winners(), verdict.reward()).await;
}

pub async fn play(ctx: &mut SessionContext, roster: &[PlayerId]) -> Result<(), Cancelled> {
    let mut game = match HiddenBeast::deal(roster, &mut ctx.rng) {
        Ok(game) => game,
        Err(err) => {
            warn!(?err, "hidden beast could not start");
            ctx.say(format!("Hidden Beast cannot begin: {err}.")).await;
            ctx.lose();
            return Ok(());
        }
    };

    ctx.controller.enter(Phase::Intro, 0, None);
    ctx.say("🌑 **Hidden Beast** begins. Check your private messages for your role.")
        .await;
    for (player, role) in game.roles() {
        ctx.narrator
            .whisper(
                player,
                format!("🎭 Your role is **{role}**.\n{}", role_briefing(role)),
                format!("📪 {player} has private messages closed and could not receive their role."),
            )
            .await;
    }
    ctx.say(RULES).await;
    let rules_delay = ctx.config.rules_delay;
    ctx.pause(rules_delay).await?;

    loop {
        if let Some(verdict) = game.check_winner() {
            conclude(ctx, &game, verdict).await;
            return Ok(());
        }
        let round = match game.begin_round() {
            Ok(round) => round,
            Err(err) => {
                warn!(?err, "round refused");
                return Ok(());
            }
        };
        ctx.controller.enter(Phase::Actions, round, None);
        ctx.say(format!(
            "🌘 **Round {round}.** The night stirs while the special roles act..."
        ))
        .await;
        guardian_turn(ctx, &mut game).await?;
        detective_turn(ctx, &mut game).await?;
        medic_turn(ctx, &mut game).await?;
        beast_turn(ctx, &mut game).await?;

        discussion(ctx, &game, round).await?;
        vote(ctx, &mut game, round).await?;
        ctx.say(status_board(&game)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        games::tests::Harness,
        mocks::{Answer, Record},
        registry::Session,
    };
    use shadowspire_execution::Ledger;
    use shadowspire_types::{
        games::{GameKind, BEAST_REWARD, INNOCENT_REWARD},
        ChannelKey,
    };
    use std::sync::Arc;

    fn roster() -> Vec<PlayerId> {
        (1..=5).map(PlayerId).collect()
    }

    /// Wait until every role briefing went out, then read the roles back.
    async fn dealt_roles(harness: &Harness, players: &[PlayerId]) -> Vec<(PlayerId, Role)> {
        tokio::time::sleep(Duration::from_secs(1)).await;
        players
            .iter()
            .map(|p| {
                let messages = harness.messenger.private_messages(*p);
                let role = Role::SPECIAL
                    .into_iter()
                    .chain([Role::Cookie])
                    .find(|r| messages.iter().any(|m| m.contains(&format!("**{r}**"))))
                    .unwrap();
                (*p, role)
            })
            .collect()
    }

    fn holder(roles: &[(PlayerId, Role)], role: Role) -> PlayerId {
        roles.iter().find(|(_, r)| *r == role).unwrap().0
    }

    #[test]
    fn test_parse_vote() {
        assert_eq!(parse_vote(" SKIP "), Some(VoteChoice::Skip));
        assert_eq!(parse_vote("42"), Some(VoteChoice::Target(PlayerId(42))));
        assert_eq!(parse_vote("<@42>"), Some(VoteChoice::Target(PlayerId(42))));
        assert_eq!(parse_vote("beast"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_beast_reaches_parity() {
        let harness = Harness::new();
        let players = roster();
        let (session, mut ctx) = harness.session(GameKind::HiddenBeast, &players);
        let task = tokio::spawn(async move { play(&mut ctx, &players).await });

        let roles = dealt_roles(&harness, &roster()).await;
        let beast = holder(&roles, Role::Beast);
        harness
            .messenger
            .script(beast, std::iter::repeat(Answer::Index(0)).take(10));

        task.await.unwrap().unwrap();
        assert!(session.is_resolved());
        assert_eq!(harness.ledger.balance(beast).await.unwrap(), BEAST_REWARD);
        assert!(harness.messenger.said(ChannelKey(1), "The Beast has taken the spire"));
        // Nobody voted in any round
        assert!(harness.messenger.said(ChannelKey(1), "Nobody voted"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_voting_out_beast_pays_innocents() {
        let harness = Harness::new();
        let players = roster();
        let (session, mut ctx) = harness.session(GameKind::HiddenBeast, &players);
        let task = tokio::spawn(async move { play(&mut ctx, &players).await });

        let roles = dealt_roles(&harness, &roster()).await;
        let beast = holder(&roles, Role::Beast);
        vote_everyone_for(&session, &roster(), beast).await;

        task.await.unwrap().unwrap();
        for (player, role) in &roles {
            let expected = if *role == Role::Beast { 0 } else { INNOCENT_REWARD };
            assert_eq!(harness.ledger.balance(*player).await.unwrap(), expected);
        }
        assert!(harness.messenger.said(ChannelKey(1), "The Beast has fallen"));
        assert!(harness.messenger.edits() > 0);

        // The round-start check ends the game before anyone is prompted again
        let records = harness.messenger.records();
        let voted_out = records
            .iter()
            .position(|r| matches!(r, Record::Channel { content, .. } if content.contains("was voted out")))
            .unwrap();
        assert!(!records[voted_out..]
            .iter()
            .any(|r| matches!(r, Record::Private { choice: Some(_), .. })));
    }

    /// Once the vote opens, every player votes for `target`.
    async fn vote_everyone_for(session: &Arc<Session>, players: &[PlayerId], target: PlayerId) {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            if session.info().phase == Phase::Voting {
                break;
            }
        }
        for player in players {
            session.send_input(Input::choice(*player, target.0.to_string()));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_dms_narrated_without_role() {
        let harness = Harness::new();
        let players = roster();
        harness.messenger.close_private(PlayerId(3));
        let (session, mut ctx) = harness.session(GameKind::HiddenBeast, &players);
        let task = tokio::spawn(async move { play(&mut ctx, &players).await });

        tokio::time::sleep(Duration::from_secs(1)).await;
        let messages = harness.messenger.channel_messages(ChannelKey(1));
        let notice = messages
            .iter()
            .find(|m| m.contains("could not receive their role"))
            .unwrap();
        for role in Role::SPECIAL {
            assert!(!notice.contains(role.name()));
        }
        session.cancel();
        assert_eq!(task.await.unwrap(), Err(Cancelled));
        assert!(!session.is_resolved());
    }

    #[tokio::test(start_paused = true)]
    async fn test_guardian_blocks_hunt_and_detective_gets_clue() {
        let harness = Harness::new();
        let players = roster();
        let (session, mut ctx) = harness.session(GameKind::HiddenBeast, &players);
        let task = tokio::spawn(async move { play(&mut ctx, &players).await });

        let roles = dealt_roles(&harness, &roster()).await;
        let beast = holder(&roles, Role::Beast);
        let guardian = holder(&roles, Role::Guardian);
        let detective = holder(&roles, Role::Detective);
        let victim = detective;
        let key = |p: PlayerId| Answer::Key(p.0.to_string());
        harness.messenger.script(guardian, [key(victim)]);
        harness.messenger.script(detective, [key(beast)]);
        harness.messenger.script(beast, [key(victim)]);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(harness
            .messenger
            .said(ChannelKey(1), &format!("lunged at {victim} in the dark")));
        assert!(!harness.messenger.said(ChannelKey(1), "torn apart"));
        assert!(harness
            .messenger
            .private_messages(detective)
            .iter()
            .any(|m| m.contains(&format!("You study {beast}"))));
        assert!(harness
            .messenger
            .private_messages(guardian)
            .iter()
            .any(|m| m.contains(&format!("You keep watch over {victim}"))));

        session.cancel();
        assert_eq!(task.await.unwrap(), Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_medic_revives_in_second_round() {
        let harness = Harness::new();
        let players = roster();
        let (session, mut ctx) = harness.session(GameKind::HiddenBeast, &players);
        let mut events = harness.events.subscribe();
        let task = tokio::spawn(async move { play(&mut ctx, &players).await });

        let roles = dealt_roles(&harness, &roster()).await;
        let beast = holder(&roles, Role::Beast);
        let medic = holder(&roles, Role::Medic);
        let victim = holder(&roles, Role::Detective);
        harness
            .messenger
            .script(beast, [Answer::Key(victim.0.to_string())]);
        harness
            .messenger
            .script(medic, [Answer::Key(victim.0.to_string())]);

        let mut revived = false;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_secs(10)).await;
            if harness.messenger.said(ChannelKey(1), "pulled back from the brink") {
                revived = true;
                break;
            }
        }
        assert!(revived);
        assert!(harness.messenger.said(ChannelKey(1), "Round 2"));
        // No revive prompt went out in the first round
        let medic_prompts = harness
            .messenger
            .records()
            .iter()
            .filter(|r| matches!(r, Record::Private { player, choice: Some(_), .. } if *player == medic))
            .count();
        assert_eq!(medic_prompts, 1);

        let mut saw_revive = false;
        while let Ok(event) = events.try_recv() {
            if let Event::ParticipantRevived { player, .. } = event {
                assert_eq!(player, victim);
                saw_revive = true;
            }
        }
        assert!(saw_revive);

        session.cancel();
        assert_eq!(task.await.unwrap(), Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_undeliverable_prompts_stay_private() {
        let harness = Harness::new();
        let players = roster();
        for player in &players {
            harness.messenger.close_private(*player);
        }
        let (session, mut ctx) = harness.session(GameKind::HiddenBeast, &players);
        let task = tokio::spawn(async move { play(&mut ctx, &players).await });

        tokio::time::sleep(Duration::from_secs(30)).await;
        let messages = harness.messenger.channel_messages(ChannelKey(1));
        let round = messages
            .iter()
            .position(|m| m.contains("Round 1"))
            .unwrap();
        let discussion = messages
            .iter()
            .position(|m| m.contains("**Discussion**"))
            .unwrap();
        assert!(round < discussion);
        // Nothing posted during the secret turns names a player
        for message in &messages[round + 1..discussion] {
            assert!(!message.contains("<@"), "{message}");
        }
        assert!(harness.messenger.said(ChannelKey(1), "The Beast did not strike"));

        session.cancel();
        assert_eq!(task.await.unwrap(), Err(Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallen_chat_reminded_once() {
        let messenger = Arc::new(crate::mocks::ScriptedMessenger::new());
        let narrator = Narrator::new(messenger.clone(), ChannelKey(1));
        let fallen = PlayerId(4);
        let mut discussion = Discussion::new(narrator, None, vec![fallen]);

        assert!(!discussion.accept(Input::text(fallen, "it was 2!")));
        assert!(!discussion.accept(Input::text(fallen, "trust me")));
        assert!(!discussion.accept(Input::text(PlayerId(1), "hmm")));
        discussion.tick(Duration::from_secs(30)).await;
        assert!(!discussion.accept(Input::text(fallen, "hello?")));

        assert_eq!(messenger.private_messages(fallen), vec![SILENCED.to_string()]);
        assert!(messenger.private_messages(PlayerId(1)).is_empty());
        assert!(discussion.resolve(PhaseEnd::Elapsed).is_empty());
    }
}
