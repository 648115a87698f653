//! Flavor text.
//!
//! Game state machines report effects; this module turns them into chat lines. Nothing
//! in here mutates a game, so tests of game behavior never depend on these strings.
//! Templates use `{a}`, `{b}`, `{dmg}`, `{heal}`, `{injury}` and `{phase}` placeholders.

use super::{
    elimination::{Effect, Period, SpecialKind, SpecialOutcome},
    GameRng,
};
use shadowspire_types::games::Role;

const ATTACK: [&str; 6] = [
    "{a} ambushes {b} from behind a broken pillar, dealing {dmg} damage.",
    "{a} lunges at {b} and lands a blow worth {dmg}.",
    "The host leans forward, delighted, as {a} strikes {b} for {dmg}.",
    "{a} corners {b} and does not hold back. {dmg} damage.",
    "{b} never saw {a} coming. {dmg} damage.",
    "{a} and {b} collide in the dark; {b} comes off worse by {dmg}.",
];

const HEAL: [&str; 5] = [
    "{a} patches up their wounds and recovers {heal} health.",
    "{a} finds a quiet corner and catches their breath (+{heal}).",
    "A strange warmth settles over {a}, restoring {heal} health.",
    "{a} improvises a bandage. It holds, for now (+{heal}).",
    "The host allows {a} a moment of mercy: {heal} health restored.",
];

const SELF_INJURY: [&str; 5] = [
    "{a} slips on loose rubble and ends up with a {injury} (-{dmg}).",
    "{a} fumbles their gear and earns a {injury}, losing {dmg} health.",
    "Nobody touched {a}, yet somehow they have a {injury} now (-{dmg}).",
    "{a} misjudges a jump. {injury}, {dmg} damage.",
    "{a} tries to look tough and gets a {injury} for it (-{dmg}).",
];

const KILL: [&str; 5] = [
    "{a} collapses and does not get up again.",
    "{a} takes their final breath.",
    "The host steps over {a} without a second glance.",
    "{a} fades away. Their story ends here.",
    "{a} falls still, and the spire grows a little quieter.",
];

const ALLIANCE: [&str; 5] = [
    "{a} and {b} agree to watch each other's backs this {phase}. Trust is thin.",
    "{a} teams up with {b} for the {phase}. How long until betrayal?",
    "{a} and {b} huddle together through the {phase}.",
    "{a} offers {b} a shaky truce for the {phase}.",
    "Survival makes odd companions: {a} and {b} join forces this {phase}.",
];

const HIDE: [&str; 5] = [
    "{a} melts into the shadows for the {phase}.",
    "{a} stays low and avoids trouble this {phase}.",
    "{a} curls into the darkest corner they can find during the {phase}.",
    "{a} hides behind the debris all {phase} long.",
    "{a} thinks nobody sees them this {phase}. The host does.",
];

const ENDINGS: [&str; 5] = [
    "A dark laugh echoes through the empty arena.",
    "Another day, another show.",
    "The dust settles, but the screams linger.",
    "The host applauds slowly. What a performance.",
    "Only silence remains, and the winner's trembling breath.",
];

/// Replace every `{key}` in `template` with its value.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("{{{key}}}"), value);
    }
    out
}

fn pick(rng: &mut GameRng, table: &[&'static str]) -> &'static str {
    rng.choose(table).copied().unwrap_or_default()
}

/// Lines for one actor's effect: the action itself, then a death line if it killed.
pub fn effect_lines(effect: &Effect, period: Period, rng: &mut GameRng) -> Vec<String> {
    let phase = period.to_string();
    let mut lines = Vec::with_capacity(2);
    match effect {
        Effect::Attack {
            actor,
            target,
            damage,
            killed,
            ..
        } => {
            lines.push(render(
                pick(rng, &ATTACK),
                &[
                    ("a", actor.to_string()),
                    ("b", target.to_string()),
                    ("dmg", damage.to_string()),
                ],
            ));
            if *killed {
                lines.push(render(pick(rng, &KILL), &[("a", target.to_string())]));
            }
        }
        Effect::Heal { actor, amount } => lines.push(render(
            pick(rng, &HEAL),
            &[("a", actor.to_string()), ("heal", amount.to_string())],
        )),
        Effect::SelfInjury {
            actor,
            injury,
            damage,
            killed,
        } => {
            if *killed {
                lines.push(render(pick(rng, &KILL), &[("a", actor.to_string())]));
            } else {
                lines.push(render(
                    pick(rng, &SELF_INJURY),
                    &[
                        ("a", actor.to_string()),
                        ("injury", injury.to_string()),
                        ("dmg", damage.to_string()),
                    ],
                ));
            }
        }
        Effect::Alliance { actor, partner } => lines.push(render(
            pick(rng, &ALLIANCE),
            &[
                ("a", actor.to_string()),
                ("b", partner.to_string()),
                ("phase", phase),
            ],
        )),
        Effect::Hide { actor } => lines.push(render(
            pick(rng, &HIDE),
            &[("a", actor.to_string()), ("phase", phase)],
        )),
    }
    lines
}

/// Headline announcing a special event.
pub fn special_intro(kind: SpecialKind) -> &'static str {
    match kind {
        SpecialKind::HalloweenNight => {
            "🎃 Halloween Night! The arena twists into a nightmare of shrieks and laughter."
        }
        SpecialKind::BloodRain => "🌧️ Blood Rain! A crimson storm pours over the spire.",
        SpecialKind::MadFeast => "🍖 Mad Feast! The survivors are lured to a cursed banquet.",
        SpecialKind::ShadowStorm => "🌪️ Shadow Storm! Dark winds tear through the spire.",
        SpecialKind::VoidReckoning => {
            "⚫ The Void Reckoning! The ground cracks open and the void calls for sacrifices."
        }
    }
}

fn special_tables(kind: SpecialKind) -> [&'static [&'static str]; 3] {
    match kind {
        SpecialKind::HalloweenNight => [
            &[
                "{a} wandered too deep into the laughing shadows and vanished.",
                "A grinning shadow figure embraced {a}. It was the last thing they saw.",
            ],
            &[
                "A shadow claw scraped {a}'s back (-{dmg}).",
                "{a} tripped over a cursed pumpkin (-{dmg}).",
            ],
            &[
                "{a} took {dmg} from the shadows, then found a blessed candle (+{heal}).",
                "Friendly bats carried {a} to safety after a {dmg} scrape (+{heal}).",
            ],
        ],
        SpecialKind::BloodRain => [
            &[
                "{a} melted under the burning rain.",
                "{a} slipped in the flood and was pulled under.",
            ],
            &[
                "The rain singed {a} (-{dmg}).",
                "{a} found half a roof; the rain burned through it (-{dmg}).",
            ],
            &[
                "{a} lost {dmg} to the rain, then found a blessed umbrella (+{heal}).",
                "{a} reached dry ground after losing {dmg} (+{heal}).",
            ],
        ],
        SpecialKind::MadFeast => [
            &[
                "{a} ate something that wriggled back, and collapsed.",
                "{a} drank the wrong wine.",
            ],
            &[
                "The feast table tried to bite {a} (-{dmg}).",
                "{a} bit into a spiked pastry (-{dmg}).",
            ],
            &[
                "{a} shrugged off {dmg} from a cursed dish, then found a harmless dessert (+{heal}).",
                "A warm loaf revived {a} after a {dmg} bite (+{heal}).",
            ],
        ],
        SpecialKind::ShadowStorm => [
            &[
                "{a} was lifted into the storm and never came down.",
                "A shadow tornado shredded {a}.",
            ],
            &[
                "The wind slammed {a} into a wall (-{dmg}).",
                "A flying crate hit {a} (-{dmg}).",
            ],
            &[
                "{a} took {dmg} from the storm, then found a pocket of calm (+{heal}).",
                "{a} lost {dmg} but found a sheltered nook (+{heal}).",
            ],
        ],
        SpecialKind::VoidReckoning => [
            &[
                "{a} was pulled screaming into the void.",
                "The void swallowed {a} without hesitation.",
            ],
            &[
                "The void tugged at {a}'s soul (-{dmg}).",
                "A rift snapped shut on {a} (-{dmg}).",
            ],
            &[
                "{a} nearly fell in (-{dmg}) but stepped back to safety (+{heal}).",
                "{a} found footing in the dark after losing {dmg} (+{heal}).",
            ],
        ],
    }
}

/// One participant's line for a special event.
pub fn special_line(kind: SpecialKind, outcome: &SpecialOutcome, rng: &mut GameRng) -> String {
    let [died, hurt, recovered] = special_tables(kind);
    match outcome {
        SpecialOutcome::Died { player, damage } => render(
            pick(rng, died),
            &[("a", player.to_string()), ("dmg", damage.to_string())],
        ),
        SpecialOutcome::Hurt { player, damage } => render(
            pick(rng, hurt),
            &[("a", player.to_string()), ("dmg", damage.to_string())],
        ),
        SpecialOutcome::Recovered {
            player,
            damage,
            heal,
        } => render(
            pick(rng, recovered),
            &[
                ("a", player.to_string()),
                ("dmg", damage.to_string()),
                ("heal", heal.to_string()),
            ],
        ),
    }
}

pub fn massacre_ending(rng: &mut GameRng) -> &'static str {
    pick(rng, &ENDINGS)
}

/// Riddle the Detective receives about a scanned player's role.
pub fn clue(role: Role, rng: &mut GameRng) -> &'static str {
    let table: &[&'static str] = match role {
        Role::Cookie => &[
            "Only crumbs and whispers. Too plain to hide secrets.",
            "Their aura is sweet and ordinary.",
            "Nothing but dough and innocence. Or is it?",
        ],
        Role::Medic => &[
            "You catch the scent of herbs and bandages.",
            "Soft hands that have stitched fate before.",
            "They carry the calm of someone who has seen too much pain.",
        ],
        Role::Guardian => &[
            "A shimmer like invisible armor surrounds them.",
            "The wind bends away from them.",
            "A silent watcher bound by quiet vows.",
        ],
        Role::Trickster => &[
            "The air hums with resentment behind their laughter.",
            "A grin flickers behind polite words.",
            "They smile as if they already know how this ends.",
        ],
        Role::Beast => &[
            "Something moves where no shadow should.",
            "A heartbeat heavier than most. Hunger dressed as calm.",
            "The moon seems to favor them. You dare not meet their eyes.",
        ],
        Role::Detective => &["Their gaze mirrors your own."],
    };
    pick(rng, table)
}

/// Private briefing sent with a role.
pub fn role_briefing(role: Role) -> &'static str {
    match role {
        Role::Detective => "Each round you may scan one player for a clue about their role.",
        Role::Medic => "From the second round on you may revive one fallen player.",
        Role::Trickster => "You win alone if the others vote you out.",
        Role::Guardian => "Each round you may shield one player from the Beast.",
        Role::Beast => "Each round you hunt one player. Survive until you match the innocents.",
        Role::Cookie => "Find the Beast and vote it out.",
    }
}
