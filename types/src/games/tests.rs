use super::*;
use crate::{ChannelKey, Event, PlayerId};

#[test]
fn test_game_kind_parse() {
    for kind in GameKind::ALL {
        assert_eq!(kind.as_str().parse::<GameKind>(), Ok(kind));
    }
    assert_eq!("  BINGO ".parse::<GameKind>(), Ok(GameKind::Bingo));
    assert!("poker".parse::<GameKind>().is_err());
}

#[test]
fn test_participant_damage_kills_once() {
    let mut participant = ParticipantState::new(PlayerId(1));
    assert!(!participant.damage(60));
    assert_eq!(participant.health(), 40);
    assert!(participant.is_alive());

    // Overkill saturates and reports the kill
    assert!(participant.damage(55));
    assert_eq!(participant.health(), 0);
    assert!(!participant.is_alive());

    // Further damage does not report a second death
    assert!(!participant.damage(10));
    assert_eq!(participant.health(), 0);
}

#[test]
fn test_participant_heal_clamped() {
    let mut participant = ParticipantState::new(PlayerId(1));
    assert_eq!(participant.heal(25), 0);
    assert_eq!(participant.health(), MAX_HEALTH);

    participant.damage(30);
    assert_eq!(participant.heal(50), 30);
    assert_eq!(participant.health(), MAX_HEALTH);

    participant.damage(MAX_HEALTH);
    assert_eq!(participant.heal(50), 0);
    assert!(!participant.is_alive());
}

#[test]
fn test_session_participants_unique() {
    let mut info = SessionInfo::new(
        ChannelKey(7),
        GameKind::Massacre,
        PlayerId(1),
        vec![PlayerId(2), PlayerId(2), PlayerId(3)],
        0,
    );
    assert_eq!(info.participants, vec![PlayerId(2), PlayerId(3)]);
    assert!(!info.add_participant(PlayerId(3)));
    assert!(info.add_participant(PlayerId(4)));
    assert!(info.remove_participant(&PlayerId(2)));
    assert!(!info.remove_participant(&PlayerId(2)));
    assert_eq!(info.participants, vec![PlayerId(3), PlayerId(4)]);
    assert!(info.is_host(&PlayerId(1)));
    assert_eq!(info.phase, Phase::Lobby);
}

#[test]
fn test_event_serialization_tagged() {
    let event = Event::GameWon {
        channel: ChannelKey(9),
        kind: GameKind::HiddenBeast,
        winners: vec![PlayerId(4)],
        reward: TRICKSTER_REWARD,
    };
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["type"], "game_won");
    assert_eq!(json["kind"], "hidden_beast");
    assert_eq!(json["winners"][0], 4);
    assert_eq!(event.channel(), ChannelKey(9));
}

#[test]
fn test_role_dealing_order() {
    assert_eq!(Role::SPECIAL.len(), HIDDEN_BEAST_MIN_PARTICIPANTS);
    assert_eq!(
        Role::SPECIAL.iter().filter(|r| r.is_antagonist()).count(),
        1
    );
    assert!(!Role::SPECIAL.contains(&Role::Cookie));
}
