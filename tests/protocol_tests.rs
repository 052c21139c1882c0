#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! Wire-format tests against frames as the game server emits them.

use knowledge_battle_client::protocol::{ConnectPayload, Player, Question};
use knowledge_battle_client::{ClientMessage, ServerMessage, TriviaError};

// ════════════════════════════════════════════════════════════════════
// Inbound fixtures
// ════════════════════════════════════════════════════════════════════

#[test]
fn parses_a_full_match_transcript() {
    let transcript = [
        r#"{"event":"connect","data":{"id":"x8WIv7-mJelg7on_ALbx"}}"#,
        r#"{"event":"game_start","data":[{"id":"x8WIv7-mJelg7on_ALbx","score":0},{"id":"Qk3n0sTqA1","score":0}]}"#,
        r#"{"event":"new-question","data":{"question":"Capital of France?","options":["Paris","Rome","Madrid","Berlin"]}}"#,
        r#"{"event":"point_awarded"}"#,
        r#"{"event":"score_update","data":[{"id":"x8WIv7-mJelg7on_ALbx","score":1},{"id":"Qk3n0sTqA1","score":0}]}"#,
        r#"{"event":"wrong_answer"}"#,
        r#"{"event":"game_over","data":"x8WIv7-mJelg7on_ALbx"}"#,
    ];

    let parsed: Vec<ServerMessage> = transcript
        .iter()
        .map(|frame| serde_json::from_str(frame).unwrap())
        .collect();

    assert_eq!(
        parsed[0],
        ServerMessage::Connect(ConnectPayload {
            id: "x8WIv7-mJelg7on_ALbx".into()
        })
    );
    assert!(matches!(&parsed[1], ServerMessage::GameStart(players) if players.len() == 2));
    assert_eq!(
        parsed[2],
        ServerMessage::NewQuestion(Question::new(
            "Capital of France?",
            ["Paris", "Rome", "Madrid", "Berlin"]
        ))
    );
    assert_eq!(parsed[3], ServerMessage::PointAwarded);
    assert!(matches!(&parsed[4], ServerMessage::ScoreUpdate(players) if players[0].score == 1));
    assert_eq!(parsed[5], ServerMessage::WrongAnswer);
    assert_eq!(
        parsed[6],
        ServerMessage::GameOver("x8WIv7-mJelg7on_ALbx".into())
    );
    assert!(parsed.iter().all(|msg| msg.validate().is_ok()));
}

#[test]
fn unknown_event_is_rejected() {
    let err = serde_json::from_str::<ServerMessage>(r#"{"event":"chat","data":"hi"}"#);
    assert!(err.is_err());
}

#[test]
fn explicit_null_data_on_unit_event_is_accepted() {
    let msg: ServerMessage =
        serde_json::from_str(r#"{"event":"wrong_answer","data":null}"#).unwrap();
    assert_eq!(msg, ServerMessage::WrongAnswer);
}

#[test]
fn extra_player_fields_are_ignored() {
    let frame = r#"{"event":"score_update","data":[{"id":"A","score":2,"name":"Ann"}]}"#;
    let msg: ServerMessage = serde_json::from_str(frame).unwrap();
    assert_eq!(msg, ServerMessage::ScoreUpdate(vec![Player::new("A", 2)]));
}

#[test]
fn parsed_but_unusable_payloads_fail_validation() {
    let frames = [
        r#"{"event":"new-question","data":{"question":"?","options":[]}}"#,
        r#"{"event":"game_start","data":[{"id":"A","score":0},{"id":"A","score":0}]}"#,
        r#"{"event":"game_over","data":""}"#,
        r#"{"event":"connect","data":{"id":""}}"#,
    ];
    for frame in frames {
        let msg: ServerMessage = serde_json::from_str(frame).unwrap();
        assert!(
            matches!(msg.validate(), Err(TriviaError::InvalidPayload(_))),
            "{frame} should fail validation"
        );
    }
}

// ════════════════════════════════════════════════════════════════════
// Outbound frames
// ════════════════════════════════════════════════════════════════════

#[test]
fn outbound_frames_match_server_expectations() {
    let cases = [
        (ClientMessage::JoinGame, r#"{"event":"join_game"}"#),
        (
            ClientMessage::SubmitAnswer("Paris".into()),
            r#"{"event":"submit_answer","data":"Paris"}"#,
        ),
        (ClientMessage::RestartGame, r#"{"event":"restart_game"}"#),
    ];
    for (msg, expected) in cases {
        assert_eq!(serde_json::to_string(&msg).unwrap(), expected);
        assert_eq!(msg.name(), serde_json::from_str::<serde_json::Value>(expected).unwrap()["event"]);
    }
}
