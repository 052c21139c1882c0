#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! End-to-end session tests for the Knowledge Battle client.
//!
//! Each test drives a real `ConnectionProvider` and `GameSession` over an
//! in-process loopback transport, playing the server's part by hand.

mod common;

use std::time::Duration;

use knowledge_battle_client::view::{Body, QuestionPanel};
use knowledge_battle_client::{
    ClientMessage, ConnectionProvider, ConnectionStatus, Feedback, GameSession, GameStatus,
    LobbyInput, ServerMessage, TriviaConfig, TriviaError,
};
use tokio::time::Instant;

use common::{connect, roster, start_session, two_plus_two, StuckTransport};

// ════════════════════════════════════════════════════════════════════
// Connection and matchmaking
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn connect_captures_identity_and_joins() {
    let (mut provider, mut session, mut server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    assert!(session.next_update().await);

    assert_eq!(session.state().self_id(), Some("A"));
    assert_eq!(session.state().connection(), &ConnectionStatus::Connected);
    assert_eq!(server.next_from_client().await, ClientMessage::JoinGame);
    assert_eq!(
        provider.connection().connection_id().await.as_deref(),
        Some("A")
    );

    provider.shutdown().await;
}

#[tokio::test]
async fn tied_roster_shows_self_first() {
    let (mut provider, mut session, server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("B", 0)])));
    assert!(session.next_update().await);
    assert!(session.next_update().await);

    assert_eq!(session.state().status(), GameStatus::Playing);
    let screen = session.screen(&LobbyInput::default());
    let Body::Playing { scoreboard, panel } = screen.body else {
        panic!("expected the playing screen");
    };
    assert_eq!(scoreboard.rows[0].label, "You");
    assert_eq!(scoreboard.rows[1].label, "Opponent");
    assert_eq!(panel, QuestionPanel::Waiting);

    provider.shutdown().await;
}

#[tokio::test]
async fn roster_follows_latest_score_update() {
    let (mut provider, mut session, server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("B", 0)])));
    server.push(&ServerMessage::ScoreUpdate(roster(&[("A", 1), ("B", 0)])));
    server.push(&ServerMessage::ScoreUpdate(roster(&[("A", 1), ("B", 3)])));
    for _ in 0..4 {
        assert!(session.next_update().await);
    }

    let screen = session.screen(&LobbyInput::default());
    let Body::Playing { scoreboard, .. } = screen.body else {
        panic!("expected the playing screen");
    };
    let ranked: Vec<(&str, u32)> = scoreboard
        .rows
        .iter()
        .map(|row| (row.label, row.score))
        .collect();
    assert_eq!(ranked, vec![("Opponent", 3), ("You", 1)]);

    provider.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Loading indicator
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn loading_indicator_appears_after_delay() {
    let (mut provider, mut session, server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("B", 0)])));
    assert!(session.next_update().await);
    assert!(session.next_update().await);
    assert!(session.loading_timer_armed());
    assert!(!session.state().is_loading());

    let started = Instant::now();
    assert!(session.next_update().await);
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(session.state().is_loading());
    assert!(!session.loading_timer_armed());

    provider.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn question_while_loading_clears_indicator() {
    let (mut provider, mut session, server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("B", 0)])));
    assert!(session.next_update().await);
    assert!(session.next_update().await);
    assert!(session.next_update().await); // loading deadline
    assert!(session.state().is_loading());

    server.push(&two_plus_two());
    assert!(session.next_update().await);

    assert!(!session.state().is_loading());
    let screen = session.screen(&LobbyInput::default());
    let Body::Playing { panel, .. } = screen.body else {
        panic!("expected the playing screen");
    };
    let QuestionPanel::Question { options, .. } = panel else {
        panic!("expected a question panel");
    };
    assert_eq!(options.len(), 3);

    provider.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn prompt_question_disarms_the_timer() {
    let config = TriviaConfig::default().with_loading_delay(Duration::from_secs(3));
    let (mut provider, mut session, server) = start_session(&config);

    server.push(&connect("A"));
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("B", 0)])));
    server.push(&two_plus_two());
    for _ in 0..3 {
        assert!(session.next_update().await);
    }
    assert!(!session.loading_timer_armed());

    tokio::time::advance(Duration::from_secs(10)).await;
    server.push(&ServerMessage::ScoreUpdate(roster(&[("A", 0), ("B", 1)])));
    assert!(session.next_update().await);
    assert!(!session.state().is_loading());

    provider.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn hang_up_mid_game_disarms_the_loading_timer() {
    let (mut provider, mut session, mut server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("B", 0)])));
    assert!(session.next_update().await);
    assert!(session.next_update().await);
    assert!(session.loading_timer_armed());

    server.hang_up();
    assert!(session.next_update().await);
    assert!(!session.loading_timer_armed());
    assert!(!session.next_update().await);
    assert!(!session.state().is_loading());

    provider.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Answering
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn answer_is_sent_once_per_question() {
    let (mut provider, mut session, mut server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("B", 0)])));
    server.push(&two_plus_two());
    for _ in 0..3 {
        assert!(session.next_update().await);
    }
    assert_eq!(server.next_from_client().await, ClientMessage::JoinGame);

    session.submit_answer("4").unwrap();
    assert_eq!(
        server.next_from_client().await,
        ClientMessage::SubmitAnswer("4".into())
    );

    let err = session.submit_answer("5").unwrap_err();
    assert!(matches!(err, TriviaError::AlreadyAnswered));
    assert!(session.state().notice().is_some());

    server.push(&ServerMessage::PointAwarded);
    assert!(session.next_update().await);
    assert_eq!(session.state().feedback(), Some(Feedback::Correct));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(server.client_is_quiet());

    provider.shutdown().await;
}

#[tokio::test]
async fn answer_without_question_is_rejected_locally() {
    let (mut provider, mut session, mut server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    assert!(session.next_update().await);
    assert_eq!(server.next_from_client().await, ClientMessage::JoinGame);

    assert!(matches!(
        session.submit_answer("4"),
        Err(TriviaError::NoActiveQuestion)
    ));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(server.client_is_quiet());

    provider.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Game over and restart
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn losing_then_restarting() {
    let (mut provider, mut session, mut server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("B", 0)])));
    server.push(&two_plus_two());
    server.push(&ServerMessage::GameOver("B".into()));
    for _ in 0..4 {
        assert!(session.next_update().await);
    }
    assert_eq!(server.next_from_client().await, ClientMessage::JoinGame);

    assert_eq!(session.state().status(), GameStatus::GameOver);
    let text = session.screen(&LobbyInput::default()).to_string();
    assert!(text.contains("You Lost!"));
    assert!(text.contains("Play Again"));

    session.restart().unwrap();
    assert_eq!(session.state().status(), GameStatus::Lobby);
    assert_eq!(session.state().winner(), None);
    assert_eq!(session.state().question(), None);
    assert_eq!(session.state().feedback(), None);
    assert_eq!(server.next_from_client().await, ClientMessage::RestartGame);

    // The server can start the next match straight away.
    server.push(&ServerMessage::GameStart(roster(&[("A", 0), ("C", 0)])));
    assert!(session.next_update().await);
    assert_eq!(session.state().status(), GameStatus::Playing);

    provider.shutdown().await;
}

#[tokio::test]
async fn restart_resets_even_when_disconnected() {
    let (mut provider, mut session, mut server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push(&ServerMessage::GameOver("A".into()));
    assert!(session.next_update().await);
    assert!(session.next_update().await);

    server.hang_up();
    assert!(session.next_update().await);
    assert!(!session.next_update().await);

    assert!(matches!(session.restart(), Err(TriviaError::NotConnected)));
    assert_eq!(session.state().status(), GameStatus::Lobby);
    assert_eq!(session.state().winner(), None);

    provider.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Failures and teardown
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn malformed_frames_surface_a_notice() {
    let (mut provider, mut session, server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    server.push_raw(r#"{"event":"game_start","data":"nope"}"#);
    assert!(session.next_update().await);
    assert!(session.next_update().await);

    assert_eq!(session.state().status(), GameStatus::Lobby);
    let screen = session.screen(&LobbyInput::default());
    assert!(screen.notice.unwrap().contains("malformed"));

    provider.shutdown().await;
}

#[tokio::test]
async fn server_hang_up_ends_the_session() {
    let (mut provider, mut session, mut server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    assert!(session.next_update().await);
    server.hang_up();

    assert!(session.next_update().await);
    assert_eq!(
        session.state().connection(),
        &ConnectionStatus::Disconnected { reason: None }
    );
    assert!(!session.next_update().await);
    assert!(!provider.connection().is_connected());

    provider.shutdown().await;
}

#[tokio::test]
async fn dropping_the_session_releases_its_subscription() {
    let (mut provider, session, _server) = start_session(&TriviaConfig::default());
    let connection = provider.connection();

    assert_eq!(connection.subscriber_count(), 1);
    drop(session);
    assert_eq!(connection.subscriber_count(), 0);

    provider.shutdown().await;
}

#[tokio::test]
async fn dropping_the_provider_wakes_a_waiting_session() {
    let (provider, mut session, server) = start_session(&TriviaConfig::default());

    server.push(&connect("A"));
    assert!(session.next_update().await);

    drop(provider);
    let stepped = tokio::time::timeout(Duration::from_secs(2), session.next_update())
        .await
        .expect("session stayed blocked after the provider was dropped");
    assert!(stepped);
    assert_eq!(
        session.state().connection(),
        &ConnectionStatus::Disconnected {
            reason: Some("client shut down".into())
        }
    );
    assert!(!session.next_update().await);
}

#[tokio::test]
async fn aborted_shutdown_still_ends_the_session() {
    let config = TriviaConfig::default().with_shutdown_timeout(Duration::from_millis(10));
    let (mut provider, events) = ConnectionProvider::start(StuckTransport, &config);
    let mut session = GameSession::new(provider.connection(), events, &config);

    provider.shutdown().await;
    assert!(!provider.connection().is_connected());

    let stepped = tokio::time::timeout(Duration::from_secs(2), session.next_update())
        .await
        .expect("session stayed blocked after an aborted shutdown");
    assert!(stepped);
    assert!(matches!(
        session.state().connection(),
        ConnectionStatus::Disconnected { .. }
    ));
    assert!(!session.next_update().await);
}
