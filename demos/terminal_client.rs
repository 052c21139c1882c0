//! # Terminal Client
//!
//! Plays Knowledge Battle from a terminal:
//!
//! 1. Connect to the game server over WebSocket
//! 2. Join matchmaking automatically once the server assigns an id
//! 3. Answer questions by typing the option number
//! 4. Type `r` on the game-over screen to play again
//!
//! ## Running
//!
//! ```sh
//! # Start a game server on localhost:3000, then:
//! cargo run --example terminal_client
//!
//! # Override the server URL:
//! KNOWLEDGE_BATTLE_URL=ws://quiz.example:3000 cargo run --example terminal_client
//! ```
//!
//! Lobby keys: `g` generates a join code, `c` copies it, `q` quits.

use knowledge_battle_client::view::{Body, MemoryClipboard};
use knowledge_battle_client::{ConnectionProvider, GameSession, LobbyInput, TriviaConfig};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Logs go to stderr so they don't interleave with the screen.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let config = match std::env::var("KNOWLEDGE_BATTLE_URL") {
        Ok(url) => TriviaConfig::new(url),
        Err(_) => TriviaConfig::default(),
    };
    tracing::info!("Connecting to {}", config.endpoint);

    // ── Connect ─────────────────────────────────────────────────────
    let (mut provider, events) = ConnectionProvider::connect(&config).await?;
    let mut session = GameSession::new(provider.connection(), events, &config);

    let mut input = LobbyInput::default();
    let mut clipboard = MemoryClipboard::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    draw(&session, &input);

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            alive = session.next_update() => {
                if !alive {
                    tracing::info!("Connection closed, exiting");
                    break;
                }
                draw(&session, &input);
            }

            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = line.trim();
                let screen = session.screen(&input);
                match (&screen.body, command) {
                    (_, "q") => break,
                    (Body::Lobby(_), "g") => {
                        let code = input.generate_join_code();
                        tracing::info!("Share this code with your opponent: {code}");
                    }
                    (Body::Lobby(_), "c") => {
                        if input.copy_join_code(&mut clipboard) {
                            tracing::info!("Join code copied");
                        }
                    }
                    (Body::GameOver(_), "r") => {
                        if let Err(e) = session.restart() {
                            tracing::warn!("Restart request not sent: {e}");
                        }
                    }
                    (Body::Playing { panel, .. }, key) => {
                        let choice = key
                            .parse::<usize>()
                            .ok()
                            .and_then(|key| panel.option_for_key(key))
                            .map(str::to_string);
                        match choice {
                            Some(choice) => {
                                if let Err(e) = session.submit_answer(&choice) {
                                    tracing::warn!("Answer not sent: {e}");
                                }
                            }
                            None => tracing::warn!("Unknown option {key:?}"),
                        }
                    }
                    (_, other) => tracing::debug!("Ignoring input {other:?}"),
                }
                draw(&session, &input);
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    drop(session);
    provider.shutdown().await;
    tracing::info!("Goodbye!");
    Ok(())
}

fn draw(session: &GameSession, input: &LobbyInput) {
    // Clear the terminal and home the cursor before each frame.
    print!("\x1b[2J\x1b[H");
    println!("{}", session.screen(input));
}
