#![no_main]

use knowledge_battle_client::{GameState, ServerMessage};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any frame that parses must be safe to feed to the state machine.
    if let Ok(msg) = serde_json::from_slice::<ServerMessage>(data) {
        let mut state = GameState::new();
        let _ = state.apply(msg);
        let _ = knowledge_battle_client::view::render(&state, &Default::default());
    }
});
