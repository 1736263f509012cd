//! Fuzz target for the text bodies the server answers with
//!
//! Every parser gets the same arbitrary string: status, outcome code, word
//! mask, guessed-letter list, lives, turn flag and push event JSON.
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use gallows_proto::{
    GameSnapshot, GuessOutcome, PushEvent, SessionStatus, TurnPosition, WordMask, parse_letters,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|body: &str| {
    let _ = body.parse::<SessionStatus>();
    let _ = GameSnapshot::parse_lives(body);
    let _ = GameSnapshot::parse_turn(body, TurnPosition::First);

    if let Ok(code) = body.trim().parse::<i64>() {
        if let Ok(outcome) = GuessOutcome::from_code(code) {
            assert_eq!(outcome.code(), code);
        }
    }

    // Parsed letters are upper-case ASCII
    if let Ok(letters) = parse_letters(body) {
        assert!(letters.iter().all(char::is_ascii_uppercase));
    }

    // A parsed mask prints back to something that parses to the same mask
    if let Ok(mask) = body.parse::<WordMask>() {
        assert!(mask.revealed() <= mask.len());
        let reparsed: WordMask = mask.to_string().parse().expect("printed mask parses");
        assert_eq!(reparsed, mask);
    }

    if let Ok(event) = PushEvent::from_json(body) {
        let again = PushEvent::from_json(&event.to_json()).expect("encoded event decodes");
        assert_eq!(again, event);
    }
});
