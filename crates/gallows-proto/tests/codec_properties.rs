//! Property-based tests for the text and stream codecs.
//!
//! The push channel delivers bytes in whatever chunks the network produces,
//! and the game field bodies are parsed from free-form text. These tests pin
//! down that decoding does not depend on either.

use std::collections::BTreeSet;

use gallows_proto::{
    PushEvent, PushKind, SseDecoder, TurnPosition, WordMask, normalize_letter, parse_letters,
};
use proptest::prelude::*;

fn arbitrary_kind() -> impl Strategy<Value = PushKind> {
    prop_oneof![
        Just(PushKind::GameStart),
        Just(PushKind::LetterCorrect),
        Just(PushKind::LetterFalse),
        Just(PushKind::Solved),
        Just(PushKind::Lost),
        Just(PushKind::GameDeleted),
    ]
}

fn arbitrary_event() -> impl Strategy<Value = PushEvent> {
    (arbitrary_kind(), any::<u64>(), any::<bool>()).prop_map(|(kind, game_id, second)| {
        if kind.is_letter() {
            let player = if second { TurnPosition::Second } else { TurnPosition::First };
            PushEvent::letter(kind, game_id, player)
        } else {
            PushEvent::new(kind, game_id)
        }
    })
}

/// Serialize events as an event stream, alternating LF and CRLF terminators.
fn encode_stream(events: &[PushEvent], crlf: bool) -> Vec<u8> {
    let eol = if crlf { "\r\n" } else { "\n" };
    let mut out = String::new();
    for event in events {
        out.push_str(": ping");
        out.push_str(eol);
        out.push_str("data: ");
        out.push_str(&event.to_json());
        out.push_str(eol);
        out.push_str(eol);
    }
    out.into_bytes()
}

#[test]
fn prop_sse_decoding_ignores_chunk_boundaries() {
    proptest!(|(
        events in prop::collection::vec(arbitrary_event(), 0..8),
        crlf in any::<bool>(),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..16),
    )| {
        let stream = encode_stream(&events, crlf);

        let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
        points.push(0);
        points.push(stream.len());
        points.sort_unstable();
        points.dedup();

        let mut decoder = SseDecoder::new();
        let mut decoded = Vec::new();
        for window in points.windows(2) {
            for payload in decoder.push(&stream[window[0]..window[1]]) {
                decoded.push(PushEvent::from_json(&payload).expect("payload should decode"));
            }
        }

        // PROPERTY: the same events come out regardless of how bytes are split
        prop_assert_eq!(decoded, events);
        prop_assert_eq!(decoder.buffered(), 0);
    });
}

#[test]
fn prop_normalized_letters_are_uppercase_ascii() {
    proptest!(|(c in any::<char>())| {
        match normalize_letter(c) {
            Some(letter) => {
                prop_assert!(letter.is_ascii_uppercase());
                prop_assert_eq!(letter, c.to_ascii_uppercase());
            },
            None => prop_assert!(!c.is_ascii_alphabetic()),
        }
    });
}

#[test]
fn prop_letter_list_parsing_ignores_spacing_and_case() {
    proptest!(|(
        letters in prop::collection::btree_set(prop::char::range('A', 'Z'), 0..26),
        lower in any::<bool>(),
        pad in 1usize..4,
    )| {
        let sep = " ".repeat(pad);
        let body = letters
            .iter()
            .map(|c| if lower { c.to_ascii_lowercase().to_string() } else { c.to_string() })
            .collect::<Vec<_>>()
            .join(&sep);

        let parsed = parse_letters(&format!("{sep}{body}{sep}")).expect("letters should parse");
        prop_assert_eq!(parsed, letters);
    });
}

#[test]
fn prop_revealed_mask_reparses_to_itself() {
    proptest!(|(
        word in "[a-z]{1,12}",
        guessed in prop::collection::btree_set(prop::char::range('A', 'Z'), 0..26),
    )| {
        let mask = WordMask::reveal(&word, &guessed);
        let reparsed: WordMask = mask.to_string().parse().expect("mask should parse");

        prop_assert_eq!(reparsed.len(), word.len());
        prop_assert_eq!(&reparsed, &mask);

        // PROPERTY: revealing is monotone in the guessed set
        let mut more: BTreeSet<char> = guessed.clone();
        more.extend('A'..='M');
        prop_assert!(WordMask::reveal(&word, &more).revealed() >= mask.revealed());
    });
}
