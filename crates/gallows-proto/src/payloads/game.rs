//! Game field payloads: word mask, guessed letters, guess outcomes, snapshots.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    errors::{ProtocolError, Result},
    ids::TurnPosition,
};

/// Placeholder for an unrevealed slot in the word mask.
const HIDDEN_SLOT: char = '_';

/// Lives each game starts with.
pub const MAX_LIVES: u32 = 10;

/// Normalize a guessed character.
///
/// Only ASCII letters are guessable; they are compared upper-case everywhere.
pub fn normalize_letter(c: char) -> Option<char> {
    c.is_ascii_alphabetic().then(|| c.to_ascii_uppercase())
}

/// Parse a whitespace-separated list of guessed letters, e.g. `"A  E T"`.
pub fn parse_letters(body: &str) -> Result<BTreeSet<char>> {
    body.split_whitespace()
        .map(|token| {
            let mut chars = token.chars();
            match (chars.next().and_then(normalize_letter), chars.next()) {
                (Some(letter), None) => Ok(letter),
                _ => Err(ProtocolError::malformed("guessed letters", body)),
            }
        })
        .collect()
}

/// Revealed and unrevealed character slots of the secret word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct WordMask {
    slots: Vec<Option<char>>,
}

impl WordMask {
    /// Build a mask from explicit slots.
    pub fn from_slots(slots: Vec<Option<char>>) -> Self {
        Self { slots }
    }

    /// Mask for `word` with only the letters in `guessed` revealed.
    pub fn reveal(word: &str, guessed: &BTreeSet<char>) -> Self {
        let slots = word
            .chars()
            .map(|c| {
                let upper = c.to_ascii_uppercase();
                guessed.contains(&upper).then_some(upper)
            })
            .collect();
        Self { slots }
    }

    /// Slot contents, `None` for unrevealed.
    pub fn slots(&self) -> &[Option<char>] {
        &self.slots
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True for the empty mask (no word known yet).
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of revealed slots.
    pub fn revealed(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// All slots revealed.
    pub fn is_complete(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(Option::is_some)
    }
}

impl FromStr for WordMask {
    type Err = ProtocolError;

    fn from_str(body: &str) -> Result<Self> {
        body.split_whitespace()
            .map(|token| {
                let mut chars = token.chars();
                match (chars.next(), chars.next()) {
                    (Some(HIDDEN_SLOT), None) => Ok(None),
                    (Some(c), None) => normalize_letter(c)
                        .map(Some)
                        .ok_or_else(|| ProtocolError::malformed("word mask", body)),
                    _ => Err(ProtocolError::malformed("word mask", body)),
                }
            })
            .collect::<Result<Vec<_>>>()
            .map(Self::from_slots)
    }
}

impl fmt::Display for WordMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", slot.unwrap_or(HIDDEN_SLOT))?;
        }
        Ok(())
    }
}

/// Body of a guess submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessRequest {
    /// The guessed letter.
    pub character: char,
}

/// Server verdict on a submitted guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuessOutcome {
    /// Correct, and the word is now complete.
    Won,
    /// Correct, game continues with the opponent.
    Correct,
    /// Incorrect, a life was lost, game continues with the opponent.
    Incorrect,
    /// Incorrect, and no lives remain.
    Lost,
    /// Not submitted: the other player holds the turn.
    NotYourTurn,
}

impl GuessOutcome {
    /// Decode a wire code.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            1 => Ok(Self::Won),
            2 => Ok(Self::Correct),
            3 => Ok(Self::Incorrect),
            4 => Ok(Self::Lost),
            5 => Ok(Self::NotYourTurn),
            other => Err(ProtocolError::UnknownOutcome(other)),
        }
    }

    /// Wire code.
    pub fn code(self) -> i64 {
        match self {
            Self::Won => 1,
            Self::Correct => 2,
            Self::Incorrect => 3,
            Self::Lost => 4,
            Self::NotYourTurn => 5,
        }
    }

    /// The guess was applied by the server (anything but `NotYourTurn`).
    pub fn is_scored(self) -> bool {
        !matches!(self, Self::NotYourTurn)
    }

    /// The guess ended the game.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }

    /// Decode the JSON value returned by the submit call.
    ///
    /// Accepts a bare number or a numeric string.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let code = match value {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        code.ok_or_else(|| ProtocolError::malformed("guess outcome", value.to_string()))
            .and_then(Self::from_code)
    }
}

/// Authoritative point-in-time read of the game fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Revealed/unrevealed slots.
    pub word_mask: WordMask,
    /// Lives left.
    pub lives_remaining: u32,
    /// Letters guessed by either player, upper-case.
    pub guessed_letters: BTreeSet<char>,
    /// Player allowed to submit. `None` when no turn is assigned.
    pub turn_owner: Option<TurnPosition>,
}

impl GameSnapshot {
    /// Parse the lives body (`"7"`).
    pub fn parse_lives(body: &str) -> Result<u32> {
        body.trim().parse().map_err(|_| ProtocolError::malformed("lives", body))
    }

    /// Parse the turn body (`"true"`/`"false"`), relative to `own` position.
    pub fn parse_turn(body: &str, own: TurnPosition) -> Result<TurnPosition> {
        match body.trim().trim_matches('"') {
            "true" => Ok(own),
            "false" => Ok(own.other()),
            _ => Err(ProtocolError::malformed("turn", body)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_parses_hidden_and_revealed_slots() {
        let mask: WordMask = "_ E _ _ o".parse().unwrap();
        assert_eq!(mask.slots(), &[None, Some('E'), None, None, Some('O')]);
        assert_eq!(mask.revealed(), 2);
        assert!(!mask.is_complete());
        assert_eq!(mask.to_string(), "_ E _ _ O");
    }

    #[test]
    fn mask_rejects_multi_char_slots() {
        assert!("_ EE _".parse::<WordMask>().is_err());
        assert!("_ 3 _".parse::<WordMask>().is_err());
    }

    #[test]
    fn reveal_matches_case_insensitively() {
        let guessed: BTreeSet<char> = ['L', 'O'].into_iter().collect();
        let mask = WordMask::reveal("hello", &guessed);
        assert_eq!(mask.to_string(), "_ _ L L O");
    }

    #[test]
    fn letters_tolerate_padding_and_normalize_case() {
        let letters = parse_letters("  a   E  t ").unwrap();
        assert_eq!(letters.into_iter().collect::<String>(), "AET");
        assert!(parse_letters("").unwrap().is_empty());
        assert!(parse_letters("A 1").is_err());
    }

    #[test]
    fn outcome_codes_map_both_ways() {
        for code in 1..=5 {
            assert_eq!(GuessOutcome::from_code(code).map(GuessOutcome::code), Ok(code));
        }
        assert_eq!(GuessOutcome::from_code(0), Err(ProtocolError::UnknownOutcome(0)));
    }

    #[test]
    fn outcome_accepts_number_or_numeric_string() {
        assert_eq!(GuessOutcome::from_json(&serde_json::json!(4)), Ok(GuessOutcome::Lost));
        assert_eq!(GuessOutcome::from_json(&serde_json::json!("5")), Ok(GuessOutcome::NotYourTurn));
        assert!(GuessOutcome::from_json(&serde_json::json!(null)).is_err());
    }

    #[test]
    fn not_your_turn_is_not_scored() {
        assert!(!GuessOutcome::NotYourTurn.is_scored());
        assert!(GuessOutcome::Incorrect.is_scored());
        assert!(GuessOutcome::Won.is_terminal());
        assert!(!GuessOutcome::Correct.is_terminal());
    }

    #[test]
    fn turn_body_is_relative_to_own_position() {
        let own = TurnPosition::Second;
        assert_eq!(GameSnapshot::parse_turn("true", own), Ok(TurnPosition::Second));
        assert_eq!(GameSnapshot::parse_turn("false", own), Ok(TurnPosition::First));
        assert!(GameSnapshot::parse_turn("maybe", TurnPosition::First).is_err());
    }

    #[test]
    fn lives_must_be_non_negative() {
        assert_eq!(GameSnapshot::parse_lives(" 10\n"), Ok(10));
        assert!(GameSnapshot::parse_lives("-1").is_err());
    }
}
