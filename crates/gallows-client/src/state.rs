//! Local view of the shared game.
//!
//! [`GameState`] is read-only outside this crate. Every mutation goes through
//! the [`crate::Client`] so that the monotonicity rules below hold no matter
//! in which order pushes, snapshots and guess results arrive.

use std::collections::BTreeSet;

use gallows_proto::{GameSnapshot, SessionStatus, TurnPosition, WordMask};

/// Coarse game lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// First player registered, no opponent yet.
    AwaitingOpponent,
    /// Both players joined.
    InProgress,
    /// Word solved.
    Won,
    /// Lives exhausted.
    Lost,
}

impl Phase {
    /// Phase implied by a server status. `None` for an unknown session.
    pub fn from_status(status: SessionStatus) -> Option<Self> {
        match status {
            SessionStatus::Unregistered => None,
            SessionStatus::WaitingForOpponent => Some(Self::AwaitingOpponent),
            SessionStatus::InProgress => Some(Self::InProgress),
            SessionStatus::Won => Some(Self::Won),
            SessionStatus::Lost => Some(Self::Lost),
        }
    }

    /// Position along `awaiting-opponent → in-progress → {won, lost}`.
    fn rank(self) -> u8 {
        match self {
            Self::AwaitingOpponent => 0,
            Self::InProgress => 1,
            Self::Won | Self::Lost => 2,
        }
    }

    /// Whether moving from `self` to `next` goes forward.
    pub fn can_advance_to(self, next: Self) -> bool {
        next.rank() > self.rank()
    }

    /// Game over.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// Everything the client believes about the game.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameState {
    phase: Option<Phase>,
    word_mask: WordMask,
    lives_remaining: Option<u32>,
    guessed_letters: BTreeSet<char>,
    turn_owner: Option<TurnPosition>,
    revealed_word: Option<String>,
    teammate: Option<String>,
}

/// What changed when a snapshot was merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MergeEffect {
    pub(crate) fields_changed: bool,
    pub(crate) turn_changed: bool,
}

impl GameState {
    /// Current phase. `None` until the session status is known.
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Revealed and hidden slots of the word.
    pub fn word_mask(&self) -> &WordMask {
        &self.word_mask
    }

    /// Lives left. `None` until the first snapshot.
    pub fn lives_remaining(&self) -> Option<u32> {
        self.lives_remaining
    }

    /// Letters guessed by either player.
    pub fn guessed_letters(&self) -> &BTreeSet<char> {
        &self.guessed_letters
    }

    /// Player allowed to submit. Only set while in progress.
    pub fn turn_owner(&self) -> Option<TurnPosition> {
        self.turn_owner
    }

    /// The secret word, once the game is over.
    pub fn revealed_word(&self) -> Option<&str> {
        self.revealed_word.as_deref()
    }

    /// Display name of the other player.
    pub fn teammate(&self) -> Option<&str> {
        self.teammate.as_deref()
    }

    /// Move to `next` if it lies ahead of the current phase.
    ///
    /// Returns the previous phase on success.
    pub(crate) fn advance(&mut self, next: Phase) -> Option<Option<Phase>> {
        if self.phase.is_some_and(|current| !current.can_advance_to(next)) {
            return None;
        }
        let previous = self.phase.replace(next);
        if next != Phase::InProgress {
            self.turn_owner = None;
        }
        Some(previous)
    }

    /// Set the turn owner. Ignored outside `in-progress`.
    ///
    /// Returns whether the owner changed.
    pub(crate) fn set_turn_owner(&mut self, owner: TurnPosition) -> bool {
        if self.phase != Some(Phase::InProgress) || self.turn_owner == Some(owner) {
            return false;
        }
        self.turn_owner = Some(owner);
        true
    }

    /// Record a guessed letter. Returns whether it was new.
    pub(crate) fn insert_letter(&mut self, letter: char) -> bool {
        self.guessed_letters.insert(letter)
    }

    /// Merge an authoritative snapshot without ever going backwards.
    pub(crate) fn merge_snapshot(&mut self, snapshot: GameSnapshot) -> MergeEffect {
        let mut effect = MergeEffect::default();

        let mask = merge_mask(&self.word_mask, snapshot.word_mask);
        if mask != self.word_mask {
            self.word_mask = mask;
            effect.fields_changed = true;
        }

        let lives = match self.lives_remaining {
            Some(current) => current.min(snapshot.lives_remaining),
            None => snapshot.lives_remaining,
        };
        if self.lives_remaining != Some(lives) {
            self.lives_remaining = Some(lives);
            effect.fields_changed = true;
        }

        let before = self.guessed_letters.len();
        self.guessed_letters.extend(snapshot.guessed_letters);
        if self.guessed_letters.len() != before {
            effect.fields_changed = true;
        }

        if let Some(owner) = snapshot.turn_owner {
            effect.turn_changed = self.set_turn_owner(owner);
        }

        effect
    }

    /// Store the final word and reveal it in the mask.
    pub(crate) fn set_revealed_word(&mut self, word: &str) -> bool {
        let word = word.trim().to_ascii_uppercase();
        if self.revealed_word.as_deref() == Some(word.as_str()) {
            return false;
        }
        let all: BTreeSet<char> = word.chars().collect();
        self.word_mask = WordMask::reveal(&word, &all);
        self.revealed_word = Some(word);
        true
    }

    pub(crate) fn set_teammate(&mut self, name: String) -> bool {
        if self.teammate.as_deref() == Some(name.as_str()) {
            return false;
        }
        self.teammate = Some(name);
        true
    }
}

/// Revealed slots stay revealed unless the word itself changed length.
fn merge_mask(local: &WordMask, incoming: WordMask) -> WordMask {
    if local.len() != incoming.len() {
        return incoming;
    }
    let slots = local
        .slots()
        .iter()
        .zip(incoming.slots())
        .map(|(mine, theirs)| mine.or(*theirs))
        .collect();
    WordMask::from_slots(slots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_progress() -> GameState {
        let mut state = GameState::default();
        state.advance(Phase::InProgress);
        state
    }

    fn snapshot(
        mask: &str,
        lives: u32,
        letters: &str,
        owner: Option<TurnPosition>,
    ) -> GameSnapshot {
        GameSnapshot {
            word_mask: mask.parse().unwrap(),
            lives_remaining: lives,
            guessed_letters: gallows_proto::parse_letters(letters).unwrap(),
            turn_owner: owner,
        }
    }

    #[test]
    fn phases_only_move_forward() {
        let mut state = GameState::default();
        assert_eq!(state.advance(Phase::InProgress), Some(None));
        assert_eq!(state.advance(Phase::AwaitingOpponent), None);
        assert_eq!(state.advance(Phase::Won), Some(Some(Phase::InProgress)));
        assert_eq!(state.advance(Phase::Lost), None);
        assert_eq!(state.phase(), Some(Phase::Won));
    }

    #[test]
    fn leaving_progress_clears_turn_owner() {
        let mut state = in_progress();
        assert!(state.set_turn_owner(TurnPosition::First));
        state.advance(Phase::Lost);
        assert_eq!(state.turn_owner(), None);
        assert!(!state.set_turn_owner(TurnPosition::Second));
    }

    #[test]
    fn older_snapshot_cannot_undo_progress() {
        let mut state = in_progress();
        state.merge_snapshot(snapshot("_ E _ _ O", 7, "E O X", Some(TurnPosition::First)));

        let effect = state.merge_snapshot(snapshot("_ _ _ _ O", 8, "O", Some(TurnPosition::First)));

        assert!(!effect.fields_changed);
        assert_eq!(state.word_mask().to_string(), "_ E _ _ O");
        assert_eq!(state.lives_remaining(), Some(7));
        assert_eq!(state.guessed_letters().len(), 3);
    }

    #[test]
    fn snapshot_turn_owner_ignored_before_game_runs() {
        let mut state = GameState::default();
        state.advance(Phase::AwaitingOpponent);
        let effect = state.merge_snapshot(snapshot("_ _", 10, "", Some(TurnPosition::First)));
        assert!(!effect.turn_changed);
        assert_eq!(state.turn_owner(), None);
    }

    #[test]
    fn revealed_word_fills_the_mask() {
        let mut state = in_progress();
        state.merge_snapshot(snapshot("_ _ L L _", 3, "L", None));
        state.advance(Phase::Lost);
        assert!(state.set_revealed_word("hello"));
        assert_eq!(state.revealed_word(), Some("HELLO"));
        assert!(state.word_mask().is_complete());
        assert!(!state.set_revealed_word("HELLO"));
    }
}
