//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use gallows_client::Phase;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// Phases only move forward.
///
/// `awaiting-opponent → in-progress → {won, lost}`. Skipping ahead is fine
/// (a reload straight into a finished game); going back or sideways between
/// `won` and `lost` is not.
pub struct PhaseMonotonicity;

impl Invariant for PhaseMonotonicity {
    fn name(&self) -> &'static str {
        "phase_monotonicity"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for window in client.phase_history.windows(2) {
                if !window[0].can_advance_to(window[1]) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "client {}: phase went {:?} → {:?}",
                            client.id, window[0], window[1]
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Guessed letters are never forgotten.
///
/// Every observed set contains the one before it.
pub struct GuessedLettersMonotonic;

impl Invariant for GuessedLettersMonotonic {
    fn name(&self) -> &'static str {
        "guessed_letters_monotonic"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for window in client.letters_history.windows(2) {
                if !window[0].is_subset(&window[1]) {
                    let lost: Vec<_> = window[0].difference(&window[1]).collect();
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!("client {}: letters {lost:?} disappeared", client.id),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Lives never go back up.
pub struct LivesNonIncreasing;

impl Invariant for LivesNonIncreasing {
    fn name(&self) -> &'static str {
        "lives_non_increasing"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            for window in client.lives_history.windows(2) {
                if window[1] > window[0] {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "client {}: lives increased {} → {}",
                            client.id, window[0], window[1]
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// A turn owner exists only while the game runs.
pub struct TurnOwnerOnlyInProgress;

impl Invariant for TurnOwnerOnlyInProgress {
    fn name(&self) -> &'static str {
        "turn_owner_only_in_progress"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if let Some(owner) = client.turn_owner
                && client.phase != Some(Phase::InProgress)
            {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "client {}: turn owner {owner} in phase {:?}",
                        client.id, client.phase
                    ),
                });
            }
        }
        Ok(())
    }
}

/// The gate is closed whenever the game is not running.
pub struct GateClosedOutsideProgress;

impl Invariant for GateClosedOutsideProgress {
    fn name(&self) -> &'static str {
        "gate_closed_outside_progress"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for client in &state.clients {
            if client.can_submit && client.phase != Some(Phase::InProgress) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("client {}: gate open in phase {:?}", client.id, client.phase),
                });
            }
        }
        Ok(())
    }
}

/// No client knows more than the server.
///
/// Every letter a client holds was accepted by the server, its lives are at
/// least the server's, every revealed slot of a running game matches the
/// server's mask, and its phase is not ahead of the server's. Skipped when no server state is
/// attached or the game was deleted.
pub struct NeverAheadOfServer;

impl Invariant for NeverAheadOfServer {
    fn name(&self) -> &'static str {
        "never_ahead_of_server"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(server) = &state.server else {
            return Ok(());
        };
        let (Some(status), Some(game)) = (server.status, &server.game) else {
            return Ok(());
        };
        let server_phase = Phase::from_status(status);

        for client in &state.clients {
            let fail = |what: String| {
                Err(Violation {
                    invariant: self.name(),
                    message: format!("client {} game {}: {what}", client.id, server.game_id),
                })
            };

            if !client.guessed_letters.is_subset(&game.guessed_letters) {
                return fail(format!(
                    "letters {:?} not in server set {:?}",
                    client.guessed_letters, game.guessed_letters
                ));
            }
            if let Some(lives) = client.lives_remaining
                && lives < game.lives_remaining
            {
                return fail(format!("lives {lives} below server {}", game.lives_remaining));
            }
            // a finished game shows the revealed word instead of the mask
            let finished = client.phase.is_some_and(Phase::is_terminal);
            let local = client.word_mask.slots();
            let remote = game.word_mask.slots();
            if !finished
                && local.len() == remote.len()
                && local.iter().zip(remote).any(|(l, r)| l.is_some() && l != r)
            {
                return fail(format!("mask {} disagrees with {}", client.word_mask, game.word_mask));
            }
            if let (Some(local), Some(remote)) = (client.phase, server_phase)
                && local != remote
                && !local.can_advance_to(remote)
            {
                return fail(format!("phase {local:?} ahead of server {remote:?}"));
            }
        }
        Ok(())
    }
}

/// Every client agrees with the server.
///
/// Only holds once all traffic has settled, so it is not part of
/// [`super::InvariantRegistry::standard`]. Phases must match; while the game
/// runs, the mask, lives, letters and turn owner must match too.
pub struct ConvergedWithServer;

impl Invariant for ConvergedWithServer {
    fn name(&self) -> &'static str {
        "converged_with_server"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let Some(server) = &state.server else {
            return Ok(());
        };
        let (Some(status), Some(game)) = (server.status, &server.game) else {
            return Ok(());
        };
        let server_phase = Phase::from_status(status);

        for client in &state.clients {
            let fail = |what: String| {
                Err(Violation {
                    invariant: self.name(),
                    message: format!("client {} game {}: {what}", client.id, server.game_id),
                })
            };

            if client.phase != server_phase {
                return fail(format!("phase {:?}, server {server_phase:?}", client.phase));
            }
            if server_phase != Some(Phase::InProgress) {
                continue;
            }
            if client.word_mask != game.word_mask {
                return fail(format!("mask {}, server {}", client.word_mask, game.word_mask));
            }
            if client.lives_remaining != Some(game.lives_remaining) {
                return fail(format!(
                    "lives {:?}, server {}",
                    client.lives_remaining, game.lives_remaining
                ));
            }
            if client.guessed_letters != game.guessed_letters {
                return fail(format!(
                    "letters {:?}, server {:?}",
                    client.guessed_letters, game.guessed_letters
                ));
            }
            if client.turn_owner != game.turn_owner {
                return fail(format!(
                    "turn owner {:?}, server {:?}",
                    client.turn_owner, game.turn_owner
                ));
            }
        }
        Ok(())
    }
}
