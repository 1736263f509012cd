//! Properties every client view must satisfy.
//!
//! A check reads a [`SystemSnapshot`]: what each client believes, captured
//! either from a bare [`gallows_client::Client`] or from the view the App last
//! rendered, plus (when known) what the server holds. Checks describe what
//! may never happen, whatever order pushes and responses arrive in, so the
//! same registry runs under the synchronous cluster, the proptest rigs and
//! the end-to-end runtime.
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&cluster.system_snapshot(), "after delivery");
//! ```

mod checks;
mod snapshot;

pub use checks::{
    ConvergedWithServer, GateClosedOutsideProgress, GuessedLettersMonotonic, LivesNonIncreasing,
    NeverAheadOfServer, PhaseMonotonicity, TurnOwnerOnlyInProgress,
};
pub use snapshot::{ClientSnapshot, ServerSnapshot, SystemSnapshot};
use thiserror::Error;

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A check that failed, and on what.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{invariant}: {message}")]
pub struct Violation {
    /// Check that failed.
    pub invariant: &'static str,
    /// Which client and which fields.
    pub message: String,
}

/// One property of the system.
pub trait Invariant: Send + Sync {
    /// Short name used in failure reports.
    fn name(&self) -> &'static str;

    /// `Err` if `state` breaks the property.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Ordered set of checks run together.
#[derive(Default)]
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// No checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that hold after every delivered event, even mid-flight:
    ///
    /// - [`PhaseMonotonicity`]
    /// - [`GuessedLettersMonotonic`]
    /// - [`LivesNonIncreasing`]
    /// - [`TurnOwnerOnlyInProgress`]
    /// - [`GateClosedOutsideProgress`]
    /// - [`NeverAheadOfServer`]
    pub fn standard() -> Self {
        Self::new()
            .with(PhaseMonotonicity)
            .with(GuessedLettersMonotonic)
            .with(LivesNonIncreasing)
            .with(TurnOwnerOnlyInProgress)
            .with(GateClosedOutsideProgress)
            .with(NeverAheadOfServer)
    }

    /// [`Self::standard`] plus [`ConvergedWithServer`]. Only valid once no
    /// push or response is left in flight.
    pub fn settled() -> Self {
        Self::standard().with(ConvergedWithServer)
    }

    /// Append a check.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Builder form of [`Self::add`].
    #[must_use]
    pub fn with<I: Invariant + 'static>(mut self, invariant: I) -> Self {
        self.add(invariant);
        self
    }

    /// Run every check, collecting all failures.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();
        for invariant in &self.invariants {
            if let Err(violation) = invariant.check(state) {
                violations.push(violation);
            }
        }
        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Panic listing every failure, tagged with `context`.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        let Err(violations) = self.check_all(state) else {
            return;
        };
        let report: Vec<String> = violations.iter().map(ToString::to_string).collect();
        panic!("{} invariant(s) broken {context}:\n  {}", report.len(), report.join("\n  "));
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// No checks registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    struct AlwaysBroken;

    impl Invariant for AlwaysBroken {
        fn name(&self) -> &'static str {
            "always_broken"
        }

        fn check(&self, _: &SystemSnapshot) -> InvariantResult {
            Err(Violation { invariant: self.name(), message: "on purpose".into() })
        }
    }

    #[test]
    fn settled_adds_convergence_to_standard() {
        assert_eq!(InvariantRegistry::standard().len(), 6);
        assert_eq!(InvariantRegistry::settled().len(), 7);
        assert!(InvariantRegistry::new().is_empty());
    }

    #[test]
    fn no_clients_breaks_nothing() {
        assert!(InvariantRegistry::settled().check_all(&SystemSnapshot::empty()).is_ok());
    }

    #[test]
    fn every_failure_is_reported() {
        let registry = InvariantRegistry::new().with(AlwaysBroken).with(AlwaysBroken);
        let violations = registry.check_all(&SystemSnapshot::empty()).unwrap_err();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].to_string(), "always_broken: on purpose");
    }

    #[test]
    #[should_panic(expected = "2 invariant(s) broken at start")]
    fn assert_all_panics_with_context() {
        InvariantRegistry::new()
            .with(AlwaysBroken)
            .with(AlwaysBroken)
            .assert_all(&SystemSnapshot::empty(), "at start");
    }
}
