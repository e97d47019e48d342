//! Properties of one client that hold after every runtime step.
//!
//! A [`SystemSnapshot`] is taken from the App and the Bridge, then every
//! [`Invariant`] in an [`InvariantRegistry`] looks at it. Scenario tests and
//! property tests share the same registry, so a broken reconnect or routing
//! rule fails both with the same report.
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.assert_all(&SystemSnapshot::capture(runtime.app(), runtime.bridge()), "after start");
//! ```

mod checks;
mod snapshot;

use std::fmt;

pub use checks::{
    ConnectionStateAgreement, IdentityRetained, LiveTransportWhenActive,
    TimerOnlyWhenDisconnected, TranscriptMatchesConversation,
};
pub use snapshot::SystemSnapshot;

/// Outcome of a single check.
pub type InvariantResult = Result<(), Violation>;

/// A failed check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Which invariant failed.
    pub invariant: &'static str,
    /// What the snapshot showed.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// One property of a client snapshot.
pub trait Invariant: Send + Sync {
    /// Short snake_case name used in reports.
    fn name(&self) -> &'static str;

    /// Look at `state` and report a [`Violation`] if the property is broken.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Set of invariants checked together.
#[derive(Default)]
pub struct InvariantRegistry {
    checks: Vec<Box<dyn Invariant>>,
}

impl InvariantRegistry {
    /// Registry with no checks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every check this crate defines:
    ///
    /// - [`TimerOnlyWhenDisconnected`]
    /// - [`LiveTransportWhenActive`]
    /// - [`TranscriptMatchesConversation`]
    /// - [`ConnectionStateAgreement`]
    /// - [`IdentityRetained`]
    pub fn standard() -> Self {
        Self::new()
            .with(TimerOnlyWhenDisconnected)
            .with(LiveTransportWhenActive)
            .with(TranscriptMatchesConversation)
            .with(ConnectionStateAgreement)
            .with(IdentityRetained)
    }

    /// Builder form of [`Self::add`].
    #[must_use]
    pub fn with(mut self, invariant: impl Invariant + 'static) -> Self {
        self.add(invariant);
        self
    }

    /// Register `invariant`.
    pub fn add(&mut self, invariant: impl Invariant + 'static) {
        self.checks.push(Box::new(invariant));
    }

    /// Names of the registered checks, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Run every check. Collects all violations rather than stopping at the
    /// first.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.checks.iter().filter_map(|check| check.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Run every check and panic with all violations and `context` if any
    /// fail. For tests.
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        let Err(violations) = self.check_all(state) else {
            return;
        };
        let report: String = violations.iter().map(|v| format!("\n  {v}")).collect();
        panic!("{} invariant(s) broken {context}:{report}\nsnapshot: {state:#?}", violations.len());
    }

    /// Number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
