//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`parley_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! The server side is a script of [`SimStep`]s consumed one per poll. Writes,
//! opens and closes issued by the runtime are recorded for the test to
//! inspect. Time comes from a [`SimEnv`] and only moves when a step advances
//! it or the runtime waits for a reconnect deadline.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use parley_app::{App, AppEvent, Driver, DriverEvent, Runtime, TransportEvent};
use parley_core::{Environment, TransportId};
use parley_proto::{ChatMessage, Contact};

use crate::{
    SimEnv,
    invariants::{InvariantRegistry, SystemSnapshot},
    sim_env::SimInstant,
};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// One scripted step, consumed by [`Driver::poll_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimStep {
    /// Hand an event to the App.
    App(AppEvent),
    /// Complete the handshake of the most recently opened transport.
    Open,
    /// The server closes the current transport.
    Close(String),
    /// The current transport breaks.
    Fail(String),
    /// The server pushes a text frame on the current transport.
    Frame(String),
    /// Let virtual time pass.
    Advance(Duration),
}

/// Shared state for event injection.
///
/// This allows injection from outside async contexts.
#[derive(Default)]
struct SharedState {
    script: VecDeque<SimStep>,
    current: Option<TransportId>,
    writable: bool,
    auto_open: bool,
    opens: Vec<TransportId>,
    writes: Vec<(TransportId, String)>,
    closes: Vec<(TransportId, String)>,
    histories: HashMap<String, Result<Vec<ChatMessage>, String>>,
    contacts: Option<Result<Vec<Contact>, String>>,
    rejected_contacts: HashMap<String, String>,
    verifications: Vec<String>,
    renders: usize,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] trait so the same [`parley_app::Runtime`]
/// orchestration code runs in both production and simulation tests.
///
/// By default every opened transport completes its handshake on the next
/// poll. Use [`SimDriver::manual_open`] to script handshakes explicitly.
#[derive(Clone)]
pub struct SimDriver {
    env: SimEnv,
    state: Arc<Mutex<SharedState>>,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    /// Create a new simulation driver with its own clock.
    pub fn new() -> Self {
        Self::with_env(SimEnv::new())
    }

    /// Create a driver reading time from `env`.
    pub fn with_env(env: SimEnv) -> Self {
        let state = SharedState { auto_open: true, ..SharedState::default() };
        Self { env, state: Arc::new(Mutex::new(state)) }
    }

    /// Require an explicit [`SimStep::Open`] for every handshake.
    #[must_use]
    pub fn manual_open(self) -> Self {
        self.lock().auto_open = false;
        self
    }

    /// Clock shared with this driver.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Append a step to the script.
    pub fn push(&self, step: SimStep) {
        self.lock().script.push_back(step);
    }

    /// Append several steps to the script.
    pub fn script(&self, steps: impl IntoIterator<Item = SimStep>) {
        self.lock().script.extend(steps);
    }

    /// Inject an `AppEvent` for processing.
    pub fn inject_event(&self, event: AppEvent) {
        self.push(SimStep::App(event));
    }

    /// Answer history requests for `peer` with `messages`, newest first.
    pub fn set_history(&self, peer: impl Into<String>, messages: Vec<ChatMessage>) {
        self.lock().histories.insert(peer.into(), Ok(messages));
    }

    /// Fail history requests for `peer`.
    pub fn fail_history(&self, peer: impl Into<String>, error: impl Into<String>) {
        self.lock().histories.insert(peer.into(), Err(error.into()));
    }

    /// Answer contact requests with `contacts`.
    pub fn set_contacts(&self, contacts: Vec<Contact>) {
        self.lock().contacts = Some(Ok(contacts));
    }

    /// Fail contact requests.
    pub fn fail_contacts(&self, error: impl Into<String>) {
        self.lock().contacts = Some(Err(error.into()));
    }

    /// Refuse verification of `username` with `error`. Anyone else verifies.
    pub fn reject_contact(&self, username: impl Into<String>, error: impl Into<String>) {
        self.lock().rejected_contacts.insert(username.into(), error.into());
    }

    /// Usernames the runtime asked to verify, in order.
    pub fn verifications(&self) -> Vec<String> {
        self.lock().verifications.clone()
    }

    /// Check if there are scripted steps left.
    pub fn has_pending(&self) -> bool {
        !self.lock().script.is_empty()
    }

    /// Transports the runtime asked to open, in order.
    pub fn opens(&self) -> Vec<TransportId> {
        self.lock().opens.clone()
    }

    /// Take all captured writes.
    pub fn take_writes(&self) -> Vec<(TransportId, String)> {
        std::mem::take(&mut self.lock().writes)
    }

    /// Transports the runtime closed, with reasons.
    pub fn closes(&self) -> Vec<(TransportId, String)> {
        self.lock().closes.clone()
    }

    /// Number of renders requested so far.
    pub fn renders(&self) -> usize {
        self.lock().renders
    }

    /// Whether the runtime stopped the driver.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_transport(state: &SharedState, step: &SimStep) -> Result<TransportId, SimDriverError> {
        state
            .current
            .ok_or_else(|| SimDriverError(format!("{step:?} scripted before any transport opened")))
    }

    fn next_event(&self, deadline: Option<SimInstant>) -> Result<Option<DriverEvent>, SimDriverError> {
        let mut state = self.lock();

        let Some(step) = state.script.pop_front() else {
            return Ok(match deadline {
                Some(deadline) => {
                    self.env.advance_to(deadline);
                    None
                },
                // Nothing left to happen
                None => Some(DriverEvent::App(AppEvent::Quit)),
            });
        };

        let transport_event = match &step {
            SimStep::App(event) => return Ok(Some(DriverEvent::App(event.clone()))),
            SimStep::Advance(duration) => {
                self.env.advance(*duration);
                return Ok(None);
            },
            SimStep::Open => {
                state.writable = true;
                TransportEvent::Opened
            },
            SimStep::Close(reason) => {
                state.writable = false;
                TransportEvent::Closed { reason: reason.clone() }
            },
            SimStep::Fail(error) => {
                state.writable = false;
                TransportEvent::Failed { error: error.clone() }
            },
            SimStep::Frame(text) => TransportEvent::Frame(text.clone()),
        };

        let transport = Self::current_transport(&state, &step)?;
        tracing::trace!(%transport, ?transport_event, "scripted transport event");
        Ok(Some(DriverEvent::Transport { transport, event: transport_event }))
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(
        &mut self,
        deadline: Option<SimInstant>,
    ) -> Result<Option<DriverEvent>, Self::Error> {
        self.next_event(deadline)
    }

    async fn open_transport(&mut self, transport: TransportId) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.opens.push(transport);
        state.current = Some(transport);
        state.writable = false;
        if state.auto_open {
            state.script.push_front(SimStep::Open);
        }
        Ok(())
    }

    fn write(&mut self, transport: TransportId, payload: String) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if state.current != Some(transport) || !state.writable {
            return Err(SimDriverError(format!("transport {transport} is not writable")));
        }
        state.writes.push((transport, payload));
        Ok(())
    }

    fn close_transport(&mut self, transport: TransportId, reason: &str) {
        let mut state = self.lock();
        state.closes.push((transport, reason.to_string()));
        if state.current == Some(transport) {
            state.writable = false;
        }
    }

    async fn fetch_history(
        &mut self,
        _user: &str,
        peer: &str,
    ) -> Result<Vec<ChatMessage>, Self::Error> {
        match self.lock().histories.get(peer) {
            Some(Ok(messages)) => Ok(messages.clone()),
            Some(Err(error)) => Err(SimDriverError(error.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_contacts(&mut self, _user: &str) -> Result<Vec<Contact>, Self::Error> {
        match &self.lock().contacts {
            Some(Ok(contacts)) => Ok(contacts.clone()),
            Some(Err(error)) => Err(SimDriverError(error.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn verify_contact(&mut self, username: &str) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.verifications.push(username.to_string());
        match state.rejected_contacts.get(username) {
            Some(error) => Err(SimDriverError(error.clone())),
            None => Ok(()),
        }
    }

    fn now(&self) -> SimInstant {
        self.env.now()
    }

    fn render(&mut self, _app: &App) -> Result<(), Self::Error> {
        self.lock().renders += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().stopped = true;
    }
}

/// Drive `runtime` until it quits, checking `registry` after every step.
///
/// Tears the runtime down before returning, as [`Runtime::run`] does.
///
/// # Panics
///
/// Panics on the first invariant violation.
pub async fn run_checked(
    runtime: &mut Runtime<SimDriver>,
    registry: &InvariantRegistry,
) -> Result<(), SimDriverError> {
    let result = run_steps(runtime, registry).await;
    runtime.shutdown();
    result
}

async fn run_steps(
    runtime: &mut Runtime<SimDriver>,
    registry: &InvariantRegistry,
) -> Result<(), SimDriverError> {
    if runtime.start().await? {
        return Ok(());
    }
    registry.assert_all(&SystemSnapshot::capture(runtime.app(), runtime.bridge()), "after start");

    let mut step = 0usize;
    while !runtime.step().await? {
        step += 1;
        let snapshot = SystemSnapshot::capture(runtime.app(), runtime.bridge());
        registry.assert_all(&snapshot, &format!("after step {step}"));
    }
    Ok(())
}
