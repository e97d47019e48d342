//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: connection bridge
//! - [`Driver`]: Platform-specific I/O
//!
//! Every state machine mutation happens synchronously inside one loop
//! iteration. The only suspension points are [`Driver::poll_event`] and the
//! REST calls.

use parley_core::{ConnectionAction, ConnectionConfig};

use crate::{App, AppAction, AppEvent, Bridge, Driver, DriverEvent};

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
pub struct Runtime<D>
where
    D: Driver,
{
    driver: D,
    app: App,
    bridge: Bridge<D::Instant>,
}

impl<D> Runtime<D>
where
    D: Driver,
{
    /// Create a new runtime for the logged-in user `local`.
    pub fn new(driver: D, local: impl Into<String>, config: ConnectionConfig) -> Self {
        let local = local.into();
        let app = App::new(local.clone());
        let bridge = Bridge::new(local, config);
        Self { driver, app, bridge }
    }

    /// Run the main event loop until the user quits or the driver fails.
    ///
    /// The connection is always torn down before returning, including on
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver encounters a fatal I/O error.
    pub async fn run(&mut self) -> Result<(), D::Error> {
        let result = self.run_until_quit().await;
        self.shutdown();
        result
    }

    async fn run_until_quit(&mut self) -> Result<(), D::Error> {
        if self.start().await? {
            return Ok(());
        }
        while !self.step().await? {}
        Ok(())
    }

    /// Render once and open the first transport.
    ///
    /// Returns `true` if the application should quit.
    pub async fn start(&mut self) -> Result<bool, D::Error> {
        self.driver.render(&self.app)?;
        let now = self.driver.now();
        let events = self.bridge.connect(now);
        self.dispatch(events).await
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    pub async fn step(&mut self) -> Result<bool, D::Error> {
        let deadline = self.bridge.next_deadline();
        let polled = self.driver.poll_event(deadline).await?;
        let now = self.driver.now();

        let events = match polled {
            Some(DriverEvent::App(event)) => {
                let actions = self.app.handle(event);
                if self.process_actions(actions).await? {
                    return Ok(true);
                }
                Vec::new()
            },
            Some(DriverEvent::Transport { transport, event }) => {
                self.bridge.handle_transport(transport, event, now)
            },
            None => Vec::new(),
        };
        if self.dispatch(events).await? {
            return Ok(true);
        }

        let events = self.bridge.handle_tick(now);
        self.dispatch(events).await
    }

    /// Tear the connection down, forget the session and stop the driver.
    pub fn shutdown(&mut self) {
        let _ = self.bridge.teardown();
        for action in self.bridge.take_outgoing() {
            if let ConnectionAction::Close { transport, reason } = action {
                self.driver.close_transport(transport, &reason);
            }
        }
        self.app.reset();
        self.driver.stop();
    }

    /// Feed bridge events to the App after executing queued transport I/O.
    ///
    /// Returns `true` if should quit.
    async fn dispatch(&mut self, mut events: Vec<AppEvent>) -> Result<bool, D::Error> {
        events.extend(self.flush_outgoing().await?);
        for event in events {
            let actions = self.app.handle(event);
            if self.process_actions(actions).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                let events = match action {
                    AppAction::Render => {
                        self.driver.render(&self.app)?;
                        continue;
                    },
                    AppAction::Quit => return Ok(true),
                    AppAction::FetchHistory { user, peer } => {
                        vec![self.fetch_history(&user, peer).await]
                    },
                    AppAction::FetchContacts { user } => vec![self.fetch_contacts(&user).await],
                    AppAction::VerifyContact { username } => {
                        vec![self.verify_contact(username).await]
                    },

                    // Connection operations go through the bridge
                    AppAction::SendChat { .. } | AppAction::Announce => {
                        let mut events = self.bridge.process_app_action(action);
                        events.extend(self.flush_outgoing().await?);
                        events
                    },
                };

                for event in events {
                    pending_actions.extend(self.app.handle(event));
                }
            }
        }
        Ok(false)
    }

    async fn fetch_history(&mut self, user: &str, peer: String) -> AppEvent {
        match self.driver.fetch_history(user, &peer).await {
            Ok(messages) => AppEvent::HistoryLoaded { peer, messages },
            Err(e) => {
                tracing::warn!(%peer, error = %e, "history fetch failed");
                AppEvent::HistoryFailed { peer, message: e.to_string() }
            },
        }
    }

    async fn verify_contact(&mut self, username: String) -> AppEvent {
        match self.driver.verify_contact(&username).await {
            Ok(()) => AppEvent::ContactVerified { username },
            Err(e) => {
                tracing::warn!(%username, error = %e, "contact verification failed");
                AppEvent::ContactRejected { username, message: e.to_string() }
            },
        }
    }

    async fn fetch_contacts(&mut self, user: &str) -> AppEvent {
        match self.driver.fetch_contacts(user).await {
            Ok(contacts) => AppEvent::ContactsLoaded { contacts },
            Err(e) => {
                tracing::warn!(error = %e, "contact fetch failed");
                AppEvent::ContactsFailed { message: e.to_string() }
            },
        }
    }

    /// Execute queued transport I/O.
    ///
    /// Returns events for writes the driver refused.
    async fn flush_outgoing(&mut self) -> Result<Vec<AppEvent>, D::Error> {
        let mut failures = Vec::new();

        for action in self.bridge.take_outgoing() {
            match action {
                ConnectionAction::Open { transport } => {
                    self.driver.open_transport(transport).await?;
                },
                ConnectionAction::Write { transport, payload } => {
                    if let Err(e) = self.driver.write(transport, payload) {
                        tracing::warn!(%transport, error = %e, "write dropped");
                        failures.push(AppEvent::SendFailed {
                            message: e.to_string(),
                            retryable: false,
                        });
                    }
                },
                ConnectionAction::Close { transport, reason } => {
                    self.driver.close_transport(transport, &reason);
                },
                ConnectionAction::Deliver(inbound) => {
                    tracing::warn!(?inbound, "unexpected delivery in outgoing queue");
                },
            }
        }

        Ok(failures)
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a reference to the Bridge
    pub fn bridge(&self) -> &Bridge<D::Instant> {
        &self.bridge
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
