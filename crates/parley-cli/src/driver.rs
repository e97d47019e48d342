//! Line terminal driver.
//!
//! Implements the [`Driver`] trait for a plain terminal: commands and
//! messages are read line by line, the conversation is printed
//! incrementally, the socket is a tokio-tungstenite transport and history
//! and contacts come from the REST API.

use std::{
    collections::{HashMap, VecDeque},
    io::{self, Write},
    time::Instant,
};

use parley_app::{App, AppEvent, Driver, DriverEvent, TransportEvent};
use parley_client::{
    ApiClient, ApiError, HistoryWindow, SystemEnv, TransportError, TransportHandle, transport,
};
use parley_core::{Environment, TransportId};
use parley_proto::{ChatMessage, Contact};
use thiserror::Error;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin},
    sync::mpsc,
};

use crate::{input, render::Renderer};

/// Transport events buffered between the socket tasks and the event loop.
const EVENT_CAPACITY: usize = 256;

/// Line driver errors.
#[derive(Debug, Error)]
pub enum LineDriverError {
    /// I/O error reading input or writing output.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// API error.
    #[error("api error: {0}")]
    Api(#[from] ApiError),

    /// Write to a transport this driver never opened or already closed.
    #[error("no transport {0}")]
    UnknownTransport(TransportId),
}

/// Line terminal driver implementing the [`Driver`] trait.
///
/// Generic over the input reader and output writer so tests can script a
/// session; [`LineDriver::stdio`] wires it to the real terminal.
pub struct LineDriver<R, W> {
    env: SystemEnv,
    ws_url: String,
    api: ApiClient,
    input: Lines<R>,
    input_closed: bool,
    queued: VecDeque<AppEvent>,
    out: W,
    renderer: Renderer,
    events_tx: mpsc::Sender<(TransportId, TransportEvent)>,
    events_rx: mpsc::Receiver<(TransportId, TransportEvent)>,
    transports: HashMap<TransportId, TransportHandle>,
}

impl LineDriver<BufReader<Stdin>, io::Stdout> {
    /// Driver reading stdin and printing to stdout.
    pub fn stdio(ws_url: impl Into<String>, api: ApiClient) -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), io::stdout(), ws_url, api)
    }
}

impl<R, W> LineDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    /// Create a driver over `input` and `out`.
    pub fn new(input: R, out: W, ws_url: impl Into<String>, api: ApiClient) -> Self {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CAPACITY);
        Self {
            env: SystemEnv::new(),
            ws_url: ws_url.into(),
            api,
            input: input.lines(),
            input_closed: false,
            queued: VecDeque::new(),
            out,
            renderer: Renderer::new(),
            events_tx,
            events_rx,
            transports: HashMap::new(),
        }
    }

    /// Handle `event` before reading any input.
    pub fn queue(&mut self, event: AppEvent) {
        self.queued.push_back(event);
    }

    /// Output writer.
    pub fn output(&self) -> &W {
        &self.out
    }
}

impl<R, W> Driver for LineDriver<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    type Error = LineDriverError;
    type Instant = Instant;

    async fn poll_event(&mut self, deadline: Option<Instant>) -> Result<Option<DriverEvent>, Self::Error> {
        if let Some(event) = self.queued.pop_front() {
            return Ok(Some(DriverEvent::App(event)));
        }

        let env = self.env;
        let wait = deadline.map(|deadline| env.until(deadline));
        let timer = async move {
            match wait {
                Some(duration) => env.sleep(duration).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            Some((transport, event)) = self.events_rx.recv() => {
                Ok(Some(DriverEvent::Transport { transport, event }))
            },

            line = self.input.next_line(), if !self.input_closed => match line? {
                Some(line) => Ok(Some(DriverEvent::App(input::parse(&line)))),
                None => {
                    // End of input
                    self.input_closed = true;
                    Ok(Some(DriverEvent::App(AppEvent::Quit)))
                },
            },

            () = timer => Ok(None),
        }
    }

    async fn open_transport(&mut self, transport: TransportId) -> Result<(), Self::Error> {
        self.transports.retain(|_, handle| !handle.is_finished());

        tracing::debug!(%transport, url = %self.ws_url, "opening transport");
        let handle = transport::open(&self.ws_url, transport, self.events_tx.clone());
        self.transports.insert(transport, handle);
        Ok(())
    }

    fn write(&mut self, transport: TransportId, payload: String) -> Result<(), Self::Error> {
        let handle =
            self.transports.get(&transport).ok_or(LineDriverError::UnknownTransport(transport))?;
        handle.write(payload)?;
        Ok(())
    }

    fn close_transport(&mut self, transport: TransportId, reason: &str) {
        if let Some(handle) = self.transports.remove(&transport) {
            handle.close(reason);
        }
    }

    async fn fetch_history(&mut self, user: &str, peer: &str) -> Result<Vec<ChatMessage>, Self::Error> {
        Ok(self.api.chat_history(user, peer, HistoryWindow::default()).await?)
    }

    async fn fetch_contacts(&mut self, user: &str) -> Result<Vec<Contact>, Self::Error> {
        Ok(self.api.contact_list(user).await?)
    }

    async fn verify_contact(&mut self, username: &str) -> Result<(), Self::Error> {
        Ok(self.api.verify_contact(username).await?)
    }

    fn now(&self) -> Instant {
        self.env.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.renderer.render(app, &mut self.out)?;
        Ok(())
    }

    fn stop(&mut self) {
        for (_, handle) in self.transports.drain() {
            handle.close("shutdown");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn driver(input: &'static [u8]) -> LineDriver<&'static [u8], Vec<u8>> {
        LineDriver::new(input, Vec::new(), "ws://127.0.0.1:9/ws", ApiClient::new("http://127.0.0.1:9"))
    }

    #[tokio::test]
    async fn lines_become_app_events() {
        let mut driver = driver(b"/peer bob\nhello\n");

        assert_eq!(
            driver.poll_event(None).await.unwrap(),
            Some(DriverEvent::App(AppEvent::SelectPeer { peer: "bob".into() }))
        );
        assert_eq!(
            driver.poll_event(None).await.unwrap(),
            Some(DriverEvent::App(AppEvent::Compose { text: "hello".into() }))
        );
    }

    #[tokio::test]
    async fn end_of_input_quits() {
        let mut driver = driver(b"");
        assert_eq!(driver.poll_event(None).await.unwrap(), Some(DriverEvent::App(AppEvent::Quit)));
    }

    #[tokio::test]
    async fn queued_events_come_first() {
        let mut driver = driver(b"/contacts\n");
        driver.queue(AppEvent::SelectPeer { peer: "carol".into() });

        assert_eq!(
            driver.poll_event(None).await.unwrap(),
            Some(DriverEvent::App(AppEvent::SelectPeer { peer: "carol".into() }))
        );
        assert_eq!(
            driver.poll_event(None).await.unwrap(),
            Some(DriverEvent::App(AppEvent::RequestContacts))
        );
    }

    #[tokio::test]
    async fn deadline_wakes_without_input() {
        let mut driver = driver(b"");
        let _ = driver.poll_event(None).await.unwrap();

        let deadline = driver.now() + Duration::from_millis(20);
        assert_eq!(driver.poll_event(Some(deadline)).await.unwrap(), None);
        assert!(driver.now() >= deadline);
    }

    #[tokio::test]
    async fn write_to_unknown_transport_fails() {
        let mut driver = driver(b"");
        let err = driver.write(TransportId::new(1), "{}".into()).unwrap_err();
        assert!(matches!(err, LineDriverError::UnknownTransport(_)));
    }

    #[tokio::test]
    async fn render_prints_status() {
        let mut driver = driver(b"");
        let mut app = App::new("alice");
        let _ = app.handle(AppEvent::Error { message: "boom".into() });

        driver.render(&app).unwrap();
        assert_eq!(String::from_utf8(driver.output().clone()).unwrap(), "* Error: boom\n");
    }
}
