//! Connection manager
//!
//! Owns the signaling channel lifecycle: connect, disconnect, and the
//! auto-reconnect loop after an unexpected drop.
//!
//! ```text
//!  connect() ──► Connecting ──open ok──► Connected ◄──────────┐
//!                    │                       │ channel lost    │ open ok
//!                    │ rejected/exhausted    ▼                 │
//!                    └──────────────► Failed ◄── Reconnecting ─┘
//!                                                (backoff loop)
//! ```
//!
//! Every transition made by a connect cycle is checked against that cycle's
//! cancellation token under the manager lock, so a `disconnect` always wins
//! against a late handshake.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::ConnectionOptions;
use super::state::ConnectionState;
use crate::credentials::{Credentials, Role};
use crate::error::{Error, Result, NO_STATUS};
use crate::session::events::{EventBus, SessionEvent};
use crate::transport::{ServerEvent, SignalingCommand, SignalingTransport, TransportError};

/// Handle to a session's signaling connection
///
/// Cheap to clone; all clones drive the same channel.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

struct Shared {
    role: Role,
    transport: Arc<dyn SignalingTransport>,
    events: EventBus,
    state_tx: watch::Sender<ConnectionState>,
    server_tx: mpsc::UnboundedSender<ServerEvent>,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Cancellation for the current connect cycle
    cycle: Option<CancellationToken>,
    /// Channel watcher for the current cycle
    monitor: Option<JoinHandle<()>>,
    credentials: Option<Credentials>,
}

impl ConnectionManager {
    /// Create a manager.
    ///
    /// Returns the manager and a receiver for server events other than
    /// channel closure, which the manager handles itself.
    pub fn new(
        role: Role,
        transport: Arc<dyn SignalingTransport>,
        events: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        let shared = Arc::new(Shared {
            role,
            transport,
            events,
            state_tx,
            server_tx,
            inner: Mutex::new(Inner::default()),
        });

        (Self { shared }, server_rx)
    }

    /// Validate credentials and open the signaling channel.
    ///
    /// Validation failures are returned immediately and never retried.
    /// Transport failures are retried per the reconnect policy when
    /// `auto_reconnect` is set.
    pub async fn connect(&self, credentials: Credentials, options: ConnectionOptions) -> Result<()> {
        credentials.validate(self.shared.role)?;
        options.validate()?;

        let token = {
            let mut inner = self.shared.inner.lock();
            let state = self.shared.state();
            if !state.can_connect() {
                return Err(Error::State {
                    operation: "connect",
                    state,
                });
            }

            if let Some(stale) = inner.monitor.take() {
                stale.abort();
            }
            let token = CancellationToken::new();
            inner.cycle = Some(token.clone());
            inner.credentials = Some(credentials.clone());
            self.shared.apply(ConnectionState::Connecting);
            token
        };

        tracing::info!(
            role = %self.shared.role,
            stream = %credentials.stream_name,
            auto_reconnect = options.auto_reconnect,
            "Connecting"
        );

        let rx = self
            .shared
            .open_with_retry(&credentials, &options, &token, false)
            .await?;

        let monitor = tokio::spawn(Arc::clone(&self.shared).monitor(
            rx,
            token.clone(),
            credentials,
            options,
        ));

        let mut inner = self.shared.inner.lock();
        if token.is_cancelled() {
            monitor.abort();
            return Err(Error::Cancelled);
        }
        inner.monitor = Some(monitor);
        Ok(())
    }

    /// Close the signaling channel.
    ///
    /// A no-op while already disconnected. Cancels any connect or reconnect
    /// in progress; the pending `connect` call resolves with `Cancelled`.
    pub async fn disconnect(&self) -> Result<()> {
        let (monitor, had_channel) = {
            let mut inner = self.shared.inner.lock();
            let state = self.shared.state();
            if state == ConnectionState::Disconnected {
                return Ok(());
            }

            if let Some(token) = inner.cycle.take() {
                token.cancel();
            }
            let monitor = inner.monitor.take();
            self.shared.apply(ConnectionState::Disconnected);
            (monitor, state != ConnectionState::Failed)
        };

        if let Some(monitor) = monitor {
            let _ = monitor.await;
        }
        if had_channel {
            self.shared.transport.close().await;
        }

        tracing::info!(role = %self.shared.role, "Disconnected");
        self.shared.events.emit(SessionEvent::Disconnected);
        Ok(())
    }

    /// Send a command over the open channel
    pub async fn request(&self, command: SignalingCommand) -> Result<()> {
        let state = self.state();
        if !state.is_connected() {
            return Err(Error::State {
                operation: command.name(),
                state,
            });
        }

        tracing::debug!(role = %self.shared.role, command = command.name(), "Sending command");

        self.shared
            .transport
            .request(command)
            .await
            .map_err(|err| match err {
                TransportError::CommandRejected(reason) => Error::Negotiation(reason),
                other => Error::Connection {
                    status: other.status(),
                    reason: other.reason(),
                },
            })
    }

    /// Cancel everything without waiting. Used when the owner is dropped.
    pub fn abort(&self) {
        let mut inner = self.shared.inner.lock();
        if let Some(token) = inner.cycle.take() {
            token.cancel();
        }
        if let Some(monitor) = inner.monitor.take() {
            monitor.abort();
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    /// Watch connection state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Check if the channel is up
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Credentials of the current connect cycle
    pub fn credentials(&self) -> Option<Credentials> {
        self.shared.inner.lock().credentials.clone()
    }

    /// Session role
    pub fn role(&self) -> Role {
        self.shared.role
    }
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Apply a transition for a connect cycle. Ignored once the cycle is cancelled.
    fn transition(&self, token: &CancellationToken, next: ConnectionState) -> bool {
        let _inner = self.inner.lock();
        if token.is_cancelled() {
            return false;
        }
        self.apply(next)
    }

    /// Caller must hold `inner`.
    fn apply(&self, next: ConnectionState) -> bool {
        let current = self.state();
        if current == next {
            return true;
        }
        if !current.can_transition_to(next) {
            tracing::warn!(
                role = %self.role,
                from = %current,
                to = %next,
                "Ignoring illegal connection transition"
            );
            return false;
        }

        self.state_tx.send_replace(next);
        tracing::debug!(role = %self.role, from = %current, to = %next, "Connection state changed");
        self.events.emit(SessionEvent::StateChanged(next));
        true
    }

    async fn open_with_retry(
        &self,
        credentials: &Credentials,
        options: &ConnectionOptions,
        token: &CancellationToken,
        reconnecting: bool,
    ) -> Result<mpsc::Receiver<ServerEvent>> {
        let policy = &options.reconnect;
        let mut attempt: u32 = if reconnecting { 1 } else { 0 };

        if reconnecting && policy.max_attempts == 0 {
            return self.fail(token, &TransportError::Closed);
        }

        loop {
            if attempt > 0 {
                if reconnecting {
                    self.events.emit(SessionEvent::Reconnecting { attempt });
                }
                let delay = policy.backoff(attempt);
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(Error::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }

            let opened = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(Error::Cancelled),
                result = self.transport.open(credentials, self.role) => result,
            };

            match opened {
                Ok(rx) => {
                    if !self.transition(token, ConnectionState::Connected) {
                        self.transport.close().await;
                        return Err(Error::Cancelled);
                    }
                    tracing::info!(
                        role = %self.role,
                        stream = %credentials.stream_name,
                        attempt = attempt,
                        "Signaling channel open"
                    );
                    self.events.emit(SessionEvent::Connected);
                    return Ok(rx);
                }
                Err(err) => {
                    let retry = err.is_retryable()
                        && options.auto_reconnect
                        && attempt < policy.max_attempts;
                    if retry {
                        attempt += 1;
                        tracing::warn!(
                            role = %self.role,
                            error = %err,
                            next_attempt = attempt,
                            "Open failed, retrying"
                        );
                        continue;
                    }
                    return self.fail(token, &err);
                }
            }
        }
    }

    fn fail<T>(&self, token: &CancellationToken, err: &TransportError) -> Result<T> {
        if !self.transition(token, ConnectionState::Failed) {
            return Err(Error::Cancelled);
        }

        let (status, reason) = (err.status(), err.reason());
        tracing::error!(role = %self.role, status = status, reason = %reason, "Connection failed");
        self.events.emit(SessionEvent::ConnectionError {
            status,
            reason: reason.clone(),
        });
        Err(Error::Connection { status, reason })
    }

    /// Watch the open channel, forwarding server events and reconnecting on loss
    async fn monitor(
        self: Arc<Self>,
        mut rx: mpsc::Receiver<ServerEvent>,
        token: CancellationToken,
        credentials: Credentials,
        options: ConnectionOptions,
    ) {
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => return,
                event = rx.recv() => event,
            };

            let (status, reason) = match event {
                Some(ServerEvent::Closed { status, reason }) => (status, reason),
                Some(other) => {
                    let _ = self.server_tx.send(other);
                    continue;
                }
                None => (NO_STATUS, "signaling channel dropped".to_string()),
            };

            tracing::warn!(
                role = %self.role,
                status = status,
                reason = %reason,
                auto_reconnect = options.auto_reconnect,
                "Signaling channel lost"
            );

            if !options.auto_reconnect {
                if self.transition(&token, ConnectionState::Disconnected) {
                    self.events.emit(SessionEvent::Disconnected);
                }
                return;
            }

            if !self.transition(&token, ConnectionState::Reconnecting) {
                return;
            }

            match self
                .open_with_retry(&credentials, &options, &token, true)
                .await
            {
                Ok(next) => rx = next,
                Err(_) => return,
            }
        }
    }
}
