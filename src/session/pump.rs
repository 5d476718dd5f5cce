//! Event pump
//!
//! One task per session drains the server event stream, the engine event
//! stream and connection state changes, and hands each item to the
//! session's [`EventHandler`]. The task only holds a weak reference to the
//! handler, so dropping the facade ends the pump.

use std::sync::Weak;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connection::ConnectionState;
use crate::transport::{ScopedEvent, ServerEvent};

/// Receives everything the pump drains
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn on_server_event(&self, event: ServerEvent);

    async fn on_engine_event(&self, event: ScopedEvent);

    async fn on_state(&self, state: ConnectionState);
}

/// Inputs of a session's pump
pub struct PumpInputs {
    pub server: mpsc::UnboundedReceiver<ServerEvent>,
    pub engine: mpsc::UnboundedReceiver<ScopedEvent>,
    pub state: watch::Receiver<ConnectionState>,
}

enum Input {
    Server(ServerEvent),
    Engine(ScopedEvent),
    State(ConnectionState),
}

/// Start the pump for `handler`
pub fn spawn<H: EventHandler>(
    handler: Weak<H>,
    inputs: PumpInputs,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let PumpInputs {
        mut server,
        mut engine,
        mut state,
    } = inputs;

    tokio::spawn(async move {
        loop {
            let input = tokio::select! {
                _ = cancel.cancelled() => break,
                Some(event) = server.recv() => Input::Server(event),
                Some(event) = engine.recv() => Input::Engine(event),
                Ok(()) = state.changed() => Input::State(*state.borrow_and_update()),
                else => break,
            };

            let Some(handler) = handler.upgrade() else {
                break;
            };

            match input {
                Input::Server(event) => handler.on_server_event(event).await,
                Input::Engine(event) => handler.on_engine_event(event).await,
                Input::State(state) => handler.on_state(state).await,
            }
        }

        tracing::trace!("Event pump stopped");
    })
}
