//! Process-wide runtime handle
//!
//! Owns the collaborators shared by every session (how signaling channels
//! and media engines are created) and releases them exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;

use crate::client::{Publisher, Subscriber};
use crate::credentials::Role;
use crate::error::{Error, Result};
use crate::transport::{MediaEngine, SignalingTransport};

/// Factory for the external collaborators of a session
#[async_trait]
pub trait EngineBinding: Send + Sync + 'static {
    /// Signaling channel for a new session
    fn signaling(&self, role: Role) -> Arc<dyn SignalingTransport>;

    /// Media engine for a new session
    fn media_engine(&self, role: Role) -> Arc<dyn MediaEngine>;

    /// Release process-wide resources. Called once, on shutdown.
    async fn release(&self);
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns false if a global subscriber was already set.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}

/// Explicit handle for process-wide setup and teardown
pub struct Runtime {
    binding: Arc<dyn EngineBinding>,
    shut_down: AtomicBool,
}

impl Runtime {
    /// Create a runtime without touching logging
    pub fn new(binding: Arc<dyn EngineBinding>) -> Self {
        Self {
            binding,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Install logging, then create the runtime
    pub fn init(binding: Arc<dyn EngineBinding>) -> Self {
        init_tracing();
        tracing::info!(version = env!("CARGO_PKG_VERSION"), "Runtime initialized");
        Self::new(binding)
    }

    /// Create a publisher
    pub fn publisher(&self) -> Result<Publisher> {
        self.ensure_running()?;
        Ok(Publisher::new(
            self.binding.signaling(Role::Publisher),
            self.binding.media_engine(Role::Publisher),
        ))
    }

    /// Create a subscriber
    pub fn subscriber(&self) -> Result<Subscriber> {
        self.ensure_running()?;
        Ok(Subscriber::new(
            self.binding.signaling(Role::Subscriber),
            self.binding.media_engine(Role::Subscriber),
        ))
    }

    /// Release shared resources. Later calls are no-ops.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.binding.release().await;
        tracing::info!("Runtime shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            Err(Error::InvalidState("runtime is shut down"))
        } else {
            Ok(())
        }
    }
}
