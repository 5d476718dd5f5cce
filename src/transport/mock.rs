//! In-memory transport and engine for unit tests
//!
//! Integration tests under `tests/` cannot see `cfg(test)` items, so they
//! carry their own doubles in `tests/common`. Keeping these out of the
//! public API means the two copies exist; their shared surface (`sink()`,
//! `starts`, `stops`, `polls`, `toggles`, `local_tracks`, `local_requests`)
//! uses the same names and behaviour.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::engine::{EngineError, EngineSink, MediaEngine};
use super::signaling::{ServerEvent, SignalingCommand, SignalingTransport, TransportError};
use crate::client::ClientOptions;
use crate::credentials::{Credentials, Role};
use crate::registry::{Track, TrackKind};
use crate::stats::StatsReport;

/// Transport that opens instantly and records every command
#[derive(Default)]
pub struct MockTransport {
    pub commands: Mutex<Vec<SignalingCommand>>,
    pub replies: Mutex<VecDeque<Result<(), TransportError>>>,
    pub delay: Mutex<Option<Duration>>,
    channel: Mutex<Option<mpsc::Sender<ServerEvent>>>,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the reply to the next command. Unqueued commands succeed.
    pub fn reply(&self, reply: Result<(), TransportError>) {
        self.replies.lock().push_back(reply);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Push a server event into the open channel
    pub async fn push(&self, event: ServerEvent) {
        let tx = self.channel.lock().clone();
        if let Some(tx) = tx {
            let _ = tx.send(event).await;
        }
    }

    /// Simulate an unexpected drop
    pub fn drop_channel(&self) {
        self.channel.lock().take();
    }

    pub fn sent(&self) -> Vec<SignalingCommand> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl SignalingTransport for MockTransport {
    async fn open(
        &self,
        _credentials: &Credentials,
        _role: Role,
    ) -> Result<mpsc::Receiver<ServerEvent>, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(32);
        *self.channel.lock() = Some(tx);
        Ok(rx)
    }

    async fn request(&self, command: SignalingCommand) -> Result<(), TransportError> {
        self.commands.lock().push(command);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.replies.lock().pop_front().unwrap_or(Ok(()))
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.channel.lock().take();
    }
}

/// Engine that hands out sequential mids and canned stats
#[derive(Default)]
pub struct MockEngine {
    pub sink: Mutex<Option<EngineSink>>,
    pub stats: Mutex<Option<StatsReport>>,
    pub fail_start: AtomicBool,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub polls: AtomicUsize,
    pub toggles: Mutex<Vec<(String, bool)>>,
    /// Track ids handed to the last `start`
    pub local_tracks: Mutex<Vec<String>>,
    /// `add:<id>` / `remove:<id>` requests made while running
    pub local_requests: Mutex<Vec<String>>,
    next_mid: AtomicUsize,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sink handed over by the last `start`
    pub fn sink(&self) -> EngineSink {
        self.sink.lock().clone().expect("engine started")
    }
}

#[async_trait]
impl MediaEngine for MockEngine {
    async fn start(
        &self,
        _role: Role,
        _options: &ClientOptions,
        local_tracks: &[Track],
        sink: EngineSink,
    ) -> Result<(), EngineError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.local_tracks.lock() = local_tracks.iter().map(|t| t.id.clone()).collect();
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(EngineError::Negotiation("offer rejected".into()));
        }
        *self.sink.lock() = Some(sink);
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    async fn add_remote_track(&self, _kind: TrackKind) -> Result<String, EngineError> {
        Ok(self.next_mid.fetch_add(1, Ordering::SeqCst).to_string())
    }

    fn add_local_track(&self, track: &Track) {
        self.local_requests.lock().push(format!("add:{}", track.id));
    }

    fn remove_local_track(&self, track_id: &str) {
        self.local_requests.lock().push(format!("remove:{track_id}"));
    }

    fn set_track_enabled(&self, track_id: &str, enabled: bool) {
        self.toggles.lock().push((track_id.to_string(), enabled));
    }

    async fn collect_stats(&self) -> Option<StatsReport> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.stats.lock().clone()
    }
}
