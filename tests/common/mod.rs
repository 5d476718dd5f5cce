//! Shared mocks for integration tests
//!
//! Mirrors the crate's own `cfg(test)` doubles, which are not visible from
//! here.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use rts_session::client::ClientOptions;
use rts_session::connection::{ConnectionOptions, ReconnectPolicy};
use rts_session::credentials::{Credentials, Role};
use rts_session::registry::{Track, TrackKind};
use rts_session::stats::StatsReport;
use rts_session::transport::{
    EngineError, EngineSink, MediaEngine, ServerEvent, SignalingCommand, SignalingTransport,
    TransportError,
};
use rts_session::SessionEvent;

pub const API_URL: &str = "https://director.example.com/api";

pub fn publisher_creds() -> Credentials {
    Credentials::publisher("stage", "publish-token", API_URL)
}

pub fn subscriber_creds() -> Credentials {
    Credentials::subscriber("stage", "account-1", API_URL)
}

pub fn fast_reconnect() -> ConnectionOptions {
    ConnectionOptions::default().reconnect_policy(
        ReconnectPolicy::default()
            .max_attempts(3)
            .initial_backoff(Duration::from_millis(10))
            .max_backoff(Duration::from_millis(40)),
    )
}

/// Signaling transport that logs command boundaries
#[derive(Default)]
pub struct MockTransport {
    log: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    rejections: Mutex<VecDeque<String>>,
    open_failures: Mutex<VecDeque<TransportError>>,
    channel: Mutex<Option<mpsc::Sender<ServerEvent>>>,
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every command takes this long to be answered
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Reject the next command with `reason`
    pub fn reject_next(&self, reason: &str) {
        self.rejections.lock().push_back(reason.to_string());
    }

    /// Fail the next `count` opens as unreachable
    pub fn fail_opens(&self, count: usize) {
        let mut failures = self.open_failures.lock();
        for _ in 0..count {
            failures.push_back(TransportError::Unreachable("connection refused".into()));
        }
    }

    pub async fn push(&self, event: ServerEvent) {
        let tx = self.channel.lock().clone();
        if let Some(tx) = tx {
            tx.send(event).await.expect("channel open");
        }
    }

    /// Simulate the network dropping the channel
    pub fn drop_channel(&self) {
        self.channel.lock().take();
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.log
            .lock()
            .iter()
            .filter_map(|entry| entry.strip_prefix("start:").map(str::to_string))
            .collect()
    }
}

fn describe(command: &SignalingCommand) -> String {
    match command {
        SignalingCommand::Project { source_id, .. } => format!("project:{source_id}"),
        SignalingCommand::Unproject { mids } => format!("unproject:{}", mids.join(",")),
        SignalingCommand::Select { layer: Some(layer) } => format!("select:{layer}"),
        SignalingCommand::Select { layer: None } => "select:auto".to_string(),
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
        if let Some(err) = self.open_failures.lock().pop_front() {
            return Err(err);
        }
        let (tx, rx) = mpsc::channel(64);
        *self.channel.lock() = Some(tx);
        Ok(rx)
    }

    async fn request(&self, command: SignalingCommand) -> Result<(), TransportError> {
        let name = describe(&command);
        self.log.lock().push(format!("start:{name}"));

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.log.lock().push(format!("end:{name}"));
        match self.rejections.lock().pop_front() {
            Some(reason) => Err(TransportError::CommandRejected(reason)),
            None => Ok(()),
        }
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.channel.lock().take();
    }
}

/// Media engine handing out sequential mids
#[derive(Default)]
pub struct MockEngine {
    sink: Mutex<Option<EngineSink>>,
    stats: Mutex<Option<StatsReport>>,
    next_mid: AtomicUsize,
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
    pub polls: AtomicUsize,
    pub toggles: Mutex<Vec<(String, bool)>>,
    /// Track ids handed to the last `start`
    pub local_tracks: Mutex<Vec<String>>,
    /// `add:<id>` / `remove:<id>` requests made while running
    pub local_requests: Mutex<Vec<String>>,
}

impl MockEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sink handed over by the last `start`
    pub fn sink(&self) -> EngineSink {
        self.sink.lock().clone().expect("engine started")
    }

    pub fn set_stats(&self, report: StatsReport) {
        *self.stats.lock() = Some(report);
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

/// Wait for the first event matching `pred`, skipping others
pub async fn wait_for<F>(events: &mut mpsc::UnboundedReceiver<SessionEvent>, mut pred: F) -> SessionEvent
where
    F: FnMut(&SessionEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(30), async {
        loop {
            let event = events.recv().await.expect("event stream open");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("event not received in time")
}

/// Drain everything currently buffered
pub fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}
