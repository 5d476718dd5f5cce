//! Periodic stats collection
//!
//! The aggregator owns the "latest report" slot in the session's
//! [`MediaState`](crate::state::MediaState). Reports are swapped in whole,
//! so a reader sees either the previous snapshot or the new one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::report::{Stats, StatsKind, StatsReport};
use crate::session::events::{EventBus, SessionEvent};
use crate::state::{self, SharedState};
use crate::transport::MediaEngine;

/// Collects stats reports and publishes them as events
///
/// Cheap to clone.
#[derive(Clone)]
pub struct StatsAggregator {
    shared: Arc<Shared>,
}

struct Shared {
    state: SharedState,
    events: EventBus,
    enabled: AtomicBool,
    active: AtomicBool,
}

impl StatsAggregator {
    /// Create an aggregator with its own state slot
    pub fn new(events: EventBus) -> Self {
        Self::with_state(state::shared(), events)
    }

    /// Create an aggregator storing reports in an existing session state
    pub fn with_state(state: SharedState, events: EventBus) -> Self {
        Self {
            shared: Arc::new(Shared {
                state,
                events,
                enabled: AtomicBool::new(false),
                active: AtomicBool::new(false),
            }),
        }
    }

    /// Turn collection on or off. The last report is kept either way.
    pub fn enable(&self, enabled: bool) {
        let previous = self.shared.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            tracing::debug!(enabled, "Stats collection toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    /// Mark whether the session is publishing/subscribed
    pub fn set_active(&self, active: bool) {
        self.shared.active.store(active, Ordering::SeqCst);
    }

    /// Enabled and the session is live
    pub fn is_collecting(&self) -> bool {
        self.is_enabled() && self.shared.active.load(Ordering::SeqCst)
    }

    /// Store a new report and emit it
    pub fn on_report(&self, report: StatsReport) -> Arc<StatsReport> {
        let report = Arc::new(report);
        self.shared.state.lock().stats = Some(Arc::clone(&report));

        tracing::trace!(records = report.len(), "Stats report stored");
        self.shared
            .events
            .emit(SessionEvent::StatsReport(Arc::clone(&report)));
        report
    }

    /// Store a report pushed by the engine, unless collection is off
    pub fn on_sample(&self, report: StatsReport) -> Option<Arc<StatsReport>> {
        self.is_collecting().then(|| self.on_report(report))
    }

    /// Most recent report
    pub fn latest(&self) -> Option<Arc<StatsReport>> {
        self.shared.state.lock().stats.clone()
    }

    /// Records of one kind from the most recent report
    pub fn stats_of_type(&self, kind: StatsKind) -> Vec<Stats> {
        match self.latest() {
            Some(report) => report.stats_of_type(kind).into_iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Record by ID from the most recent report
    pub fn get(&self, id: &str) -> Option<Stats> {
        self.latest()?.get(id).cloned()
    }

    /// Poll the engine every `interval` while collecting, until `cancel` fires
    pub fn spawn_collector(
        &self,
        engine: Arc<dyn MediaEngine>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let aggregator = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if !aggregator.is_collecting() {
                    continue;
                }

                let report = tokio::select! {
                    _ = cancel.cancelled() => break,
                    report = engine.collect_stats() => report,
                };
                if let Some(report) = report {
                    aggregator.on_report(report);
                }
            }

            tracing::debug!("Stats collector stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::thread;

    use super::*;
    use crate::registry::TrackKind;
    use crate::stats::report::{InboundRtpStats, StatsRecord};
    use crate::transport::mock::MockEngine;

    fn report_with(n: usize) -> StatsReport {
        (0..n)
            .map(|i| {
                Stats::new(
                    format!("IT{i}"),
                    n as u64,
                    StatsRecord::InboundRtp(InboundRtpStats::new(TrackKind::Video)),
                )
            })
            .collect()
    }

    #[test]
    fn test_disabled_keeps_last_report() {
        let aggregator = StatsAggregator::new(EventBus::new());
        aggregator.enable(true);
        aggregator.set_active(true);

        aggregator.on_sample(report_with(2));
        aggregator.enable(false);
        assert!(aggregator.on_sample(report_with(5)).is_none());

        assert_eq!(aggregator.latest().unwrap().len(), 2);
        assert_eq!(aggregator.stats_of_type(StatsKind::InboundRtp).len(), 2);
        assert!(aggregator.stats_of_type(StatsKind::Codec).is_empty());
        assert!(aggregator.get("IT1").is_some());
    }

    #[tokio::test]
    async fn test_report_emitted() {
        let events = EventBus::new();
        let mut rx = events.subscribe();
        let aggregator = StatsAggregator::new(events);

        aggregator.on_report(report_with(1));

        assert!(matches!(rx.recv().await, Some(SessionEvent::StatsReport(r)) if r.len() == 1));
    }

    #[test]
    fn test_replacement_is_atomic_for_readers() {
        let aggregator = StatsAggregator::new(EventBus::new());
        aggregator.on_report(report_with(1));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let aggregator = aggregator.clone();
                thread::spawn(move || {
                    for _ in 0..2_000 {
                        let report = aggregator.latest().unwrap();
                        // Every record of a report carries the report's size as timestamp
                        let size = report.len() as u64;
                        assert!(report.iter().all(|s| s.timestamp_us == size));
                    }
                })
            })
            .collect();

        for n in 2..200 {
            aggregator.on_report(report_with(n % 7 + 1));
        }

        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_collector_polls_only_while_collecting() {
        let engine = MockEngine::new();
        *engine.stats.lock() = Some(report_with(3));
        let aggregator = StatsAggregator::new(EventBus::new());
        let cancel = CancellationToken::new();

        let task = aggregator.spawn_collector(engine.clone(), Duration::from_millis(100), cancel.clone());

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(engine.polls.load(Ordering::SeqCst), 0);
        assert!(aggregator.latest().is_none());

        aggregator.enable(true);
        aggregator.set_active(true);
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(engine.polls.load(Ordering::SeqCst) >= 2);
        assert_eq!(aggregator.latest().unwrap().len(), 3);

        cancel.cancel();
        task.await.unwrap();
    }
}
