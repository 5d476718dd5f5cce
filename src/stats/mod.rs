//! Session statistics

pub mod aggregator;
pub mod report;
pub mod summary;

pub use aggregator::StatsAggregator;
pub use report::{
    AudioTrackStats, CodecStats, InboundRtpStats, MediaSourceStats, MediaTrackStats,
    OutboundRtpStats, RemoteInboundRtpStats, RemoteOutboundRtpStats, Stats, StatsKind,
    StatsRecord, StatsReport, VideoTrackStats,
};
pub use summary::{InboundSummary, OutboundSummary, StreamStatistics};
