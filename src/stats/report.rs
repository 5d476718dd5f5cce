//! Typed statistics records and the report that groups them
//!
//! Field names follow the WebRTC stats identifiers. Times are in seconds
//! unless the name says otherwise.

use std::collections::HashMap;
use std::fmt;

use crate::registry::TrackKind;

/// Kind of a stats record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatsKind {
    Codec,
    OutboundRtp,
    InboundRtp,
    RemoteInboundRtp,
    RemoteOutboundRtp,
    MediaTrack,
    AudioTrack,
    VideoTrack,
    MediaSource,
}

impl StatsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatsKind::Codec => "codec",
            StatsKind::OutboundRtp => "outbound-rtp",
            StatsKind::InboundRtp => "inbound-rtp",
            StatsKind::RemoteInboundRtp => "remote-inbound-rtp",
            StatsKind::RemoteOutboundRtp => "remote-outbound-rtp",
            StatsKind::MediaTrack => "track",
            StatsKind::AudioTrack => "audio-track",
            StatsKind::VideoTrack => "video-track",
            StatsKind::MediaSource => "media-source",
        }
    }
}

impl fmt::Display for StatsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecStats {
    pub mime_type: String,
    pub payload_type: u8,
    pub clock_rate: u32,
    pub channels: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRtpStats {
    pub kind: TrackKind,
    pub mid: Option<String>,
    pub codec_id: Option<String>,
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frames_per_second: f64,
    pub target_bitrate: f64,
    pub quality_limitation_reason: Option<String>,
}

impl OutboundRtpStats {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            mid: None,
            codec_id: None,
            bytes_sent: 0,
            packets_sent: 0,
            frame_width: 0,
            frame_height: 0,
            frames_per_second: 0.0,
            target_bitrate: 0.0,
            quality_limitation_reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundRtpStats {
    pub kind: TrackKind,
    pub mid: Option<String>,
    pub codec_id: Option<String>,
    pub decoder_implementation: Option<String>,
    pub bytes_received: u64,
    pub packets_received: u64,
    pub packets_lost: i64,
    pub jitter: f64,
    pub nack_count: u64,
    pub frames_received: u64,
    pub frames_decoded: u64,
    pub frames_dropped: u64,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frames_per_second: f64,
    pub total_processing_delay: f64,
    pub total_decode_time: f64,
    pub jitter_buffer_delay: f64,
    pub jitter_buffer_target_delay: f64,
    pub jitter_buffer_minimum_delay: f64,
    pub jitter_buffer_emitted_count: u64,
    pub audio_level: f64,
    pub total_audio_energy: f64,
    pub total_samples_duration: f64,
}

impl InboundRtpStats {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            kind,
            mid: None,
            codec_id: None,
            decoder_implementation: None,
            bytes_received: 0,
            packets_received: 0,
            packets_lost: 0,
            jitter: 0.0,
            nack_count: 0,
            frames_received: 0,
            frames_decoded: 0,
            frames_dropped: 0,
            frame_width: 0,
            frame_height: 0,
            frames_per_second: 0.0,
            total_processing_delay: 0.0,
            total_decode_time: 0.0,
            jitter_buffer_delay: 0.0,
            jitter_buffer_target_delay: 0.0,
            jitter_buffer_minimum_delay: 0.0,
            jitter_buffer_emitted_count: 0,
            audio_level: 0.0,
            total_audio_energy: 0.0,
            total_samples_duration: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteInboundRtpStats {
    pub kind: Option<TrackKind>,
    pub round_trip_time: f64,
    pub fraction_lost: f64,
    pub packets_lost: i64,
    pub jitter: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteOutboundRtpStats {
    pub kind: Option<TrackKind>,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub remote_timestamp_us: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaTrackStats {
    pub track_identifier: String,
    pub kind: Option<TrackKind>,
    pub remote_source: bool,
    pub ended: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioTrackStats {
    pub track_identifier: String,
    pub audio_level: f64,
    pub total_audio_energy: f64,
    pub total_samples_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoTrackStats {
    pub track_identifier: String,
    pub frame_width: u32,
    pub frame_height: u32,
    pub frames_per_second: f64,
    pub frames_received: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaSourceStats {
    pub track_identifier: String,
    pub kind: Option<TrackKind>,
    pub audio_level: Option<f64>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frames_per_second: Option<f64>,
}

/// Payload of a stats record, one variant per [`StatsKind`]
#[derive(Debug, Clone, PartialEq)]
pub enum StatsRecord {
    Codec(CodecStats),
    OutboundRtp(OutboundRtpStats),
    InboundRtp(InboundRtpStats),
    RemoteInboundRtp(RemoteInboundRtpStats),
    RemoteOutboundRtp(RemoteOutboundRtpStats),
    MediaTrack(MediaTrackStats),
    AudioTrack(AudioTrackStats),
    VideoTrack(VideoTrackStats),
    MediaSource(MediaSourceStats),
}

impl StatsRecord {
    pub fn kind(&self) -> StatsKind {
        match self {
            StatsRecord::Codec(_) => StatsKind::Codec,
            StatsRecord::OutboundRtp(_) => StatsKind::OutboundRtp,
            StatsRecord::InboundRtp(_) => StatsKind::InboundRtp,
            StatsRecord::RemoteInboundRtp(_) => StatsKind::RemoteInboundRtp,
            StatsRecord::RemoteOutboundRtp(_) => StatsKind::RemoteOutboundRtp,
            StatsRecord::MediaTrack(_) => StatsKind::MediaTrack,
            StatsRecord::AudioTrack(_) => StatsKind::AudioTrack,
            StatsRecord::VideoTrack(_) => StatsKind::VideoTrack,
            StatsRecord::MediaSource(_) => StatsKind::MediaSource,
        }
    }
}

/// A single stats record
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    /// Stats ID, unique within a report
    pub id: String,
    /// Sample time in microseconds
    pub timestamp_us: u64,
    pub record: StatsRecord,
}

impl Stats {
    pub fn new(id: impl Into<String>, timestamp_us: u64, record: StatsRecord) -> Self {
        Self {
            id: id.into(),
            timestamp_us,
            record,
        }
    }

    pub fn kind(&self) -> StatsKind {
        self.record.kind()
    }
}

/// Snapshot of every stats record at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsReport {
    stats: HashMap<String, Stats>,
}

impl StatsReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, replacing any with the same ID
    pub fn insert(&mut self, stats: Stats) {
        self.stats.insert(stats.id.clone(), stats);
    }

    /// Builder form of [`insert`](Self::insert)
    pub fn with(mut self, stats: Stats) -> Self {
        self.insert(stats);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Stats> {
        self.stats.get(id)
    }

    /// Records of one kind, ordered by ID
    pub fn stats_of_type(&self, kind: StatsKind) -> Vec<&Stats> {
        let mut matching: Vec<_> = self.stats.values().filter(|s| s.kind() == kind).collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        matching
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stats> {
        self.stats.values()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

impl FromIterator<Stats> for StatsReport {
    fn from_iter<I: IntoIterator<Item = Stats>>(iter: I) -> Self {
        let mut report = StatsReport::new();
        for stats in iter {
            report.insert(stats);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_of_type_filters_and_orders() {
        let report: StatsReport = vec![
            Stats::new("IT02", 10, StatsRecord::InboundRtp(InboundRtpStats::new(TrackKind::Video))),
            Stats::new("C01", 10, StatsRecord::Codec(CodecStats::default())),
            Stats::new("IT01", 10, StatsRecord::InboundRtp(InboundRtpStats::new(TrackKind::Audio))),
        ]
        .into_iter()
        .collect();

        let inbound: Vec<_> = report
            .stats_of_type(StatsKind::InboundRtp)
            .into_iter()
            .map(|s| s.id.as_str())
            .collect();

        assert_eq!(inbound, vec!["IT01", "IT02"]);
        assert!(report.stats_of_type(StatsKind::MediaSource).is_empty());
        assert_eq!(report.get("C01").unwrap().kind(), StatsKind::Codec);
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let mut report = StatsReport::new();
        report.insert(Stats::new("T1", 1, StatsRecord::MediaTrack(MediaTrackStats::default())));
        report.insert(Stats::new("T1", 2, StatsRecord::MediaTrack(MediaTrackStats::default())));

        assert_eq!(report.len(), 1);
        assert_eq!(report.get("T1").unwrap().timestamp_us, 2);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(StatsKind::RemoteInboundRtp.to_string(), "remote-inbound-rtp");
        assert_eq!(StatsKind::MediaSource.as_str(), "media-source");
    }
}
