//! Human-oriented summary of a stats report
//!
//! Flattens the raw records into per-stream figures a stats overlay can
//! show directly: delays normalised to milliseconds per frame, resolved
//! codec names, round-trip time.

use std::fmt;

use super::report::{InboundRtpStats, OutboundRtpStats, StatsKind, StatsRecord, StatsReport};
use crate::registry::TrackKind;

/// Summary of one inbound RTP stream
#[derive(Debug, Clone, PartialEq)]
pub struct InboundSummary {
    pub kind: TrackKind,
    pub mid: Option<String>,
    pub codec_id: Option<String>,
    /// Codec mime type, resolved through `codec_id`
    pub codec_name: Option<String>,
    pub decoder: Option<String>,
    pub frame_width: u32,
    pub frame_height: u32,
    pub fps: f64,
    pub bytes_received: u64,
    pub packets_received: u64,
    pub packets_lost: i64,
    pub frames_received: u64,
    pub frames_decoded: u64,
    pub frames_dropped: u64,
    pub nack_count: u64,
    /// Jitter in milliseconds
    pub jitter_ms: f64,
    /// Average processing delay per decoded frame, ms
    pub processing_delay_ms: f64,
    /// Average decode time per decoded frame, ms
    pub decode_time_ms: f64,
    /// Average jitter buffer delay per emitted sample, ms
    pub jitter_buffer_delay_ms: f64,
    pub jitter_buffer_target_delay_ms: f64,
    pub jitter_buffer_minimum_delay_ms: f64,
    pub audio_level: f64,
    pub total_audio_energy: f64,
    pub timestamp_us: u64,
}

impl InboundSummary {
    fn new(stats: &InboundRtpStats, timestamp_us: u64, codec_name: Option<String>) -> Self {
        Self {
            kind: stats.kind,
            mid: stats.mid.clone(),
            codec_id: stats.codec_id.clone(),
            codec_name,
            decoder: stats.decoder_implementation.clone(),
            frame_width: stats.frame_width,
            frame_height: stats.frame_height,
            fps: stats.frames_per_second,
            bytes_received: stats.bytes_received,
            packets_received: stats.packets_received,
            packets_lost: stats.packets_lost,
            frames_received: stats.frames_received,
            frames_decoded: stats.frames_decoded,
            frames_dropped: stats.frames_dropped,
            nack_count: stats.nack_count,
            jitter_ms: stats.jitter * 1000.0,
            processing_delay_ms: per_unit_ms(stats.total_processing_delay, stats.frames_decoded),
            decode_time_ms: per_unit_ms(stats.total_decode_time, stats.frames_decoded),
            jitter_buffer_delay_ms: per_unit_ms(
                stats.jitter_buffer_delay,
                stats.jitter_buffer_emitted_count,
            ),
            jitter_buffer_target_delay_ms: per_unit_ms(
                stats.jitter_buffer_target_delay,
                stats.jitter_buffer_emitted_count,
            ),
            jitter_buffer_minimum_delay_ms: per_unit_ms(
                stats.jitter_buffer_minimum_delay,
                stats.jitter_buffer_emitted_count,
            ),
            audio_level: stats.audio_level,
            total_audio_energy: stats.total_audio_energy,
            timestamp_us,
        }
    }

    /// Resolution as "W x H"
    pub fn resolution(&self) -> String {
        format!("{} x {}", self.frame_width, self.frame_height)
    }
}

/// Summary of one outbound RTP stream
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundSummary {
    pub kind: TrackKind,
    pub mid: Option<String>,
    pub codec_name: Option<String>,
    pub frame_width: u32,
    pub frame_height: u32,
    pub fps: f64,
    pub bytes_sent: u64,
    pub packets_sent: u64,
    /// Encoder target in bits per second
    pub target_bitrate: f64,
    pub quality_limitation_reason: Option<String>,
}

impl OutboundSummary {
    fn new(stats: &OutboundRtpStats, codec_name: Option<String>) -> Self {
        Self {
            kind: stats.kind,
            mid: stats.mid.clone(),
            codec_name,
            frame_width: stats.frame_width,
            frame_height: stats.frame_height,
            fps: stats.frames_per_second,
            bytes_sent: stats.bytes_sent,
            packets_sent: stats.packets_sent,
            target_bitrate: stats.target_bitrate,
            quality_limitation_reason: stats.quality_limitation_reason.clone(),
        }
    }
}

/// Per-stream statistics derived from a [`StatsReport`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamStatistics {
    /// Round-trip time in milliseconds, from the first remote-inbound record
    pub round_trip_time_ms: Option<f64>,
    pub video: Vec<InboundSummary>,
    pub audio: Vec<InboundSummary>,
    pub outbound: Vec<OutboundSummary>,
}

impl StreamStatistics {
    /// Summarise a report
    pub fn from_report(report: &StatsReport) -> Self {
        let codec_name = |codec_id: &Option<String>| {
            let id = codec_id.as_deref()?;
            match &report.get(id)?.record {
                StatsRecord::Codec(codec) => Some(codec.mime_type.clone()),
                _ => None,
            }
        };

        let round_trip_time_ms = report
            .stats_of_type(StatsKind::RemoteInboundRtp)
            .into_iter()
            .find_map(|s| match &s.record {
                StatsRecord::RemoteInboundRtp(remote) => Some(remote.round_trip_time * 1000.0),
                _ => None,
            });

        let mut summary = StreamStatistics {
            round_trip_time_ms,
            ..Default::default()
        };

        for stats in report.stats_of_type(StatsKind::InboundRtp) {
            if let StatsRecord::InboundRtp(inbound) = &stats.record {
                let entry = InboundSummary::new(inbound, stats.timestamp_us, codec_name(&inbound.codec_id));
                match inbound.kind {
                    TrackKind::Video => summary.video.push(entry),
                    TrackKind::Audio => summary.audio.push(entry),
                }
            }
        }

        for stats in report.stats_of_type(StatsKind::OutboundRtp) {
            if let StatsRecord::OutboundRtp(outbound) = &stats.record {
                summary
                    .outbound
                    .push(OutboundSummary::new(outbound, codec_name(&outbound.codec_id)));
            }
        }

        summary
    }

    /// Video summary for a transceiver
    pub fn video_for_mid(&self, mid: &str) -> Option<&InboundSummary> {
        self.video.iter().find(|s| s.mid.as_deref() == Some(mid))
    }

    /// Audio summary for a transceiver
    pub fn audio_for_mid(&self, mid: &str) -> Option<&InboundSummary> {
        self.audio.iter().find(|s| s.mid.as_deref() == Some(mid))
    }

    /// Total bytes received across all inbound streams
    pub fn bytes_received(&self) -> u64 {
        self.video
            .iter()
            .chain(self.audio.iter())
            .map(|s| s.bytes_received)
            .sum()
    }
}

impl fmt::Display for StreamStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.round_trip_time_ms {
            Some(rtt) => write!(f, "rtt={rtt:.0}ms")?,
            None => write!(f, "rtt=n/a")?,
        }
        for video in &self.video {
            write!(
                f,
                " video[{}]={} {:.0}fps",
                video.mid.as_deref().unwrap_or("?"),
                video.resolution(),
                video.fps
            )?;
        }
        write!(f, " audio={}", self.audio.len())
    }
}

fn per_unit_ms(total_seconds: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_seconds * 1000.0 / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::report::{CodecStats, RemoteInboundRtpStats, Stats};

    fn sample_report() -> StatsReport {
        let mut video = InboundRtpStats::new(TrackKind::Video);
        video.mid = Some("0".into());
        video.codec_id = Some("COT01_96".into());
        video.frame_width = 1280;
        video.frame_height = 720;
        video.frames_decoded = 100;
        video.total_decode_time = 0.5;
        video.jitter = 0.004;
        video.bytes_received = 1_000;

        let mut audio = InboundRtpStats::new(TrackKind::Audio);
        audio.mid = Some("1".into());
        audio.bytes_received = 200;

        StatsReport::new()
            .with(Stats::new("RI1", 5, StatsRecord::RemoteInboundRtp(RemoteInboundRtpStats {
                round_trip_time: 0.042,
                ..Default::default()
            })))
            .with(Stats::new("IT01V", 5, StatsRecord::InboundRtp(video)))
            .with(Stats::new("IT01A", 5, StatsRecord::InboundRtp(audio)))
            .with(Stats::new("COT01_96", 5, StatsRecord::Codec(CodecStats {
                mime_type: "video/VP8".into(),
                payload_type: 96,
                clock_rate: 90_000,
                channels: None,
            })))
    }

    #[test]
    fn test_from_report() {
        let summary = StreamStatistics::from_report(&sample_report());

        assert_eq!(summary.round_trip_time_ms, Some(42.0));
        assert_eq!(summary.video.len(), 1);
        assert_eq!(summary.audio.len(), 1);

        let video = summary.video_for_mid("0").unwrap();
        assert_eq!(video.codec_name.as_deref(), Some("video/VP8"));
        assert_eq!(video.resolution(), "1280 x 720");
        assert!((video.decode_time_ms - 5.0).abs() < 1e-9);
        assert!((video.jitter_ms - 4.0).abs() < 1e-9);
        assert_eq!(video.jitter_buffer_delay_ms, 0.0);

        assert!(summary.audio_for_mid("1").is_some());
        assert!(summary.audio_for_mid("0").is_none());
        assert_eq!(summary.bytes_received(), 1_200);
    }

    #[test]
    fn test_empty_report() {
        let summary = StreamStatistics::from_report(&StatsReport::new());
        assert_eq!(summary, StreamStatistics::default());
        assert_eq!(summary.to_string(), "rtt=n/a audio=0");
    }
}
