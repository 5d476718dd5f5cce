//! Publish/subscribe options

use std::time::Duration;

use crate::error::ValidationError;

/// What the encoder gives up first when bandwidth or CPU is short
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegradationPreference {
    /// Engine default
    #[default]
    Default,
    /// Never degrade
    Disabled,
    /// Drop framerate, keep resolution
    MaintainResolution,
    /// Drop resolution, keep framerate
    MaintainFramerate,
    /// Degrade both
    Balanced,
}

/// Bitrate limits for publishing, in kbps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BitrateSettings {
    /// Turn off bandwidth estimation
    pub disable_bwe: bool,
    pub min_kbps: Option<u32>,
    pub max_kbps: Option<u32>,
    pub start_kbps: Option<u32>,
}

impl BitrateSettings {
    fn validate(&self) -> Result<(), ValidationError> {
        if let (Some(min), Some(max)) = (self.min_kbps, self.max_kbps) {
            if min > max {
                return Err(invalid(
                    "bitrate",
                    format!("min {min} kbps exceeds max {max} kbps"),
                ));
            }
            if let Some(start) = self.start_kbps {
                if start < min || start > max {
                    return Err(invalid(
                        "bitrate",
                        format!("start {start} kbps outside [{min}, {max}]"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Options for `publish` and `subscribe`
///
/// Publisher-only and subscriber-only fields are ignored by the other role.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Source ID to publish under (multi-source streams)
    pub source_id: Option<String>,

    /// Source to receive in the main transceivers (subscribe)
    pub pinned_source_id: Option<String>,

    /// Sources the server should not forward (subscribe)
    pub excluded_source_ids: Vec<String>,

    /// Discontinuous transmission for audio (publish)
    pub dtx: bool,

    /// Number of audio transceivers for multiplexed sources (subscribe)
    pub multiplexed_audio_tracks: u32,

    /// Preferred video codec, e.g. "VP8" or "H264"
    pub video_codec: Option<String>,

    /// Preferred audio codec, e.g. "opus"
    pub audio_codec: Option<String>,

    pub degradation_preference: DegradationPreference,

    pub bitrate: BitrateSettings,

    /// Stereo audio (publish)
    pub stereo: bool,

    /// Interval of the stats collector
    pub stats_interval: Duration,

    /// Ask the server for a fixed playout delay (subscribe)
    pub force_playout_delay: bool,

    /// Minimum jitter buffer delay (subscribe)
    pub jitter_minimum_delay_ms: Option<u32>,

    /// Receive video only (subscribe)
    pub disable_audio: bool,

    /// Upper bound the server applies to forwarded video (subscribe)
    pub maximum_bitrate_kbps: Option<u32>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            source_id: None,
            pinned_source_id: None,
            excluded_source_ids: Vec::new(),
            dtx: false,
            multiplexed_audio_tracks: 0,
            video_codec: None,
            audio_codec: None,
            degradation_preference: DegradationPreference::Default,
            bitrate: BitrateSettings::default(),
            stereo: false,
            stats_interval: Duration::from_millis(1000),
            force_playout_delay: false,
            jitter_minimum_delay_ms: None,
            disable_audio: false,
            maximum_bitrate_kbps: None,
        }
    }
}

impl ClientOptions {
    /// Set the source ID
    pub fn source_id(mut self, id: impl Into<String>) -> Self {
        self.source_id = Some(id.into());
        self
    }

    /// Set the pinned source
    pub fn pinned_source(mut self, id: impl Into<String>) -> Self {
        self.pinned_source_id = Some(id.into());
        self
    }

    /// Exclude a source
    pub fn exclude_source(mut self, id: impl Into<String>) -> Self {
        self.excluded_source_ids.push(id.into());
        self
    }

    pub fn dtx(mut self, enabled: bool) -> Self {
        self.dtx = enabled;
        self
    }

    pub fn stereo(mut self, enabled: bool) -> Self {
        self.stereo = enabled;
        self
    }

    /// Set the number of multiplexed audio transceivers
    pub fn multiplexed_audio_tracks(mut self, count: u32) -> Self {
        self.multiplexed_audio_tracks = count;
        self
    }

    pub fn video_codec(mut self, codec: impl Into<String>) -> Self {
        self.video_codec = Some(codec.into());
        self
    }

    pub fn audio_codec(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = Some(codec.into());
        self
    }

    pub fn degradation_preference(mut self, preference: DegradationPreference) -> Self {
        self.degradation_preference = preference;
        self
    }

    /// Set bitrate limits
    pub fn bitrate(mut self, settings: BitrateSettings) -> Self {
        self.bitrate = settings;
        self
    }

    /// Set the stats collection interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    pub fn force_playout_delay(mut self, enabled: bool) -> Self {
        self.force_playout_delay = enabled;
        self
    }

    pub fn jitter_minimum_delay_ms(mut self, delay: u32) -> Self {
        self.jitter_minimum_delay_ms = Some(delay);
        self
    }

    /// Receive video only
    pub fn disable_audio(mut self) -> Self {
        self.disable_audio = true;
        self
    }

    pub fn maximum_bitrate_kbps(mut self, kbps: u32) -> Self {
        self.maximum_bitrate_kbps = Some(kbps);
        self
    }

    /// Check the options are consistent
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.bitrate.validate()?;

        if self.stats_interval.is_zero() {
            return Err(invalid("stats_interval", "must be greater than zero"));
        }

        for (field, codec) in [
            ("video_codec", &self.video_codec),
            ("audio_codec", &self.audio_codec),
        ] {
            if codec.as_deref().is_some_and(|c| c.trim().is_empty()) {
                return Err(invalid(field, "codec name is empty"));
            }
        }

        if let Some(pinned) = &self.pinned_source_id {
            if self.excluded_source_ids.contains(pinned) {
                return Err(invalid(
                    "excluded_source_ids",
                    format!("pinned source {pinned} is excluded"),
                ));
            }
        }

        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ValidationError {
    ValidationError::InvalidOption {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ClientOptions::default();

        assert_eq!(options.stats_interval, Duration::from_millis(1000));
        assert_eq!(options.degradation_preference, DegradationPreference::Default);
        assert!(options.excluded_source_ids.is_empty());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let options = ClientOptions::default()
            .source_id("cam1")
            .video_codec("H264")
            .stereo(true)
            .disable_audio()
            .maximum_bitrate_kbps(2_500);

        assert_eq!(options.source_id.as_deref(), Some("cam1"));
        assert_eq!(options.video_codec.as_deref(), Some("H264"));
        assert!(options.stereo);
        assert!(options.disable_audio);
        assert_eq!(options.maximum_bitrate_kbps, Some(2_500));
    }

    #[test]
    fn test_bitrate_validation() {
        let inverted = ClientOptions::default().bitrate(BitrateSettings {
            min_kbps: Some(3_000),
            max_kbps: Some(1_000),
            ..Default::default()
        });
        assert!(matches!(
            inverted.validate(),
            Err(ValidationError::InvalidOption { field: "bitrate", .. })
        ));

        let start_outside = ClientOptions::default().bitrate(BitrateSettings {
            min_kbps: Some(500),
            max_kbps: Some(1_000),
            start_kbps: Some(2_000),
            ..Default::default()
        });
        assert!(start_outside.validate().is_err());

        let ok = ClientOptions::default().bitrate(BitrateSettings {
            min_kbps: Some(500),
            max_kbps: Some(1_000),
            start_kbps: Some(800),
            disable_bwe: true,
        });
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_zero_stats_interval_rejected() {
        let options = ClientOptions::default().stats_interval(Duration::ZERO);
        assert!(matches!(
            options.validate(),
            Err(ValidationError::InvalidOption { field: "stats_interval", .. })
        ));
    }

    #[test]
    fn test_empty_codec_rejected() {
        let options = ClientOptions::default().audio_codec(" ");
        assert!(matches!(
            options.validate(),
            Err(ValidationError::InvalidOption { field: "audio_codec", .. })
        ));
    }

    #[test]
    fn test_pinned_source_cannot_be_excluded() {
        let options = ClientOptions::default()
            .pinned_source("main")
            .exclude_source("main");
        assert!(options.validate().is_err());

        let options = ClientOptions::default()
            .pinned_source("main")
            .exclude_source("backstage");
        assert!(options.validate().is_ok());
    }
}
