//! Layer and projection descriptors

use std::fmt;

use crate::registry::TrackKind;

/// Frame size of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Pixel count, used for ordering
    pub fn pixels(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A simulcast encoding or SVC layer advertised by the server
///
/// Simulcast layers carry a non-empty `encoding_id`; SVC layers are told
/// apart by their spatial layer ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerDescriptor {
    /// Simulcast encoding ID, empty for pure SVC layers
    pub encoding_id: String,
    /// SVC spatial layer
    pub spatial_layer_id: Option<u8>,
    /// SVC temporal layer
    pub temporal_layer_id: Option<u8>,
    /// Bitrate in bits per second
    pub bitrate: u64,
    /// Frame size, when known
    pub resolution: Option<Resolution>,
}

impl LayerDescriptor {
    /// Layer for a simulcast encoding
    pub fn simulcast(encoding_id: impl Into<String>) -> Self {
        Self {
            encoding_id: encoding_id.into(),
            spatial_layer_id: None,
            temporal_layer_id: None,
            bitrate: 0,
            resolution: None,
        }
    }

    /// SVC layer without a simulcast encoding
    pub fn svc(spatial_layer_id: u8, temporal_layer_id: u8) -> Self {
        Self {
            encoding_id: String::new(),
            spatial_layer_id: Some(spatial_layer_id),
            temporal_layer_id: Some(temporal_layer_id),
            bitrate: 0,
            resolution: None,
        }
    }

    pub fn with_temporal(mut self, temporal_layer_id: u8) -> Self {
        self.temporal_layer_id = Some(temporal_layer_id);
        self
    }

    pub fn with_spatial(mut self, spatial_layer_id: u8) -> Self {
        self.spatial_layer_id = Some(spatial_layer_id);
        self
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.resolution = Some(Resolution::new(width, height));
        self
    }

    /// Same layer, ignoring bitrate and resolution
    pub fn matches(&self, other: &LayerDescriptor) -> bool {
        self.encoding_id == other.encoding_id
            && self.spatial_layer_id == other.spatial_layer_id
            && self.temporal_layer_id == other.temporal_layer_id
    }

    /// Whether this is a simulcast encoding
    pub fn is_simulcast(&self) -> bool {
        !self.encoding_id.is_empty()
    }
}

impl fmt::Display for LayerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoding = if self.encoding_id.is_empty() {
            "-"
        } else {
            &self.encoding_id
        };
        write!(f, "{encoding}")?;
        if let Some(spatial) = self.spatial_layer_id {
            write!(f, "/s{spatial}")?;
        }
        if let Some(temporal) = self.temporal_layer_id {
            write!(f, "/t{temporal}")?;
        }
        Ok(())
    }
}

/// Maps one track of a remote source onto a local transceiver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionRequest {
    /// Source publishing the track
    pub source_id: String,
    /// Track ID within the source
    pub track_id: String,
    /// Media kind of the track
    pub media: TrackKind,
    /// Local transceiver to project into
    pub mid: String,
    /// Layer to project, `None` for automatic
    pub layer: Option<LayerDescriptor>,
}

impl ProjectionRequest {
    pub fn new(
        source_id: impl Into<String>,
        track_id: impl Into<String>,
        media: TrackKind,
        mid: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            track_id: track_id.into(),
            media,
            mid: mid.into(),
            layer: None,
        }
    }

    pub fn with_layer(mut self, layer: LayerDescriptor) -> Self {
        self.layer = Some(layer);
        self
    }
}
