//! Projection and layer selection for a subscriber session
//!
//! Tracks what the server advertises per transceiver and turns the
//! application's projection and selection calls into signaling commands.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use super::layer::{LayerDescriptor, ProjectionRequest};
use super::quality::{quality_ladder, VideoQuality};
use crate::connection::ConnectionManager;
use crate::error::{Error, Result, ValidationError};
use crate::session::events::{EventBus, SessionEvent};
use crate::transport::SignalingCommand;

/// Layers advertised for one transceiver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MidLayers {
    pub active: Vec<LayerDescriptor>,
    pub inactive: Vec<LayerDescriptor>,
}

/// Where a layer stands among the advertised ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Availability {
    Active,
    Inactive,
    Unknown,
}

#[derive(Default)]
struct Inner {
    layers: HashMap<String, MidLayers>,
    pinned: Option<LayerDescriptor>,
    projections: HashMap<String, ProjectionRequest>,
}

impl Inner {
    fn availability(&self, layer: &LayerDescriptor) -> Availability {
        let mut seen_inactive = false;
        for mid in self.layers.values() {
            if mid.active.iter().any(|l| l.matches(layer)) {
                return Availability::Active;
            }
            seen_inactive |= mid.inactive.iter().any(|l| l.matches(layer));
        }
        if seen_inactive {
            Availability::Inactive
        } else {
            Availability::Unknown
        }
    }
}

/// Layer/projection controller
pub struct LayerController {
    connection: ConnectionManager,
    events: EventBus,
    inner: Mutex<Inner>,
}

impl LayerController {
    pub fn new(connection: ConnectionManager, events: EventBus) -> Self {
        Self {
            connection,
            events,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Project a source's tracks onto local transceivers.
    ///
    /// Sent as one command; the server accepts or rejects the whole mapping.
    pub async fn project(&self, source_id: &str, mapping: Vec<ProjectionRequest>) -> Result<()> {
        if mapping.is_empty() {
            return Err(ValidationError::EmptyProjection.into());
        }
        let mut mids = HashSet::with_capacity(mapping.len());
        for request in &mapping {
            if request.mid.trim().is_empty() {
                return Err(ValidationError::MissingField("mid").into());
            }
            if !mids.insert(request.mid.as_str()) {
                return Err(ValidationError::DuplicateMid(request.mid.clone()).into());
            }
        }

        tracing::debug!(source = %source_id, tracks = mapping.len(), "Projecting source");

        self.connection
            .request(SignalingCommand::Project {
                source_id: source_id.to_string(),
                mapping: mapping.clone(),
            })
            .await?;

        let mut inner = self.inner.lock();
        for request in mapping {
            inner.projections.insert(request.mid.clone(), request);
        }
        Ok(())
    }

    /// Release transceivers from their projections
    pub async fn unproject(&self, mids: Vec<String>) -> Result<()> {
        if mids.is_empty() {
            return Err(ValidationError::EmptyProjection.into());
        }
        if mids.iter().any(|mid| mid.trim().is_empty()) {
            return Err(ValidationError::MissingField("mid").into());
        }

        self.connection
            .request(SignalingCommand::Unproject { mids: mids.clone() })
            .await?;

        let mut inner = self.inner.lock();
        for mid in &mids {
            inner.projections.remove(mid);
        }
        Ok(())
    }

    /// Pin a layer, or return to automatic selection with `None`
    pub async fn select(&self, layer: Option<LayerDescriptor>) -> Result<()> {
        if let Some(layer) = &layer {
            match self.inner.lock().availability(layer) {
                Availability::Active => {}
                Availability::Inactive => return Err(Error::InvalidLayer(layer.to_string())),
                Availability::Unknown => return Err(Error::LayerUnavailable(layer.to_string())),
            }
        }

        self.connection
            .request(SignalingCommand::Select {
                layer: layer.clone(),
            })
            .await?;

        match &layer {
            Some(layer) => tracing::debug!(layer = %layer, "Layer pinned"),
            None => tracing::debug!("Automatic layer selection"),
        }
        self.inner.lock().pinned = layer;
        Ok(())
    }

    /// Apply a layer availability update from the server
    pub fn on_layers(&self, mid: String, active: Vec<LayerDescriptor>, inactive: Vec<LayerDescriptor>) {
        let cleared = {
            let mut inner = self.inner.lock();
            inner.layers.insert(
                mid.clone(),
                MidLayers {
                    active: active.clone(),
                    inactive: inactive.clone(),
                },
            );

            let unpinned = inner
                .pinned
                .as_ref()
                .is_some_and(|pinned| inner.availability(pinned) != Availability::Active);
            if unpinned {
                inner.pinned.take()
            } else {
                None
            }
        };

        self.events.emit(SessionEvent::Layers {
            mid,
            active,
            inactive,
        });

        if let Some(layer) = cleared {
            tracing::info!(layer = %layer, "Pinned layer went inactive");
            self.events.emit(SessionEvent::LayerPinCleared(layer));
        }
    }

    /// Active layers last advertised for a transceiver
    pub fn active_layers(&self, mid: &str) -> Vec<LayerDescriptor> {
        self.inner
            .lock()
            .layers
            .get(mid)
            .map(|layers| layers.active.clone())
            .unwrap_or_default()
    }

    /// Quality choices for a transceiver
    pub fn qualities(&self, mid: &str) -> Vec<VideoQuality> {
        quality_ladder(&self.active_layers(mid))
    }

    /// Currently pinned layer
    pub fn pinned_layer(&self) -> Option<LayerDescriptor> {
        self.inner.lock().pinned.clone()
    }

    /// Current projections, keyed by mid
    pub fn projections(&self) -> HashMap<String, ProjectionRequest> {
        self.inner.lock().projections.clone()
    }

    /// Forget all layer, pin and projection state
    pub fn reset(&self) {
        *self.inner.lock() = Inner::default();
    }
}
