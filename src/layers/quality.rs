//! Viewer-facing quality choices derived from active layers

use std::cmp::Ordering;
use std::collections::BTreeMap;

use super::layer::LayerDescriptor;

/// Quality a viewer can pick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoQuality {
    /// Let the server choose
    Auto,
    High(LayerDescriptor),
    Medium(LayerDescriptor),
    Low(LayerDescriptor),
}

impl VideoQuality {
    /// Layer to select, `None` for automatic
    pub fn layer(&self) -> Option<&LayerDescriptor> {
        match self {
            VideoQuality::Auto => None,
            VideoQuality::High(layer) | VideoQuality::Medium(layer) | VideoQuality::Low(layer) => {
                Some(layer)
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VideoQuality::Auto => "Auto",
            VideoQuality::High(_) => "High",
            VideoQuality::Medium(_) => "Medium",
            VideoQuality::Low(_) => "Low",
        }
    }
}

/// Build the quality choices for one transceiver's active layers.
///
/// Simulcast encodings win over SVC layers when both are present. Each
/// encoding (or spatial layer) contributes its highest temporal layer; the
/// three best candidates become High/Medium/Low.
pub fn quality_ladder(active: &[LayerDescriptor]) -> Vec<VideoQuality> {
    let mut candidates = if active.iter().any(LayerDescriptor::is_simulcast) {
        best_temporal_per(active.iter().filter(|l| l.is_simulcast()), |l| {
            GroupKey::Encoding(l.encoding_id.clone())
        })
    } else {
        best_temporal_per(active.iter().filter(|l| l.spatial_layer_id.is_some()), |l| {
            GroupKey::Spatial(l.spatial_layer_id.unwrap_or_default())
        })
    };

    candidates.sort_by(best_first);
    candidates.truncate(3);

    let mut ladder = vec![VideoQuality::Auto];
    match candidates.len() {
        2 => {
            let mut it = candidates.into_iter();
            ladder.extend(it.next().map(VideoQuality::High));
            ladder.extend(it.next().map(VideoQuality::Low));
        }
        3 => {
            let mut it = candidates.into_iter();
            ladder.extend(it.next().map(VideoQuality::High));
            ladder.extend(it.next().map(VideoQuality::Medium));
            ladder.extend(it.next().map(VideoQuality::Low));
        }
        _ => {}
    }
    ladder
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum GroupKey {
    Encoding(String),
    Spatial(u8),
}

fn best_temporal_per<'a>(
    layers: impl Iterator<Item = &'a LayerDescriptor>,
    key: impl Fn(&LayerDescriptor) -> GroupKey,
) -> Vec<LayerDescriptor> {
    let mut groups: BTreeMap<GroupKey, &LayerDescriptor> = BTreeMap::new();
    for layer in layers {
        groups
            .entry(key(layer))
            .and_modify(|best| {
                if layer.temporal_layer_id > best.temporal_layer_id {
                    *best = layer;
                }
            })
            .or_insert(layer);
    }
    groups.into_values().cloned().collect()
}

fn best_first(a: &LayerDescriptor, b: &LayerDescriptor) -> Ordering {
    let pixels = |l: &LayerDescriptor| l.resolution.map(|r| r.pixels()).unwrap_or(0);
    pixels(b)
        .cmp(&pixels(a))
        .then_with(|| b.bitrate.cmp(&a.bitrate))
}
