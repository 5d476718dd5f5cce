//! Simulcast/SVC layers and source projection

pub mod controller;
pub mod layer;
pub mod quality;

pub use controller::{LayerController, MidLayers};
pub use layer::{LayerDescriptor, ProjectionRequest, Resolution};
pub use quality::{quality_ladder, VideoQuality};
