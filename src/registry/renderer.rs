//! Frame renderers
//!
//! A renderer is anything that wants the frames of a track. The registry
//! only holds `Arc` handles, so attaching a renderer never transfers
//! ownership of it.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::frame::MediaFrame;

/// Receives frames for the tracks it is attached to
///
/// Called on the dispatching task; implementations must not block.
pub trait Renderer: Send + Sync {
    fn render(&self, frame: &MediaFrame);
}

/// Renderer that forwards frames into a channel
///
/// Useful for handing frames to another task or thread.
#[derive(Debug, Clone)]
pub struct ChannelRenderer {
    tx: mpsc::UnboundedSender<MediaFrame>,
}

impl ChannelRenderer {
    /// Create a renderer and the receiving end of its frames
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MediaFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl Renderer for ChannelRenderer {
    fn render(&self, frame: &MediaFrame) {
        let _ = self.tx.send(frame.clone());
    }
}

/// Compare renderer handles by identity
pub(crate) fn same_renderer(a: &Arc<dyn Renderer>, b: &Arc<dyn Renderer>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
