//! Frame presentation
//!
//! Every JPEG payload becomes a [`DisplayResource`] with its own handle. The
//! presenter keeps one handle per camera view and revokes the previous one
//! whenever a new frame is installed, so a surface never holds more than one
//! live resource per view.

use super::CameraView;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Handle to an installed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(Uuid);

impl FrameHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// A frame ready for display
#[derive(Debug, Clone)]
pub struct DisplayResource {
    pub handle: FrameHandle,
    pub view: CameraView,
    pub mime_type: &'static str,
    pub bytes: Arc<[u8]>,
    pub received_at: DateTime<Utc>,
}

/// Where frames are displayed
pub trait FrameSurface: Send + Sync {
    /// Show `resource` in its view, replacing any placeholder
    fn install(&self, resource: DisplayResource);

    /// Release a resource previously installed
    fn revoke(&self, handle: FrameHandle);

    /// Show the "no signal" placeholder for a view
    fn show_placeholder(&self, view: CameraView);
}

/// Converts incoming payloads into displayed resources, one slot per view
pub struct FramePresenter {
    surface: Arc<dyn FrameSurface>,
    slots: HashMap<CameraView, FrameHandle>,
    connected: bool,
}

impl FramePresenter {
    pub fn new(surface: Arc<dyn FrameSurface>) -> Self {
        Self {
            surface,
            slots: HashMap::new(),
            connected: false,
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Display `bytes` in `view`. Returns `None` when not connected.
    pub fn present(&mut self, view: CameraView, bytes: Vec<u8>) -> Option<FrameHandle> {
        if !self.connected {
            tracing::trace!("Dropping {} frame while disconnected", view);
            return None;
        }

        if !bytes.starts_with(&[0xFF, 0xD8]) {
            tracing::debug!("{} frame does not start with a JPEG marker", view);
        }

        let resource = DisplayResource {
            handle: FrameHandle::new(),
            view,
            mime_type: "image/jpeg",
            bytes: bytes.into(),
            received_at: Utc::now(),
        };
        let handle = resource.handle;

        self.surface.install(resource);
        if let Some(previous) = self.slots.insert(view, handle) {
            self.surface.revoke(previous);
        }

        Some(handle)
    }

    /// Revoke the current frame of `view` and show its placeholder
    pub fn clear(&mut self, view: CameraView) {
        if let Some(handle) = self.slots.remove(&view) {
            self.surface.revoke(handle);
        }
        self.surface.show_placeholder(view);
    }

    pub fn clear_all(&mut self) {
        for view in CameraView::ALL {
            self.clear(view);
        }
    }

    /// Handle currently shown in `view`
    pub fn current(&self, view: CameraView) -> Option<FrameHandle> {
        self.slots.get(&view).copied()
    }
}

/// In-memory surface that keeps the live resource of each view.
///
/// A host UI polls [`MemorySurface::latest`]; tests inspect revocations.
#[derive(Default)]
pub struct MemorySurface {
    live: Mutex<HashMap<FrameHandle, DisplayResource>>,
    shown: Mutex<HashMap<CameraView, FrameHandle>>,
    revoked: Mutex<Vec<FrameHandle>>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame currently displayed in `view`
    pub fn latest(&self, view: CameraView) -> Option<DisplayResource> {
        let handle = *self.shown.lock().get(&view)?;
        self.live.lock().get(&handle).cloned()
    }

    /// Number of resources installed but not yet revoked
    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }

    pub fn revoked(&self) -> Vec<FrameHandle> {
        self.revoked.lock().clone()
    }

    pub fn shows_placeholder(&self, view: CameraView) -> bool {
        !self.shown.lock().contains_key(&view)
    }
}

impl FrameSurface for MemorySurface {
    fn install(&self, resource: DisplayResource) {
        self.shown.lock().insert(resource.view, resource.handle);
        self.live.lock().insert(resource.handle, resource);
    }

    fn revoke(&self, handle: FrameHandle) {
        if self.live.lock().remove(&handle).is_some() {
            self.revoked.lock().push(handle);
        }
    }

    fn show_placeholder(&self, view: CameraView) {
        self.shown.lock().remove(&view);
    }
}
