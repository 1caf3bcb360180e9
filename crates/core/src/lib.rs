//! Strata Core - Startup Sequencing and Scene Logic
//!
//! Everything in the AR viewer that is not a browser call lives here:
//! the permission gate, camera capture sequencing, the scene graph, the
//! orientation controller and the render loop.
//!
//! # Platform Rules
//!
//! 1. No `web-sys` - Browser access goes through the host traits
//! 2. Single-threaded - `Rc`/`RefCell` only, nothing is `Send`
//! 3. Steps return `Result` - Alerts are raised by `startup`, not by steps

pub mod bootstrap;
pub mod camera;
pub mod capture;
pub mod config;
pub mod orientation;
pub mod permission;
pub mod render_loop;
pub mod scene;
pub mod startup;

pub use bootstrap::{bootstrap, AssetError, AssetLoader, DownloadBuffer, LoadProgress, Viewport};
pub use camera::PerspectiveCamera;
pub use capture::{CaptureConstraints, CaptureError, CaptureHandle, CaptureHost};
pub use config::{ConfigError, ViewerConfig};
pub use orientation::{OrientationControls, OrientationReading, OrientationSource};
pub use permission::{ConsentHost, GateError, GateOutcome, PermissionGate, PermissionState, SensorKind};
pub use render_loop::{FrameRenderer, FrameScheduler, RenderLoop};
pub use scene::{ModelNode, ModelSlot, SceneError, SceneGraph, Transform};
pub use startup::{Launch, Notifier, Startup, StartupError};

/// A failure reported by a platform capability call (a thrown JS exception,
/// a missing API, ...). Carries the platform's own description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

impl PlatformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
