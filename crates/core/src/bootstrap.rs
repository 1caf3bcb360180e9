//! Scene bootstrap: lights, camera, controls, async model load, loop.

use std::future::Future;

use crate::camera::PerspectiveCamera;
use crate::config::{ModelPlacement, ViewerConfig};
use crate::orientation::{OrientationControls, OrientationSource};
use crate::render_loop::{FrameRenderer, RenderLoop};
use crate::scene::{ModelNode, ModelSlot, SceneGraph, Transform};

/// Drawing area in CSS pixels plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        if self.height > 0.0 {
            (self.width / self.height) as f32
        } else {
            1.0
        }
    }

    /// Backing-store size in device pixels, at least 1×1.
    pub fn physical_size(&self) -> (u32, u32) {
        let dpr = if self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        };
        (
            ((self.width * dpr).round() as u32).max(1),
            ((self.height * dpr).round() as u32).max(1),
        )
    }
}

/// Download progress of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    /// Unknown when the server sends no length.
    pub total: Option<u64>,
}

impl LoadProgress {
    pub fn percent(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.loaded as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

/// Body bytes collected chunk by chunk.
///
/// The announced length is only used for reporting; nothing is reserved up
/// front since the header can be wrong.
#[derive(Debug, Default)]
pub struct DownloadBuffer {
    bytes: Vec<u8>,
    total: Option<u64>,
}

impl DownloadBuffer {
    pub fn new(total: Option<u64>) -> Self {
        Self {
            bytes: Vec::new(),
            total,
        }
    }

    /// Append a chunk and return the progress so far.
    pub fn push(&mut self, chunk: &[u8]) -> LoadProgress {
        self.bytes.extend_from_slice(chunk);
        LoadProgress {
            loaded: self.bytes.len() as u64,
            total: self.total,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Error type for model loading.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to fetch {path}: {reason}")]
    Fetch { path: String, reason: String },

    #[error("HTTP {status} for {path}")]
    Status { path: String, status: u16 },

    #[error("Failed to decode model: {0}")]
    Decode(String),
}

/// Fetches and decodes a model.
#[allow(async_fn_in_trait)]
pub trait AssetLoader<M> {
    async fn load(
        &self,
        path: &str,
        on_progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<M, AssetError>;
}

/// Load the model and hand it to the render loop.
///
/// Failures are logged only: the scene stays empty.
pub async fn load_model<M, L: AssetLoader<M>>(
    loader: L,
    path: String,
    placement: ModelPlacement,
    slot: ModelSlot<M>,
) {
    let mut report = |progress: LoadProgress| match progress.percent() {
        Some(pct) => tracing::info!("{pct:.0}% loaded"),
        None => tracing::debug!("{} bytes loaded", progress.loaded),
    };

    match loader.load(&path, &mut report).await {
        Ok(mesh) => {
            let node = ModelNode {
                mesh,
                transform: Transform::from_placement(&placement),
            };
            if let Err(e) = slot.fill(node) {
                tracing::warn!("Model loaded twice: {e}");
            } else {
                tracing::info!("Model ready: {path}");
            }
        }
        Err(e) => tracing::error!("Model load error: {e}"),
    }
}

/// Build the scene and render loop, and the model load to run beside it.
///
/// The caller spawns the returned future and starts the loop right away;
/// the loop does not wait for the model.
pub fn bootstrap<M, R, S, L>(
    config: &ViewerConfig,
    viewport: Viewport,
    renderer: R,
    orientation: Option<S>,
    loader: L,
) -> (RenderLoop<M, R, S>, impl Future<Output = ()>)
where
    R: FrameRenderer<M>,
    S: OrientationSource,
    L: AssetLoader<M>,
{
    let camera = PerspectiveCamera::new(&config.camera, viewport.aspect());
    let scene = SceneGraph::new(&config.lighting, camera);
    let controls = orientation.map(OrientationControls::new);
    let slot = ModelSlot::new();

    tracing::info!(
        "Scene built: {}x{} @{}x, fov {}°",
        viewport.width,
        viewport.height,
        viewport.device_pixel_ratio,
        config.camera.fov_degrees
    );

    let load = load_model(
        loader,
        config.asset_path.clone(),
        config.model.clone(),
        slot.clone(),
    );
    let render_loop = RenderLoop::new(scene, renderer, controls, slot, config.spin_per_frame);

    (render_loop, load)
}
