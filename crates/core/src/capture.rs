//! Rear camera acquisition.

/// `facingMode` constraint value for the rear camera.
pub const REAR_CAMERA: &str = "environment";

/// What to ask the capture API for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// `facingMode` constraint value.
    pub facing_mode: &'static str,
    pub audio: bool,
}

impl Default for CaptureConstraints {
    /// Rear camera, video only.
    fn default() -> Self {
        Self {
            facing_mode: REAR_CAMERA,
            audio: false,
        }
    }
}

/// Error type for camera acquisition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera permission denied: {0}")]
    PermissionDenied(String),

    #[error("No usable camera: {0}")]
    NotFound(String),

    #[error("Camera error: {0}")]
    Platform(String),
}

impl CaptureError {
    /// Text shown to the user when the camera cannot be used.
    pub const USER_MESSAGE: &'static str = "Camera access was not permitted.";

    /// Classify a DOM exception by its `name`.
    pub fn from_dom_name(name: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match name {
            "NotAllowedError" | "SecurityError" => CaptureError::PermissionDenied(message),
            "NotFoundError" | "OverconstrainedError" => CaptureError::NotFound(message),
            _ => CaptureError::Platform(message),
        }
    }
}

/// Host capabilities for opening and showing a camera stream.
#[allow(async_fn_in_trait)]
pub trait CaptureHost {
    type Stream;

    /// Open a camera stream matching `constraints`.
    async fn open_camera(&self, constraints: &CaptureConstraints)
        -> Result<Self::Stream, CaptureError>;

    /// Bind the stream to the video element and start playback.
    fn present_video(&self, stream: &Self::Stream) -> Result<(), CaptureError>;
}

/// A live camera stream that is bound to the video element.
///
/// Dropping the handle does not stop the tracks; the stream lives as long as
/// the page.
#[derive(Debug)]
pub struct CaptureHandle<S> {
    stream: S,
}

impl<S> CaptureHandle<S> {
    pub fn stream(&self) -> &S {
        &self.stream
    }
}

/// Open the camera and bind it for display.
pub async fn acquire<H: CaptureHost>(
    host: &H,
    constraints: &CaptureConstraints,
) -> Result<CaptureHandle<H::Stream>, CaptureError> {
    tracing::info!(
        "Requesting camera (facing: {}, audio: {})",
        constraints.facing_mode,
        constraints.audio
    );
    let stream = host.open_camera(constraints).await?;
    host.present_video(&stream)?;
    tracing::info!("Camera stream attached");
    Ok(CaptureHandle { stream })
}
