//! Startup sequence: permission gate, then camera.
//!
//! Steps return typed results; this is the one place that turns failures
//! into user alerts. A gate failure ends startup. A camera failure does not:
//! the scene is still built, just without a video background.

use crate::capture::{self, CaptureConstraints, CaptureError, CaptureHandle, CaptureHost};
use crate::permission::{ConsentHost, GateError, GateOutcome, PermissionGate};

/// Shows a blocking, user-visible message.
pub trait Notifier {
    fn alert(&self, message: &str);
}

/// Error type for the startup sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StartupError {
    #[error("startup halted: {0}")]
    Permission(#[from] GateError),
}

/// What the startup steps produced.
#[derive(Debug)]
pub struct Launch<S> {
    pub gate: GateOutcome,
    /// `None` when the camera could not be opened.
    pub capture: Option<CaptureHandle<S>>,
}

/// Runs the pre-scene steps against a host.
pub struct Startup<'a, H> {
    host: &'a H,
    constraints: CaptureConstraints,
}

impl<'a, H> Startup<'a, H>
where
    H: ConsentHost + CaptureHost + Notifier,
{
    pub fn new(host: &'a H) -> Self {
        Self {
            host,
            constraints: CaptureConstraints::default(),
        }
    }

    /// Permission gate, then camera.
    pub async fn run(&self) -> Result<Launch<H::Stream>, StartupError> {
        let gate = match PermissionGate::new(self.host).run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!("Permission gate failed: {e}");
                self.host.alert(e.user_message());
                return Err(e.into());
            }
        };

        let capture = self.capture().await.ok();

        Ok(Launch { gate, capture })
    }

    async fn capture(&self) -> Result<CaptureHandle<H::Stream>, CaptureError> {
        capture::acquire(self.host, &self.constraints)
            .await
            .inspect_err(|e| {
                self.host.alert(CaptureError::USER_MESSAGE);
                tracing::error!("Camera unavailable, continuing without video: {e}");
            })
    }
}
