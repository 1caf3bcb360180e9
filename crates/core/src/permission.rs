//! Motion/orientation permission gate.
//!
//! Some mobile browsers (iOS Safari) refuse to deliver `deviceorientation`
//! events until the page asks for consent from inside a user gesture. The
//! gate detects those platforms from the user agent, shows a modal with a
//! confirmation button, and asks for both sensor permissions once the user
//! taps it.

use std::fmt;

use crate::PlatformError;

/// User-agent substrings of platforms that need explicit sensor consent.
pub const CONSENT_PLATFORMS: &[&str] = &["iphone", "ipad", "ipod"];

/// Whether the platform needs an explicit permission request.
///
/// Plain case-insensitive substring match. Platforms that need consent but
/// don't match (e.g. iPadOS in desktop mode) silently skip the prompt.
pub fn requires_explicit_consent(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    CONSENT_PLATFORMS.iter().any(|p| ua.contains(p))
}

/// Which sensor permission is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Motion,
    Orientation,
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorKind::Motion => f.write_str("motion"),
            SensorKind::Orientation => f.write_str("orientation"),
        }
    }
}

/// Answer returned by the platform for one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not decided yet ("default" / "prompt").
    Prompt,
}

impl PermissionState {
    /// Parse the platform's permission string. Anything unrecognized is
    /// treated as not granted.
    pub fn parse(value: &str) -> Self {
        match value {
            "granted" => PermissionState::Granted,
            "default" | "prompt" => PermissionState::Prompt,
            _ => PermissionState::Denied,
        }
    }

    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }
}

/// Host capabilities the gate needs.
#[allow(async_fn_in_trait)]
pub trait ConsentHost {
    /// Platform identification string (`navigator.userAgent`).
    fn user_agent(&self) -> String;

    /// Make the consent modal visible.
    fn show_consent_prompt(&self);

    /// Hide the consent modal.
    fn hide_consent_prompt(&self);

    /// Resolve once the user taps the confirmation control.
    async fn consent_confirmed(&self);

    /// Ask the platform for one sensor permission.
    async fn request_sensor_permission(
        &self,
        sensor: SensorKind,
    ) -> Result<PermissionState, PlatformError>;
}

/// Successful gate result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Platform needs no consent; nothing was shown.
    Skipped,
    /// User confirmed and at least one sensor was granted.
    Granted {
        motion: PermissionState,
        orientation: PermissionState,
    },
}

/// Gate failure. Either one halts startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("sensor access denied (motion: {motion:?}, orientation: {orientation:?})")]
    Denied {
        motion: PermissionState,
        orientation: PermissionState,
    },

    #[error("sensor permission request failed: {0}")]
    Platform(#[from] PlatformError),
}

impl GateError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            GateError::Denied { .. } => "Motion sensor access was denied.",
            GateError::Platform(_) => "Motion sensor permission is required.",
        }
    }
}

/// The permission gate. Runs once per page.
pub struct PermissionGate<'a, H> {
    host: &'a H,
}

impl<'a, H: ConsentHost> PermissionGate<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host }
    }

    /// Run the gate to completion.
    ///
    /// On failure the modal is left visible.
    pub async fn run(&self) -> Result<GateOutcome, GateError> {
        let user_agent = self.host.user_agent();
        if !requires_explicit_consent(&user_agent) {
            tracing::debug!("No sensor consent needed for this platform");
            return Ok(GateOutcome::Skipped);
        }

        tracing::info!("Sensor consent required, showing prompt");
        self.host.show_consent_prompt();
        self.host.consent_confirmed().await;

        let motion = self
            .host
            .request_sensor_permission(SensorKind::Motion)
            .await?;
        let orientation = self
            .host
            .request_sensor_permission(SensorKind::Orientation)
            .await?;

        tracing::info!("Sensor permissions: motion={motion:?}, orientation={orientation:?}");

        if motion.is_granted() || orientation.is_granted() {
            self.host.hide_consent_prompt();
            Ok(GateOutcome::Granted {
                motion,
                orientation,
            })
        } else {
            Err(GateError::Denied {
                motion,
                orientation,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct FakeHost {
        user_agent: &'static str,
        motion: Result<PermissionState, PlatformError>,
        orientation: Result<PermissionState, PlatformError>,
        prompt_visible: Cell<bool>,
        prompts_shown: Cell<u32>,
        requested: RefCell<Vec<SensorKind>>,
    }

    impl FakeHost {
        fn new(
            user_agent: &'static str,
            motion: Result<PermissionState, PlatformError>,
            orientation: Result<PermissionState, PlatformError>,
        ) -> Self {
            Self {
                user_agent,
                motion,
                orientation,
                prompt_visible: Cell::new(false),
                prompts_shown: Cell::new(0),
                requested: RefCell::new(Vec::new()),
            }
        }
    }

    impl ConsentHost for FakeHost {
        fn user_agent(&self) -> String {
            self.user_agent.to_string()
        }

        fn show_consent_prompt(&self) {
            self.prompt_visible.set(true);
            self.prompts_shown.set(self.prompts_shown.get() + 1);
        }

        fn hide_consent_prompt(&self) {
            self.prompt_visible.set(false);
        }

        async fn consent_confirmed(&self) {}

        async fn request_sensor_permission(
            &self,
            sensor: SensorKind,
        ) -> Result<PermissionState, PlatformError> {
            self.requested.borrow_mut().push(sensor);
            match sensor {
                SensorKind::Motion => self.motion.clone(),
                SensorKind::Orientation => self.orientation.clone(),
            }
        }
    }

    const IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)";
    const WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

    #[test]
    fn consent_detection() {
        assert!(requires_explicit_consent(IPHONE));
        assert!(requires_explicit_consent("Mozilla/5.0 (iPad; CPU OS 16_0)"));
        assert!(requires_explicit_consent("mozilla/5.0 (ipod touch)"));
        assert!(!requires_explicit_consent(WINDOWS));
        assert!(!requires_explicit_consent("Mozilla/5.0 (Linux; Android 14; Pixel 8)"));
        // Desktop-mode iPadOS reports itself as a Mac; known gap.
        assert!(!requires_explicit_consent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)"));
    }

    #[test]
    fn permission_strings() {
        assert_eq!(PermissionState::parse("granted"), PermissionState::Granted);
        assert_eq!(PermissionState::parse("denied"), PermissionState::Denied);
        assert_eq!(PermissionState::parse("default"), PermissionState::Prompt);
        assert_eq!(PermissionState::parse("GRANTED"), PermissionState::Denied);
    }

    #[test]
    fn skips_without_prompt_on_desktop() {
        let host = FakeHost::new(WINDOWS, Ok(PermissionState::Denied), Ok(PermissionState::Denied));
        let outcome = pollster::block_on(PermissionGate::new(&host).run());

        assert_eq!(outcome, Ok(GateOutcome::Skipped));
        assert_eq!(host.prompts_shown.get(), 0);
        assert!(host.requested.borrow().is_empty());
    }

    #[test]
    fn both_granted_hides_prompt() {
        let host = FakeHost::new(IPHONE, Ok(PermissionState::Granted), Ok(PermissionState::Granted));
        let outcome = pollster::block_on(PermissionGate::new(&host).run());

        assert_eq!(
            outcome,
            Ok(GateOutcome::Granted {
                motion: PermissionState::Granted,
                orientation: PermissionState::Granted,
            })
        );
        assert_eq!(host.prompts_shown.get(), 1);
        assert!(!host.prompt_visible.get());
        assert_eq!(
            *host.requested.borrow(),
            vec![SensorKind::Motion, SensorKind::Orientation]
        );
    }

    #[test]
    fn one_grant_is_enough() {
        let host = FakeHost::new(IPHONE, Ok(PermissionState::Denied), Ok(PermissionState::Granted));
        let outcome = pollster::block_on(PermissionGate::new(&host).run());

        assert!(matches!(outcome, Ok(GateOutcome::Granted { .. })));
        assert!(!host.prompt_visible.get());
    }

    #[test]
    fn both_denied_fails_and_keeps_prompt() {
        let host = FakeHost::new(IPHONE, Ok(PermissionState::Denied), Ok(PermissionState::Prompt));
        let err = pollster::block_on(PermissionGate::new(&host).run()).unwrap_err();

        assert_eq!(
            err,
            GateError::Denied {
                motion: PermissionState::Denied,
                orientation: PermissionState::Prompt,
            }
        );
        assert_eq!(err.user_message(), "Motion sensor access was denied.");
        assert!(host.prompt_visible.get());
    }

    #[test]
    fn platform_failure_stops_before_orientation() {
        let host = FakeHost::new(
            IPHONE,
            Err(PlatformError::new("requestPermission is not a function")),
            Ok(PermissionState::Granted),
        );
        let err = pollster::block_on(PermissionGate::new(&host).run()).unwrap_err();

        assert!(matches!(err, GateError::Platform(_)));
        assert_eq!(err.user_message(), "Motion sensor permission is required.");
        assert_eq!(*host.requested.borrow(), vec![SensorKind::Motion]);
    }
}
