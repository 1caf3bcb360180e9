//! Device-orientation camera controller.
//!
//! Maps W3C `deviceorientation` angles onto a camera quaternion so that
//! holding the phone upright looks at the horizon and turning the phone turns
//! the view.
//!
//! Angles: `alpha` is the compass heading around Z, `beta` the front-back
//! tilt around X, `gamma` the left-right tilt around Y. All in degrees. The
//! screen angle compensates for landscape/portrait rotation.

use std::f32::consts::FRAC_1_SQRT_2;

use glam::{EulerRot, Quat, Vec3};

use crate::camera::PerspectiveCamera;

/// One sensor sample. Any angle may be missing on devices without the
/// corresponding sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationReading {
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    pub gamma: Option<f64>,
    /// Screen rotation in degrees (0, 90, 180, 270).
    pub screen_angle: f64,
}

/// Source of the most recent orientation sample.
pub trait OrientationSource {
    fn latest(&self) -> Option<OrientationReading>;
}

/// Rotates a device frame (screen facing up) into the camera frame
/// (looking out of the back of the device): -90° around X.
const WORLD_FROM_DEVICE: Quat = Quat::from_xyzw(-FRAC_1_SQRT_2, 0.0, 0.0, FRAC_1_SQRT_2);

/// Compute the camera orientation for a sensor sample.
pub fn orientation_quat(reading: &OrientationReading, alpha_offset: f32) -> Quat {
    let alpha = reading
        .alpha
        .map(|a| (a as f32).to_radians() + alpha_offset)
        .unwrap_or(0.0);
    let beta = reading.beta.map(|b| (b as f32).to_radians()).unwrap_or(0.0);
    let gamma = reading.gamma.map(|g| (g as f32).to_radians()).unwrap_or(0.0);
    let screen = (reading.screen_angle as f32).to_radians();

    // Intrinsic Y (alpha), X (beta), Z (-gamma)
    let device = Quat::from_euler(EulerRot::YXZ, alpha, beta, -gamma);
    let screen_adjust = Quat::from_axis_angle(Vec3::Z, -screen);

    (device * WORLD_FROM_DEVICE * screen_adjust).normalize()
}

/// Camera controller fed by an [`OrientationSource`].
pub struct OrientationControls<S> {
    source: S,
    enabled: bool,
    /// Heading correction in radians, added to alpha.
    alpha_offset: f32,
}

impl<S: OrientationSource> OrientationControls<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            enabled: true,
            alpha_offset: 0.0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_alpha_offset(&mut self, radians: f32) {
        self.alpha_offset = radians;
    }

    /// Pull the latest sample and apply it to `camera`.
    ///
    /// Returns whether the camera was changed. Leaves it untouched while
    /// disabled or before the first sample arrives.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if !self.enabled {
            return false;
        }
        let Some(reading) = self.source.latest() else {
            return false;
        };
        camera.set_orientation(orientation_quat(&reading, self.alpha_offset));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraConfig;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedReading(Rc<Cell<Option<OrientationReading>>>);

    impl OrientationSource for SharedReading {
        fn latest(&self) -> Option<OrientationReading> {
            self.0.get()
        }
    }

    fn reading(alpha: f64, beta: f64, gamma: f64) -> OrientationReading {
        OrientationReading {
            alpha: Some(alpha),
            beta: Some(beta),
            gamma: Some(gamma),
            screen_angle: 0.0,
        }
    }

    fn forward(q: Quat) -> Vec3 {
        q * Vec3::NEG_Z
    }

    #[test]
    fn flat_device_looks_down() {
        let q = orientation_quat(&reading(0.0, 0.0, 0.0), 0.0);
        assert!((forward(q) - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn upright_device_looks_at_horizon() {
        let q = orientation_quat(&reading(0.0, 90.0, 0.0), 0.0);
        assert!((forward(q) - Vec3::NEG_Z).length() < 1e-5);
        // Up stays up
        assert!(((q * Vec3::Y) - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn heading_turns_view() {
        // Upright and turned 90° counter-clockwise (alpha grows to the left)
        let q = orientation_quat(&reading(90.0, 90.0, 0.0), 0.0);
        assert!((forward(q) - Vec3::NEG_X).length() < 1e-5);

        // Same via offset
        let q = orientation_quat(&reading(0.0, 90.0, 0.0), std::f32::consts::FRAC_PI_2);
        assert!((forward(q) - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn gamma_tilts_view_to_the_left() {
        // Flat, right edge dipped: the back camera swings toward -X
        let q = orientation_quat(&reading(0.0, 0.0, 30.0), 0.0);
        assert!((forward(q) - Vec3::new(-0.5, -0.75f32.sqrt(), 0.0)).length() < 1e-5);

        // Upright, the same tilt turns around the vertical axis
        let q = orientation_quat(&reading(0.0, 90.0, 30.0), 0.0);
        assert!((forward(q) - Vec3::new(-0.5, 0.0, -0.75f32.sqrt())).length() < 1e-5);
        assert!(((q * Vec3::Y) - Vec3::Y).length() < 1e-5);

        // Opposite tilt, opposite side
        let q = orientation_quat(&reading(0.0, 0.0, -30.0), 0.0);
        assert!(forward(q).x > 0.4);
    }

    #[test]
    fn landscape_rolls_around_view_axis() {
        let mut r = reading(0.0, 90.0, 0.0);
        r.screen_angle = 90.0;
        let q = orientation_quat(&r, 0.0);
        // Still looking at the horizon, but camera up is now sideways
        assert!((forward(q) - Vec3::NEG_Z).length() < 1e-5);
        assert!((q * Vec3::Y).y.abs() < 1e-5);
    }

    #[test]
    fn missing_angles_count_as_zero() {
        let q = orientation_quat(&OrientationReading::default(), 0.0);
        assert!((forward(q) - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn controls_wait_for_first_sample() {
        let source = SharedReading::default();
        let mut controls = OrientationControls::new(source.clone());
        let mut camera = PerspectiveCamera::new(&CameraConfig::default(), 1.0);

        assert!(!controls.update(&mut camera));
        assert_eq!(camera.orientation(), Quat::IDENTITY);

        source.0.set(Some(reading(0.0, 0.0, 0.0)));
        assert!(controls.update(&mut camera));
        assert!((camera.forward() - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn disabled_controls_leave_camera_alone() {
        let source = SharedReading::default();
        source.0.set(Some(reading(30.0, 45.0, 10.0)));
        let mut controls = OrientationControls::new(source);
        controls.set_enabled(false);
        let mut camera = PerspectiveCamera::new(&CameraConfig::default(), 1.0);

        assert!(!controls.update(&mut camera));
        assert_eq!(camera.orientation(), Quat::IDENTITY);
    }
}
