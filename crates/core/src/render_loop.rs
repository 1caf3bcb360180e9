//! Per-frame update and draw.
//!
//! Driven by the display refresh callback. Every frame schedules its
//! successor first, so the loop keeps running even if a frame fails. There
//! is no way to stop it; it runs until the page goes away.

use std::fmt::Display;

use crate::orientation::{OrientationControls, OrientationSource};
use crate::scene::{ModelSlot, SceneGraph};

/// Asks the display for another frame callback.
pub trait FrameScheduler {
    fn request_next_frame(&mut self);
}

/// Draws the scene.
pub trait FrameRenderer<M> {
    type Error: Display;

    fn render(&mut self, scene: &SceneGraph<M>) -> Result<(), Self::Error>;
}

/// Render loop state: the scene plus everything that mutates it.
pub struct RenderLoop<M, R, S> {
    scene: SceneGraph<M>,
    renderer: R,
    controls: Option<OrientationControls<S>>,
    pending_model: ModelSlot<M>,
    spin_per_frame: f32,
    frames: u64,
    failed_frames: u64,
}

impl<M, R, S> RenderLoop<M, R, S>
where
    R: FrameRenderer<M>,
    S: OrientationSource,
{
    pub fn new(
        scene: SceneGraph<M>,
        renderer: R,
        controls: Option<OrientationControls<S>>,
        pending_model: ModelSlot<M>,
        spin_per_frame: f32,
    ) -> Self {
        Self {
            scene,
            renderer,
            controls,
            pending_model,
            spin_per_frame,
            frames: 0,
            failed_frames: 0,
        }
    }

    /// Run one frame.
    pub fn frame(&mut self, scheduler: &mut impl FrameScheduler) {
        scheduler.request_next_frame();
        self.frames += 1;

        if let Some(node) = self.pending_model.take() {
            match self.scene.insert_model(node) {
                Ok(()) => tracing::info!("Model added to scene at frame {}", self.frames),
                Err(e) => tracing::warn!("Dropping loaded model: {e}"),
            }
        }

        if let Some(controls) = &mut self.controls {
            controls.update(self.scene.camera_mut());
        }

        if let Some(model) = self.scene.model_mut() {
            model.transform.rotation.y += self.spin_per_frame;
        }

        if let Err(e) = self.renderer.render(&self.scene) {
            self.failed_frames += 1;
            tracing::error!("Render error at frame {}: {e}", self.frames);
        }
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Frames whose render call failed.
    pub fn failed_frames(&self) -> u64 {
        self.failed_frames
    }

    pub fn scene(&self) -> &SceneGraph<M> {
        &self.scene
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PerspectiveCamera;
    use crate::config::{CameraConfig, LightingConfig};
    use crate::orientation::OrientationReading;
    use crate::scene::{ModelNode, Transform};
    use glam::{Quat, Vec3};

    #[derive(Default)]
    struct CountingScheduler {
        requests: u32,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_next_frame(&mut self) {
            self.requests += 1;
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        renders: u32,
        rotations: Vec<Option<f32>>,
        fail_on: Option<u32>,
    }

    impl FrameRenderer<&'static str> for RecordingRenderer {
        type Error = String;

        fn render(&mut self, scene: &SceneGraph<&'static str>) -> Result<(), String> {
            self.renders += 1;
            self.rotations.push(scene.model().map(|m| m.transform.rotation.y));
            if self.fail_on == Some(self.renders) {
                return Err("surface lost".into());
            }
            Ok(())
        }
    }

    struct Upright;

    impl OrientationSource for Upright {
        fn latest(&self) -> Option<OrientationReading> {
            Some(OrientationReading {
                alpha: Some(0.0),
                beta: Some(90.0),
                gamma: Some(0.0),
                screen_angle: 0.0,
            })
        }
    }

    fn scene() -> SceneGraph<&'static str> {
        SceneGraph::new(
            &LightingConfig::default(),
            PerspectiveCamera::new(&CameraConfig::default(), 1.0),
        )
    }

    fn node() -> ModelNode<&'static str> {
        ModelNode {
            mesh: "strata",
            transform: Transform::default(),
        }
    }

    #[test]
    fn one_render_per_frame_without_model() {
        let mut render_loop: RenderLoop<_, _, Upright> = RenderLoop::new(
            scene(),
            RecordingRenderer::default(),
            None,
            ModelSlot::new(),
            0.002,
        );
        let mut scheduler = CountingScheduler::default();

        for _ in 0..5 {
            render_loop.frame(&mut scheduler);
        }

        assert_eq!(scheduler.requests, 5);
        assert_eq!(render_loop.renderer().renders, 5);
        assert_eq!(render_loop.frames(), 5);
        assert!(render_loop.renderer().rotations.iter().all(Option::is_none));
    }

    #[test]
    fn model_spins_after_arrival() {
        let slot = ModelSlot::new();
        let mut render_loop: RenderLoop<_, _, Upright> = RenderLoop::new(
            scene(),
            RecordingRenderer::default(),
            None,
            slot.clone(),
            0.002,
        );
        let mut scheduler = CountingScheduler::default();

        render_loop.frame(&mut scheduler);
        render_loop.frame(&mut scheduler);
        slot.fill(node()).unwrap();
        for _ in 0..3 {
            render_loop.frame(&mut scheduler);
        }

        let rotations = &render_loop.renderer().rotations;
        assert_eq!(rotations[0], None);
        assert_eq!(rotations[1], None);
        assert!((rotations[2].unwrap() - 0.002).abs() < 1e-6);
        assert!((rotations[4].unwrap() - 0.006).abs() < 1e-6);
    }

    #[test]
    fn controls_update_camera() {
        let mut render_loop = RenderLoop::new(
            scene(),
            RecordingRenderer::default(),
            Some(OrientationControls::new(Upright)),
            ModelSlot::new(),
            0.002,
        );
        // Start from a pose that differs from the upright one.
        render_loop
            .scene
            .camera_mut()
            .set_orientation(Quat::from_rotation_x(1.0));

        render_loop.frame(&mut CountingScheduler::default());

        let forward = render_loop.scene().camera().forward();
        assert!((forward - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn render_failure_keeps_loop_alive() {
        let renderer = RecordingRenderer {
            fail_on: Some(2),
            ..Default::default()
        };
        let mut render_loop: RenderLoop<_, _, Upright> =
            RenderLoop::new(scene(), renderer, None, ModelSlot::new(), 0.002);
        let mut scheduler = CountingScheduler::default();

        for _ in 0..3 {
            render_loop.frame(&mut scheduler);
        }

        assert_eq!(scheduler.requests, 3);
        assert_eq!(render_loop.renderer().renders, 3);
        assert_eq!(render_loop.failed_frames(), 1);
    }
}
