//! Scene graph: two lights, the camera and at most one model.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::camera::PerspectiveCamera;
use crate::config::{rgb_from_hex, LightingConfig, ModelPlacement};

/// Error type for scene mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SceneError {
    #[error("scene already contains a model")]
    ModelAlreadyPresent,
}

/// Uniform light applied to every surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

/// Sun-style light. Shines from `position` toward the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
}

impl DirectionalLight {
    /// Unit vector the light travels along.
    pub fn direction(&self) -> Vec3 {
        (-self.position).try_normalize().unwrap_or(Vec3::NEG_Y)
    }
}

/// Position, Euler rotation (XYZ, radians) and scale of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_placement(placement: &ModelPlacement) -> Self {
        Self {
            translation: Vec3::from_array(placement.position),
            rotation: Vec3::ZERO,
            scale: Vec3::from_array(placement.scale),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let rotation = Quat::from_euler(
            EulerRot::XYZ,
            self.rotation.x,
            self.rotation.y,
            self.rotation.z,
        );
        Mat4::from_scale_rotation_translation(self.scale, rotation, self.translation)
    }
}

/// A loaded model and where it sits.
#[derive(Debug, Clone)]
pub struct ModelNode<M> {
    pub mesh: M,
    pub transform: Transform,
}

/// Mutable scene state. Owned by the render loop once bootstrapped.
#[derive(Debug)]
pub struct SceneGraph<M> {
    ambient: AmbientLight,
    directional: DirectionalLight,
    camera: PerspectiveCamera,
    model: Option<ModelNode<M>>,
}

impl<M> SceneGraph<M> {
    pub fn new(lighting: &LightingConfig, camera: PerspectiveCamera) -> Self {
        Self {
            ambient: AmbientLight {
                color: Vec3::from_array(rgb_from_hex(lighting.ambient_color)),
                intensity: lighting.ambient_intensity,
            },
            directional: DirectionalLight {
                color: Vec3::from_array(rgb_from_hex(lighting.directional_color)),
                intensity: lighting.directional_intensity,
                position: Vec3::from_array(lighting.directional_position),
            },
            camera,
            model: None,
        }
    }

    pub fn ambient(&self) -> &AmbientLight {
        &self.ambient
    }

    pub fn directional(&self) -> &DirectionalLight {
        &self.directional
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub fn model(&self) -> Option<&ModelNode<M>> {
        self.model.as_ref()
    }

    pub fn model_mut(&mut self) -> Option<&mut ModelNode<M>> {
        self.model.as_mut()
    }

    /// Add the model. A scene holds at most one, added once.
    pub fn insert_model(&mut self, node: ModelNode<M>) -> Result<(), SceneError> {
        if self.model.is_some() {
            return Err(SceneError::ModelAlreadyPresent);
        }
        self.model = Some(node);
        Ok(())
    }
}

/// Hand-off cell between the asset load task and the render loop.
///
/// The loader fills it once; the loop takes the node out and inserts it
/// into the scene graph.
pub struct ModelSlot<M> {
    inner: Rc<RefCell<SlotState<M>>>,
}

enum SlotState<M> {
    Empty,
    Ready(ModelNode<M>),
    Taken,
}

impl<M> Clone for ModelSlot<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<M> Default for ModelSlot<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ModelSlot<M> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SlotState::Empty)),
        }
    }

    /// Deliver a loaded node. Fails if one was already delivered.
    pub fn fill(&self, node: ModelNode<M>) -> Result<(), SceneError> {
        let mut state = self.inner.borrow_mut();
        if !matches!(*state, SlotState::Empty) {
            return Err(SceneError::ModelAlreadyPresent);
        }
        *state = SlotState::Ready(node);
        Ok(())
    }

    /// Take a delivered node, if one is waiting.
    pub fn take(&self) -> Option<ModelNode<M>> {
        let mut state = self.inner.borrow_mut();
        if !matches!(*state, SlotState::Ready(_)) {
            return None;
        }
        match std::mem::replace(&mut *state, SlotState::Taken) {
            SlotState::Ready(node) => Some(node),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.inner.borrow(), SlotState::Ready(_))
    }
}
