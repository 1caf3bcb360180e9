//! CPU-side model data ready for GPU upload.

use glam::Mat4;

/// Vertex with position, normal and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub const ATTRIBS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Decoded RGBA8 image.
#[derive(Clone, Debug)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    /// 1×1 white texel, used for untextured materials.
    pub fn white() -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: vec![255; 4],
        }
    }
}

/// One drawable piece of the model: a glTF primitive with its material.
#[derive(Clone, Debug)]
pub struct ModelPrimitive {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    /// Transform from the primitive's node to model space.
    pub local_transform: Mat4,
    pub base_color: [f32; 4],
    /// Index into [`ModelMesh::textures`].
    pub texture: Option<usize>,
}

/// A whole model: primitives plus the textures they reference.
#[derive(Clone, Debug, Default)]
pub struct ModelMesh {
    pub primitives: Vec<ModelPrimitive>,
    pub textures: Vec<TextureData>,
}

impl ModelMesh {
    pub fn vertex_count(&self) -> usize {
        self.primitives.iter().map(|p| p.vertices.len()).sum()
    }

    pub fn triangle_count(&self) -> usize {
        self.primitives.iter().map(|p| p.indices.len() / 3).sum()
    }
}
