//! glTF model loader.
//!
//! Loads .glb/.gltf bytes and flattens the default scene into a
//! [`ModelMesh`]: one primitive per glTF primitive, with node transforms
//! baked into `local_transform`, base color factors and base color textures.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use super::mesh::{MeshVertex, ModelMesh, ModelPrimitive, TextureData};

/// Error type for glTF loading.
#[derive(Debug, thiserror::Error)]
pub enum GltfError {
    #[error("Failed to load glTF file: {0}")]
    LoadError(#[from] gltf::Error),

    #[error("Missing position data for mesh: {0}")]
    MissingPositions(String),

    #[error("Model contains no scenes")]
    NoScene,
}

/// Parse a glTF/GLB file held in memory.
pub fn load_model_from_bytes(data: &[u8]) -> Result<ModelMesh, GltfError> {
    let (document, buffers, images) = gltf::import_slice(data)?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or(GltfError::NoScene)?;

    let mut builder = ModelBuilder {
        buffers: &buffers,
        images: &images,
        model: ModelMesh::default(),
        texture_slots: HashMap::new(),
    };

    for node in scene.nodes() {
        builder.process_node(&node, Mat4::IDENTITY)?;
    }

    let model = builder.model;
    tracing::info!(
        "Loaded glTF model: {} primitives, {} vertices, {} triangles, {} textures",
        model.primitives.len(),
        model.vertex_count(),
        model.triangle_count(),
        model.textures.len()
    );

    Ok(model)
}

struct ModelBuilder<'a> {
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    model: ModelMesh,
    /// glTF image index -> index in `model.textures`
    texture_slots: HashMap<usize, usize>,
}

impl ModelBuilder<'_> {
    /// Process a glTF node and its children recursively.
    fn process_node(&mut self, node: &gltf::Node, parent: Mat4) -> Result<(), GltfError> {
        let local = Mat4::from_cols_array_2d(&node.transform().matrix());
        let world = parent * local;

        if let Some(mesh) = node.mesh() {
            let name = mesh.name().unwrap_or("unnamed").to_string();

            for primitive in mesh.primitives() {
                if primitive.mode() != gltf::mesh::Mode::Triangles {
                    tracing::warn!("Skipping non-triangle primitive in mesh {name}");
                    continue;
                }

                let (vertices, indices) = self.extract_primitive_data(&primitive, &name)?;

                let pbr = primitive.material().pbr_metallic_roughness();
                let texture = pbr
                    .base_color_texture()
                    .map(|info| self.texture_slot(info.texture().source().index()));

                self.model.primitives.push(ModelPrimitive {
                    vertices,
                    indices,
                    local_transform: world,
                    base_color: pbr.base_color_factor(),
                    texture,
                });
            }
        }

        for child in node.children() {
            self.process_node(&child, world)?;
        }

        Ok(())
    }

    /// Extract vertices and indices from a glTF primitive.
    fn extract_primitive_data(
        &self,
        primitive: &gltf::Primitive,
        mesh_name: &str,
    ) -> Result<(Vec<MeshVertex>, Vec<u32>), GltfError> {
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|b| &b.0[..]));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| GltfError::MissingPositions(mesh_name.to_string()))?
            .collect();

        // Generate sequential indices if not indexed
        let indices: Vec<u32> = reader
            .read_indices()
            .map(|iter| iter.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());

        let normals: Vec<[f32; 3]> = match reader.read_normals() {
            Some(iter) => iter.collect(),
            None => smooth_normals(&positions, &indices),
        };

        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|tc| tc.into_f32().collect())
            .unwrap_or_default();

        let vertices = positions
            .iter()
            .enumerate()
            .map(|(i, position)| MeshVertex {
                position: *position,
                normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            })
            .collect();

        Ok((vertices, indices))
    }

    /// Convert a glTF image once and return its slot.
    fn texture_slot(&mut self, image_index: usize) -> usize {
        if let Some(&slot) = self.texture_slots.get(&image_index) {
            return slot;
        }

        let texture = self
            .images
            .get(image_index)
            .and_then(to_rgba8)
            .unwrap_or_else(|| {
                tracing::warn!("Unsupported texture format for image {image_index}, using white");
                TextureData::white()
            });

        let slot = self.model.textures.len();
        self.model.textures.push(texture);
        self.texture_slots.insert(image_index, slot);
        slot
    }
}

/// Expand 8-bit glTF images to RGBA8.
fn to_rgba8(image: &gltf::image::Data) -> Option<TextureData> {
    use gltf::image::Format;

    let rgba = match image.format {
        Format::R8G8B8A8 => image.pixels.clone(),
        Format::R8G8B8 => image
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8G8 => image
            .pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[0], p[0], p[1]])
            .collect(),
        Format::R8 => image.pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
        _ => return None,
    };

    Some(TextureData {
        width: image.width,
        height: image.height,
        rgba,
    })
}

/// Area-weighted vertex normals for meshes that ship without them.
fn smooth_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];

    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let (pa, pb, pc) = (
            Vec3::from_array(positions[a]),
            Vec3::from_array(positions[b]),
            Vec3::from_array(positions[c]),
        );
        let face = (pb - pa).cross(pc - pa);
        accum[a] += face;
        accum[b] += face;
        accum[c] += face;
    }

    accum
        .into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}
