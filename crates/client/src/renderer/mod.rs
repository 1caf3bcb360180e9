//! wgpu renderer for the viewer.
//!
//! Draws the scene graph over a transparent canvas so the camera feed
//! behind it stays visible. WebGL2 on WASM, any native backend elsewhere.

pub mod gltf_loader;
pub mod mesh;
mod pipeline;

use glam::Vec4;
use strata_core::{FrameRenderer, SceneGraph};
use wgpu::{
    util::DeviceExt, Backends, CompositeAlphaMode, Device, DeviceDescriptor, Instance,
    InstanceDescriptor, PowerPreference, Queue, RequestAdapterOptions, Surface,
    SurfaceConfiguration, TextureUsages,
};

pub use gltf_loader::{load_model_from_bytes, GltfError};
pub use mesh::{MeshVertex, ModelMesh, ModelPrimitive, TextureData};

use pipeline::{GlobalUniforms, InstanceUniforms, LitPipeline, DEPTH_FORMAT};

/// Error type for the renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("No suitable GPU adapter found")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("Surface reports no supported formats")]
    NoSurfaceFormat,

    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
}

/// Fully transparent, so the page behind the canvas shows through.
const CLEAR_COLOR: wgpu::Color = wgpu::Color::TRANSPARENT;

const PREFERRED_SAMPLES: u32 = 4;

/// Scale `width`×`height` down to fit within `max` on both axes, keeping the aspect ratio.
fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let (width, height, max) = (width.max(1), height.max(1), max.max(1));
    let longest = width.max(height);
    if longest <= max {
        return (width, height);
    }
    let scale = max as f64 / longest as f64;
    let shrink = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, max);
    (shrink(width), shrink(height))
}

/// Whether a texture can be created under the device's 2D size limit.
fn texture_fits(data: &TextureData, max: u32) -> bool {
    data.width <= max && data.height <= max
}

/// Prefer premultiplied compositing; fall back to whatever the surface offers first.
fn pick_alpha_mode(supported: &[CompositeAlphaMode]) -> CompositeAlphaMode {
    if supported.contains(&CompositeAlphaMode::PreMultiplied) {
        CompositeAlphaMode::PreMultiplied
    } else {
        supported.first().copied().unwrap_or(CompositeAlphaMode::Auto)
    }
}

struct GpuPrimitive {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    local_transform: glam::Mat4,
    base_color: Vec4,
}

/// GPU copy of the scene's model, built the first frame it appears.
struct GpuModel {
    primitives: Vec<GpuPrimitive>,
    _textures: Vec<wgpu::Texture>,
}

/// The main renderer.
pub struct Renderer {
    surface: Surface<'static>,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    sample_count: u32,
    pipeline: LitPipeline,
    msaa_view: Option<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
    model: Option<GpuModel>,
}

impl Renderer {
    /// Create a renderer drawing into `target` at `width`×`height` physical pixels.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let instance = Instance::new(&InstanceDescriptor {
            backends: Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(target)?;

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        tracing::info!("Using adapter: {:?}", adapter.get_info());

        let limits = if cfg!(target_arch = "wasm32") {
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
        } else {
            wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("strata_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or(RenderError::NoSurfaceFormat)?;

        let max_side = device.limits().max_texture_dimension_2d;
        let (width, height) = fit_within(width, height, max_side);

        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: pick_alpha_mode(&surface_caps.alpha_modes),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let sample_count = if adapter
            .get_texture_format_features(surface_format)
            .flags
            .sample_count_supported(PREFERRED_SAMPLES)
        {
            PREFERRED_SAMPLES
        } else {
            1
        };

        tracing::info!(
            "Surface {}x{} (max {}) {:?}, alpha {:?}, {}x MSAA",
            config.width,
            config.height,
            max_side,
            surface_format,
            config.alpha_mode,
            sample_count
        );

        let pipeline = LitPipeline::new(&device, surface_format, sample_count);
        let (msaa_view, depth_view) = create_attachments(&device, &config, sample_count);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
            pipeline,
            msaa_view,
            depth_view,
            model: None,
        })
    }

    fn upload_model(&self, mesh: &ModelMesh) -> GpuModel {
        let max_side = self.device.limits().max_texture_dimension_2d;
        let textures: Vec<wgpu::Texture> = mesh
            .textures
            .iter()
            .map(|data| {
                if texture_fits(data, max_side) {
                    self.upload_texture(data)
                } else {
                    tracing::warn!(
                        "Texture {}x{} exceeds device limit {max_side}, using white",
                        data.width,
                        data.height
                    );
                    self.upload_texture(&TextureData::white())
                }
            })
            .collect();
        let views: Vec<wgpu::TextureView> = textures
            .iter()
            .map(|t| t.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();

        let white = self.upload_texture(&TextureData::white());
        let white_view = white.create_view(&wgpu::TextureViewDescriptor::default());

        let primitives = mesh
            .primitives
            .iter()
            .filter(|p| !p.indices.is_empty())
            .map(|p| {
                let vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("model_vertex_buffer"),
                    contents: bytemuck::cast_slice(&p.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                });
                let index_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("model_index_buffer"),
                    contents: bytemuck::cast_slice(&p.indices),
                    usage: wgpu::BufferUsages::INDEX,
                });
                let base_color = Vec4::from_array(p.base_color);
                let uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("model_instance_buffer"),
                    contents: bytemuck::cast_slice(&[InstanceUniforms::new(p.local_transform, base_color)]),
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                });
                let view = p.texture.and_then(|i| views.get(i)).unwrap_or(&white_view);
                let bind_group = self
                    .pipeline
                    .create_instance_bind_group(&self.device, &uniform_buffer, view);

                GpuPrimitive {
                    vertex_buffer,
                    index_buffer,
                    index_count: p.indices.len() as u32,
                    uniform_buffer,
                    bind_group,
                    local_transform: p.local_transform,
                    base_color,
                }
            })
            .collect();

        let mut all_textures = textures;
        all_textures.push(white);

        GpuModel {
            primitives,
            _textures: all_textures,
        }
    }

    fn upload_texture(&self, data: &TextureData) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width: data.width.max(1),
            height: data.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("model_base_color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * size.width),
                rows_per_image: Some(size.height),
            },
            size,
        );
        texture
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        let (msaa_view, depth_view) = create_attachments(&self.device, &self.config, self.sample_count);
        self.msaa_view = msaa_view;
        self.depth_view = depth_view;
    }

    /// Surface size in physical pixels, after clamping to the device limit.
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

impl FrameRenderer<ModelMesh> for Renderer {
    type Error = RenderError;

    fn render(&mut self, scene: &SceneGraph<ModelMesh>) -> Result<(), RenderError> {
        if self.model.is_none() {
            if let Some(node) = scene.model() {
                tracing::debug!("Uploading model to GPU");
                self.model = Some(self.upload_model(&node.mesh));
            }
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::warn!("Surface lost, reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("Surface timeout, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let camera = scene.camera();
        let ambient = scene.ambient();
        let sun = scene.directional();
        let globals = GlobalUniforms::new(
            camera.view_projection_matrix(),
            camera.position(),
            ambient.color * ambient.intensity,
            sun.direction(),
            sun.color * sun.intensity,
        );
        self.pipeline.update_global_uniforms(&self.queue, &globals);

        if let (Some(gpu), Some(node)) = (&self.model, scene.model()) {
            let root = node.transform.matrix();
            for prim in &gpu.primitives {
                let uniforms = InstanceUniforms::new(root * prim.local_transform, prim.base_color);
                self.queue
                    .write_buffer(&prim.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        {
            let (color_view, resolve_target) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let (Some(gpu), Some(_)) = (&self.model, scene.model()) {
                render_pass.set_pipeline(&self.pipeline.pipeline);
                render_pass.set_bind_group(0, &self.pipeline.global_bind_group, &[]);

                for prim in &gpu.primitives {
                    render_pass.set_bind_group(1, &prim.bind_group, &[]);
                    render_pass.set_vertex_buffer(0, prim.vertex_buffer.slice(..));
                    render_pass.set_index_buffer(prim.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                    render_pass.draw_indexed(0..prim.index_count, 0, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// MSAA color target (when multisampling) and depth buffer sized to the surface.
fn create_attachments(
    device: &Device,
    config: &SurfaceConfiguration,
    sample_count: u32,
) -> (Option<wgpu::TextureView>, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width: config.width,
        height: config.height,
        depth_or_array_layers: 1,
    };

    let msaa_view = (sample_count > 1).then(|| {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("msaa_color"),
                size,
                mip_level_count: 1,
                sample_count,
                dimension: wgpu::TextureDimension::D2,
                format: config.format,
                usage: TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    });

    let depth_view = device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("depth"),
            size,
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default());

    (msaa_view, depth_view)
}
