pub mod headless;
pub mod pipeline;
pub mod post_process;
pub mod text;

pub use headless::{BackendCall, HeadlessBackend, PassRecord};

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::window::Window;

use pipeline::{
    FrameUniform, MAX_POINT_LIGHTS, MeshLayouts, OBJECT_UNIFORM_STRIDE, ObjectUniform, create_depth_texture,
    create_mesh_layouts, create_mesh_pipeline,
};
use post_process::{BloomChain, HDR_FORMAT};

use crate::camera::Camera;
use crate::compositor::{BloomSettings, RenderBackend};
use crate::error::{Error, Result};
use crate::scene::{LightKind, ObjectKind, SceneGraph, Texture};

const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Vertex and index buffers of an uploaded [`crate::geometry::Mesh`].
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// One draw prepared for the current pass; its object uniform lives at
/// `index * OBJECT_UNIFORM_STRIDE`.
struct Draw {
    mesh: u64,
    texture: Option<u64>,
}

pub struct Renderer {
    pub window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    layouts: MeshLayouts,
    /// Mesh pipeline for the base pass (surface format).
    surface_pipeline: wgpu::RenderPipeline,
    /// Mesh pipeline for the bloom scene target (float format).
    hdr_pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    /// Number of object uniforms `object_buffer` can hold.
    object_capacity: usize,
    object_bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    white_texture: wgpu::BindGroup,
    meshes: HashMap<u64, GpuMesh>,
    textures: HashMap<u64, wgpu::BindGroup>,
    used_meshes: HashSet<u64>,
    used_textures: HashSet<u64>,
    bloom: BloomChain,
    frame: Option<(wgpu::SurfaceTexture, wgpu::TextureView)>,
    clear_color_pending: bool,
    clear_depth_pending: bool,
}

fn gpu_error(stage: &str, e: impl std::fmt::Display) -> Error {
    Error::Gpu(format!("{stage}: {e}"))
}

impl Renderer {
    pub async fn new(window: Arc<Window>, bloom: BloomSettings) -> Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(Arc::clone(&window))
            .map_err(|e| gpu_error("surface", e))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                compatible_surface: Some(&surface),
                ..Default::default()
            })
            .await
            .map_err(|e| gpu_error("adapter", e))?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default())
            .await
            .map_err(|e| gpu_error("device", e))?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| gpu_error("surface", "no supported formats"))?;
        let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!("renderer: {}x{} {:?} on {}", config.width, config.height, format, adapter.get_info().name);

        let layouts = create_mesh_layouts(&device);
        let surface_pipeline = create_mesh_pipeline(&device, &layouts, format);
        let hdr_pipeline = create_mesh_pipeline(&device, &layouts, HDR_FORMAT);
        let depth_view = create_depth_texture(&device, config.width, config.height, "depth");

        let frame_uniform: FrameUniform = bytemuck::Zeroable::zeroed();
        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("frame_uniform"),
            contents: bytemuck::bytes_of(&frame_uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bg"),
            layout: &layouts.frame,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });

        let object_capacity = 64;
        let (object_buffer, object_bind_group) = Self::create_object_buffer(&device, &layouts, object_capacity);

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let white = Texture::new(image::RgbaImage::from_pixel(1, 1, image::Rgba([255, 255, 255, 255])));
        let white_texture = Self::upload_texture(&device, &queue, &layouts, &sampler, &white);

        let bloom = BloomChain::new(&device, config.width, config.height, format, bloom);

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            layouts,
            surface_pipeline,
            hdr_pipeline,
            depth_view,
            frame_buffer,
            frame_bind_group,
            object_buffer,
            object_capacity,
            object_bind_group,
            sampler,
            white_texture,
            meshes: HashMap::new(),
            textures: HashMap::new(),
            used_meshes: HashSet::new(),
            used_textures: HashSet::new(),
            bloom,
            frame: None,
            clear_color_pending: false,
            clear_depth_pending: false,
        })
    }

    fn create_object_buffer(
        device: &wgpu::Device,
        layouts: &MeshLayouts,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("object_uniforms"),
            size: capacity as u64 * OBJECT_UNIFORM_STRIDE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object_bg"),
            layout: &layouts.object,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniform>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn upload_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layouts: &MeshLayouts,
        sampler: &wgpu::Sampler,
        texture: &Texture,
    ) -> wgpu::BindGroup {
        let (width, height) = texture.image.dimensions();
        let gpu = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("mesh_texture"),
                size: wgpu::Extent3d { width, height, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8UnormSrgb,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &texture.image,
        );
        let view = gpu.create_view(&wgpu::TextureViewDescriptor::default());
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("mesh_texture_bg"),
            layout: &layouts.texture,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
            ],
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Reconfigure the surface at its current size, e.g. after it was lost.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Upload what the visible objects need and write this pass's uniforms.
    fn prepare(&mut self, scene: &SceneGraph, camera: &Camera) -> Vec<Draw> {
        let mut frame: FrameUniform = bytemuck::Zeroable::zeroed();
        frame.camera = camera.uniform();
        let mut point_lights = 0usize;
        let mut uniforms = Vec::new();
        let mut draws = Vec::new();

        for (_, object) in scene.visible_to(camera.layers) {
            if let ObjectKind::Light(light) = &object.kind {
                let [r, g, b] = light.color.map(|c| c * light.intensity);
                match light.kind {
                    LightKind::Ambient => {
                        frame.ambient[0] += r;
                        frame.ambient[1] += g;
                        frame.ambient[2] += b;
                    }
                    LightKind::Point { distance } if point_lights < MAX_POINT_LIGHTS => {
                        frame.point_position[point_lights] = object.transform.position.extend(1.0).into();
                        frame.point_color[point_lights] = [r, g, b, distance];
                        point_lights += 1;
                    }
                    LightKind::Point { .. } => log::debug!("renderer: point light limit reached"),
                }
                continue;
            }

            let Some(renderable) = &object.renderable else { continue };
            let mesh = &renderable.mesh;
            if mesh.is_empty() {
                continue;
            }
            if !self.meshes.contains_key(&mesh.id()) {
                let gpu = GpuMesh {
                    vertex_buffer: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("mesh_vertices"),
                        contents: bytemuck::cast_slice(&mesh.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                    index_buffer: self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("mesh_indices"),
                        contents: bytemuck::cast_slice(&mesh.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    }),
                    index_count: mesh.indices.len() as u32,
                };
                self.meshes.insert(mesh.id(), gpu);
            }
            self.used_meshes.insert(mesh.id());

            let texture = renderable.material.texture.as_ref().map(|t| {
                if !self.textures.contains_key(&t.id()) {
                    let bg = Self::upload_texture(&self.device, &self.queue, &self.layouts, &self.sampler, t);
                    self.textures.insert(t.id(), bg);
                }
                self.used_textures.insert(t.id());
                t.id()
            });

            uniforms.push(ObjectUniform::new(
                object.transform.matrix(),
                renderable.material.color,
                texture.is_some(),
            ));
            draws.push(Draw { mesh: mesh.id(), texture });
        }
        frame.counts[0] = point_lights as u32;

        self.queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        if uniforms.len() > self.object_capacity {
            self.object_capacity = uniforms.len().next_power_of_two();
            let (buffer, bind_group) = Self::create_object_buffer(&self.device, &self.layouts, self.object_capacity);
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
        }
        if !uniforms.is_empty() {
            let stride = OBJECT_UNIFORM_STRIDE as usize;
            let mut bytes = vec![0u8; uniforms.len() * stride];
            for (i, u) in uniforms.iter().enumerate() {
                let start = i * stride;
                bytes[start..start + std::mem::size_of::<ObjectUniform>()].copy_from_slice(bytemuck::bytes_of(u));
            }
            self.queue.write_buffer(&self.object_buffer, 0, &bytes);
        }
        draws
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, pipeline: &wgpu::RenderPipeline, draws: &[Draw]) {
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for (i, draw) in draws.iter().enumerate() {
            let Some(mesh) = self.meshes.get(&draw.mesh) else { continue };
            let texture = draw
                .texture
                .and_then(|id| self.textures.get(&id))
                .unwrap_or(&self.white_texture);
            pass.set_bind_group(1, &self.object_bind_group, &[(i as u64 * OBJECT_UNIFORM_STRIDE) as u32]);
            pass.set_bind_group(2, texture, &[]);
            pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }
    }

    fn color_load(&mut self) -> wgpu::LoadOp<wgpu::Color> {
        if std::mem::take(&mut self.clear_color_pending) {
            wgpu::LoadOp::Clear(CLEAR_COLOR)
        } else {
            wgpu::LoadOp::Load
        }
    }
}

impl RenderBackend for Renderer {
    fn begin_frame(&mut self) -> Result<()> {
        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.frame = Some((frame, view));
        self.used_meshes.clear();
        self.used_textures.clear();
        Ok(())
    }

    fn clear_color(&mut self) {
        self.clear_color_pending = true;
    }

    fn clear_depth(&mut self) {
        self.clear_depth_pending = true;
    }

    fn render_bloom(&mut self, scene: &SceneGraph, camera: &Camera, bloom: &BloomSettings) -> Result<()> {
        let draws = self.prepare(scene, camera);
        self.bloom.set_settings(&self.queue, bloom);
        let load = self.color_load();
        let Some((_, view)) = self.frame.as_ref() else { return Ok(()) };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("bloom_pass") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("bloom_scene"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: self.bloom.scene_view(),
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: self.bloom.scene_depth_view(),
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.draw(&mut pass, &self.hdr_pipeline, &draws);
        }
        self.bloom.run(&mut encoder, view, load);

        // One submission per pass, so the next pass may rewrite the uniforms.
        self.queue.submit(std::iter::once(encoder.finish()));
        log::debug!("renderer: bloom pass, {} draws", draws.len());
        Ok(())
    }

    fn render_base(&mut self, scene: &SceneGraph, camera: &Camera) -> Result<()> {
        let draws = self.prepare(scene, camera);
        let load = self.color_load();
        let depth_load = if std::mem::take(&mut self.clear_depth_pending) {
            wgpu::LoadOp::Clear(1.0)
        } else {
            wgpu::LoadOp::Load
        };
        let Some((_, view)) = self.frame.as_ref() else { return Ok(()) };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("base_pass") });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("base"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations { load: depth_load, store: wgpu::StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            self.draw(&mut pass, &self.surface_pipeline, &draws);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        log::debug!("renderer: base pass, {} draws", draws.len());
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if let Some((frame, _)) = self.frame.take() {
            self.window.pre_present_notify();
            frame.present();
        }
        self.meshes.retain(|id, _| self.used_meshes.contains(id));
        self.textures.retain(|id, _| self.used_textures.contains(id));
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_view = create_depth_texture(&self.device, width, height, "depth");
        self.bloom.resize(&self.device, &self.queue, width, height);
    }
}
