//! Bloom post-process chain:
//! scene target → brightness threshold → separable gaussian blur → additive
//! composite of scene and glow into the frame.

use wgpu::util::DeviceExt;

use crate::compositor::BloomSettings;

use super::pipeline::create_depth_texture;

/// Format of the offscreen scene and blur targets.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// Width of the smoothstep ramp above the luminance threshold.
const THRESHOLD_SMOOTH_WIDTH: f32 = 0.01;

// ── Fullscreen Quad Helper ──────────────────────────────────────────────────

pub fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    shader_source: &str,
    bind_group_layouts: &[&wgpu::BindGroupLayout],
    output_format: wgpu::TextureFormat,
    blend: Option<wgpu::BlendState>,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(shader_source.into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&format!("{}_layout", label)),
        bind_group_layouts,
        ..Default::default()
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: output_format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            ..Default::default()
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

const FULLSCREEN_VS: &str = "
struct VertexOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vi: u32) -> VertexOut {
    var positions = array<vec2<f32>, 6>(
        vec2<f32>(-1.0,  1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0,  1.0),
        vec2<f32>( 1.0,  1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>( 1.0, -1.0),
    );
    var uvs = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(0.0, 1.0),
        vec2<f32>(1.0, 1.0),
    );
    var out: VertexOut;
    out.pos = vec4<f32>(positions[vi], 0.0, 1.0);
    out.uv  = uvs[vi];
    return out;
}
";

const ADDITIVE: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

// ── Uniforms ────────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ThresholdUniform {
    threshold: f32,
    smooth_width: f32,
    _pad: [f32; 2],
}

/// `step` is the UV offset between neighbouring taps.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurUniform {
    step: [f32; 2],
    _pad: [f32; 2],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct CompositeUniform {
    strength: f32,
    _pad: [f32; 3],
}

fn threshold_uniform(settings: &BloomSettings) -> ThresholdUniform {
    ThresholdUniform { threshold: settings.threshold, smooth_width: THRESHOLD_SMOOTH_WIDTH, _pad: [0.0; 2] }
}

/// Tap spacing for a blur direction on a target of the given size. `radius`
/// widens the kernel.
fn blur_uniform(horizontal: bool, width: u32, height: u32, radius: f32) -> BlurUniform {
    let spread = 1.0 + radius.max(0.0) * 3.0;
    let step = if horizontal {
        [spread / width.max(1) as f32, 0.0]
    } else {
        [0.0, spread / height.max(1) as f32]
    };
    BlurUniform { step, _pad: [0.0; 2] }
}

fn composite_uniform(settings: &BloomSettings) -> CompositeUniform {
    CompositeUniform { strength: settings.strength, _pad: [0.0; 3] }
}

// ── Targets ─────────────────────────────────────────────────────────────────

struct Targets {
    scene_view: wgpu::TextureView,
    scene_depth: wgpu::TextureView,
    /// Half resolution ping-pong pair for the threshold and blur stages.
    half_a: wgpu::TextureView,
    half_b: wgpu::TextureView,
    half_size: (u32, u32),
}

fn create_color_target(device: &wgpu::Device, width: u32, height: u32, label: &str) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: HDR_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

impl Targets {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let half_size = ((width / 2).max(1), (height / 2).max(1));
        Self {
            scene_view: create_color_target(device, width, height, "bloom_scene"),
            scene_depth: create_depth_texture(device, width, height, "bloom_scene_depth"),
            half_a: create_color_target(device, half_size.0, half_size.1, "bloom_half_a"),
            half_b: create_color_target(device, half_size.0, half_size.1, "bloom_half_b"),
            half_size,
        }
    }
}

struct BindGroups {
    /// Scene as the threshold stage input.
    threshold: wgpu::BindGroup,
    /// `half_a` as horizontal blur input.
    blur_h: wgpu::BindGroup,
    /// `half_b` as vertical blur input.
    blur_v: wgpu::BindGroup,
    /// Scene and blurred glow.
    composite: wgpu::BindGroup,
}

// ── BloomChain ──────────────────────────────────────────────────────────────

/// Offscreen bloom: the bloom layer is rendered into [`scene_view`](Self::scene_view),
/// then [`run`](Self::run) composites scene plus glow into the frame.
pub struct BloomChain {
    settings: BloomSettings,
    targets: Targets,
    bind_groups: BindGroups,
    sampler: wgpu::Sampler,
    texture_bgl: wgpu::BindGroupLayout,
    composite_bgl: wgpu::BindGroupLayout,
    threshold_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    composite_pipeline: wgpu::RenderPipeline,
    threshold_buffer: wgpu::Buffer,
    blur_h_buffer: wgpu::Buffer,
    blur_v_buffer: wgpu::Buffer,
    composite_buffer: wgpu::Buffer,
    threshold_uniform_bg: wgpu::BindGroup,
    blur_h_uniform_bg: wgpu::BindGroup,
    blur_v_uniform_bg: wgpu::BindGroup,
    composite_uniform_bg: wgpu::BindGroup,
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    }
}

fn uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    label: &str,
    contents: &[u8],
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout,
        entries: &[wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
    });
    (buffer, bind_group)
}

impl BloomChain {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        output_format: wgpu::TextureFormat,
        settings: BloomSettings,
    ) -> Self {
        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_texture_bgl"),
            entries: &[texture_entry(0), sampler_entry(1)],
        });
        let composite_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_composite_bgl"),
            entries: &[texture_entry(0), texture_entry(1), sampler_entry(2)],
        });
        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("bloom_uniform_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let threshold_shader = format!("{}
        @group(0) @binding(0) var t_src: texture_2d<f32>;
        @group(0) @binding(1) var s_src: sampler;
        struct Threshold {{ threshold: f32, smooth_width: f32, _pad0: f32, _pad1: f32 }};
        @group(1) @binding(0) var<uniform> u: Threshold;

        @fragment
        fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {{
            let color = textureSample(t_src, s_src, in.uv);
            let luma = dot(color.rgb, vec3<f32>(0.299, 0.587, 0.114));
            let keep = smoothstep(u.threshold, u.threshold + u.smooth_width, luma);
            return vec4<f32>(color.rgb * keep, 1.0);
        }}", FULLSCREEN_VS);

        let blur_shader = format!("{}
        @group(0) @binding(0) var t_src: texture_2d<f32>;
        @group(0) @binding(1) var s_src: sampler;
        struct Blur {{ step: vec2<f32>, _pad: vec2<f32> }};
        @group(1) @binding(0) var<uniform> u: Blur;

        @fragment
        fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {{
            var weights = array<f32, 5>(0.227027, 0.1945946, 0.1216216, 0.054054, 0.016216);
            var sum = textureSample(t_src, s_src, in.uv).rgb * weights[0];
            for (var i = 1; i < 5; i = i + 1) {{
                let offset = u.step * f32(i);
                sum += textureSample(t_src, s_src, in.uv + offset).rgb * weights[i];
                sum += textureSample(t_src, s_src, in.uv - offset).rgb * weights[i];
            }}
            return vec4<f32>(sum, 1.0);
        }}", FULLSCREEN_VS);

        let composite_shader = format!("{}
        @group(0) @binding(0) var t_scene: texture_2d<f32>;
        @group(0) @binding(1) var t_glow: texture_2d<f32>;
        @group(0) @binding(2) var s_linear: sampler;
        struct Composite {{ strength: f32, _pad0: f32, _pad1: f32, _pad2: f32 }};
        @group(1) @binding(0) var<uniform> u: Composite;

        @fragment
        fn fs_main(in: VertexOut) -> @location(0) vec4<f32> {{
            let scene = textureSample(t_scene, s_linear, in.uv).rgb;
            let glow = textureSample(t_glow, s_linear, in.uv).rgb;
            return vec4<f32>(scene + glow * u.strength, 1.0);
        }}", FULLSCREEN_VS);

        let threshold_pipeline = create_fullscreen_pipeline(
            device, "bloom_threshold", &threshold_shader, &[&texture_bgl, &uniform_bgl], HDR_FORMAT, None,
        );
        let blur_pipeline = create_fullscreen_pipeline(
            device, "bloom_blur", &blur_shader, &[&texture_bgl, &uniform_bgl], HDR_FORMAT, None,
        );
        let composite_pipeline = create_fullscreen_pipeline(
            device, "bloom_composite", &composite_shader, &[&composite_bgl, &uniform_bgl], output_format, Some(ADDITIVE),
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let targets = Targets::new(device, width, height);
        let (hw, hh) = targets.half_size;

        let (threshold_buffer, threshold_uniform_bg) =
            uniform_bind_group(device, &uniform_bgl, "bloom_threshold_uniform", bytemuck::bytes_of(&threshold_uniform(&settings)));
        let (blur_h_buffer, blur_h_uniform_bg) =
            uniform_bind_group(device, &uniform_bgl, "bloom_blur_h_uniform", bytemuck::bytes_of(&blur_uniform(true, hw, hh, settings.radius)));
        let (blur_v_buffer, blur_v_uniform_bg) =
            uniform_bind_group(device, &uniform_bgl, "bloom_blur_v_uniform", bytemuck::bytes_of(&blur_uniform(false, hw, hh, settings.radius)));
        let (composite_buffer, composite_uniform_bg) =
            uniform_bind_group(device, &uniform_bgl, "bloom_composite_uniform", bytemuck::bytes_of(&composite_uniform(&settings)));

        let bind_groups = Self::create_bind_groups(device, &texture_bgl, &composite_bgl, &sampler, &targets);

        Self {
            settings,
            targets,
            bind_groups,
            sampler,
            texture_bgl,
            composite_bgl,
            threshold_pipeline,
            blur_pipeline,
            composite_pipeline,
            threshold_buffer,
            blur_h_buffer,
            blur_v_buffer,
            composite_buffer,
            threshold_uniform_bg,
            blur_h_uniform_bg,
            blur_v_uniform_bg,
            composite_uniform_bg,
        }
    }

    fn create_bind_groups(
        device: &wgpu::Device,
        texture_bgl: &wgpu::BindGroupLayout,
        composite_bgl: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        targets: &Targets,
    ) -> BindGroups {
        let sampled = |view: &wgpu::TextureView, label: &str| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: texture_bgl,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(view) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
                ],
            })
        };
        BindGroups {
            threshold: sampled(&targets.scene_view, "bloom_threshold_bg"),
            blur_h: sampled(&targets.half_a, "bloom_blur_h_bg"),
            blur_v: sampled(&targets.half_b, "bloom_blur_v_bg"),
            composite: device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("bloom_composite_bg"),
                layout: composite_bgl,
                entries: &[
                    wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&targets.scene_view) },
                    wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::TextureView(&targets.half_a) },
                    wgpu::BindGroupEntry { binding: 2, resource: wgpu::BindingResource::Sampler(sampler) },
                ],
            }),
        }
    }

    /// Colour target the bloom layer is rendered into.
    pub fn scene_view(&self) -> &wgpu::TextureView {
        &self.targets.scene_view
    }

    pub fn scene_depth_view(&self) -> &wgpu::TextureView {
        &self.targets.scene_depth
    }

    /// Recreate every size-dependent target.
    pub fn resize(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.targets = Targets::new(device, width, height);
        self.bind_groups =
            Self::create_bind_groups(device, &self.texture_bgl, &self.composite_bgl, &self.sampler, &self.targets);
        self.write_blur_steps(queue);
    }

    /// Upload new settings if they differ from the current ones.
    pub fn set_settings(&mut self, queue: &wgpu::Queue, settings: &BloomSettings) {
        if *settings == self.settings {
            return;
        }
        self.settings = *settings;
        queue.write_buffer(&self.threshold_buffer, 0, bytemuck::bytes_of(&threshold_uniform(settings)));
        queue.write_buffer(&self.composite_buffer, 0, bytemuck::bytes_of(&composite_uniform(settings)));
        self.write_blur_steps(queue);
    }

    fn write_blur_steps(&self, queue: &wgpu::Queue) {
        let (hw, hh) = self.targets.half_size;
        let radius = self.settings.radius;
        queue.write_buffer(&self.blur_h_buffer, 0, bytemuck::bytes_of(&blur_uniform(true, hw, hh, radius)));
        queue.write_buffer(&self.blur_v_buffer, 0, bytemuck::bytes_of(&blur_uniform(false, hw, hh, radius)));
    }

    fn fullscreen_pass(
        encoder: &mut wgpu::CommandEncoder,
        label: &str,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        pipeline: &wgpu::RenderPipeline,
        input: &wgpu::BindGroup,
        uniforms: &wgpu::BindGroup,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, input, &[]);
        pass.set_bind_group(1, uniforms, &[]);
        pass.draw(0..6, 0..1);
    }

    /// Threshold, blur, then add scene plus glow onto `target`. `load` is
    /// the colour load op for `target`, so the caller decides whether this
    /// pass starts from a cleared frame.
    pub fn run(&self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView, load: wgpu::LoadOp<wgpu::Color>) {
        let clear = wgpu::LoadOp::Clear(wgpu::Color::BLACK);
        Self::fullscreen_pass(
            encoder, "bloom_threshold", &self.targets.half_a, clear,
            &self.threshold_pipeline, &self.bind_groups.threshold, &self.threshold_uniform_bg,
        );
        Self::fullscreen_pass(
            encoder, "bloom_blur_h", &self.targets.half_b, clear,
            &self.blur_pipeline, &self.bind_groups.blur_h, &self.blur_h_uniform_bg,
        );
        Self::fullscreen_pass(
            encoder, "bloom_blur_v", &self.targets.half_a, clear,
            &self.blur_pipeline, &self.bind_groups.blur_v, &self.blur_v_uniform_bg,
        );
        Self::fullscreen_pass(
            encoder, "bloom_composite", target, load,
            &self.composite_pipeline, &self.bind_groups.composite, &self.composite_uniform_bg,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_step_is_one_texel_without_radius() {
        let h = blur_uniform(true, 400, 300, 0.0);
        assert_eq!(h.step, [1.0 / 400.0, 0.0]);
        let v = blur_uniform(false, 400, 300, 0.0);
        assert_eq!(v.step, [0.0, 1.0 / 300.0]);
    }

    #[test]
    fn radius_widens_blur() {
        let tight = blur_uniform(true, 400, 300, 0.0).step[0];
        let wide = blur_uniform(true, 400, 300, 1.0).step[0];
        assert!(wide > tight);
        assert!((wide - 4.0 / 400.0).abs() < 1e-9);
    }

    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<ThresholdUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<BlurUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<CompositeUniform>() % 16, 0);
    }
}
