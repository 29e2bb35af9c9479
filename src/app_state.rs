use std::sync::Arc;

use anyhow::Context;
use instant::Instant;
use rand::SeedableRng;
use rand::rngs::StdRng;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::color::Color;
use crate::models::{CircleInstance, LineVertex, Vertex2D};
use crate::scene::{Animator, GrowthConfig, NodeRole};
use crate::viewport::Viewport;

const LINES_WGSL: &str = include_str!("./shaders/lines.wgsl");
const CIRCLES_WGSL: &str = include_str!("./shaders/circles.wgsl");

const BACKGROUND_COLOR: Color = Color::rgb(18, 18, 18);
const CORE_COLOR: Color = Color::rgb(79, 70, 229);
const COMPLEX_COLOR: Color = Color::rgb(124, 58, 237);
const LINK_COLOR: Color = Color::rgb(79, 70, 229).with_alpha(0.2);
/// Alpha of a disc's rim, fading the radial gradient outward.
const DISC_EDGE_ALPHA: f32 = 0.6;
/// Alpha of the translucent pulse halo.
const PULSE_ALPHA: f32 = 0.1;

pub struct State {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub is_surface_configured: bool,

    pub viewport: Viewport,
    pub viewport_buffer: wgpu::Buffer,
    pub viewport_bind_group: wgpu::BindGroup,
    pub viewport_needs_update: bool,
    needs_srgb_output_conversion: bool,

    pub line_render_pipeline: wgpu::RenderPipeline,
    pub circle_render_pipeline: wgpu::RenderPipeline,

    pub circle_instances: Vec<CircleInstance>,
    pub circle_instance_buffer: wgpu::Buffer,
    pub quad_vertex_buffer: wgpu::Buffer,
    pub quad_index_buffer: wgpu::Buffer,

    pub line_vertices: Vec<LineVertex>,
    pub line_vertex_buffer: wgpu::Buffer,

    pub animator: Animator,
    rng: StdRng,

    pub last_frame_instant: Instant,
    pub frame_count_in_second: u32,
    pub current_fps: u32,
}

impl State {
    pub async fn new(window_arc: Arc<Window>) -> anyhow::Result<State> {
        let size = window_arc.inner_size();

        let gpu = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        // Surface itself is !Send on WASM due to HtmlCanvasElement
        let surface = gpu
            .create_surface(window_arc)
            .context("failed to create render surface")?;

        let adapter = gpu
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable GPU adapter")?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to acquire GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let texture_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or_else(|| {
                log::warn!(
                    "No sRGB surface format found, falling back to {:?}",
                    surface_caps.formats[0]
                );
                surface_caps.formats[0]
            });

        let needs_srgb_output_conversion = !texture_format.is_srgb();

        log::info!(
            "Using {} ({:?}, Target Format: {:?}), Needs Shader sRGB Output Conversion: {}",
            adapter_info.name,
            adapter_info.backend,
            texture_format,
            needs_srgb_output_conversion
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: texture_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let viewport = Viewport::new(size.width, size.height);
        let viewport_uniform = viewport.uniform(needs_srgb_output_conversion);

        let viewport_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Viewport Buffer"),
            contents: bytemuck::cast_slice(&[viewport_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let viewport_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Viewport Bind Group Layout"),
            });

        let viewport_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &viewport_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: viewport_buffer.as_entire_binding(),
            }],
            label: Some("Viewport Bind Group"),
        });

        let lines_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lines Shader"),
            source: wgpu::ShaderSource::Wgsl(LINES_WGSL.into()),
        });

        let circles_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Circles Shader"),
            source: wgpu::ShaderSource::Wgsl(CIRCLES_WGSL.into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&viewport_bind_group_layout],
                push_constant_ranges: &[],
            });

        let line_render_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Line Render Pipeline"),
                layout: Some(&render_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &lines_shader_module,
                    entry_point: Some("vs_main"),
                    buffers: &[LineVertex::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &lines_shader_module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: texture_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::LineList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            });

        let circle_render_pipeline =
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Circle Render Pipeline"),
                layout: Some(&render_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &circles_shader_module,
                    entry_point: Some("vs_main"),
                    buffers: &[Vertex2D::layout(), CircleInstance::layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &circles_shader_module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: texture_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            });

        let animator = Animator::new(
            size.width.max(1) as f32,
            size.height.max(1) as f32,
            GrowthConfig::default(),
        );

        let (line_vertices, circle_instances) = build_geometry(&animator);

        let circle_instance_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Circle Instance Buffer"),
                contents: bytemuck::cast_slice(&circle_instances),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });

        let quad_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Vertex Buffer"),
            contents: bytemuck::cast_slice(Vertex2D::QUAD_VERTICES.as_slice()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let quad_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Quad Index Buffer"),
            contents: bytemuck::cast_slice(Vertex2D::QUAD_INDICES.as_slice()),
            usage: wgpu::BufferUsages::INDEX,
        });

        let line_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Line Vertex Buffer"),
            contents: bytemuck::cast_slice(&line_vertices),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Ok(Self {
            surface,
            device,
            queue,
            config,
            is_surface_configured: false,
            viewport,
            viewport_buffer,
            viewport_bind_group,
            viewport_needs_update: true,
            needs_srgb_output_conversion,
            line_render_pipeline,
            circle_render_pipeline,
            circle_instances,
            circle_instance_buffer,
            quad_vertex_buffer,
            quad_index_buffer,
            line_vertices,
            line_vertex_buffer,
            animator,
            rng: StdRng::from_entropy(),
            last_frame_instant: Instant::now(),
            frame_count_in_second: 0,
            current_fps: 0,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            log::info!("Resize {}, {}", width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            self.viewport.resize(width, height);
            // Nodes keep their absolute coordinates; only future spawns see
            // the new bounds.
            self.animator.resize(width as f32, height as f32);
            self.viewport_needs_update = true;
            self.is_surface_configured = true;
        }
    }

    /// One animation frame: advance the graph, then refresh GPU data.
    pub fn update(&mut self) {
        self.animator.tick(&mut self.rng);

        let (line_vertices, circle_instances) = build_geometry(&self.animator);
        self.line_vertices = line_vertices;
        self.circle_instances = circle_instances;
        self.update_gpu_buffers();

        if self.viewport_needs_update {
            let uniform = self.viewport.uniform(self.needs_srgb_output_conversion);
            self.queue
                .write_buffer(&self.viewport_buffer, 0, bytemuck::cast_slice(&[uniform]));
            self.viewport_needs_update = false;
        }
    }

    fn update_gpu_buffers(&mut self) {
        let circle_data = bytemuck::cast_slice(&self.circle_instances);
        let line_data = bytemuck::cast_slice(&self.line_vertices);

        if self.circle_instance_buffer.size() < circle_data.len() as u64 {
            self.circle_instance_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Circle Instance Buffer (Resized)"),
                        contents: circle_data,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    });
        } else {
            self.queue
                .write_buffer(&self.circle_instance_buffer, 0, circle_data);
        }

        if self.line_vertex_buffer.size() < line_data.len() as u64 {
            self.line_vertex_buffer =
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Line Vertex Buffer (Resized)"),
                        contents: line_data,
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    });
        } else {
            self.queue.write_buffer(&self.line_vertex_buffer, 0, line_data);
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }

        self.frame_count_in_second += 1;
        let now = Instant::now();
        let elapsed = (now - self.last_frame_instant).as_secs_f32();
        if elapsed >= 1.0 {
            self.current_fps = self.frame_count_in_second;
            self.frame_count_in_second = 0;
            self.last_frame_instant = now;
            log::debug!(
                "FPS: {}, nodes: {}",
                self.current_fps,
                self.animator.graph().len()
            );
        }

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND_COLOR.into_linear_wgpu_color()),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_bind_group(0, &self.viewport_bind_group, &[]);

            // Edges first so nodes render on top of them.
            render_pass.set_pipeline(&self.line_render_pipeline);
            render_pass.set_vertex_buffer(0, self.line_vertex_buffer.slice(..));
            render_pass.draw(0..self.line_vertices.len() as u32, 0..1);

            render_pass.set_pipeline(&self.circle_render_pipeline);
            render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.circle_instance_buffer.slice(..));
            render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(
                0..Vertex2D::QUAD_INDICES.len() as u32,
                0,
                0..self.circle_instances.len() as u32,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

/// Flattens the graph into draw data. Edges are stored on both endpoints and
/// emitted from both, as the original effect drew them. For a pulsing node a
/// translucent halo disc precedes the node's own disc so it lands beneath it
/// in draw order.
fn build_geometry(animator: &Animator) -> (Vec<LineVertex>, Vec<CircleInstance>) {
    let graph = animator.graph();
    let link_color = LINK_COLOR.into_linear_rgba();

    let mut line_vertices = Vec::new();
    let mut circle_instances = Vec::new();

    for (_, node) in graph.iter() {
        for &peer in &node.links {
            line_vertices.push(LineVertex {
                position: node.position.into(),
                color: link_color,
            });
            line_vertices.push(LineVertex {
                position: graph.node(peer).position.into(),
                color: link_color,
            });
        }

        let scheme = match node.role {
            NodeRole::Core => CORE_COLOR,
            NodeRole::Complex => COMPLEX_COLOR,
        };

        if node.pulse > 0.0 {
            let halo = scheme.with_alpha(PULSE_ALPHA).into_linear_rgba();
            circle_instances.push(CircleInstance {
                position: node.position.into(),
                radius: node.radius + node.pulse,
                color_center: halo,
                color_edge: halo,
            });
        }

        circle_instances.push(CircleInstance {
            position: node.position.into(),
            radius: node.radius,
            color_center: scheme.into_linear_rgba(),
            color_edge: scheme.with_alpha(DISC_EDGE_ALPHA).into_linear_rgba(),
        });
    }

    (line_vertices, circle_instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::animator::{CENTER_RADIUS, RING_COUNT};

    #[test]
    fn geometry_covers_every_node_and_edge() {
        let animator = Animator::new(800.0, 600.0, GrowthConfig::default());
        let (lines, circles) = build_geometry(&animator);

        // 5 ring<->center edges, each emitted from both endpoints.
        assert_eq!(lines.len(), 2 * 2 * RING_COUNT);
        // No pulses at startup, so exactly one disc per node.
        assert_eq!(circles.len(), 1 + RING_COUNT);
        assert_eq!(circles[0].radius, CENTER_RADIUS);
        assert_eq!(circles[0].position, [400.0, 300.0]);
    }

    #[test]
    fn pulsing_node_gets_a_halo_under_its_disc() {
        let mut animator = Animator::new(800.0, 600.0, GrowthConfig {
            spawn_chance: 1.0,
            ..GrowthConfig::default()
        });
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        animator.tick(&mut rng);

        let (_, circles) = build_geometry(&animator);
        // 6 core discs + halo and disc for the pulsing spawn.
        assert_eq!(circles.len(), (1 + RING_COUNT) + 2);

        let halo = &circles[circles.len() - 2];
        let disc = &circles[circles.len() - 1];
        assert_eq!(halo.position, disc.position);
        assert!(halo.radius > disc.radius);
        assert_eq!(halo.color_center, halo.color_edge);
        assert!(halo.color_center[3] < disc.color_center[3]);
    }
}
