//! GPU rendering for the cube viewport.
//!
//! This module owns the wgpu resources used to draw every cubie with one
//! instanced draw call: a shared unit-cube mesh, a per-cubie instance buffer
//! (model matrix plus six face colors), the camera uniform and a depth buffer.

use iced::widget::shader::wgpu::{self, CommandEncoder, Device, Queue, TextureFormat, TextureView};
use iced::{Rectangle, Size};
use nalgebra::Vector4;
use wgpu::util::DeviceExt;

use crate::camera::{Camera, CameraUniform, Projection};
use crate::cube::{CUBIE_INDICES, CUBIE_VERTICES, Face};
use crate::math::model_matrix;
use crate::session::CubeSession;

/// Instance slots allocated up front; enough for a 4x4 cube.
const INITIAL_INSTANCE_CAPACITY: usize = 64;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// GPU renderer for the cube viewport.
#[derive(Debug)]
pub(crate) struct Renderer {
    /// Physical-pixel bounds within the target to render to
    bounds: Rectangle<f32>,
    /// Graphics pipeline for cubie rendering
    render_pipeline: wgpu::RenderPipeline,
    /// Unit cubie mesh
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
    /// Per-cubie instance data
    instance_buffer: wgpu::Buffer,
    /// Number of instances the buffer can hold
    instance_capacity: usize,
    /// Number of instances to render
    num_instances: u32,
    /// Whether colors must be converted to linear before writing to the target
    linearize_colors: bool,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    /// Depth texture for z-buffering
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
    /// Fills the viewport bounds with the background color
    clear_pipeline: wgpu::RenderPipeline,
}

/// One corner of the cubie mesh.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
    /// Index into the instance's face colors
    face: u32,
}

/// GPU-compatible per-cubie data.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub(crate) struct InstanceRaw {
    /// 4x4 model transformation matrix
    model: [[f32; 4]; 4],
    /// RGBA colors in `Face::ALL` order, sRGB encoded
    colors: [[f32; 4]; 6],
}

impl InstanceRaw {
    fn linearized(&self) -> Self {
        Self {
            model: self.model,
            colors: self.colors.map(|[r, g, b, a]| {
                [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), a]
            }),
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Builds one instance per cubie from the session's current world transforms.
pub(crate) fn generate_instances(session: &CubeSession) -> Vec<InstanceRaw> {
    let scale = session.config().cube_size;
    session
        .cubie_transforms()
        .map(|(cubie, world)| InstanceRaw {
            model: model_matrix(&world, scale).into(),
            colors: Face::ALL.map(|face| Vector4::from(cubie.face_color(face)).into()),
        })
        .collect()
}

/// Expands the shared corner table into vertices carrying normals and face ids.
fn cubie_mesh() -> Vec<Vertex> {
    CUBIE_VERTICES
        .chunks(4)
        .zip(Face::ALL)
        .flat_map(|(corners, face)| {
            corners.iter().map(move |&position| Vertex {
                position,
                normal: face.normal().into(),
                face: face as u32,
            })
        })
        .collect()
}

fn create_instance_buffer(device: &Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_depth_texture(device: &Device, size: Size<u32>) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    })
}

impl Renderer {
    /// Creates the pipelines and buffers for drawing cubies into `format` targets.
    ///
    /// # Arguments
    /// * `bounds` - Physical-pixel rectangle of the viewport within the target
    /// * `viewport_size` - Physical size of the whole target, used for the depth buffer
    pub(crate) fn new(
        device: &Device,
        format: TextureFormat,
        bounds: Rectangle<f32>,
        viewport_size: Size<u32>,
    ) -> Self {
        let camera_uniform = CameraUniform::new();

        let depth_texture = create_depth_texture(device, viewport_size);
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("Camera Bind Group Layout"),
            });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("Camera Bind Group"),
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cubie Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&camera_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![
                            0 => Float32x3,
                            1 => Float32x3,
                            2 => Uint32,
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &wgpu::vertex_attr_array![
                            3 => Float32x4,
                            4 => Float32x4,
                            5 => Float32x4,
                            6 => Float32x4,
                            7 => Float32x4,
                            8 => Float32x4,
                            9 => Float32x4,
                            10 => Float32x4,
                            11 => Float32x4,
                            12 => Float32x4,
                        ],
                    },
                ],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Vertex Buffer"),
            contents: bytemuck::cast_slice(&cubie_mesh()),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Index Buffer"),
            contents: bytemuck::cast_slice(&CUBIE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let instance_buffer = create_instance_buffer(device, INITIAL_INSTANCE_CAPACITY);

        let clear_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Clear Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("clear.wgsl").into()),
        });

        let clear_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Clear Pipeline Layout"),
                bind_group_layouts: &[],
                push_constant_ranges: &[],
            });

        // Full-screen triangle generated from the vertex index, no buffers.
        let clear_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Clear Pipeline"),
            layout: Some(&clear_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &clear_shader,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &clear_shader,
                entry_point: if format.is_srgb() { "fs_linear" } else { "fs_srgb" },
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        Self {
            bounds,
            render_pipeline,
            vertex_buffer,
            index_buffer,
            num_indices: CUBIE_INDICES.len() as u32,
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
            num_instances: 0,
            linearize_colors: format.is_srgb(),
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            depth_texture,
            depth_view,
            clear_pipeline,
        }
    }

    /// Tracks the widget bounds and recreates the depth buffer when the
    /// target size changes.
    pub(crate) fn resize(&mut self, device: &Device, new_bounds: Rectangle<f32>, new_size: Size<u32>) {
        self.bounds = new_bounds;

        if new_size.width > 0
            && new_size.height > 0
            && (self.depth_texture.width() != new_size.width
                || self.depth_texture.height() != new_size.height)
        {
            self.depth_texture = create_depth_texture(device, new_size);
            self.depth_view = self
                .depth_texture
                .create_view(&wgpu::TextureViewDescriptor::default());
        }
    }

    pub(crate) fn update_camera(&mut self, queue: &Queue, camera: &Camera, projection: &Projection) {
        self.camera_uniform.update_view_proj(camera, projection);
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
    }

    /// Uploads this frame's cubie instances, growing the buffer if needed.
    pub(crate) fn update_instances(&mut self, device: &Device, queue: &Queue, instances: &[InstanceRaw]) {
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = create_instance_buffer(device, self.instance_capacity);
            log::debug!("instance buffer grown to {} slots", self.instance_capacity);
        }

        if self.linearize_colors {
            let linear: Vec<InstanceRaw> = instances.iter().map(InstanceRaw::linearized).collect();
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&linear));
        } else {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(instances));
        }
        self.num_instances = instances.len() as u32;
    }

    /// Draws the background and then every cubie inside the widget bounds.
    pub(crate) fn render(&self, encoder: &mut CommandEncoder, target: &TextureView) {
        if self.bounds.width < 1.0 || self.bounds.height < 1.0 {
            return;
        }

        // First pass: fill only the bounds area with the background
        {
            let mut clear_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load, // Don't clear the entire target
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            clear_pass.set_viewport(
                self.bounds.x,
                self.bounds.y,
                self.bounds.width,
                self.bounds.height,
                0.0,
                1.0,
            );
            clear_pass.set_pipeline(&self.clear_pipeline);
            clear_pass.draw(0..3, 0..1);
        }

        if self.num_instances == 0 {
            return;
        }

        // Second pass: the cubies, depth tested
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_viewport(
                self.bounds.x,
                self.bounds.y,
                self.bounds.width,
                self.bounds.height,
                0.0,
                1.0,
            );
            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..self.num_indices, 0, 0..self.num_instances);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CubeConfig;
    use crate::cube::CubeSize;

    #[test]
    fn one_instance_per_cubie() {
        let session = CubeSession::new(CubeConfig::default(), CubeSize::Four).unwrap();
        assert_eq!(generate_instances(&session).len(), 56);
    }

    #[test]
    fn instance_model_carries_world_position() {
        let session = CubeSession::new(CubeConfig::default(), CubeSize::Two).unwrap();
        for (instance, (_, world)) in generate_instances(&session)
            .iter()
            .zip(session.cubie_transforms())
        {
            let translation = instance.model[3];
            assert_eq!(translation[0], world.translation.vector.x);
            assert_eq!(translation[1], world.translation.vector.y);
            assert_eq!(translation[2], world.translation.vector.z);
            assert_eq!(translation[3], 1.0);
        }
    }

    #[test]
    fn instance_colors_follow_face_order() {
        let session = CubeSession::new(CubeConfig::default(), CubeSize::Two).unwrap();
        let palette = session.config().palette;
        for (instance, (cubie, _)) in generate_instances(&session)
            .iter()
            .zip(session.cubie_transforms())
        {
            for face in Face::ALL {
                let expected: [f32; 4] = Vector4::from(cubie.face_color(face)).into();
                assert_eq!(instance.colors[face as usize], expected);
            }
            let right: [f32; 4] = Vector4::from(palette.face(Face::Right)).into();
            let on_right = cubie.home.get(crate::cube::Axis::X) == 1;
            assert_eq!(instance.colors[Face::Right as usize] == right, on_right);
        }
    }

    #[test]
    fn mesh_has_four_vertices_per_face() {
        let mesh = cubie_mesh();
        assert_eq!(mesh.len(), 24);
        assert!(mesh[..4].iter().all(|v| v.face == 0 && v.normal == [1.0, 0.0, 0.0]));
        assert!(mesh[20..].iter().all(|v| v.face == 5 && v.normal == [0.0, 0.0, -1.0]));
    }

    #[test]
    fn srgb_conversion_endpoints() {
        assert_eq!(srgb_to_linear(0.0), 0.0);
        assert!((srgb_to_linear(1.0) - 1.0).abs() < 1e-6);
        assert!(srgb_to_linear(0.5) < 0.5);
    }
}
