mod camera;
mod pipelines;
mod resources;
mod uniforms;

pub use camera::{OrbitControls, PerspectiveCamera};

use std::collections::HashSet;
use std::sync::Arc;

use pipelines::{Pipelines, DEPTH_FORMAT, SCENE_COLOR_FORMAT};
use resources::{MeshCache, ObjectBindings, TextureCache};
use uniforms::{frame_uniform, FrameLights, ShadowUniform, SHADOW_MAP_SIZE};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::assets::{TextureHandle, TextureLoader};
use crate::scene::{Mesh, NodeId, SceneGraph, Side};

/// Upper bound on rendered pixels per logical pixel.
pub const MAX_PIXEL_RATIO: f64 = 2.0;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to create window surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible GPU adapter found")]
    NoAdapter,
    #[error("failed to open GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("window surface reports no supported formats")]
    UnsupportedSurface,
    #[error("failed to create placeholder textures")]
    PlaceholderTextures,
    #[error("GPU ran out of memory while acquiring a frame")]
    OutOfMemory,
}

/// Tessellated egui output for one frame.
pub struct OverlayFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// Size of the offscreen scene target for a window of `physical` pixels,
/// keeping the pixel ratio at or below [`MAX_PIXEL_RATIO`].
pub fn capped_render_size(physical: PhysicalSize<u32>, scale_factor: f64) -> PhysicalSize<u32> {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    let ratio = scale.min(MAX_PIXEL_RATIO) / scale;
    let cap = |value: u32| ((value as f64 * ratio).round() as u32).max(1);
    PhysicalSize::new(cap(physical.width), cap(physical.height))
}

/// Offscreen color/depth the scene is drawn into before presenting.
struct SceneTargets {
    size: PhysicalSize<u32>,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    present_bind_group: wgpu::BindGroup,
}

impl SceneTargets {
    fn new(
        device: &wgpu::Device,
        pipelines: &Pipelines,
        sampler: &wgpu::Sampler,
        size: PhysicalSize<u32>,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let present_bind_group =
            fullscreen_bind_group(device, &pipelines.fullscreen_layout, &color_view, sampler);
        Self {
            size,
            color_view,
            depth_view,
            present_bind_group,
        }
    }
}

fn fullscreen_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Fullscreen Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

pub struct RenderContext {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    /// sRGB view of the swapchain image the scene is presented through.
    present_format: wgpu::TextureFormat,
    scale_factor: f64,
    pipelines: Pipelines,
    textures: TextureCache,
    meshes: MeshCache,
    objects: ObjectBindings,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    shadow_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
    shadow_view: wgpu::TextureView,
    linear_sampler: wgpu::Sampler,
    targets: SceneTargets,
    sky: Option<(TextureHandle, wgpu::BindGroup)>,
    egui_renderer: egui_wgpu::Renderer,
}

impl RenderContext {
    pub async fn new(window: Arc<Window>) -> Result<Self, RenderError> {
        let window_size = window.inner_size();
        let scale_factor = window.scale_factor();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("Using GPU adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("cagebox device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        // egui draws into a non-sRGB view; the scene is presented through an
        // sRGB view of the same image.
        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb() && format.add_srgb_suffix() != *format)
            .or_else(|| capabilities.formats.first().copied())
            .ok_or(RenderError::UnsupportedSurface)?;
        let present_format = format.add_srgb_suffix();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: window_size.width.max(1),
            height: window_size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            desired_maximum_frame_latency: 2,
            alpha_mode: capabilities
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: if present_format != format {
                vec![present_format]
            } else {
                Vec::new()
            },
        };
        surface.configure(&device, &config);

        let pipelines = Pipelines::new(&device, present_format);
        let textures = TextureCache::new(&device, &queue).ok_or(RenderError::PlaceholderTextures)?;

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform"),
            size: std::mem::size_of::<uniforms::FrameUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Uniform"),
            size: std::mem::size_of::<ShadowUniform>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let shadow_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: SHADOW_MAP_SIZE,
                height: SHADOW_MAP_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_view = shadow_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &pipelines.frame_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&shadow_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&shadow_sampler),
                },
            ],
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Frame Bind Group"),
            layout: &pipelines.shadow_frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_buffer.as_entire_binding(),
            }],
        });

        let linear_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Fullscreen Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let render_size = capped_render_size(window_size, scale_factor);
        let targets = SceneTargets::new(&device, &pipelines, &linear_sampler, render_size);
        let egui_renderer = egui_wgpu::Renderer::new(&device, format, None, 1, false);

        log::info!(
            "Surface {}x{} ({:?}), scene target {}x{}",
            config.width,
            config.height,
            format,
            render_size.width,
            render_size.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            present_format,
            scale_factor,
            pipelines,
            textures,
            meshes: MeshCache::default(),
            objects: ObjectBindings::default(),
            frame_buffer,
            frame_bind_group,
            shadow_buffer,
            shadow_bind_group,
            shadow_view,
            linear_sampler,
            targets,
            sky: None,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>, scale_factor: f64) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.scale_factor = scale_factor;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        let render_size = capped_render_size(new_size, scale_factor);
        if render_size != self.targets.size {
            self.targets =
                SceneTargets::new(&self.device, &self.pipelines, &self.linear_sampler, render_size);
        }
        log::debug!(
            "Resized surface to {}x{}, scene target {}x{}",
            new_size.width,
            new_size.height,
            render_size.width,
            render_size.height
        );
    }

    pub fn surface_size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    pub fn render_size(&self) -> PhysicalSize<u32> {
        self.targets.size
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn upload_textures(&mut self, loader: &mut TextureLoader, finished: &[TextureHandle]) {
        if finished.is_empty() {
            return;
        }
        self.textures
            .upload(&self.device, &self.queue, loader, finished);
    }

    fn update_sky(&mut self, background: Option<TextureHandle>) {
        let Some(handle) = background.filter(|handle| self.textures.is_uploaded(*handle)) else {
            self.sky = None;
            return;
        };
        if matches!(&self.sky, Some((current, _)) if *current == handle) {
            return;
        }
        let view = self.textures.view(Some(handle), crate::assets::ColorSpace::Srgb);
        let bind_group = fullscreen_bind_group(
            &self.device,
            &self.pipelines.fullscreen_layout,
            view,
            &self.linear_sampler,
        );
        self.sky = Some((handle, bind_group));
    }

    pub fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &PerspectiveCamera,
        overlay: OverlayFrame,
    ) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(err) => {
                log::warn!("Skipping frame: {}", err);
                return Ok(());
            }
        };
        let surface_view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let present_view = output.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(self.present_format),
            ..Default::default()
        });

        // --- Upload per-frame state ---
        let lights = FrameLights::collect(scene);
        let shadow_matrix = lights.shadow_view_projection();
        self.queue.write_buffer(
            &self.frame_buffer,
            0,
            bytemuck::bytes_of(&frame_uniform(camera, &lights)),
        );
        if let Some(matrix) = shadow_matrix {
            let uniform = ShadowUniform {
                light_view_proj: matrix.to_cols_array_2d(),
            };
            self.queue
                .write_buffer(&self.shadow_buffer, 0, bytemuck::bytes_of(&uniform));
        }

        let mut live = HashSet::new();
        for (id, node, mesh) in scene.meshes() {
            self.meshes.prepare(&self.device, &mesh.geometry);
            self.objects.prepare(
                &self.device,
                &self.queue,
                &self.pipelines.object_layout,
                &self.textures,
                id,
                node,
                mesh,
            );
            live.insert(id);
        }
        self.objects.retain(&live);
        self.update_sky(scene.background());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        // Pass 1: shadow depth. Always cleared so the map is defined.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            if shadow_matrix.is_some() {
                pass.set_pipeline(&self.pipelines.shadow);
                pass.set_bind_group(0, &self.shadow_bind_group, &[]);
                for (id, _, mesh) in scene.meshes().filter(|(_, _, mesh)| mesh.cast_shadow) {
                    draw_mesh(&mut pass, &self.meshes, &self.objects, id, mesh);
                }
            }
        }

        // Pass 2: sky and scene into the offscreen target.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.targets.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });
            if let Some((_, sky)) = &self.sky {
                pass.set_pipeline(&self.pipelines.sky);
                pass.set_bind_group(0, sky, &[]);
                pass.draw(0..3, 0..1);
            }
            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (id, _, mesh) in scene.meshes() {
                let pipeline = match mesh.material.side() {
                    Side::Front => &self.pipelines.front,
                    Side::Double => &self.pipelines.double,
                };
                pass.set_pipeline(pipeline);
                draw_mesh(&mut pass, &self.meshes, &self.objects, id, mesh);
            }
        }

        // Pass 3: scene target onto the swapchain image.
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Present Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &present_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            pass.set_pipeline(&self.pipelines.present);
            pass.set_bind_group(0, &self.targets.present_bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        // Pass 4: egui overlay.
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: overlay.pixels_per_point,
        };
        for (id, delta) in &overlay.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        let egui_commands = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &overlay.primitives,
            &screen,
        );
        {
            let pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            let mut pass = pass.forget_lifetime();
            self.egui_renderer
                .render(&mut pass, &overlay.primitives, &screen);
        }
        for id in &overlay.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        let mut commands = egui_commands;
        commands.push(encoder.finish());
        self.queue.submit(commands);
        output.present();
        Ok(())
    }
}

fn draw_mesh(
    pass: &mut wgpu::RenderPass<'_>,
    meshes: &MeshCache,
    objects: &ObjectBindings,
    id: NodeId,
    mesh: &Mesh,
) {
    let (Some(gpu_mesh), Some(object)) = (meshes.get(&mesh.geometry), objects.get(id)) else {
        return;
    };
    pass.set_bind_group(1, &object.bind_group, &[]);
    pass.set_vertex_buffer(0, gpu_mesh.vertex_buffer.slice(..));
    pass.set_index_buffer(gpu_mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
    pass.draw_indexed(0..gpu_mesh.index_count, 0, 0..1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_size_is_unchanged_up_to_the_cap() {
        let size = PhysicalSize::new(1600, 900);
        assert_eq!(capped_render_size(size, 1.0), size);
        assert_eq!(capped_render_size(size, 2.0), size);
    }

    #[test]
    fn render_size_is_capped_on_dense_displays() {
        let size = capped_render_size(PhysicalSize::new(3000, 1500), 3.0);
        assert_eq!(size, PhysicalSize::new(2000, 1000));
    }

    #[test]
    fn render_size_never_collapses_to_zero() {
        assert_eq!(
            capped_render_size(PhysicalSize::new(0, 0), 4.0),
            PhysicalSize::new(1, 1)
        );
        assert_eq!(
            capped_render_size(PhysicalSize::new(640, 480), f64::NAN),
            PhysicalSize::new(640, 480)
        );
    }
}
