//! GPU-side copies of scene data: textures, meshes and per-object bindings.

use std::collections::{HashMap, HashSet};

use wgpu::util::DeviceExt;

use super::uniforms::{object_uniform, ObjectUniform};
use crate::assets::{ColorSpace, LoadedImage, TextureHandle, TextureLoader};
use crate::scene::geometry::Geometry;
use crate::scene::{Material, Mesh, NodeId, SceneNode};

pub struct GpuTexture {
    _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

fn texture_format(color_space: ColorSpace) -> wgpu::TextureFormat {
    match color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    }
}

/// Full mip chain, level 0 first.
fn mip_chain(image: LoadedImage) -> Vec<image::RgbaImage> {
    let Some(base) = image::RgbaImage::from_raw(image.width, image.height, image.pixels) else {
        return Vec::new();
    };
    let mut levels = vec![base];
    loop {
        let Some(last) = levels.last() else {
            break;
        };
        let (width, height) = last.dimensions();
        if width == 1 && height == 1 {
            break;
        }
        let next = image::imageops::resize(
            last,
            (width / 2).max(1),
            (height / 2).max(1),
            image::imageops::FilterType::Triangle,
        );
        levels.push(next);
    }
    levels
}

fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    levels: &[image::RgbaImage],
    format: wgpu::TextureFormat,
) -> Option<GpuTexture> {
    let base = levels.first()?;
    let (width, height) = base.dimensions();
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: levels.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    for (level, pixels) in levels.iter().enumerate() {
        let (level_width, level_height) = pixels.dimensions();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * level_width),
                rows_per_image: Some(level_height),
            },
            wgpu::Extent3d {
                width: level_width,
                height: level_height,
                depth_or_array_layers: 1,
            },
        );
    }
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    Some(GpuTexture {
        _texture: texture,
        view,
    })
}

/// Uploaded textures plus white stand-ins for anything not loaded yet.
pub struct TextureCache {
    uploaded: HashMap<TextureHandle, GpuTexture>,
    white: GpuTexture,
    white_mask: GpuTexture,
    pub sampler: wgpu::Sampler,
}

impl TextureCache {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Option<Self> {
        let white_pixel = vec![image::RgbaImage::from_pixel(1, 1, image::Rgba([255; 4]))];
        let white = create_texture(
            device,
            queue,
            "White Texture",
            &white_pixel,
            texture_format(ColorSpace::Srgb),
        )?;
        let white_mask = create_texture(
            device,
            queue,
            "White Mask",
            &white_pixel,
            texture_format(ColorSpace::Linear),
        )?;
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        Some(Self {
            uploaded: HashMap::new(),
            white,
            white_mask,
            sampler,
        })
    }

    /// Move freshly decoded images from the loader onto the GPU.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        loader: &mut TextureLoader,
        finished: &[TextureHandle],
    ) {
        for handle in finished {
            let Some(image) = loader.take_image(*handle) else {
                continue;
            };
            let label = loader
                .path(*handle)
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            let format = texture_format(loader.color_space(*handle));
            match create_texture(device, queue, &label, &mip_chain(image), format) {
                Some(texture) => {
                    self.uploaded.insert(*handle, texture);
                }
                None => log::warn!("Skipped empty texture {}", label),
            }
        }
    }

    pub fn is_uploaded(&self, handle: TextureHandle) -> bool {
        self.uploaded.contains_key(&handle)
    }

    pub fn view(&self, handle: Option<TextureHandle>, color_space: ColorSpace) -> &wgpu::TextureView {
        match handle.and_then(|handle| self.uploaded.get(&handle)) {
            Some(texture) => &texture.view,
            None => match color_space {
                ColorSpace::Srgb => &self.white.view,
                ColorSpace::Linear => &self.white_mask.view,
            },
        }
    }
}

pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// One buffer pair per distinct geometry description.
#[derive(Default)]
pub struct MeshCache {
    meshes: HashMap<[u32; 4], GpuMesh>,
}

impl MeshCache {
    pub fn prepare(&mut self, device: &wgpu::Device, geometry: &Geometry) {
        self.meshes.entry(geometry.cache_key()).or_insert_with(|| {
            let data = geometry.build();
            GpuMesh {
                vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Vertices"),
                    contents: bytemuck::cast_slice(&data.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Indices"),
                    contents: bytemuck::cast_slice(&data.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: data.indices.len() as u32,
            }
        });
    }

    pub fn get(&self, geometry: &Geometry) -> Option<&GpuMesh> {
        self.meshes.get(&geometry.cache_key())
    }
}

/// Which textures an object's bind group was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BindingKey {
    map: Option<TextureHandle>,
    map_ready: bool,
    alpha: Option<TextureHandle>,
    alpha_ready: bool,
}

pub struct ObjectGpu {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    key: BindingKey,
}

#[derive(Default)]
pub struct ObjectBindings {
    objects: HashMap<NodeId, ObjectGpu>,
}

impl ObjectBindings {
    /// Write this frame's uniform for `id` and rebuild its bind group when a
    /// material texture changed or finished uploading.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        textures: &TextureCache,
        id: NodeId,
        node: &SceneNode,
        mesh: &Mesh,
    ) {
        let (map, alpha) = match &mesh.material {
            Material::Standard(material) => (material.map, material.alpha_map),
            Material::Matcap(material) => (Some(material.matcap), None),
        };
        let ready = |handle: Option<TextureHandle>| handle.is_some_and(|h| textures.is_uploaded(h));
        let key = BindingKey {
            map,
            map_ready: ready(map),
            alpha,
            alpha_ready: ready(alpha),
        };
        let uniform: ObjectUniform = object_uniform(node, mesh, key.alpha_ready);

        if let Some(object) = self.objects.get_mut(&id) {
            queue.write_buffer(&object.buffer, 0, bytemuck::bytes_of(&uniform));
            if object.key == key {
                return;
            }
            object.bind_group =
                object_bind_group(device, layout, textures, &object.buffer, map, alpha);
            object.key = key;
            return;
        }

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(node.name.as_str()),
            contents: bytemuck::bytes_of(&uniform),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = object_bind_group(device, layout, textures, &buffer, map, alpha);
        self.objects.insert(
            id,
            ObjectGpu {
                buffer,
                bind_group,
                key,
            },
        );
    }

    pub fn get(&self, id: NodeId) -> Option<&ObjectGpu> {
        self.objects.get(&id)
    }

    /// Drop bindings for nodes that no longer exist.
    pub fn retain(&mut self, live: &HashSet<NodeId>) {
        self.objects.retain(|id, _| live.contains(id));
    }
}

fn object_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    textures: &TextureCache,
    buffer: &wgpu::Buffer,
    map: Option<TextureHandle>,
    alpha: Option<TextureHandle>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Object Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(textures.view(map, ColorSpace::Srgb)),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(
                    textures.view(alpha, ColorSpace::Linear),
                ),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(&textures.sampler),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_chain_halves_down_to_one_pixel() {
        let image = LoadedImage {
            width: 8,
            height: 2,
            pixels: vec![128; 8 * 2 * 4],
        };
        let levels = mip_chain(image);
        let sizes: Vec<_> = levels.iter().map(|level| level.dimensions()).collect();
        assert_eq!(sizes, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn mip_chain_rejects_truncated_pixels() {
        let image = LoadedImage {
            width: 4,
            height: 4,
            pixels: vec![0; 3],
        };
        assert!(mip_chain(image).is_empty());
    }
}
