use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use gltf::buffer;
use itertools::izip;

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

/// Decoded base color texture, always RGBA8.
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

pub struct PrimitiveMaterial {
    pub base_color_factor: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub base_color_texture: Option<TextureData>,
}

impl Default for PrimitiveMaterial {
    fn default() -> Self {
        Self {
            base_color_factor: [1.0, 1.0, 1.0, 1.0],
            metallic: 0.0,
            roughness: 1.0,
            base_color_texture: None,
        }
    }
}

pub struct ModelPrimitive {
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: PrimitiveMaterial,
}

pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
}

pub type Buffers<'a> = &'a [buffer::Data];
pub type Images<'a> = &'a [gltf::image::Data];

impl Model {
    pub fn from_gltf(
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
        images: Images,
    ) -> anyhow::Result<Model> {
        let mut model = Model {
            name: name.into(),
            primitives: Vec::new(),
        };

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                return Err(anyhow::anyhow!(
                    "Unsupported primitive mode: {:?}",
                    primitive.mode()
                ));
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<Vec3> = reader
                .read_positions()
                .ok_or_else(|| anyhow::anyhow!("Primitive without positions: {}", model.name))?
                .map(Vec3::from)
                .collect();
            let normal_reader = reader
                .read_normals()
                .ok_or_else(|| anyhow::anyhow!("Primitive without normals: {}", model.name))?;

            let vertex_count = positions.len();

            // Unwrapped labels need UVs; untextured glass/metal parts get by
            // without them.
            let tex_coords: Vec<Vec2> = match reader.read_tex_coords(0) {
                Some(tex_coords) => tex_coords.into_f32().map(Vec2::from).collect(),
                None => vec![Vec2::ZERO; vertex_count],
            };

            let vertices = izip!(positions, normal_reader, tex_coords)
                .map(|(position, normal, tex_coords)| Vertex {
                    position,
                    normal: Vec3::from(normal),
                    tex_coords,
                })
                .collect::<Vec<Vertex>>();

            let indices = match reader.read_indices() {
                Some(index_reader) => index_reader.into_u32().collect::<Vec<u32>>(),
                None => (0..vertex_count as u32).collect(),
            };

            let material = read_material(&primitive.material(), images);

            model.primitives.push(ModelPrimitive {
                index: primitive.index(),
                vertices,
                indices,
                material,
            });
        }

        if model.primitives.is_empty() {
            return Err(anyhow::anyhow!("Mesh without primitives: {}", model.name));
        }

        Ok(model)
    }
}

fn read_material(material: &gltf::Material, images: Images) -> PrimitiveMaterial {
    let pbr = material.pbr_metallic_roughness();

    let base_color_texture = pbr.base_color_texture().and_then(|texture_info| {
        let index = texture_info.texture().source().index();
        match images.get(index) {
            Some(data) => convert_image_to_rgba8(data),
            None => {
                log::warn!("glTF base color texture index {index} out of bounds");
                None
            }
        }
    });

    PrimitiveMaterial {
        base_color_factor: pbr.base_color_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        base_color_texture,
    }
}

fn convert_image_to_rgba8(data: &gltf::image::Data) -> Option<TextureData> {
    let pixels = match data.format {
        gltf::image::Format::R8G8B8A8 => data.pixels.clone(),
        gltf::image::Format::R8G8B8 => {
            let mut rgba = Vec::with_capacity(data.pixels.len() / 3 * 4);
            for pixel in data.pixels.chunks(3) {
                rgba.extend_from_slice(pixel);
                rgba.push(255);
            }
            rgba
        }
        other => {
            log::warn!("Unsupported glTF texture format {other:?}, using material factor only");
            return None;
        }
    };

    Some(TextureData {
        width: data.width,
        height: data.height,
        pixels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 32);
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, normal), 12);
        assert_eq!(offset_of!(Vertex, tex_coords), 24);
    }

    #[test]
    fn rgb_textures_gain_an_opaque_alpha_channel() {
        let data = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };

        let converted = convert_image_to_rgba8(&data).expect("rgb8 should convert");
        assert_eq!(converted.pixels, vec![10, 20, 30, 255, 40, 50, 60, 255]);
        assert_eq!((converted.width, converted.height), (2, 1));
    }

    #[test]
    fn unsupported_texture_formats_fall_back_to_factors() {
        let data = gltf::image::Data {
            pixels: vec![0, 0],
            format: gltf::image::Format::R16,
            width: 1,
            height: 1,
        };
        assert!(convert_image_to_rgba8(&data).is_none());
    }
}
