use std::mem::offset_of;

use glam::Vec4;
use id_arena::Id;
use wgpu::util::DeviceExt;

use crate::model::{Model, ModelPrimitive, PrimitiveMaterial, Vertex};
use crate::rendering::instance::{InstanceBuffer, Instances};
use crate::rendering::texture::Texture;

pub type RenderModelId = Id<RenderModel>;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    base_color_factor: Vec4,
    // x = metallic, y = roughness
    params: Vec4,
}

impl MaterialUniform {
    fn new(material: &PrimitiveMaterial) -> Self {
        Self {
            base_color_factor: Vec4::from_array(material.base_color_factor),
            params: Vec4::new(material.metallic, material.roughness, 0.0, 0.0),
        }
    }
}

pub struct RenderPrimitive {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
    pub material_bind_group: wgpu::BindGroup,
    _base_color_texture: Option<Texture>,
}

impl RenderPrimitive {
    fn from_primitive(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        model: &Model,
        primitive: &ModelPrimitive,
        material_layout: &wgpu::BindGroupLayout,
        white_texture: &Texture,
    ) -> Self {
        let vertex_buffer_name = format!(
            "Vertex buffer ({}, primitive {})",
            model.name, primitive.index
        );
        let index_buffer_name = format!(
            "Index buffer ({}, primitive {})",
            model.name, primitive.index
        );

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&vertex_buffer_name),
            contents: bytemuck::cast_slice(&primitive.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&index_buffer_name),
            contents: bytemuck::cast_slice(&primitive.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let base_color_texture = primitive.material.base_color_texture.as_ref().map(|data| {
            Texture::from_rgba8(
                device,
                queue,
                data.width,
                data.height,
                &data.pixels,
                &format!("Base color ({}, primitive {})", model.name, primitive.index),
            )
        });

        let material_uniform = MaterialUniform::new(&primitive.material);
        let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!(
                "Material buffer ({}, primitive {})",
                model.name, primitive.index
            )),
            contents: bytemuck::cast_slice(&[material_uniform]),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        // Untextured parts bind a 1x1 white pixel so the factor alone decides
        // the color.
        let bound_texture = base_color_texture.as_ref().unwrap_or(white_texture);

        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!(
                "Material bind group ({}, primitive {})",
                model.name, primitive.index
            )),
            layout: material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: material_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&bound_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&bound_texture.sampler),
                },
            ],
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: primitive.indices.len() as u32,
            material_bind_group,
            _base_color_texture: base_color_texture,
        }
    }
}

pub struct RenderModel {
    pub primitives: Vec<RenderPrimitive>,
    pub instances: Instances,
    pub instance_buffer: InstanceBuffer,
}

impl RenderModel {
    pub fn from_model(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        model: &Model,
        material_layout: &wgpu::BindGroupLayout,
        white_texture: &Texture,
    ) -> Self {
        let primitives = model
            .primitives
            .iter()
            .map(|primitive| {
                RenderPrimitive::from_primitive(
                    device,
                    queue,
                    model,
                    primitive,
                    material_layout,
                    white_texture,
                )
            })
            .collect();
        let instance_buffer = InstanceBuffer::new(device, model.name.clone());

        RenderModel {
            primitives,
            instances: Instances::new(),
            instance_buffer,
        }
    }
}

pub fn render_model_instances(
    render_pass: &mut wgpu::RenderPass,
    queue: &wgpu::Queue,
    render_model: &RenderModel,
) {
    render_model
        .instances
        .write_to_buffer(queue, &render_model.instance_buffer);
    render_model.instance_buffer.bind(render_pass);

    for primitive in &render_model.primitives {
        render_pass.set_bind_group(3, &primitive.material_bind_group, &[]);
        render_pass.set_vertex_buffer(0, primitive.vertex_buffer.slice(..));
        render_pass.set_index_buffer(primitive.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(
            0..primitive.num_indices,
            0,
            0..render_model.instances.len() as u32,
        );
    }
}

pub const RENDER_MODEL_VBL: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, position) as wgpu::BufferAddress,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, normal) as wgpu::BufferAddress,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x3,
        },
        wgpu::VertexAttribute {
            offset: offset_of!(Vertex, tex_coords) as wgpu::BufferAddress,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x2,
        },
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_buffer_layout_covers_the_whole_vertex() {
        assert_eq!(
            RENDER_MODEL_VBL.array_stride,
            std::mem::size_of::<Vertex>() as wgpu::BufferAddress
        );
        let last = RENDER_MODEL_VBL.attributes.last().unwrap();
        assert_eq!(last.offset, 24);
        assert_eq!(last.format, wgpu::VertexFormat::Float32x2);
    }
}
