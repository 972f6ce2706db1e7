use glam::{Vec3, Vec4};
use wgpu::util::DeviceExt;

/// The fixed showcase rig: a strong white ambient plus two half-intensity
/// directional fills coming in over opposite shoulders.
pub struct LightRig {
    pub ambient_color: Vec3,
    pub ambient_intensity: f32,
    pub directional: [DirectionalLight; 2],
}

pub struct DirectionalLight {
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
}

impl LightRig {
    pub fn showcase() -> Self {
        Self {
            ambient_color: Vec3::ONE,
            ambient_intensity: 2.0,
            directional: [
                DirectionalLight {
                    direction: Vec3::new(1.0, 1.0, 1.0).normalize(),
                    color: Vec3::ONE,
                    intensity: 0.5,
                },
                DirectionalLight {
                    direction: Vec3::new(1.0, 1.0, -1.0).normalize(),
                    color: Vec3::ONE,
                    intensity: 0.5,
                },
            ],
        }
    }

    pub fn to_uniform(&self) -> LightsUniform {
        LightsUniform {
            ambient: self.ambient_color.extend(self.ambient_intensity),
            directions: [
                self.directional[0].direction.extend(0.0),
                self.directional[1].direction.extend(0.0),
            ],
            colors: [
                self.directional[0].color.extend(self.directional[0].intensity),
                self.directional[1].color.extend(self.directional[1].intensity),
            ],
        }
    }
}

/// Shader-side layout: color in xyz, intensity in w.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    ambient: Vec4,
    directions: [Vec4; 2],
    colors: [Vec4; 2],
}

impl LightsUniform {
    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lights Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn showcase_rig_matches_the_page_lighting() {
        let rig = LightRig::showcase();
        assert_eq!(rig.ambient_intensity, 2.0);
        assert_eq!(rig.directional.len(), 2);
        for light in &rig.directional {
            assert_eq!(light.intensity, 0.5);
            assert!((light.direction.length() - 1.0).abs() < 1e-6);
        }
        // Opposing diagonals: same X/Y, mirrored Z.
        assert_eq!(
            rig.directional[0].direction.z,
            -rig.directional[1].direction.z
        );
    }

    #[test]
    fn uniform_layout_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightsUniform>() % 16, 0);
    }
}
