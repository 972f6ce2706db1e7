use glam::{Mat4, Vec2, Vec3, Vec4};
use wgpu::util::DeviceExt;

pub const FOV_Y_DEGREES: f32 = 95.0;
pub const Z_NEAR: f32 = 0.1;
pub const Z_FAR: f32 = 5000.0;
pub const ORBIT_DISTANCE: f32 = 5.0;

/// Camera orbiting a fixed target on a spherical shell. The polar angle is
/// measured from +Y, so π/2 keeps the eye on the horizontal plane through
/// the target.
pub struct OrbitCamera {
    pub target: Vec3,
    pub distance: f32,
    pub azimuth: f32,
    pub polar: f32,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: ORBIT_DISTANCE,
            azimuth: 0.0,
            polar: std::f32::consts::FRAC_PI_2,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let offset = Vec3::new(
            self.polar.sin() * self.azimuth.sin(),
            self.polar.cos(),
            self.polar.sin() * self.azimuth.cos(),
        ) * self.distance;
        self.target + offset
    }

    pub fn get_vp_matrix(&self, resolution: Vec2) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        let projection = Mat4::perspective_rh(
            FOV_Y_DEGREES.to_radians(),
            resolution.x / resolution.y,
            Z_NEAR,
            Z_FAR,
        );
        projection * view
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct CameraUniform {
    view_proj: Mat4,
    eye: Vec4,
}

impl CameraUniform {
    pub fn update(&mut self, resolution: winit::dpi::PhysicalSize<u32>, camera: &OrbitCamera) {
        self.view_proj =
            camera.get_vp_matrix(Vec2::new(resolution.width as f32, resolution.height as f32));
        self.eye = camera.eye().extend(1.0);
    }

    pub fn create_buffer(&self, device: &wgpu::Device) -> wgpu::Buffer {
        device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[*self]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        })
    }

    pub fn update_buffer(&self, queue: &wgpu::Queue, buffer: &wgpu::Buffer) {
        queue.write_buffer(buffer, 0, bytemuck::cast_slice(&[*self]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_eye_sits_in_front_of_the_target() {
        let camera = OrbitCamera::new();
        let eye = camera.eye();
        assert!((eye - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
    }

    #[test]
    fn locked_polar_keeps_the_eye_level() {
        let mut camera = OrbitCamera::new();
        for step in 0..16 {
            camera.azimuth = step as f32 * 0.5;
            let eye = camera.eye();
            assert!(eye.y.abs() < 1e-4, "eye left the horizontal plane: {eye}");
            assert!(((eye - camera.target).length() - ORBIT_DISTANCE).abs() < 1e-4);
        }
    }

    #[test]
    fn projection_tracks_the_resolution() {
        let camera = OrbitCamera::new();
        // Column 0 of a perspective matrix holds f / aspect, so comparing two
        // resolutions recovers the aspect change exactly.
        let wide = camera.get_vp_matrix(Vec2::new(1920.0, 1080.0));
        let narrow = camera.get_vp_matrix(Vec2::new(400.0, 800.0));
        let ratio = wide.col(0).x / narrow.col(0).x;
        let expected = (400.0 / 800.0) / (1920.0 / 1080.0);
        assert!((ratio - expected).abs() < 1e-5);
    }
}
