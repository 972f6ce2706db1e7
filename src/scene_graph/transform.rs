use glam::{Mat4, Quat, Vec3};
use std::cell::{Cell, Ref, RefCell};

/// Local TRS plus cached local/world matrices. Matrices are rebuilt lazily;
/// setters only flip dirty flags so a spinning product costs one matrix
/// rebuild per frame.
#[derive(Debug, Clone)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: f32,

    local_matrix: RefCell<Mat4>,
    world_matrix: RefCell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: 1.0,
            local_matrix: RefCell::new(Mat4::IDENTITY),
            world_matrix: RefCell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(true),
            world_dirty: Cell::new(true),
        }
    }

    pub fn get_local_matrix(&self) -> Ref<Mat4> {
        if self.local_dirty.get() {
            let matrix = Mat4::from_scale_rotation_translation(
                Vec3::splat(self.scale),
                self.rotation,
                self.translation,
            );

            self.local_matrix.replace(matrix);
            self.local_dirty.set(false);
            self.invalidate_world();
        }

        self.local_matrix.borrow()
    }

    pub fn get_world_matrix(&self) -> Ref<Mat4> {
        self.world_matrix.borrow()
    }

    pub fn set_world_matrix(&self, world_matrix: Mat4) {
        self.world_matrix.replace(world_matrix);
        self.world_dirty.set(false);
    }

    pub fn invalidate_local(&self) {
        self.local_dirty.set(true);
        self.world_dirty.set(true);
    }

    pub fn invalidate_world(&self) {
        self.world_dirty.set(true);
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.invalidate_local();
    }

    pub fn set_transform(&mut self, translation: Vec3, rotation: Quat, scale: f32) {
        self.translation = translation;
        self.rotation = rotation;
        self.scale = scale;
        self.invalidate_local();
    }

    #[allow(dead_code)]
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    #[allow(dead_code)]
    pub fn scale(&self) -> f32 {
        self.scale
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn local_matrix_composes_scale_rotation_translation() {
        let mut transform = Transform::from_translation(Vec3::new(0.0, -2.5, 0.0));
        transform.set_transform(
            Vec3::new(0.0, -2.5, 0.0),
            Quat::IDENTITY,
            13.0,
        );

        let matrix = *transform.get_local_matrix();
        // A unit X vector scales by 13; the origin lands at the offset.
        assert_eq!(matrix * Vec4::new(1.0, 0.0, 0.0, 0.0), Vec4::new(13.0, 0.0, 0.0, 0.0));
        assert_eq!(matrix * Vec4::new(0.0, 0.0, 0.0, 1.0), Vec4::new(0.0, -2.5, 0.0, 1.0));
    }

    #[test]
    fn setters_invalidate_the_cached_matrices() {
        let mut transform = Transform::from_translation(Vec3::ZERO);
        let _ = transform.get_local_matrix();
        transform.set_world_matrix(Mat4::IDENTITY);
        assert!(!transform.is_world_dirty());

        transform.set_rotation(Quat::from_rotation_y(0.01));
        assert!(transform.is_world_dirty());
        let matrix = *transform.get_local_matrix();
        assert_ne!(matrix, Mat4::IDENTITY);
    }
}
