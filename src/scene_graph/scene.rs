use glam::{Mat4, Quat, Vec3};
use id_arena::Arena;
use std::collections::HashMap;

use crate::model::{Buffers, Images, Model};
use crate::scene_graph::object3d::{Object3D, ObjectId};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};

pub struct Scene {
    pub objects: Arena<Object3D>,
    pub models: Arena<SceneModel>,
    gltf_mesh_to_model: HashMap<usize, SceneModelId>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
            gltf_mesh_to_model: HashMap::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    #[allow(dead_code)]
    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    /// Spawns a loaded glTF scene under a fresh root object and returns the
    /// root. The root carries the registry scale and centering offset; the
    /// glTF nodes keep their authored transforms below it.
    pub fn spawn_product(
        &mut self,
        label: &str,
        scene: &gltf::Scene,
        buffers: Buffers,
        images: Images,
    ) -> anyhow::Result<ObjectId> {
        let root_id = self.add_object(Object3D::named(label));

        for node in scene.nodes() {
            self.spawn_gltf_node(label, buffers, images, &node, Some(root_id))?;
        }

        Ok(root_id)
    }

    fn spawn_gltf_node(
        &mut self,
        label: &str,
        buffers: Buffers,
        images: Images,
        node: &gltf::Node,
        parent: Option<ObjectId>,
    ) -> anyhow::Result<ObjectId> {
        let mut object = Object3D::default();
        let node_name = node.name().unwrap_or("Unnamed").to_string();
        object.name = node_name.clone();
        let (translation, rotation, scale) = node.transform().decomposed();

        object.transform.set_transform(
            translation.into(),
            Quat::from_array(rotation),
            scale[0], // Assume uniform scale for simplicity
        );

        if let Some(mesh) = node.mesh() {
            let mesh_index = mesh.index();

            let mesh_id = match self.gltf_mesh_to_model.get(&mesh_index).copied() {
                Some(mesh_id) => mesh_id,
                None => {
                    let mesh_name = mesh
                        .name()
                        .map(String::from)
                        .unwrap_or_else(|| format!("{} (Mesh)", node_name));

                    let model = Model::from_gltf(mesh_name.clone(), mesh, buffers, images)?;
                    let mesh_id = self.add_model(SceneModel::new(format!("{label}/{mesh_name}"), model));
                    self.gltf_mesh_to_model.insert(mesh_index, mesh_id);

                    mesh_id
                }
            };

            object.model_id = Some(mesh_id);
        }

        let object_id = self.add_object(object);

        if let Some(parent_id) = parent {
            self.set_object_parent(object_id, Some(parent_id));
        }

        for child in node.children() {
            self.spawn_gltf_node(label, buffers, images, &child, Some(object_id))?;
        }

        Ok(object_id)
    }

    /// Updates all object world transforms in hierarchical order.
    pub fn update_world_transforms(&self) {
        let root_objects = self.objects.iter().filter_map(|(id, object)| {
            if object.parent_id.is_none() {
                Some(id)
            } else {
                None
            }
        });

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY);
        }
    }

    fn update_object_transform_recursive(&self, object_id: ObjectId, parent_world_matrix: Mat4) {
        if let Some(object) = self.objects.get(object_id) {
            if object.transform.is_world_dirty() {
                let local_matrix = *object.transform.get_local_matrix();
                let world_matrix = parent_world_matrix * local_matrix;
                object.transform.set_world_matrix(world_matrix);
            }

            let world_matrix = *object.transform.get_world_matrix();
            for &child_id in &object.child_ids {
                self.update_object_transform_recursive(child_id, world_matrix);
            }
        }
    }

    /// Invalidates world transforms for an object and all its descendants.
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(child) = self.objects.get(child_id) {
            if let Some(old_parent_id) = child.parent_id {
                if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                    old_parent.child_ids.retain(|&id| id != child_id);
                }
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;

            if let Some(new_parent_id) = new_parent_id {
                if let Some(new_parent) = self.objects.get_mut(new_parent_id) {
                    new_parent.child_ids.push(child_id);
                }
            }
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn set_object_rotation(&mut self, object_id: ObjectId, rotation: Quat) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_rotation(rotation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    pub fn set_object_transform(
        &mut self,
        object_id: ObjectId,
        translation: Vec3,
        rotation: Quat,
        scale: f32,
    ) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_transform(translation, rotation, scale);
        }
        self.invalidate_object_hierarchy(object_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn child_world_matrix_includes_the_parent() {
        let mut scene = Scene::new();
        let root = scene.add_object(Object3D::named("root"));
        let child = scene.add_object(Object3D::named("child"));
        scene.set_object_parent(child, Some(root));

        scene.set_object_transform(root, Vec3::new(0.0, -2.5, 0.0), Quat::IDENTITY, 2.0);
        scene.set_object_transform(child, Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, 1.0);
        scene.update_world_transforms();

        let world = *scene.get_object(child).unwrap().transform.get_world_matrix();
        let origin = world * Vec4::new(0.0, 0.0, 0.0, 1.0);
        // Child offset is scaled by the parent then shifted down.
        assert_eq!(origin, Vec4::new(2.0, -2.5, 0.0, 1.0));
    }

    #[test]
    fn rotating_the_root_dirties_the_whole_hierarchy() {
        let mut scene = Scene::new();
        let root = scene.add_object(Object3D::named("root"));
        let child = scene.add_object(Object3D::named("child"));
        scene.set_object_parent(child, Some(root));
        scene.update_world_transforms();
        assert!(!scene.get_object(child).unwrap().transform.is_world_dirty());

        scene.set_object_rotation(root, Quat::from_rotation_y(0.01));
        assert!(scene.get_object(child).unwrap().transform.is_world_dirty());

        scene.update_world_transforms();
        assert!(!scene.get_object(child).unwrap().transform.is_world_dirty());
    }
}
