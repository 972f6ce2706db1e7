use id_arena::Id;

use crate::model::Model;
use crate::rendering::render_model::RenderModelId;

pub type SceneModelId = Id<SceneModel>;

pub struct SceneModel {
    pub name: String,
    pub model: Model,
    /// Set once the renderer has uploaded the mesh and material data.
    pub render_model: Option<RenderModelId>,
}

impl SceneModel {
    pub fn new(name: String, model: Model) -> Self {
        Self {
            name,
            model,
            render_model: None,
        }
    }
}
