use glam::{Quat, Vec3};

use crate::camera::OrbitCamera;
use crate::controls::OrbitControls;
use crate::environment::ENVIRONMENT_URL;
use crate::loader::{AssetEvent, AssetWorker, LoadProgress, LoadedGltf};
use crate::registry::ProductConfig;
use crate::rendering::renderer::Renderer;
use crate::scene_graph::object3d::ObjectId;
use crate::scene_graph::scene::Scene;

/// Below this window width the product drops one scale unit, the same coarse
/// phone adjustment the product pages use.
pub const MOBILE_WIDTH_PX: u32 = 500;
pub const SPIN_PER_FRAME: f32 = 0.01;
pub const MODEL_Y_OFFSET: f32 = -2.5;

pub fn applied_scale(scale: f32, viewport_width: u32) -> f32 {
    if viewport_width < MOBILE_WIDTH_PX {
        scale - 1.0
    } else {
        scale
    }
}

/// Everything one product window owns besides the GPU: the scene, the orbit
/// camera/controls pair, the background asset worker and the turntable spin.
pub struct Viewer {
    pub product: &'static ProductConfig,
    pub camera: OrbitCamera,
    pub controls: OrbitControls,
    pub progress: LoadProgress,
    scene: Scene,
    product_root: Option<ObjectId>,
    spin: f32,
    worker: AssetWorker,
}

impl Viewer {
    pub fn new(product: &'static ProductConfig) -> anyhow::Result<Self> {
        let worker = AssetWorker::spawn(product, ENVIRONMENT_URL.to_string())?;

        Ok(Self {
            product,
            camera: OrbitCamera::new(),
            controls: OrbitControls::new(),
            progress: LoadProgress::default(),
            scene: Scene::new(),
            product_root: None,
            spin: 0.0,
            worker,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn loading_label(&self) -> String {
        format!("Loading {} …", self.product.key)
    }

    /// Drains the asset worker once per frame. The environment always lands
    /// before the model because the worker loads them in that order.
    pub fn poll_assets(&mut self, renderer: &mut Renderer) {
        let events: Vec<AssetEvent> = self.worker.poll().collect();
        for event in events {
            match event {
                AssetEvent::EnvironmentLoaded(image) => {
                    renderer.set_environment(&image);
                    self.progress.on_environment();
                }
                AssetEvent::ModelLoaded(loaded) => self.attach_model(loaded, renderer),
            }
        }
    }

    fn attach_model(&mut self, loaded: LoadedGltf, renderer: &mut Renderer) {
        let Some(gltf_scene) = loaded.document.scenes().next() else {
            log::error!("Model {} contains no scenes", self.product.model_path);
            return;
        };

        match self.scene.spawn_product(
            self.product.key,
            &gltf_scene,
            &loaded.buffers,
            &loaded.images,
        ) {
            Ok(root) => {
                let scale = applied_scale(self.product.scale, renderer.size.width);
                self.scene.set_object_transform(
                    root,
                    Vec3::new(0.0, MODEL_Y_OFFSET, 0.0),
                    Quat::IDENTITY,
                    scale,
                );
                self.product_root = Some(root);
                renderer.upload_models(&mut self.scene);
                self.progress.on_model();
            }
            Err(error) => {
                log::error!(
                    "Failed to build scene for {}: {error:#}",
                    self.product.model_path
                );
            }
        }
    }

    /// Per-frame state advance: keep the orbit constraints applied and turn
    /// the product once it exists.
    pub fn update(&mut self) {
        self.controls.update(&mut self.camera);

        if let Some(root) = self.product_root {
            self.spin += SPIN_PER_FRAME;
            self.scene
                .set_object_rotation(root, Quat::from_rotation_y(self.spin));
        }

        self.scene.update_world_transforms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;
    use crate::scene_graph::object3d::Object3D;

    fn test_viewer(product: &'static ProductConfig) -> Viewer {
        Viewer {
            product,
            camera: OrbitCamera::new(),
            controls: OrbitControls::new(),
            progress: LoadProgress::default(),
            scene: Scene::new(),
            product_root: None,
            spin: 0.0,
            worker: AssetWorker::disconnected(),
        }
    }

    #[test]
    fn scale_breakpoint_matches_the_product_pages() {
        let fanta = registry::get("fanta").unwrap();
        assert_eq!(applied_scale(fanta.scale, 1920), 13.0);
        assert_eq!(applied_scale(fanta.scale, 400), 12.0);
        assert_eq!(applied_scale(fanta.scale, 500), 13.0);
        assert_eq!(applied_scale(registry::get("coke").unwrap().scale, 499), 4.0);
    }

    #[test]
    fn spin_waits_for_the_model() {
        let mut viewer = test_viewer(registry::get("coke").unwrap());

        viewer.update();
        viewer.update();
        assert_eq!(viewer.spin, 0.0);

        let root = viewer.scene.add_object(Object3D::named("coke"));
        viewer.product_root = Some(root);

        viewer.update();
        assert_eq!(viewer.spin, SPIN_PER_FRAME);

        let rotation = viewer.scene.get_object(root).unwrap().transform.rotation();
        assert!(rotation.abs_diff_eq(Quat::from_rotation_y(SPIN_PER_FRAME), 1e-6));
    }
}
