use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use id_arena::Arena;
use wgpu::CommandEncoderDescriptor;
use winit::window::Window;

use crate::camera::{CameraUniform, OrbitCamera};
use crate::environment::EnvironmentImage;
use crate::lighting::LightRig;
use crate::rendering::global_uniform::GlobalUniformState;
use crate::rendering::instance::gather_instances;
use crate::rendering::overlay_renderer::{create_overlay_renderer, OverlayRenderer};
use crate::rendering::passes::background_pass::{BackgroundPass, BackgroundPassTextureViews};
use crate::rendering::passes::pass::Pass;
use crate::rendering::passes::product_pass::{ProductPass, ProductPassTextureViews};
use crate::rendering::render_common::RenderCommon;
use crate::rendering::render_model::{render_model_instances, RenderModel};
use crate::rendering::shader_loader::{PipelineCacheBuilder, ShaderLoader};
use crate::rendering::texture::{DepthTexture, Texture};
use crate::scene_graph::scene::Scene;

pub struct Renderer {
    pub window: Arc<Window>,
    pub size: winit::dpi::PhysicalSize<u32>,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    depth_texture: DepthTexture,
    render_models: Arena<RenderModel>,

    camera_uniform: CameraUniform,

    shader_loader: ShaderLoader,

    background_pass: BackgroundPass,
    product_pass: ProductPass,
    overlay_renderer: OverlayRenderer,

    environment_bind_group: wgpu::BindGroup,
    _environment_texture: Texture,
    white_texture: Texture,

    start_time: Instant,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        camera: &OrbitCamera,
        imgui_context: &mut imgui::Context,
    ) -> anyhow::Result<Renderer> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to request device")?;

        let mut camera_uniform = CameraUniform::default();
        camera_uniform.update(size, camera);
        let camera_uniform_buffer = camera_uniform.create_buffer(&device);

        let lights_uniform_buffer = LightRig::showcase().to_uniform().create_buffer(&device);

        let common = Arc::new(RenderCommon::new(
            &device,
            &adapter,
            &surface,
            size,
            camera_uniform_buffer,
            lights_uniform_buffer,
        ));

        let depth_texture = DepthTexture::new(&device, size, "Depth Texture");

        let mut cache_builder = PipelineCacheBuilder::new();

        let background_pass = BackgroundPass::create(&device, common.clone(), &mut cache_builder)?;
        let product_pass = ProductPass::create(&device, common.clone(), &mut cache_builder)?;

        let shader_loader = ShaderLoader::new(device.clone(), cache_builder)?;

        let surface_format = common.output_surface_config.read().unwrap().format;
        let overlay_renderer =
            create_overlay_renderer(&device, &queue, surface_format, imgui_context);

        let white_texture =
            Texture::from_rgba8(&device, &queue, 1, 1, &[255, 255, 255, 255], "White fallback");

        // Until the real map arrives, reflections sample a single black texel.
        let environment_texture = Texture::from_rgba32f(
            &device,
            &queue,
            1,
            1,
            &[0.0, 0.0, 0.0, 1.0],
            "Environment placeholder",
        );
        let environment_bind_group = create_environment_bind_group(
            &device,
            &product_pass.environment_bind_group_layout,
            &environment_texture,
        );

        Ok(Self {
            window,
            size,
            surface,
            device,
            queue,
            common,
            depth_texture,
            render_models: Arena::new(),
            camera_uniform,
            shader_loader,
            background_pass,
            product_pass,
            overlay_renderer,
            environment_bind_group,
            _environment_texture: environment_texture,
            white_texture,
            start_time: Instant::now(),
        })
    }

    /// Swaps the reflection source for every subsequent frame.
    pub fn set_environment(&mut self, image: &EnvironmentImage) {
        let texture = Texture::from_rgba32f(
            &self.device,
            &self.queue,
            image.width,
            image.height,
            &image.pixels,
            "Environment map",
        );
        self.environment_bind_group = create_environment_bind_group(
            &self.device,
            &self.product_pass.environment_bind_group_layout,
            &texture,
        );
        self._environment_texture = texture;
        log::info!(
            "Environment map applied ({}x{})",
            image.width,
            image.height
        );
    }

    /// Uploads any scene models that do not have GPU buffers yet.
    pub fn upload_models(&mut self, scene: &mut Scene) {
        for (_, scene_model) in scene.models.iter_mut() {
            if scene_model.render_model.is_some() {
                continue;
            }

            let render_model = RenderModel::from_model(
                &self.device,
                &self.queue,
                &scene_model.model,
                &self.product_pass.material_bind_group_layout,
                &self.white_texture,
            );
            let render_model_id = self.render_models.alloc(render_model);
            scene_model.render_model = Some(render_model_id);
            log::debug!(
                "Uploaded model {} with {} primitives",
                scene_model.name,
                scene_model.model.primitives.len()
            );
        }
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let mut config = self.common.output_surface_config.write().unwrap();

        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            config.width = new_size.width;
            config.height = new_size.height;
            self.depth_texture.resize(&self.device, new_size);
            self.surface.configure(&self.device, &config);
        }
    }

    pub fn render(
        &mut self,
        scene: &Scene,
        camera: &OrbitCamera,
        imgui_context: &mut imgui::Context,
    ) -> Result<(), wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        self.camera_uniform.update(self.size, camera);
        self.camera_uniform
            .update_buffer(&self.queue, &self.common.camera_uniform_buffer);
        self.common.global_uniform.update(
            &self.queue,
            GlobalUniformState::new(self.size, self.start_time.elapsed().as_secs_f32()),
        );

        gather_instances(scene, &mut self.render_models);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let pipeline_cache = &self.shader_loader.cache;

        self.background_pass.render(
            &BackgroundPassTextureViews {
                color: view.clone(),
            },
            &mut encoder,
            pipeline_cache,
            |_render_pass| {},
        );

        self.product_pass.render(
            &ProductPassTextureViews {
                color: view.clone(),
                depth: self.depth_texture.view().clone(),
            },
            &mut encoder,
            pipeline_cache,
            |render_pass| {
                render_pass.set_bind_group(2, &self.environment_bind_group, &[]);

                for (_id, render_model) in self.render_models.iter() {
                    if !render_model.instances.should_render() {
                        continue;
                    }

                    render_model_instances(render_pass, &self.queue, render_model);
                }
            },
        );

        self.overlay_renderer.render(
            &view,
            imgui_context,
            &self.device,
            &self.queue,
            &mut encoder,
        );

        let command_buffer = encoder.finish();

        self.queue.submit([command_buffer]);

        output.present();

        Ok(())
    }
}

fn create_environment_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    texture: &Texture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("environment_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
    })
}
