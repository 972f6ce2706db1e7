use std::{collections::HashMap, path::Path, sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use imgui::{Condition, FontConfig, FontSource};
use imgui_winit_support::WinitPlatform;
use winit::{
    application::ApplicationHandler,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::EventLoop,
    window::{Window, WindowId},
};

use crate::{registry, rendering::renderer::Renderer, viewer::Viewer};

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
}

/// One product container: viewer state, its GPU renderer and the overlay UI.
struct ViewerWindow {
    viewer: Viewer,
    renderer: Renderer,
    imgui: ImguiState,
    last_frame: Instant,
}

struct App {
    requested: Vec<String>,
    windows: HashMap<WindowId, ViewerWindow>,
    initialized: bool,
}

impl App {
    fn new(requested: Vec<String>) -> Self {
        Self {
            requested,
            windows: HashMap::new(),
            initialized: false,
        }
    }

    fn init_viewer(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        key: &str,
    ) -> anyhow::Result<()> {
        let Some(product) = registry::get(key) else {
            log::error!("No product registered for viewer: {key}");
            return Ok(());
        };
        log::info!("Initializing model viewer for product: {}", product.key);

        let window_attributes =
            Window::default_attributes().with_title(format!("canspin: {}", product.key));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        let mut imgui = setup_imgui(&window);
        let viewer = Viewer::new(product)?;
        let mut renderer = pollster::block_on(Renderer::new(
            window.clone(),
            &viewer.camera,
            &mut imgui.context,
        ))?;

        // Establish correct initial sizing before the first frame.
        renderer.resize(window.inner_size());

        self.windows.insert(
            window.id(),
            ViewerWindow {
                viewer,
                renderer,
                imgui,
                last_frame: Instant::now(),
            },
        );

        Ok(())
    }
}

fn setup_imgui(window: &Window) -> ImguiState {
    let mut context = imgui::Context::create();
    let mut platform = WinitPlatform::new(&mut context);
    platform.attach_window(
        context.io_mut(),
        window,
        imgui_winit_support::HiDpiMode::Default,
    );

    let font_size = 14.0;
    context.fonts().add_font(&[FontSource::DefaultFontData {
        config: Some(FontConfig {
            oversample_h: 1,
            pixel_snap_h: true,
            size_pixels: font_size,
            ..Default::default()
        }),
    }]);

    // Disable INI support because it's broken in the published version of imgui
    context.set_ini_filename(None);

    ImguiState { context, platform }
}

/// The products to show when the command line names none: every registry
/// entry whose model asset is actually on disk.
fn default_lineup() -> Vec<String> {
    registry::PRODUCTS
        .iter()
        .filter(|product| {
            let present = Path::new(product.model_path).exists();
            if !present {
                log::info!(
                    "Skipping {}: no asset at {}",
                    product.key,
                    product.model_path
                );
            }
            present
        })
        .map(|product| product.key.to_string())
        .collect()
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let keys = if self.requested.is_empty() {
            default_lineup()
        } else {
            self.requested.clone()
        };

        for key in keys {
            if let Err(error) = self.init_viewer(event_loop, &key) {
                log::error!("Failed to initialize viewer for {key}: {error:#}");
            }
        }

        if self.windows.is_empty() {
            log::error!("No viewers to show, exiting");
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if let WindowEvent::CloseRequested = event {
            self.windows.remove(&window_id);
            if self.windows.is_empty() {
                event_loop.exit();
            }
            return;
        }

        let Some(viewer_window) = self.windows.get_mut(&window_id) else {
            return;
        };

        match event {
            WindowEvent::Resized(new_size) => {
                viewer_window.renderer.resize(new_size);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                viewer_window
                    .viewer
                    .controls
                    .on_mouse_button(state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let position = Vec2::new(position.x as f32, position.y as f32);
                let width = viewer_window.renderer.size.width as f32;
                let camera = &mut viewer_window.viewer.camera;
                viewer_window
                    .viewer
                    .controls
                    .on_cursor_moved(position, width, camera);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let amount = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                let camera = &mut viewer_window.viewer.camera;
                viewer_window.viewer.controls.on_scroll(amount, camera);
            }
            WindowEvent::RedrawRequested => {
                let ViewerWindow {
                    viewer,
                    renderer,
                    imgui,
                    last_frame,
                } = &mut *viewer_window;

                let delta_time = last_frame.elapsed();
                imgui.context.io_mut().update_delta_time(delta_time);
                *last_frame = Instant::now();

                renderer.window.request_redraw();

                imgui
                    .platform
                    .prepare_frame(imgui.context.io_mut(), &renderer.window)
                    .expect("Failed to prepare overlay frame");

                viewer.poll_assets(renderer);
                viewer.update();

                {
                    let ui = imgui.context.new_frame();
                    if viewer.progress.indicator_visible() {
                        let label = viewer.loading_label();
                        ui.window("loadingText")
                            .position([16.0, 16.0], Condition::Always)
                            .title_bar(false)
                            .resizable(false)
                            .movable(false)
                            .always_auto_resize(true)
                            .build(|| ui.text(label));
                    }
                }

                match renderer.render(viewer.scene(), &viewer.camera, &mut imgui.context) {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        renderer.resize(renderer.size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory");
                        event_loop.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        log::warn!("Timeout");
                    }
                    Err(other) => {
                        log::error!("Unexpected error: {:?}", other);
                    }
                }
            }
            _ => (),
        }

        {
            let window = viewer_window.renderer.window.as_ref();
            viewer_window.imgui.platform.handle_event::<()>(
                viewer_window.imgui.context.io_mut(),
                window,
                &Event::WindowEvent { window_id, event },
            );
        }
    }
}

pub async fn run(requested: Vec<String>) -> anyhow::Result<()> {
    let event_loop = EventLoop::new().context("Failed to create event loop")?;
    let mut app = App::new(requested);
    event_loop.run_app(&mut app)?;

    Ok(())
}
