use std::sync::mpsc::{channel, Receiver};
use std::thread;

use anyhow::{Context, Result};

use crate::environment::{self, EnvironmentImage};
use crate::registry::ProductConfig;

/// Raw glTF import output, handed to the scene on the main thread.
pub struct LoadedGltf {
    pub document: gltf::Document,
    pub buffers: Vec<gltf::buffer::Data>,
    pub images: Vec<gltf::image::Data>,
}

pub enum AssetEvent {
    EnvironmentLoaded(EnvironmentImage),
    ModelLoaded(LoadedGltf),
}

/// Loads assets for one viewer off the event loop thread. The environment
/// map always comes first; the model is only attempted after it, so a viewer
/// never sees a model without its reflections. There are no retries: if a
/// step fails, the worker logs and goes quiet, and the loading overlay stays
/// up.
pub struct AssetWorker {
    receiver: Receiver<AssetEvent>,
}

impl AssetWorker {
    pub fn spawn(product: &'static ProductConfig, environment_url: String) -> Result<Self> {
        let (sender, receiver) = channel();

        thread::Builder::new()
            .name(format!("assets-{}", product.key))
            .spawn(move || {
                let environment = match environment::fetch(&environment_url) {
                    Ok(environment) => environment,
                    Err(error) => {
                        log::error!("Failed to load environment map: {error:#}");
                        return;
                    }
                };

                if sender
                    .send(AssetEvent::EnvironmentLoaded(environment))
                    .is_err()
                {
                    // Viewer is gone, nothing left to do.
                    return;
                }

                match gltf::import(product.model_path) {
                    Ok((document, buffers, images)) => {
                        log::info!("Model loaded: {}", product.model_path);
                        let _ = sender.send(AssetEvent::ModelLoaded(LoadedGltf {
                            document,
                            buffers,
                            images,
                        }));
                    }
                    Err(error) => {
                        log::error!("Failed to load model {}: {error:#}", product.model_path);
                    }
                }
            })
            .with_context(|| format!("Failed to spawn asset worker for {}", product.key))?;

        Ok(Self { receiver })
    }

    /// Non-blocking drain, called once per frame from the render loop.
    pub fn poll(&self) -> impl Iterator<Item = AssetEvent> + '_ {
        self.receiver.try_iter()
    }

    /// A worker whose loads never finish.
    #[cfg(test)]
    pub fn disconnected() -> Self {
        let (_, receiver) = channel();
        Self { receiver }
    }
}

/// Mirrors the two load callbacks; the overlay is dismissed only after both
/// have fired.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadProgress {
    environment_ready: bool,
    model_ready: bool,
}

impl LoadProgress {
    pub fn on_environment(&mut self) {
        self.environment_ready = true;
    }

    pub fn on_model(&mut self) {
        self.model_ready = true;
    }

    pub fn indicator_visible(&self) -> bool {
        !(self.environment_ready && self.model_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_stays_up_until_both_loads_finish() {
        let mut progress = LoadProgress::default();
        assert!(progress.indicator_visible());

        progress.on_environment();
        assert!(progress.indicator_visible());

        progress.on_model();
        assert!(!progress.indicator_visible());
    }

    #[test]
    fn a_model_alone_does_not_dismiss_the_indicator() {
        let mut progress = LoadProgress::default();
        progress.on_model();
        assert!(progress.indicator_visible());
    }
}
