//! Background asset loading.
//!
//! Font and texture loads run on worker threads; results come back over a
//! channel that the loop drains once per tick with [`AssetLoader::poll`].
//! Whatever has arrived by then is what the next frame renders.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::renderer::text::Font;

/// Opaque identifier for an in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetRequestId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    /// Colour map of the terrain plane.
    TerrainColor,
    /// Greyscale displacement map of the terrain plane.
    TerrainHeight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRequest {
    Font(PathBuf),
    Texture(TextureRole, PathBuf),
}

impl AssetRequest {
    pub fn path(&self) -> &Path {
        match self {
            AssetRequest::Font(path) | AssetRequest::Texture(_, path) => path,
        }
    }
}

#[derive(Debug)]
pub enum LoadedAsset {
    Font(Font),
    Texture(TextureRole, RgbaImage),
}

/// A finished request.
#[derive(Debug)]
pub struct AssetEvent {
    pub id: AssetRequestId,
    pub request: AssetRequest,
    pub result: Result<LoadedAsset>,
}

/// Load `request` on the calling thread.
pub fn load(request: &AssetRequest) -> Result<LoadedAsset> {
    match request {
        AssetRequest::Font(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| Error::asset(path, e))?;
            let font = Font::from_json(&json).map_err(|e| Error::asset(path, e))?;
            Ok(LoadedAsset::Font(font))
        }
        AssetRequest::Texture(role, path) => {
            let image = image::open(path).map_err(|e| Error::asset(path, e))?;
            Ok(LoadedAsset::Texture(*role, image.to_rgba8()))
        }
    }
}

/// Non-blocking loader. Failed loads are logged and reported once; nothing is
/// retried.
pub struct AssetLoader {
    result_tx: mpsc::Sender<AssetEvent>,
    result_rx: mpsc::Receiver<AssetEvent>,
    next_id: u64,
    in_flight: usize,
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetLoader {
    pub fn new() -> Self {
        let (result_tx, result_rx) = mpsc::channel();
        Self { result_tx, result_rx, next_id: 0, in_flight: 0 }
    }

    /// Start loading `request` in the background.
    pub fn request(&mut self, request: AssetRequest) -> AssetRequestId {
        let id = AssetRequestId(self.next_id);
        self.next_id += 1;
        self.in_flight += 1;
        log::debug!("assets: requesting {}", request.path().display());

        let tx = self.result_tx.clone();
        let job = request.clone();
        let spawned = std::thread::Builder::new()
            .name("asset-loader".into())
            .spawn(move || {
                let result = load(&job);
                let _ = tx.send(AssetEvent { id, request: job, result });
            });

        if let Err(e) = spawned {
            let result = Err(Error::asset(request.path(), e));
            let _ = self.result_tx.send(AssetEvent { id, request, result });
        }
        id
    }

    /// Number of requests whose results have not been polled yet.
    pub fn pending(&self) -> usize {
        self.in_flight
    }

    /// Drain every result available now.
    pub fn poll(&mut self) -> Vec<AssetEvent> {
        let events: Vec<AssetEvent> = self.result_rx.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(events.len());
        log_events(&events);
        events
    }

    /// Block until every outstanding request has finished, then drain.
    pub fn wait_all(&mut self) -> Vec<AssetEvent> {
        let mut events = Vec::with_capacity(self.in_flight);
        while self.in_flight > events.len() {
            match self.result_rx.recv() {
                Ok(event) => events.push(event),
                Err(_) => break,
            }
        }
        events.extend(self.result_rx.try_iter());
        self.in_flight = self.in_flight.saturating_sub(events.len());
        log_events(&events);
        events
    }
}

fn log_events(events: &[AssetEvent]) {
    for event in events {
        match &event.result {
            Ok(_) => log::info!("assets: loaded {}", event.request.path().display()),
            Err(e) => log::error!("assets: {e}"),
        }
    }
}
