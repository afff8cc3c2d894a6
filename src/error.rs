use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::i18n::Language;

/// Errors surfaced by the backdrop.
///
/// None of these are fatal to the render loop: asset failures are logged and
/// leave the previous visual in place, easing errors degrade to zero progress.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load asset '{}': {reason}", path.display())]
    AssetLoad { path: PathBuf, reason: String },

    #[error("timed out waiting for '{event}' after {timeout:?}")]
    ListenerTimeout { event: String, timeout: Duration },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("no text at '{path}' for language {language}")]
    MissingText { language: Language, path: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("gpu initialisation failed: {0}")]
    Gpu(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn asset(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::AssetLoad { path: path.into(), reason: reason.to_string() }
    }
}
