pub mod animation;
pub mod assets;
pub mod camera;
pub mod compositor;
pub mod config;
pub mod easing;
pub mod engine;
pub mod error;
pub mod events;
pub mod follow;
pub mod geometry;
pub mod i18n;
pub mod input;
pub mod intro;
pub mod layers;
pub mod partition;
pub mod renderer;
pub mod scene;
pub mod window;

pub use engine::{Backdrop, BackdropBuilder};
pub use error::{Error, Result};
