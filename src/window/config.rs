use serde::{Deserialize, Serialize};

// ── WindowMode ────────────────────────────────────────────────────────────────

/// Controls how the OS window is presented.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowMode {
    /// Standard decorated, resizable window at the configured size.
    #[default]
    Windowed,
    /// Exclusive hardware fullscreen at the closest available resolution.
    Fullscreen,
    /// Borderless window covering the current monitor.
    Borderless,
}

// ── WindowConfig ──────────────────────────────────────────────────────────────

/// Window settings. The drawable's measured size, not these values, drives
/// the render targets once the window exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    /// Requested inner width in physical pixels.
    pub width: u32,
    /// Requested inner height in physical pixels.
    pub height: u32,
    pub mode: WindowMode,
}

impl Default for WindowConfig {
    /// 1280 × 720, windowed.
    fn default() -> Self {
        Self {
            title: "backdrop".into(),
            width: 1280,
            height: 720,
            mode: WindowMode::Windowed,
        }
    }
}

impl WindowConfig {
    /// `width / height`, or `0.0` when the height is zero.
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f32 / self.height as f32
    }
}
