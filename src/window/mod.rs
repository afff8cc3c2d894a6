pub mod config;

pub use config::{WindowConfig, WindowMode};

use winit::dpi::PhysicalSize;
use winit::monitor::MonitorHandle;
use winit::window::{Fullscreen, Window};

/// Index of the size whose pixel area is nearest to `width × height`.
/// Ties go to the earlier entry.
pub fn closest_by_area(sizes: impl IntoIterator<Item = (u32, u32)>, width: u32, height: u32) -> Option<usize> {
    let target = width as u64 * height as u64;
    sizes
        .into_iter()
        .enumerate()
        .min_by_key(|(_, (w, h))| (*w as u64 * *h as u64).abs_diff(target))
        .map(|(i, _)| i)
}

fn exclusive_or_borderless(monitor: Option<MonitorHandle>, config: &WindowConfig) -> Fullscreen {
    let Some(monitor) = monitor else {
        return Fullscreen::Borderless(None);
    };
    let modes: Vec<_> = monitor.video_modes().collect();
    let sizes = modes.iter().map(|vm| (vm.size().width, vm.size().height));
    match closest_by_area(sizes, config.width, config.height) {
        Some(i) => Fullscreen::Exclusive(modes[i].clone()),
        None => Fullscreen::Borderless(Some(monitor)),
    }
}

/// Apply the presentation mode in `config` to an open window.
///
/// Windowed requests `width × height` and stays resizable, since the
/// backdrop follows the drawable size. Fullscreen takes the video mode
/// closest in area to the requested size, or borderless when the monitor
/// reports none. The final size always arrives as a resize event.
pub fn apply_window_settings(window: &Window, config: &WindowConfig) {
    let fullscreen = match config.mode {
        WindowMode::Windowed => None,
        WindowMode::Fullscreen => Some(exclusive_or_borderless(window.current_monitor(), config)),
        WindowMode::Borderless => Some(Fullscreen::Borderless(None)),
    };
    let windowed = fullscreen.is_none();
    window.set_fullscreen(fullscreen);
    if windowed {
        window.set_decorations(true);
        window.set_resizable(true);
        let _ = window.request_inner_size(PhysicalSize::new(config.width, config.height));
    }
    log::debug!("window: applied {:?} {}x{}", config.mode, config.width, config.height);
}
