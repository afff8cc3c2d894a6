use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use glam::Vec2;
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

/// A raw input source that can be bound to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Key(KeyCode),
    Mouse(MouseButton),
}

/// Raw window input for a single frame.
///
/// Cursor motion with a button held accumulates into a drag delta that the
/// loop takes once per frame.
#[derive(Debug, Default)]
pub struct InputState {
    pub keys_held: HashSet<KeyCode>,
    pub keys_pressed: HashSet<KeyCode>,
    pub mouse_held: HashSet<MouseButton>,
    pub mouse_pressed: HashSet<MouseButton>,
    pub mouse_pos: Option<Vec2>,
    drags: HashMap<MouseButton, Vec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: KeyCode) {
        if self.keys_held.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
    }

    pub fn mouse_down(&mut self, button: MouseButton) {
        if self.mouse_held.insert(button) {
            self.mouse_pressed.insert(button);
        }
    }

    pub fn mouse_up(&mut self, button: MouseButton) {
        self.mouse_held.remove(&button);
    }

    /// Record a cursor position in physical pixels.
    pub fn cursor_moved(&mut self, pos: Vec2) {
        if let Some(prev) = self.mouse_pos.replace(pos) {
            let delta = pos - prev;
            for button in &self.mouse_held {
                *self.drags.entry(*button).or_default() += delta;
            }
        }
    }

    /// The cursor left the window; the next move starts a fresh drag.
    pub fn cursor_left(&mut self) {
        self.mouse_pos = None;
    }

    /// Drag accumulated with `button` held since the last call.
    pub fn take_drag(&mut self, button: MouseButton) -> Vec2 {
        self.drags.remove(&button).unwrap_or(Vec2::ZERO)
    }

    pub fn is_key_held(&self, key: KeyCode) -> bool { self.keys_held.contains(&key) }
    pub fn is_key_pressed(&self, key: KeyCode) -> bool { self.keys_pressed.contains(&key) }
    pub fn is_mouse_held(&self, button: MouseButton) -> bool { self.mouse_held.contains(&button) }

    pub fn clear_frame_state(&mut self) {
        self.keys_pressed.clear();
        self.mouse_pressed.clear();
        self.drags.clear();
    }
}

/// What a key press does in the backdrop window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    TogglePause,
    CycleLanguage,
    Quit,
}

/// Maps logical actions to one or more physical inputs.
#[derive(Debug, Clone)]
pub struct ActionMap<A: Hash + Eq + Copy> {
    bindings: HashMap<A, Vec<InputSource>>,
}

impl<A: Hash + Eq + Copy> ActionMap<A> {
    pub fn new() -> Self {
        Self { bindings: HashMap::new() }
    }

    pub fn bind(&mut self, action: A, source: InputSource) {
        self.bindings.entry(action).or_default().push(source);
    }

    /// True if any bound source was pressed this frame.
    pub fn is_pressed(&self, action: A, input: &InputState) -> bool {
        self.bindings.get(&action).is_some_and(|sources| {
            sources.iter().any(|s| match s {
                InputSource::Key(k) => input.is_key_pressed(*k),
                InputSource::Mouse(b) => input.mouse_pressed.contains(b),
            })
        })
    }

    /// Every bound action pressed this frame.
    pub fn pressed<'a>(&'a self, input: &'a InputState) -> impl Iterator<Item = A> + 'a {
        self.bindings.keys().copied().filter(move |a| self.is_pressed(*a, input))
    }
}

impl<A: Hash + Eq + Copy> Default for ActionMap<A> {
    fn default() -> Self { Self::new() }
}

impl ActionMap<Action> {
    /// `Space` pauses, `L` cycles the language, `Esc` quits.
    pub fn backdrop_defaults() -> Self {
        let mut map = Self::new();
        map.bind(Action::TogglePause, InputSource::Key(KeyCode::Space));
        map.bind(Action::CycleLanguage, InputSource::Key(KeyCode::KeyL));
        map.bind(Action::Quit, InputSource::Key(KeyCode::Escape));
        map
    }
}
