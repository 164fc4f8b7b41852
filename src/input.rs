//! Keyboard and mouse state tracking.
//!
//! Window events are folded into a per-key state table that the rest of the
//! engine polls once per frame. Every key moves through three states:
//!
//! - [`KeyState::NotPressed`] is the resting state
//! - [`KeyState::Pressed`] is entered on the first down event and means
//!   "pressed this frame, not yet reported"
//! - [`KeyState::Held`] is entered once a press has been observed by a poll
//!   or when the OS repeats the down event
//!
//! Polling is not read-only. [`Input::key_hit`] and [`Input::key_held`] both
//! collapse `Pressed` into `Held`, so calling `key_held` before `key_hit` on
//! the same key in the same frame swallows the hit.

use std::collections::HashMap;

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

/// Pressed state of a single key or mouse button.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    NotPressed,
    Pressed,
    Held,
}

/// A logical key: either a physical keyboard key or a mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Keyboard(KeyCode),
    Mouse(MouseButton),
}

impl From<KeyCode> for Key {
    fn from(code: KeyCode) -> Self {
        Key::Keyboard(code)
    }
}

impl From<MouseButton> for Key {
    fn from(button: MouseButton) -> Self {
        Key::Mouse(button)
    }
}

/// Key state table and last known mouse position.
#[derive(Debug, Default)]
pub struct Input {
    key_states: HashMap<Key, KeyState>,
    mouse: PhysicalPosition<f64>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, key: impl Into<Key>) -> KeyState {
        self.key_states
            .get(&key.into())
            .copied()
            .unwrap_or_default()
    }

    /// A key went down. Repeated down events (OS key repeat) move the key to `Held`.
    pub fn key_down_event(&mut self, key: impl Into<Key>) {
        let state = self.key_states.entry(key.into()).or_default();
        *state = match *state {
            KeyState::NotPressed => KeyState::Pressed,
            KeyState::Pressed | KeyState::Held => KeyState::Held,
        };
    }

    pub fn key_up_event(&mut self, key: impl Into<Key>) {
        self.key_states.insert(key.into(), KeyState::NotPressed);
    }

    pub fn mouse_move_event(&mut self, position: PhysicalPosition<f64>) {
        self.mouse = position;
    }

    /// Returns true the first time a press is polled. Use for one-off actions
    /// and toggles.
    pub fn key_hit(&mut self, key: impl Into<Key>) -> bool {
        match self.key_states.get_mut(&key.into()) {
            Some(state) if *state == KeyState::Pressed => {
                *state = KeyState::Held;
                true
            }
            _ => false,
        }
    }

    /// Returns true for as long as the key is down. Use for continuous motion.
    ///
    /// A pending press is consumed: a later [`key_hit`](Self::key_hit) in the
    /// same frame returns false.
    pub fn key_held(&mut self, key: impl Into<Key>) -> bool {
        match self.key_states.get_mut(&key.into()) {
            None | Some(KeyState::NotPressed) => false,
            Some(state) => {
                *state = KeyState::Held;
                true
            }
        }
    }

    pub fn mouse_position(&self) -> PhysicalPosition<f64> {
        self.mouse
    }

    pub fn mouse_x(&self) -> f64 {
        self.mouse.x
    }

    pub fn mouse_y(&self) -> f64 {
        self.mouse.y
    }

    /// Map a winit window event onto the key and mouse event functions.
    ///
    /// Returns true if the event was an input event.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        ..
                    },
                ..
            } => {
                self.element_event(Key::Keyboard(*code), *state);
                true
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.element_event(Key::Mouse(*button), *state);
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_move_event(*position);
                true
            }
            _ => false,
        }
    }

    fn element_event(&mut self, key: Key, state: ElementState) {
        match state {
            ElementState::Pressed => self.key_down_event(key),
            ElementState::Released => self.key_up_event(key),
        }
    }
}
