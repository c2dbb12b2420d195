use std::path::PathBuf;

use super::types::{Key, Modifiers, MouseButton};

/// Key transition reported by the platform.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyAction {
    Press,
    Release,
    Repeat,
}

/// Raw platform callback, one variant per native callback kind.
///
/// Coordinates are in whatever units the platform reports; capture converts
/// them to logical units (see [`WindowMetrics`](super::WindowMetrics)).
#[derive(Debug, Clone, PartialEq)]
pub enum NativeEvent {
    Key {
        key: Key,
        scan_code: u32,
        name: Option<String>,
        action: KeyAction,
        modifiers: Modifiers,
    },

    Character(char),

    CursorMoved { x: f64, y: f64 },

    MouseButton {
        button: MouseButton,
        pressed: bool,
        modifiers: Modifiers,
    },

    Scroll { dx: f64, dy: f64 },

    Drop(Vec<PathBuf>),

    WindowMoved { x: i32, y: i32 },

    /// Framebuffer size changed (physical pixels).
    FramebufferResized { width: u32, height: u32 },

    ScaleChanged(f64),

    Focus(bool),

    /// The platform asks for the window contents to be redrawn.
    Refresh,

    CloseRequested,
}
