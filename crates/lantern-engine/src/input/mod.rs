//! Input subsystem.
//!
//! Public API is platform-agnostic and does not expose winit types.
//! Backends report [`NativeEvent`]s; [`InputCapture`] turns them into typed
//! payloads queued on the deferred channels of [`Events`].

mod capture;
mod devices;
mod native;
mod types;

pub(crate) mod platform {
    pub(crate) mod winit;
}

pub use capture::{InputCapture, WindowMetrics};
pub use devices::{Events, Keyboard, Mouse, WindowEvents};
pub use native::{KeyAction, NativeEvent};
pub use types::{
    CharacterEvent,
    DropEvent,
    Key,
    KeyEvent,
    KeyEventType,
    KeyboardModifier,
    Modifiers,
    MouseButton,
    MouseEvent,
    MouseEventType,
    Propagation,
    WindowEvent,
    WindowEventType,
};
