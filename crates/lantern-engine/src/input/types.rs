use std::fmt;
use std::path::PathBuf;

use crate::coords::Vec2;

/// Keyboard key identifier.
///
/// Backends map platform keycodes into these variants where possible.
/// For unsupported keys, use `Key::Unknown(u32)` with a stable platform code.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    // Common control keys
    Escape,
    Enter,
    Tab,
    Backspace,
    Space,

    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    CapsLock,
    PrintScreen,

    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,

    // Modifiers as keys
    Shift,
    Control,
    Alt,
    Meta,

    // Letters
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,

    // Digits
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,

    // Function keys
    F1, F2, F3, F4, F5, F6,
    F7, F8, F9, F10, F11, F12,

    /// Platform-dependent key not yet represented here.
    Unknown(u32),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A single modifier key.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum KeyboardModifier {
    Shift,
    Ctrl,
    Alt,
    Super,
}

/// Modifier set captured with an event.
///
/// Stored as booleans rather than bitflags to keep it explicit and stable.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Super / command / windows key.
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn any(&self) -> bool {
        self.shift || self.ctrl || self.alt || self.meta
    }

    pub fn contains(&self, modifier: KeyboardModifier) -> bool {
        match modifier {
            KeyboardModifier::Shift => self.shift,
            KeyboardModifier::Ctrl => self.ctrl,
            KeyboardModifier::Alt => self.alt,
            KeyboardModifier::Super => self.meta,
        }
    }

    pub fn with(mut self, modifier: KeyboardModifier) -> Self {
        match modifier {
            KeyboardModifier::Shift => self.shift = true,
            KeyboardModifier::Ctrl => self.ctrl = true,
            KeyboardModifier::Alt => self.alt = true,
            KeyboardModifier::Super => self.meta = true,
        }
        self
    }
}

/// Mouse button identifier.
///
/// `None` tags mouse events that are not tied to a button (moves, scrolls,
/// drags).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
    None,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseEventType {
    Moved,
    Dragged,
    Clicked,
    ButtonUp,
    ButtonDown,
    Scrolled,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum KeyEventType {
    KeyDown,
    KeyUp,
    KeyRepeat,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum WindowEventType {
    Moved,
    Resized,
    Focused,
    Unfocused,
}

/// Advisory "stop propagating" flag carried by every event payload.
///
/// Setting it does not stop delivery: later listeners still receive the value
/// and decide for themselves whether to honour it.
pub trait Propagation {
    fn cancel_propagation(&mut self);
    fn propagation_cancelled(&self) -> bool;
}

macro_rules! impl_propagation {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Propagation for $ty {
                #[inline]
                fn cancel_propagation(&mut self) {
                    self.propagation_cancelled = true;
                }

                #[inline]
                fn propagation_cancelled(&self) -> bool {
                    self.propagation_cancelled
                }
            }
        )*
    };
}

impl_propagation!(KeyEvent, CharacterEvent, MouseEvent, WindowEvent, DropEvent);

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub kind: KeyEventType,
    pub key: Key,
    /// Stable platform code when available (e.g. scancode).
    pub scan_code: u32,
    /// Platform key name, `"<null>"` when the platform has none.
    pub name: String,
    pub modifiers: Modifiers,
    pub propagation_cancelled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CharacterEvent {
    pub character: char,
    pub modifiers: Modifiers,
    pub propagation_cancelled: bool,
}

/// Mouse event in logical window units.
#[derive(Debug, Clone, PartialEq)]
pub struct MouseEvent {
    pub position: Vec2,
    /// Scroll delta for `Scrolled` events; zero otherwise.
    ///
    /// The field keeps its historical name because downstream consumers read
    /// the wheel offset from here.
    pub rotation: Vec2,
    /// Movement since the previous drag event (or the button press).
    pub drag_displacement: Vec2,
    pub kind: MouseEventType,
    pub button: MouseButton,
    pub modifiers: Modifiers,
    pub propagation_cancelled: bool,
}

impl MouseEvent {
    pub fn new(
        kind: MouseEventType,
        position: Vec2,
        button: MouseButton,
        modifiers: Modifiers,
    ) -> Self {
        Self {
            position,
            rotation: Vec2::ZERO,
            drag_displacement: Vec2::ZERO,
            kind,
            button,
            modifiers,
            propagation_cancelled: false,
        }
    }

    /// Scroll delta (alias of `rotation`).
    #[inline]
    pub fn scroll_delta(&self) -> Vec2 {
        self.rotation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowEvent {
    pub kind: WindowEventType,
    pub position: Vec2,
    pub size: Vec2,
    pub focused: bool,
    pub propagation_cancelled: bool,
}

impl WindowEvent {
    pub fn new(kind: WindowEventType, position: Vec2, size: Vec2, focused: bool) -> Self {
        Self {
            kind,
            position,
            size,
            focused,
            propagation_cancelled: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropEvent {
    pub position: Vec2,
    pub files: Vec<PathBuf>,
    pub propagation_cancelled: bool,
}
