use winit::event::{ElementState, Ime, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key as LogicalKey, KeyCode, ModifiersState, PhysicalKey};

use crate::input::{Key, KeyAction, Modifiers, MouseButton, NativeEvent};

/// Logical pixels that count as one wheel line for touchpad scrolling.
pub const PIXELS_PER_LINE: f64 = 20.0;

/// Translates winit window events into [`NativeEvent`]s.
///
/// Positions stay in physical pixels; capture applies the content scale.
/// Scroll deltas are always in wheel lines: pixel deltas from touchpads are
/// converted with the window's scale factor and [`PIXELS_PER_LINE`].
/// winit 0.30 has no modifier query, so the last `ModifiersChanged` state is
/// tracked here and stamped onto key and button events.
#[derive(Debug)]
pub struct WinitTranslator {
    modifiers: Modifiers,
    scale_factor: f64,
}

impl Default for WinitTranslator {
    fn default() -> Self {
        Self {
            modifiers: Modifiers::NONE,
            scale_factor: 1.0,
        }
    }
}

impl WinitTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scale used for pixel scroll deltas until the next `ScaleFactorChanged`.
    pub fn set_scale_factor(&mut self, scale_factor: f64) {
        if scale_factor > 0.0 {
            self.scale_factor = scale_factor;
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Emits zero or more native events for one winit event.
    pub fn translate(&mut self, event: &WindowEvent, emit: &mut dyn FnMut(NativeEvent)) {
        match event {
            WindowEvent::ModifiersChanged(m) => {
                self.modifiers = map_modifiers(m.state());
            }

            WindowEvent::KeyboardInput { event, .. } => {
                let action = match (event.state, event.repeat) {
                    (ElementState::Released, _) => KeyAction::Release,
                    (ElementState::Pressed, true) => KeyAction::Repeat,
                    (ElementState::Pressed, false) => KeyAction::Press,
                };

                let (key, scan_code) = map_key(event.physical_key);

                emit(NativeEvent::Key {
                    key,
                    scan_code,
                    name: key_name(&event.logical_key),
                    action,
                    modifiers: self.modifiers,
                });

                if event.state == ElementState::Pressed {
                    if let Some(text) = &event.text {
                        emit_characters(text, emit);
                    }
                }
            }

            WindowEvent::Ime(Ime::Commit(text)) => emit_characters(text, emit),

            WindowEvent::CursorMoved { position, .. } => emit(NativeEvent::CursorMoved {
                x: position.x,
                y: position.y,
            }),

            WindowEvent::MouseInput { state, button, .. } => emit(NativeEvent::MouseButton {
                button: map_mouse_button(*button),
                pressed: *state == ElementState::Pressed,
                modifiers: self.modifiers,
            }),

            WindowEvent::MouseWheel { delta, .. } => {
                let (dx, dy) = match delta {
                    MouseScrollDelta::LineDelta(x, y) => (*x as f64, *y as f64),
                    MouseScrollDelta::PixelDelta(p) => {
                        let per_line = PIXELS_PER_LINE * self.scale_factor;
                        (p.x / per_line, p.y / per_line)
                    }
                };
                emit(NativeEvent::Scroll { dx, dy });
            }

            WindowEvent::DroppedFile(path) => emit(NativeEvent::Drop(vec![path.clone()])),

            WindowEvent::Moved(pos) => emit(NativeEvent::WindowMoved { x: pos.x, y: pos.y }),

            WindowEvent::Resized(size) => emit(NativeEvent::FramebufferResized {
                width: size.width,
                height: size.height,
            }),

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.set_scale_factor(*scale_factor);
                emit(NativeEvent::ScaleChanged(*scale_factor))
            }

            WindowEvent::Focused(f) => {
                if !*f {
                    self.modifiers = Modifiers::NONE;
                }
                emit(NativeEvent::Focus(*f))
            }

            WindowEvent::RedrawRequested => emit(NativeEvent::Refresh),

            WindowEvent::CloseRequested => emit(NativeEvent::CloseRequested),

            _ => {}
        }
    }
}

fn emit_characters(text: &str, emit: &mut dyn FnMut(NativeEvent)) {
    text.chars()
        .filter(|c| !c.is_control())
        .for_each(|c| emit(NativeEvent::Character(c)));
}

fn key_name(key: &LogicalKey) -> Option<String> {
    match key {
        LogicalKey::Character(s) => Some(s.to_string()),
        LogicalKey::Named(named) => Some(format!("{named:?}")),
        _ => None,
    }
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

fn map_key(pk: PhysicalKey) -> (Key, u32) {
    let code = match pk {
        PhysicalKey::Code(code) => code,
        // No stable numeric for native codes.
        PhysicalKey::Unidentified(_) => return (Key::Unknown(0), 0),
    };

    let key = match code {
        KeyCode::Escape => Key::Escape,
        KeyCode::Enter | KeyCode::NumpadEnter => Key::Enter,
        KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Space => Key::Space,

        KeyCode::Insert => Key::Insert,
        KeyCode::Delete => Key::Delete,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::CapsLock => Key::CapsLock,
        KeyCode::PrintScreen => Key::PrintScreen,

        KeyCode::ArrowUp => Key::ArrowUp,
        KeyCode::ArrowDown => Key::ArrowDown,
        KeyCode::ArrowLeft => Key::ArrowLeft,
        KeyCode::ArrowRight => Key::ArrowRight,

        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::AltLeft | KeyCode::AltRight => Key::Alt,
        KeyCode::SuperLeft | KeyCode::SuperRight => Key::Meta,

        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,

        KeyCode::Digit0 => Key::Digit0,
        KeyCode::Digit1 => Key::Digit1,
        KeyCode::Digit2 => Key::Digit2,
        KeyCode::Digit3 => Key::Digit3,
        KeyCode::Digit4 => Key::Digit4,
        KeyCode::Digit5 => Key::Digit5,
        KeyCode::Digit6 => Key::Digit6,
        KeyCode::Digit7 => Key::Digit7,
        KeyCode::Digit8 => Key::Digit8,
        KeyCode::Digit9 => Key::Digit9,

        KeyCode::F1 => Key::F1,
        KeyCode::F2 => Key::F2,
        KeyCode::F3 => Key::F3,
        KeyCode::F4 => Key::F4,
        KeyCode::F5 => Key::F5,
        KeyCode::F6 => Key::F6,
        KeyCode::F7 => Key::F7,
        KeyCode::F8 => Key::F8,
        KeyCode::F9 => Key::F9,
        KeyCode::F10 => Key::F10,
        KeyCode::F11 => Key::F11,
        KeyCode::F12 => Key::F12,

        other => Key::Unknown(other as u32),
    };

    (key, code as u32)
}
