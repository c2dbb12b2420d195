use std::collections::HashSet;

use anyhow::Result;

use crate::coords::{Vec2, WindowGeometry};

use super::devices::Events;
use super::native::{KeyAction, NativeEvent};
use super::types::{
    CharacterEvent, DropEvent, KeyEvent, KeyEventType, Modifiers, MouseButton, MouseEvent,
    MouseEventType, WindowEvent, WindowEventType,
};

/// Conversion between platform window metrics and logical units.
///
/// Some platforms report cursor and window positions in scaled pixels rather
/// than logical units. `scaled` is the one switch for that quirk: when set,
/// positions are divided by the content scale on the way in and multiplied on
/// the way out.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WindowMetrics {
    pub scaled: bool,
    pub scale: f64,
}

impl WindowMetrics {
    pub fn new(scaled: bool, scale: f64) -> Self {
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        Self { scaled, scale }
    }

    /// Platform position to logical units.
    pub fn to_logical(&self, x: f64, y: f64) -> Vec2 {
        if self.scaled {
            Vec2::new((x / self.scale) as f32, (y / self.scale) as f32)
        } else {
            Vec2::new(x as f32, y as f32)
        }
    }

    /// Logical units to a platform position.
    pub fn to_platform(&self, position: Vec2) -> (i32, i32) {
        if self.scaled {
            (
                (position.x as f64 * self.scale).round() as i32,
                (position.y as f64 * self.scale).round() as i32,
            )
        } else {
            (position.x.round() as i32, position.y.round() as i32)
        }
    }
}

impl Default for WindowMetrics {
    fn default() -> Self {
        Self::new(false, 1.0)
    }
}

/// Loop-local capture state.
///
/// Turns raw [`NativeEvent`]s into typed payloads and publishes them into the
/// deferred channels of [`Events`]. Never runs a listener itself.
///
/// Tracks the last modifier set (refreshed on key and button events, reused for
/// moves, scrolls and characters), the set of held mouse buttons (drives
/// `dragged` and `clicked` synthesis) and window focus.
#[derive(Debug)]
pub struct InputCapture {
    modifiers: Modifiers,
    buttons_down: HashSet<MouseButton>,
    last_drag_position: Vec2,
    window_position: Vec2,
    focused: bool,
}

impl InputCapture {
    pub fn new() -> Self {
        Self {
            modifiers: Modifiers::NONE,
            buttons_down: HashSet::new(),
            last_drag_position: Vec2::ZERO,
            window_position: Vec2::ZERO,
            focused: true,
        }
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn focused(&self) -> bool {
        self.focused
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn any_button_down(&self) -> bool {
        !self.buttons_down.is_empty()
    }

    /// Seeds the window position reported with `sized` events.
    pub fn set_window_position(&mut self, position: Vec2) {
        self.window_position = position;
    }

    /// Captures one native event.
    ///
    /// `geometry` must already reflect resize/scale events. Refresh and close
    /// requests are loop-level and ignored here.
    pub fn handle(
        &mut self,
        event: &NativeEvent,
        events: &Events,
        metrics: WindowMetrics,
        geometry: &WindowGeometry,
    ) -> Result<()> {
        match event {
            NativeEvent::Key {
                key,
                scan_code,
                name,
                action,
                modifiers,
            } => {
                self.modifiers = *modifiers;

                let (kind, channel) = match action {
                    KeyAction::Press => (KeyEventType::KeyDown, &events.keyboard.key_down),
                    KeyAction::Release => (KeyEventType::KeyUp, &events.keyboard.key_up),
                    KeyAction::Repeat => (KeyEventType::KeyRepeat, &events.keyboard.key_repeat),
                };

                channel.publish(KeyEvent {
                    kind,
                    key: *key,
                    scan_code: *scan_code,
                    name: name.clone().unwrap_or_else(|| "<null>".to_string()),
                    modifiers: *modifiers,
                    propagation_cancelled: false,
                })
            }

            NativeEvent::Character(character) => {
                events.keyboard.character.publish(CharacterEvent {
                    character: *character,
                    modifiers: self.modifiers,
                    propagation_cancelled: false,
                })
            }

            NativeEvent::CursorMoved { x, y } => {
                let position = metrics.to_logical(*x, *y);
                log::trace!("mouse moved {x} {y} -- {position:?}");

                events.mouse.set_position(position);
                events.mouse.moved.publish(MouseEvent::new(
                    MouseEventType::Moved,
                    position,
                    MouseButton::None,
                    self.modifiers,
                ))?;

                if self.any_button_down() {
                    let mut dragged = MouseEvent::new(
                        MouseEventType::Dragged,
                        position,
                        MouseButton::None,
                        self.modifiers,
                    );
                    dragged.drag_displacement = position - self.last_drag_position;
                    self.last_drag_position = position;
                    events.mouse.dragged.publish(dragged)?;
                }

                Ok(())
            }

            NativeEvent::MouseButton {
                button,
                pressed,
                modifiers,
            } => {
                self.modifiers = *modifiers;
                let position = events.mouse.position();

                if *pressed {
                    self.buttons_down.insert(*button);
                    self.last_drag_position = position;
                    events.mouse.button_down.publish(MouseEvent::new(
                        MouseEventType::ButtonDown,
                        position,
                        *button,
                        *modifiers,
                    ))
                } else {
                    self.buttons_down.remove(button);
                    events.mouse.button_up.publish(MouseEvent::new(
                        MouseEventType::ButtonUp,
                        position,
                        *button,
                        *modifiers,
                    ))?;
                    events.mouse.clicked.publish(MouseEvent::new(
                        MouseEventType::Clicked,
                        position,
                        *button,
                        *modifiers,
                    ))
                }
            }

            NativeEvent::Scroll { dx, dy } => {
                let mut scrolled = MouseEvent::new(
                    MouseEventType::Scrolled,
                    events.mouse.position(),
                    MouseButton::None,
                    self.modifiers,
                );
                scrolled.rotation = Vec2::new(*dx as f32, *dy as f32);
                events.mouse.scrolled.publish(scrolled)
            }

            NativeEvent::Drop(files) => {
                log::debug!("{} file(s) have been dropped", files.len());
                events.window.drop.publish(DropEvent {
                    position: events.mouse.position(),
                    files: files.clone(),
                    propagation_cancelled: false,
                })
            }

            NativeEvent::WindowMoved { x, y } => {
                log::debug!("window has moved to {x} {y}");
                let position = metrics.to_logical(*x as f64, *y as f64);
                self.window_position = position;
                events.window.moved.publish(WindowEvent::new(
                    WindowEventType::Moved,
                    position,
                    Vec2::ZERO,
                    self.focused,
                ))
            }

            NativeEvent::FramebufferResized { .. } | NativeEvent::ScaleChanged(_) => {
                events.window.sized.publish(WindowEvent::new(
                    WindowEventType::Resized,
                    self.window_position,
                    geometry.size(),
                    self.focused,
                ))
            }

            NativeEvent::Focus(focused) => {
                log::debug!("window focus has changed; focused={focused}");
                self.focused = *focused;

                if *focused {
                    events.window.focused.publish(WindowEvent::new(
                        WindowEventType::Focused,
                        Vec2::ZERO,
                        Vec2::ZERO,
                        true,
                    ))
                } else {
                    // Releases may never arrive once focus is gone; avoid stuck drags.
                    self.buttons_down.clear();
                    events.window.unfocused.publish(WindowEvent::new(
                        WindowEventType::Unfocused,
                        Vec2::ZERO,
                        Vec2::ZERO,
                        false,
                    ))
                }
            }

            NativeEvent::Refresh | NativeEvent::CloseRequested => Ok(()),
        }
    }
}

impl Default for InputCapture {
    fn default() -> Self {
        Self::new()
    }
}
