use std::cell::Cell;

use anyhow::Result;

use crate::coords::Vec2;
use crate::events::EventChannel;

use super::types::{CharacterEvent, DropEvent, KeyEvent, MouseEvent, WindowEvent};

/// Keyboard channels.
#[derive(Debug)]
pub struct Keyboard {
    pub key_down: EventChannel<KeyEvent>,
    pub key_up: EventChannel<KeyEvent>,
    pub key_repeat: EventChannel<KeyEvent>,
    pub character: EventChannel<CharacterEvent>,
}

impl Keyboard {
    fn new() -> Self {
        Self {
            key_down: EventChannel::deferred(),
            key_up: EventChannel::deferred(),
            key_repeat: EventChannel::deferred(),
            character: EventChannel::deferred(),
        }
    }

    fn deliver(&self) -> Result<()> {
        self.key_down.deliver()?;
        self.key_up.deliver()?;
        self.key_repeat.deliver()?;
        self.character.deliver()
    }

    fn pending(&self) -> usize {
        self.key_down.pending()
            + self.key_up.pending()
            + self.key_repeat.pending()
            + self.character.pending()
    }
}

/// Mouse channels plus the last known cursor position.
#[derive(Debug)]
pub struct Mouse {
    position: Cell<Vec2>,

    pub moved: EventChannel<MouseEvent>,
    pub scrolled: EventChannel<MouseEvent>,
    pub button_down: EventChannel<MouseEvent>,
    pub dragged: EventChannel<MouseEvent>,
    pub button_up: EventChannel<MouseEvent>,
    pub clicked: EventChannel<MouseEvent>,
}

impl Mouse {
    fn new() -> Self {
        Self {
            position: Cell::new(Vec2::ZERO),
            moved: EventChannel::deferred(),
            scrolled: EventChannel::deferred(),
            button_down: EventChannel::deferred(),
            dragged: EventChannel::deferred(),
            button_up: EventChannel::deferred(),
            clicked: EventChannel::deferred(),
        }
    }

    /// Cursor position in logical units, as of the last processed move.
    pub fn position(&self) -> Vec2 {
        self.position.get()
    }

    pub(crate) fn set_position(&self, position: Vec2) {
        self.position.set(position);
    }

    // Press, drag and release of one gesture are delivered in that order.
    fn deliver(&self) -> Result<()> {
        self.moved.deliver()?;
        self.scrolled.deliver()?;
        self.button_down.deliver()?;
        self.dragged.deliver()?;
        self.button_up.deliver()?;
        self.clicked.deliver()
    }

    fn pending(&self) -> usize {
        self.moved.pending()
            + self.scrolled.pending()
            + self.button_down.pending()
            + self.dragged.pending()
            + self.button_up.pending()
            + self.clicked.pending()
    }
}

/// Window channels.
#[derive(Debug)]
pub struct WindowEvents {
    pub drop: EventChannel<DropEvent>,
    pub sized: EventChannel<WindowEvent>,
    pub moved: EventChannel<WindowEvent>,
    pub focused: EventChannel<WindowEvent>,
    pub unfocused: EventChannel<WindowEvent>,
}

impl WindowEvents {
    fn new() -> Self {
        Self {
            drop: EventChannel::deferred(),
            sized: EventChannel::deferred(),
            moved: EventChannel::deferred(),
            focused: EventChannel::deferred(),
            unfocused: EventChannel::deferred(),
        }
    }

    fn deliver(&self) -> Result<()> {
        self.drop.deliver()?;
        self.sized.deliver()?;
        self.moved.deliver()?;
        self.focused.deliver()?;
        self.unfocused.deliver()
    }

    fn pending(&self) -> usize {
        self.drop.pending()
            + self.sized.pending()
            + self.moved.pending()
            + self.focused.pending()
            + self.unfocused.pending()
    }
}

/// Every input channel of one application instance.
///
/// All channels are deferred: capture only enqueues, and the loop calls
/// [`Events::deliver_all`] from its own stack.
#[derive(Debug)]
pub struct Events {
    pub keyboard: Keyboard,
    pub mouse: Mouse,
    pub window: WindowEvents,
}

impl Events {
    pub fn new() -> Self {
        Self {
            keyboard: Keyboard::new(),
            mouse: Mouse::new(),
            window: WindowEvents::new(),
        }
    }

    /// Delivers every channel: window, then keyboard, then mouse.
    ///
    /// Stops at the first listener error.
    pub fn deliver_all(&self) -> Result<()> {
        self.window.deliver()?;
        self.keyboard.deliver()?;
        self.mouse.deliver()
    }

    /// Total number of queued values across all channels.
    pub fn pending(&self) -> usize {
        self.window.pending() + self.keyboard.pending() + self.mouse.pending()
    }
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}
