//! Window-host and input-event interfaces. Windowing, event pumping and
//! image decoding live outside the crate; these types are the contract
//! a host implements.

use crate::texture::Image;

/// Mouse buttons as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MouseButtons(pub u8);

impl MouseButtons {
    /// Left button bit.
    pub const LEFT: u8 = 1;
    /// Right button bit.
    pub const RIGHT: u8 = 2;
    /// Middle button bit.
    pub const MIDDLE: u8 = 4;

    /// True if the left button is held.
    pub fn left(&self) -> bool {
        self.0 & Self::LEFT != 0
    }

    /// True if the right button is held.
    pub fn right(&self) -> bool {
        self.0 & Self::RIGHT != 0
    }

    /// True if the middle button is held.
    pub fn middle(&self) -> bool {
        self.0 & Self::MIDDLE != 0
    }
}

/// Keyboard modifier bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(pub u8);

impl Modifiers {
    /// Shift bit.
    pub const SHIFT: u8 = 1;
    /// Control bit.
    pub const CTRL: u8 = 2;
    /// Alt bit.
    pub const ALT: u8 = 4;
    /// Meta/super bit.
    pub const META: u8 = 8;
}

/// The closed set of keys the engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum KeyCode {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Digit0, Digit1, Digit2, Digit3, Digit4,
    Digit5, Digit6, Digit7, Digit8, Digit9,
    Left, Right, Up, Down,
    Space, Enter, Escape, Tab, Backspace,
    PageUp, PageDown, Home, End,
}

/// A mouse event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseEvent {
    /// Pointer moved.
    Move {
        /// Screen x in pixels.
        x: f32,
        /// Screen y in pixels.
        y: f32,
        /// Delta x since the last event.
        dx: f32,
        /// Delta y since the last event.
        dy: f32,
        /// Held buttons.
        buttons: MouseButtons,
    },
    /// Button pressed.
    Down {
        /// Screen x in pixels.
        x: f32,
        /// Screen y in pixels.
        y: f32,
        /// Pressed button mask.
        buttons: MouseButtons,
    },
    /// Button released.
    Up {
        /// Screen x in pixels.
        x: f32,
        /// Screen y in pixels.
        y: f32,
        /// Released button mask.
        buttons: MouseButtons,
    },
    /// Wheel scrolled.
    Wheel {
        /// Scroll delta, positive away from the user.
        delta: f32,
    },
}

/// A keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardEvent {
    /// Key pressed.
    Down {
        /// The key.
        key: KeyCode,
        /// Held modifiers.
        modifiers: Modifiers,
    },
    /// Key released.
    Up {
        /// The key.
        key: KeyCode,
        /// Held modifiers.
        modifiers: Modifiers,
    },
    /// Key press repeated.
    Press {
        /// The key.
        key: KeyCode,
        /// Held modifiers.
        modifiers: Modifiers,
    },
}

/// The window host contract: context creation, presentation and image
/// decoding.
pub trait WindowHost {
    /// Host failure type.
    type Error;

    /// Create the drawing surface and GPU context.
    fn init(&mut self, width: u32, height: u32) -> Result<(), Self::Error>;

    /// Present the back buffer.
    fn swap_buffers(&mut self);

    /// Decode an image from a path.
    fn load_image(&mut self, path: &str) -> Result<Image, Self::Error>;

    /// Drain pending mouse events.
    fn poll_mouse(&mut self) -> Vec<MouseEvent>;

    /// Drain pending keyboard events.
    fn poll_keyboard(&mut self) -> Vec<KeyboardEvent>;
}
