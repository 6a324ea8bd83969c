//! Pointer events decoded from evdev records.

use crate::cursor::Axis;
use crate::state::{MASK_LEFT, MASK_MIDDLE, MASK_RIGHT};
use evdev::{InputEvent, InputEventKind, Key, RelativeAxisType};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    /// Left mouse button.
    Left,
    /// Middle mouse button.
    Middle,
    /// Right mouse button.
    Right,
    /// Any other key or button code.
    Unknown(u16),
}

impl Button {
    /// Map an evdev key code to a button.
    pub fn from_code(code: u16) -> Self {
        match Key::new(code) {
            Key::BTN_LEFT => Button::Left,
            Key::BTN_MIDDLE => Button::Middle,
            Key::BTN_RIGHT => Button::Right,
            _ => Button::Unknown(code),
        }
    }

    /// Bit of this button in the button mask, 0 if it is not tracked.
    pub fn mask(&self) -> u8 {
        match self {
            Button::Left => MASK_LEFT,
            Button::Middle => MASK_MIDDLE,
            Button::Right => MASK_RIGHT,
            Button::Unknown(_) => 0,
        }
    }
}

/// The parts of an evdev stream the driver acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerEvent {
    /// Relative motion along one axis.
    Motion { axis: Axis, delta: i32 },
    /// A button went down or up.
    Button { button: Button, pressed: bool },
}

/// Key record values, see `input-event-codes.h`.
const KEY_RELEASED: i32 = 0;
const KEY_PRESSED: i32 = 1;

impl PointerEvent {
    /// Classify a raw record. Sync, absolute, wheel and autorepeat records
    /// yield `None`.
    pub fn from_input(ev: &InputEvent) -> Option<Self> {
        match ev.kind() {
            InputEventKind::RelAxis(RelativeAxisType::REL_X) => Some(PointerEvent::Motion {
                axis: Axis::X,
                delta: ev.value(),
            }),
            InputEventKind::RelAxis(RelativeAxisType::REL_Y) => Some(PointerEvent::Motion {
                axis: Axis::Y,
                delta: ev.value(),
            }),
            InputEventKind::Key(key) => {
                let pressed = match ev.value() {
                    KEY_PRESSED => true,
                    KEY_RELEASED => false,
                    _ => return None,
                };
                Some(PointerEvent::Button {
                    button: Button::from_code(key.code()),
                    pressed,
                })
            }
            _ => None,
        }
    }
}
