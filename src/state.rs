//! Shared button state.
//!
//! The mask is written only by device watchers and read by the driver
//! facade. It has its own mutex, independent of the cursor, so a position
//! read and a button read may observe different instants.

use crate::error::{Error, Result};
use crate::event::Button;
use std::sync::{Mutex, PoisonError};

/// Left mouse button mask.
pub const MASK_LEFT: u8 = 1;
/// Middle mouse button mask.
pub const MASK_MIDDLE: u8 = 2;
/// Right mouse button mask.
pub const MASK_RIGHT: u8 = 4;

/// All button masks combined.
pub const MASK_ALL_BUTTONS: u8 = MASK_LEFT | MASK_MIDDLE | MASK_RIGHT;

/// Mutex-guarded button bitmask.
#[derive(Debug, Default)]
pub struct ButtonState {
    mask: Mutex<u8>,
}

impl ButtonState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear one button. Untracked buttons are ignored.
    pub fn set_button(&self, button: Button, pressed: bool) -> Result<()> {
        let bit = button.mask();
        if bit == 0 {
            return Ok(());
        }
        let mut mask = self.mask.lock().map_err(|_| Error::Lock("buttons"))?;
        if pressed {
            *mask |= bit;
        } else {
            *mask &= !bit;
        }
        Ok(())
    }

    /// Get the current mask value.
    pub fn mask(&self) -> u8 {
        *self.mask.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset the mask to zero.
    pub fn reset(&self) -> Result<()> {
        *self.mask.lock().map_err(|_| Error::Lock("buttons"))? = 0;
        Ok(())
    }

    /// Check if a specific button is held.
    #[inline]
    pub fn is_pressed(&self, button_mask: u8) -> bool {
        (self.mask() & button_mask) != 0
    }
}
