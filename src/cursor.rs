//! Shared cursor state: the configured area and the clamped position.
//!
//! Every device watcher feeds relative motion into the same [`Cursor`], so
//! the result behaves like one pointer driven by all attached mice. Clamping
//! happens per delta, which makes the final position order-dependent when
//! two devices push against the same edge at once.

use crate::error::{Error, Result};
use std::sync::{Mutex, PoisonError};

/// A pointer axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

/// The half-open interval `[min, max)` a coordinate is kept in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    /// Clamp `value` into `[min, max)`.
    ///
    /// An empty range (`min == max`) pins the coordinate to `min`.
    pub fn clamp(&self, value: i64) -> i32 {
        let min = i64::from(self.min);
        let last = (i64::from(self.max) - 1).max(min);
        // Both bounds come from i32 values, so the result fits.
        value.clamp(min, last) as i32
    }

    #[cfg(test)]
    fn contains(&self, value: i32) -> bool {
        value >= self.min && value < self.max
    }
}

/// The rectangle the cursor is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Area {
    pub x: AxisRange,
    pub y: AxisRange,
}

impl Area {
    /// Build an area, rejecting `min > max` on either axis.
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Result<Self> {
        if min_x > max_x || min_y > max_y {
            return Err(Error::InvalidArea {
                min_x,
                min_y,
                max_x,
                max_y,
            });
        }
        Ok(Self {
            x: AxisRange {
                min: min_x,
                max: max_x,
            },
            y: AxisRange {
                min: min_y,
                max: max_y,
            },
        })
    }

    fn range(&self, axis: Axis) -> &AxisRange {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
        }
    }
}

#[derive(Debug, Default)]
struct CursorState {
    area: Area,
    x: i32,
    y: i32,
}

/// Mutex-guarded area and position shared by every watcher.
#[derive(Debug, Default)]
pub struct Cursor {
    state: Mutex<CursorState>,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace both axis ranges. The current position is left as is until
    /// the next motion or [`set_position`](Self::set_position).
    pub fn configure_area(&self, area: Area) -> Result<()> {
        let mut state = self.lock()?;
        state.area = area;
        Ok(())
    }

    /// Move the cursor to `(x, y)`, clamped into the area.
    pub fn set_position(&self, x: i32, y: i32) -> Result<()> {
        let mut state = self.lock()?;
        state.x = state.area.x.clamp(i64::from(x));
        state.y = state.area.y.clamp(i64::from(y));
        Ok(())
    }

    /// Add a relative delta to one axis and clamp the result.
    pub fn apply_delta(&self, axis: Axis, delta: i32) -> Result<()> {
        let mut state = self.lock()?;
        let range = *state.area.range(axis);
        let coord = match axis {
            Axis::X => &mut state.x,
            Axis::Y => &mut state.y,
        };
        *coord = range.clamp(i64::from(*coord) + i64::from(delta));
        Ok(())
    }

    /// Current `(x, y)`.
    pub fn position(&self) -> (i32, i32) {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        (state.x, state.y)
    }

    /// Currently configured area.
    pub fn area(&self) -> Area {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .area
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CursorState>> {
        self.state.lock().map_err(|_| Error::Lock("cursor"))
    }
}
