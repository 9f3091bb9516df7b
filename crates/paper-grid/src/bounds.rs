use std::fmt;

use paper_types::models::Coordinate;

pub const BOARD_WIDTH: u8 = 12;
pub const BOARD_HEIGHT: u8 = 10;
pub const BOARD_CELLS: usize = BOARD_WIDTH as usize * BOARD_HEIGHT as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coordinate fell outside the board. Carries enough to tell the caller
/// exactly which range it missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{axis} must be {min}-{max} (got {value})")]
pub struct OutOfBounds {
    pub axis: Axis,
    pub value: i64,
    pub min: u8,
    pub max: u8,
}

impl OutOfBounds {
    /// User-facing reason without the offending value, e.g. `x must be 0-11`.
    pub fn reason(&self) -> String {
        format!("{} must be {}-{}", self.axis, self.min, self.max)
    }
}

/// Check a raw coordinate against the board extent. `x` is checked first.
pub fn validate(x: i64, y: i64) -> Result<Coordinate, OutOfBounds> {
    let x = check_axis(Axis::X, x, BOARD_WIDTH)?;
    let y = check_axis(Axis::Y, y, BOARD_HEIGHT)?;
    Ok(Coordinate::new(x, y))
}

fn check_axis(axis: Axis, value: i64, extent: u8) -> Result<u8, OutOfBounds> {
    match u8::try_from(value) {
        Ok(v) if v < extent => Ok(v),
        _ => Err(OutOfBounds {
            axis,
            value,
            min: 0,
            max: extent - 1,
        }),
    }
}

/// All slots on a board, in row-major order.
pub fn all_coordinates() -> impl Iterator<Item = Coordinate> {
    (0..BOARD_HEIGHT).flat_map(|y| (0..BOARD_WIDTH).map(move |x| Coordinate::new(x, y)))
}
