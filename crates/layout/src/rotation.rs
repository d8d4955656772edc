//! Quarter-turn page rotation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Clockwise rotation applied to every page, in quarter turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// All rotations in clockwise order.
    pub const ALL: [Rotation; 4] = [Rotation::Deg0, Rotation::Deg90, Rotation::Deg180, Rotation::Deg270];

    /// Parse a degree value. Only exact multiples of 90 in `[0, 360)` are accepted.
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    /// Normalize any signed degree value onto the nearest lower quarter turn.
    pub fn wrapping(degrees: i32) -> Self {
        match degrees.rem_euclid(360) / 90 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Rotate a further 90 degrees clockwise, wrapping at 360.
    pub fn clockwise(self) -> Self {
        Self::wrapping(self.degrees() as i32 + 90)
    }

    pub fn counter_clockwise(self) -> Self {
        Self::wrapping(self.degrees() as i32 - 90)
    }

    /// Whether width and height trade places at this rotation.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    /// The rotation that takes `self` to `target`: `(target - self) mod 360`.
    pub fn delta_to(self, target: Rotation) -> Rotation {
        Self::wrapping(target.degrees() as i32 - self.degrees() as i32)
    }

    /// Absolute difference of the two angles, mod 360.
    pub fn difference(self, other: Rotation) -> u16 {
        ((self.degrees() as i32 - other.degrees() as i32).unsigned_abs() % 360) as u16
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        value.degrees()
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Rotation::from_degrees(value).ok_or_else(|| format!("invalid rotation {value}, expected 0/90/180/270"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clockwise_wraps_at_full_turn() {
        assert_eq!(Rotation::Deg0.clockwise(), Rotation::Deg90);
        assert_eq!(Rotation::Deg270.clockwise(), Rotation::Deg0);
        assert_eq!(Rotation::Deg0.counter_clockwise(), Rotation::Deg270);
    }

    #[test]
    fn delta_is_target_minus_source_mod_360() {
        assert_eq!(Rotation::Deg90.delta_to(Rotation::Deg0), Rotation::Deg270);
        assert_eq!(Rotation::Deg0.delta_to(Rotation::Deg270), Rotation::Deg270);
        assert_eq!(Rotation::Deg180.delta_to(Rotation::Deg180), Rotation::Deg0);
    }

    #[test]
    fn difference_is_absolute() {
        assert_eq!(Rotation::Deg0.difference(Rotation::Deg90), 90);
        assert_eq!(Rotation::Deg90.difference(Rotation::Deg0), 90);
        assert_eq!(Rotation::Deg0.difference(Rotation::Deg270), 270);
    }

    #[test]
    fn only_quarter_turns_parse() {
        assert_eq!(Rotation::from_degrees(180), Some(Rotation::Deg180));
        assert_eq!(Rotation::from_degrees(45), None);
        assert!(Rotation::try_from(360u16).is_err());
        assert!(Rotation::Deg90.swaps_axes());
        assert!(!Rotation::Deg180.swaps_axes());
    }
}
