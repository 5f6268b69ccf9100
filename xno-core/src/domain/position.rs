//! Position side — the only three exposures a strategy bar may carry.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw position value that is not -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("position must be -1 (short), 0 (flat) or 1 (long), got {0}")]
pub struct InvalidPosition(pub i64);

/// Exposure held over a bar: short (-1), flat (0) or long (+1).
///
/// Serialized as the integer value so CSV and JSON files keep the
/// `-1 / 0 / 1` encoding used by position signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PositionSide {
    Short,
    #[default]
    Flat,
    Long,
}

impl PositionSide {
    /// Signed contract count: -1, 0 or 1.
    pub fn value(self) -> i64 {
        match self {
            PositionSide::Short => -1,
            PositionSide::Flat => 0,
            PositionSide::Long => 1,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.value() as f64
    }

    pub fn is_flat(self) -> bool {
        self == PositionSide::Flat
    }

    pub fn is_long(self) -> bool {
        self == PositionSide::Long
    }

    pub fn is_short(self) -> bool {
        self == PositionSide::Short
    }
}

impl TryFrom<i64> for PositionSide {
    type Error = InvalidPosition;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(PositionSide::Short),
            0 => Ok(PositionSide::Flat),
            1 => Ok(PositionSide::Long),
            other => Err(InvalidPosition(other)),
        }
    }
}

impl From<PositionSide> for i64 {
    fn from(side: PositionSide) -> Self {
        side.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_three_sides() {
        assert_eq!(PositionSide::try_from(-1), Ok(PositionSide::Short));
        assert_eq!(PositionSide::try_from(0), Ok(PositionSide::Flat));
        assert_eq!(PositionSide::try_from(1), Ok(PositionSide::Long));
    }

    #[test]
    fn rejects_other_values() {
        assert_eq!(PositionSide::try_from(2), Err(InvalidPosition(2)));
        assert_eq!(PositionSide::try_from(-3), Err(InvalidPosition(-3)));
    }

    #[test]
    fn serializes_as_integer() {
        let json = serde_json::to_string(&PositionSide::Short).unwrap();
        assert_eq!(json, "-1");
        let side: PositionSide = serde_json::from_str("1").unwrap();
        assert_eq!(side, PositionSide::Long);
        assert!(serde_json::from_str::<PositionSide>("5").is_err());
    }
}
