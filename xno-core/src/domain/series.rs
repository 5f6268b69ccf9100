//! Series — an ordered, validated sequence of bars.
//!
//! Every component downstream (adjuster, PnL engine, daily grouping) relies on
//! the bars being strictly increasing in time, so that ordering is checked once
//! here and never again.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bar::Bar;
use super::position::PositionSide;

/// Validation failures when building a [`Series`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("bar {index}: position must be -1, 0 or 1, got {value}")]
    InvalidPosition { index: usize, value: i64 },

    #[error("bar {index}: close must be positive and finite, got {price}")]
    InvalidPrice { index: usize, price: f64 },

    #[error("bar {index}: timestamp is not after the previous bar (series is not chronologically indexed)")]
    NotChronological { index: usize },

    #[error("duplicate timestamp {timestamp}")]
    DuplicateTimestamp { timestamp: NaiveDateTime },

    #[error("column lengths differ: {timestamps} timestamps, {closes} closes, {positions} positions")]
    LengthMismatch {
        timestamps: usize,
        closes: usize,
        positions: usize,
    },
}

/// Chronologically ordered bars with unique timestamps and positive closes.
///
/// Immutable once built; transformations such as position adjustment produce
/// a new `Series`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    /// Build from bars that are already in strictly increasing time order.
    pub fn new(bars: Vec<Bar>) -> Result<Self, SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            if !bar.is_sane() {
                return Err(SeriesError::InvalidPrice {
                    index,
                    price: bar.close,
                });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(SeriesError::NotChronological { index });
            }
        }
        Ok(Self { bars })
    }

    /// Sort bars by timestamp first, then validate.
    ///
    /// Duplicate timestamps are rejected rather than silently deduplicated.
    pub fn from_unsorted(mut bars: Vec<Bar>) -> Result<Self, SeriesError> {
        bars.sort_by_key(|b| b.timestamp);
        if let Some(pair) = bars.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(SeriesError::DuplicateTimestamp {
                timestamp: pair[1].timestamp,
            });
        }
        Self::new(bars)
    }

    /// Build from parallel columns with raw integer positions.
    pub fn from_columns(
        timestamps: &[NaiveDateTime],
        closes: &[f64],
        positions: &[i64],
    ) -> Result<Self, SeriesError> {
        if timestamps.len() != closes.len() || closes.len() != positions.len() {
            return Err(SeriesError::LengthMismatch {
                timestamps: timestamps.len(),
                closes: closes.len(),
                positions: positions.len(),
            });
        }

        let bars = timestamps
            .iter()
            .zip(closes)
            .zip(positions)
            .enumerate()
            .map(|(index, ((&ts, &close), &raw))| {
                let side = PositionSide::try_from(raw)
                    .map_err(|e| SeriesError::InvalidPosition { index, value: e.0 })?;
                Ok(Bar::new(ts, close, side))
            })
            .collect::<Result<Vec<_>, SeriesError>>()?;

        Self::new(bars)
    }

    /// Wrap bars derived from an already validated series (same timestamps and closes).
    pub(crate) fn from_trusted(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    /// New series with the same timestamps and closes but different positions.
    ///
    /// Returns `None` if `positions` does not have one entry per bar.
    pub fn with_positions(&self, positions: &[PositionSide]) -> Option<Series> {
        if positions.len() != self.bars.len() {
            return None;
        }
        let bars = self
            .bars
            .iter()
            .zip(positions)
            .map(|(bar, &side)| bar.with_position(side))
            .collect();
        Some(Series { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn positions(&self) -> Vec<PositionSide> {
        self.bars.iter().map(|b| b.position).collect()
    }

    pub fn timestamps(&self) -> Vec<NaiveDateTime> {
        self.bars.iter().map(|b| b.timestamp).collect()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }
}

impl TryFrom<Vec<Bar>> for Series {
    type Error = SeriesError;

    fn try_from(bars: Vec<Bar>) -> Result<Self, Self::Error> {
        Series::new(bars)
    }
}

impl From<Series> for Vec<Bar> {
    fn from(series: Series) -> Self {
        series.bars
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}
