//! Domain types: bars, position sides and validated series.

pub mod bar;
pub mod position;
pub mod series;

pub use bar::Bar;
pub use position::{InvalidPosition, PositionSide};
pub use series::{Series, SeriesError};
