//! Bar loading — CSV files of `date, time, close, position` rows into a
//! validated [`Series`].
//!
//! Column names are matched case-insensitively and `time` is optional
//! (midnight when absent). Rows may arrive in any order; they are sorted by
//! timestamp before validation.

use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;
use tracing::info;

use xno_core::domain::{Bar, PositionSide, Series, SeriesError};

/// Errors from the data loading layer. Row errors carry the 1-based line
/// number in the source file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("line {line}: cannot parse {field} from '{value}'")]
    Parse {
        line: u64,
        field: &'static str,
        value: String,
    },
    #[error("line {line}: position {value} is not one of -1, 0, 1")]
    InvalidPosition { line: u64, value: i64 },
    #[error("line {line}: close {price} must be finite and positive")]
    InvalidPrice { line: u64, price: f64 },
    #[error("line {line}: duplicate timestamp {timestamp}")]
    DuplicateTimestamp { line: u64, timestamp: NaiveDateTime },
    #[error(transparent)]
    Series(#[from] SeriesError),
}

struct Columns {
    date: usize,
    time: Option<usize>,
    close: usize,
    position: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Ok(Self {
            date: find("date").ok_or(LoadError::MissingColumn("date"))?,
            time: find("time"),
            close: find("close").ok_or(LoadError::MissingColumn("close"))?,
            position: find("position").ok_or(LoadError::MissingColumn("position"))?,
        })
    }
}

/// Load a series from a CSV file.
pub fn load_series(path: &Path) -> Result<Series, LoadError> {
    let reader = csv::Reader::from_path(path)?;
    let series = read_rows(reader)?;
    info!(path = %path.display(), bars = series.len(), "loaded series");
    Ok(series)
}

/// Load a series from any CSV source with a header row.
pub fn load_series_from_reader<R: Read>(reader: R) -> Result<Series, LoadError> {
    read_rows(csv::Reader::from_reader(reader))
}

fn read_rows<R: Read>(mut reader: csv::Reader<R>) -> Result<Series, LoadError> {
    let columns = Columns::locate(reader.headers()?)?;

    let mut rows: Vec<(u64, Bar)> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let field = |idx: usize| record.get(idx).unwrap_or("").trim();

        let timestamp = parse_timestamp(
            line,
            field(columns.date),
            columns.time.map(|i| field(i)),
        )?;
        let close = parse_close(line, field(columns.close))?;
        let position = parse_position(line, field(columns.position))?;
        rows.push((line, Bar::new(timestamp, close, position)));
    }

    rows.sort_by_key(|(_, bar)| bar.timestamp);
    if let Some(pair) = rows
        .windows(2)
        .find(|w| w[0].1.timestamp == w[1].1.timestamp)
    {
        return Err(LoadError::DuplicateTimestamp {
            line: pair[1].0,
            timestamp: pair[1].1.timestamp,
        });
    }

    Ok(Series::new(rows.into_iter().map(|(_, bar)| bar).collect())?)
}

fn parse_timestamp(line: u64, date: &str, time: Option<&str>) -> Result<NaiveDateTime, LoadError> {
    let parse_err = |field, value: &str| LoadError::Parse {
        line,
        field,
        value: value.to_string(),
    };

    // A full timestamp in the date column wins over a separate time column.
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(date, fmt) {
            return Ok(ts);
        }
    }

    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| parse_err("date", date))?;
    let clock = match time.filter(|t| !t.is_empty()) {
        None => NaiveTime::MIN,
        Some(t) => NaiveTime::parse_from_str(t, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M"))
            .map_err(|_| parse_err("time", t))?,
    };
    Ok(day.and_time(clock))
}

fn parse_close(line: u64, value: &str) -> Result<f64, LoadError> {
    let price: f64 = value.parse().map_err(|_| LoadError::Parse {
        line,
        field: "close",
        value: value.to_string(),
    })?;
    if !price.is_finite() || price <= 0.0 {
        return Err(LoadError::InvalidPrice { line, price });
    }
    Ok(price)
}

/// Integers, or floats with no fractional part (`1.0`).
fn parse_position(line: u64, value: &str) -> Result<PositionSide, LoadError> {
    let parsed = value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    });
    let raw = parsed.ok_or_else(|| LoadError::Parse {
        line,
        field: "position",
        value: value.to_string(),
    })?;
    PositionSide::try_from(raw).map_err(|_| LoadError::InvalidPosition { line, value: raw })
}
