use crate::error::{Result, SignalError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// One OHLCV candle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    /// Check price positivity, volume sign and the high/body/low ordering
    fn check(&self) -> std::result::Result<(), String> {
        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{} must be a positive finite price, got {}", name, value));
            }
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(format!("volume must be finite and non-negative, got {}", self.volume));
        }
        if self.high < self.body_high() {
            return Err(format!("high {} below body top {}", self.high, self.body_high()));
        }
        if self.low > self.body_low() {
            return Err(format!("low {} above body bottom {}", self.low, self.body_low()));
        }
        Ok(())
    }
}

/// Time-ascending sequence of validated bars.
///
/// The pipeline only ever borrows a series; every computation works on
/// its own copy of the values so the caller's data is never touched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OhlcvSeries {
    bars: Vec<Bar>,
}

impl OhlcvSeries {
    /// Build a series, validating every bar and the time ordering
    pub fn new(bars: Vec<Bar>) -> Result<Self> {
        for (index, bar) in bars.iter().enumerate() {
            bar.check()
                .map_err(|reason| SignalError::InvalidSeries { index, reason })?;

            if index > 0 && bar.timestamp < bars[index - 1].timestamp {
                return Err(SignalError::InvalidSeries {
                    index,
                    reason: format!(
                        "timestamp {} precedes previous bar {}",
                        bar.timestamp,
                        bars[index - 1].timestamp
                    ),
                });
            }
        }

        Ok(Self { bars })
    }

    /// Read `timestamp,open,high,low,close,volume` rows
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut bars = Vec::new();
        for (index, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
            let row = row?;
            let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| SignalError::InvalidSeries {
                index,
                reason: format!("unrecognised timestamp '{}'", row.timestamp),
            })?;
            bars.push(Bar::new(timestamp, row.open, row.high, row.low, row.close, row.volume));
        }

        Self::new(bars)
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DD` and unix seconds
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}
