//! Candle loading for the runner.
//!
//! Sources, picked by file extension:
//! - `.json`: a bare array of broker 6-tuples, or the broker envelope
//!   `{ "data": [[ts, o, h, l, c, v], ...] }`
//! - `.csv`: header `timestamp,open,high,low,close,volume`
//!
//! Every loaded series must be strictly increasing in time; the engine never
//! sorts or deduplicates. Synthetic candles are a developer-only mode.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Timelike, Weekday};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use candlesim_core::domain::{candles_from_rows, Candle, CandleError};
use candlesim_core::strategy::TradingSession;

/// Minutes per synthetic candle.
pub const SYNTHETIC_INTERVAL_MINUTES: i64 = 15;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported candle file '{0}' (expected .json or .csv)")]
    UnsupportedFormat(PathBuf),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON candles must be an array of rows or an object with a 'data' array")]
    UnexpectedShape,

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Candle(#[from] CandleError),

    #[error("candles out of order at index {index}: {current} does not follow {previous}")]
    Unordered {
        index: usize,
        previous: DateTime<FixedOffset>,
        current: DateTime<FixedOffset>,
    },
}

/// Load and validate candles from a `.json` or `.csv` file.
pub fn load_candles(path: impl AsRef<Path>) -> Result<Vec<Candle>, LoadError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let candles = match extension.as_deref() {
        Some("json") => parse_json_candles(&read_file(path)?)?,
        Some("csv") => {
            let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_csv_candles(file)?
        }
        _ => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    };

    ensure_ordered(&candles)?;
    info!(path = %path.display(), candles = candles.len(), "loaded candles");
    Ok(candles)
}

fn read_file(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse broker JSON: bare array or `{ "data": [...] }` envelope.
pub fn parse_json_candles(text: &str) -> Result<Vec<Candle>, LoadError> {
    let root: Value = serde_json::from_str(text)?;
    let rows = match root {
        Value::Array(rows) => Value::Array(rows),
        Value::Object(mut map) => match map.remove("data") {
            Some(data @ Value::Array(_)) => data,
            _ => return Err(LoadError::UnexpectedShape),
        },
        _ => return Err(LoadError::UnexpectedShape),
    };
    let rows: Vec<Vec<Value>> = serde_json::from_value(rows)?;
    Ok(candles_from_rows(&rows)?)
}

/// Parse CSV with a `timestamp,open,high,low,close,volume` header.
pub fn parse_csv_candles<R: Read>(reader: R) -> Result<Vec<Candle>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| Value::String(field.to_string()))
                .collect::<Vec<_>>(),
        );
    }
    Ok(candles_from_rows(&rows)?)
}

/// Timestamps must strictly increase.
pub fn ensure_ordered(candles: &[Candle]) -> Result<(), LoadError> {
    for (index, pair) in candles.windows(2).enumerate() {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(LoadError::Unordered {
                index: index + 1,
                previous: pair[0].timestamp,
                current: pair[1].timestamp,
            });
        }
    }
    Ok(())
}

/// Deterministic blake3 hash over all candle fields, in series order.
pub fn dataset_hash(candles: &[Candle]) -> String {
    let mut hasher = blake3::Hasher::new();
    for candle in candles {
        hasher.update(candle.timestamp.to_rfc3339().as_bytes());
        hasher.update(&candle.open.to_le_bytes());
        hasher.update(&candle.high.to_le_bytes());
        hasher.update(&candle.low.to_le_bytes());
        hasher.update(&candle.close.to_le_bytes());
        hasher.update(&candle.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate `n` synthetic 15-minute session candles from `start`.
///
/// A seeded random walk from 1000.0: same `(n, seed, start)`, same candles.
/// Bars open from the session open up to the last full interval before the
/// close; weekends are skipped. A `start` outside a session rolls forward
/// to the next session open.
pub fn generate_synthetic_candles(
    n: usize,
    seed: u64,
    start: DateTime<FixedOffset>,
) -> Vec<Candle> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    warn!(n, seed, "generating synthetic candles; results are not market data");

    let session = TradingSession::default();
    let step = Duration::minutes(SYNTHETIC_INTERVAL_MINUTES);
    let last_open = session.close - step;
    let mut rng = StdRng::seed_from_u64(seed);

    let mut candles = Vec::with_capacity(n);
    let mut price = 1000.0_f64;
    let mut ts = align_to_session(start, &session, last_open);

    while candles.len() < n {
        let change: f64 = rng.gen_range(-0.004..0.004);
        let open = price;
        let close = (price * (1.0 + change) * 100.0).round() / 100.0;
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));
        let volume = rng.gen_range(5_000..50_000u64);

        candles.push(Candle::new(ts, open, high, low, close, volume));
        price = close;
        ts = align_to_session(ts + step, &session, last_open);
    }

    debug!(candles = candles.len(), "synthetic series ready");
    candles
}

/// Roll `ts` forward to the next valid bar open inside a weekday session.
fn align_to_session(
    ts: DateTime<FixedOffset>,
    session: &TradingSession,
    last_open: NaiveTime,
) -> DateTime<FixedOffset> {
    let mut ts = ts;
    loop {
        let is_weekend = matches!(ts.weekday(), Weekday::Sat | Weekday::Sun);
        let time = ts.time();
        if !is_weekend && time >= session.open && time <= last_open {
            return ts;
        }
        if !is_weekend && time < session.open {
            ts = at_time(ts, session.open);
        } else {
            ts = at_time(ts + Duration::days(1), session.open);
        }
    }
}

fn at_time(ts: DateTime<FixedOffset>, time: NaiveTime) -> DateTime<FixedOffset> {
    ts + Duration::seconds(
        i64::from(time.num_seconds_from_midnight()) - i64::from(ts.num_seconds_from_midnight()),
    ) - Duration::nanoseconds(i64::from(ts.nanosecond()))
}
