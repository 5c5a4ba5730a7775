//! Lazy trade source over a delimited tape.
//!
//! A tape is read one record at a time into a reused buffer, so memory use
//! does not depend on tape length. Two layouts are understood:
//!
//! - `sided`: `marker,price,volume,side`
//! - `tagged`: `type,time,price,size`, where type `1` is a trade and types
//!   `2`/`3` are bid/ask updates (skipped). Sides come from the tick rule.
//!
//! Both expect a header line by default. Markers must be non-decreasing and
//! the tape's total volume must fit in a [`Volume`], which bounds every bar.

use chrono::{NaiveTime, Timelike};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use streambar_core::config::{MarkerFormat, TapeConfig, TapeLayout};
use streambar_core::{Error, Marker, Result, Trade, TradeSide, Volume};
use tracing::{debug, warn};

use crate::classifier::{ClassificationStats, TickRule};

/// Record type tags of the tagged layout.
const RECORD_TRADE: &str = "1";
const RECORD_BID: &str = "2";
const RECORD_ASK: &str = "3";

/// Forward-only reader yielding trades in tape order.
///
/// After the first error the iterator is fused and yields `None`.
pub struct TapeReader<R: io::Read> {
    reader: csv::Reader<R>,
    record: csv::StringRecord,
    /// Tape location, for error messages.
    path: PathBuf,
    layout: TapeLayout,
    marker_format: MarkerFormat,
    /// Side inference for tagged tapes.
    tick_rule: TickRule,
    last_marker: Option<Marker>,
    /// Volume of all trades read so far.
    volume_read: Volume,
    trades_read: u64,
    records_skipped: u64,
    done: bool,
}

impl TapeReader<File> {
    /// Open a tape file.
    ///
    /// Fails with [`Error::Source`] if the file cannot be opened for reading.
    pub fn open(path: impl AsRef<Path>, config: &TapeConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::tape_source(path, e))?;
        if file.metadata().map(|m| m.is_dir()).unwrap_or(false) {
            return Err(Error::tape_source(
                path,
                io::Error::new(io::ErrorKind::InvalidInput, "tape location is a directory"),
            ));
        }
        debug!(path = %path.display(), layout = ?config.layout, "opened tape");
        Ok(Self::with_path(file, path.to_path_buf(), config))
    }
}

impl<R: io::Read> TapeReader<R> {
    /// Read a tape from any byte stream.
    pub fn from_reader(reader: R, config: &TapeConfig) -> Self {
        Self::with_path(reader, PathBuf::from("<stream>"), config)
    }

    fn with_path(reader: R, path: PathBuf, config: &TapeConfig) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(config.has_header)
            .delimiter(config.delimiter as u8)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        Self {
            reader,
            record: csv::StringRecord::new(),
            path,
            layout: config.layout,
            marker_format: config.marker_format,
            tick_rule: TickRule::new(),
            last_marker: None,
            volume_read: 0,
            trades_read: 0,
            records_skipped: 0,
            done: false,
        }
    }

    /// Number of trades yielded so far.
    pub fn trades_read(&self) -> u64 {
        self.trades_read
    }

    /// Number of non-trade records skipped so far (tagged tapes only).
    pub fn records_skipped(&self) -> u64 {
        self.records_skipped
    }

    /// Tick-rule statistics (all zero for sided tapes).
    pub fn classification_stats(&self) -> &ClassificationStats {
        self.tick_rule.stats()
    }

    /// Read the next trade, skipping quote records.
    fn next_trade(&mut self) -> Result<Option<Trade>> {
        loop {
            let more = match self.reader.read_record(&mut self.record) {
                Ok(more) => more,
                Err(e) => return Err(self.read_error(e)),
            };
            if !more {
                debug!(
                    path = %self.path.display(),
                    trades = self.trades_read,
                    skipped = self.records_skipped,
                    unknown_sides = self.tick_rule.stats().unknown_trades,
                    "tape exhausted"
                );
                return Ok(None);
            }

            let line = self.record.position().map_or(0, |p| p.line());
            let trade = match self.layout {
                TapeLayout::Sided => Some(self.decode_sided(line)?),
                TapeLayout::Tagged => self.decode_tagged(line)?,
            };

            if let Some(trade) = trade {
                if let Some(last) = self.last_marker {
                    if trade.marker < last {
                        return Err(Error::parse(
                            line,
                            format!("marker {} precedes previous marker {last}", trade.marker),
                        ));
                    }
                }
                let Some(volume_read) = self.volume_read.checked_add(trade.volume) else {
                    return Err(Error::parse(
                        line,
                        format!("total tape volume exceeds {}", Volume::MAX),
                    ));
                };
                self.volume_read = volume_read;
                self.last_marker = Some(trade.marker);
                self.trades_read += 1;
                return Ok(Some(trade));
            }
        }
    }

    /// Decode `marker,price,volume,side`.
    fn decode_sided(&self, line: u64) -> Result<Trade> {
        let [marker, price, volume, side] = record_fields(&self.record, line)?;
        let side = TradeSide::from_flag(side)
            .ok_or_else(|| Error::parse(line, format!("unrecognized side {side:?}")))?;

        Ok(Trade {
            marker: parse_marker(marker, self.marker_format, line)?,
            price: parse_price(price, line)?,
            volume: parse_volume(volume, line)?,
            side,
        })
    }

    /// Decode `type,time,price,size`; quote records yield `None`.
    fn decode_tagged(&mut self, line: u64) -> Result<Option<Trade>> {
        let [tag, marker, price, volume] = record_fields(&self.record, line)?;
        match tag {
            RECORD_TRADE => {}
            RECORD_BID | RECORD_ASK => {
                self.records_skipped += 1;
                return Ok(None);
            }
            other => {
                warn!(line, record_type = other, "skipping record with unknown type");
                self.records_skipped += 1;
                return Ok(None);
            }
        }

        let marker = parse_marker(marker, self.marker_format, line)?;
        let price = parse_price(price, line)?;
        let volume = parse_volume(volume, line)?;
        let side = self.tick_rule.classify(price);

        Ok(Some(Trade {
            marker,
            price,
            volume,
            side,
        }))
    }

    fn read_error(&self, err: csv::Error) -> Error {
        let line = err.position().map_or(0, |p| p.line());
        let message = err.to_string();
        match err.into_kind() {
            csv::ErrorKind::Io(source) => Error::tape_source(&self.path, source),
            _ => Error::parse(line, message),
        }
    }
}

impl<R: io::Read> Iterator for TapeReader<R> {
    type Item = Result<Trade>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_trade() {
            Ok(Some(trade)) => Some(Ok(trade)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// First four fields of a record.
fn record_fields(record: &csv::StringRecord, line: u64) -> Result<[&str; 4]> {
    match (record.get(0), record.get(1), record.get(2), record.get(3)) {
        (Some(a), Some(b), Some(c), Some(d)) => Ok([a, b, c, d]),
        _ => Err(Error::parse(
            line,
            format!("expected 4 fields, found {}", record.len()),
        )),
    }
}

fn parse_marker(field: &str, format: MarkerFormat, line: u64) -> Result<Marker> {
    match format {
        MarkerFormat::Integer => field
            .parse::<Marker>()
            .map_err(|_| Error::parse(line, format!("invalid marker {field:?}"))),
        MarkerFormat::TimeOfDay => {
            let time = NaiveTime::parse_from_str(field, "%H:%M:%S%.f")
                .map_err(|e| Error::parse(line, format!("invalid time of day {field:?}: {e}")))?;
            // Leap seconds report nanoseconds past 1e9.
            let millis = (time.nanosecond() / 1_000_000).min(999);
            Ok(time.num_seconds_from_midnight() as Marker * 1000 + millis as Marker)
        }
    }
}

fn parse_price(field: &str, line: u64) -> Result<f64> {
    let price: f64 = field
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid price {field:?}")))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(Error::parse(line, format!("price must be positive, got {field}")));
    }
    Ok(price)
}

/// Volumes are whole units; `300.0` is accepted as `300`.
fn parse_volume(field: &str, line: u64) -> Result<Volume> {
    let volume = match field.parse::<Volume>() {
        Ok(volume) => volume,
        Err(_) => match field.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v < Volume::MAX as f64 => {
                v as Volume
            }
            _ => return Err(Error::parse(line, format!("invalid volume {field:?}"))),
        },
    };
    if volume == 0 {
        return Err(Error::parse(line, "volume must be positive"));
    }
    Ok(volume)
}
