//! Configuration structures for streambar runs.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::PolicyKind;

/// Main configuration for a bar run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// How the tape is decoded.
    pub tape: TapeConfig,
    /// How bars are written.
    pub output: OutputConfig,
    /// Which bars are built.
    pub bars: BarConfig,
}

impl Config {
    /// Parse and validate a configuration from JSON. Missing sections take
    /// their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config = Self::parse_json(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from JSON without validating values, for callers
    /// that override sections before validating the rest.
    pub fn parse_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::config(format!("invalid configuration: {e}")))
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        self.tape.validate()?;
        self.output.validate()?;
        self.bars.validate()
    }
}

fn check_delimiter(name: &str, delimiter: char) -> Result<()> {
    if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' || delimiter == '\r' {
        return Err(Error::config(format!(
            "{name} must be a single ASCII separator, got {delimiter:?}"
        )));
    }
    Ok(())
}

/// Record layout of a tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TapeLayout {
    /// `marker,price,volume,side`
    #[default]
    Sided,
    /// `type,time,price,size` with record types 1 (trade), 2 (bid), 3 (ask).
    /// Trade sides are inferred with the tick rule.
    Tagged,
}

/// Encoding of the marker column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerFormat {
    /// Unsigned integer timestamp or sequence number.
    #[default]
    Integer,
    /// `HH:MM:SS[.ffffff]`, converted to milliseconds since midnight.
    TimeOfDay,
}

/// Tape decoding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TapeConfig {
    /// Record layout.
    pub layout: TapeLayout,
    /// Field separator.
    pub delimiter: char,
    /// Whether the first line is a header to skip.
    pub has_header: bool,
    /// Marker encoding.
    pub marker_format: MarkerFormat,
}

impl TapeConfig {
    pub fn validate(&self) -> Result<()> {
        check_delimiter("tape.delimiter", self.delimiter)
    }
}

impl Default for TapeConfig {
    fn default() -> Self {
        Self {
            layout: TapeLayout::Sided,
            delimiter: ',',
            has_header: true,
            marker_format: MarkerFormat::Integer,
        }
    }
}

/// Bar output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Field separator.
    pub delimiter: char,
    /// Delete the `.partial` staging file when a run fails.
    /// When false it is left in place for inspection.
    pub discard_partial: bool,
}

impl OutputConfig {
    pub fn validate(&self) -> Result<()> {
        check_delimiter("output.delimiter", self.delimiter)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            discard_partial: true,
        }
    }
}

/// Sampling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BarConfig {
    /// Sampling policy.
    pub policy: PolicyKind,
    /// Threshold, in the policy's unit.
    pub size: f64,
}

impl BarConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(Error::config(format!(
                "bars.size must be a positive number, got {}",
                self.size
            )));
        }
        Ok(())
    }
}

impl Default for BarConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::Tick,
            size: 100.0,
        }
    }
}
