//! Data range and integer range descriptors.
//!
//! The sensor service describes measurement ranges and sampling intervals
//! with a compact text notation: `min=>max:resolution`. A single value
//! stands for a degenerate range (`min == max`) and the resolution suffix
//! is optional. Lists are comma-separated.

use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A measurement range with its resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct DataRange {
    pub min: f64,
    pub max: f64,
    pub resolution: f64,
}

impl DataRange {
    pub fn new(min: f64, max: f64, resolution: f64) -> Self {
        Self {
            min,
            max,
            resolution,
        }
    }

    /// Parse one fragment, using `default_resolution` when no `:resolution`
    /// suffix is present.
    pub fn parse_with_resolution(
        input: &str,
        default_resolution: f64,
    ) -> Result<Self, ParseRangeError> {
        let fragment = input.trim();
        if fragment.is_empty() {
            return Err(ParseRangeError::Empty);
        }

        let (bounds, resolution) = match fragment.split_once(':') {
            Some((bounds, res)) => (bounds, parse_number(res)?),
            None => (fragment, default_resolution),
        };

        let parts: Vec<&str> = bounds.split("=>").collect();
        let (min, max) = match parts.as_slice() {
            [single] => {
                let v = parse_number(single)?;
                (v, v)
            }
            [min, max] => (parse_number(min)?, parse_number(max)?),
            _ => return Err(ParseRangeError::Malformed(fragment.to_string())),
        };

        Ok(Self::new(min, max, resolution))
    }
}

impl FromStr for DataRange {
    type Err = ParseRangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_resolution(s, 0.0)
    }
}

impl std::fmt::Display for DataRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if (self.min - self.max).abs() < f64::EPSILON {
            write!(f, "{}:{}", self.min, self.resolution)
        } else {
            write!(f, "{}=>{}:{}", self.min, self.max, self.resolution)
        }
    }
}

/// Inclusive range of unsigned integers (buffer sizes, buffer intervals).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct IntegerRange {
    pub min: u32,
    pub max: u32,
}

impl IntegerRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: u32) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Errors from parsing range notation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseRangeError {
    #[error("empty range")]
    Empty,

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("malformed range: {0}")]
    Malformed(String),
}

fn parse_number(s: &str) -> Result<f64, ParseRangeError> {
    let s = s.trim();
    s.parse::<f64>()
        .map_err(|_| ParseRangeError::InvalidNumber(s.to_string()))
}

/// Parse a comma-separated list of ranges. Malformed fragments are skipped.
pub fn parse_data_range_list(input: &str, default_resolution: f64) -> Vec<DataRange> {
    input
        .split(',')
        .filter(|fragment| !fragment.trim().is_empty())
        .filter_map(|fragment| DataRange::parse_with_resolution(fragment, default_resolution).ok())
        .collect()
}
