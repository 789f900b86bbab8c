//! Values carried as control-request arguments and replies.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::range::{DataRange, IntegerRange};

/// A single argument or reply value on the control channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum ControlValue {
    /// Reply of a method with no return value.
    #[default]
    Unit,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Text(String),
    DataRange(DataRange),
    DataRanges(Vec<DataRange>),
    IntegerRanges(Vec<IntegerRange>),
}

impl ControlValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Signed view. Unsigned values that fit are accepted.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Unsigned view. Non-negative signed values and booleans are accepted.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u32::try_from(*v).ok(),
            Self::Bool(b) => Some(u32::from(*b)),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_data_range(self) -> Option<DataRange> {
        match self {
            Self::DataRange(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_data_ranges(self) -> Option<Vec<DataRange>> {
        match self {
            Self::DataRanges(list) => Some(list),
            _ => None,
        }
    }

    pub fn into_integer_ranges(self) -> Option<Vec<IntegerRange>> {
        match self {
            Self::IntegerRanges(list) => Some(list),
            _ => None,
        }
    }
}

impl From<bool> for ControlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for ControlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for ControlValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<String> for ControlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for ControlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<DataRange> for ControlValue {
    fn from(v: DataRange) -> Self {
        Self::DataRange(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_views_coerce() {
        assert_eq!(ControlValue::UInt(5).as_i32(), Some(5));
        assert_eq!(ControlValue::UInt(u32::MAX).as_i32(), None);
        assert_eq!(ControlValue::Int(-1).as_u32(), None);
        assert_eq!(ControlValue::Bool(true).as_u32(), Some(1));
        assert_eq!(ControlValue::Text("x".into()).as_u32(), None);
    }

    #[test]
    fn typed_extractors_reject_other_variants() {
        assert_eq!(ControlValue::Unit.into_text(), None);
        assert_eq!(
            ControlValue::from("accelerometer").into_text().as_deref(),
            Some("accelerometer")
        );
        assert!(ControlValue::Bool(true).into_data_ranges().is_none());
    }
}
