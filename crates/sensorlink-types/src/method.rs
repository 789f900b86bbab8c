//! Remote methods understood by the sensor service.

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::value::ControlValue;

/// A remote method on a sensor channel or on the sensor manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum Method {
    // Session control
    Start,
    Stop,
    SetInterval,
    SetBufferInterval,
    SetBufferSize,
    SetStandbyOverride,
    SetDownsampling,
    SetDataRangeIndex,
    RequestDataRange,
    RemoveDataRangeRequest,

    // Property reads
    Interval,
    BufferInterval,
    BufferSize,
    StandbyOverride,
    Downsampling,
    Description,
    Id,
    Type,
    HwBuffering,
    ErrorCodeInt,
    ErrorString,
    GetAvailableDataRanges,
    GetCurrentDataRange,
    GetAvailableIntervals,
    GetAvailableBufferIntervals,
    GetAvailableBufferSizes,

    // Sensor manager
    LoadPlugin,
    RequestSensor,
    ReleaseSensor,
}

impl Method {
    /// Name of the method as exported by the service.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::SetInterval => "setInterval",
            Self::SetBufferInterval => "setBufferInterval",
            Self::SetBufferSize => "setBufferSize",
            Self::SetStandbyOverride => "setStandbyOverride",
            Self::SetDownsampling => "setDownsampling",
            Self::SetDataRangeIndex => "setDataRangeIndex",
            Self::RequestDataRange => "requestDataRange",
            Self::RemoveDataRangeRequest => "removeDataRangeRequest",
            Self::Interval => "interval",
            Self::BufferInterval => "bufferInterval",
            Self::BufferSize => "bufferSize",
            Self::StandbyOverride => "standbyOverride",
            Self::Downsampling => "downsampling",
            Self::Description => "description",
            Self::Id => "id",
            Self::Type => "type",
            Self::HwBuffering => "hwBuffering",
            Self::ErrorCodeInt => "errorCodeInt",
            Self::ErrorString => "errorString",
            Self::GetAvailableDataRanges => "getAvailableDataRanges",
            Self::GetCurrentDataRange => "getCurrentDataRange",
            Self::GetAvailableIntervals => "getAvailableIntervals",
            Self::GetAvailableBufferIntervals => "getAvailableBufferIntervals",
            Self::GetAvailableBufferSizes => "getAvailableBufferSizes",
            Self::LoadPlugin => "loadPlugin",
            Self::RequestSensor => "requestSensor",
            Self::ReleaseSensor => "releaseSensor",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A method together with its arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct MethodCall {
    pub method: Method,
    pub args: Vec<ControlValue>,
}

impl MethodCall {
    pub fn new(method: Method, args: Vec<ControlValue>) -> Self {
        Self { method, args }
    }

    /// A call without arguments.
    pub fn bare(method: Method) -> Self {
        Self::new(method, Vec::new())
    }
}

impl std::fmt::Display for MethodCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.method)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg:?}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_camel_case() {
        assert_eq!(Method::SetBufferInterval.as_str(), "setBufferInterval");
        assert_eq!(Method::ErrorCodeInt.to_string(), "errorCodeInt");
    }

    #[test]
    fn call_display_lists_args() {
        let call = MethodCall::new(Method::SetInterval, vec![ControlValue::Int(7), ControlValue::Int(100)]);
        assert_eq!(call.to_string(), "setInterval(Int(7), Int(100))");
        assert_eq!(MethodCall::bare(Method::Id).to_string(), "id()");
    }
}
