//! The locally recorded error of a session.

use sensorlink_types::SensorErrorKind;
use tracing::debug;

/// Last error recorded by this client.
///
/// Holds at most one error. Every control operation clears it before it
/// starts and every failed completion overwrites it, so the last failure
/// wins. When nothing is recorded locally, readers fall back to asking
/// the service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorState {
    code: SensorErrorKind,
    message: String,
}

impl ErrorState {
    pub fn clear(&mut self) {
        self.code = SensorErrorKind::NoError;
        self.message.clear();
    }

    pub fn set(&mut self, code: SensorErrorKind, message: impl Into<String>) {
        self.code = code;
        self.message = message.into();
        debug!(code = %self.code, message = %self.message, "error recorded");
    }

    pub fn code(&self) -> SensorErrorKind {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a local error outranks the service's view.
    pub fn is_set(&self) -> bool {
        self.code.is_error()
    }
}
