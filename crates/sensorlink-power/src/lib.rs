//! Display/power-state sources for sensorlink.
//!
//! Defines the [`PowerStateSource`] trait for anything that can report
//! whether the display is active. Sources push [`DisplayEvent`]s into the
//! sink they are subscribed with; the sensor client decides what to do
//! with them. A [`WatchSource`] adapter is provided for hosts that already
//! track display state in a `tokio::sync::watch` channel.

use tokio::sync::mpsc;

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod watch;

pub use error::PowerError;
pub use watch::WatchSource;

/// A change of display state reported by a named source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayEvent {
    pub source: String,
    pub active: bool,
}

/// Where sources deliver their events.
pub type DisplaySink = mpsc::UnboundedSender<DisplayEvent>;

/// A provider of display-active notifications.
pub trait PowerStateSource: Send + 'static {
    /// Stable name; two sources with the same name are the same signal.
    fn name(&self) -> &str;

    /// Begin delivering events into `sink`.
    fn subscribe(&mut self, sink: DisplaySink) -> Result<(), PowerError>;
}
