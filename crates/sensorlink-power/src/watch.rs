//! Adapter from a `tokio::sync::watch` channel.

use tokio::sync::watch;
use tracing::debug;

use crate::error::PowerError;
use crate::{DisplayEvent, DisplaySink, PowerStateSource};

/// Power-state source fed by a `watch::Receiver<bool>`.
///
/// Only changes are forwarded; the value present at subscription time is
/// taken as already known.
pub struct WatchSource {
    name: String,
    rx: Option<watch::Receiver<bool>>,
}

impl WatchSource {
    pub fn new(name: impl Into<String>, rx: watch::Receiver<bool>) -> Self {
        Self {
            name: name.into(),
            rx: Some(rx),
        }
    }
}

impl PowerStateSource for WatchSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&mut self, sink: DisplaySink) -> Result<(), PowerError> {
        let mut rx = self
            .rx
            .take()
            .ok_or_else(|| PowerError::AlreadySubscribed(self.name.clone()))?;
        if rx.has_changed().is_err() {
            return Err(PowerError::Unavailable(self.name.clone()));
        }
        let name = self.name.clone();

        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let active = *rx.borrow_and_update();
                let event = DisplayEvent {
                    source: name.clone(),
                    active,
                };
                if sink.send(event).is_err() {
                    break;
                }
            }
            debug!(source = %name, "power-state watch ended");
        });
        Ok(())
    }
}
