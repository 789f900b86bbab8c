//! Manually driven power-state source for testing.

use std::sync::{Arc, Mutex};

use crate::error::PowerError;
use crate::{DisplayEvent, DisplaySink, PowerStateSource};

#[derive(Debug, Default)]
struct ManualState {
    sinks: Vec<DisplaySink>,
}

/// Power-state source whose events are raised by the test.
pub struct ManualPowerSource {
    name: String,
    state: Arc<Mutex<ManualState>>,
}

impl ManualPowerSource {
    /// Create a new source and a handle for raising display events.
    pub fn new(name: impl Into<String>) -> (Self, ManualPowerHandle) {
        let name = name.into();
        let state = Arc::new(Mutex::new(ManualState::default()));
        let handle = ManualPowerHandle {
            name: name.clone(),
            state: Arc::clone(&state),
        };
        (Self { name, state }, handle)
    }
}

/// Clonable handle for driving a [`ManualPowerSource`].
#[derive(Clone)]
pub struct ManualPowerHandle {
    name: String,
    state: Arc<Mutex<ManualState>>,
}

impl ManualPowerHandle {
    /// Deliver a display-state change to every subscriber.
    pub fn set_display(&self, active: bool) {
        let state = self.state.lock().unwrap();
        for sink in &state.sinks {
            let _ = sink.send(DisplayEvent {
                source: self.name.clone(),
                active,
            });
        }
    }

    /// How many times the source has been subscribed.
    pub fn subscriptions(&self) -> usize {
        self.state.lock().unwrap().sinks.len()
    }
}

impl PowerStateSource for ManualPowerSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn subscribe(&mut self, sink: DisplaySink) -> Result<(), PowerError> {
        self.state.lock().unwrap().sinks.push(sink);
        Ok(())
    }
}
