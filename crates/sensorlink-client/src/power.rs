//! Display power-state gating.

use sensorlink_power::{DisplayEvent, PowerError, PowerStateSource};
use tokio::sync::mpsc;
use tracing::debug;

/// What a display change asks of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    Start,
    Stop,
}

/// Collects display events from every attached source.
///
/// Sources are identified by name and attaching the same name twice is a
/// no-op, so a client never reacts to one signal more than once.
pub struct PowerStateGate {
    sources: Vec<Box<dyn PowerStateSource>>,
    events_tx: mpsc::UnboundedSender<DisplayEvent>,
    events_rx: mpsc::UnboundedReceiver<DisplayEvent>,
}

impl Default for PowerStateGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerStateGate {
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            sources: Vec::new(),
            events_tx,
            events_rx,
        }
    }

    /// Subscribe to `source`. Returns false if a source with the same name
    /// is already attached.
    pub fn attach(&mut self, mut source: Box<dyn PowerStateSource>) -> Result<bool, PowerError> {
        if self.sources.iter().any(|s| s.name() == source.name()) {
            debug!(source = source.name(), "power source already attached");
            return Ok(false);
        }
        source.subscribe(self.events_tx.clone())?;
        debug!(source = source.name(), "power source attached");
        self.sources.push(source);
        Ok(true)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Next display event from any source.
    pub async fn next_event(&mut self) -> Option<DisplayEvent> {
        self.events_rx.recv().await
    }

    pub fn try_next_event(&mut self) -> Option<DisplayEvent> {
        self.events_rx.try_recv().ok()
    }

    /// Map a display change to a session action.
    ///
    /// With standby override set the session ignores the display entirely.
    pub fn decide(display_active: bool, standby_override: bool) -> Option<GateAction> {
        match (display_active, standby_override) {
            (_, true) => None,
            (true, false) => Some(GateAction::Start),
            (false, false) => Some(GateAction::Stop),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensorlink_power::mock::ManualPowerSource;

    #[test]
    fn override_suppresses_both_directions() {
        assert_eq!(PowerStateGate::decide(true, true), None);
        assert_eq!(PowerStateGate::decide(false, true), None);
        assert_eq!(PowerStateGate::decide(true, false), Some(GateAction::Start));
        assert_eq!(PowerStateGate::decide(false, false), Some(GateAction::Stop));
    }

    #[tokio::test]
    async fn duplicate_source_is_subscribed_once() {
        let mut gate = PowerStateGate::new();
        let (first, handle) = ManualPowerSource::new("mce");
        let (second, _) = ManualPowerSource::new("mce");

        assert!(gate.attach(Box::new(first)).unwrap());
        assert!(!gate.attach(Box::new(second)).unwrap());
        assert_eq!(gate.source_count(), 1);
        assert_eq!(handle.subscriptions(), 1);

        handle.set_display(false);
        let event = gate.next_event().await.unwrap();
        assert_eq!(event.source, "mce");
        assert!(!event.active);
        assert!(gate.try_next_event().is_none());
    }
}
