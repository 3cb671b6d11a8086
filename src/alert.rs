//! Alert sinks.
//!
//! Fire-and-forget: the controller calls `notify` once per alerting cycle and never
//! waits for, retries, or inspects the outcome.

use std::io::Write;

use crate::event_log::SessionEvent;

pub trait AlertSink: Send {
    fn notify(&mut self, event: &SessionEvent);
}

/// Rings the terminal bell on stderr.
#[derive(Default)]
pub struct TerminalBell;

impl AlertSink for TerminalBell {
    fn notify(&mut self, _event: &SessionEvent) {
        let mut stderr = std::io::stderr();
        let _ = stderr.write_all(b"\x07").and_then(|_| stderr.flush());
    }
}

/// Emits a warning through the `log` facade.
#[derive(Default)]
pub struct LogAlert;

impl AlertSink for LogAlert {
    fn notify(&mut self, event: &SessionEvent) {
        log::warn!("ALERT: {} at {}", event.label(), event.clock_time());
    }
}

/// Fans one alert out to several sinks.
#[derive(Default)]
pub struct AlertFanout {
    sinks: Vec<Box<dyn AlertSink>>,
}

impl AlertFanout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl AlertSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl AlertSink for AlertFanout {
    fn notify(&mut self, event: &SessionEvent) {
        for sink in &mut self.sinks {
            sink.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counter(Arc<AtomicUsize>);

    impl AlertSink for Counter {
        fn notify(&mut self, _event: &SessionEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn fanout_notifies_every_sink() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut fanout = AlertFanout::new()
            .with(Counter(Arc::clone(&hits)))
            .with(Counter(Arc::clone(&hits)))
            .with(LogAlert);
        assert_eq!(fanout.len(), 3);

        fanout.notify(&SessionEvent::now(true));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
