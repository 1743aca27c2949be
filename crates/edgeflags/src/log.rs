use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Numeric levels mirroring `LD_SetLogFunction`'s `userlevel` parameter:
/// lower numbers are more severe, matching syslog-style conventions the
/// original C client follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    fn from_tracing(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            Level::DEBUG => LogLevel::Debug,
            Level::TRACE => LogLevel::Trace,
        }
    }
}

pub type LogSink = Arc<dyn Fn(&str) + Send + Sync>;

/// A `tracing_subscriber::Layer` that forwards formatted messages at or
/// above `min_level` to a caller-supplied sink function, implementing
/// `set-log-sink` from spec §6. Composes with whatever subscriber the
/// embedding application has already installed rather than replacing it.
pub struct SinkLayer {
    min_level: LogLevel,
    sink: LogSink,
}

impl SinkLayer {
    pub fn new(min_level: LogLevel, sink: LogSink) -> Self {
        Self { min_level, sink }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        }
    }
}

impl<S: Subscriber> Layer<S> for SinkLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = LogLevel::from_tracing(event.metadata().level());
        if level > self.min_level {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        (self.sink)(&format!("[{}] {}", event.metadata().target(), visitor.message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing_subscriber::prelude::*;

    #[test]
    fn sink_receives_messages_at_or_above_min_level() {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let captured_clone = Arc::clone(&captured);
        let layer = SinkLayer::new(
            LogLevel::Warn,
            Arc::new(move |msg: &str| captured_clone.lock().unwrap().push(msg.to_string())),
        );

        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
            tracing::warn!("should be captured");
            tracing::debug!("should not be captured");
        });

        let messages = captured.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("should be captured"));
    }
}
