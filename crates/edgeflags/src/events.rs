use crate::config::Config;
use crate::encoding::encode_for_body;
use chrono::Utc;
use edgeflags_core::{Event, FlagValue, User};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Bounded FIFO of pending analytics events. Independent of the client's
/// readers-writer lock — held only for the duration of a push or drain,
/// never across network I/O, matching `loom_flags`'s event-log mutex and
/// the original `LDi_initevents` queue.
pub struct EventBuffer {
    capacity: usize,
    events: Mutex<VecDeque<Event>>,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record_identify(&self, user: &User) {
        self.push(Event::identify(user.clone(), Utc::now()));
    }

    pub fn record_feature(
        &self,
        user: &User,
        flag: impl Into<String>,
        value: FlagValue,
        default: FlagValue,
    ) {
        self.push(Event::feature(user.clone(), flag, value, default, Utc::now()));
    }

    /// Drop-newest overflow policy: once full, newly appended events are
    /// silently discarded rather than evicting the oldest entry.
    fn push(&self, event: Event) {
        let mut guard = self.events.lock().expect("event buffer mutex poisoned");
        if guard.len() >= self.capacity {
            return;
        }
        guard.push_back(event);
    }

    /// Returns the full batch and empties the buffer, or `None` if empty.
    pub fn drain(&self) -> Option<Vec<Event>> {
        let mut guard = self.events.lock().expect("event buffer mutex poisoned");
        if guard.is_empty() {
            return None;
        }
        Some(guard.drain(..).collect())
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("event buffer mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serializes a drained batch to the JSON array body the events endpoint
/// expects. User payloads embedded in each event go through the same
/// redaction as `encode_for_body` so private attributes never leave the
/// process even in analytics events.
pub fn batch_to_json(batch: &[Event], config: &Config) -> Vec<u8> {
    let values: Vec<serde_json::Value> = batch
        .iter()
        .map(|event| event_to_json(event, config))
        .collect();
    serde_json::to_vec(&values).expect("event batch is always serializable")
}

fn event_to_json(event: &Event, config: &Config) -> serde_json::Value {
    let user_json: serde_json::Value =
        serde_json::from_slice(&encode_for_body(user_of(event), config))
            .expect("encode_for_body always produces valid JSON");

    match event {
        Event::Identify { user, timestamp } => serde_json::json!({
            "kind": "identify",
            "key": user.key,
            "user": user_json,
            "creationDate": timestamp.timestamp_millis(),
        }),
        Event::Feature {
            key,
            value,
            default,
            timestamp,
            ..
        } => serde_json::json!({
            "kind": "feature",
            "key": key,
            "user": user_json,
            "value": value,
            "default": default,
            "creationDate": timestamp.timestamp_millis(),
        }),
    }
}

fn user_of(event: &Event) -> &User {
    match event {
        Event::Identify { user, .. } => user,
        Event::Feature { user, .. } => user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_returns_none_when_empty() {
        let buf = EventBuffer::new(10);
        assert!(buf.drain().is_none());
    }

    #[test]
    fn overflow_drops_newest_not_oldest() {
        let buf = EventBuffer::new(2);
        let user = User::new("u");
        buf.record_feature(&user, "a", FlagValue::Bool(true), FlagValue::Bool(false));
        buf.record_feature(&user, "b", FlagValue::Bool(true), FlagValue::Bool(false));
        buf.record_feature(&user, "c", FlagValue::Bool(true), FlagValue::Bool(false));

        let batch = buf.drain().unwrap();
        assert_eq!(batch.len(), 2);
        match &batch[0] {
            Event::Feature { key, .. } => assert_eq!(key, "a"),
            _ => panic!("expected feature event"),
        }
        match &batch[1] {
            Event::Feature { key, .. } => assert_eq!(key, "b"),
            _ => panic!("expected feature event"),
        }
    }

    #[test]
    fn drain_empties_the_buffer() {
        let buf = EventBuffer::new(10);
        buf.record_identify(&User::new("u"));
        assert!(buf.drain().is_some());
        assert!(buf.drain().is_none());
    }

    #[test]
    fn scenario_s5_capacity_three() {
        let buf = EventBuffer::new(3);
        let user = User::new("u");
        for i in 0..5 {
            buf.record_feature(
                &user,
                format!("flag-{i}"),
                FlagValue::Bool(true),
                FlagValue::Bool(false),
            );
        }
        let batch = buf.drain().unwrap();
        assert_eq!(batch.len(), 3);
        assert!(buf.drain().is_none());
    }
}
