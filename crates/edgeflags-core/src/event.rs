use crate::{FlagValue, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An analytics event appended by the evaluation path, drained by the
/// flusher. Lifetime is from append to successful POST, or silent discard
/// on buffer overflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Event {
    Identify {
        user: User,
        timestamp: DateTime<Utc>,
    },
    Feature {
        user: User,
        key: String,
        value: FlagValue,
        default: FlagValue,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn identify(user: User, timestamp: DateTime<Utc>) -> Self {
        Event::Identify { user, timestamp }
    }

    pub fn feature(
        user: User,
        key: impl Into<String>,
        value: FlagValue,
        default: FlagValue,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Event::Feature {
            user,
            key: key.into(),
            value,
            default,
            timestamp,
        }
    }
}
