use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edgeflags_core::FlagValue;
use std::sync::Arc;

/// A single evaluation, handed to an `AnalyticsHook` in addition to the
/// buffered feature event every variation call already records. Grounded
/// on `loom_flags::analytics::FlagExposure`; purely additive (see
/// SPEC_FULL §4.C) — the mandatory buffer-and-POST path works identically
/// whether or not a hook is installed.
#[derive(Debug, Clone)]
pub struct FlagExposure {
    pub flag_key: String,
    pub value: FlagValue,
    pub default: FlagValue,
    pub user_key: String,
    pub timestamp: DateTime<Utc>,
}

#[async_trait]
pub trait AnalyticsHook: Send + Sync {
    async fn on_flag_evaluated(&self, exposure: FlagExposure);
}

pub type SharedAnalyticsHook = Arc<dyn AnalyticsHook>;

pub struct NoOpAnalyticsHook;

#[async_trait]
impl AnalyticsHook for NoOpAnalyticsHook {
    async fn on_flag_evaluated(&self, _exposure: FlagExposure) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_hook_does_nothing_observable() {
        let hook = NoOpAnalyticsHook;
        hook.on_flag_evaluated(FlagExposure {
            flag_key: "a".to_string(),
            value: FlagValue::Bool(true),
            default: FlagValue::Bool(false),
            user_key: "u".to_string(),
            timestamp: Utc::now(),
        })
        .await;
    }
}
