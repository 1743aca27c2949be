use crate::config::Config;
use crate::events::EventBuffer;
use crate::store::FlagStore;
use edgeflags_core::User;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// The mutable state three background workers and every evaluation call
/// share.
///
/// The original C client and the teacher's `FlagsClient` both guard
/// config/user/flag-map/dead-flag/offline with a single lock; here that is
/// split into the primitives Rust's type system makes natural: `config`
/// and `user` behind one `RwLock` (mutated together on re-init), the flag
/// map behind `FlagStore`'s own lock (so a flag swap never blocks a config
/// read and vice versa), and `dead_flag`/`offline` as atomics since both
/// are simple monotonic/toggle flags that never need to be observed
/// consistently with anything else. This does not weaken any invariant in
/// §3/§5: flag-map replacement is still atomic, `dead_flag` is still
/// monotonic, and a reader still never observes a half-updated map.
pub struct SharedState {
    pub config: RwLock<Config>,
    pub user: RwLock<User>,
    pub store: FlagStore,
    pub events: EventBuffer,
    pub http: reqwest::Client,
    dead_flag: AtomicBool,
    offline: AtomicBool,
    closed: AtomicBool,
}

impl SharedState {
    pub fn new(config: Config, user: User, http: reqwest::Client) -> Self {
        let events = EventBuffer::new(config.events_capacity);
        let offline = config.offline;
        Self {
            offline: AtomicBool::new(offline),
            config: RwLock::new(config),
            user: RwLock::new(user),
            store: FlagStore::new(),
            events,
            http,
            dead_flag: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_dead(&self) -> bool {
        self.dead_flag.load(Ordering::Acquire)
    }

    /// Monotonic: once true, stays true for the client's lifetime.
    pub fn set_dead(&self) {
        self.dead_flag.store(true, Ordering::Release);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::Acquire)
    }

    pub fn set_offline(&self, value: bool) {
        self.offline.store(value, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn set_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dead_flag_is_monotonic() {
        let config = Config::builder("k").build().unwrap();
        let state = SharedState::new(config, User::new("u"), reqwest::Client::new());
        assert!(!state.is_dead());
        state.set_dead();
        assert!(state.is_dead());
        // setting again is a no-op, not a reversal
        state.set_dead();
        assert!(state.is_dead());
    }

    #[tokio::test]
    async fn offline_toggles_both_ways() {
        let config = Config::builder("k").build().unwrap();
        let state = SharedState::new(config, User::new("u"), reqwest::Client::new());
        assert!(!state.is_offline());
        state.set_offline(true);
        assert!(state.is_offline());
        state.set_offline(false);
        assert!(!state.is_offline());
    }
}
