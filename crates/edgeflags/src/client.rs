use crate::analytics::{AnalyticsHook, FlagExposure, NoOpAnalyticsHook, SharedAnalyticsHook};
use crate::config::Config;
use crate::state::SharedState;
use crate::{flusher, poll, sse};
use edgeflags_core::{FlagValue, User};
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

static SINGLETON: OnceLock<Arc<FlagsClient>> = OnceLock::new();

struct WorkerHandles {
    poll: JoinHandle<()>,
    stream: JoinHandle<()>,
    flush: JoinHandle<()>,
    shutdown: broadcast::Sender<()>,
}

impl Drop for WorkerHandles {
    fn drop(&mut self) {
        self.poll.abort();
        self.stream.abort();
        self.flush.abort();
    }
}

/// The client facade: lifecycle, evaluation entry points, shared state.
/// Grounded on `loom_flags::client::FlagsClient`/`FlagsClientBuilder`;
/// singleton re-init semantics grounded on `LDClientInit`/`LDClientGet`
/// (`pthread_once` + global `theClient` in the original client).
pub struct FlagsClient {
    state: Arc<SharedState>,
    workers: std::sync::Mutex<Option<WorkerHandles>>,
    analytics_hook: SharedAnalyticsHook,
}

impl FlagsClient {
    /// `init(config, user)`: validates config, installs the singleton on
    /// first call, spawns the three background workers once. A subsequent
    /// call replaces config/user and resets the flag store to empty (the
    /// original client always NULLs `allFlags` on re-init) but does not
    /// spawn new workers — they observe the new config on their next turn.
    pub async fn init(config: Config, user: User) -> edgeflags_core::Result<Arc<FlagsClient>> {
        Self::init_with_hook(config, user, Arc::new(NoOpAnalyticsHook)).await
    }

    pub async fn init_with_hook(
        config: Config,
        user: User,
        analytics_hook: SharedAnalyticsHook,
    ) -> edgeflags_core::Result<Arc<FlagsClient>> {
        if let Some(existing) = SINGLETON.get() {
            {
                let mut guard = existing.state.config.write().await;
                *guard = config;
            }
            {
                let mut guard = existing.state.user.write().await;
                *guard = user.clone();
            }
            existing.state.store.replace(Default::default()).await;
            existing.state.events.record_identify(&user);
            return Ok(Arc::clone(existing));
        }

        let http = edgeflags_http::new_client_with_timeout(std::time::Duration::from_millis(
            config.connection_timeout_ms,
        ))
        .map_err(edgeflags_core::FlagsError::Transport)?;

        let state = Arc::new(SharedState::new(config, user.clone(), http));

        let (shutdown_tx, poll_rx) = broadcast::channel(1);
        let stream_rx = shutdown_tx.subscribe();
        let flush_rx = shutdown_tx.subscribe();

        let poll_handle = tokio::spawn(poll::run(Arc::clone(&state), poll_rx));
        let stream_handle = tokio::spawn(sse::run(Arc::clone(&state), stream_rx));
        let flush_handle = tokio::spawn(flusher::run(Arc::clone(&state), flush_rx));

        let client = Arc::new(FlagsClient {
            state,
            workers: std::sync::Mutex::new(Some(WorkerHandles {
                poll: poll_handle,
                stream: stream_handle,
                flush: flush_handle,
                shutdown: shutdown_tx,
            })),
            analytics_hook,
        });

        client.state.events.record_identify(&user);

        match SINGLETON.set(Arc::clone(&client)) {
            Ok(()) => Ok(client),
            Err(_) => Ok(Arc::clone(SINGLETON.get().expect("just failed to set, so it's occupied"))),
        }
    }

    pub fn get() -> Option<Arc<FlagsClient>> {
        SINGLETON.get().cloned()
    }

    pub async fn is_initialized(&self) -> bool {
        !self.state.store.is_empty().await
    }

    pub fn is_offline(&self) -> bool {
        self.state.is_offline()
    }

    pub fn set_offline(&self) {
        self.state.set_offline(true);
    }

    pub fn set_online(&self) {
        self.state.set_offline(false);
    }

    /// Idempotent: signals workers to terminate, joins them, releases
    /// resources. A second call observes `workers` already taken and is a
    /// no-op.
    pub async fn close(&self) {
        self.state.set_closed();
        let mut handles = self.workers.lock().expect("workers mutex poisoned").take();
        if let Some(handles) = &mut handles {
            let _ = handles.shutdown.send(());
            let _ = (&mut handles.poll).await;
            let _ = (&mut handles.stream).await;
            let _ = (&mut handles.flush).await;
        }
    }

    pub async fn bool_variation(&self, key: &str, fallback: bool) -> bool {
        self.variation(key, FlagValue::Bool(fallback))
            .await
            .as_bool()
            .unwrap_or(fallback)
    }

    pub async fn int_variation(&self, key: &str, fallback: i64) -> i64 {
        self.variation(key, FlagValue::Number(fallback as f64))
            .await
            .as_number()
            .map(|n| n as i64)
            .unwrap_or(fallback)
    }

    pub async fn double_variation(&self, key: &str, fallback: f64) -> f64 {
        self.variation(key, FlagValue::Number(fallback))
            .await
            .as_number()
            .unwrap_or(fallback)
    }

    pub async fn string_variation(&self, key: &str, fallback: &str) -> String {
        self.variation(key, FlagValue::String(fallback.to_string()))
            .await
            .as_str()
            .map(|s| s.to_string())
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Buffer-filling variant of `string_variation` for embeddings that
    /// prefer caller-owned memory over an allocation (spec §6). Writes at
    /// most `buf.len() - 1` bytes of the evaluated string followed by a NUL
    /// terminator, truncating on a UTF-8 character boundary rather than
    /// mid-codepoint. Returns the number of bytes written before the NUL
    /// (i.e. the caller can tell truncation occurred when the return value
    /// is less than the full string's byte length).
    pub async fn string_variation_into(&self, key: &str, fallback: &str, buf: &mut [u8]) -> usize {
        let value = self
            .variation(key, FlagValue::String(fallback.to_string()))
            .await;
        let s = value.as_str().unwrap_or(fallback);
        write_truncated_nul_terminated(s, buf)
    }

    /// Acquires the reader lock, looks up `key`, releases the lock, then
    /// enqueues a feature event with the value actually returned — event
    /// enqueue must not happen under the reader lock (spec §4.G).
    async fn variation(&self, key: &str, fallback: FlagValue) -> FlagValue {
        if self.state.is_closed() {
            return fallback;
        }

        let looked_up = self.state.store.lookup(key).await;
        let returned = match looked_up {
            Some(value) if std::mem::discriminant(&value) == std::mem::discriminant(&fallback) => value,
            Some(_) => fallback.clone(),
            None => fallback.clone(),
        };

        let user = self.state.user.read().await.clone();
        self.state
            .events
            .record_feature(&user, key, returned.clone(), fallback.clone());

        self.analytics_hook
            .on_flag_evaluated(FlagExposure {
                flag_key: key.to_string(),
                value: returned.clone(),
                default: fallback,
                user_key: user.key.clone(),
                timestamp: chrono::Utc::now(),
            })
            .await;

        returned
    }
}

/// Copies `s` into `buf`, writing at most `buf.len() - 1` data bytes
/// followed by a NUL, never splitting a multi-byte UTF-8 character.
/// Returns the number of data bytes written (excluding the NUL). A
/// zero-length `buf` writes nothing and returns 0.
fn write_truncated_nul_terminated(s: &str, buf: &mut [u8]) -> usize {
    if buf.is_empty() {
        return 0;
    }
    let max_data = buf.len() - 1;
    let mut n = s.len().min(max_data);
    while n > 0 && !s.is_char_boundary(n) {
        n -= 1;
    }
    buf[..n].copy_from_slice(&s.as_bytes()[..n]);
    buf[n] = 0;
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_ordering_places_error_first() {
        use crate::log::LogLevel;
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Debug);
    }

    /// Testable property #3: a buffer of size N receives at most N-1 bytes
    /// followed by a NUL, regardless of the stored value's length.
    #[test]
    fn string_variation_into_truncates_to_n_minus_one_plus_nul() {
        let long = "a".repeat(50);
        let mut buf = [0xFFu8; 8];
        let written = write_truncated_nul_terminated(&long, &mut buf);
        assert_eq!(written, 7);
        assert_eq!(&buf[..7], b"aaaaaaa");
        assert_eq!(buf[7], 0);
    }

    #[test]
    fn string_variation_into_never_splits_a_utf8_character() {
        // Each 'é' is 2 bytes; a 4-byte buffer can fit at most one before
        // the NUL, so truncating at byte 3 (mid-codepoint) must back off.
        let s = "ééé";
        let mut buf = [0xFFu8; 4];
        let written = write_truncated_nul_terminated(s, &mut buf);
        assert!(std::str::from_utf8(&buf[..written]).is_ok());
        assert_eq!(buf[written], 0);
    }

    #[test]
    fn string_variation_into_short_value_is_untouched() {
        let mut buf = [0xFFu8; 16];
        let written = write_truncated_nul_terminated("hi", &mut buf);
        assert_eq!(written, 2);
        assert_eq!(&buf[..2], b"hi");
        assert_eq!(buf[2], 0);
    }

    #[test]
    fn string_variation_into_zero_length_buffer_writes_nothing() {
        let mut buf: [u8; 0] = [];
        assert_eq!(write_truncated_nul_terminated("hello", &mut buf), 0);
    }
}
