use crate::events::batch_to_json;
use crate::state::SharedState;
use crate::urls::events_url;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

const MAX_BACKOFF_MS: u64 = 3_600_000;

/// `delay_ms = min(3_600_000, 1000 * 2^(retries-1))`, full jitter applied
/// on top. Resolves the open question in spec §9/DESIGN.md: the original
/// client's `1000 * pow(2, retries - 2)` truncates to zero for
/// `retries <= 1` and is replaced here with an explicit, always-positive
/// schedule starting at `retries == 1`.
fn backoff_delay_ms(retries: u32, rng: &mut dyn rand::RngCore) -> u64 {
    debug_assert!(retries >= 1);
    let base = 1000u64.saturating_mul(1u64 << (retries - 1).min(62));
    let capped = base.min(MAX_BACKOFF_MS);
    rng.gen_range(0..=capped)
}

/// The event flusher's sleep/drain/POST/backoff loop, grounded on
/// `bgeventsender` in the original client.
pub async fn run(state: Arc<SharedState>, mut shutdown: broadcast::Receiver<()>) {
    let mut rng = rand::thread_rng();
    loop {
        let interval = state.config.read().await.events_flush_interval_ms;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(interval)) => {}
            _ = shutdown.recv() => {
                debug!("event flusher shutting down");
                return;
            }
        }

        if shutdown.try_recv().is_ok() {
            return;
        }

        let Some(batch) = state.events.drain() else {
            continue;
        };

        if state.is_dead() || state.is_offline() {
            debug!("discarding drained batch: client is dead or offline");
            continue;
        }

        let mut retries: u32 = 0;
        loop {
            let config = state.config.read().await.clone();
            let body = batch_to_json(&batch, &config);

            let result = state
                .http
                .post(events_url(&config))
                .header("Authorization", config.mobile_key.clone())
                .header("Content-Type", "application/json")
                .body(body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().as_u16() == 401 || response.status().as_u16() == 403 => {
                    warn!("authentication rejected by events endpoint; latching dead flag");
                    state.set_dead();
                    break;
                }
                Ok(_) => {
                    debug!(retries, "event batch flushed");
                    break;
                }
                Err(e) => {
                    retries += 1;
                    let delay_ms = backoff_delay_ms(retries, &mut rng);
                    warn!(error = %e, retries, delay_ms, "transport failure flushing events; backing off");
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                        _ = shutdown.recv() => return,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn delay_never_exceeds_one_hour() {
        let mut rng = StepRng::new(u64::MAX, 1);
        for retries in 1..40 {
            let delay = backoff_delay_ms(retries, &mut rng);
            assert!(delay <= MAX_BACKOFF_MS);
        }
    }

    #[test]
    fn delay_is_zero_jitter_deterministic_with_zero_rng() {
        let mut rng = StepRng::new(0, 0);
        assert_eq!(backoff_delay_ms(1, &mut rng), 0);
    }

    #[test]
    fn delay_grows_with_retry_count_at_max_jitter() {
        let mut rng = StepRng::new(u64::MAX, 1);
        let first = backoff_delay_ms(1, &mut rng);
        let second = backoff_delay_ms(2, &mut rng);
        assert!(second >= first);
    }
}
