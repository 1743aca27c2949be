use crate::state::SharedState;
use crate::store::parse_descriptor_map;
use crate::urls::{eval_report_url, eval_url};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Performs one poll/ping fetch: GET with base64 user in the path, or a
/// REPORT with the user JSON as body when `use-report` is set. On success
/// the flag store is replaced wholesale; on 401/403 the dead flag latches.
/// Grounded on `bgfeaturepoller`'s fetch-and-swap in the original client.
pub async fn fetch_and_replace(state: &SharedState) -> edgeflags_core::Result<()> {
    let (config, user) = {
        let config = state.config.read().await;
        let user = state.user.read().await;
        (config.clone(), user.clone())
    };

    let request = if config.use_report {
        let body = crate::encoding::encode_for_body(&user, &config);
        state
            .http
            .request(reqwest::Method::from_bytes(b"REPORT").unwrap(), eval_report_url(&config))
            .header("Content-Type", "application/json")
            .body(body)
    } else {
        state.http.get(eval_url(&config, &user))
    };

    let response = request
        .header("Authorization", config.mobile_key.clone())
        .timeout(Duration::from_millis(config.connection_timeout_ms))
        .send()
        .await?;

    if response.status().as_u16() == 401 || response.status().as_u16() == 403 {
        warn!("authentication rejected by evaluation endpoint; latching dead flag");
        state.set_dead();
        return Err(edgeflags_core::FlagsError::AuthenticationFailed);
    }

    if !response.status().is_success() {
        return Err(edgeflags_core::FlagsError::MalformedPayload(format!(
            "unexpected status {}",
            response.status()
        )));
    }

    let body = response.bytes().await?;
    let map = parse_descriptor_map(&body)?;
    state.store.replace(map).await;
    Ok(())
}

/// The polling worker's sleep/check loop. No-ops whenever streaming is
/// enabled — it exists purely as a fallback for when streaming is off.
pub async fn run(state: Arc<SharedState>, mut shutdown: broadcast::Receiver<()>) {
    loop {
        let interval = state.config.read().await.polling_interval_ms;
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(interval)) => {}
            _ = shutdown.recv() => {
                debug!("polling worker shutting down");
                return;
            }
        }

        if shutdown.try_recv().is_ok() {
            return;
        }

        let (streaming, disabled, offline) = {
            let config = state.config.read().await;
            (
                config.streaming,
                config.disable_background_updating,
                state.is_offline(),
            )
        };

        if streaming || disabled || offline || state.is_dead() {
            continue;
        }

        match fetch_and_replace(&state).await {
            Ok(()) => debug!("poll succeeded"),
            Err(e) if e.is_auth_fatal() => return,
            Err(e) => warn!(error = %e, "poll failed; will retry next tick without backoff"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use edgeflags_core::User;
    use wiremock::matchers::{method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn state_against(server: &MockServer) -> SharedState {
        let config = Config::builder("test-key")
            .app_uri(server.uri())
            .build()
            .unwrap();
        SharedState::new(config, User::new("u"), reqwest::Client::new())
    }

    #[tokio::test]
    async fn successful_poll_replaces_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/msdk/eval/users/.*"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "bugcount": {"value": 10},
                "sort.order": {"value": true},
            })))
            .mount(&server)
            .await;

        let state = state_against(&server).await;
        fetch_and_replace(&state).await.unwrap();

        assert_eq!(state.store.lookup("bugcount").await.unwrap().as_number(), Some(10.0));
        assert_eq!(state.store.lookup("sort.order").await.unwrap().as_bool(), Some(true));
    }

    #[tokio::test]
    async fn auth_failure_sets_dead_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path_regex("^/msdk/eval/users/.*"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let state = state_against(&server).await;
        let result = fetch_and_replace(&state).await;
        assert!(result.is_err());
        assert!(state.is_dead());
    }
}
