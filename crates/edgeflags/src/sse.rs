use crate::poll::fetch_and_replace;
use crate::state::SharedState;
use crate::store::{parse_descriptor_map, parse_patch};
use crate::urls::stream_url;
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

/// Fixed reconnect delay used by the streaming worker on any disconnect.
/// The original client leaves a `// need some better backoff logic here`
/// comment and never implements one; this reimplementation keeps the
/// fixed delay deliberately (see spec §4.E) rather than inventing backoff
/// behavior the spec does not ask for.
const RECONNECT_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, PartialEq, Eq)]
enum DispatchedEvent {
    Put(String),
    Patch(String),
    Ping,
}

/// The hand-rolled SSE line parser described in spec §4.E. Tracks whether
/// it is waiting for the `event:` line that opens a new event, and the
/// event type once seen. One `data:` line completes and dispatches the
/// event. A malformed `event:`/`data:` line aborts the connection,
/// matching `streamcallback`'s `return 1` behavior in the original client.
struct LineParser {
    want_new_event: bool,
    event_type: String,
}

impl LineParser {
    fn new() -> Self {
        Self {
            want_new_event: true,
            event_type: String::new(),
        }
    }

    /// Feeds one line (no trailing newline). Returns `Ok(Some(event))` when
    /// a complete event was dispatched, `Ok(None)` when more lines are
    /// needed, and `Err` when the line violates the parser's grammar.
    fn feed(&mut self, line: &str) -> Result<Option<DispatchedEvent>, String> {
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.starts_with(':') {
            trace!(comment = line, "sse comment line");
            return Ok(None);
        }

        if self.want_new_event {
            if line.is_empty() {
                // A blank line while idle between events is not itself an
                // error; tolerate it rather than treating it as malformed.
                return Ok(None);
            }
            if let Some(rest) = line.strip_prefix("event:") {
                if rest.is_empty() {
                    return Err(format!("malformed event line: {line:?}"));
                }
                self.event_type = rest.to_string();
                self.want_new_event = false;
                return Ok(None);
            }
            if line.starts_with("id:") || line.starts_with("retry:") {
                // Tolerated per spec §9's recommended improvement over the
                // original's stricter grammar.
                return Ok(None);
            }
            return Err(format!("expected `event:` line, got: {line:?}"));
        }

        if line.is_empty() {
            self.want_new_event = true;
            return Ok(None);
        }

        if line.starts_with("id:") || line.starts_with("retry:") {
            return Ok(None);
        }

        let Some(payload) = line.strip_prefix("data:") else {
            return Err(format!("expected `data:` line, got: {line:?}"));
        };

        let event = match self.event_type.as_str() {
            "put" => DispatchedEvent::Put(payload.to_string()),
            "patch" => DispatchedEvent::Patch(payload.to_string()),
            "ping" => DispatchedEvent::Ping,
            other => return Err(format!("unknown event type: {other:?}")),
        };
        Ok(Some(event))
    }
}

async fn apply_event(state: &SharedState, event: DispatchedEvent) -> edgeflags_core::Result<()> {
    match event {
        DispatchedEvent::Put(payload) => {
            let map = parse_descriptor_map(payload.as_bytes())?;
            state.store.replace(map).await;
            Ok(())
        }
        DispatchedEvent::Patch(payload) => {
            let delta = parse_patch(payload.as_bytes())?;
            state.store.patch(delta).await;
            Ok(())
        }
        DispatchedEvent::Ping => fetch_and_replace(state).await,
    }
}

/// Splits a byte stream into LF-terminated lines, buffering partial lines
/// across chunk boundaries. This is the one piece of "transport" this
/// core still owns (see SPEC_FULL §4.E) since `reqwest` hands back chunks,
/// not lines.
async fn connect_and_process(state: &SharedState) -> edgeflags_core::Result<()> {
    let (config, user) = {
        let config = state.config.read().await;
        let user = state.user.read().await;
        (config.clone(), user.clone())
    };

    let response = state
        .http
        .get(stream_url(&config, &user))
        .header("Authorization", config.mobile_key.clone())
        .header("Accept", "text/event-stream")
        .send()
        .await?;

    if response.status().as_u16() == 401 || response.status().as_u16() == 403 {
        warn!("authentication rejected by streaming endpoint; latching dead flag");
        state.set_dead();
        return Err(edgeflags_core::FlagsError::AuthenticationFailed);
    }

    if !response.status().is_success() {
        return Err(edgeflags_core::FlagsError::MalformedPayload(format!(
            "unexpected stream status {}",
            response.status()
        )));
    }

    let mut parser = LineParser::new();
    let mut buf = BytesMut::new();
    let mut bytes_stream = response.bytes_stream();

    while let Some(chunk) = bytes_stream.next().await {
        let chunk = chunk?;
        buf.extend_from_slice(&chunk);

        while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            let line_bytes = buf.split_to(pos);
            buf.advance(1); // drop the newline itself
            let line = String::from_utf8_lossy(&line_bytes).to_string();

            match parser.feed(&line) {
                Ok(Some(event)) => {
                    if let Err(e) = apply_event(state, event).await {
                        if e.is_auth_fatal() {
                            return Err(e);
                        }
                        warn!(error = %e, "malformed stream payload; dropping event");
                    }
                }
                Ok(None) => {}
                Err(reason) => {
                    warn!(reason, "malformed sse line; aborting connection");
                    return Err(edgeflags_core::FlagsError::MalformedPayload(reason));
                }
            }

            if state.is_dead() {
                return Ok(());
            }
        }
    }

    Ok(())
}

/// The streaming worker's connect/process/reconnect loop.
pub async fn run(state: Arc<SharedState>, mut shutdown: broadcast::Receiver<()>) {
    loop {
        if shutdown.try_recv().is_ok() {
            debug!("streaming worker shutting down");
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

        if !streaming || disabled || offline || state.is_dead() {
            tokio::select! {
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
                _ = shutdown.recv() => return,
            }
            continue;
        }

        if let Err(e) = connect_and_process(&state).await {
            if e.is_auth_fatal() {
                return;
            }
            warn!(error = %e, "sse connection ended; reconnecting after fixed delay");
        }

        tokio::select! {
            _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            _ = shutdown.recv() => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_put_event() {
        let mut parser = LineParser::new();
        assert_eq!(parser.feed("event:put").unwrap(), None);
        let event = parser
            .feed(r#"data:{"a":{"value":1}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event, DispatchedEvent::Put(r#"{"a":{"value":1}}"#.to_string()));
    }

    #[test]
    fn comment_lines_are_ignored_anywhere() {
        let mut parser = LineParser::new();
        assert_eq!(parser.feed(":hello").unwrap(), None);
        assert_eq!(parser.feed("event:put").unwrap(), None);
        assert_eq!(parser.feed(":another comment").unwrap(), None);
        let event = parser.feed(r#"data:{"a":{"value":1}}"#).unwrap().unwrap();
        assert_eq!(event, DispatchedEvent::Put(r#"{"a":{"value":1}}"#.to_string()));
    }

    #[test]
    fn blank_line_ends_event_and_starts_a_new_one() {
        let mut parser = LineParser::new();
        parser.feed("event:put").unwrap();
        parser.feed(r#"data:{"a":{"value":1}}"#).unwrap();
        assert_eq!(parser.feed("").unwrap(), None);
        assert!(parser.want_new_event);
    }

    #[test]
    fn malformed_event_line_is_rejected() {
        let mut parser = LineParser::new();
        assert!(parser.feed("not-an-event-line").is_err());
    }

    #[test]
    fn data_without_event_type_first_is_rejected() {
        let mut parser = LineParser::new();
        assert!(parser.feed("data:{}").is_err());
    }

    #[test]
    fn id_and_retry_lines_are_tolerated() {
        let mut parser = LineParser::new();
        parser.feed("event:put").unwrap();
        assert_eq!(parser.feed("id:123").unwrap(), None);
        assert_eq!(parser.feed("retry:3000").unwrap(), None);
        let event = parser.feed(r#"data:{"a":{"value":1}}"#).unwrap().unwrap();
        assert_eq!(event, DispatchedEvent::Put(r#"{"a":{"value":1}}"#.to_string()));
    }

    #[test]
    fn ping_event_carries_no_payload_meaning() {
        let mut parser = LineParser::new();
        parser.feed("event:ping").unwrap();
        let event = parser.feed("data:").unwrap().unwrap();
        assert_eq!(event, DispatchedEvent::Ping);
    }
}
