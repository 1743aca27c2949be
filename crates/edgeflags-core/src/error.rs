use thiserror::Error;

/// Errors the SDK surfaces to a caller. Internal workers never propagate
/// these past their own loop — they log and continue, per the propagation
/// policy — but `init` and the few synchronous setup calls do return them.
#[derive(Debug, Error)]
pub enum FlagsError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication failed (401/403); client is now latched offline")]
    AuthenticationFailed,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("client has been closed")]
    Closed,

    #[error("type mismatch: flag held {actual}, caller expected {expected}")]
    TypeMismatch { expected: &'static str, actual: &'static str },
}

impl FlagsError {
    /// Transport-layer failures and 5xx/408/429 responses are retryable;
    /// 401/403 are not (they are authentication-fatal) and neither is a
    /// malformed payload (retrying won't fix a parse error).
    pub fn is_retryable(&self) -> bool {
        match self {
            FlagsError::Transport(e) => {
                e.is_timeout() || e.is_connect() || matches!(e.status().map(|s| s.as_u16()), Some(408 | 429 | 500 | 502 | 503 | 504))
            }
            _ => false,
        }
    }

    pub fn is_auth_fatal(&self) -> bool {
        matches!(self, FlagsError::AuthenticationFailed)
            || matches!(self, FlagsError::Transport(e) if matches!(e.status().map(|s| s.as_u16()), Some(401 | 403)))
    }
}

pub type Result<T> = std::result::Result<T, FlagsError>;
