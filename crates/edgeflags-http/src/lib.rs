//! Ambient HTTP plumbing: a configured `reqwest::Client` builder and a
//! generic retry-with-backoff helper, in the style of the teacher's
//! `loom-common-http`.

mod client;
mod retry;

pub use client::{builder, new_client, new_client_with_timeout, user_agent};
pub use retry::{calculate_delay, retry, RetryConfig, RetryableError};
