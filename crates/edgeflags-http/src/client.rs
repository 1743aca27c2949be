use std::time::Duration;

const DEFAULT_USER_AGENT: &str = concat!("edgeflags-rust/", env!("CARGO_PKG_VERSION"));

/// The default `User-Agent` sent with every request, in lieu of the
/// teacher's build-time git-SHA stamping (`loom_common_version::BuildInfo`)
/// which this workspace has no release pipeline to produce.
pub fn user_agent() -> &'static str {
    DEFAULT_USER_AGENT
}

/// A `reqwest::ClientBuilder` pre-populated with the SDK's user agent.
pub fn builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder().user_agent(user_agent())
}

pub fn new_client() -> reqwest::Result<reqwest::Client> {
    builder().build()
}

pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    builder().timeout(timeout).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_contains_crate_name() {
        assert!(user_agent().starts_with("edgeflags-rust/"));
    }

    #[test]
    fn builder_produces_a_client() {
        assert!(new_client().is_ok());
    }
}
