use std::collections::HashSet;

/// Immutable-after-`init` configuration, grounded on `LDConfig_i` in
/// `ldapi.h`. Field defaults match `LDConfigNew` in the original C client.
#[derive(Debug, Clone)]
pub struct Config {
    pub mobile_key: String,
    pub app_uri: String,
    pub events_uri: String,
    pub stream_uri: String,
    pub streaming: bool,
    pub polling_interval_ms: u64,
    pub events_flush_interval_ms: u64,
    pub events_capacity: usize,
    pub connection_timeout_ms: u64,
    pub offline: bool,
    pub use_report: bool,
    pub all_attributes_private: bool,
    pub private_attribute_names: HashSet<String>,
    pub disable_background_updating: bool,
    /// Parsed and validated but never consulted — see DESIGN.md open
    /// question on background-polling-interval-ms.
    pub background_polling_interval_ms: u64,
}

impl Config {
    pub fn builder(mobile_key: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(mobile_key)
    }
}

/// Builder with the same defaults as `LDConfigNew`.
pub struct ConfigBuilder {
    mobile_key: String,
    app_uri: String,
    events_uri: String,
    stream_uri: String,
    streaming: bool,
    polling_interval_ms: u64,
    events_flush_interval_ms: u64,
    events_capacity: usize,
    connection_timeout_ms: u64,
    offline: bool,
    use_report: bool,
    all_attributes_private: bool,
    private_attribute_names: HashSet<String>,
    disable_background_updating: bool,
    background_polling_interval_ms: u64,
}

impl ConfigBuilder {
    pub fn new(mobile_key: impl Into<String>) -> Self {
        Self {
            mobile_key: mobile_key.into(),
            app_uri: "https://app.launchdarkly.com".to_string(),
            events_uri: "https://mobile.launchdarkly.com".to_string(),
            stream_uri: "https://clientstream.launchdarkly.com".to_string(),
            streaming: true,
            polling_interval_ms: 300_000,
            events_flush_interval_ms: 30_000,
            events_capacity: 100,
            connection_timeout_ms: 10_000,
            offline: false,
            use_report: false,
            all_attributes_private: false,
            private_attribute_names: HashSet::new(),
            disable_background_updating: false,
            background_polling_interval_ms: 3_600_000,
        }
    }

    pub fn app_uri(mut self, v: impl Into<String>) -> Self {
        self.app_uri = v.into();
        self
    }

    pub fn events_uri(mut self, v: impl Into<String>) -> Self {
        self.events_uri = v.into();
        self
    }

    pub fn stream_uri(mut self, v: impl Into<String>) -> Self {
        self.stream_uri = v.into();
        self
    }

    pub fn streaming(mut self, v: bool) -> Self {
        self.streaming = v;
        self
    }

    pub fn polling_interval_ms(mut self, v: u64) -> Self {
        self.polling_interval_ms = v;
        self
    }

    pub fn events_flush_interval_ms(mut self, v: u64) -> Self {
        self.events_flush_interval_ms = v;
        self
    }

    pub fn events_capacity(mut self, v: usize) -> Self {
        self.events_capacity = v;
        self
    }

    pub fn connection_timeout_ms(mut self, v: u64) -> Self {
        self.connection_timeout_ms = v;
        self
    }

    pub fn offline(mut self, v: bool) -> Self {
        self.offline = v;
        self
    }

    pub fn use_report(mut self, v: bool) -> Self {
        self.use_report = v;
        self
    }

    pub fn all_attributes_private(mut self, v: bool) -> Self {
        self.all_attributes_private = v;
        self
    }

    pub fn private_attribute_names(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.private_attribute_names = names.into_iter().collect();
        self
    }

    pub fn disable_background_updating(mut self, v: bool) -> Self {
        self.disable_background_updating = v;
        self
    }

    pub fn background_polling_interval_ms(mut self, v: u64) -> Self {
        self.background_polling_interval_ms = v;
        self
    }

    pub fn build(self) -> edgeflags_core::Result<Config> {
        if self.mobile_key.trim().is_empty() {
            return Err(edgeflags_core::FlagsError::InvalidConfig(
                "mobile-key must not be empty".to_string(),
            ));
        }
        if self.polling_interval_ms == 0 {
            return Err(edgeflags_core::FlagsError::InvalidConfig(
                "polling-interval-ms must be non-zero".to_string(),
            ));
        }
        if self.events_flush_interval_ms == 0 {
            return Err(edgeflags_core::FlagsError::InvalidConfig(
                "events-flush-interval-ms must be non-zero".to_string(),
            ));
        }
        if self.events_capacity == 0 {
            return Err(edgeflags_core::FlagsError::InvalidConfig(
                "events-capacity must be non-zero".to_string(),
            ));
        }

        Ok(Config {
            mobile_key: self.mobile_key,
            app_uri: self.app_uri,
            events_uri: self.events_uri,
            stream_uri: self.stream_uri,
            streaming: self.streaming,
            polling_interval_ms: self.polling_interval_ms,
            events_flush_interval_ms: self.events_flush_interval_ms,
            events_capacity: self.events_capacity,
            connection_timeout_ms: self.connection_timeout_ms,
            offline: self.offline,
            use_report: self.use_report,
            all_attributes_private: self.all_attributes_private,
            private_attribute_names: self.private_attribute_names,
            disable_background_updating: self.disable_background_updating,
            background_polling_interval_ms: self.background_polling_interval_ms,
        })
    }
}
