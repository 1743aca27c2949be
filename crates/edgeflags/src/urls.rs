use crate::config::Config;
use crate::encoding::encode_for_url;
use edgeflags_core::User;

/// `${app-uri}/msdk/eval/users/${encode-for-url(user)}`
pub fn eval_url(config: &Config, user: &User) -> String {
    format!(
        "{}/msdk/eval/users/{}",
        config.app_uri.trim_end_matches('/'),
        encode_for_url(user, config)
    )
}

/// `${app-uri}/msdk/eval/users` — the path REPORT requests post the user
/// body to, mirroring the GET variant's path minus the trailing segment.
pub fn eval_report_url(config: &Config) -> String {
    format!("{}/msdk/eval/users", config.app_uri.trim_end_matches('/'))
}

/// `${stream-uri}/meval/${encode-for-url(user)}`
pub fn stream_url(config: &Config, user: &User) -> String {
    format!(
        "{}/meval/{}",
        config.stream_uri.trim_end_matches('/'),
        encode_for_url(user, config)
    )
}

/// `${events-uri}/mobile`
pub fn events_url(config: &Config) -> String {
    format!("{}/mobile", config.events_uri.trim_end_matches('/'))
}
