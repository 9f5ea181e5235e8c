//! Shared outbound HTTP client.

use std::time::Duration;

/// Build the client used for identity oracle calls.
///
/// Every request is bounded by `timeout` so a stalled oracle cannot hold a
/// reconciliation longer than one call.
pub fn rolegate_reqwest_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("rolegate/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(5).min(timeout))
        .build()
}
