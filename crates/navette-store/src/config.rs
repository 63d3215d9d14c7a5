//! Store configuration.

use std::time::Duration;

use serde::Deserialize;

/// Runtime store configuration, deserialised from `navette.toml` and
/// `NAVETTE_*` environment variables by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
  /// Simulated round-trip latency of the in-memory backend.
  pub latency_ms: u64,
  /// Upper bound on a single backend call; unbounded when absent.
  ///
  /// A call that times out leaves the store's records untouched, but the
  /// backend may still finish the write it had started (the JSON file
  /// backend's rename runs to completion off the async runtime). After a
  /// timeout, `fetch` resynchronises the store with what was stored.
  pub timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
  fn default() -> Self { Self { latency_ms: 300, timeout_ms: None } }
}

impl StoreConfig {
  pub fn latency(&self) -> Duration { Duration::from_millis(self.latency_ms) }

  pub fn timeout(&self) -> Option<Duration> { self.timeout_ms.map(Duration::from_millis) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_keys_take_defaults() {
    let config: StoreConfig = serde_json::from_str(r#"{ "timeout_ms": 50 }"#).unwrap();
    assert_eq!(config.latency(), Duration::from_millis(300));
    assert_eq!(config.timeout(), Some(Duration::from_millis(50)));

    let config: StoreConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, StoreConfig::default());
    assert_eq!(config.timeout(), None);
  }
}
