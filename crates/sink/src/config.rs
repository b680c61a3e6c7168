use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use telegauge_stream::ProducerConfig;
use tracing::warn;
use url::Url;

use crate::error::ConfigError;
use crate::gauge::{DEFAULT_SCALE, MAX_SCALE};

#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub endpoint: String,
    pub log_file: PathBuf,
    pub poll_timeout: Duration,
    pub closed_grace: Duration,
    pub gauge_scale: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        let producer = ProducerConfig::default();
        Self {
            endpoint: "ws://127.0.0.1:8765".to_string(),
            log_file: PathBuf::from("output.log"),
            poll_timeout: producer.poll_timeout,
            closed_grace: producer.closed_grace,
            gauge_scale: DEFAULT_SCALE,
        }
    }
}

impl SinkConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Empty values are ignored;
    /// unparsable numbers are logged and leave the default in place.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = SinkConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("TELEGAUGE_ENDPOINT") {
            cfg.endpoint = v;
        }
        if let Some(v) = get("TELEGAUGE_LOG_FILE") {
            cfg.log_file = PathBuf::from(v);
        }
        let parsed = |key: &str| get(key).and_then(|v| parse_or_warn::<u64>(key, &v));

        if let Some(ms) = parsed("TELEGAUGE_POLL_TIMEOUT_MS") {
            cfg.poll_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parsed("TELEGAUGE_CLOSED_GRACE_MS") {
            cfg.closed_grace = Duration::from_millis(ms);
        }
        if let Some(scale) = get("TELEGAUGE_GAUGE_SCALE")
            .and_then(|v| parse_or_warn::<usize>("TELEGAUGE_GAUGE_SCALE", &v))
        {
            cfg.gauge_scale = scale;
        }

        cfg
    }

    /// Positional overrides: `[ENDPOINT] [LOG_FILE]`.
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        let mut args = args.into_iter();
        if let Some(endpoint) = args.next() {
            self.endpoint = endpoint;
        }
        if let Some(log_file) = args.next() {
            self.log_file = PathBuf::from(log_file);
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = Url::parse(&self.endpoint).map_err(|e| ConfigError::Endpoint {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;
        // The transport is built without TLS.
        if url.scheme() != "ws" {
            return Err(ConfigError::Endpoint {
                endpoint: self.endpoint.clone(),
                reason: format!("unsupported scheme {:?}, expected ws", url.scheme()),
            });
        }
        if !(1..=MAX_SCALE).contains(&self.gauge_scale) {
            return Err(ConfigError::GaugeScale);
        }
        if self.poll_timeout.is_zero() {
            return Err(ConfigError::PollTimeout);
        }
        Ok(())
    }

    pub fn producer_config(&self) -> ProducerConfig {
        ProducerConfig { poll_timeout: self.poll_timeout, closed_grace: self.closed_grace }
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.parse::<T>().ok();
    if parsed.is_none() {
        warn!(key, value, "Ignoring unparsable config value");
    }
    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_upstream_source() {
        let cfg = SinkConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.endpoint, "ws://127.0.0.1:8765");
        assert_eq!(cfg.log_file, PathBuf::from("output.log"));
        assert_eq!(cfg.poll_timeout, Duration::from_millis(10));
        assert_eq!(cfg.closed_grace, Duration::from_millis(100));
        assert_eq!(cfg.gauge_scale, 50);
        cfg.validate().unwrap();
    }

    #[test]
    fn env_values_override_defaults() {
        let cfg = SinkConfig::from_lookup(lookup(&[
            ("TELEGAUGE_ENDPOINT", "ws://example.org/stream"),
            ("TELEGAUGE_LOG_FILE", "/tmp/samples.log"),
            ("TELEGAUGE_POLL_TIMEOUT_MS", "25"),
            ("TELEGAUGE_GAUGE_SCALE", "20"),
        ]));
        assert_eq!(cfg.endpoint, "ws://example.org/stream");
        assert_eq!(cfg.log_file, PathBuf::from("/tmp/samples.log"));
        assert_eq!(cfg.producer_config().poll_timeout, Duration::from_millis(25));
        assert_eq!(cfg.gauge_scale, 20);
    }

    #[test]
    fn bad_and_empty_values_keep_defaults() {
        let cfg = SinkConfig::from_lookup(lookup(&[
            ("TELEGAUGE_ENDPOINT", ""),
            ("TELEGAUGE_POLL_TIMEOUT_MS", "soon"),
            ("TELEGAUGE_GAUGE_SCALE", "-3"),
        ]));
        assert_eq!(cfg.endpoint, "ws://127.0.0.1:8765");
        assert_eq!(cfg.poll_timeout, Duration::from_millis(10));
        assert_eq!(cfg.gauge_scale, 50);
    }

    #[test]
    fn positional_args_win() {
        let cfg = SinkConfig::default()
            .with_args(["ws://10.0.0.2:9000".to_string(), "run.log".to_string()]);
        assert_eq!(cfg.endpoint, "ws://10.0.0.2:9000");
        assert_eq!(cfg.log_file, PathBuf::from("run.log"));

        let only_endpoint = SinkConfig::default().with_args(["ws://host:1".to_string()]);
        assert_eq!(only_endpoint.log_file, PathBuf::from("output.log"));
    }

    #[test]
    fn validation_rejects_bad_settings() {
        let http = SinkConfig { endpoint: "http://127.0.0.1:8765".into(), ..Default::default() };
        assert!(matches!(http.validate(), Err(ConfigError::Endpoint { .. })));

        let tls = SinkConfig { endpoint: "wss://127.0.0.1:8765".into(), ..Default::default() };
        assert!(matches!(tls.validate(), Err(ConfigError::Endpoint { .. })));

        let garbage = SinkConfig { endpoint: "not a url".into(), ..Default::default() };
        assert!(matches!(garbage.validate(), Err(ConfigError::Endpoint { .. })));

        let flat = SinkConfig { gauge_scale: 0, ..Default::default() };
        assert!(matches!(flat.validate(), Err(ConfigError::GaugeScale)));

        let huge = SinkConfig { gauge_scale: usize::MAX, ..Default::default() };
        assert!(matches!(huge.validate(), Err(ConfigError::GaugeScale)));

        let widest = SinkConfig { gauge_scale: MAX_SCALE, ..Default::default() };
        widest.validate().unwrap();

        let busy = SinkConfig { poll_timeout: Duration::ZERO, ..Default::default() };
        assert!(matches!(busy.validate(), Err(ConfigError::PollTimeout)));
    }
}
