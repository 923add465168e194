use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::{channel, FlagHandle, FlagPublisher, FlagSnapshot, LogLevel};
use crate::config::FlagsConfig;
use crate::telemetry::LogLevelHandle;

#[derive(Debug, Error)]
pub enum FlagError {
    #[error("flag source request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("flag source returned status {0}")]
    Status(StatusCode),
}

/// Payload served by the flag source. Missing keys keep their previous value.
#[derive(Debug, Default, Deserialize)]
struct RemoteFlags {
    #[serde(default)]
    offline: Option<bool>,
    #[serde(default, alias = "logLevel")]
    log_level: Option<String>,
}

/// Periodically fetches flags and publishes changed snapshots.
pub struct FlagPoller {
    client: reqwest::Client,
    url: Url,
    interval: Duration,
    publisher: FlagPublisher,
    log_level: Option<LogLevelHandle>,
}

/// The running poller plus the handle requests read from.
#[derive(Debug)]
pub struct FlagRuntime {
    handle: FlagHandle,
    task: Option<JoinHandle<()>>,
}

impl FlagRuntime {
    pub fn handle(&self) -> FlagHandle {
        self.handle.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.task.is_some()
    }

    pub fn shutdown(self) {
        if let Some(task) = self.task {
            task.abort();
        }
    }
}

impl FlagPoller {
    /// Start the flag machinery. Without a configured source this only publishes `defaults`.
    ///
    /// The first fetch is bounded by `timeout_secs`; its failure is logged and the service
    /// proceeds on defaults. The poller is detached from every request.
    pub async fn start(
        config: &FlagsConfig,
        defaults: FlagSnapshot,
        log_level: Option<LogLevelHandle>,
    ) -> FlagRuntime {
        let (publisher, handle) = channel(defaults);

        let Some(url) = config.url.clone() else {
            info!("no flag source configured, using defaults");
            return FlagRuntime { handle, task: None };
        };

        let client = match reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                warn!("flag client init failed, using defaults: {}", e);
                return FlagRuntime { handle, task: None };
            }
        };

        let poller = FlagPoller {
            client,
            url,
            interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            publisher,
            log_level,
        };

        match poller.refresh().await {
            Ok(()) => {
                let current = poller.publisher.current();
                info!(
                    offline = current.offline,
                    log_level = %current.log_level,
                    "feature flags ready"
                );
            }
            Err(e) => warn!("feature flags init warning: {}", e),
        }

        let task = tokio::spawn(poller.run());
        FlagRuntime {
            handle,
            task: Some(task),
        }
    }

    async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately and start() already fetched once.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Err(e) = self.refresh().await {
                warn!("feature flag refresh failed, keeping last-known values: {}", e);
            }
        }
    }

    async fn refresh(&self) -> Result<(), FlagError> {
        let remote = self.fetch().await?;
        self.apply(remote);
        Ok(())
    }

    async fn fetch(&self) -> Result<RemoteFlags, FlagError> {
        let response = self.client.get(self.url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(FlagError::Status(response.status()));
        }
        Ok(response.json::<RemoteFlags>().await?)
    }

    fn apply(&self, remote: RemoteFlags) {
        let previous = self.publisher.current();
        let next = merge(&previous, remote);

        if !self.publisher.publish(next.clone()) {
            debug!("feature flags unchanged");
            return;
        }

        if next.offline != previous.offline {
            warn!(offline = next.offline, "offline flag changed");
        }
        if next.log_level != previous.log_level {
            if let Some(handle) = &self.log_level {
                match handle.set(next.log_level) {
                    Ok(()) => info!("log level changed to {}", next.log_level),
                    Err(e) => warn!("failed to apply log level {}: {}", next.log_level, e),
                }
            }
        }
    }
}

impl std::fmt::Debug for FlagPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagPoller")
            .field("url", &self.url.as_str())
            .field("interval", &self.interval)
            .finish()
    }
}

fn merge(previous: &FlagSnapshot, remote: RemoteFlags) -> FlagSnapshot {
    let log_level = match remote.log_level.as_deref().map(str::parse::<LogLevel>) {
        Some(Ok(level)) => level,
        Some(Err(e)) => {
            warn!("ignoring flag value: {}", e);
            previous.log_level
        }
        None => previous.log_level,
    };

    FlagSnapshot {
        offline: remote.offline.unwrap_or(previous.offline),
        log_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> FlagSnapshot {
        FlagSnapshot::new(LogLevel::Info)
    }

    #[test]
    fn merge_applies_present_values() {
        let remote: RemoteFlags =
            serde_json::from_str(r#"{"offline": true, "logLevel": "debug"}"#).unwrap();
        let merged = merge(&base(), remote);
        assert!(merged.offline);
        assert_eq!(merged.log_level, LogLevel::Debug);
    }

    #[test]
    fn merge_keeps_previous_for_missing_or_invalid_values() {
        let remote: RemoteFlags = serde_json::from_str(r#"{"log_level": "chatty"}"#).unwrap();
        let merged = merge(&base(), remote);
        assert_eq!(merged, base());
    }

    #[tokio::test]
    async fn start_without_source_publishes_defaults() {
        let config = FlagsConfig {
            url: None,
            poll_interval_secs: 5,
            timeout_secs: 1,
        };
        let runtime = FlagPoller::start(&config, base(), None).await;
        assert!(!runtime.is_polling());
        assert_eq!(*runtime.handle().current(), base());
    }
}
