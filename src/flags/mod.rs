//! Runtime settings driven by a remote flag source.
//!
//! A single [`FlagPublisher`] owns the current [`FlagSnapshot`]; request tasks hold a
//! [`FlagHandle`] and only ever read the latest published snapshot.

pub mod poller;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

pub use poller::{FlagError, FlagPoller, FlagRuntime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLogLevel(pub String);

impl fmt::Display for InvalidLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown log level '{}'", self.0)
    }
}

impl std::error::Error for InvalidLogLevel {}

impl FromStr for LogLevel {
    type Err = InvalidLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(InvalidLogLevel(s.to_string())),
        }
    }
}

/// Immutable view of the flag values at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSnapshot {
    /// Global kill-switch: when on, only probes are served.
    pub offline: bool,
    pub log_level: LogLevel,
}

impl FlagSnapshot {
    pub fn new(log_level: LogLevel) -> Self {
        Self {
            offline: false,
            log_level,
        }
    }
}

/// Create the publisher/reader pair for a snapshot stream.
pub fn channel(initial: FlagSnapshot) -> (FlagPublisher, FlagHandle) {
    let (tx, rx) = watch::channel(Arc::new(initial));
    (FlagPublisher { tx }, FlagHandle { rx })
}

/// Read side, cloned into every request task.
#[derive(Debug, Clone)]
pub struct FlagHandle {
    rx: watch::Receiver<Arc<FlagSnapshot>>,
}

impl FlagHandle {
    /// A handle that never changes.
    pub fn fixed(snapshot: FlagSnapshot) -> Self {
        channel(snapshot).1
    }

    pub fn current(&self) -> Arc<FlagSnapshot> {
        self.rx.borrow().clone()
    }

    pub fn is_offline(&self) -> bool {
        self.rx.borrow().offline
    }
}

/// Write side, owned by exactly one task.
#[derive(Debug)]
pub struct FlagPublisher {
    tx: watch::Sender<Arc<FlagSnapshot>>,
}

impl FlagPublisher {
    pub fn current(&self) -> Arc<FlagSnapshot> {
        self.tx.borrow().clone()
    }

    /// Publish `snapshot` if it differs from the current one. Returns whether it changed.
    pub fn publish(&self, snapshot: FlagSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if **current == snapshot {
                false
            } else {
                *current = Arc::new(snapshot);
                true
            }
        })
    }

    pub fn subscribe(&self) -> FlagHandle {
        FlagHandle {
            rx: self.tx.subscribe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_log_levels_case_insensitively() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("verbose".parse::<LogLevel>().is_err());
    }

    #[test]
    fn publish_only_reports_real_changes() {
        let (publisher, handle) = channel(FlagSnapshot::new(LogLevel::Info));
        assert!(!publisher.publish(FlagSnapshot::new(LogLevel::Info)));

        let offline = FlagSnapshot {
            offline: true,
            log_level: LogLevel::Info,
        };
        assert!(publisher.publish(offline.clone()));
        assert_eq!(*handle.current(), offline);
        assert!(handle.is_offline());
    }

    #[test]
    fn fixed_handle_keeps_its_value_without_a_publisher() {
        let handle = FlagHandle::fixed(FlagSnapshot::new(LogLevel::Error));
        assert_eq!(handle.current().log_level, LogLevel::Error);
        assert!(!handle.is_offline());
    }
}
