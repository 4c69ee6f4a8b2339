//! Runtime configuration.
//!
//! All knobs come from `CORVUS_*` environment variables with sane defaults,
//! so a bare `node-runtime` invocation starts a working local cluster.

use corvus_dispatch::DispatchConfig;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

/// Complete node runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Number of in-process nodes the demo cluster starts.
    pub node_count: u64,
    /// Dispatch layer tunables.
    pub dispatch: DispatchConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            node_count: 3,
            dispatch: DispatchConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Build the configuration from the environment.
    ///
    /// Recognized variables:
    /// - `CORVUS_NODE_COUNT` - cluster size (default 3)
    /// - `CORVUS_REQUEST_TIMEOUT_MS` - per-request timeout (default 2000)
    /// - `CORVUS_SHUTDOWN_GRACE_MS` - drain grace period (default 1000)
    /// - `CORVUS_INBOUND_CAPACITY` - inbound queue bound (default 1000)
    /// - `CORVUS_TICK_INTERVAL_MS` - event loop wakeup bound (default 25)
    ///
    /// Unparseable values fall back to the default with a warning rather
    /// than aborting startup.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            node_count: env_or("CORVUS_NODE_COUNT", defaults.node_count),
            dispatch: DispatchConfig {
                request_timeout: Duration::from_millis(env_or(
                    "CORVUS_REQUEST_TIMEOUT_MS",
                    defaults.dispatch.request_timeout.as_millis() as u64,
                )),
                shutdown_grace: Duration::from_millis(env_or(
                    "CORVUS_SHUTDOWN_GRACE_MS",
                    defaults.dispatch.shutdown_grace.as_millis() as u64,
                )),
                inbound_queue_capacity: env_or(
                    "CORVUS_INBOUND_CAPACITY",
                    defaults.dispatch.inbound_queue_capacity,
                ),
                tick_interval: Duration::from_millis(env_or(
                    "CORVUS_TICK_INTERVAL_MS",
                    defaults.dispatch.tick_interval.as_millis() as u64,
                )),
            },
        }
    }
}

fn env_or<T: FromStr + Copy>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, raw = %raw, "unparseable environment value, using default");
                default
            }
        },
        Err(_) => default,
    }
}
