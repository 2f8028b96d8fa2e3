//! Runtime configuration of the adapter

/// Default timeout for a single command exchange
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u32 = 15_000;

/// Default number of liveness probes during initialization
pub const DEFAULT_PROBE_ATTEMPTS: u8 = 3;

/// Default time the module gets for booting before the first probe
pub const DEFAULT_STARTUP_DELAY_MS: u32 = 100;

/// Adapter configuration applied by [Adapter::initialize](crate::Adapter::initialize)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Timeout of a single command exchange
    pub response_timeout_ms: u32,

    /// Max. number of AT probes until the module is considered unresponsive
    pub probe_attempts: u8,

    /// Settling delay before probing the module
    pub startup_delay_ms: u32,

    /// True => WIFI and soft AP credentials are stored in flash of the module
    pub persist_credentials: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            startup_delay_ms: DEFAULT_STARTUP_DELAY_MS,
            persist_credentials: false,
        }
    }
}

impl Config {
    pub fn response_timeout_ms(mut self, timeout: u32) -> Self {
        self.response_timeout_ms = timeout;
        self
    }

    pub fn probe_attempts(mut self, attempts: u8) -> Self {
        self.probe_attempts = attempts;
        self
    }

    pub fn startup_delay_ms(mut self, delay: u32) -> Self {
        self.startup_delay_ms = delay;
        self
    }

    pub fn persist_credentials(mut self, persist: bool) -> Self {
        self.persist_credentials = persist;
        self
    }
}
