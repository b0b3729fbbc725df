//! Per-identity login attempt governor.
//!
//! Counts login attempts per [`ClientIdentity`] inside a fixed-length window
//! that is opened by the first attempt and reset lazily once it has expired.
//! The decision is made before any credential is looked at, so a denial says
//! nothing about whether the account exists.
//!
//! Windows live in a [`DashMap`]. The read-check-increment in
//! [`AttemptGovernor::record_attempt`] runs entirely under the entry's shard
//! lock, so concurrent attempts from the same identity can never be admitted
//! past the limit.

pub mod clock;
pub mod identity;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use clock::{Clock, ManualClock, SystemClock};
pub use identity::ClientIdentity;

/// Default window length: 15 minutes
pub const DEFAULT_WINDOW_LENGTH_MS: u64 = 15 * 60 * 1000;

/// Default number of attempts admitted per window
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GovernorConfigError {
    #[error("window length must be greater than zero")]
    ZeroWindow,

    #[error("max attempts must be at least 1")]
    ZeroAttempts,
}

/// Tunable parameters of the governor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorConfig {
    window_length: Duration,
    max_attempts: u32,
}

impl GovernorConfig {
    pub fn new(window_length: Duration, max_attempts: u32) -> Result<Self, GovernorConfigError> {
        if window_length.is_zero() {
            return Err(GovernorConfigError::ZeroWindow);
        }
        if max_attempts == 0 {
            return Err(GovernorConfigError::ZeroAttempts);
        }
        Ok(Self {
            window_length,
            max_attempts,
        })
    }

    pub fn from_millis(window_length_ms: u64, max_attempts: u32) -> Result<Self, GovernorConfigError> {
        Self::new(Duration::from_millis(window_length_ms), max_attempts)
    }

    pub fn window_length(&self) -> Duration {
        self.window_length
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            window_length: Duration::from_millis(DEFAULT_WINDOW_LENGTH_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Attempt counter for a single identity
#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    count: u32,
    window_start: Instant,
}

impl AttemptWindow {
    fn open(now: Instant) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.window_start)
    }

    fn is_expired(&self, now: Instant, window_length: Duration) -> bool {
        self.age(now) >= window_length
    }

    fn resets_in(&self, now: Instant, window_length: Duration) -> Duration {
        window_length.saturating_sub(self.age(now))
    }
}

/// Outcome of a single login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Attempt may proceed to credential verification
    Admit { remaining: u32 },
    /// Too many attempts in the current window
    Deny { retry_after: Duration },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit { .. })
    }

    /// Convert into a `Result`, turning a denial into [`RateLimited`]
    pub fn into_result(self) -> Result<u32, RateLimited> {
        match self {
            Decision::Admit { remaining } => Ok(remaining),
            Decision::Deny { retry_after } => Err(RateLimited { retry_after }),
        }
    }
}

/// A denied attempt, carrying the time until the window reopens
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("too many login attempts, retry after {} seconds", self.retry_after_secs())]
pub struct RateLimited {
    pub retry_after: Duration,
}

impl RateLimited {
    /// Retry delay in whole seconds, rounded up and never zero
    pub fn retry_after_secs(&self) -> u64 {
        let secs = self.retry_after.as_secs();
        let secs = if self.retry_after.subsec_nanos() > 0 { secs + 1 } else { secs };
        secs.max(1)
    }
}

/// Read-only view of an open window
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WindowStatus {
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
    pub resets_in_ms: u64,
}

/// In-memory attempt governor
#[derive(Debug)]
pub struct AttemptGovernor {
    config: GovernorConfig,
    windows: DashMap<ClientIdentity, AttemptWindow>,
    clock: Arc<dyn Clock>,
}

impl AttemptGovernor {
    pub fn new(config: GovernorConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: GovernorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            windows: DashMap::new(),
            clock,
        }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Record a login attempt and decide whether it may proceed
    pub fn record_attempt(&self, identity: &ClientIdentity) -> Decision {
        let now = self.clock.now();
        let limit = self.config.max_attempts;
        let window_length = self.config.window_length;

        let decision = match self.windows.entry(identity.clone()) {
            Entry::Occupied(mut entry) => {
                let window = entry.get_mut();
                if window.is_expired(now, window_length) {
                    *window = AttemptWindow::open(now);
                    Decision::Admit { remaining: limit - 1 }
                } else if window.count < limit {
                    window.count += 1;
                    Decision::Admit {
                        remaining: limit - window.count,
                    }
                } else {
                    Decision::Deny {
                        retry_after: window.resets_in(now, window_length),
                    }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(AttemptWindow::open(now));
                Decision::Admit { remaining: limit - 1 }
            }
        };

        match decision {
            Decision::Admit { remaining } => {
                debug!(identity = %identity.fingerprint(), remaining, "Login attempt admitted");
            }
            Decision::Deny { retry_after } => {
                warn!(
                    identity = %identity.fingerprint(),
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Login attempt denied by governor"
                );
            }
        }

        decision
    }

    /// Forget the window for `identity`. Returns true if one was tracked.
    pub fn reset(&self, identity: &ClientIdentity) -> bool {
        let removed = self.windows.remove(identity).is_some();
        if removed {
            debug!(identity = %identity.fingerprint(), "Attempt window reset");
        }
        removed
    }

    /// Current state of an open window, `None` if absent or expired
    pub fn window(&self, identity: &ClientIdentity) -> Option<WindowStatus> {
        let now = self.clock.now();
        let window = self.windows.get(identity)?;

        if window.is_expired(now, self.config.window_length) {
            return None;
        }

        Some(WindowStatus {
            count: window.count,
            limit: self.config.max_attempts,
            remaining: self.config.max_attempts.saturating_sub(window.count),
            resets_in_ms: window.resets_in(now, self.config.window_length).as_millis() as u64,
        })
    }

    /// Number of windows currently held in memory, expired ones included
    pub fn tracked_identities(&self) -> usize {
        self.windows.len()
    }

    /// Drop every expired window. Returns how many were evicted.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let window_length = self.config.window_length;

        let mut evicted = 0;
        self.windows.retain(|_, window| {
            let keep = !window.is_expired(now, window_length);
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }

    /// Run [`evict_expired`](Self::evict_expired) every `interval` on the tokio runtime
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let evicted = self.evict_expired();
                if evicted > 0 {
                    info!(evicted, "Evicted expired attempt windows");
                }
            }
        })
    }
}
