/*!
 * Scheduler Configuration
 *
 * Runtime configuration for table capacity, stack size and preemption
 */

use super::errors::{ThreadError, ThreadResult};
use super::limits::{
    DEFAULT_STACK_SIZE, ENV_MAX_THREADS, ENV_PREEMPT_US, ENV_STACK_SIZE, MAX_PREEMPT_INTERVAL,
    MAX_STACK_SIZE, MAX_THREADS, MIN_PREEMPT_INTERVAL, MIN_STACK_SIZE,
};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Scheduler configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Capacity of the thread table, thread 0 included
    pub max_threads: usize,
    /// Stack size for every created thread
    pub stack_size: usize,
    /// Timer interval for involuntary yields; `None` keeps scheduling cooperative
    pub preemption: Option<Duration>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::cooperative()
    }
}

impl SchedulerConfig {
    /// Purely cooperative scheduling with default limits
    pub const fn cooperative() -> Self {
        Self {
            max_threads: MAX_THREADS,
            stack_size: DEFAULT_STACK_SIZE,
            preemption: None,
        }
    }

    /// Timer-driven preemption every `interval`
    pub const fn preemptive(interval: Duration) -> Self {
        Self {
            max_threads: MAX_THREADS,
            stack_size: DEFAULT_STACK_SIZE,
            preemption: Some(interval),
        }
    }

    /// Defaults overridden by `UTHREAD_MAX_THREADS`, `UTHREAD_STACK_SIZE`
    /// and `UTHREAD_PREEMPT_US`
    pub fn from_env() -> ThreadResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ThreadResult<Self> {
        let mut config = Self::default();
        if let Some(raw) = lookup(ENV_MAX_THREADS) {
            config.max_threads = parse_var(ENV_MAX_THREADS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_STACK_SIZE) {
            config.stack_size = parse_var(ENV_STACK_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PREEMPT_US) {
            let micros: u64 = parse_var(ENV_PREEMPT_US, &raw)?;
            config.preemption = (micros > 0).then(|| Duration::from_micros(micros));
        }
        config.validate()?;
        Ok(config)
    }

    /// Check every field against the limits in `core::limits`
    pub fn validate(&self) -> ThreadResult<()> {
        if self.max_threads == 0 || self.max_threads > MAX_THREADS {
            return Err(ThreadError::Configuration(format!(
                "max_threads must be within 1..={}, got {}",
                MAX_THREADS, self.max_threads
            )));
        }
        if self.stack_size < MIN_STACK_SIZE || self.stack_size > MAX_STACK_SIZE {
            return Err(ThreadError::Configuration(format!(
                "stack_size must be within {}..={} bytes, got {}",
                MIN_STACK_SIZE, MAX_STACK_SIZE, self.stack_size
            )));
        }
        if let Some(interval) = self.preemption {
            if interval < MIN_PREEMPT_INTERVAL || interval > MAX_PREEMPT_INTERVAL {
                return Err(ThreadError::Configuration(format!(
                    "preemption interval must be within {:?}..={:?}, got {:?}",
                    MIN_PREEMPT_INTERVAL, MAX_PREEMPT_INTERVAL, interval
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> ThreadResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ThreadError::Configuration(format!("{}={:?} is not a number", key, raw)))
}
