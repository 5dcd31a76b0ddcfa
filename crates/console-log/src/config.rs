//! Engine configuration.
//!
//! [`Config`] is the serializable form read by hosts from disk. At runtime the
//! values live in [`Settings`], whose fields are atomics so the host can
//! reassign them through a shared reference while the engine is active.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracerlog_protocol::constants::DEFAULT_LIMIT;

/// Tracer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Buffer length that triggers an automatic flush.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Forward intercepted calls to the original console as well.
    #[serde(default)]
    pub pass_through: bool,

    /// Export every flushed batch as a downloadable file.
    #[serde(default)]
    pub save_file: bool,

    /// Capture a backtrace for each recorded entry.
    #[serde(default = "default_true")]
    pub capture_call_site: bool,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            pass_through: false,
            save_file: false,
            capture_call_site: default_true(),
        }
    }
}

/// Live, shared configuration.
#[derive(Debug)]
pub(crate) struct Settings {
    limit: AtomicUsize,
    pass_through: AtomicBool,
    save_file: AtomicBool,
    capture_call_site: AtomicBool,
}

impl Settings {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            limit: AtomicUsize::new(config.limit),
            pass_through: AtomicBool::new(config.pass_through),
            save_file: AtomicBool::new(config.save_file),
            capture_call_site: AtomicBool::new(config.capture_call_site),
        }
    }

    /// Flush threshold. Never zero: a zero limit flushes on every append.
    pub(crate) fn limit(&self) -> usize {
        self.limit.load(Ordering::Relaxed).max(1)
    }

    pub(crate) fn set_limit(&self, limit: usize) {
        self.limit.store(limit, Ordering::Relaxed);
    }

    pub(crate) fn pass_through(&self) -> bool {
        self.pass_through.load(Ordering::Relaxed)
    }

    pub(crate) fn set_pass_through(&self, enabled: bool) {
        self.pass_through.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn save_file(&self) -> bool {
        self.save_file.load(Ordering::Relaxed)
    }

    pub(crate) fn set_save_file(&self, enabled: bool) {
        self.save_file.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn capture_call_site(&self) -> bool {
        self.capture_call_site.load(Ordering::Relaxed)
    }

    pub(crate) fn set_capture_call_site(&self, enabled: bool) {
        self.capture_call_site.store(enabled, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> Config {
        Config {
            limit: self.limit.load(Ordering::Relaxed),
            pass_through: self.pass_through(),
            save_file: self.save_file(),
            capture_call_site: self.capture_call_site(),
        }
    }
}
