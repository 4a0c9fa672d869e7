//! Logging utilities and structured logging support

use std::cell::RefCell;
use std::collections::HashSet;
use std::hash::Hash;

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
pub fn init() {
    env_logger::init();
}

/// Initialize the logging system, ignoring repeated initialization (tests)
pub fn try_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Remembers which keys already produced a log line
///
/// Used for conditions that are recovered every frame (a unit without a
/// model, for instance) and would otherwise flood the log.
#[derive(Debug)]
pub struct LogOnce<K> {
    reported: RefCell<HashSet<K>>,
}

impl<K: Eq + Hash + Copy> LogOnce<K> {
    /// Create an empty reporter
    pub fn new() -> Self {
        Self {
            reported: RefCell::new(HashSet::new()),
        }
    }

    /// Returns true the first time `key` is seen
    pub fn first_time(&self, key: K) -> bool {
        self.reported.borrow_mut().insert(key)
    }

    /// Allow `key` to be reported again
    pub fn forget(&self, key: K) {
        self.reported.borrow_mut().remove(&key);
    }

    /// Number of distinct keys reported so far
    pub fn len(&self) -> usize {
        self.reported.borrow().len()
    }

    /// True if nothing has been reported
    pub fn is_empty(&self) -> bool {
        self.reported.borrow().is_empty()
    }
}

impl<K: Eq + Hash + Copy> Default for LogOnce<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Log a warning through `log::warn!` only the first time `key` is seen
#[macro_export]
macro_rules! warn_once {
    ($once:expr, $key:expr, $($arg:tt)+) => {
        if $once.first_time($key) {
            log::warn!($($arg)+);
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_once_reports_each_key_once() {
        let once = LogOnce::new();
        assert!(once.first_time(3_u32));
        assert!(!once.first_time(3_u32));
        assert!(once.first_time(4_u32));
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_log_once_forget() {
        let once = LogOnce::new();
        assert!(once.first_time(1_u32));
        once.forget(1);
        assert!(once.first_time(1_u32));
    }
}
