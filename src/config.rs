//! Runtime configuration for contact retrieval and peak search.
//!
//! The parallel-fetch switch is process-wide and set once at startup; the
//! search parameters travel with each resolver.

use std::sync::atomic::{AtomicBool, Ordering};

/// Per-row percentile used as the peak height threshold.
pub const DEFAULT_PEAK_PERCENTILE: f64 = 95.0;

/// Bins added on each side of an error region's own columns when excluding
/// self-interaction.
pub const DEFAULT_EXCLUSION_PADDING: u64 = 2;

/// Global flag for fetching matrix tiles on the Rayon pool.
///
/// Read whenever a tile assembler is created. Sources that are not safe to
/// hit concurrently (or a single-threaded run under a debugger) can turn it
/// off.
static PARALLEL_FETCH: AtomicBool = AtomicBool::new(true);

/// Enable or disable parallel tile fetching.
///
/// # Example
///
/// ```
/// use asmfix::config;
///
/// config::set_parallel_fetch(false);
/// assert!(!config::is_parallel_fetch());
/// config::set_parallel_fetch(true);
/// ```
#[inline]
pub fn set_parallel_fetch(enabled: bool) {
    PARALLEL_FETCH.store(enabled, Ordering::Release);
}

#[inline]
pub fn is_parallel_fetch() -> bool {
    PARALLEL_FETCH.load(Ordering::Acquire)
}

/// Tunables of the insertion search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchConfig {
    pub peak_percentile: f64,
    pub exclusion_padding: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            peak_percentile: DEFAULT_PEAK_PERCENTILE,
            exclusion_padding: DEFAULT_EXCLUSION_PADDING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_parallel_fetch_toggle() {
        set_parallel_fetch(false);
        assert!(!is_parallel_fetch());
        set_parallel_fetch(true);
        assert!(is_parallel_fetch());
    }

    #[test]
    fn test_search_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.peak_percentile, 95.0);
        assert_eq!(config.exclusion_padding, 2);
    }
}
