//! Session limits.

/// Bounds on the work and memory a peer can make a session spend.
///
/// Saved with the session and restored with it. Adjust a live session with
/// [`RatchetState::with_config`](crate::RatchetState::with_config).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatchetConfig {
    /// Maximum number of message keys one incoming message may force the
    /// session to derive and cache (per chain)
    pub max_skip: u32,
    /// Maximum number of cached skipped message keys; the oldest are evicted
    /// first
    pub max_skipped_keys: usize,
}

impl RatchetConfig {
    /// Default per-message skip bound.
    pub const DEFAULT_MAX_SKIP: u32 = 1000;

    /// Default skipped-key cache capacity.
    pub const DEFAULT_MAX_SKIPPED_KEYS: usize = 1000;
}

impl Default for RatchetConfig {
    fn default() -> Self {
        Self {
            max_skip: Self::DEFAULT_MAX_SKIP,
            max_skipped_keys: Self::DEFAULT_MAX_SKIPPED_KEYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RatchetConfig::default();
        assert_eq!(config.max_skip, 1000);
        assert_eq!(config.max_skipped_keys, 1000);
    }

    #[test]
    fn struct_update_overrides_one_field() {
        let config = RatchetConfig { max_skip: 10, ..Default::default() };
        assert_eq!(config.max_skip, 10);
        assert_eq!(config.max_skipped_keys, RatchetConfig::DEFAULT_MAX_SKIPPED_KEYS);
    }
}
