//! Rate limiting for typing-status broadcasts.
//!
//! One governor token bucket per (user, project) pair, so a chatty client in
//! one project never throttles the same user elsewhere.

use dashmap::DashMap;
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;
use tracing::debug;

/// Type alias for governor's direct rate limiter.
type DirectRateLimiter = governor::DefaultDirectRateLimiter;

/// Thread-safe typing limiter.
#[derive(Debug)]
pub struct TypingLimiter {
    limiters: DashMap<String, DirectRateLimiter>,
    quota: Quota,
}

impl TypingLimiter {
    /// Upper bound on tracked pairs before [`TypingLimiter::cleanup`] resets the map.
    const MAX_ENTRIES: usize = 10_000;

    /// Create a limiter allowing `rate_per_second` events per pair (0 is treated as 1).
    pub fn new(rate_per_second: u32) -> Self {
        let rate = NonZeroU32::new(rate_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            limiters: DashMap::new(),
            quota: Quota::per_second(rate),
        }
    }

    fn key(user: &str, project: &str) -> String {
        format!("{user}\0{project}")
    }

    /// Returns `true` if allowed, `false` if rate limited.
    pub fn check(&self, user: &str, project: &str) -> bool {
        let limiter = self
            .limiters
            .entry(Self::key(user, project))
            .or_insert_with(|| GovRateLimiter::direct(self.quota));

        let allowed = limiter.check().is_ok();
        if !allowed {
            debug!(user = %user, project = %project, "typing rate limit exceeded");
        }
        allowed
    }

    /// Cleanup old entries to prevent memory growth.
    ///
    /// Called periodically from the maintenance task in `main`.
    pub fn cleanup(&self) {
        if self.limiters.len() > Self::MAX_ENTRIES {
            self.limiters.clear();
            debug!(
                "cleared typing rate limiters (exceeded {} entries)",
                Self::MAX_ENTRIES
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_pairs(&self) -> usize {
        self.limiters.len()
    }
}
