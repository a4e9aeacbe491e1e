use std::time::Duration;

use middleware::{global::GlobalLimiter, user::UserRateLimiter};

pub mod middleware {
    pub mod global;
    pub mod user;
}

pub fn global_middleware(permits_per_second: u32) -> GlobalLimiter {
    GlobalLimiter::new(permits_per_second)
}

/// Per-user limiter for generation endpoints; clone it into every worker so the quota is shared.
pub fn user_middleware(requests: u32, window: Duration) -> UserRateLimiter {
    UserRateLimiter::new(requests, window)
}
