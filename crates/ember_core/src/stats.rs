//! Global ray counters.
//!
//! Updated with relaxed atomic adds from every worker; read once for the
//! end-of-render summary.

use std::sync::atomic::{AtomicU64, Ordering};

static RAY_COUNT: AtomicU64 = AtomicU64::new(0);
static SHADOW_RAY_COUNT: AtomicU64 = AtomicU64::new(0);

#[inline]
pub fn record_ray() {
    RAY_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub fn record_shadow_ray() {
    SHADOW_RAY_COUNT.fetch_add(1, Ordering::Relaxed);
}

/// Current (rays, shadow rays) totals.
pub fn totals() -> (u64, u64) {
    (
        RAY_COUNT.load(Ordering::Relaxed),
        SHADOW_RAY_COUNT.load(Ordering::Relaxed),
    )
}
