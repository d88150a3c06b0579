#![forbid(unsafe_code)]

//! Stagger utilities: start offsets for the members of a reveal batch.
//!
//! [`stagger_offsets`] produces the delay before each element of a batch
//! starts animating, relative to the moment the batch starts.
//!
//! # Invariants
//!
//! 1. `stagger_offsets(0, ..)` returns an empty vec.
//! 2. First offset is always `Duration::ZERO`.
//! 3. Offsets are monotonically non-decreasing for every mode.
//! 4. For `Linear`, offset[i] = i * interval, computed in integer nanoseconds.
//! 5. For eased modes, offsets follow the curve scaled to
//!    `(count - 1) * interval`.
//!
//! # Failure Modes
//!
//! - Zero count: returns empty vec.
//! - Count of 1: returns `[Duration::ZERO]`.
//! - Zero interval: all offsets are `Duration::ZERO`.

use std::time::Duration;

use super::Curve;

/// How to distribute start offsets across a batch.
#[derive(Debug, Clone, Copy, Default)]
pub enum StaggerMode {
    /// Equal spacing: offset[i] = i * interval.
    #[default]
    Linear,
    /// Spacing follows an easing curve over the total span.
    Eased(Curve),
}

/// Compute stagger start offsets for `count` items.
///
/// The first item always starts at `Duration::ZERO`. With `Linear` the last
/// item starts at `(count - 1) * interval`; eased modes keep the same total
/// span but redistribute the gaps.
#[must_use]
pub fn stagger_offsets(count: usize, interval: Duration, mode: StaggerMode) -> Vec<Duration> {
    if count == 0 {
        return Vec::new();
    }
    if count == 1 {
        return vec![Duration::ZERO];
    }

    let curve = match mode {
        // Exact integer arithmetic avoids float drift in the common case.
        StaggerMode::Linear => {
            return (0..count)
                .map(|i| interval.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX)))
                .collect();
        }
        StaggerMode::Eased(curve) => curve,
    };

    let total_nanos = interval.as_nanos() as f64 * (count - 1) as f64;
    let mut prev = Duration::ZERO;
    (0..count)
        .map(|i| {
            let t = i as f64 / (count - 1) as f64;
            let nanos = (total_nanos * curve.apply(t)).max(0.0) as u64;
            // Non-monotone custom curves must not reorder starts.
            prev = prev.max(Duration::from_nanos(nanos));
            prev
        })
        .collect()
}

/// Compute stagger offsets with deterministic random jitter.
///
/// Each offset gets a perturbation in `[-jitter, +jitter]`, clamped at zero.
/// Uses xorshift64 seeded from `seed` so runs are reproducible. Jittered
/// offsets are not required to stay ordered.
#[must_use]
pub fn stagger_offsets_with_jitter(
    count: usize,
    interval: Duration,
    mode: StaggerMode,
    jitter: Duration,
    seed: u64,
) -> Vec<Duration> {
    let mut offsets = stagger_offsets(count, interval, mode);
    if jitter.is_zero() || offsets.is_empty() {
        return offsets;
    }

    let mut state = seed.wrapping_add(1); // Avoid 0 state.
    let jitter_nanos = jitter.as_nanos().min(i64::MAX as u128 / 4) as i64;

    for offset in &mut offsets {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;

        let raw = (state % (2 * jitter_nanos as u64 + 1)) as i64 - jitter_nanos;
        let base_nanos = offset.as_nanos() as i64;
        *offset = Duration::from_nanos((base_nanos + raw).max(0) as u64);
    }

    offsets
}
