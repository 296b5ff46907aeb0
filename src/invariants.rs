//! Debug-only invariant checks for the ring protocols documented in
//! `SPEC_FULL.md` §3/§4. Zero cost in release builds, same shape as the
//! teacher's `invariants.rs`.

// =============================================================================
// INV-SEQ-01: Bounded Count (SPSC)
// =============================================================================

/// `0 <= (tail - head) <= capacity`, checked after `commit_push`.
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-SEQ-01 violated: count {} exceeds capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-SEQ-02: Monotonic Progress (SPSC)
// =============================================================================

/// A sequence counter only increases (mod `usize::MAX + 1`).
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old || $old.wrapping_sub($new) > (1usize << (usize::BITS / 2)),
            "INV-SEQ-02 violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-BRD-01: Census Consistency (broadcast)
// =============================================================================

/// `ncycled <= nreaders` at every observation of the packed state word.
macro_rules! debug_assert_census_bounded {
    ($ncycled:expr, $nreaders:expr) => {
        debug_assert!(
            $ncycled <= $nreaders,
            "INV-BRD-01 violated: ncycled {} exceeds nreaders {}",
            $ncycled,
            $nreaders
        )
    };
}

// =============================================================================
// INV-BRD-02: hstate Consistency (broadcast)
// =============================================================================

/// `hstate == 0 ==> ncycled == 0`.
macro_rules! debug_assert_hstate_consistent {
    ($hstate:expr, $ncycled:expr) => {
        debug_assert!(
            $hstate != 0 || $ncycled == 0,
            "INV-BRD-02 violated: hstate is SAME_BLOCK but ncycled is {}",
            $ncycled
        )
    };
}

// =============================================================================
// INV-BRD-03: Reader Non-Overwrite (broadcast)
// =============================================================================

/// `tail - r < capacity` for every attached reader, at every observation.
macro_rules! debug_assert_reader_in_bounds {
    ($tail_minus_r:expr, $capacity:expr) => {
        debug_assert!(
            $tail_minus_r < $capacity,
            "INV-BRD-03 violated: reader lag {} is not strictly less than capacity {}",
            $tail_minus_r,
            $capacity
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_census_bounded;
pub(crate) use debug_assert_hstate_consistent;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_reader_in_bounds;
