//! Timing macros
//!
//! `perf_span!` returns a guard that logs its duration when dropped;
//! `timed_block!` times a block and hands the duration back to the caller.

/// Create a [`crate::performance::PerformanceSpan`] with optional fields
///
/// ```text
/// perf_span!("name")
/// perf_span!("name", field = value, ...)
/// ```
///
/// # Example
///
/// ```rust
/// use gen_tracing::perf_span;
///
/// {
///     let _span = perf_span!("encode_kernel", instructions = 64);
///     // ... emit instructions ...
/// }
/// ```
#[macro_export]
macro_rules! perf_span {
    ($name:expr) => {{
        $crate::performance::PerformanceSpan::new($name, None)
    }};
    ($name:expr, $($field:tt = $value:expr),+ $(,)?) => {{
        $crate::performance::PerformanceSpan::with_span(
            $name,
            None,
            $crate::debug_span!("perf", name = $name, $($field = $value),+),
        )
    }};
}

/// Run a block and return `(result, duration_us)`
///
/// # Example
///
/// ```rust
/// use gen_tracing::timed_block;
///
/// let (sum, _duration_us) = timed_block!("lane_sum", { (0..16).sum::<u32>() });
/// assert_eq!(sum, 120);
/// ```
#[macro_export]
macro_rules! timed_block {
    ($name:expr, $block:block) => {{
        let start = std::time::Instant::now();
        let result = $block;
        let duration_us = start.elapsed().as_micros() as u64;
        $crate::debug!(operation = $name, duration_us, "timed block complete");
        (result, duration_us)
    }};
}
