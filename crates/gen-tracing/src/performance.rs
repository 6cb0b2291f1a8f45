//! Performance spans and standard events for encoding and simulation
//!
//! ```rust
//! use gen_tracing::performance::{record_encoding, PerformanceSpan};
//!
//! let span = PerformanceSpan::new("encode", Some(100));
//! // ... work ...
//! drop(span); // logged only if it took 100μs or more
//!
//! record_encoding("kernel", 128, 40);
//! ```

use std::time::Instant;

use tracing::Level;

/// Guard that logs its lifetime on drop, optionally only above a threshold
#[derive(Debug)]
pub struct PerformanceSpan {
    name: String,
    threshold_us: Option<u64>,
    start: Instant,
    span: tracing::Span,
}

impl PerformanceSpan {
    /// `threshold_us` of `None` logs every span
    pub fn new(name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        Self::with_level(Level::DEBUG, name, threshold_us)
    }

    pub fn with_level(level: Level, name: impl Into<String>, threshold_us: Option<u64>) -> Self {
        let name = name.into();
        let span = match level {
            Level::TRACE => tracing::trace_span!("perf", name = %name),
            Level::DEBUG => tracing::debug_span!("perf", name = %name),
            Level::INFO => tracing::info_span!("perf", name = %name),
            Level::WARN => tracing::warn_span!("perf", name = %name),
            Level::ERROR => tracing::error_span!("perf", name = %name),
        };
        Self::with_span(name, threshold_us, span)
    }

    /// Time an already built span, used by `perf_span!` to attach fields
    pub fn with_span(name: impl Into<String>, threshold_us: Option<u64>, span: tracing::Span) -> Self {
        Self {
            name: name.into(),
            threshold_us,
            start: Instant::now(),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn threshold_us(&self) -> Option<u64> {
        self.threshold_us
    }

    pub fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for PerformanceSpan {
    fn drop(&mut self) {
        let elapsed_us = self.elapsed_us();
        if self.threshold_us.is_none_or(|threshold| elapsed_us >= threshold) {
            let _entered = self.span.enter();
            tracing::debug!(duration_us = elapsed_us, "performance span complete");
        }
    }
}

fn per_second(count: usize, duration_us: u64) -> f64 {
    if duration_us == 0 {
        0.0
    } else {
        count as f64 * 1_000_000.0 / duration_us as f64
    }
}

/// Instructions sealed into a stream
pub fn record_encoding(kernel: &str, instructions: usize, duration_us: u64) {
    tracing::debug!(
        event = "encoding",
        kernel,
        instructions,
        bytes = instructions * 16,
        duration_us,
        instructions_per_sec = per_second(instructions, duration_us),
        "instruction stream encoded"
    );
}

/// Instructions executed by the simulator
pub fn record_simulation(steps: usize, duration_us: u64) {
    tracing::debug!(
        event = "simulation",
        steps,
        duration_us,
        steps_per_sec = per_second(steps, duration_us),
        "simulation finished"
    );
}

/// Lanes processed by a vector operation
pub fn record_lane_throughput(operation: &str, lanes: usize, duration_us: u64) {
    let lanes_per_sec = per_second(lanes, duration_us);
    tracing::debug!(
        event = "throughput",
        operation,
        lanes,
        duration_us,
        lanes_per_sec,
        mlanes_per_sec = lanes_per_sec / 1_000_000.0,
        "lane throughput"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_span_fields() {
        let span = PerformanceSpan::new("encode", Some(1000));
        assert_eq!(span.name(), "encode");
        assert_eq!(span.threshold_us(), Some(1000));
        let _entered = span.enter();
    }

    #[test]
    fn test_span_elapsed() {
        let span = PerformanceSpan::with_level(Level::INFO, "sleep", None);
        thread::sleep(Duration::from_millis(5));
        assert!(span.elapsed_us() >= 5_000);
    }

    #[test]
    fn test_rates() {
        assert_eq!(per_second(1_000, 1_000), 1_000_000.0);
        assert_eq!(per_second(10, 0), 0.0);
    }

    #[test]
    fn test_record_events() {
        record_encoding("kernel", 64, 10);
        record_simulation(200, 0);
        record_lane_throughput("add", 16, 1);
    }
}
