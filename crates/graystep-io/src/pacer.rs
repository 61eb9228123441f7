//! Browser timer pacing for conversion runs.

use std::time::Duration;

use graystep_pipeline::Pacer;

/// Yields to the browser event loop via `setTimeout`.
///
/// Pausing lets the page paint progress between steps; a zero delay
/// still yields once.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserPacer;

impl Pacer for BrowserPacer {
    async fn pause(&self, delay: Duration) {
        gloo_timers::future::TimeoutFuture::new(timeout_millis(delay)).await;
    }
}

/// Milliseconds for `setTimeout`, saturating at `u32::MAX`.
fn timeout_millis(delay: Duration) -> u32 {
    u32::try_from(delay.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturate() {
        assert_eq!(timeout_millis(Duration::from_millis(10)), 10);
        assert_eq!(timeout_millis(Duration::from_micros(1500)), 1);
        assert_eq!(timeout_millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }
}
