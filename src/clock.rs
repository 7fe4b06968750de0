//! Injectable clock for timed waits.
//!
//! Every sleep and deadline in the crate goes through the [`Clock`] trait so
//! timing-sensitive code can run under tokio's paused test clock without real
//! sleeping. Production code uses [`TokioClock`].

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Source of sleeps and deadlines.
///
/// Implementations must be async-safe: never block the thread.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Suspend the calling task for `duration`.
    async fn sleep(&self, duration: Duration);

    /// The current instant, on the same timeline as `sleep`.
    fn now(&self) -> Instant;
}

/// Clock backed by the tokio runtime.
///
/// Under `tokio::time::pause()` this advances virtually, which is what the
/// timing tests rely on.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_advances_under_paused_time() {
        let clock = TokioClock;
        let before = clock.now();
        clock.sleep(Duration::from_secs(3600)).await;
        assert!(clock.now() - before >= Duration::from_secs(3600));
    }
}
