use std::time::{Duration, Instant};
use tracing::{debug, info, Level};

/// Logs how long an operation took when stopped
pub struct Timer {
    operation: String,
    start: Instant,
    log_level: Level,
    stopped: bool,
}

impl Timer {
    /// Start a timer that reports at info level
    pub fn start(operation: impl Into<String>) -> Self {
        Self::with_level(operation, Level::INFO)
    }

    /// Start a timer that reports at debug level
    pub fn start_debug(operation: impl Into<String>) -> Self {
        Self::with_level(operation, Level::DEBUG)
    }

    fn with_level(operation: impl Into<String>, log_level: Level) -> Self {
        Self {
            operation: operation.into(),
            start: Instant::now(),
            log_level,
            stopped: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and log the duration
    pub fn stop(mut self) -> Duration {
        self.stopped = true;
        let duration = self.start.elapsed();
        if self.log_level == Level::INFO {
            info!(
                operation = %self.operation,
                duration_ms = duration.as_millis(),
                "Operation completed"
            );
        } else {
            debug!(
                operation = %self.operation,
                duration_ms = duration.as_millis(),
                "Operation completed"
            );
        }
        duration
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if !self.stopped {
            debug!(
                operation = %self.operation,
                duration_ms = self.start.elapsed().as_millis(),
                "Operation abandoned"
            );
        }
    }
}

/// Time a block of code at info level
#[macro_export]
macro_rules! time_operation {
    ($operation:expr, $block:block) => {{
        let _timer = $crate::core::metrics::Timer::start($operation);
        let result = $block;
        _timer.stop();
        result
    }};
}
