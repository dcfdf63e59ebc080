//! Configuration for the transfer controller

use std::time::Duration;

/// Timing configuration for transfer record visibility.
///
/// Terminal transfer records stay readable for a bounded window so UI
/// observers polling
/// [`get_transfer_progress`](crate::transfer::TransferController::get_transfer_progress)
/// are guaranteed to see the terminal state before the controller resets.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// How long a `Completed` or `Failed` record stays visible before the
    /// controller resets to no active record
    pub completion_clear_delay: Duration,
    /// How long a `Canceled` record stays visible
    pub cancel_clear_delay: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            completion_clear_delay: Duration::from_secs(5),
            cancel_clear_delay: Duration::from_secs(3),
        }
    }
}

impl TransferConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the visibility window for completed and failed records
    pub fn with_completion_clear_delay(mut self, delay: Duration) -> Self {
        self.completion_clear_delay = delay;
        self
    }

    /// Set the visibility window for canceled records
    pub fn with_cancel_clear_delay(mut self, delay: Duration) -> Self {
        self.cancel_clear_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = TransferConfig::new()
            .with_completion_clear_delay(Duration::from_millis(100))
            .with_cancel_clear_delay(Duration::from_millis(50));
        assert_eq!(config.completion_clear_delay, Duration::from_millis(100));
        assert_eq!(config.cancel_clear_delay, Duration::from_millis(50));
    }
}
