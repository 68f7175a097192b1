use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use archiver_logging::{engine_error, engine_info};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Runs sync cycles forever: `check_interval` after a good cycle,
/// `retry_interval` after a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduler {
    pub check_interval: Duration,
    pub retry_interval: Duration,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerSummary {
    pub cycles: u64,
    pub failures: u64,
}

impl Scheduler {
    pub fn new(check_interval: Duration, retry_interval: Duration) -> Self {
        Self {
            check_interval,
            retry_interval,
        }
    }

    /// Loop until `cancel` fires. A running cycle is never interrupted; the
    /// token is only observed before a cycle and while waiting.
    pub async fn run<F, Fut, T, E>(
        &self,
        cancel: &CancellationToken,
        mut cycle: F,
    ) -> SchedulerSummary
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut summary = SchedulerSummary::default();
        while !cancel.is_cancelled() {
            summary.cycles += 1;
            let wait = match cycle().await {
                Ok(_) => {
                    engine_info!(
                        "Cycle {} complete, next check in {}s",
                        summary.cycles,
                        self.check_interval.as_secs()
                    );
                    self.check_interval
                }
                Err(err) => {
                    summary.failures += 1;
                    engine_error!(
                        "Cycle {} failed: {}; retrying in {}s",
                        summary.cycles,
                        err,
                        self.retry_interval.as_secs()
                    );
                    self.retry_interval
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => {
                    engine_info!("Shutdown requested, stopping scheduler");
                    break;
                }
            }
        }
        summary
    }
}
