//! Poll scheduler.
//!
//! Drives the extraction loop:
//!
//! ```text
//! Idle -> Running -> Sleeping -> Running -> ... -> Stopped
//!            |                                       ^
//!            +----- one-shot, stop, or fatal --------+
//! ```
//!
//! Stop requests arrive through a [`CancellationToken`]. The token is checked
//! before every cycle and before every sleep, and it wakes a sleep early. A
//! cycle that is already running is never interrupted.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// One unit of work repeated by the scheduler.
#[async_trait]
pub trait PollCycle: Send {
    async fn run_cycle(&mut self) -> Result<()>;
}

/// Scheduler states, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Sleeping,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Sleeping => "sleeping",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Counts reported when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub cycles_completed: u64,
    pub cycles_failed: u64,
}

impl ScheduleReport {
    pub fn cycles_run(&self) -> u64 {
        self.cycles_completed + self.cycles_failed
    }
}

pub struct PollScheduler {
    interval: Option<Duration>,
    stop_on_error: bool,
    cancel: CancellationToken,
    state: SchedulerState,
}

impl PollScheduler {
    /// Create a scheduler. `None` as interval runs exactly one cycle.
    pub fn new(interval: Option<Duration>, cancel: CancellationToken) -> Self {
        Self {
            interval,
            stop_on_error: false,
            cancel,
            state: SchedulerState::Idle,
        }
    }

    /// Stop the loop on the first failed cycle instead of waiting for the
    /// next tick.
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    fn transition(&mut self, next: SchedulerState) {
        debug!("Scheduler {} -> {}", self.state, next);
        self.state = next;
    }

    /// Run cycles until one-shot completion, a stop request, or a fatal error.
    ///
    /// In one-shot mode a failed cycle is returned as the error. In interval
    /// mode a failed cycle is logged and the loop waits for the next tick,
    /// unless stop-on-error is set.
    pub async fn run<C: PollCycle>(&mut self, cycle: &mut C) -> Result<ScheduleReport> {
        let mut report = ScheduleReport::default();
        let result = self.run_loop(cycle, &mut report).await;
        self.transition(SchedulerState::Stopped);
        info!(
            "Scheduler stopped after {} cycles ({} failed)",
            report.cycles_run(),
            report.cycles_failed
        );
        result.map(|()| report)
    }

    async fn run_loop<C: PollCycle>(
        &mut self,
        cycle: &mut C,
        report: &mut ScheduleReport,
    ) -> Result<()> {
        loop {
            if self.cancel.is_cancelled() {
                info!("Stop requested, not starting another cycle");
                return Ok(());
            }

            self.transition(SchedulerState::Running);
            let started = Instant::now();
            match cycle.run_cycle().await {
                Ok(()) => report.cycles_completed += 1,
                Err(e) => {
                    report.cycles_failed += 1;
                    if self.interval.is_none() || self.stop_on_error {
                        return Err(e);
                    }
                    error!("Extraction cycle failed, retrying on the next tick: {e:#}");
                }
            }

            let Some(interval) = self.interval else {
                return Ok(());
            };

            let elapsed = started.elapsed();
            let remaining = interval.saturating_sub(elapsed);
            if remaining.is_zero() {
                if !interval.is_zero() {
                    warn!(
                        "Cycle took {:?}, longer than the {:?} interval; starting the next one immediately",
                        elapsed, interval
                    );
                }
                // Let a pending stop request run before the next cycle starts
                tokio::task::yield_now().await;
                continue;
            }

            if self.cancel.is_cancelled() {
                info!("Stop requested, skipping sleep");
                return Ok(());
            }

            self.transition(SchedulerState::Sleeping);
            debug!("Sleeping {:?} until the next cycle", remaining);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Stop requested during sleep");
                    return Ok(());
                }
                _ = tokio::time::sleep(remaining) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the (virtual) instant of every run and fails on request.
    struct CountingCycle {
        runs: Vec<Instant>,
        fail_on: Vec<usize>,
        work: Duration,
    }

    impl CountingCycle {
        fn new() -> Self {
            Self {
                runs: Vec::new(),
                fail_on: Vec::new(),
                work: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl PollCycle for CountingCycle {
        async fn run_cycle(&mut self) -> Result<()> {
            let n = self.runs.len();
            self.runs.push(Instant::now());
            if !self.work.is_zero() {
                tokio::time::sleep(self.work).await;
            }
            if self.fail_on.contains(&n) {
                anyhow::bail!("cycle {n} failed");
            }
            Ok(())
        }
    }

    fn cancel_after(token: &CancellationToken, after: Duration) {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            token.cancel();
        });
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_runs_exactly_once() {
        let mut cycle = CountingCycle::new();
        let mut scheduler = PollScheduler::new(None, CancellationToken::new());

        let report = scheduler.run(&mut cycle).await.unwrap();

        assert_eq!(report.cycles_completed, 1);
        assert_eq!(cycle.runs.len(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_shot_failure_is_returned() {
        let mut cycle = CountingCycle::new();
        cycle.fail_on = vec![0];
        let mut scheduler = PollScheduler::new(None, CancellationToken::new());

        let err = scheduler.run(&mut cycle).await.unwrap_err();
        assert!(err.to_string().contains("cycle 0 failed"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_sleep_exits_promptly() {
        let token = CancellationToken::new();
        let mut cycle = CountingCycle::new();
        let mut scheduler = PollScheduler::new(Some(Duration::from_secs(3)), token.clone());

        let start = Instant::now();
        cancel_after(&token, Duration::from_secs(4));
        let report = scheduler.run(&mut cycle).await.unwrap();

        assert_eq!(report.cycles_completed, 2);
        assert_eq!(cycle.runs.len(), 2);
        assert_eq!(cycle.runs[0] - start, Duration::ZERO);
        assert_eq!(cycle.runs[1] - start, Duration::from_secs(3));
        // Woken by the stop signal, not by the end of the second sleep at 6s
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_subtracts_cycle_duration() {
        let token = CancellationToken::new();
        let mut cycle = CountingCycle::new();
        cycle.work = Duration::from_secs(1);
        let mut scheduler = PollScheduler::new(Some(Duration::from_secs(5)), token.clone());

        let start = Instant::now();
        cancel_after(&token, Duration::from_secs(12));
        scheduler.run(&mut cycle).await.unwrap();

        let offsets: Vec<Duration> = cycle.runs.iter().map(|t| *t - start).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_secs(5),
                Duration::from_secs(10)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrunning_cycle_starts_next_immediately() {
        let token = CancellationToken::new();
        let mut cycle = CountingCycle::new();
        cycle.work = Duration::from_secs(4);
        let mut scheduler = PollScheduler::new(Some(Duration::from_secs(3)), token.clone());

        let start = Instant::now();
        cancel_after(&token, Duration::from_secs(10));
        scheduler.run(&mut cycle).await.unwrap();

        let offsets: Vec<Duration> = cycle.runs.iter().map(|t| *t - start).collect();
        // The cycle in flight at 10s finishes; no new one starts afterwards
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_secs(4),
                Duration::from_secs(8)
            ]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_runs_back_to_back() {
        let token = CancellationToken::new();
        let mut cycle = CountingCycle::new();
        cycle.work = Duration::from_secs(2);
        let mut scheduler = PollScheduler::new(Some(Duration::ZERO), token.clone());

        let start = Instant::now();
        cancel_after(&token, Duration::from_secs(5));
        let report = scheduler.run(&mut cycle).await.unwrap();

        let offsets: Vec<Duration> = cycle.runs.iter().map(|t| *t - start).collect();
        assert_eq!(
            offsets,
            vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
        assert_eq!(report.cycles_completed, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_keeps_looping_in_interval_mode() {
        let token = CancellationToken::new();
        let mut cycle = CountingCycle::new();
        cycle.fail_on = vec![0];
        let mut scheduler = PollScheduler::new(Some(Duration::from_secs(2)), token.clone());

        cancel_after(&token, Duration::from_secs(3));
        let report = scheduler.run(&mut cycle).await.unwrap();

        assert_eq!(report.cycles_failed, 1);
        assert_eq!(report.cycles_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_on_error_ends_the_loop() {
        let token = CancellationToken::new();
        let mut cycle = CountingCycle::new();
        cycle.fail_on = vec![1];
        let mut scheduler =
            PollScheduler::new(Some(Duration::from_secs(2)), token).with_stop_on_error(true);

        let err = scheduler.run(&mut cycle).await.unwrap_err();
        assert!(err.to_string().contains("cycle 1 failed"));
        assert_eq!(cycle.runs.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_runs_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let mut cycle = CountingCycle::new();
        let mut scheduler = PollScheduler::new(Some(Duration::from_secs(2)), token);

        let report = scheduler.run(&mut cycle).await.unwrap();
        assert_eq!(report.cycles_run(), 0);
        assert!(cycle.runs.is_empty());
    }
}
