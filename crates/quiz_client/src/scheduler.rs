//! Show discovery: poll the schedule until a broadcast is live.
//!
//! ```text
//! POLLING ─┬─ transient error ──> sleep(retry) ──> POLLING
//!          ├─ auth invalid ─────> Err (fatal)
//!          ├─ no show, far ─────> jittered sleep, waiting every ≤5s ──> POLLING
//!          ├─ no show, near ────> sleep(near poll) ──> POLLING
//!          └─ live ─────────────> Ok(address)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::config::TimingConfig;
use common::{Error, Notification, Reporter, ShowSchedule};
use rand::Rng;
use tracing::{info, warn};

use crate::rest::QuizRestClient;

// ── Seams ─────────────────────────────────────────────────────────────

/// Anything that can report the current show schedule.
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    async fn fetch_schedule(&self) -> Result<ShowSchedule, Error>;
}

#[async_trait]
impl ScheduleSource for QuizRestClient {
    async fn fetch_schedule(&self) -> Result<ShowSchedule, Error> {
        self.get_schedule().await
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ── Policy ────────────────────────────────────────────────────────────

/// A sleep length, fixed or drawn uniformly from a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    Jittered { min: Duration, max: Duration },
}

impl Backoff {
    pub fn delay(&self) -> Duration {
        match *self {
            Backoff::Fixed(d) => d,
            Backoff::Jittered { min, max } if max > min => {
                let millis = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(millis as u64)
            }
            Backoff::Jittered { min, .. } => min,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerPolicy {
    pub transient_retry: Backoff,
    pub near_poll: Backoff,
    pub far_wait: Backoff,
    /// Shows further away than this use `far_wait`.
    pub far_threshold: Duration,
    /// Longest gap between two waiting notifications.
    pub waiting_report_interval: Duration,
}

impl SchedulerPolicy {
    pub fn from_timing(timing: &TimingConfig) -> Self {
        Self {
            transient_retry: Backoff::Fixed(Duration::from_secs(timing.poll_retry_secs)),
            near_poll: Backoff::Fixed(Duration::from_secs(timing.near_show_poll_secs)),
            far_wait: Backoff::Jittered {
                min: Duration::from_secs(timing.far_sleep_min_secs),
                max: Duration::from_secs(timing.far_sleep_max_secs),
            },
            far_threshold: Duration::from_secs(timing.far_show_threshold_secs),
            waiting_report_interval: Duration::from_secs(timing.waiting_report_secs.max(1)),
        }
    }
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self::from_timing(&TimingConfig::default())
    }
}

// ── Scheduler ─────────────────────────────────────────────────────────

pub struct ShowScheduler<S, R> {
    source: S,
    reporter: R,
    policy: SchedulerPolicy,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
}

impl<S: ScheduleSource, R: Reporter> ShowScheduler<S, R> {
    pub fn new(source: S, reporter: R, policy: SchedulerPolicy) -> Self {
        Self {
            source,
            reporter,
            policy,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock and sleep implementation.
    pub fn with_time(mut self, sleeper: Arc<dyn Sleeper>, clock: Arc<dyn Clock>) -> Self {
        self.sleeper = sleeper;
        self.clock = clock;
        self
    }

    /// Block until a broadcast is joinable and return its socket address.
    ///
    /// Only a rejected credential ends the loop with an error.
    pub async fn find_live_address(&self) -> Result<String, Error> {
        loop {
            let schedule = match self.source.fetch_schedule().await {
                Ok(schedule) => schedule,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    let delay = self.policy.transient_retry.delay();
                    warn!("Schedule poll failed: {} (retrying in {:?})", e, delay);
                    self.sleeper.sleep(delay).await;
                    continue;
                }
            };

            if let Some(address) = schedule.live_address {
                info!("📡 Broadcast is live: {}", address);
                return Ok(address);
            }

            if self.is_far(&schedule) {
                let mut left = self.policy.far_wait.delay();
                info!(
                    "⏳ Next show at {:?} ({}); sleeping {}s",
                    schedule.next_show_time,
                    schedule.next_show_prize.as_deref().unwrap_or("no prize listed"),
                    left.as_secs()
                );
                while !left.is_zero() {
                    self.report_waiting(&schedule);
                    let step = left.min(self.policy.waiting_report_interval);
                    self.sleeper.sleep(step).await;
                    left -= step;
                }
            } else {
                self.report_waiting(&schedule);
                self.sleeper.sleep(self.policy.near_poll.delay()).await;
            }
        }
    }

    fn is_far(&self, schedule: &ShowSchedule) -> bool {
        let Some(next) = schedule.next_show_time else {
            return false;
        };
        let remaining_ms = (next - self.clock.now()).num_milliseconds();
        remaining_ms > self.policy.far_threshold.as_millis() as i64
    }

    fn report_waiting(&self, schedule: &ShowSchedule) {
        self.reporter.notify(Notification::Waiting {
            next_game: schedule.next_show_time,
            prize: schedule.next_show_prize.clone(),
        });
    }
}
