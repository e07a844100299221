//! Timer loops driving the collectors.
//!
//! Each loop awaits its cycle inline before waiting for the next tick, so a
//! collector never runs two cycles at once. Missed ticks are delayed rather
//! than replayed in a burst. Cycle failures are logged by the collector and
//! counted here; they never change the cadence.

use std::time::Duration;

use time::{OffsetDateTime, Time, UtcOffset};
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use crate::pipeline::PipelineError;

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// One fetch → parse → persist attempt.
#[async_trait::async_trait]
pub trait Cycle: Send + Sync {
    /// Label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Run one cycle at wall-clock `now`, returning the number of records written.
    async fn run_cycle(&self, now: OffsetDateTime) -> Result<usize, PipelineError>;
}

/// Run one cycle and record its outcome. Errors stop here.
pub async fn run_cycle_once<C: Cycle + ?Sized>(cycle: &C) {
    let name = cycle.name();
    match cycle.run_cycle(OffsetDateTime::now_utc()).await {
        Ok(written) => {
            metrics::counter!("collector_cycles_total", "collector" => name, "outcome" => "ok").increment(1);
            metrics::counter!("collector_records_upserted_total", "collector" => name)
                .increment(written as u64);
        }
        Err(e) => {
            metrics::counter!("collector_cycles_total", "collector" => name, "outcome" => "error")
                .increment(1);
            tracing::debug!(collector = name, error = %e, "cycle failed; waiting for next tick");
        }
    }
}

/// Run `cycle` now and then every `period`, forever.
pub async fn run_fixed_interval<C: Cycle + ?Sized>(cycle: &C, period: Duration) {
    tracing::info!(collector = cycle.name(), period_secs = period.as_secs(), "fixed-interval schedule started");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        // The first tick completes immediately.
        ticker.tick().await;
        run_cycle_once(cycle).await;
    }
}

/// Next instant at wall-clock `at` in `now`'s offset: today if it has not
/// passed yet, otherwise tomorrow.
pub fn next_daily_run(now: OffsetDateTime, at: Time) -> OffsetDateTime {
    let today = now.replace_time(at);
    if now > today {
        today + time::Duration::DAY
    } else {
        today
    }
}

/// Sleep until the next `at` in `offset`, run `cycle`, then repeat every 24 hours.
pub async fn run_daily_at<C: Cycle + ?Sized>(cycle: &C, at: Time, offset: UtcOffset) {
    let now = OffsetDateTime::now_utc().to_offset(offset);
    let next = next_daily_run(now, at);
    let wait = Duration::try_from(next - now).unwrap_or(Duration::ZERO);

    tracing::info!(
        collector = cycle.name(),
        next_run = %next,
        wait_secs = wait.as_secs(),
        "daily schedule started"
    );

    let mut ticker = interval_at(Instant::now() + wait, DAY);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        run_cycle_once(cycle).await;
    }
}
