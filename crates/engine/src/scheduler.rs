//! Runs sessions on a [`Schedule`] until shut down.

use std::{fmt, sync::Arc, time::Duration};

use chrono::{Local, NaiveDateTime, TimeDelta};
use staker_chain::client::ChainClient;
use tokio::{task::JoinSet, time::sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    schedule::{Schedule, ScheduleEntry},
    session::SessionOrchestrator,
};

/// Default interval between two countdown log lines.
pub const DEFAULT_COUNTDOWN_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Source of the current local wall-clock time.
pub type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// The system clock in local time.
pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().naive_local())
}

/// Fires one session per schedule entry per day, plus one right away.
pub struct Scheduler<C> {
    orchestrator: Arc<SessionOrchestrator<C>>,
    schedule: Schedule,
    clock: Clock,
    countdown_interval: Duration,
}

impl<C> fmt::Debug for Scheduler<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("schedule", &self.schedule)
            .field("countdown_interval", &self.countdown_interval)
            .finish_non_exhaustive()
    }
}

impl<C: ChainClient> Scheduler<C> {
    /// Creates a scheduler driven by the local system clock.
    pub fn new(orchestrator: Arc<SessionOrchestrator<C>>, schedule: Schedule) -> Self {
        Self {
            orchestrator,
            schedule,
            clock: local_clock(),
            countdown_interval: DEFAULT_COUNTDOWN_INTERVAL,
        }
    }

    /// Replaces the wall clock.
    pub fn with_clock(self, clock: Clock) -> Self {
        Self { clock, ..self }
    }

    /// Sets how often the time to the next session is logged.
    pub fn with_countdown_interval(self, interval: Duration) -> Self {
        Self {
            countdown_interval: interval,
            ..self
        }
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// Cancellation stops the timers. A session already running is allowed to finish.
    pub async fn start(self, shutdown: CancellationToken) {
        info!(
            frequency = self.schedule.frequency(),
            interval_hours = self.schedule.interval_hours(),
            "starting scheduler"
        );
        if self.schedule.is_uneven() {
            warn!(
                frequency = self.schedule.frequency(),
                "24 is not a multiple of the frequency, the last interval of the day is longer"
            );
        }

        let mut tasks = JoinSet::new();
        for entry in self.schedule.entries() {
            info!(%entry, cron = entry.cron_expression(), "registered session");
            tasks.spawn(trigger_loop(
                self.orchestrator.clone(),
                *entry,
                self.clock.clone(),
                shutdown.clone(),
            ));
        }
        tasks.spawn(countdown_loop(
            self.schedule.clone(),
            self.clock.clone(),
            self.countdown_interval,
            shutdown.clone(),
        ));

        info!("running initial session");
        self.orchestrator.run_session().await.log();

        shutdown.cancelled().await;
        info!("shutting down scheduler");

        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                warn!(%err, "scheduler task did not exit cleanly");
            }
        }
    }
}

async fn trigger_loop<C: ChainClient>(
    orchestrator: Arc<SessionOrchestrator<C>>,
    entry: ScheduleEntry,
    clock: Clock,
    shutdown: CancellationToken,
) {
    let mut last_fired: Option<NaiveDateTime> = None;

    loop {
        let now = clock();
        // a timer waking a little early must not fire the same slot twice
        let reference = last_fired.map_or(now, |fired| fired.max(now));
        let next = entry.next_after(reference);
        let wait = (next - now).to_std().unwrap_or_default();
        debug!(%entry, %next, ?wait, "waiting for next session");

        tokio::select! {
            _ = sleep(wait) => {}
            _ = shutdown.cancelled() => break,
        }

        info!(%entry, "running scheduled session");
        orchestrator.run_session().await.log();
        last_fired = Some(next);
    }
}

async fn countdown_loop(
    schedule: Schedule,
    clock: Clock,
    interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        if let Some((entry, left)) = schedule.countdown(clock()) {
            info!(next = %entry, "next session in {}", format_countdown(left));
        }

        tokio::select! {
            _ = sleep(interval) => {}
            _ = shutdown.cancelled() => break,
        }
    }
}

fn format_countdown(left: TimeDelta) -> String {
    let secs = left.num_seconds().max(0);
    format!("{}h {}m {}s", secs / 3600, secs % 3600 / 60, secs % 60)
}
