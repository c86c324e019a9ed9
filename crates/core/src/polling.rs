//! Client-side report polling.
//!
//! [`PollCycle`] is the pure state machine deciding when a run is over;
//! [`run_cycle`] drives it on a tokio interval against any
//! [`ReportSource`]. A shared [`CycleCounter`] lets a newer cycle abandon an
//! older one: the old loop notices its id is stale and discards whatever
//! response it was waiting for.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::reports::{Report, ReportPoll};

/// Timing constants of a poll cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between polls.
    pub interval: Duration,
    /// Hard ceiling measured from the first poll.
    pub ceiling: Duration,
    /// Consecutive not-running polls, before running was ever seen, after
    /// which the run is assumed never to have started.
    pub idle_strike_limit: u32,
    /// Wait before the first poll so the server can reset its output dir.
    pub settle_delay: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            ceiling: Duration::from_secs(50),
            idle_strike_limit: 5,
            settle_delay: Duration::from_secs(5),
        }
    }
}

/// Why a cycle stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The run was observed to end.
    JobFinished,
    /// No evidence the run ever started within the idle grace period.
    NeverStarted,
    /// The hard ceiling elapsed.
    TimedOut,
    /// The server reports a different run than the one being watched.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    Continue,
    Stop(StopReason),
}

/// State of one poll cycle.
#[derive(Debug, Clone)]
pub struct PollCycle {
    settings: PollSettings,
    expected_run: Option<Uuid>,
    known_files: BTreeSet<String>,
    reports: Vec<Report>,
    saw_running: bool,
    idle_strikes: u32,
    polls: u32,
}

impl PollCycle {
    /// Start a cycle. With `expected_run` set, a poll reporting that run as
    /// no longer running ends the cycle at once.
    pub fn new(settings: PollSettings, expected_run: Option<Uuid>) -> Self {
        Self {
            settings,
            expected_run,
            known_files: BTreeSet::new(),
            reports: Vec::new(),
            saw_running: false,
            idle_strikes: 0,
            polls: 0,
        }
    }

    /// Filenames already received, to send with the next poll.
    pub fn known_files(&self) -> Vec<String> {
        self.known_files.iter().cloned().collect()
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn into_reports(self) -> Vec<Report> {
        self.reports
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn saw_running(&self) -> bool {
        self.saw_running
    }

    pub fn idle_strikes(&self) -> u32 {
        self.idle_strikes
    }

    /// Fold one poll response into the cycle and decide whether to go on.
    ///
    /// `elapsed` is measured from the first poll of the cycle.
    pub fn observe(&mut self, poll: ReportPoll, elapsed: Duration) -> PollDecision {
        self.polls += 1;

        for file in poll.delta.new_files {
            self.known_files.insert(file);
        }
        self.reports.extend(poll.delta.new_reports);

        self.saw_running |= poll.running;
        if poll.running {
            self.idle_strikes = 0;
        } else {
            self.idle_strikes += 1;
        }

        if elapsed >= self.settings.ceiling {
            return PollDecision::Stop(StopReason::TimedOut);
        }

        if let (Some(expected), Some(reported)) = (self.expected_run, poll.run_id) {
            if expected != reported {
                return PollDecision::Stop(StopReason::Superseded);
            }
            if !poll.running {
                return PollDecision::Stop(StopReason::JobFinished);
            }
        }

        if self.saw_running && !poll.running {
            return PollDecision::Stop(StopReason::JobFinished);
        }
        if !self.saw_running && self.idle_strikes >= self.settings.idle_strike_limit {
            return PollDecision::Stop(StopReason::NeverStarted);
        }
        PollDecision::Continue
    }
}

// ---------------------------------------------------------------------------
// Cycle invalidation
// ---------------------------------------------------------------------------

/// Monotonic cycle id shared by everything that may start a cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleCounter(Arc<AtomicU64>);

impl CycleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle, invalidating every earlier token.
    pub fn begin(&self) -> CycleToken {
        let id = self.0.fetch_add(1, Ordering::SeqCst) + 1;
        CycleToken {
            id,
            counter: Arc::clone(&self.0),
        }
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Identity of one cycle, captured when it began.
#[derive(Debug, Clone)]
pub struct CycleToken {
    id: u64,
    counter: Arc<AtomicU64>,
}

impl CycleToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.id
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Anything that can answer a report poll.
#[async_trait]
pub trait ReportSource: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn poll_reports(&self, known: &[String]) -> Result<ReportPoll, Self::Error>;
}

/// How a driven cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Finished {
        reason: StopReason,
        reports: Vec<Report>,
        polls: u32,
    },
    /// A newer cycle began; nothing from this one was kept.
    Abandoned,
}

/// Poll `source` until the cycle stops or is superseded.
///
/// A failed poll ends the cycle with the source's error.
pub async fn run_cycle<S: ReportSource>(
    source: &S,
    settings: PollSettings,
    expected_run: Option<Uuid>,
    token: CycleToken,
) -> Result<CycleOutcome, S::Error> {
    if !settings.settle_delay.is_zero() {
        tokio::time::sleep(settings.settle_delay).await;
    }

    let mut cycle = PollCycle::new(settings, expected_run);
    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started, settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        if !token.is_current() {
            tracing::debug!(cycle = token.id(), "Poll cycle superseded");
            return Ok(CycleOutcome::Abandoned);
        }

        let poll = source.poll_reports(&cycle.known_files()).await?;

        if !token.is_current() {
            tracing::debug!(cycle = token.id(), "Discarding stale poll response");
            return Ok(CycleOutcome::Abandoned);
        }

        if let PollDecision::Stop(reason) = cycle.observe(poll, started.elapsed()) {
            tracing::debug!(
                cycle = token.id(),
                ?reason,
                polls = cycle.polls(),
                reports = cycle.reports().len(),
                "Poll cycle stopped",
            );
            let polls = cycle.polls();
            return Ok(CycleOutcome::Finished {
                reason,
                reports: cycle.into_reports(),
                polls,
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
