use crate::logging::{log, LogLevel};
use crate::model::Tier;
use crate::utils::{format_duration, percentage};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    Ok,
    Fail,
    Skip,
}

#[derive(Debug)]
struct ProgressState {
    total: usize,
    log_interval: usize,
    started: Instant,
    ok: usize,
    fail: usize,
    skip: usize,
    current: Option<(Tier, String)>,
}

impl ProgressState {
    fn fresh(total: usize) -> Self {
        Self {
            total,
            log_interval: (total / 10).max(1),
            started: Instant::now(),
            ok: 0,
            fail: 0,
            skip: 0,
            current: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub ok: usize,
    pub fail: usize,
    pub skip: usize,
    pub percent: f64,
    pub current_tier: Option<Tier>,
    pub current_character: Option<String>,
    pub elapsed: Duration,
    /// Linear extrapolation from the average time per processed character.
    pub eta: Option<Duration>,
}

/// Character-level progress shared across workers. Callers may poll [`ProgressTracker::snapshot`]
/// at any time while a build is running.
#[derive(Debug)]
pub struct ProgressTracker {
    state: Mutex<ProgressState>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new(0)
    }
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            state: Mutex::new(ProgressState::fresh(total)),
        }
    }

    /// Clears counters and restarts the clock for a new run.
    pub fn reset(&self, total: usize) {
        *self.lock() = ProgressState::fresh(total);
    }

    /// Marks the character a worker has just picked up.
    pub fn begin(&self, tier: Tier, name: &str) {
        self.lock().current = Some((tier, name.to_string()));
    }

    fn lock(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn record(&self, event: ProgressEvent) -> ProgressSnapshot {
        {
            let mut state = self.lock();
            match event {
                ProgressEvent::Ok => state.ok += 1,
                ProgressEvent::Fail => state.fail += 1,
                ProgressEvent::Skip => state.skip += 1,
            }
        }
        let (snapshot, log_interval) = {
            let state = self.lock();
            (snapshot_of(&state), state.log_interval)
        };
        if snapshot.processed % log_interval == 0 || snapshot.processed == snapshot.total {
            log_progress(&snapshot);
        }
        snapshot
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        snapshot_of(&self.lock())
    }
}

fn snapshot_of(state: &ProgressState) -> ProgressSnapshot {
    let processed = state.ok + state.fail + state.skip;
    let elapsed = state.started.elapsed();
    let eta = if processed == 0 || processed >= state.total {
        None
    } else {
        let per_item = elapsed.as_secs_f64() / processed as f64;
        Some(Duration::from_secs_f64(
            per_item * (state.total - processed) as f64,
        ))
    };
    let (current_tier, current_character) = match &state.current {
        Some((tier, name)) => (Some(*tier), Some(name.clone())),
        None => (None, None),
    };
    ProgressSnapshot {
        processed,
        total: state.total,
        ok: state.ok,
        fail: state.fail,
        skip: state.skip,
        percent: percentage(processed, state.total),
        current_tier,
        current_character,
        elapsed,
        eta,
    }
}

fn log_progress(s: &ProgressSnapshot) {
    let eta = s
        .eta
        .map(|d| format!(" | ETA {}", format_duration(d)))
        .unwrap_or_default();
    log(
        LogLevel::Info,
        &format!(
            "Characters progress: {}/{} ({:.1}%) [OK: {}, Fail: {}, Skip: {}]{}",
            s.processed, s.total, s.percent, s.ok, s.fail, s.skip, eta
        ),
    );
}
