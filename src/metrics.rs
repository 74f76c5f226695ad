//! Per-phase latency series, six-bucket histograms and batch windows.
//!
//! A `Recorder` is owned by whoever runs a batch and shared with worker tasks
//! through an `Arc`. Every phase keeps its own series, histogram and window
//! behind its own mutex, so concurrent completions never lose updates.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

pub const BUCKET_COUNT: usize = 6;

/// Width of every bounded bucket.
pub const BUCKET_WIDTH_MS: f64 = 1000.0;

pub const BUCKET_LABELS: [&str; BUCKET_COUNT] = [
    "0-999 ms",
    "1000-1999 ms",
    "2000-2999 ms",
    "3000-3999 ms",
    "4000-4999 ms",
    ">=5000 ms",
];

/// Classifies a duration into its bucket. Buckets are closed-open; the last
/// one is unbounded. NaN and negative inputs land in the first bucket.
pub fn bucket_index(duration_ms: f64) -> usize {
    if duration_ms.is_nan() || duration_ms < BUCKET_WIDTH_MS {
        return 0;
    }
    ((duration_ms / BUCKET_WIDTH_MS) as usize).min(BUCKET_COUNT - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Write,
    Upsert,
    Read,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Write, Phase::Upsert, Phase::Read];

    fn index(self) -> usize {
        match self {
            Phase::Write => 0,
            Phase::Upsert => 1,
            Phase::Read => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Write => "write",
            Phase::Upsert => "upsert",
            Phase::Read => "read",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatencyHistogram {
    counts: [u64; BUCKET_COUNT],
}

impl LatencyHistogram {
    pub fn record(&mut self, duration_ms: f64) {
        self.counts[bucket_index(duration_ms)] += 1;
    }

    pub fn counts(&self) -> &[u64; BUCKET_COUNT] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn buckets(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        BUCKET_LABELS.iter().copied().zip(self.counts.iter().copied())
    }
}

/// First operation start to last operation finish for one phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchWindow {
    pub start: Option<Instant>,
    pub end: Option<Instant>,
}

impl BatchWindow {
    pub fn open(&mut self, at: Instant) {
        if self.start.is_none_or(|start| at < start) {
            self.start = Some(at);
        }
    }

    pub fn close(&mut self, at: Instant) {
        if self.end.is_none_or(|end| at > end) {
            self.end = Some(at);
        }
    }

    pub fn span(&self) -> Option<Duration> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some(end.saturating_duration_since(start)),
            _ => None,
        }
    }
}

/// Copy of one phase's accumulated state, taken for reporting.
#[derive(Debug, Clone, Default)]
pub struct PhaseSnapshot {
    pub durations_ms: Vec<f64>,
    pub histogram: LatencyHistogram,
    pub window: BatchWindow,
}

#[derive(Debug, Default)]
struct PhaseSeries {
    durations_ms: Vec<f64>,
    histogram: LatencyHistogram,
    window: BatchWindow,
}

impl PhaseSeries {
    fn push(&mut self, duration_ms: f64) {
        self.durations_ms.push(duration_ms);
        self.histogram.record(duration_ms);
    }
}

#[derive(Debug, Default)]
pub struct Recorder {
    phases: [Mutex<PhaseSeries>; 3],
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn series(&self, phase: Phase) -> MutexGuard<'_, PhaseSeries> {
        self.phases[phase.index()]
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens the phase window now and returns a timer for one operation.
    pub fn start(self: &Arc<Self>, phase: Phase) -> PhaseTimer {
        let started_at = Instant::now();
        self.series(phase).window.open(started_at);
        PhaseTimer {
            recorder: Arc::clone(self),
            phase,
            started_at,
        }
    }

    /// Appends a duration to the phase's series and bumps exactly one bucket.
    pub fn record(&self, phase: Phase, duration_ms: f64) {
        self.series(phase).push(duration_ms);
    }

    pub fn count(&self, phase: Phase) -> usize {
        self.series(phase).durations_ms.len()
    }

    pub fn snapshot(&self, phase: Phase) -> PhaseSnapshot {
        let series = self.series(phase);
        PhaseSnapshot {
            durations_ms: series.durations_ms.clone(),
            histogram: series.histogram.clone(),
            window: series.window,
        }
    }

    pub fn reset(&self) {
        for phase in Phase::ALL {
            *self.series(phase) = PhaseSeries::default();
        }
    }
}

/// Measures one operation. Consume with `succeeded` or `failed`.
#[must_use = "a timer records nothing unless it is finished"]
pub struct PhaseTimer {
    recorder: Arc<Recorder>,
    phase: Phase,
    started_at: Instant,
}

impl PhaseTimer {
    /// Records the elapsed time as a completed operation.
    pub fn succeeded(self) -> Duration {
        let finished_at = Instant::now();
        let elapsed = finished_at.saturating_duration_since(self.started_at);
        let duration_ms = elapsed.as_secs_f64() * 1000.0;

        let mut series = self.recorder.series(self.phase);
        series.push(duration_ms);
        series.window.close(finished_at);
        elapsed
    }

    /// Advances the window only; failed calls are not timed.
    pub fn failed(self) {
        self.recorder.series(self.phase).window.close(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn bucket_boundaries_are_closed_open() {
        assert_eq!(bucket_index(0.0), 0);
        assert_eq!(bucket_index(999.0), 0);
        assert_eq!(bucket_index(999.999), 0);
        assert_eq!(bucket_index(1000.0), 1);
        assert_eq!(bucket_index(2999.0), 2);
        assert_eq!(bucket_index(3000.0), 3);
        assert_eq!(bucket_index(4999.9), 4);
        assert_eq!(bucket_index(5000.0), 5);
        assert_eq!(bucket_index(120_000.0), 5);
        assert_eq!(bucket_index(f64::INFINITY), 5);
    }

    #[test]
    fn bucket_index_is_total() {
        assert_eq!(bucket_index(-1.0), 0);
        assert_eq!(bucket_index(f64::NAN), 0);
    }

    #[test]
    fn histogram_increments_exactly_one_bucket() {
        let mut histogram = LatencyHistogram::default();
        for ms in [10.0, 1500.0, 1999.0, 5000.0, 8000.0] {
            histogram.record(ms);
        }
        assert_eq!(histogram.counts(), &[1, 2, 0, 0, 0, 2]);
        assert_eq!(histogram.total(), 5);
        assert_eq!(histogram.buckets().next(), Some(("0-999 ms", 1)));
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let recorder = Arc::new(Recorder::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let recorder = recorder.clone();
                thread::spawn(move || {
                    for i in 0..500 {
                        recorder.record(Phase::Write, (worker * 1000 + i) as f64);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("worker thread");
        }

        let snapshot = recorder.snapshot(Phase::Write);
        assert_eq!(snapshot.durations_ms.len(), 4000);
        assert_eq!(snapshot.histogram.total(), 4000);
        assert_eq!(snapshot.histogram.counts()[5], 1500);
        assert_eq!(recorder.count(Phase::Read), 0);
    }

    #[test]
    fn failed_timer_moves_window_but_records_nothing() {
        let recorder = Arc::new(Recorder::new());
        recorder.start(Phase::Upsert).failed();

        let snapshot = recorder.snapshot(Phase::Upsert);
        assert!(snapshot.durations_ms.is_empty());
        assert!(snapshot.window.span().is_some());
    }

    #[test]
    fn window_spans_first_start_to_last_finish() {
        let recorder = Arc::new(Recorder::new());
        let first = recorder.start(Phase::Write);
        let second = recorder.start(Phase::Write);
        thread::sleep(Duration::from_millis(5));
        second.succeeded();
        thread::sleep(Duration::from_millis(5));
        let longest = first.succeeded();

        let snapshot = recorder.snapshot(Phase::Write);
        assert_eq!(snapshot.histogram.total(), 2);
        let span = snapshot.window.span().expect("window closed");
        assert!(span >= longest);
    }

    #[test]
    fn timed_and_raw_samples_land_in_the_same_series() {
        let recorder = Arc::new(Recorder::new());
        recorder.record(Phase::Read, 1500.0);
        let elapsed = recorder.start(Phase::Read).succeeded();

        let snapshot = recorder.snapshot(Phase::Read);
        assert_eq!(snapshot.durations_ms.len(), 2);
        assert_eq!(snapshot.durations_ms[0], 1500.0);
        assert_eq!(snapshot.durations_ms[1], elapsed.as_secs_f64() * 1000.0);
        assert_eq!(snapshot.histogram.total(), 2);
        assert_eq!(snapshot.histogram.counts()[1], 1);
    }

    #[test]
    fn reset_clears_all_phases() {
        let recorder = Arc::new(Recorder::new());
        recorder.start(Phase::Read).succeeded();
        recorder.record(Phase::Write, 3.0);
        recorder.reset();

        for phase in Phase::ALL {
            let snapshot = recorder.snapshot(phase);
            assert!(snapshot.durations_ms.is_empty());
            assert_eq!(snapshot.window, BatchWindow::default());
        }
    }
}
