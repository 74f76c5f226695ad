use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::metrics::{LatencyHistogram, Phase, PhaseSnapshot, Recorder};

/// Aggregate statistics for one phase with at least one timed operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSummary {
    pub phase: Phase,
    pub count: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    /// Wall-clock span from the first operation start to the last finish.
    #[serde(skip)]
    pub window: Option<Duration>,
    /// Operations per second over `window`; `None` when the span is zero.
    pub throughput: Option<f64>,
    pub histogram: LatencyHistogram,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseReport {
    NoData(Phase),
    Data(PhaseSummary),
}

impl PhaseReport {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseReport::NoData(phase) => *phase,
            PhaseReport::Data(summary) => summary.phase,
        }
    }

    pub fn summary(&self) -> Option<&PhaseSummary> {
        match self {
            PhaseReport::NoData(_) => None,
            PhaseReport::Data(summary) => Some(summary),
        }
    }
}

pub fn summarize(recorder: &Recorder, phase: Phase) -> PhaseReport {
    summarize_snapshot(phase, &recorder.snapshot(phase))
}

pub fn summarize_snapshot(phase: Phase, snapshot: &PhaseSnapshot) -> PhaseReport {
    let durations = &snapshot.durations_ms;
    if durations.is_empty() {
        return PhaseReport::NoData(phase);
    }

    let count = durations.len();
    let min_ms = durations.iter().copied().fold(f64::INFINITY, f64::min);
    let max_ms = durations.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean_ms = durations.iter().sum::<f64>() / count as f64;

    let window = snapshot.window.span();
    let throughput = window
        .map(|span| span.as_secs_f64())
        .filter(|secs| *secs > 0.0)
        .map(|secs| count as f64 / secs);

    PhaseReport::Data(PhaseSummary {
        phase,
        count,
        min_ms,
        max_ms,
        mean_ms,
        window,
        throughput,
        histogram: snapshot.histogram.clone(),
    })
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = match self {
            PhaseReport::NoData(phase) => return write!(f, "{phase:<7} no data"),
            PhaseReport::Data(summary) => summary,
        };

        write!(
            f,
            "{:<7} ops={} min={:.2}ms max={:.2}ms mean={:.2}ms",
            summary.phase, summary.count, summary.min_ms, summary.max_ms, summary.mean_ms
        )?;
        match (summary.throughput, summary.window) {
            (Some(ops), Some(window)) => write!(f, " throughput={ops:.2} ops/s over {window:.2?}")?,
            _ => write!(f, " throughput=n/a")?,
        }
        for (label, count) in summary.histogram.buckets() {
            write!(f, "\n  {label:<13}: {count}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::metrics::BatchWindow;

    fn snapshot(durations: &[f64], span: Option<Duration>) -> PhaseSnapshot {
        let mut histogram = LatencyHistogram::default();
        for d in durations {
            histogram.record(*d);
        }
        let window = match span {
            Some(span) => {
                let start = Instant::now();
                BatchWindow {
                    start: Some(start),
                    end: Some(start + span),
                }
            }
            None => BatchWindow::default(),
        };
        PhaseSnapshot {
            durations_ms: durations.to_vec(),
            histogram,
            window,
        }
    }

    #[test]
    fn empty_series_reports_no_data() {
        let report = summarize_snapshot(Phase::Read, &PhaseSnapshot::default());
        assert_eq!(report, PhaseReport::NoData(Phase::Read));
        assert_eq!(report.to_string(), "read    no data");
    }

    #[test]
    fn summary_uses_wall_clock_window_for_throughput() {
        let report = summarize_snapshot(
            Phase::Write,
            &snapshot(&[100.0, 300.0, 1200.0, 400.0], Some(Duration::from_secs(2))),
        );
        let summary = report.summary().expect("data");
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min_ms, 100.0);
        assert_eq!(summary.max_ms, 1200.0);
        assert_eq!(summary.mean_ms, 500.0);
        assert_eq!(summary.throughput, Some(2.0));
        assert_eq!(summary.histogram.counts(), &[3, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn zero_span_has_no_throughput() {
        let report = summarize_snapshot(Phase::Upsert, &snapshot(&[5.0], Some(Duration::ZERO)));
        let summary = report.summary().expect("data");
        assert_eq!(summary.throughput, None);
        assert!(report.to_string().contains("throughput=n/a"));
    }

    #[test]
    fn display_lists_all_buckets() {
        let report = summarize_snapshot(
            Phase::Write,
            &snapshot(&[10.0, 6000.0], Some(Duration::from_millis(500))),
        );
        let text = report.to_string();
        assert_eq!(text.lines().count(), 7);
        assert!(text.contains(">=5000 ms"));
        assert!(text.contains("throughput=4.00 ops/s"));
    }
}
