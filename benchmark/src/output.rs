use serde::Serialize;

use docbench::PhaseReport;

#[derive(Serialize)]
pub struct OutputRow {
    pub label: String,
    pub phase: &'static str,
    pub ops: usize,
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub window_ms: f64,
    pub ops_per_sec: Option<f64>,
    pub buckets: Vec<u64>,
}

impl OutputRow {
    pub fn from_report(label: &str, report: &PhaseReport) -> Self {
        let phase = report.phase().label();
        match report.summary() {
            Some(summary) => Self {
                label: label.to_string(),
                phase,
                ops: summary.count,
                min_ms: summary.min_ms,
                max_ms: summary.max_ms,
                mean_ms: summary.mean_ms,
                window_ms: summary
                    .window
                    .map(|w| w.as_secs_f64() * 1000.0)
                    .unwrap_or(0.0),
                ops_per_sec: summary.throughput,
                buckets: summary.histogram.counts().to_vec(),
            },
            None => Self {
                label: label.to_string(),
                phase,
                ops: 0,
                min_ms: 0.0,
                max_ms: 0.0,
                mean_ms: 0.0,
                window_ms: 0.0,
                ops_per_sec: None,
                buckets: Vec::new(),
            },
        }
    }

    pub fn csv_header() -> String {
        let mut header =
            String::from("label,phase,ops,min_ms,max_ms,mean_ms,window_ms,ops_per_sec");
        for idx in 0..docbench::metrics::BUCKET_COUNT {
            header.push_str(&format!(",bucket_{idx}"));
        }
        header
    }

    pub fn to_csv(&self) -> String {
        let throughput = self
            .ops_per_sec
            .map(|ops| format!("{ops:.3}"))
            .unwrap_or_default();
        let mut line = format!(
            "{},{},{},{:.3},{:.3},{:.3},{:.3},{throughput}",
            self.label,
            self.phase,
            self.ops,
            self.min_ms,
            self.max_ms,
            self.mean_ms,
            self.window_ms
        );
        for idx in 0..docbench::metrics::BUCKET_COUNT {
            let count = self.buckets.get(idx).copied().unwrap_or(0);
            line.push_str(&format!(",{count}"));
        }
        line
    }
}
