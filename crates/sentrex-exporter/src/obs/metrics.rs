//! Minimal metrics registry.
//!
//! Counter/gauge/histogram vectors with dynamic labels backed by `DashMap`.
//! Labels are flattened into sorted key vectors so the same label set always
//! lands on the same series, and series are rendered in sorted order so two
//! renders of the same data are byte-identical.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use super::sample::{Family, Sample, OPEN_ISSUE_BUCKETS};

type LabelKey = Vec<(String, String)>;

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn label_str(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn series(name: &str, labels: &str) -> String {
    if labels.is_empty() {
        name.to_string()
    } else {
        format!("{name}{{{labels}}}")
    }
}

/// Prometheus float formatting (`+Inf`, `-Inf`, `NaN`).
fn fmt_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf".into() } else { "-Inf".into() }
    } else {
        format!("{v}")
    }
}

fn header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn new(v: f64) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }
    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
    fn store(&self, v: f64) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }
    fn add(&self, v: f64) {
        let _ = self.0.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
            Some((f64::from_bits(bits) + v).to_bits())
        });
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self.map.entry(label_key(labels)).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<u64> {
        self.map.get(&label_key(labels)).map(|c| c.load(Ordering::Relaxed))
    }

    fn sorted(&self) -> Vec<(LabelKey, u64)> {
        let mut rows: Vec<_> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load(Ordering::Relaxed)))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        header(out, name, help, "counter");
        for (key, val) in self.sorted() {
            let _ = writeln!(out, "{} {}", series(name, &label_str(&key)), val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicF64>,
}

impl GaugeVec {
    /// Set the series value; the last write wins.
    pub fn set(&self, labels: &[(&str, &str)], v: f64) {
        let gauge = self.map.entry(label_key(labels)).or_insert_with(|| AtomicF64::new(0.0));
        gauge.store(v);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<f64> {
        self.map.get(&label_key(labels)).map(|g| g.load())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn sorted(&self) -> Vec<(LabelKey, f64)> {
        let mut rows: Vec<_> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), r.value().load()))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        header(out, name, help, "gauge");
        for (key, val) in self.sorted() {
            let _ = writeln!(out, "{} {}", series(name, &label_str(&key)), fmt_value(val));
        }
    }
}

struct AtomicHistogram {
    count: AtomicU64,
    sum: AtomicF64,
    buckets: Vec<AtomicU64>,
}

impl AtomicHistogram {
    fn new(n: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicF64::new(0.0),
            buckets: (0..n).map(|_| AtomicU64::new(0)).collect(),
        }
    }
}

/// Point-in-time view of one histogram series.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    /// Cumulative counts per upper bound.
    pub buckets: Vec<(f64, u64)>,
}

pub struct HistogramVec {
    bounds: Vec<f64>,
    map: DashMap<LabelKey, AtomicHistogram>,
}

impl HistogramVec {
    pub fn new(bounds: &[f64]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            map: DashMap::new(),
        }
    }

    /// Observe a value and increment cumulative buckets.
    pub fn observe(&self, labels: &[(&str, &str)], v: f64) {
        let n = self.bounds.len();
        let hist = self.map.entry(label_key(labels)).or_insert_with(|| AtomicHistogram::new(n));

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.add(v);

        // Cumulative Buckets: Increment ALL buckets larger than value
        for (i, &b) in self.bounds.iter().enumerate() {
            if v <= b {
                hist.buckets[i].fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> Option<HistogramSnapshot> {
        self.map.get(&label_key(labels)).map(|h| self.snapshot_of(h.value()))
    }

    fn snapshot_of(&self, hist: &AtomicHistogram) -> HistogramSnapshot {
        HistogramSnapshot {
            count: hist.count.load(Ordering::Relaxed),
            sum: hist.sum.load(),
            buckets: self
                .bounds
                .iter()
                .zip(&hist.buckets)
                .map(|(le, c)| (*le, c.load(Ordering::Relaxed)))
                .collect(),
        }
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, help: &str, out: &mut String) {
        header(out, name, help, "histogram");
        let mut rows: Vec<_> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), self.snapshot_of(r.value())))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, hist) in rows {
            let labels = label_str(&key);
            let prefix = if labels.is_empty() { String::new() } else { format!("{},", labels) };

            for (le, count) in &hist.buckets {
                let _ = writeln!(out, "{}_bucket{{{}le=\"{}\"}} {}", name, prefix, fmt_value(*le), count);
            }
            let _ = writeln!(out, "{}_bucket{{{}le=\"+Inf\"}} {}", name, prefix, hist.count);
            let _ = writeln!(out, "{} {}", series(&format!("{name}_sum"), &labels), fmt_value(hist.sum));
            let _ = writeln!(out, "{} {}", series(&format!("{name}_count"), &labels), hist.count);
        }
    }
}

/// Registry for one collection pass, filled from projected samples.
pub struct SentryMetrics {
    pub open_issues: HistogramVec,
    pub issue_events: GaugeVec,
    pub events: CounterVec,
    pub rate_limit: GaugeVec,
}

impl Default for SentryMetrics {
    fn default() -> Self {
        Self {
            open_issues: HistogramVec::new(&OPEN_ISSUE_BUCKETS),
            issue_events: GaugeVec::default(),
            events: CounterVec::default(),
            rate_limit: GaugeVec::default(),
        }
    }
}

impl SentryMetrics {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let m = Self::default();
        for s in samples {
            m.record(s);
        }
        m
    }

    pub fn record(&self, s: &Sample) {
        let labels = s.labels();
        match s.family {
            Family::OpenIssuesHistogram => self.open_issues.observe(&labels, s.value),
            Family::OpenIssueEvents => self.issue_events.set(&labels, s.value),
            Family::RateLimit => self.rate_limit.set(&labels, s.value),
            Family::Events => self.events.add(&labels, s.value.max(0.0) as u64),
        }
    }

    /// Render every family that received at least one sample.
    pub fn render(&self, out: &mut String) {
        if !self.open_issues.map.is_empty() {
            let f = Family::OpenIssuesHistogram;
            self.open_issues.render(f.name(), f.help(), out);
        }
        if !self.issue_events.is_empty() {
            let f = Family::OpenIssueEvents;
            self.issue_events.render(f.name(), f.help(), out);
        }
        if !self.events.map.is_empty() {
            let f = Family::Events;
            self.events.render(f.name(), f.help(), out);
        }
        if !self.rate_limit.is_empty() {
            let f = Family::RateLimit;
            self.rate_limit.render(f.name(), f.help(), out);
        }
    }
}

/// Process-lifetime exporter self metrics.
#[derive(Default)]
pub struct ExporterMetrics {
    pub scrapes: CounterVec,
    pub cache_lookups: CounterVec,
    pub rebuilds: CounterVec,
    pub collect_duration: GaugeVec, // In Seconds
}

impl ExporterMetrics {
    pub fn render(&self, out: &mut String) {
        self.scrapes.render("sentrex_scrapes_total", "Collection passes served", out);
        self.cache_lookups.render("sentrex_cache_lookups_total", "Snapshot cache lookups by result", out);
        self.rebuilds.render("sentrex_rebuilds_total", "Snapshot rebuilds by result", out);
        self.collect_duration.render(
            "sentrex_collect_duration_seconds",
            "Duration of the last collection pass",
            out,
        );
    }
}
