//! In-memory metrics sink with a Prometheus text rendering.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::contract::{Metrics, Outcome};
use crate::error::Stage;

pub const UPDATES_COUNTER: &str = "ab_sensor_updates_total";

/// Labels of one counter series.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CounterKey {
    pub domain: String,
    pub topic: String,
    pub stage: &'static str,
    pub status: &'static str,
    /// Failure kind, empty on success.
    pub kind: &'static str,
}

#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: Mutex<BTreeMap<CounterKey, u64>>,
    gauges: Mutex<BTreeMap<(String, String), f64>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // Poisoning carries no invariant for plain counters.
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count for `(domain, topic, stage)` with the given status (`success`/`failure`).
    pub fn count(&self, domain: &str, topic: &str, stage: Stage, status: &str) -> u64 {
        lock(&self.counters)
            .iter()
            .filter(|(k, _)| {
                k.domain == domain && k.topic == topic && k.stage == stage.as_str() && k.status == status
            })
            .map(|(_, v)| *v)
            .sum()
    }

    /// Failure count of a given kind across all topics of `domain`.
    pub fn failures(&self, domain: &str, kind: &str) -> u64 {
        lock(&self.counters)
            .iter()
            .filter(|(k, _)| k.domain == domain && k.status == "failure" && k.kind == kind)
            .map(|(_, v)| *v)
            .sum()
    }

    pub fn gauge_value(&self, name: &str, topic: &str) -> Option<f64> {
        lock(&self.gauges).get(&(name.to_string(), topic.to_string())).copied()
    }

    /// Renders every series in the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let counters = lock(&self.counters);
        if !counters.is_empty() {
            let _ = writeln!(out, "# TYPE {UPDATES_COUNTER} counter");
        }
        for (k, v) in counters.iter() {
            let _ = writeln!(
                out,
                "{UPDATES_COUNTER}{{type=\"{}\",topic=\"{}\",stage=\"{}\",status=\"{}\",kind=\"{}\"}} {v}",
                k.domain, k.topic, k.stage, k.status, k.kind
            );
        }
        drop(counters);

        let gauges = lock(&self.gauges);
        let mut last_name: Option<&str> = None;
        for ((name, topic), v) in gauges.iter() {
            if last_name != Some(name.as_str()) {
                let _ = writeln!(out, "# TYPE ab_sensor_{name} gauge");
                last_name = Some(name.as_str());
            }
            let _ = writeln!(out, "ab_sensor_{name}{{topic=\"{topic}\"}} {v}");
        }
        out
    }
}

impl Metrics for InMemoryMetrics {
    fn record(&self, domain: &str, topic: &str, stage: Stage, outcome: Outcome) {
        let kind = match outcome {
            Outcome::Success => "",
            Outcome::Failure(kind) => kind,
        };
        let key = CounterKey {
            domain: domain.to_string(),
            topic: topic.to_string(),
            stage: stage.as_str(),
            status: outcome.status(),
            kind,
        };
        debug!(domain, topic, stage = %stage, status = key.status, kind, "Recorded stage outcome");
        *lock(&self.counters).entry(key).or_insert(0) += 1;
    }

    fn gauge(&self, name: &str, topic: &str, value: f64) {
        debug!(name, topic, value, "Recorded gauge");
        lock(&self.gauges).insert((name.to_string(), topic.to_string()), value);
    }
}
