//! Metrics sink boundary.
//!
//! Passes and the pipeline report how much of the migration was automated,
//! how much needs manual follow-up, and what was blocked outright. Metrics
//! are pure observability: nothing in the engine reads them back, and a sink
//! must never influence control flow.

use std::collections::HashMap;
use std::sync::Mutex;

/// How a piece of source ended up after a pass looked at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Rewritten without human involvement.
    Automated,
    /// Left in place (possibly annotated) for manual follow-up.
    Manual,
    /// Could not be migrated at all.
    Blocked,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Automated => "automated",
            Bucket::Manual => "manual",
            Bucket::Blocked => "blocked",
        }
    }
}

/// Rough human effort the bucket represents. Only meaningful for
/// `Automated` (effort saved) and `Manual` (effort remaining).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl Effort {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effort::Low => "low",
            Effort::Medium => "medium",
            Effort::High => "high",
        }
    }
}

/// Label set attached to every counter increment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricLabels {
    pub bucket: Bucket,
    pub effort: Option<Effort>,
    /// Pass id, when the increment originates inside a pass.
    pub pass: Option<&'static str>,
}

impl MetricLabels {
    pub fn automated(effort: Effort, pass: &'static str) -> Self {
        MetricLabels {
            bucket: Bucket::Automated,
            effort: Some(effort),
            pass: Some(pass),
        }
    }

    pub fn manual(effort: Effort, pass: &'static str) -> Self {
        MetricLabels {
            bucket: Bucket::Manual,
            effort: Some(effort),
            pass: Some(pass),
        }
    }

    pub fn blocked() -> Self {
        MetricLabels {
            bucket: Bucket::Blocked,
            effort: None,
            pass: None,
        }
    }

    /// Stable flattened key, e.g. `automated/low/link-component`.
    pub fn key(&self) -> String {
        let mut key = self.bucket.as_str().to_string();
        if let Some(effort) = self.effort {
            key.push('/');
            key.push_str(effort.as_str());
        }
        if let Some(pass) = self.pass {
            key.push('/');
            key.push_str(pass);
        }
        key
    }
}

pub trait MetricsSink: Send + Sync {
    fn increment(&self, labels: &MetricLabels, amount: u64);
}

/// Default sink: drops everything.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _labels: &MetricLabels, _amount: u64) {}
}

/// In-memory sink keyed by the flattened label key. Used by tests and small
/// drivers that print a summary at the end of a run.
#[derive(Debug, Default)]
pub struct CountingMetrics {
    counts: Mutex<HashMap<String, u64>>,
}

impl CountingMetrics {
    pub fn new() -> Self {
        CountingMetrics::default()
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counts
            .lock()
            .expect("metrics lock poisoned")
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Sum across all label sets within one bucket.
    pub fn bucket_total(&self, bucket: Bucket) -> u64 {
        let prefix = bucket.as_str();
        self.counts
            .lock()
            .expect("metrics lock poisoned")
            .iter()
            .filter(|(k, _)| k.as_str() == prefix || k.starts_with(&format!("{}/", prefix)))
            .map(|(_, v)| *v)
            .sum()
    }
}

impl MetricsSink for CountingMetrics {
    fn increment(&self, labels: &MetricLabels, amount: u64) {
        let mut counts = self.counts.lock().expect("metrics lock poisoned");
        *counts.entry(labels.key()).or_insert(0) += amount;
    }
}
