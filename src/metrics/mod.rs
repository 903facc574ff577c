//! Case duration metrics
//!
//! - [`GaugeVec`]: injected collector holding the latest value per label
//! - [`push`]: Pushgateway client behind the [`MetricsPusher`] seam
//! - [`reporter`]: records a successful case's duration and pushes it

pub mod push;
pub mod reporter;

pub use push::{Grouping, HttpPushGateway, MetricsPusher};
pub use reporter::{MetricsReporter, ReportOutcome};

use dashmap::DashMap;
use serde::Serialize;
use std::fmt::Write;

/// Series name for case durations
pub const TEST_DURATION_METRIC: &str = "test_duration_seconds";

/// Label carrying the case name on [`TEST_DURATION_METRIC`]
pub const TEST_NAME_LABEL: &str = "test_name";

/// One labelled gauge value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSample {
    pub series_name: String,
    pub label: String,
    pub value: f64,
}

/// Gauge family keyed by a single label
#[derive(Debug)]
pub struct GaugeVec {
    name: String,
    help: String,
    label: String,
    values: DashMap<String, f64>,
}

impl GaugeVec {
    pub fn new(name: impl Into<String>, help: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            label: label.into(),
            values: DashMap::new(),
        }
    }

    /// The `test_duration_seconds{test_name}` family
    pub fn test_duration() -> Self {
        Self::new(
            TEST_DURATION_METRIC,
            "Duration of the test execution, in seconds",
            TEST_NAME_LABEL,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the value for `label_value`, replacing any earlier one
    pub fn set(&self, label_value: &str, value: f64) {
        self.values.insert(label_value.to_string(), value);
    }

    pub fn get(&self, label_value: &str) -> Option<f64> {
        self.values.get(label_value).map(|v| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Current samples sorted by label value
    pub fn samples(&self) -> Vec<MetricSample> {
        let mut samples: Vec<MetricSample> = self
            .values
            .iter()
            .map(|entry| MetricSample {
                series_name: self.name.clone(),
                label: entry.key().clone(),
                value: *entry.value(),
            })
            .collect();
        samples.sort_by(|a, b| a.label.cmp(&b.label));
        samples
    }

    /// Render the family in Prometheus text exposition format
    pub fn encode(&self) -> String {
        let mut output = String::new();
        let _ = writeln!(output, "# HELP {} {}", self.name, escape_help(&self.help));
        let _ = writeln!(output, "# TYPE {} gauge", self.name);

        for sample in self.samples() {
            let _ = writeln!(
                output,
                "{}{{{}=\"{}\"}} {}",
                self.name,
                self.label,
                escape_label_value(&sample.label),
                format_value(sample.value)
            );
        }

        output
    }
}

fn escape_help(help: &str) -> String {
    help.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        value.to_string()
    }
}
