//! Processing counters
//!
//! Counters are shared between the emitter and the HTTP service and are
//! exposed in the Prometheus text format by the `/metrics` endpoint. Each
//! [`PipelineStats`] owns its own [`Registry`], so emitters never share
//! counters.

use std::collections::BTreeMap;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::processors::ProcessOutcome;

const STAGE_LABEL: &str = "stage";
const OUTCOME_LABEL: &str = "outcome";

/// Per-stage outcome counts
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageCounts {
    pub modified: u64,
    pub skipped: u64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub emitted: u64,
    pub failed: u64,
    pub sink_errors: u64,
    pub stages: BTreeMap<String, StageCounts>,
}

pub struct PipelineStats {
    registry: Registry,
    received: IntCounter,
    emitted: IntCounter,
    failed: IntCounter,
    sink_errors: IntCounter,
    stages: IntCounterVec,
}

impl PipelineStats {
    /// Create the counters and register them on a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let received = register_counter(
            &registry,
            "trackforge_events_received_total",
            "Events accepted for processing",
        )?;
        let emitted = register_counter(
            &registry,
            "trackforge_events_emitted_total",
            "Events delivered to sinks",
        )?;
        let failed = register_counter(
            &registry,
            "trackforge_events_failed_total",
            "Events rejected by a processor",
        )?;
        let sink_errors = register_counter(
            &registry,
            "trackforge_sink_errors_total",
            "Sink delivery failures",
        )?;

        let stages = IntCounterVec::new(
            Opts::new("trackforge_stage_events_total", "Stage outcomes by stage"),
            &[STAGE_LABEL, OUTCOME_LABEL],
        )?;
        registry.register(Box::new(stages.clone()))?;

        Ok(Self {
            registry,
            received,
            emitted,
            failed,
            sink_errors,
            stages,
        })
    }

    pub fn record_received(&self) {
        self.received.inc();
    }

    pub fn record_emitted(&self) {
        self.emitted.inc();
    }

    pub fn record_failed(&self) {
        self.failed.inc();
    }

    pub fn record_sink_error(&self) {
        self.sink_errors.inc();
    }

    /// Count one outcome of the stage called `stage`
    pub fn record_stage(&self, stage: &'static str, outcome: ProcessOutcome) {
        self.stages
            .with_label_values(&[stage, outcome_label(outcome)])
            .inc();
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let mut stages: BTreeMap<String, StageCounts> = BTreeMap::new();

        for family in prometheus::core::Collector::collect(&self.stages) {
            for metric in family.get_metric() {
                let label = |name: &str| {
                    metric
                        .get_label()
                        .iter()
                        .find(|pair| pair.get_name() == name)
                        .map(|pair| pair.get_value().to_string())
                };
                let (Some(stage), Some(outcome)) = (label(STAGE_LABEL), label(OUTCOME_LABEL)) else {
                    continue;
                };

                let value = metric.get_counter().get_value() as u64;
                let counts = stages.entry(stage).or_default();
                match outcome.as_str() {
                    "modified" => counts.modified = value,
                    "skipped" => counts.skipped = value,
                    _ => {},
                }
            }
        }

        StatsSnapshot {
            received: self.received.get(),
            emitted: self.emitted.get(),
            failed: self.failed.get(),
            sink_errors: self.sink_errors.get(),
            stages,
        }
    }

    /// Render the counters in the Prometheus text exposition format
    pub fn render_prometheus(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::internal(format!("Metrics output is not UTF-8: {}", e)))
    }
}

impl std::fmt::Debug for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineStats")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

fn register_counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::new(name, help)?;
    registry.register(Box::new(counter.clone()))?;
    Ok(counter)
}

fn outcome_label(outcome: ProcessOutcome) -> &'static str {
    match outcome {
        ProcessOutcome::Modified => "modified",
        ProcessOutcome::Skipped => "skipped",
    }
}
