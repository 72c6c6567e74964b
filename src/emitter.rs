//! Event emission
//!
//! The [`Emitter`] is the entry point for producers: it runs the pipeline,
//! delivers the canonical event to the tracking sinks and an annotated copy
//! to the analytics sinks.

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::models::Event;
use crate::processors::{GoogleAnalyticsProcessor, Pipeline};
use crate::sink::{EventSink, JsonLinesSink, TracingSink};
use crate::stats::PipelineStats;

pub struct Emitter {
    pipeline: Pipeline,
    analytics: GoogleAnalyticsProcessor,
    canonical_sinks: Vec<Box<dyn EventSink>>,
    analytics_sinks: Vec<Box<dyn EventSink>>,
    stats: Arc<PipelineStats>,
}

impl Emitter {
    /// An emitter with no sinks; processed events are only returned
    pub fn new(pipeline: Pipeline) -> Result<Self> {
        let stats = Arc::new(PipelineStats::new()?);
        Ok(Self {
            pipeline: pipeline.with_stats(stats.clone()),
            analytics: GoogleAnalyticsProcessor,
            canonical_sinks: Vec::new(),
            analytics_sinks: Vec::new(),
            stats,
        })
    }

    /// Pipeline and sinks as described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut emitter = Self::new(Pipeline::from_config(&config.processing))?;

        emitter = match &config.sinks.tracking_log_path {
            Some(path) => emitter.with_canonical_sink(JsonLinesSink::open("tracking_log", path)?),
            None => emitter.with_canonical_sink(TracingSink::new("tracking_log")),
        };
        if let Some(path) = &config.sinks.analytics_log_path {
            emitter = emitter.with_analytics_sink(JsonLinesSink::open("analytics_log", path)?);
        }

        Ok(emitter)
    }

    pub fn with_canonical_sink<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.canonical_sinks.push(Box::new(sink));
        self
    }

    pub fn with_analytics_sink<S: EventSink + 'static>(mut self, sink: S) -> Self {
        self.analytics_sinks.push(Box::new(sink));
        self
    }

    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Process `event` and deliver it to every sink.
    ///
    /// Delivery is attempted on all sinks even if one of them fails; the
    /// first failure is returned.
    pub fn emit(&self, event: Event) -> Result<Event> {
        self.stats.record_received();
        let event = self.pipeline.process(event)?;

        let mut first_error = None;
        for sink in &self.canonical_sinks {
            self.deliver(sink.as_ref(), &event, &mut first_error);
        }
        if !self.analytics_sinks.is_empty() {
            let annotated = self.analytics.annotate(&event);
            for sink in &self.analytics_sinks {
                self.deliver(sink.as_ref(), &annotated, &mut first_error);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => {
                self.stats.record_emitted();
                Ok(event)
            },
        }
    }

    /// Emit each event independently
    pub fn emit_batch(&self, events: Vec<Event>) -> Vec<Result<Event>> {
        events.into_iter().map(|event| self.emit(event)).collect()
    }

    fn deliver(&self, sink: &dyn EventSink, event: &Event, first_error: &mut Option<crate::error::Error>) {
        if let Err(err) = sink.send(event) {
            crate::log_error!(err, "Sink delivery failed", sink = sink.name());
            self.stats.record_sink_error();
            first_error.get_or_insert(err);
        }
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |sinks: &[Box<dyn EventSink>]| sinks.iter().map(|s| s.name()).collect::<Vec<_>>();
        f.debug_struct("Emitter")
            .field("pipeline", &self.pipeline)
            .field("canonical_sinks", &names(&self.canonical_sinks))
            .field("analytics_sinks", &names(&self.analytics_sinks))
            .finish()
    }
}
