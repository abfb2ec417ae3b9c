// src/runtime.rs
//! The processing loop
//!
//! One task pulls chunks from the acquisition collaborator, runs them through
//! the [`SignalPipeline`], gates the metric and dispatches events. The loop
//! suspends while waiting for a chunk, during the cooldown and while
//! dispatching; every one of those waits is raced against the stop signal.

use crate::actuation::sink::EventSink;
use crate::acquisition::source::SampleSource;
use crate::config::NeurofeedbackConfig;
use crate::error::{NeuroErrorBuilder, NeuroResult};
use crate::processing::gate::EventGate;
use crate::processing::pipeline::{CycleOutcome, SignalPipeline};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum StopReason {
    #[default]
    EndOfStream,
    Shutdown,
}

/// Counters reported when the loop ends
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub chunks: u64,
    pub cycles: u64,
    pub insufficient_cycles: u64,
    pub degenerate_cycles: u64,
    pub events_emitted: u64,
    pub events_dispatched: u64,
    pub dispatch_failures: u64,
    /// Events emitted by the gate but dropped because a stop arrived first
    pub events_dropped: u64,
    pub rebases: u64,
    pub stop_reason: StopReason,
}

pub struct Runtime {
    config: NeurofeedbackConfig,
    time_provider: Arc<dyn TimeProvider>,
}

/// Resolves once `true` has been published; never resolves if the sender is gone
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Runtime {
    pub fn new(config: NeurofeedbackConfig) -> Self {
        Self {
            config,
            time_provider: Arc::new(MonotonicTimeProvider::new()),
        }
    }

    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    pub fn config(&self) -> &NeurofeedbackConfig {
        &self.config
    }

    /// Run until the source ends or `true` is published on `shutdown`
    ///
    /// Only fatal errors (source unavailable, configuration) are returned.
    /// Every per-cycle condition is logged and the loop continues.
    pub async fn run(
        &self,
        source: &mut dyn SampleSource,
        sink: &dyn EventSink,
        mut shutdown: watch::Receiver<bool>,
    ) -> NeuroResult<RunSummary> {
        let sample_rate_hz = source.sample_rate_hz();
        let mut pipeline = SignalPipeline::new(&self.config, sample_rate_hz, self.time_provider.clone())
            .map_err(|e| {
                error!(error = %e, "pipeline configuration rejected");
                e
            })?;
        let mut gate = EventGate::from_config(&self.config.event);

        let geometry = *pipeline.geometry();
        let channels = self.config.signal.channels.clone();
        let poll_interval = Duration::from_millis(self.config.acquisition.poll_interval_ms);
        let pull_timeout = Duration::from_millis(self.config.acquisition.pull_timeout_ms);

        info!(
            source = source.name(),
            sink = sink.name(),
            sample_rate_hz,
            metric = %pipeline.metric_kind(),
            buffer_samples = geometry.buffer_samples,
            epoch_samples = geometry.epoch_samples,
            shift_samples = geometry.shift_samples,
            history_len = geometry.history_len,
            "processing loop started"
        );

        let mut summary = RunSummary::default();
        let mut degenerate_run: u64 = 0;

        'run: loop {
            let pulled = tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => {
                    summary.stop_reason = StopReason::Shutdown;
                    break 'run;
                }
                pulled = tokio::time::timeout(pull_timeout, source.next_chunk()) => pulled,
            };

            let chunk = match pulled {
                // nothing arrived within the pull timeout
                Err(_) => continue,
                Ok(Ok(Some(chunk))) => chunk,
                Ok(Ok(None)) => {
                    info!(source = source.name(), "source reached end of stream");
                    break 'run;
                }
                Ok(Err(e)) if e.is_fatal() => {
                    error!(error = %e, "acquisition failed");
                    return Err(e);
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "chunk pull failed");
                    continue;
                }
            };
            summary.chunks += 1;

            if chunk.is_empty() {
                tokio::select! {
                    biased;
                    _ = stop_requested(&mut shutdown) => {
                        summary.stop_reason = StopReason::Shutdown;
                        break 'run;
                    }
                    _ = tokio::time::sleep(poll_interval) => continue 'run,
                }
            }

            let samples = chunk.select_channels(&channels).map_err(|e| {
                error!(error = %e, "configured channels not provided by source");
                e
            })?;

            // at most one shift of new samples per cycle
            for piece in samples.chunks(geometry.shift_samples) {
                let outcome = match pipeline.process_chunk(piece) {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_fatal() => {
                        error!(error = %e, "processing failed");
                        return Err(e);
                    }
                    Err(e) => {
                        warn!(error = %e, "cycle skipped");
                        continue;
                    }
                };
                summary.cycles += 1;

                let reading = match outcome {
                    CycleOutcome::Warming { required, available } => {
                        summary.insufficient_cycles += 1;
                        debug!(required, available, "buffer warming up");
                        continue;
                    }
                    CycleOutcome::Degenerate { numerator, denominator, .. } => {
                        summary.degenerate_cycles += 1;
                        if degenerate_run == 0 {
                            warn!(
                                metric = %pipeline.metric_kind(),
                                numerator,
                                denominator,
                                "metric degenerate, skipping baseline and gate"
                            );
                        }
                        degenerate_run += 1;
                        continue;
                    }
                    CycleOutcome::Evaluated(reading) => reading,
                };

                if degenerate_run > 0 {
                    info!(cycles = degenerate_run, "metric finite again");
                    degenerate_run = 0;
                }

                let Some(event) = gate.evaluate(reading.metric, reading.baseline) else {
                    continue;
                };
                summary.events_emitted += 1;
                info!(
                    direction = %event.direction,
                    metric = reading.metric,
                    baseline = reading.baseline,
                    cooldown_ms = gate.cooldown().as_millis() as u64,
                    "event emitted"
                );

                tokio::select! {
                    biased;
                    _ = stop_requested(&mut shutdown) => {
                        gate.complete();
                        summary.events_dropped += 1;
                        summary.stop_reason = StopReason::Shutdown;
                        info!(direction = %event.direction, "stop during cooldown, pending event dropped");
                        break 'run;
                    }
                    _ = tokio::time::sleep(gate.cooldown()) => {}
                }

                let dispatched = tokio::select! {
                    biased;
                    _ = stop_requested(&mut shutdown) => None,
                    result = sink.dispatch(&event) => Some(result),
                };
                gate.complete();

                match dispatched {
                    None => {
                        summary.events_dropped += 1;
                        summary.stop_reason = StopReason::Shutdown;
                        info!(direction = %event.direction, "stop during dispatch, request abandoned");
                        break 'run;
                    }
                    Some(Ok(())) => {
                        summary.events_dispatched += 1;
                        debug!(direction = %event.direction, sink = sink.name(), "event dispatched");
                    }
                    Some(Err(e)) => {
                        summary.dispatch_failures += 1;
                        let err = NeuroErrorBuilder::new("runtime", "dispatch")
                            .with_info("sink", sink.name())
                            .dispatch_failure(event.direction.as_str(), &e.to_string());
                        warn!(error = %err, context = ?err.context().additional_info, "event not delivered");
                    }
                }
            }
        }

        if degenerate_run > 0 {
            info!(cycles = degenerate_run, "run ended while metric degenerate");
        }
        summary.rebases = pipeline.rebase_count();

        let perf = pipeline.get_performance_metrics();
        info!(
            chunks = summary.chunks,
            cycles = summary.cycles,
            events = summary.events_emitted,
            dispatch_failures = summary.dispatch_failures,
            avg_cycle_us = perf.average_processing_time_us,
            max_cycle_us = perf.max_processing_time_us,
            stop_reason = ?summary.stop_reason,
            "processing loop finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuation::sink::RecordingSink;
    use crate::acquisition::source::{ChannelSource, ReplaySource, SampleChunk};
    use crate::error::NeuroError;
    use ndarray::Array2;

    #[tokio::test(start_paused = true)]
    async fn test_end_of_stream_stops_cleanly() {
        let mut source = ReplaySource::from_signal(256.0, &[0.0; 100], 12);
        let sink = RecordingSink::new();
        let (_tx, rx) = watch::channel(false);

        let summary = Runtime::new(NeurofeedbackConfig::default())
            .run(&mut source, &sink, rx)
            .await
            .unwrap();

        assert_eq!(summary.stop_reason, StopReason::EndOfStream);
        assert_eq!(summary.chunks, 9);
        assert_eq!(summary.insufficient_cycles, 9);
        assert_eq!(summary.events_emitted, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_channel_is_fatal() {
        let mut config = NeurofeedbackConfig::default();
        config.signal.channels = vec![3];
        let mut source = ReplaySource::from_signal(256.0, &[0.0; 10], 10);
        let (_tx, rx) = watch::channel(false);

        let result = Runtime::new(config).run(&mut source, &RecordingSink::new(), rx).await;
        assert!(matches!(result, Err(NeuroError::SourceUnavailable { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_waiting_for_chunk() {
        let (_sender, mut source) = ChannelSource::bounded(256.0, 4);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            Runtime::new(NeurofeedbackConfig::default())
                .run(&mut source, &RecordingSink::new(), rx)
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(true).unwrap();

        let summary = handle.await.unwrap().unwrap();
        assert_eq!(summary.stop_reason, StopReason::Shutdown);
        assert_eq!(summary.chunks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_chunks_are_not_cycles() {
        let chunks = vec![
            SampleChunk::new(Array2::zeros((0, 1)), 256.0),
            SampleChunk::new(Array2::zeros((0, 1)), 256.0),
        ];
        let mut source = ReplaySource::new(256.0, chunks);
        let (_tx, rx) = watch::channel(false);

        let summary = Runtime::new(NeurofeedbackConfig::default())
            .run(&mut source, &RecordingSink::new(), rx)
            .await
            .unwrap();
        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.cycles, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_chunks_split_per_shift() {
        // 300 samples with a 51-sample shift: 6 cycles from one chunk
        let mut source = ReplaySource::from_signal(256.0, &[0.0; 300], 300);
        let (_tx, rx) = watch::channel(false);

        let summary = Runtime::new(NeurofeedbackConfig::default())
            .run(&mut source, &RecordingSink::new(), rx)
            .await
            .unwrap();
        assert_eq!(summary.chunks, 1);
        assert_eq!(summary.cycles, 6);
        assert_eq!(summary.insufficient_cycles, 5);
        assert_eq!(summary.degenerate_cycles, 1);
    }
}
