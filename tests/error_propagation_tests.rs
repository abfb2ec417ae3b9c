// tests/error_propagation_tests.rs
//! Error conversion, context and fatality across module boundaries

use neurofeedback_core::acquisition::{ChannelSource, SampleChunk, SampleSource, SyntheticConfig, SyntheticSource};
use neurofeedback_core::config::{ConfigError, ConfigLoader};
use neurofeedback_core::error::{NeuroError, NeuroErrorBuilder};
use neurofeedback_core::processing::filters::{FilterError, PowerLineNotchFilter};
use neurofeedback_core::{NeurofeedbackConfig, SignalPipeline};
use ndarray::Array2;
use std::collections::HashMap;

#[test]
fn config_errors_become_fatal_configuration_errors() {
    let err: NeuroError = ConfigError::ValidationError(vec!["epoch too long".into()]).into();
    match &err {
        NeuroError::Configuration { component, reason, context } => {
            assert_eq!(component, "config");
            assert!(reason.contains("epoch too long"));
            assert!(context.file.is_some());
        }
        other => panic!("expected Configuration, got {:?}", other),
    }
    assert!(err.is_fatal());
}

#[test]
fn filter_design_errors_become_configuration_errors() {
    let filter_err = PowerLineNotchFilter::new(200.0, 256.0, 1, 30.0, 1).err().unwrap();
    assert!(matches!(filter_err, FilterError::InvalidParameters(_)));

    let err: NeuroError = filter_err.into();
    assert!(matches!(err, NeuroError::Configuration { .. }));
}

#[test]
fn invalid_env_override_fails_validation() {
    let mut env = HashMap::new();
    env.insert("NF__SIGNAL__OVERLAP_LENGTH_S".to_string(), "1.5".to_string());

    let result = ConfigLoader::with_paths(vec![])
        .with_env_overrides(env)
        .load_validated(256.0);
    match result {
        Err(ConfigError::ValidationError(errors)) => {
            assert!(errors.iter().any(|e| e.contains("Overlap")));
        }
        other => panic!("expected validation error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn pipeline_rejects_sample_rate_below_band_edges() {
    let mut config = NeurofeedbackConfig::default();
    config.signal.notch_enabled = false;
    let err = SignalPipeline::from_config(&config, 40.0).err().unwrap();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("Nyquist"));
}

#[test]
fn per_cycle_errors_are_not_fatal() {
    let insufficient = NeuroErrorBuilder::new("epoch_extractor", "latest").insufficient_data(256, 10);
    let degenerate = NeuroErrorBuilder::new("metric", "derive").degenerate_metric("alpha_relaxation", 0.5, 0.0);
    let dispatch = NeuroErrorBuilder::new("runtime", "dispatch").dispatch_failure("DOWN", "refused");

    for err in [insufficient, degenerate, dispatch] {
        assert!(!err.is_fatal(), "{}", err);
    }
}

#[tokio::test]
async fn invalid_synthetic_source_is_source_unavailable() {
    let config = SyntheticConfig { channel_count: 0, ..SyntheticConfig::default() };
    let err = SyntheticSource::new(config).err().unwrap();
    assert!(matches!(err, NeuroError::SourceUnavailable { .. }));
    assert!(err.is_fatal());
}

#[tokio::test]
async fn sample_rate_change_on_channel_is_fatal() {
    let (sender, mut source) = ChannelSource::bounded(256.0, 2);
    sender
        .send(SampleChunk::new(Array2::zeros((4, 1)), 128.0))
        .await
        .unwrap();

    let err = source.next_chunk().await.unwrap_err();
    assert!(err.is_fatal());
    assert!(err.to_string().contains("sample rate"));
}

#[tokio::test]
async fn dropped_producer_ends_stream() {
    let (sender, mut source) = ChannelSource::bounded(256.0, 2);
    drop(sender);
    assert!(source.next_chunk().await.unwrap().is_none());
}
