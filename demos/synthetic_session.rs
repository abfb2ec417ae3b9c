//! Synthetic neurofeedback session
//!
//! Streams a modulated alpha rhythm through the full loop for a minute of
//! signal and prints every event the gate emits. Acquisition runs as its own
//! task and hands chunks over an ordered channel.
//!
//! ```text
//! cargo run --example synthetic_session
//! ```

use neurofeedback_core::acquisition::{ChannelSource, SampleSource, SyntheticConfig, SyntheticSource};
use neurofeedback_core::actuation::RecordingSink;
use neurofeedback_core::{NeurofeedbackConfig, Runtime};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let synthetic = SyntheticConfig {
        duration_s: Some(60.0),
        realtime: false,
        ..SyntheticConfig::default()
    };
    let mut producer = SyntheticSource::new(synthetic)?;
    let (sender, mut source) = ChannelSource::bounded(producer.sample_rate_hz(), 16);

    let acquisition = tokio::spawn(async move {
        while let Ok(Some(chunk)) = producer.next_chunk().await {
            if sender.send(chunk).await.is_err() {
                break;
            }
        }
    });

    let mut config = NeurofeedbackConfig::default();
    // short cooldown so a one-minute session shows several events
    config.event.cooldown_s = 0.5;

    let sink = RecordingSink::new();
    let (_stop, shutdown) = watch::channel(false);
    let summary = Runtime::new(config).run(&mut source, &sink, shutdown).await?;
    acquisition.await?;

    for (i, event) in sink.events().iter().enumerate() {
        println!("event {:>3}: {} for {} ms", i + 1, event.direction, event.duration_ms);
    }
    println!("{:#?}", summary);
    Ok(())
}
