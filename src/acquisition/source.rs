// src/acquisition/source.rs
//! Interface to the acquisition collaborator

use crate::error::{NeuroError, NeuroResult};
use async_trait::async_trait;
use ndarray::{Array2, Axis};
use tokio::sync::mpsc;

/// Ordered batch of multi-channel samples; rows are samples, columns channels
#[derive(Debug, Clone, PartialEq)]
pub struct SampleChunk {
    pub samples: Array2<f32>,
    pub sample_rate_hz: f32,
}

impl SampleChunk {
    pub fn new(samples: Array2<f32>, sample_rate_hz: f32) -> Self {
        Self { samples, sample_rate_hz }
    }

    /// Build from per-sample rows
    pub fn from_rows(rows: &[Vec<f32>], sample_rate_hz: f32) -> NeuroResult<Self> {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(NeuroError::source_unavailable("chunk", "ragged sample rows"));
        }
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        let samples = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|e| NeuroError::source_unavailable("chunk", e.to_string()))?;
        Ok(Self { samples, sample_rate_hz })
    }

    pub fn len(&self) -> usize {
        self.samples.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.nrows() == 0
    }

    pub fn channel_count(&self) -> usize {
        self.samples.ncols()
    }

    /// Keep only the configured channels, one `Vec` per sample
    ///
    /// An out-of-range index means the source does not match the
    /// configuration, which no amount of waiting will fix.
    pub fn select_channels(&self, channels: &[usize]) -> NeuroResult<Vec<Vec<f32>>> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(&bad) = channels.iter().find(|&&ch| ch >= self.channel_count()) {
            return Err(NeuroError::source_unavailable(
                "chunk",
                format!("channel {} requested but source provides {}", bad, self.channel_count()),
            ));
        }

        let selected = self.samples.select(Axis(1), channels);
        Ok(selected.rows().into_iter().map(|row| row.to_vec()).collect())
    }
}

/// Acquisition collaborator
///
/// `Ok(None)` signals a clean end of stream; an empty chunk means nothing
/// arrived before the pull timeout and is not an error.
#[async_trait]
pub trait SampleSource: Send {
    /// Human-readable source name for logs
    fn name(&self) -> &str;

    /// Nominal sample rate, constant for the source's lifetime
    fn sample_rate_hz(&self) -> f32;

    /// Pull the next chunk
    ///
    /// Must be cancel-safe: the runtime drops this future when the pull
    /// timeout or a stop fires, and a later call has to pick up where the
    /// dropped one left off without losing or repeating samples.
    async fn next_chunk(&mut self) -> NeuroResult<Option<SampleChunk>>;
}

/// Single-producer/single-consumer ordered handoff from an acquisition task
pub struct ChannelSource {
    receiver: mpsc::Receiver<SampleChunk>,
    sample_rate_hz: f32,
}

/// Producing half of a [`ChannelSource`]
pub struct ChunkSender {
    sender: mpsc::Sender<SampleChunk>,
}

impl ChannelSource {
    /// Create a bounded handoff; the sender blocks when `capacity` chunks are pending
    pub fn bounded(sample_rate_hz: f32, capacity: usize) -> (ChunkSender, Self) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            ChunkSender { sender },
            Self { receiver, sample_rate_hz },
        )
    }
}

impl ChunkSender {
    /// Send a chunk; fails once the consumer is gone
    pub async fn send(&self, chunk: SampleChunk) -> Result<(), SampleChunk> {
        self.sender.send(chunk).await.map_err(|e| e.0)
    }
}

#[async_trait]
impl SampleSource for ChannelSource {
    fn name(&self) -> &str {
        "channel"
    }

    fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }

    async fn next_chunk(&mut self) -> NeuroResult<Option<SampleChunk>> {
        match self.receiver.recv().await {
            Some(chunk) if (chunk.sample_rate_hz - self.sample_rate_hz).abs() > f32::EPSILON => {
                Err(NeuroError::source_unavailable(
                    "channel",
                    format!(
                        "sample rate changed from {} Hz to {} Hz",
                        self.sample_rate_hz, chunk.sample_rate_hz
                    ),
                ))
            }
            other => Ok(other),
        }
    }
}

/// Replays a fixed list of chunks, then ends
pub struct ReplaySource {
    chunks: std::collections::VecDeque<SampleChunk>,
    sample_rate_hz: f32,
}

impl ReplaySource {
    pub fn new(sample_rate_hz: f32, chunks: impl IntoIterator<Item = SampleChunk>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
            sample_rate_hz,
        }
    }

    /// Split one long single-channel recording into chunks of `chunk_len`
    pub fn from_signal(sample_rate_hz: f32, signal: &[f32], chunk_len: usize) -> Self {
        let chunks = signal
            .chunks(chunk_len.max(1))
            .map(|c| {
                let samples = Array2::from_shape_fn((c.len(), 1), |(i, _)| c[i]);
                SampleChunk::new(samples, sample_rate_hz)
            })
            .collect::<Vec<_>>();
        Self::new(sample_rate_hz, chunks)
    }
}

#[async_trait]
impl SampleSource for ReplaySource {
    fn name(&self) -> &str {
        "replay"
    }

    fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }

    async fn next_chunk(&mut self) -> NeuroResult<Option<SampleChunk>> {
        Ok(self.chunks.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_channels() {
        let chunk = SampleChunk::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]], 256.0).unwrap();
        let selected = chunk.select_channels(&[2, 0]).unwrap();
        assert_eq!(selected, vec![vec![3.0, 1.0], vec![6.0, 4.0]]);
    }

    #[test]
    fn test_select_out_of_range_is_fatal() {
        let chunk = SampleChunk::from_rows(&[vec![1.0]], 256.0).unwrap();
        let err = chunk.select_channels(&[3]).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_chunk_selects_nothing() {
        let chunk = SampleChunk::new(Array2::zeros((0, 4)), 256.0);
        assert!(chunk.select_channels(&[0]).unwrap().is_empty());
    }

    #[test]
    fn test_ragged_rows_rejected() {
        assert!(SampleChunk::from_rows(&[vec![1.0], vec![1.0, 2.0]], 256.0).is_err());
    }

    #[tokio::test]
    async fn test_channel_source_preserves_order() {
        let (tx, mut source) = ChannelSource::bounded(256.0, 2);

        let producer = tokio::spawn(async move {
            for i in 0..5 {
                let chunk = SampleChunk::from_rows(&[vec![i as f32]], 256.0).unwrap();
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });

        let mut seen = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            seen.push(chunk.samples[[0, 0]]);
        }
        producer.await.unwrap();
        assert_eq!(seen, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[tokio::test]
    async fn test_channel_source_rejects_rate_change() {
        let (tx, mut source) = ChannelSource::bounded(256.0, 1);
        tx.send(SampleChunk::from_rows(&[vec![0.0]], 128.0).unwrap()).await.unwrap();
        assert!(source.next_chunk().await.is_err());
    }

    #[tokio::test]
    async fn test_replay_source_chunks_signal() {
        let signal: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let mut source = ReplaySource::from_signal(100.0, &signal, 4);

        let mut lens = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            lens.push(chunk.len());
        }
        assert_eq!(lens, vec![4, 4, 2]);
    }
}
