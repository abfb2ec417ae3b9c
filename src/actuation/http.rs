// src/actuation/http.rs
//! HTTP delivery of events

use crate::actuation::sink::{DispatchError, EventSink};
use crate::config::ActuationConfig;
use crate::error::{NeuroErrorBuilder, NeuroResult};
use crate::processing::gate::Event;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Posts each event to a fixed endpoint
///
/// The request carries `direction` and `ms` headers as well as a JSON body
/// `{"direction": .., "durationMillis": ..}`. Any non-2xx status is a failure.
pub struct HttpEventSink {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpEventSink {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> NeuroResult<Self> {
        let endpoint = endpoint.into();
        reqwest::Url::parse(&endpoint).map_err(|e| {
            NeuroErrorBuilder::new("http_sink", "new")
                .configuration(&format!("invalid endpoint '{}': {}", endpoint, e))
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NeuroErrorBuilder::new("http_sink", "new").configuration(&e.to_string()))?;

        Ok(Self { endpoint, client })
    }

    pub fn from_config(config: &ActuationConfig) -> NeuroResult<Self> {
        Self::new(config.endpoint.clone(), Duration::from_millis(config.request_timeout_ms))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn dispatch(&self, event: &Event) -> Result<(), DispatchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("direction", event.direction.as_str())
            .header("ms", event.duration_ms.to_string())
            .json(event)
            .send()
            .await
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        let status = response.status();
        debug!(endpoint = %self.endpoint, status = status.as_u16(), "event posted");
        if !status.is_success() {
            return Err(DispatchError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::gate::Direction;

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(HttpEventSink::new("not a url", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_from_default_config() {
        let sink = HttpEventSink::from_config(&ActuationConfig::default()).unwrap();
        assert_eq!(sink.endpoint(), "http://127.0.0.1:3000/move");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // port 9 (discard) on localhost is expected to refuse connections
        let sink = HttpEventSink::new("http://127.0.0.1:9/move", Duration::from_millis(500)).unwrap();
        let event = Event { direction: Direction::Up, duration_ms: 5000 };
        assert!(matches!(sink.dispatch(&event).await, Err(DispatchError::Transport(_))));
    }
}
