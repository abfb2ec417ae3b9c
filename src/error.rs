// src/error.rs
//! Unified error handling for the neurofeedback core
//!
//! Every recoverable per-cycle condition and every fatal startup condition is
//! expressed as a [`NeuroError`]. Each variant carries an [`ErrorContext`] so a
//! log line can name the component and operation that produced it.

use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;
use serde::{Deserialize, Serialize};

/// Unified error type for the pipeline
#[derive(Debug, Clone)]
pub enum NeuroError {
    /// The sample buffer does not yet hold a full epoch
    InsufficientData {
        required: usize,
        available: usize,
        context: ErrorContext,
    },

    /// The derived metric is non-finite (zero or near-zero denominator band)
    DegenerateMetric {
        metric: String,
        numerator: f32,
        denominator: f32,
        context: ErrorContext,
    },

    /// The actuation collaborator could not be reached
    DispatchFailure {
        direction: String,
        reason: String,
        context: ErrorContext,
    },

    /// The acquisition collaborator cannot supply data
    SourceUnavailable {
        source_name: String,
        reason: String,
        context: ErrorContext,
    },

    /// Invalid or inconsistent configuration
    Configuration {
        component: String,
        reason: String,
        context: ErrorContext,
    },

    /// Signal processing errors
    Processing {
        stage: ProcessingStage,
        reason: String,
        context: ErrorContext,
    },
}

/// Signal processing stages for error tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProcessingStage {
    Acquisition,
    Filtering,
    EpochExtraction,
    BandPower,
    Smoothing,
    Metric,
}

/// Error context for debugging and analysis
#[derive(Debug, Clone, Serialize)]
pub struct ErrorContext {
    pub timestamp: SystemTime,
    pub component: String,
    pub operation: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub additional_info: HashMap<String, String>,
}

impl ErrorContext {
    /// Create a new error context
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            timestamp: SystemTime::now(),
            component: component.to_string(),
            operation: operation.to_string(),
            file: None,
            line: None,
            additional_info: HashMap::new(),
        }
    }

    /// Create error context with file and line information
    pub fn with_location(
        component: &str,
        operation: &str,
        file: &'static str,
        line: u32,
    ) -> Self {
        let mut context = Self::new(component, operation);
        context.file = Some(file);
        context.line = Some(line);
        context
    }

    /// Add additional information to the context
    pub fn add_info<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.additional_info.insert(key.into(), value.into());
        self
    }
}

/// Macro for creating error context with file and line info
#[macro_export]
macro_rules! error_context {
    ($component:expr, $operation:expr) => {
        $crate::error::ErrorContext::with_location($component, $operation, file!(), line!())
    };
}

impl NeuroError {
    /// Fatal errors terminate the processing loop; everything else is handled per cycle
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NeuroError::SourceUnavailable { .. } | NeuroError::Configuration { .. }
        )
    }

    /// Context attached to this error
    pub fn context(&self) -> &ErrorContext {
        match self {
            NeuroError::InsufficientData { context, .. }
            | NeuroError::DegenerateMetric { context, .. }
            | NeuroError::DispatchFailure { context, .. }
            | NeuroError::SourceUnavailable { context, .. }
            | NeuroError::Configuration { context, .. }
            | NeuroError::Processing { context, .. } => context,
        }
    }

    /// Shorthand for a source failure
    pub fn source_unavailable(source_name: &str, reason: impl Into<String>) -> Self {
        NeuroError::SourceUnavailable {
            source_name: source_name.to_string(),
            reason: reason.into(),
            context: error_context!("acquisition", "next_chunk"),
        }
    }
}

impl fmt::Display for NeuroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NeuroError::InsufficientData { required, available, context } => {
                write!(f, "[DATA] Insufficient data: need {} samples, have {} ({})",
                       required, available, context.operation)
            }
            NeuroError::DegenerateMetric { metric, numerator, denominator, context } => {
                write!(f, "[METRIC] Degenerate {} metric: {} / {} is not finite ({})",
                       metric, numerator, denominator, context.operation)
            }
            NeuroError::DispatchFailure { direction, reason, context } => {
                write!(f, "[DISPATCH] Failed to send {} event: {} ({})",
                       direction, reason, context.operation)
            }
            NeuroError::SourceUnavailable { source_name, reason, context } => {
                write!(f, "[SOURCE] {} unavailable: {} (at {}:{})",
                       source_name, reason,
                       context.file.unwrap_or("unknown"), context.line.unwrap_or(0))
            }
            NeuroError::Configuration { component, reason, context } => {
                write!(f, "[CONFIG] Configuration error in {}: {} ({})",
                       component, reason, context.operation)
            }
            NeuroError::Processing { stage, reason, context } => {
                write!(f, "[PROCESSING] {:?} stage error: {} ({})",
                       stage, reason, context.operation)
            }
        }
    }
}

impl std::error::Error for NeuroError {}

impl From<crate::config::ConfigError> for NeuroError {
    fn from(err: crate::config::ConfigError) -> Self {
        NeuroError::Configuration {
            component: "config".to_string(),
            reason: err.to_string(),
            context: error_context!("config", "load"),
        }
    }
}

impl From<crate::processing::filters::FilterError> for NeuroError {
    fn from(err: crate::processing::filters::FilterError) -> Self {
        NeuroError::Configuration {
            component: "notch_filter".to_string(),
            reason: err.to_string(),
            context: error_context!("notch_filter", "design"),
        }
    }
}

/// Result type alias for pipeline operations
pub type NeuroResult<T> = Result<T, NeuroError>;

/// Error builder for convenient error construction
pub struct NeuroErrorBuilder {
    component: String,
    operation: String,
    info: Vec<(String, String)>,
}

impl NeuroErrorBuilder {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            info: Vec::new(),
        }
    }

    /// Attach a key/value pair to the built error's context
    pub fn with_info(mut self, key: &str, value: impl Into<String>) -> Self {
        self.info.push((key.to_string(), value.into()));
        self
    }

    fn context(&self) -> ErrorContext {
        self.info
            .iter()
            .fold(ErrorContext::new(&self.component, &self.operation), |context, (k, v)| {
                context.add_info(k.as_str(), v.as_str())
            })
    }

    pub fn configuration(self, reason: &str) -> NeuroError {
        let context = self.context();
        NeuroError::Configuration {
            component: self.component,
            reason: reason.to_string(),
            context,
        }
    }

    pub fn processing(self, stage: ProcessingStage, reason: &str) -> NeuroError {
        NeuroError::Processing {
            stage,
            reason: reason.to_string(),
            context: self.context(),
        }
    }

    pub fn insufficient_data(self, required: usize, available: usize) -> NeuroError {
        NeuroError::InsufficientData {
            required,
            available,
            context: self.context(),
        }
    }

    pub fn degenerate_metric(self, metric: &str, numerator: f32, denominator: f32) -> NeuroError {
        NeuroError::DegenerateMetric {
            metric: metric.to_string(),
            numerator,
            denominator,
            context: self.context(),
        }
    }

    pub fn dispatch_failure(self, direction: &str, reason: &str) -> NeuroError {
        NeuroError::DispatchFailure {
            direction: direction.to_string(),
            reason: reason.to_string(),
            context: self.context(),
        }
    }
}
