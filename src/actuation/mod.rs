//! Outbound delivery of gate events to the actuation collaborator

pub mod sink;
#[cfg(feature = "http")]
pub mod http;

pub use sink::*;
#[cfg(feature = "http")]
pub use http::HttpEventSink;
