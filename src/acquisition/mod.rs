// src/acquisition/mod.rs
//! Sample acquisition, buffering and epoch extraction

pub mod ring_buffer;
pub mod sample_buffer;
pub mod source;
pub mod synthetic;

pub use ring_buffer::*;
pub use sample_buffer::*;
pub use source::*;
pub use synthetic::*;
