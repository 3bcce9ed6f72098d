//! Stream acquisition.
//!
//! [`acquire_stream`] resolves a track to a [`Streamable`]: a manifest URL for
//! live content, or a byte pipe fed by a background download for everything
//! else. The client variant and buffer size come from the task-local
//! [`StreamingContext`].

pub mod adapter;
pub mod context;

pub use adapter::{acquire_stream, pump, MediaReader, PumpOutcome, Streamable};
pub use context::{StreamingContext, DEFAULT_HIGH_WATER_MARK};
