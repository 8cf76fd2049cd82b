//! # remctl transport
//!
//! The authenticated transport a remctl client session is built on, plus a
//! scripted in-process server for tests.

#![warn(missing_docs)]

/// Transport abstraction
pub mod transport;

/// Scripted in-process command server
pub mod mock;

/// Transport error types
pub mod error;

pub use transport::{OpenParams, Transport};
pub use mock::{MockRecord, MockRecorder, MockStep, MockTransport};
pub use error::TransportError;
