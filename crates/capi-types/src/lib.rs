//! Core types for the capi control-plane client.
//!
//! Job records and their state machine, the sync/async `Outcome` of a mutating call,
//! the transport contract every HTTP backend implements, and the shared error taxonomy.

mod error;
mod job;
mod transport;

pub use error::*;
pub use job::*;
pub use transport::*;
