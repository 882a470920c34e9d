//! Transfer engine abstraction.
//!
//! This module draws the boundary around the wire-level swarm
//! implementation. Everything above it (sessions, streaming, caching)
//! talks to a `TransferEngine`; the embedded librqbit backend is the
//! production implementation.

mod librqbit;
mod types;

pub use librqbit::LibrqbitEngine;
pub use types::*;
