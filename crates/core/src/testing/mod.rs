//! Mock collaborators for tests.
//!
//! Exported from the crate so downstream integration suites (the
//! server's gateway tests in particular) can drive the same mocks.

mod mock_engine;
mod mock_source;

pub use mock_engine::{MockEngine, MockSwarmBuilder};
pub use mock_source::{FailingSource, SlowSource, StaticSource};
