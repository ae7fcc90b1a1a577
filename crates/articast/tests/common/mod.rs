//! Shared utilities for articast integration tests.
//!
//! - `TestHarness` wires a `ConversionService` over a temp-dir blob store
//! - `fakes` holds scripted collaborators and MP3 frame fixtures

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::TestHarness;
