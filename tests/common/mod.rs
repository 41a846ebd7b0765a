//! Shared test utilities for pip-pilot integration tests
//!
//! In-process fake collaborators for library tests, plus a fake interpreter
//! script and isolated directories for driving the binary.

pub mod assertions;
pub mod fakes;
pub mod fixtures;
pub mod processes;
