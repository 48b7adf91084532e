//! # docsync testkit
//!
//! Shared fixtures and proptest generators for exercising the session
//! synchronization client against the in-memory authoritative store. The
//! integration suites under `tests/` cover the end-to-end flows: chunked
//! session creation, pull/push cycles, divergence recovery, and the
//! equivalence properties of the chunked transfer strategy.

pub mod fixtures;
pub mod generators;

pub use fixtures::{deterministic_config, init_tracing, sample_document, TestRig};
