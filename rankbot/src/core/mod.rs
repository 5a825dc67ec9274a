//! Deterministic, pure logic shared by the judge pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod conversation;
pub mod output;
pub mod ranking;
pub mod reconcile;
pub mod recover;
pub mod scores;
pub mod types;
