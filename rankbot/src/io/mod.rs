//! Side-effecting adapters: processes, git, configuration, files and the
//! model bridge.

pub mod atomic;
pub mod config;
pub mod git;
pub mod ingest;
pub mod model;
pub mod process;
pub mod prompt;
pub mod report;
pub mod scorecard;
