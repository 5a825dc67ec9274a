//! Agent-driven grading of hackathon submissions.
//!
//! - **[`core`]**: pure logic. Domain types, conversations, JSON recovery,
//!   ranking and scorecard reconciliation. No I/O.
//! - **[`io`]**: side effects. Processes, git, configuration, CSV files,
//!   prompt templates, report writers and the model bridge.
//! - **[`tools`]**: the sandboxed tools an agent may call.
//! - **[`agents`]**: agent definitions and the run loop.
//!
//! [`pipeline`] runs the scoring phases; [`evaluate`] connects them to the
//! CLI commands.

pub mod agents;
pub mod core;
pub mod evaluate;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tools;
