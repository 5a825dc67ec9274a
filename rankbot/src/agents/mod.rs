//! Agent definitions and the loop that runs them.

use std::marker::PhantomData;

pub mod contract;
pub mod judges;
pub mod run_loop;

pub use contract::OutputContract;
pub use judges::Judges;
pub use run_loop::{RunOutcome, run_agent};

/// Instructions, output contract and turn ceiling for one kind of agent.
///
/// Tool access is not part of the definition; the caller picks it per
/// project from the submission location.
#[derive(Debug, Clone)]
pub struct Agent<O> {
    pub name: &'static str,
    pub instructions: String,
    pub max_turns: u32,
    output: PhantomData<fn() -> O>,
}

impl<O> Agent<O> {
    pub fn new(name: &'static str, instructions: String, max_turns: u32) -> Self {
        Self {
            name,
            instructions,
            max_turns,
            output: PhantomData,
        }
    }
}
