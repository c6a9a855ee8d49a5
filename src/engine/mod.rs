use thiserror::Error;

pub mod gromacs;

pub use gromacs::{GromacsConfig, GromacsEngine};

/// Capability interface of an external MD engine.
///
/// One simulation cycle touches the engine twice: `run_relaxation` right
/// after a reactive step rewrote the topology, and one of the MD variants for
/// the production segment that follows. All calls are synchronous; control is
/// handed to the engine process until it finishes.
pub trait MdEngine {
    /// Checks the engine executable responds before the first cycle.
    fn verify(&self) -> Result<(), Error>;

    /// The initial MD segment before cycle 1.
    fn run_md_initial(&self) -> Result<(), Error>;

    /// A fresh MD segment for a cycle that performed reactions.
    fn run_md(&self, cycle: usize) -> Result<(), Error>;

    /// Continues the MD segment of `last_reactive` when the current cycle
    /// performed no reaction.
    fn run_md_appending(&self, cycle: usize, last_reactive: usize) -> Result<(), Error>;

    /// Relaxes the freshly written topology. `Ok(false)` reports a relaxation
    /// that ran but did not converge or crashed; the caller decides that this
    /// is fatal.
    fn run_relaxation(&self, cycle: usize) -> Result<bool, Error>;
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' exited with {status}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
    },
}
