//! # rxstep
//!
//! `rxstep` drives chemical reactions on top of a conventional molecular
//! dynamics engine. Between MD segments it scans the current configuration
//! for reaction candidates with a periodic cell index, accepts a stochastic
//! subset (rate-based or Metropolis), rewrites the topology and lets the
//! engine relax the result.
//!
//! ## Quick start
//!
//! ```no_run
//! use rxstep::io::{reaction, GromacsStore};
//! use rxstep::engine::{GromacsConfig, GromacsEngine};
//! use rxstep::{AcceptancePolicy, SimulationConfig, Simulator, UnitSystem, Universe};
//!
//! # fn main() -> anyhow::Result<()> {
//! let template = reaction::load("dimerisation.toml")?;
//! let universe = Universe::new(
//!     Box::new(GromacsStore::new(".")),
//!     vec![template],
//!     [4, 4, 4],
//!     UnitSystem::gromacs(),
//! )?;
//! let config = SimulationConfig {
//!     policy: AcceptancePolicy::Rate { frequency: 0.25 },
//!     cycles: 100,
//!     seed: None,
//! };
//! let engine = GromacsEngine::new(GromacsConfig::default());
//! let mut simulator = Simulator::new(universe, Box::new(engine), &config, None)?;
//! simulator.run(|_stats| {})?;
//! simulator.finish();
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod geometry;
pub mod io;
mod model;
mod step;

pub use model::atom::Atom;
pub use model::molecule::Molecule;
pub use model::topology::Topology;

pub use step::{
    AcceptancePolicy, CellGrid, Criterion, CriterionKind, CycleStats, Error, MovementSeverity,
    MovementWarning, ReactionCandidate, ReactionTemplate, SimulationConfig, Simulator, Transition,
    Translation, UnitSystem, Universe,
};

pub use engine::MdEngine;
pub use io::TopologyStore;
