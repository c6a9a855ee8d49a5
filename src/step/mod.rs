//! The reactive-step engine.
//!
//! Between MD relaxation segments the engine scans the current configuration
//! for applicable reactions, accepts a stochastic subset and applies the
//! structural transitions before handing the mutated topology back to the
//! engine. The pieces, leaves first:
//!
//! - [`grid`] — the 3-D cell index used to enumerate reactant tuples under
//!   periodic boundary conditions
//! - [`template`] / [`candidate`] — declarative reaction descriptions and
//!   their bound instances
//! - [`enumerate`] — ordered-tuple candidate generation with symmetry
//!   breaking, plus the weighted shuffle
//! - [`universe`] — the old/new/relaxed topology triple and the mutation
//!   path
//! - [`simulator`] — the per-cycle controller and the acceptance policies

pub mod candidate;
pub mod config;
pub mod enumerate;
pub mod error;
pub mod grid;
pub mod simulator;
pub mod template;
pub mod universe;

pub use candidate::ReactionCandidate;
pub use config::{AcceptancePolicy, SimulationConfig, UnitSystem};
pub use error::Error;
pub use grid::CellGrid;
pub use simulator::{CycleStats, Simulator};
pub use template::{Criterion, CriterionKind, ReactionTemplate, Transition, Translation};
pub use universe::{MovementSeverity, MovementWarning, Universe};
