use log::{debug, info};
use rand::Rng;

use super::candidate::ReactionCandidate;
use super::config::UnitSystem;
use super::enumerate;
use super::error::Error;
use super::template::ReactionTemplate;
use crate::geometry;
use crate::io::TopologyStore;
use crate::model::topology::Topology;

/// How far a relaxed atom strayed from its pre-relaxation position,
/// measured against the typical inter-atom distance of the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementSeverity {
    /// More than twice the typical distance.
    Large,
    /// More than three times the typical distance.
    VeryLarge,
}

/// One suspicious atom displacement found by the post-relaxation check.
#[derive(Debug, Clone)]
pub struct MovementWarning {
    pub atom_id: usize,
    pub atom_name: String,
    pub molecule_id: usize,
    pub molecule_name: String,
    pub distance: f64,
    pub typical_distance: f64,
    pub severity: MovementSeverity,
}

/// Owns the three topologies of a reactive cycle and the reaction templates.
///
/// `old` is the configuration the MD engine produced and is never mutated
/// during a reactive step; candidates are searched in `old` while accepted
/// reactions are committed to `new`. `relaxed` holds the configuration read
/// back after the engine relaxed `new`.
pub struct Universe {
    old: Topology,
    new: Topology,
    relaxed: Topology,
    templates: Vec<ReactionTemplate>,
    store: Box<dyn TopologyStore>,
    cells: [usize; 3],
    units: UnitSystem,
}

impl Universe {
    /// Validates the templates and grid shape; any failure is fatal before
    /// the first cycle.
    pub fn new(
        store: Box<dyn TopologyStore>,
        templates: Vec<ReactionTemplate>,
        cells: [usize; 3],
        units: UnitSystem,
    ) -> Result<Self, Error> {
        if cells.iter().any(|&n| n == 0) {
            return Err(Error::InvalidGrid { shape: cells });
        }
        for template in &templates {
            template.validate()?;
        }
        Ok(Self {
            old: Topology::new(),
            new: Topology::new(),
            relaxed: Topology::new(),
            templates,
            store,
            cells,
            units,
        })
    }

    #[inline]
    pub fn templates(&self) -> &[ReactionTemplate] {
        &self.templates
    }

    #[inline]
    pub fn units(&self) -> &UnitSystem {
        &self.units
    }

    #[inline]
    pub fn current(&self) -> &Topology {
        &self.new
    }

    /// Begins a cycle: re-reads the configuration the engine last produced
    /// and resets the working topology to a copy of it.
    pub fn update(&mut self, cycle: usize) -> Result<(), Error> {
        self.old.clear();
        self.new.clear();
        self.relaxed.clear();

        self.store.read(&mut self.old, cycle)?;
        let dimensions = self.old.dimensions();
        if dimensions.iter().any(|&d| d <= 0.0) {
            return Err(Error::InvalidBox { dimensions });
        }
        self.old.set_cell_numbers(self.cells);
        self.old.clear_reaction_records();
        self.new = self.old.clone();
        Ok(())
    }

    /// Sorts the working topology and hands it to the store for the next
    /// relaxation.
    pub fn write(&mut self, cycle: usize) -> Result<(), Error> {
        self.new.sort();
        self.store.write(&self.new, cycle)?;
        Ok(())
    }

    /// Reads the post-relaxation configuration.
    pub fn read_relaxed(&mut self, cycle: usize) -> Result<(), Error> {
        self.relaxed.clear();
        self.store.read_relaxed(&mut self.relaxed, cycle)?;
        Ok(())
    }

    /// Enumerates reaction candidates in the untouched configuration and
    /// returns them weighted-shuffled.
    pub fn search_candidates<R: Rng>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<ReactionCandidate>, Error> {
        enumerate::search_candidates(&self.old, &self.templates, rng)
    }

    /// True while every bound reactant is still present in the working
    /// topology. Once a reactant is consumed this stays false for the rest of
    /// the step.
    pub fn is_available(&self, candidate: &ReactionCandidate) -> bool {
        candidate.reactants().iter().all(|reactant| {
            let present = self.new.contains(reactant);
            if !present {
                debug!(
                    "molecule {} {} is no longer present in the working topology",
                    reactant.name, reactant.id
                );
            }
            present
        })
    }

    /// Commits an accepted candidate to the working topology: products are
    /// materialised, repaired across periodic boundaries and inserted with
    /// fresh ids; the consumed reactants are removed. Availability must have
    /// been checked beforehand.
    pub fn react(&mut self, candidate: &mut ReactionCandidate) {
        debug!("performing reaction for candidate {}", candidate.short_info());
        let dimensions = self.new.dimensions();

        candidate.apply_transitions();
        for product in candidate.products_mut() {
            geometry::make_molecule_whole(product, dimensions);
        }
        candidate.apply_translations();

        let mut next_id = self.new.molecules.iter().map(|m| m.id).max().unwrap_or(0);
        for reactant in candidate.reactants() {
            self.new.remove_molecule(reactant.id);
        }
        for product in candidate.products_mut() {
            next_id += 1;
            product.id = next_id;
            self.new.add_molecule(product.clone());
            self.new.add_reaction_record(next_id);
            info!("new molecule {} got id {}", product.name, next_id);
        }
    }

    /// Measures how far each product atom moved during relaxation, against
    /// the typical inter-atom distance `d* = cbrt(3V / (4 pi N))`. An atom
    /// yields at most one warning, at the highest threshold it crossed.
    pub fn check_movement(
        &self,
        candidate: &ReactionCandidate,
    ) -> Result<Vec<MovementWarning>, Error> {
        let dimensions = self.new.dimensions();
        let volume = dimensions[0] * dimensions[1] * dimensions[2];
        let typical =
            ((3.0 * volume) / (4.0 * std::f64::consts::PI * self.new.atom_count() as f64)).cbrt();

        let mut warnings = Vec::new();
        for product in candidate.products() {
            let current_id = self
                .new
                .reaction_record(product.id)
                .ok_or(Error::RecordNotFound { id: product.id })?;
            let relaxed = self
                .relaxed
                .molecule(current_id)
                .ok_or(Error::MoleculeNotFound { id: current_id })?;

            for (before, after) in product.atoms.iter().zip(relaxed.atoms.iter()) {
                let distance = geometry::distance(before.position, after.position, dimensions);
                let severity = if distance > 3.0 * typical {
                    MovementSeverity::VeryLarge
                } else if distance > 2.0 * typical {
                    MovementSeverity::Large
                } else {
                    debug!(
                        "atom {} {} of molecule {} {} moved {:.3} {}",
                        after.name,
                        after.id,
                        relaxed.name,
                        relaxed.id,
                        distance,
                        self.units.length
                    );
                    continue;
                };
                warnings.push(MovementWarning {
                    atom_id: after.id,
                    atom_name: after.name.clone(),
                    molecule_id: relaxed.id,
                    molecule_name: relaxed.name.clone(),
                    distance,
                    typical_distance: typical,
                    severity,
                });
            }
        }
        Ok(warnings)
    }
}
