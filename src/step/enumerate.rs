use rand::seq::SliceRandom;
use rand::Rng;

use super::candidate::ReactionCandidate;
use super::error::Error;
use super::grid::CellGrid;
use super::template::ReactionTemplate;
use crate::model::topology::Topology;

/// Enumerates every valid reaction candidate in the topology and returns the
/// list in weighted-shuffle order, weighted by each candidate's current rate.
pub fn search_candidates<R: Rng>(
    topology: &Topology,
    templates: &[ReactionTemplate],
    rng: &mut R,
) -> Result<Vec<ReactionCandidate>, Error> {
    let grid = CellGrid::build(topology)?;
    let mut candidates = Vec::new();

    for (template_index, template) in templates.iter().enumerate() {
        let walker = TupleWalker {
            topology,
            grid: &grid,
            template,
        };
        for cell in 0..grid.cell_count() {
            let mut candidate = ReactionCandidate::new(template_index, template);
            let mut bound = Vec::with_capacity(template.reactants.len());
            walker.descend(cell, 0, &mut candidate, &mut bound, &mut candidates)?;
        }
    }

    log::debug!("enumerated {} reaction candidates", candidates.len());
    weighted_shuffle(&mut candidates, rng);
    Ok(candidates)
}

/// One bound reactant during tuple construction: which molecule was taken and
/// from which cell of the neighbour stencil it came.
struct Binding {
    molecule: usize,
    cell: usize,
}

/// Depth-first construction of ordered reactant tuples, one template at a
/// time. Reactant 0 is drawn from the anchor cell itself, later reactants
/// from the anchor's full neighbourhood.
struct TupleWalker<'a> {
    topology: &'a Topology,
    grid: &'a CellGrid,
    template: &'a ReactionTemplate,
}

impl TupleWalker<'_> {
    fn descend(
        &self,
        anchor: usize,
        stage: usize,
        candidate: &mut ReactionCandidate,
        bound: &mut Vec<Binding>,
        out: &mut Vec<ReactionCandidate>,
    ) -> Result<(), Error> {
        let wanted = self.template.reactants[stage].name.as_str();
        if stage == 0 {
            for ix in self.grid.members(self.topology, anchor, wanted) {
                self.try_bind(ix, anchor, anchor, stage, candidate, bound, out)?;
            }
        } else {
            // Thin grids repeat cells in the neighbour stencil; a molecule
            // must still be offered only once per source cell.
            let mut pairs: Vec<(usize, usize)> = self
                .grid
                .neighbour_members(self.topology, anchor, wanted)
                .collect();
            pairs.sort_unstable();
            pairs.dedup();
            for (ix, from_cell) in pairs {
                self.try_bind(ix, from_cell, anchor, stage, candidate, bound, out)?;
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn try_bind(
        &self,
        molecule_index: usize,
        from_cell: usize,
        anchor: usize,
        stage: usize,
        candidate: &mut ReactionCandidate,
        bound: &mut Vec<Binding>,
        out: &mut Vec<ReactionCandidate>,
    ) -> Result<(), Error> {
        let molecule = &self.topology.molecules[molecule_index];

        // No molecule may fill two slots of one tuple.
        if bound
            .iter()
            .any(|b| self.topology.molecules[b.molecule].id == molecule.id)
        {
            return Ok(());
        }
        // Same-named slots are filled in ascending id order, so each
        // unordered tuple is built exactly once. For tuples of three or
        // more, same-named slots additionally keep ascending source-cell
        // order to compensate overlapping neighbour stencils.
        for prior in bound.iter() {
            let prior_molecule = &self.topology.molecules[prior.molecule];
            if prior_molecule.name == molecule.name {
                if prior_molecule.id > molecule.id {
                    return Ok(());
                }
                if self.template.reactants.len() >= 3 && prior.cell > from_cell {
                    return Ok(());
                }
            }
        }

        candidate.update_reactant(stage, molecule)?;
        bound.push(Binding {
            molecule: molecule_index,
            cell: from_cell,
        });
        if candidate.valid(self.topology.dimensions(), stage) {
            if stage + 1 == self.template.reactants.len() {
                out.push(candidate.clone());
            } else {
                self.descend(anchor, stage + 1, candidate, bound, out)?;
            }
        }
        bound.pop();
        Ok(())
    }
}

/// Reorders candidates so that the probability of a candidate landing at the
/// front is proportional to its weight among the candidates still unplaced.
/// With no weights left (empty list or all zero) the remainder is shuffled
/// uniformly.
pub fn weighted_shuffle<R: Rng>(candidates: &mut [ReactionCandidate], rng: &mut R) {
    let mut weights: Vec<f64> = candidates
        .iter()
        .map(|c| c.current_rate().max(0.0))
        .collect();

    for i in 0..candidates.len() {
        let total: f64 = weights[i..].iter().sum();
        if total <= 0.0 {
            candidates[i..].shuffle(rng);
            return;
        }
        let mut draw = rng.gen_range(0.0..total);
        let mut pick = i;
        for (j, &w) in weights.iter().enumerate().skip(i) {
            if draw < w {
                pick = j;
                break;
            }
            draw -= w;
        }
        candidates.swap(i, pick);
        weights.swap(i, pick);
    }
}
