use log::debug;

use super::error::Error;
use super::template::ReactionTemplate;
use crate::model::molecule::Molecule;

/// A reaction template bound to concrete molecules: the unit the controller
/// shuffles, accepts and applies.
///
/// Binding copies molecule data into the candidate, so candidates are plain
/// values; the topology they were drawn from stays untouched until the
/// controller commits the reaction to the working topology.
#[derive(Debug, Clone)]
pub struct ReactionCandidate {
    template_index: usize,
    template: ReactionTemplate,
    latest: Vec<f64>,
}

impl ReactionCandidate {
    pub fn new(template_index: usize, template: &ReactionTemplate) -> Self {
        Self {
            template_index,
            template: template.clone(),
            latest: vec![0.0; template.criteria.len()],
        }
    }

    #[inline]
    pub fn template_index(&self) -> usize {
        self.template_index
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.template.name
    }

    #[inline]
    pub fn reactants(&self) -> &[Molecule] {
        &self.template.reactants
    }

    #[inline]
    pub fn products(&self) -> &[Molecule] {
        &self.template.products
    }

    pub fn products_mut(&mut self) -> &mut [Molecule] {
        &mut self.template.products
    }

    #[inline]
    pub fn reaction_energy(&self) -> f64 {
        self.template.reaction_energy
    }

    /// Binds a real molecule to reactant slot `index`: the pattern atoms take
    /// the molecule's ids, positions and velocities, position by position.
    /// Pattern atoms and the molecule's atoms must be listed in the same
    /// order, as the topology files define it. Rebinding a slot replaces the
    /// previous binding.
    pub fn update_reactant(&mut self, index: usize, molecule: &Molecule) -> Result<(), Error> {
        let reactant = &mut self.template.reactants[index];
        if molecule.atom_count() < reactant.atom_count() {
            return Err(Error::ReactantMismatch {
                name: self.template.name.clone(),
                reactant: index + 1,
                expected: reactant.atom_count(),
                id: molecule.id,
                found: molecule.atom_count(),
            });
        }
        for (atom, source) in reactant.atoms.iter_mut().zip(molecule.atoms.iter()) {
            atom.id = source.id;
            atom.position = source.position;
            atom.velocity = source.velocity;
        }
        reactant.id = molecule.id;
        Ok(())
    }

    /// Checks every criterion that is evaluable once reactants `0..=stage`
    /// are bound, recording the evaluated values. Returns false on the first
    /// violated criterion.
    pub fn valid(&mut self, dimensions: [f64; 3], stage: usize) -> bool {
        for (i, criterion) in self.template.criteria.iter().enumerate() {
            if criterion.stage() > stage {
                continue;
            }
            let value = criterion.evaluate(&self.template.reactants, dimensions);
            self.latest[i] = value;
            if !criterion.contains(value) {
                return false;
            }
        }
        true
    }

    /// Checks the full criterion list (all reactants bound).
    pub fn valid_all(&mut self, dimensions: [f64; 3]) -> bool {
        self.valid(dimensions, self.template.reactants.len().saturating_sub(1))
    }

    /// Value of the first criterion at its last evaluation. The rate table is
    /// indexed by this value, which by convention is the leading distance
    /// criterion.
    pub fn current_distance(&self) -> f64 {
        self.latest.first().copied().unwrap_or(0.0)
    }

    /// Reaction rate at the current distance: the rate table is a step
    /// function over the first criterion's value. Zero when no rate table
    /// was given.
    pub fn current_rate(&self) -> f64 {
        let Some(&(_, first)) = self.template.rate.first() else {
            return 0.0;
        };
        let distance = self.current_distance();
        let mut rate = first;
        for &(threshold, value) in &self.template.rate {
            if threshold > distance {
                break;
            }
            rate = value;
        }
        rate
    }

    /// Materialises the products from the bound reactants by copying each
    /// atom's id, position and velocity along the transition table.
    pub fn apply_transitions(&mut self) {
        let template = &mut self.template;
        for t in &template.transitions {
            let source = template.reactants[t.from.0].atoms[t.from.1].clone();
            let target = &mut template.products[t.to.0].atoms[t.to.1];
            target.id = source.id;
            target.position = source.position;
            target.velocity = source.velocity;
        }
        debug!(
            "applied reactant -> product transitions for '{}'",
            template.name
        );
    }

    /// Applies the template's translations: each listed product atom moves by
    /// `shift` along its connection vector to the reference atom.
    pub fn apply_translations(&mut self) {
        let template = &mut self.template;
        for t in &template.translations {
            let reference = &template.products[t.toward.0].atoms[t.toward.1];
            let reference_position = reference.position;
            let reference_name = reference.name.clone();

            let atom = &mut template.products[t.atom.0].atoms[t.atom.1];
            let connection = [
                reference_position[0] - atom.position[0],
                reference_position[1] - atom.position[1],
                reference_position[2] - atom.position[2],
            ];
            let length = (connection[0] * connection[0]
                + connection[1] * connection[1]
                + connection[2] * connection[2])
                .sqrt();
            if length == 0.0 {
                continue;
            }
            debug!(
                "translating product atom {} by {} towards {}",
                atom.name, t.shift, reference_name
            );
            for i in 0..3 {
                atom.position[i] += t.shift * connection[i] / length;
            }
        }
    }

    /// One-line identifier for log and statistics output.
    pub fn short_info(&self) -> String {
        let reactants = self
            .template
            .reactants
            .iter()
            .map(|m| format!("{} {}", m.id, m.name))
            .collect::<Vec<_>>()
            .join(", ");
        let products = self
            .template
            .products
            .iter()
            .map(|m| format!("{} {}", m.id, m.name))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "<{}: reactants {} -> products {}>",
            self.template.name, reactants, products
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::atom::Atom;
    use crate::step::template::{Criterion, CriterionKind, Transition, Translation};

    const BOX: [f64; 3] = [10.0, 10.0, 10.0];

    fn pattern(name: &str, atoms: &[&str]) -> Molecule {
        let mut m = Molecule::new(0, name);
        for (i, a) in atoms.iter().enumerate() {
            m.add_atom(Atom::new(i + 1, *a));
        }
        m
    }

    fn pair_template() -> ReactionTemplate {
        ReactionTemplate {
            name: "dimerisation".into(),
            reactants: vec![pattern("A", &["C1"]), pattern("A", &["C1"])],
            products: vec![pattern("AA", &["C1", "C2"])],
            transitions: vec![
                Transition {
                    from: (0, 0),
                    to: (0, 0),
                },
                Transition {
                    from: (1, 0),
                    to: (0, 1),
                },
            ],
            translations: Vec::new(),
            criteria: vec![Criterion {
                kind: CriterionKind::Distance,
                atoms: vec![(0, 0), (1, 0)],
                min: 0.0,
                max: 0.5,
            }],
            reaction_energy: -40.0,
            activation_energy: 10.0,
            rate: vec![(0.35, 0.2), (0.40, 0.06), (0.50, 0.04)],
        }
    }

    fn bound_pair(first: [f64; 3], second: [f64; 3]) -> ReactionCandidate {
        let template = pair_template();
        let mut candidate = ReactionCandidate::new(0, &template);

        let mut a = Molecule::new(5, "A");
        a.add_atom(Atom::at(11, "C1", first));
        let mut b = Molecule::new(8, "A");
        b.add_atom(Atom::at(17, "C1", second));
        candidate.update_reactant(0, &a).unwrap();
        candidate.update_reactant(1, &b).unwrap();
        candidate
    }

    #[test]
    fn binding_copies_ids_and_coordinates() {
        let candidate = bound_pair([1.0, 1.0, 1.0], [1.3, 1.0, 1.0]);
        assert_eq!(candidate.reactants()[0].id, 5);
        assert_eq!(candidate.reactants()[0].atoms[0].id, 11);
        assert_eq!(candidate.reactants()[1].atoms[0].position, [1.3, 1.0, 1.0]);
    }

    #[test]
    fn binding_rejects_short_molecules() {
        let template = pair_template();
        let mut candidate = ReactionCandidate::new(0, &template);
        let empty = Molecule::new(5, "A");
        assert!(matches!(
            candidate.update_reactant(0, &empty),
            Err(Error::ReactantMismatch { .. })
        ));
    }

    #[test]
    fn validity_follows_the_distance_window() {
        let mut near = bound_pair([1.0, 1.0, 1.0], [1.3, 1.0, 1.0]);
        assert!(near.valid_all(BOX));
        assert!((near.current_distance() - 0.3).abs() < 1e-12);

        let mut far = bound_pair([1.0, 1.0, 1.0], [3.0, 1.0, 1.0]);
        assert!(!far.valid_all(BOX));
    }

    #[test]
    fn staged_checks_skip_later_criteria() {
        let template = pair_template();
        let mut candidate = ReactionCandidate::new(0, &template);
        let mut a = Molecule::new(5, "A");
        a.add_atom(Atom::at(11, "C1", [1.0, 1.0, 1.0]));
        candidate.update_reactant(0, &a).unwrap();

        // The distance criterion touches reactant 1 and must not fire at
        // stage 0, where only reactant 0 is bound.
        assert!(candidate.valid(BOX, 0));
    }

    #[test]
    fn rate_is_a_step_function_of_distance() {
        let mut candidate = bound_pair([1.0, 1.0, 1.0], [1.3, 1.0, 1.0]);
        assert!(candidate.valid_all(BOX));
        // distance 0.30 lies before the first threshold
        assert!((candidate.current_rate() - 0.2).abs() < 1e-12);

        let mut candidate = bound_pair([1.0, 1.0, 1.0], [1.42, 1.0, 1.0]);
        assert!(candidate.valid_all(BOX));
        // distance 0.42 falls in the [0.40, 0.50) step
        assert!((candidate.current_rate() - 0.06).abs() < 1e-12);
    }

    #[test]
    fn empty_rate_table_reads_as_zero() {
        let mut template = pair_template();
        template.rate.clear();
        let candidate = ReactionCandidate::new(0, &template);
        assert_eq!(candidate.current_rate(), 0.0);
    }

    #[test]
    fn transitions_materialise_products() {
        let mut candidate = bound_pair([1.0, 1.0, 1.0], [1.3, 1.0, 1.0]);
        candidate.apply_transitions();

        let product = &candidate.products()[0];
        assert_eq!(product.atoms[0].id, 11);
        assert_eq!(product.atoms[0].position, [1.0, 1.0, 1.0]);
        assert_eq!(product.atoms[1].id, 17);
        assert_eq!(product.atoms[1].position, [1.3, 1.0, 1.0]);
    }

    #[test]
    fn translations_move_atoms_along_the_connection() {
        let mut candidate = bound_pair([1.0, 1.0, 1.0], [1.3, 1.0, 1.0]);
        candidate.apply_transitions();

        let mut with_translation = candidate.clone();
        with_translation.template.translations.push(Translation {
            atom: (0, 0),
            toward: (0, 1),
            shift: 0.1,
        });
        with_translation.apply_translations();

        let moved = with_translation.products()[0].atoms[0].position;
        assert!((moved[0] - 1.1).abs() < 1e-12);
        assert_eq!(moved[1], 1.0);
    }

    #[test]
    fn angle_criteria_gate_triples() {
        let mut template = pair_template();
        template.criteria.push(Criterion {
            kind: CriterionKind::Angle,
            atoms: vec![(0, 0), (1, 0), (1, 0)],
            min: 100.0,
            max: 150.0,
        });
        // Degenerate angle (all three atoms collinear by construction) is
        // outside the window, so the full check fails.
        let mut candidate = ReactionCandidate::new(0, &template);
        let mut a = Molecule::new(1, "A");
        a.add_atom(Atom::at(1, "C1", [1.0, 1.0, 1.0]));
        let mut b = Molecule::new(2, "A");
        b.add_atom(Atom::at(2, "C1", [1.3, 1.0, 1.0]));
        candidate.update_reactant(0, &a).unwrap();
        candidate.update_reactant(1, &b).unwrap();
        assert!(!candidate.valid_all(BOX));
    }
}
