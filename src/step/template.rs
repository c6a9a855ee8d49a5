use super::error::Error;
use crate::geometry;
use crate::model::molecule::Molecule;

/// Geometric predicate kinds a criterion can evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionKind {
    Distance,
    Angle,
    Dihedral,
}

impl CriterionKind {
    pub fn arity(self) -> usize {
        match self {
            Self::Distance => 2,
            Self::Angle => 3,
            Self::Dihedral => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Angle => "angle",
            Self::Dihedral => "dihedral",
        }
    }
}

/// A predicate over bound reactant atoms. `atoms` holds
/// `(reactant index, atom index)` pairs; the value must fall in
/// `[min, max]` (degrees for angles and dihedrals).
#[derive(Debug, Clone)]
pub struct Criterion {
    pub kind: CriterionKind,
    pub atoms: Vec<(usize, usize)>,
    pub min: f64,
    pub max: f64,
}

impl Criterion {
    /// The largest reactant index this criterion touches, which is the
    /// earliest point during tuple construction at which it can be checked.
    pub fn stage(&self) -> usize {
        self.atoms.iter().map(|&(mol, _)| mol).max().unwrap_or(0)
    }

    /// Evaluates the criterion on the given reactants. Assumes indices were
    /// validated at load time.
    pub fn evaluate(&self, reactants: &[Molecule], dimensions: [f64; 3]) -> f64 {
        let p = |i: usize| reactants[self.atoms[i].0].atoms[self.atoms[i].1].position;
        match self.kind {
            CriterionKind::Distance => geometry::distance(p(0), p(1), dimensions),
            CriterionKind::Angle => geometry::angle(p(0), p(1), p(2), dimensions),
            CriterionKind::Dihedral => geometry::dihedral(p(0), p(1), p(2), p(3), dimensions),
        }
    }

    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Copies one atom's id, position and velocity from a reactant slot into a
/// product slot. Indices are `(molecule, atom)` positions in the respective
/// pattern lists.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: (usize, usize),
    pub to: (usize, usize),
}

/// Moves a product atom along its connection vector towards (positive shift)
/// or away from (negative shift) another product atom.
#[derive(Debug, Clone, Copy)]
pub struct Translation {
    pub atom: (usize, usize),
    pub toward: (usize, usize),
    pub shift: f64,
}

/// Declarative description of one reaction: which molecules react, what they
/// become, and under which geometric conditions. Immutable after load.
///
/// Reactant and product patterns are molecules whose atom ids number the
/// pattern positions `1..=n`; binding replaces them with real ids and
/// coordinates. The rate table maps the value of the first criterion (by
/// convention a distance) to a reaction rate, as a step function.
#[derive(Debug, Clone)]
pub struct ReactionTemplate {
    pub name: String,
    pub reactants: Vec<Molecule>,
    pub products: Vec<Molecule>,
    pub transitions: Vec<Transition>,
    pub translations: Vec<Translation>,
    pub criteria: Vec<Criterion>,
    pub reaction_energy: f64,
    pub activation_energy: f64,
    pub rate: Vec<(f64, f64)>,
}

/// Most reactants a single reaction may bind.
pub const MAX_REACTANTS: usize = 4;

impl ReactionTemplate {
    /// Checks internal consistency. Any failure here is fatal at setup time.
    pub fn validate(&self) -> Result<(), Error> {
        if self.reactants.is_empty() {
            return Err(Error::template(&self.name, "no reactant molecule given"));
        }
        if self.reactants.len() > MAX_REACTANTS {
            return Err(Error::template(
                &self.name,
                format!(
                    "{} reactants given, at most {MAX_REACTANTS} are supported",
                    self.reactants.len()
                ),
            ));
        }
        if self.products.is_empty() {
            return Err(Error::template(&self.name, "no product molecule given"));
        }

        // Binding and transitions address pattern atoms by list position, so
        // every pattern must number its atoms 1..=n in order.
        for (kind, patterns) in [("reactant", &self.reactants), ("product", &self.products)] {
            for (mol, pattern) in patterns.iter().enumerate() {
                for (pos, atom) in pattern.atoms.iter().enumerate() {
                    if atom.id != pos + 1 {
                        return Err(Error::template(
                            &self.name,
                            format!(
                                "{kind} {} atoms must be numbered consecutively from 1 \
                                 (atom {} is numbered {})",
                                mol + 1,
                                pos + 1,
                                atom.id
                            ),
                        ));
                    }
                }
            }
        }

        for t in &self.transitions {
            self.check_slot(&self.reactants, t.from, "transition origin")?;
            self.check_slot(&self.products, t.to, "transition target")?;
        }
        for t in &self.translations {
            self.check_slot(&self.products, t.atom, "translated atom")?;
            self.check_slot(&self.products, t.toward, "translation reference atom")?;
        }

        for criterion in &self.criteria {
            if criterion.atoms.len() != criterion.kind.arity() {
                return Err(Error::template(
                    &self.name,
                    format!(
                        "{} criterion needs {} atoms, got {}",
                        criterion.kind.label(),
                        criterion.kind.arity(),
                        criterion.atoms.len()
                    ),
                ));
            }
            if criterion.stage() >= self.reactants.len() {
                return Err(Error::template(
                    &self.name,
                    format!(
                        "criterion references reactant {} but only {} reactants exist",
                        criterion.stage() + 1,
                        self.reactants.len()
                    ),
                ));
            }
            for &slot in &criterion.atoms {
                self.check_slot(&self.reactants, slot, "criterion atom")?;
            }
            if criterion.min >= criterion.max {
                return Err(Error::template(
                    &self.name,
                    "criterion minimum and maximum appear interchanged",
                ));
            }
        }

        Ok(())
    }

    fn check_slot(
        &self,
        molecules: &[Molecule],
        (mol, atom): (usize, usize),
        what: &str,
    ) -> Result<(), Error> {
        if mol >= molecules.len() || atom >= molecules[mol].atoms.len() {
            return Err(Error::template(
                &self.name,
                format!("{what} ({}, {}) does not exist", mol + 1, atom + 1),
            ));
        }
        Ok(())
    }
}
