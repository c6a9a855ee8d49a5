use super::molecule::Molecule;

/// Snapshot of all molecules in the simulation box, together with the
/// bookkeeping needed to track freshly reacted molecules across renumbering.
///
/// Reaction records map the molecule id assigned at product insertion to the
/// molecule's current id; [`Topology::sort`] keeps the values up to date while
/// the keys stay fixed. Atom records are rebuilt from scratch on every sort
/// and only cover atoms of recorded molecules.
#[derive(Debug, Clone, Default)]
pub struct Topology {
    pub molecules: Vec<Molecule>,
    dimensions: [f64; 3],
    cell_numbers: [usize; 3],
    reacted_molecules: Vec<(usize, usize)>,
    reacted_atoms: Vec<(usize, usize)>,
}

impl Topology {
    pub fn new() -> Self {
        Self {
            cell_numbers: [1, 1, 1],
            ..Self::default()
        }
    }

    #[inline]
    pub fn dimensions(&self) -> [f64; 3] {
        self.dimensions
    }

    pub fn set_dimensions(&mut self, dimensions: [f64; 3]) {
        self.dimensions = dimensions;
    }

    #[inline]
    pub fn cell_numbers(&self) -> [usize; 3] {
        self.cell_numbers
    }

    pub fn set_cell_numbers(&mut self, cell_numbers: [usize; 3]) {
        self.cell_numbers = cell_numbers;
    }

    pub fn add_molecule(&mut self, molecule: Molecule) -> &mut Molecule {
        self.molecules.push(molecule);
        self.molecules.last_mut().unwrap()
    }

    /// First molecule with the given id; assumes ids are unique at rest.
    pub fn molecule(&self, id: usize) -> Option<&Molecule> {
        self.molecules.iter().find(|m| m.id == id)
    }

    /// Every molecule with the given name, in topology order.
    pub fn molecules_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Molecule> {
        self.molecules.iter().filter(move |m| m.name == name)
    }

    /// First molecule with the given id, inserted with the given name if
    /// no molecule matches.
    pub fn molecule_or_insert(&mut self, id: usize, name: &str) -> &mut Molecule {
        match self.molecules.iter().position(|m| m.id == id) {
            Some(ix) => &mut self.molecules[ix],
            None => self.add_molecule(Molecule::new(id, name)),
        }
    }

    /// Removes every molecule with the given id. Absent ids are not an error.
    pub fn remove_molecule(&mut self, id: usize) {
        self.molecules.retain(|m| m.id != id);
    }

    /// Removes every molecule matching the given one by id and name.
    pub fn remove_matching(&mut self, molecule: &Molecule) {
        self.molecules
            .retain(|m| m.id != molecule.id || m.name != molecule.name);
    }

    pub fn contains_id(&self, id: usize) -> bool {
        self.molecules.iter().any(|m| m.id == id)
    }

    /// Membership by id and name together, the form availability checks use.
    pub fn contains(&self, molecule: &Molecule) -> bool {
        self.molecules
            .iter()
            .any(|m| m.id == molecule.id && m.name == molecule.name)
    }

    /// De-duplicated molecule names in first-occurrence order.
    pub fn molecule_types(&self) -> Vec<String> {
        let mut types: Vec<String> = Vec::new();
        for m in &self.molecules {
            if !types.iter().any(|t| *t == m.name) {
                types.push(m.name.clone());
            }
        }
        types
    }

    pub fn atom_count(&self) -> usize {
        self.molecules.iter().map(|m| m.atom_count()).sum()
    }

    #[inline]
    pub fn molecule_count(&self) -> usize {
        self.molecules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.molecules.is_empty()
    }

    /// Records a freshly inserted product molecule. Until the next sort the
    /// molecule's current id is the insertion id itself.
    pub fn add_reaction_record(&mut self, id: usize) {
        self.reacted_molecules.push((id, id));
    }

    /// Current id of a recorded molecule, keyed by its insertion id.
    pub fn reaction_record(&self, inserted_id: usize) -> Option<usize> {
        self.reacted_molecules
            .iter()
            .find(|(old, _)| *old == inserted_id)
            .map(|(_, current)| *current)
    }

    pub fn reacted_molecule_records(&self) -> &[(usize, usize)] {
        &self.reacted_molecules
    }

    /// `(old atom id, current atom id)` pairs for atoms of recorded
    /// molecules, rebuilt by the latest [`Topology::sort`].
    pub fn reacted_atom_records(&self) -> &[(usize, usize)] {
        &self.reacted_atoms
    }

    pub fn clear_reaction_records(&mut self) {
        self.reacted_molecules.clear();
        self.reacted_atoms.clear();
    }

    pub fn clear(&mut self) {
        self.molecules.clear();
        self.dimensions = [0.0; 3];
        self.clear_reaction_records();
    }

    /// Stable-sorts molecules by name and renumbers molecule ids to `1..=M`
    /// and atom ids to `1..=A` in molecule order. The only operation allowed
    /// to change ids. Reaction-record values follow the renumbering; atom
    /// records are rebuilt for recorded molecules.
    pub fn sort(&mut self) {
        self.reacted_atoms.clear();
        self.molecules.sort_by(|lhs, rhs| lhs.name.cmp(&rhs.name));

        let records = &mut self.reacted_molecules;
        let atom_records = &mut self.reacted_atoms;

        let mut molecule_counter = 0usize;
        let mut atom_counter = 0usize;
        for m in &mut self.molecules {
            molecule_counter += 1;
            let recorded = match records.iter_mut().find(|(old, _)| *old == m.id) {
                Some(record) => {
                    record.1 = molecule_counter;
                    true
                }
                None => false,
            };
            m.id = molecule_counter;
            for a in &mut m.atoms {
                atom_counter += 1;
                if recorded {
                    atom_records.push((a.id, atom_counter));
                }
                a.id = atom_counter;
            }
        }
    }
}
