use super::atom::Atom;

/// An ordered collection of atoms. Atom order is chemically meaningful and
/// must match the order used by the MD engine's topology files.
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    pub id: usize,
    pub name: String,
    pub atoms: Vec<Atom>,
}

impl Molecule {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            atoms: Vec::new(),
        }
    }

    pub fn add_atom(&mut self, atom: Atom) -> &mut Atom {
        self.atoms.push(atom);
        self.atoms.last_mut().unwrap()
    }

    /// First atom with the given id, if any.
    pub fn atom(&self, id: usize) -> Option<&Atom> {
        self.atoms.iter().find(|a| a.id == id)
    }

    pub fn contains_atom_name(&self, name: &str) -> bool {
        self.atoms.iter().any(|a| a.name == name)
    }

    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}
