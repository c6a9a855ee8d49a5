use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("molecule {id} not found in topology")]
    MoleculeNotFound { id: usize },

    #[error("no reaction record for molecule {id}; records are corrupted")]
    RecordNotFound { id: usize },

    #[error("molecule {id} has no atoms and cannot be placed in the cell grid")]
    EmptyMolecule { id: usize },

    #[error("box dimensions must be positive, got {dimensions:?}")]
    InvalidBox { dimensions: [f64; 3] },

    #[error("cell grid shape must be at least 1 on every axis, got {shape:?}")]
    InvalidGrid { shape: [usize; 3] },

    #[error("reaction '{name}' is malformed: {detail}")]
    Template { name: String, detail: String },

    #[error("reactant {reactant} of reaction '{name}' expects {expected} atoms but molecule {id} has {found}")]
    ReactantMismatch {
        name: String,
        reactant: usize,
        expected: usize,
        id: usize,
        found: usize,
    },

    #[error("relaxation failed in cycle {cycle}")]
    RelaxationFailed { cycle: usize },

    #[error(transparent)]
    Engine(#[from] crate::engine::Error),

    #[error(transparent)]
    Io(#[from] crate::io::Error),
}

impl Error {
    pub fn template(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Template {
            name: name.into(),
            detail: detail.into(),
        }
    }
}
