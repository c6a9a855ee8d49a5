//! Per-cycle file exchange with GROMACS.
//!
//! Cycle `X` reads `X.top` + `X-md.gro`, writes the mutated topology as
//! `X.top` + `X-rs.gro` for the relaxation run, and reads the relaxed
//! configuration back from `X-rs.gro` (which mdrun overwrites). Index files
//! `X.reactants.ndx` / `X.products.ndx` carry the atom reaction records.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use log::{debug, warn};

use super::top::TopFile;
use super::{gro, top, Error, TopologyStore};
use crate::model::topology::Topology;

pub struct GromacsStore {
    directory: PathBuf,
    top_template: Option<TopFile>,
}

impl GromacsStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            top_template: None,
        }
    }

    fn path(&self, file: &str) -> PathBuf {
        self.directory.join(file)
    }

    fn open(&self, file: &str) -> Result<BufReader<File>, Error> {
        let path = self.path(file);
        File::open(&path)
            .map(BufReader::new)
            .map_err(|e| Error::open(path.display().to_string(), e))
    }

    fn create(&self, file: &str) -> Result<BufWriter<File>, Error> {
        let path = self.path(file);
        File::create(&path)
            .map(BufWriter::new)
            .map_err(|e| Error::open(path.display().to_string(), e))
    }

    fn read_configuration(
        &mut self,
        topology: &mut Topology,
        top_file: &str,
        gro_file: &str,
    ) -> Result<(), Error> {
        let parsed = top::read(self.open(top_file)?)?;
        let title = gro::read(self.open(gro_file)?, topology)?;
        if title != parsed.system_name {
            warn!(
                "system names don't agree ('{}' vs. '{}')",
                parsed.system_name, title
            );
        }

        // The .top counts and the .gro contents describe the same system;
        // disagreement points at stale files and deserves a loud note.
        let mut total = 0;
        for (name, count) in &parsed.molecule_counts {
            let found = topology.molecules_named(name).count();
            if found != *count {
                warn!(
                    "{top_file} and {gro_file} don't match (# molecules of type {name}: {count} vs. {found})"
                );
            }
            total += found;
        }
        if total != topology.molecule_count() {
            warn!(
                "total number of molecules in {gro_file} and {top_file} doesn't match ({} vs. {})",
                topology.molecule_count(),
                total
            );
        }

        if self.top_template.is_none() {
            self.top_template = Some(parsed);
        }
        Ok(())
    }

    fn write_index_files(&self, topology: &Topology, cycle: usize) -> Result<(), Error> {
        use std::io::Write;

        let mut reactants = self.create(&format!("{cycle}.reactants.ndx"))?;
        let mut products = self.create(&format!("{cycle}.products.ndx"))?;
        writeln!(reactants, "[ reacted_atoms ]")?;
        writeln!(products, "[ reacted_atoms ]")?;
        for (old, new) in topology.reacted_atom_records() {
            write!(reactants, "{old} ")?;
            write!(products, "{new} ")?;
        }
        writeln!(reactants)?;
        writeln!(products)?;
        Ok(())
    }
}

impl TopologyStore for GromacsStore {
    fn read(&mut self, topology: &mut Topology, cycle: usize) -> Result<(), Error> {
        debug!("reading topology of cycle {cycle}");
        self.read_configuration(topology, &format!("{cycle}.top"), &format!("{cycle}-md.gro"))
    }

    fn read_relaxed(&mut self, topology: &mut Topology, cycle: usize) -> Result<(), Error> {
        debug!("reading relaxed configuration of cycle {cycle}");
        self.read_configuration(topology, &format!("{cycle}.top"), &format!("{cycle}-rs.gro"))
    }

    fn write(&mut self, topology: &Topology, cycle: usize) -> Result<(), Error> {
        let template = self
            .top_template
            .clone()
            .unwrap_or_else(|| TopFile {
                system_name: "reactive system".to_string(),
                molecule_counts: Vec::new(),
                lines: vec!["[ system ]".to_string(), "[ molecules ]".to_string()],
            });

        top::write(&mut self.create(&format!("{cycle}.top"))?, &template, topology)?;
        gro::write(
            &mut self.create(&format!("{cycle}-rs.gro"))?,
            topology,
            &format!("{} (created by rxstep)", template.system_name),
        )?;
        self.write_index_files(topology, cycle)?;
        Ok(())
    }
}
