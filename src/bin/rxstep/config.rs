//! The run configuration file.
//!
//! ```toml
//! [simulation]
//! engine     = "gromacs"
//! algorithm  = "rate"
//! cycles     = 100
//! cells      = [4, 4, 4]
//! seed       = 0            # optional; omit for an OS seed
//! statistics = "statistics.dat"
//!
//! [reaction]
//! files     = ["dimerisation.toml"]
//! frequency = 0.25          # rate algorithm
//! # temperature = 300.0     # mc algorithm
//!
//! [gromacs]
//! mdp            = "md.mdp"
//! mdp_relaxation = "relax.mdp"
//! threads        = 4
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use rxstep::AcceptancePolicy;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub simulation: SimulationSection,
    pub reaction: ReactionSection,
    #[serde(default)]
    pub gromacs: GromacsSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSection {
    pub engine: EngineKind,
    pub algorithm: AlgorithmKind,
    pub cycles: usize,
    pub cells: [usize; 3],
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub statistics: Option<PathBuf>,
    /// Directory holding the per-cycle engine files.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Gromacs,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmKind {
    Rate,
    Mc,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactionSection {
    pub files: Vec<PathBuf>,
    #[serde(default)]
    pub frequency: Option<f64>,
    #[serde(default)]
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GromacsSection {
    pub command: String,
    pub mdp: PathBuf,
    pub mdp_relaxation: PathBuf,
    pub threads: usize,
}

impl Default for GromacsSection {
    fn default() -> Self {
        Self {
            command: "gmx".to_string(),
            mdp: PathBuf::from("md.mdp"),
            mdp_relaxation: PathBuf::from("relax.mdp"),
            threads: 0,
        }
    }
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

pub fn load(path: &Path) -> Result<RunConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read configuration file '{}'", path.display()))?;
    let config: RunConfig = toml::from_str(&text)
        .with_context(|| format!("cannot parse configuration file '{}'", path.display()))?;
    config.acceptance_policy()?;
    Ok(config)
}

impl RunConfig {
    /// The acceptance policy the configuration selects, with the inputs the
    /// chosen algorithm requires.
    pub fn acceptance_policy(&self) -> Result<AcceptancePolicy> {
        match self.simulation.algorithm {
            AlgorithmKind::Rate => {
                let Some(frequency) = self.reaction.frequency else {
                    bail!("algorithm 'rate' requires reaction.frequency");
                };
                Ok(AcceptancePolicy::Rate { frequency })
            }
            AlgorithmKind::Mc => {
                let Some(temperature) = self.reaction.temperature else {
                    bail!("algorithm 'mc' requires reaction.temperature");
                };
                Ok(AcceptancePolicy::MonteCarlo { temperature })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        r#"
[simulation]
engine = "gromacs"
algorithm = "rate"
cycles = 50
cells = [4, 4, 4]
statistics = "statistics.dat"

[reaction]
files = ["dimerisation.toml"]
frequency = 0.25

[gromacs]
threads = 8
"#
    }

    #[test]
    fn parses_a_complete_configuration() {
        let config: RunConfig = toml::from_str(sample()).unwrap();
        assert_eq!(config.simulation.cycles, 50);
        assert_eq!(config.simulation.cells, [4, 4, 4]);
        assert_eq!(config.simulation.engine, EngineKind::Gromacs);
        assert_eq!(config.gromacs.threads, 8);
        assert_eq!(config.gromacs.command, "gmx");
        assert!(matches!(
            config.acceptance_policy().unwrap(),
            AcceptancePolicy::Rate { frequency } if frequency == 0.25
        ));
    }

    #[test]
    fn rate_algorithm_requires_a_frequency() {
        let mut config: RunConfig = toml::from_str(sample()).unwrap();
        config.reaction.frequency = None;
        assert!(config.acceptance_policy().is_err());
    }

    #[test]
    fn mc_algorithm_requires_a_temperature() {
        let mut config: RunConfig = toml::from_str(sample()).unwrap();
        config.simulation.algorithm = AlgorithmKind::Mc;
        assert!(config.acceptance_policy().is_err());
        config.reaction.temperature = Some(300.0);
        assert!(matches!(
            config.acceptance_policy().unwrap(),
            AcceptancePolicy::MonteCarlo { temperature } if temperature == 300.0
        ));
    }
}
