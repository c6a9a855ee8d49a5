//! Configuration types for the reactive-step driver.

/// How candidates are accepted during a reactive step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcceptancePolicy {
    /// Accept with probability `frequency * rate(candidate)`, clamped at 1.
    Rate { frequency: f64 },
    /// Metropolis test against the template-supplied reaction energy:
    /// accept with probability `exp(-energy / (R * temperature))`.
    MonteCarlo { temperature: f64 },
}

/// Settings for one simulation run. The cell grid shape lives on the
/// universe, which owns the candidate search.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub policy: AcceptancePolicy,
    /// Number of reactive cycles to perform.
    pub cycles: usize,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            policy: AcceptancePolicy::Rate { frequency: 1.0 },
            cycles: 1,
            seed: None,
        }
    }
}

/// Unit labels of the MD engine's native unit system, carried opaquely for
/// log output. The gas constant matches the energy unit; no quantity is ever
/// converted.
#[derive(Debug, Clone)]
pub struct UnitSystem {
    pub length: &'static str,
    pub time: &'static str,
    pub energy: &'static str,
    pub temperature: &'static str,
    gas_constant: f64,
}

impl UnitSystem {
    /// GROMACS units: nm, ps, kJ/mol, K.
    pub fn gromacs() -> Self {
        Self {
            length: "nm",
            time: "ps",
            energy: "kJ/mol",
            temperature: "K",
            gas_constant: 0.008_314_462_618,
        }
    }

    /// Molar gas constant in `energy` per `temperature`.
    #[inline]
    pub fn gas_constant(&self) -> f64 {
        self.gas_constant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gromacs_units_use_kilojoule_gas_constant() {
        let units = UnitSystem::gromacs();
        assert_eq!(units.energy, "kJ/mol");
        assert!((units.gas_constant() - 0.0083144626).abs() < 1e-9);
    }
}
