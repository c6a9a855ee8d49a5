use std::io::Write;

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::candidate::ReactionCandidate;
use super::config::{AcceptancePolicy, SimulationConfig};
use super::error::Error;
use super::universe::{MovementSeverity, Universe};
use crate::engine::MdEngine;

/// Counters of one reactive step. The per-template vectors are indexed like
/// the universe's template list.
#[derive(Debug, Clone)]
pub struct CycleStats {
    pub cycle: usize,
    pub candidates: usize,
    pub accepted: Vec<usize>,
    pub attempted: Vec<usize>,
}

impl CycleStats {
    pub fn total_accepted(&self) -> usize {
        self.accepted.iter().sum()
    }

    pub fn total_attempted(&self) -> usize {
        self.attempted.iter().sum()
    }
}

/// The per-cycle controller: searches candidates, accepts a stochastic
/// subset, commits them and drives the MD engine through relaxation and the
/// following MD segment.
pub struct Simulator {
    universe: Universe,
    engine: Box<dyn MdEngine>,
    policy: AcceptancePolicy,
    rng: StdRng,
    statistics: Option<Box<dyn Write>>,
    cycles: usize,
    current_cycle: usize,
    last_reactive_cycle: usize,
    cycles_with_reaction: usize,
    cycles_without_reaction: usize,
}

impl Simulator {
    pub fn new(
        universe: Universe,
        engine: Box<dyn MdEngine>,
        config: &SimulationConfig,
        statistics: Option<Box<dyn Write>>,
    ) -> Result<Self, Error> {
        let rng = match config.seed {
            Some(seed) => {
                info!("seeding random engine with {seed}");
                StdRng::seed_from_u64(seed)
            }
            None => StdRng::from_entropy(),
        };

        // Cross-check the templates against the chosen policy; questionable
        // input is worth a warning but never fatal.
        for template in universe.templates() {
            match config.policy {
                AcceptancePolicy::MonteCarlo { .. } if template.reaction_energy == 0.0 => {
                    warn!(
                        "reaction '{}' has zero reaction energy, are you sure that is correct?",
                        template.name
                    );
                }
                AcceptancePolicy::Rate { .. } if template.rate.is_empty() => {
                    warn!(
                        "reaction '{}' has no rate input, are you sure that is correct?",
                        template.name
                    );
                }
                _ => {}
            }
        }

        let mut simulator = Self {
            universe,
            engine,
            policy: config.policy,
            rng,
            statistics,
            cycles: config.cycles,
            current_cycle: 1,
            last_reactive_cycle: 0,
            cycles_with_reaction: 0,
            cycles_without_reaction: 0,
        };
        simulator.write_statistics_header()?;
        Ok(simulator)
    }

    #[inline]
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Runs the configured number of cycles. `on_cycle` observes each
    /// completed reactive step, before the following MD segment.
    pub fn run(&mut self, mut on_cycle: impl FnMut(&CycleStats)) -> Result<(), Error> {
        if self.current_cycle == 1 {
            info!("@ cycle 0 (initial md segment)");
            self.engine.run_md_initial()?;
        }
        while self.current_cycle <= self.cycles {
            info!("@ cycle {}", self.current_cycle);
            let stats = self.reactive_step()?;
            on_cycle(&stats);
            self.md_sequence()?;
            self.current_cycle += 1;
        }
        Ok(())
    }

    /// One reactive step: snapshot, search, accept-and-commit in shuffle
    /// order, then relax if anything reacted. A failed relaxation aborts the
    /// simulation.
    pub fn reactive_step(&mut self) -> Result<CycleStats, Error> {
        self.universe.update(self.last_reactive_cycle)?;
        let mut candidates = self.universe.search_candidates(&mut self.rng)?;

        let template_count = self.universe.templates().len();
        let mut stats = CycleStats {
            cycle: self.current_cycle,
            candidates: candidates.len(),
            accepted: vec![0; template_count],
            attempted: vec![0; template_count],
        };

        if candidates.is_empty() {
            info!("found no reaction candidates");
            self.cycles_without_reaction += 1;
            self.write_statistics(&stats)?;
            return Ok(stats);
        }
        info!("found {} potential reaction candidates", candidates.len());

        let mut accepted = Vec::new();
        for candidate in &mut candidates {
            if !self.universe.is_available(candidate) {
                debug!(
                    "{} is no longer available for reaction",
                    candidate.short_info()
                );
                continue;
            }
            stats.attempted[candidate.template_index()] += 1;
            if self.accept(candidate) {
                self.universe.react(candidate);
                stats.accepted[candidate.template_index()] += 1;
                info!("reacted candidate {}", candidate.short_info());
                accepted.push(candidate.clone());
            }
        }

        if stats.total_accepted() > 0 {
            info!(
                "reacted {} out of {} available candidates (out of {} candidates)",
                stats.total_accepted(),
                stats.total_attempted(),
                stats.candidates
            );
            self.universe.write(self.current_cycle)?;
            if !self.engine.run_relaxation(self.current_cycle)? {
                warn!("relaxation failed, stepping out");
                return Err(Error::RelaxationFailed {
                    cycle: self.current_cycle,
                });
            }
            info!("relaxation succeeded");
            self.last_reactive_cycle = self.current_cycle;
            self.cycles_with_reaction += 1;

            self.universe.read_relaxed(self.current_cycle)?;
            for candidate in &accepted {
                self.report_movement(candidate)?;
            }
        } else {
            info!("no candidates were accepted");
            self.cycles_without_reaction += 1;
        }

        self.write_statistics(&stats)?;
        Ok(stats)
    }

    fn accept(&mut self, candidate: &ReactionCandidate) -> bool {
        let random = self.rng.gen_range(0.0..1.0);
        let (accepted, condition) = match self.policy {
            AcceptancePolicy::Rate { frequency } => {
                let condition = frequency * candidate.current_rate();
                (accept_rate(random, frequency, candidate.current_rate()), condition)
            }
            AcceptancePolicy::MonteCarlo { temperature } => {
                let gas_constant = self.universe.units().gas_constant();
                let condition =
                    (-candidate.reaction_energy() / (gas_constant * temperature)).exp();
                (
                    accept_metropolis(
                        random,
                        candidate.reaction_energy(),
                        temperature,
                        gas_constant,
                    ),
                    condition,
                )
            }
        };
        debug!(
            "candidate {}: {random:.3} {} {condition:.3}",
            candidate.short_info(),
            if accepted { "<" } else { "!<" },
        );
        accepted
    }

    fn md_sequence(&mut self) -> Result<(), Error> {
        if self.last_reactive_cycle == self.current_cycle {
            self.engine.run_md(self.current_cycle)?;
        } else {
            self.engine
                .run_md_appending(self.current_cycle, self.last_reactive_cycle)?;
        }
        Ok(())
    }

    fn report_movement(&self, candidate: &ReactionCandidate) -> Result<(), Error> {
        let length_unit = self.universe.units().length;
        for w in self.universe.check_movement(candidate)? {
            let factor = match w.severity {
                MovementSeverity::Large => 2.0,
                MovementSeverity::VeryLarge => 3.0,
            };
            warn!(
                "atom {} {} of molecule {} {} moved {:.3} {} ( > {} * {:.3} {} )",
                w.atom_name,
                w.atom_id,
                w.molecule_name,
                w.molecule_id,
                w.distance,
                length_unit,
                factor,
                w.typical_distance,
                length_unit,
            );
        }
        Ok(())
    }

    fn write_statistics_header(&mut self) -> Result<(), Error> {
        if let Some(sink) = self.statistics.as_mut() {
            writeln!(
                sink,
                "{:>10} {:>14}    {:<24} {:<24}",
                "# cycle", "candidates", "accepted per reaction", "attempted per reaction"
            )
            .map_err(crate::io::Error::from)?;
        }
        Ok(())
    }

    fn write_statistics(&mut self, stats: &CycleStats) -> Result<(), Error> {
        if let Some(sink) = self.statistics.as_mut() {
            let joined = |counts: &[usize]| {
                counts
                    .iter()
                    .map(|c| format!("{c:>6}"))
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            writeln!(
                sink,
                "{:>10} {:>14}    {:<24} {:<24}",
                stats.cycle,
                stats.candidates,
                joined(&stats.accepted),
                joined(&stats.attempted)
            )
            .map_err(crate::io::Error::from)?;
            sink.flush().map_err(crate::io::Error::from)?;
        }
        Ok(())
    }

    /// Logs the closing summary.
    pub fn finish(&self) {
        info!("finished reactive-step simulation");
        info!(
            "total {} cycles have been performed:",
            self.cycles_with_reaction + self.cycles_without_reaction
        );
        info!("      {} with reactions", self.cycles_with_reaction);
        info!("      {} without reaction", self.cycles_without_reaction);
    }
}

/// Rate-based acceptance: the draw must fall below `frequency * rate`.
/// Products above one always accept.
pub fn accept_rate(random: f64, frequency: f64, rate: f64) -> bool {
    random < frequency * rate
}

/// Metropolis acceptance against the reaction energy at the given
/// temperature.
pub fn accept_metropolis(random: f64, energy: f64, temperature: f64, gas_constant: f64) -> bool {
    random < (-energy / (gas_constant * temperature)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{self, TopologyStore};
    use crate::model::atom::Atom;
    use crate::model::molecule::Molecule;
    use crate::model::topology::Topology;
    use crate::step::config::UnitSystem;
    use crate::step::template::{Criterion, CriterionKind, ReactionTemplate, Transition};

    #[test]
    fn rate_acceptance_compares_the_draw_with_the_scaled_rate() {
        // frequency 0.25 and rate 2.0 give the condition 0.5
        assert!(accept_rate(0.4, 0.25, 2.0));
        assert!(!accept_rate(0.6, 0.25, 2.0));
    }

    #[test]
    fn rate_products_above_one_always_accept() {
        assert!(accept_rate(0.999_999, 2.0, 1.0));
    }

    #[test]
    fn metropolis_accepts_downhill_reactions_always() {
        let r = UnitSystem::gromacs().gas_constant();
        assert!(accept_metropolis(0.999, -50.0, 300.0, r));
    }

    #[test]
    fn metropolis_rejects_strongly_uphill_reactions() {
        let r = UnitSystem::gromacs().gas_constant();
        assert!(!accept_metropolis(0.01, 50.0, 300.0, r));
    }

    struct MemoryStore {
        initial: Topology,
        written: Option<Topology>,
    }

    impl TopologyStore for MemoryStore {
        fn read(&mut self, topology: &mut Topology, _cycle: usize) -> Result<(), io::Error> {
            *topology = self.initial.clone();
            Ok(())
        }

        fn read_relaxed(
            &mut self,
            topology: &mut Topology,
            _cycle: usize,
        ) -> Result<(), io::Error> {
            *topology = self.written.clone().expect("nothing was written");
            Ok(())
        }

        fn write(&mut self, topology: &Topology, _cycle: usize) -> Result<(), io::Error> {
            self.written = Some(topology.clone());
            Ok(())
        }
    }

    struct NullEngine {
        relaxation_succeeds: bool,
    }

    impl MdEngine for NullEngine {
        fn verify(&self) -> Result<(), crate::engine::Error> {
            Ok(())
        }

        fn run_md_initial(&self) -> Result<(), crate::engine::Error> {
            Ok(())
        }

        fn run_md(&self, _cycle: usize) -> Result<(), crate::engine::Error> {
            Ok(())
        }

        fn run_md_appending(
            &self,
            _cycle: usize,
            _last_reactive: usize,
        ) -> Result<(), crate::engine::Error> {
            Ok(())
        }

        fn run_relaxation(&self, _cycle: usize) -> Result<bool, crate::engine::Error> {
            Ok(self.relaxation_succeeds)
        }
    }

    fn pattern(name: &str, atoms: &[&str]) -> Molecule {
        let mut m = Molecule::new(0, name);
        for (i, a) in atoms.iter().enumerate() {
            m.add_atom(Atom::new(i + 1, *a));
        }
        m
    }

    fn fusion_template() -> ReactionTemplate {
        ReactionTemplate {
            name: "fusion".into(),
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
            reaction_energy: -10.0,
            activation_energy: 0.0,
            rate: vec![(0.0, 1.0)],
        }
    }

    fn three_a_topology() -> Topology {
        let mut top = Topology::new();
        top.set_dimensions([10.0, 10.0, 10.0]);
        for (id, x) in [(1usize, 1.0), (2, 1.2), (3, 1.4)] {
            let mut m = Molecule::new(id, "A");
            m.add_atom(Atom::at(1, "C1", [x, 1.0, 1.0]));
            top.add_molecule(m);
        }
        top
    }

    fn simulator(relaxation_succeeds: bool, frequency: f64) -> Simulator {
        let universe = Universe::new(
            Box::new(MemoryStore {
                initial: three_a_topology(),
                written: None,
            }),
            vec![fusion_template()],
            [1, 1, 1],
            UnitSystem::gromacs(),
        )
        .unwrap();
        let config = SimulationConfig {
            policy: AcceptancePolicy::Rate { frequency },
            cycles: 1,
            seed: Some(42),
        };
        Simulator::new(
            universe,
            Box::new(NullEngine {
                relaxation_succeeds,
            }),
            &config,
            None,
        )
        .unwrap()
    }

    #[test]
    fn consumed_reactants_skip_later_candidates() {
        // Frequency far above one accepts every available candidate; the
        // first accepted pair consumes two of the three molecules, so both
        // remaining pairs drop out of the availability check.
        let mut sim = simulator(true, 1e6);
        let stats = sim.reactive_step().unwrap();

        assert_eq!(stats.candidates, 3);
        assert_eq!(stats.attempted, vec![1]);
        assert_eq!(stats.accepted, vec![1]);

        // One two-atom product replaced two one-atom reactants.
        assert_eq!(sim.universe().current().molecule_count(), 2);
        assert_eq!(sim.universe().current().atom_count(), 3);
    }

    #[test]
    fn zero_frequency_accepts_nothing() {
        let mut sim = simulator(true, 0.0);
        let stats = sim.reactive_step().unwrap();

        assert_eq!(stats.candidates, 3);
        assert_eq!(stats.total_accepted(), 0);
        // Every candidate stayed available, so all three were attempted.
        assert_eq!(stats.attempted, vec![3]);
    }

    #[test]
    fn failed_relaxation_is_fatal() {
        let mut sim = simulator(false, 1e6);
        assert!(matches!(
            sim.reactive_step(),
            Err(Error::RelaxationFailed { .. })
        ));
    }

    #[test]
    fn run_drives_all_cycles() {
        let mut sim = simulator(true, 1e6);
        sim.cycles = 3;
        let mut seen = Vec::new();
        sim.run(|stats| seen.push(stats.cycle)).unwrap();
        assert_eq!(seen, vec![1, 2, 3]);
    }
}
