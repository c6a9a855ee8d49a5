use std::fs::File;
use std::io::{BufWriter, IsTerminal, Write};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use rxstep::engine::{GromacsConfig, GromacsEngine};
use rxstep::io::{reaction, GromacsStore};
use rxstep::{MdEngine, SimulationConfig, Simulator, UnitSystem, Universe};

use crate::cli::{Command, RunArgs};
use crate::config::{self, EngineKind};

pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Run(args) => run(args),
        Command::ExampleReaction => {
            print!("{}", reaction::example());
            Ok(())
        }
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut run_config = config::load(&args.config)?;
    if args.seed.is_some() {
        run_config.simulation.seed = args.seed;
    }

    info!("setting up the simulation world ...");

    let mut templates = Vec::with_capacity(run_config.reaction.files.len());
    for file in &run_config.reaction.files {
        info!("reading reaction template from '{}'", file.display());
        let template = reaction::load(file)
            .with_context(|| format!("cannot load reaction template '{}'", file.display()))?;
        templates.push(template);
    }

    let EngineKind::Gromacs = run_config.simulation.engine;
    let store = GromacsStore::new(&run_config.simulation.directory);
    let engine = GromacsEngine::new(GromacsConfig {
        command: run_config.gromacs.command.clone(),
        mdp: run_config.gromacs.mdp.clone(),
        mdp_relaxation: run_config.gromacs.mdp_relaxation.clone(),
        directory: run_config.simulation.directory.clone(),
        threads: run_config.gromacs.threads,
    });
    engine
        .verify()
        .context("the MD engine executable is not usable")?;

    let universe = Universe::new(
        Box::new(store),
        templates,
        run_config.simulation.cells,
        UnitSystem::gromacs(),
    )?;

    let statistics: Option<Box<dyn Write>> = match &run_config.simulation.statistics {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot open statistics file '{}'", path.display()))?;
            Some(Box::new(BufWriter::new(file)))
        }
        None => None,
    };

    let simulation = SimulationConfig {
        policy: run_config.acceptance_policy()?,
        cycles: run_config.simulation.cycles,
        seed: run_config.simulation.seed,
    };
    let mut simulator = Simulator::new(universe, Box::new(engine), &simulation, statistics)?;

    info!("... setup done, time to start the simulation!");

    let progress = cycle_progress(run_config.simulation.cycles, args.quiet);
    simulator.run(|stats| {
        if let Some(bar) = &progress {
            bar.set_message(format!(
                "{} candidates, {} accepted",
                stats.candidates,
                stats.total_accepted()
            ));
            bar.inc(1);
        }
    })?;
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    simulator.finish();
    Ok(())
}

fn cycle_progress(cycles: usize, quiet: bool) -> Option<ProgressBar> {
    if quiet || !std::io::stderr().is_terminal() {
        return None;
    }
    let bar = ProgressBar::new(cycles as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.cyan/blue} cycle {pos}/{len}  {msg}")
            .expect("invalid template"),
    );
    Some(bar)
}
