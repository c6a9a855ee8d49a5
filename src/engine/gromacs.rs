//! GROMACS driver.
//!
//! Every run is a `gmx grompp` preprocessing step followed by `gmx mdrun`,
//! over the per-cycle file scheme the topology store uses:
//!
//! - initial MD:   `grompp -f md.mdp -c 0-md.gro -p 0.top -o 0-md.tpr`,
//!   `mdrun -deffnm 0-md`
//! - relaxation:   `grompp -f relax.mdp -c X-rs.gro -p X.top -o X-rs.tpr`,
//!   `mdrun -deffnm X-rs` (mdrun rewrites `X-rs.gro` with the result)
//! - MD:           `grompp -f md.mdp -t X-rs.cpt -c X-rs.gro -p X.top -o
//!   X-md.tpr`, `mdrun -deffnm X-md`
//! - appending MD: `mdrun -s Y-md.tpr -cpi Y-md.cpt -deffnm Y-md -append`

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, warn};

use super::{Error, MdEngine};

#[derive(Debug, Clone)]
pub struct GromacsConfig {
    /// The `gmx` executable.
    pub command: String,
    /// Parameter file for production MD segments.
    pub mdp: PathBuf,
    /// Parameter file for post-reaction relaxation runs.
    pub mdp_relaxation: PathBuf,
    /// Working directory holding the per-cycle files.
    pub directory: PathBuf,
    /// Threads handed to `mdrun -nt`; 0 leaves the choice to the engine.
    pub threads: usize,
}

impl Default for GromacsConfig {
    fn default() -> Self {
        Self {
            command: "gmx".to_string(),
            mdp: PathBuf::from("md.mdp"),
            mdp_relaxation: PathBuf::from("relax.mdp"),
            directory: PathBuf::from("."),
            threads: 0,
        }
    }
}

pub struct GromacsEngine {
    config: GromacsConfig,
}

impl GromacsEngine {
    pub fn new(config: GromacsConfig) -> Self {
        Self { config }
    }

    fn grompp_args(&self, mdp: &Path, top: &str, gro: &str, tpr: &str) -> Vec<String> {
        vec![
            "grompp".to_string(),
            "-f".to_string(),
            mdp.display().to_string(),
            "-p".to_string(),
            format!("{top}.top"),
            "-c".to_string(),
            format!("{gro}.gro"),
            "-o".to_string(),
            format!("{tpr}.tpr"),
            "-po".to_string(),
            format!("{tpr}-mdpout.mdp"),
            "-maxwarn".to_string(),
            "1".to_string(),
        ]
    }

    fn grompp_args_continuing(
        &self,
        mdp: &Path,
        top: &str,
        gro: &str,
        cpt: &str,
        tpr: &str,
    ) -> Vec<String> {
        let mut args = self.grompp_args(mdp, top, gro, tpr);
        args.push("-t".to_string());
        args.push(format!("{cpt}.cpt"));
        args
    }

    fn mdrun_args(&self, deffnm: &str) -> Vec<String> {
        let mut args = vec![
            "mdrun".to_string(),
            "-s".to_string(),
            format!("{deffnm}.tpr"),
            "-deffnm".to_string(),
            deffnm.to_string(),
        ];
        if self.config.threads > 0 {
            args.push("-nt".to_string());
            args.push(self.config.threads.to_string());
        }
        args
    }

    fn mdrun_args_appending(&self, deffnm: &str) -> Vec<String> {
        let mut args = self.mdrun_args(deffnm);
        args.push("-cpi".to_string());
        args.push(format!("{deffnm}.cpt"));
        args.push("-append".to_string());
        args
    }

    /// Runs `gmx` with the given arguments, capturing output. Exit status
    /// zero is success; everything else is an error carrying the status.
    fn execute(&self, args: &[String]) -> Result<(), Error> {
        debug!("running: {} {}", self.config.command, args.join(" "));
        let output = Command::new(&self.config.command)
            .args(args)
            .current_dir(&self.config.directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| Error::Spawn {
                program: self.config.command.clone(),
                source: e,
            })?;

        if !output.status.success() {
            warn!(
                "process output was:\n{}",
                String::from_utf8_lossy(&output.stderr)
            );
            return Err(Error::Failed {
                program: self.config.command.clone(),
                status: output.status,
            });
        }
        Ok(())
    }
}

impl MdEngine for GromacsEngine {
    fn verify(&self) -> Result<(), Error> {
        self.execute(&["--version".to_string()])
    }

    fn run_md_initial(&self) -> Result<(), Error> {
        self.execute(&self.grompp_args(&self.config.mdp, "0", "0-md", "0-md"))?;
        self.execute(&self.mdrun_args("0-md"))
    }

    fn run_md(&self, cycle: usize) -> Result<(), Error> {
        self.execute(&self.grompp_args_continuing(
            &self.config.mdp,
            &cycle.to_string(),
            &format!("{cycle}-rs"),
            &format!("{cycle}-rs"),
            &format!("{cycle}-md"),
        ))?;
        self.execute(&self.mdrun_args(&format!("{cycle}-md")))
    }

    fn run_md_appending(&self, _cycle: usize, last_reactive: usize) -> Result<(), Error> {
        self.execute(&self.mdrun_args_appending(&format!("{last_reactive}-md")))
    }

    fn run_relaxation(&self, cycle: usize) -> Result<bool, Error> {
        let grompp = self.grompp_args(
            &self.config.mdp_relaxation,
            &cycle.to_string(),
            &format!("{cycle}-rs"),
            &format!("{cycle}-rs"),
        );
        // A failing relaxation is a result, not an error: the controller
        // treats it as fatal but with its own diagnostic.
        if let Err(e) = self.execute(&grompp) {
            match e {
                Error::Failed { .. } => {
                    warn!("relaxation preprocessing failed: {e}");
                    return Ok(false);
                }
                other => return Err(other),
            }
        }
        match self.execute(&self.mdrun_args(&format!("{cycle}-rs"))) {
            Ok(()) => Ok(true),
            Err(Error::Failed { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }
}
