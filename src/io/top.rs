//! GROMACS topology (.top) files, to the extent the driver needs them: the
//! `[ system ]` name and the `[ molecules ]` counts. All other content is
//! carried through verbatim so the engine keeps seeing its own directives.

use std::io::{BufRead, Write};

use super::{error::Error, Format};
use crate::model::topology::Topology;

/// What a .top file told us: the system name, the declared molecule counts
/// in order, and the raw lines for later rewriting.
#[derive(Debug, Clone, Default)]
pub struct TopFile {
    pub system_name: String,
    pub molecule_counts: Vec<(String, usize)>,
    pub lines: Vec<String>,
}

/// Reads the `[ system ]` and `[ molecules ]` directives, keeping all lines.
pub fn read<R: BufRead>(reader: R) -> Result<TopFile, Error> {
    #[derive(PartialEq)]
    enum Section {
        Other,
        System,
        Molecules,
    }

    let mut parsed = TopFile::default();
    let mut section = Section::Other;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.starts_with('[') {
            section = if trimmed.contains("system") {
                Section::System
            } else if trimmed.contains("molecules") {
                Section::Molecules
            } else {
                Section::Other
            };
        } else if !trimmed.is_empty() && !trimmed.starts_with(';') {
            match section {
                Section::System => {
                    parsed.system_name = trimmed.to_string();
                    section = Section::Other;
                }
                Section::Molecules => {
                    let mut parts = trimmed.split_whitespace();
                    let name = parts
                        .next()
                        .ok_or_else(|| {
                            Error::parse(Format::Top, index + 1, "missing molecule name")
                        })?
                        .to_string();
                    let count: usize = parts.next().and_then(|c| c.parse().ok()).ok_or_else(
                        || Error::parse(Format::Top, index + 1, "invalid molecule count"),
                    )?;
                    parsed.molecule_counts.push((name, count));
                }
                Section::Other => {}
            }
        }

        parsed.lines.push(line);
    }

    Ok(parsed)
}

/// Writes the captured file back, with the `[ system ]` name and the
/// `[ molecules ]` counts replaced by the topology's current state.
pub fn write<W: Write>(
    writer: &mut W,
    template: &TopFile,
    topology: &Topology,
) -> Result<(), Error> {
    let mut skip_data = false;
    for line in &template.lines {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            skip_data = false;
            if trimmed.contains("system") {
                writeln!(writer, "{line}")?;
                writeln!(writer, "{}", template.system_name)?;
                skip_data = true;
                continue;
            }
            if trimmed.contains("molecules") {
                writeln!(writer, "{line}")?;
                for name in topology.molecule_types() {
                    let count = topology.molecules_named(&name).count();
                    writeln!(writer, "{name:<5} {count}")?;
                }
                skip_data = true;
                continue;
            }
        } else if skip_data && !trimmed.is_empty() && !trimmed.starts_with(';') {
            continue;
        }
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
