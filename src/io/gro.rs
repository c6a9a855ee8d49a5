//! GROMACS coordinate (.gro) files.
//!
//! Fixed-column format: a title line, an atom count, one line per atom
//! (`resnr(5) resname(5) atomname(5) atomnr(5)` followed by position in
//! `%8.3f` and optional velocity in `%8.4f` columns), and a final box line.
//! Atoms with a shared residue number form one molecule.

use std::io::{BufRead, Write};

use super::{error::Error, Format};
use crate::model::atom::Atom;
use crate::model::topology::Topology;

/// Reads a configuration into `topology`, returning the title line.
pub fn read<R: BufRead>(reader: R, topology: &mut Topology) -> Result<String, Error> {
    let mut lines = reader.lines().enumerate();

    let title = next_line(&mut lines)?.trim().to_string();

    let count_line = next_line(&mut lines)?;
    let atom_count: usize = count_line
        .trim()
        .parse()
        .map_err(|_| Error::parse(Format::Gro, 2, "invalid atom count"))?;

    for _ in 0..atom_count {
        let (line_no, line) = lines
            .next()
            .ok_or_else(|| Error::parse(Format::Gro, atom_count + 2, "unexpected end of file"))
            .and_then(|(i, l)| l.map(|l| (i + 1, l)).map_err(Error::from))?;
        read_atom_line(&line, line_no, topology)?;
    }

    let box_line = next_line(&mut lines)?;
    let mut parts = box_line.split_whitespace();
    let mut dimensions = [0.0f64; 3];
    for d in &mut dimensions {
        *d = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| Error::parse(Format::Gro, atom_count + 3, "invalid box line"))?;
    }
    if dimensions.iter().any(|&d| d <= 0.0) {
        return Err(Error::parse(
            Format::Gro,
            atom_count + 3,
            "box dimensions must be positive",
        ));
    }
    topology.set_dimensions(dimensions);

    Ok(title)
}

fn next_line<I>(lines: &mut I) -> Result<String, Error>
where
    I: Iterator<Item = (usize, std::io::Result<String>)>,
{
    match lines.next() {
        Some((_, line)) => Ok(line?),
        None => Err(Error::parse(Format::Gro, 0, "unexpected end of file")),
    }
}

fn read_atom_line(line: &str, line_no: usize, topology: &mut Topology) -> Result<(), Error> {
    if line.len() < 44 {
        return Err(Error::parse(Format::Gro, line_no, "atom line too short"));
    }

    let field = |from: usize, to: usize| line.get(from..to).unwrap_or("").trim();
    let number = |from: usize, to: usize, what: &str| -> Result<f64, Error> {
        field(from, to)
            .parse()
            .map_err(|_| Error::parse(Format::Gro, line_no, format!("invalid {what}")))
    };

    let residue_id: usize = field(0, 5)
        .parse()
        .map_err(|_| Error::parse(Format::Gro, line_no, "invalid residue number"))?;
    let residue_name = field(5, 10).to_string();

    let mut atom = Atom::new(0, field(10, 15));
    atom.id = field(15, 20)
        .parse()
        .map_err(|_| Error::parse(Format::Gro, line_no, "invalid atom number"))?;
    atom.position = [
        number(20, 28, "x coordinate")?,
        number(28, 36, "y coordinate")?,
        number(36, 44, "z coordinate")?,
    ];
    // Velocity columns are optional; configurations written without them
    // read as zero velocities.
    if line.len() >= 68 {
        atom.velocity = [
            number(44, 52, "x velocity")?,
            number(52, 60, "y velocity")?,
            number(60, 68, "z velocity")?,
        ];
    }

    topology
        .molecule_or_insert(residue_id, &residue_name)
        .add_atom(atom);
    Ok(())
}

/// Writes `topology` as a .gro configuration. Assumes the topology was
/// sorted beforehand; the engine expects molecules grouped by type in the
/// same sequence as the matching topology file.
pub fn write<W: Write>(writer: &mut W, topology: &Topology, title: &str) -> Result<(), Error> {
    writeln!(writer, "{title}")?;
    writeln!(writer, "{:>6}", topology.atom_count())?;

    for molecule in &topology.molecules {
        for atom in &molecule.atoms {
            write!(
                writer,
                "{:>5}{:<5}{:>5}{:>5}",
                molecule.id, molecule.name, atom.name, atom.id
            )?;
            for p in atom.position {
                write!(writer, "{p:>8.3}")?;
            }
            for v in atom.velocity {
                write!(writer, "{v:>8.4}")?;
            }
            writeln!(writer)?;
        }
    }

    let d = topology.dimensions();
    writeln!(writer, "{:>10.5}{:>10.5}{:>10.5}", d[0], d[1], d[2])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample_gro() -> String {
        "\
water dimer
    6
    1SOL     OW    1   0.230   0.628   0.113  0.0000  0.0000  0.0000
    1SOL    HW1    2   0.137   0.626   0.150  0.0000  0.0000  0.0000
    1SOL    HW2    3   0.231   0.589   0.021  0.0000  0.0000  0.0000
    2SOL     OW    4   0.225   0.275   0.700  0.0000  0.0000  0.0000
    2SOL    HW1    5   0.260   0.258   0.612  0.0000  0.0000  0.0000
    2SOL    HW2    6   0.137   0.230   0.711  0.0000  0.0000  0.0000
   1.86206   1.86206   1.86206
"
        .to_string()
    }

    #[test]
    fn reads_molecules_grouped_by_residue() {
        let mut top = Topology::new();
        let title = read(Cursor::new(sample_gro()), &mut top).unwrap();

        assert_eq!(title, "water dimer");
        assert_eq!(top.molecule_count(), 2);
        assert_eq!(top.atom_count(), 6);
        assert_eq!(top.molecules[0].name, "SOL");
        assert_eq!(top.molecules[0].atoms[1].name, "HW1");
        assert!((top.molecules[0].atoms[0].position[0] - 0.230).abs() < 1e-9);
        assert!((top.dimensions()[2] - 1.86206).abs() < 1e-9);
    }

    #[test]
    fn reads_lines_without_velocities_as_zero() {
        let gro = "\
no velocities
    1
    1LIG     C1    1   0.100   0.200   0.300
   2.00000   2.00000   2.00000
";
        let mut top = Topology::new();
        read(Cursor::new(gro), &mut top).unwrap();
        assert_eq!(top.molecules[0].atoms[0].velocity, [0.0; 3]);
    }

    #[test]
    fn errors_on_nonpositive_box() {
        let gro = "\
bad box
    1
    1LIG     C1    1   0.100   0.200   0.300
   2.00000  -1.00000   2.00000
";
        let mut top = Topology::new();
        let err = read(Cursor::new(gro), &mut top).unwrap_err();
        assert!(matches!(err, Error::Parse { format, .. } if format == Format::Gro));
    }

    #[test]
    fn errors_on_truncated_file() {
        let gro = "\
truncated
    3
    1LIG     C1    1   0.100   0.200   0.300
";
        let mut top = Topology::new();
        assert!(read(Cursor::new(gro), &mut top).is_err());
    }

    #[test]
    fn written_output_reads_back_identically() {
        let mut top = Topology::new();
        read(Cursor::new(sample_gro()), &mut top).unwrap();

        let mut buffer = Vec::new();
        write(&mut buffer, &top, "water dimer").unwrap();

        let mut reread = Topology::new();
        read(Cursor::new(buffer), &mut reread).unwrap();
        assert_eq!(reread.molecule_count(), top.molecule_count());
        assert_eq!(reread.atom_count(), top.atom_count());
        for (a, b) in top.molecules.iter().zip(reread.molecules.iter()) {
            assert_eq!(a.name, b.name);
            for (x, y) in a.atoms.iter().zip(b.atoms.iter()) {
                assert_eq!(x.name, y.name);
                for i in 0..3 {
                    assert!((x.position[i] - y.position[i]).abs() < 1e-3);
                }
            }
        }
    }
}
