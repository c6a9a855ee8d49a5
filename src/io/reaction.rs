//! Reaction-template files.
//!
//! A template is a TOML document naming the reacting molecules, the products
//! they turn into, the geometric criteria gating the reaction and the
//! rate/energy constants. Molecule and atom ids in the file are 1-based, as
//! in the engine's topology files; they are converted to 0-based indices at
//! load time. Validation beyond raw structure is the template's own job.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::Error;
use crate::model::atom::Atom;
use crate::model::molecule::Molecule;
use crate::step::template::{
    Criterion, CriterionKind, ReactionTemplate, Transition, Translation,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReaction {
    name: String,
    #[serde(default)]
    energy: f64,
    #[serde(default)]
    activation: f64,
    reactants: Vec<RawReactant>,
    products: Vec<RawProduct>,
    #[serde(default)]
    criteria: Vec<RawCriterion>,
    #[serde(default)]
    translations: Vec<RawTranslation>,
    #[serde(default)]
    rate: Vec<RawRatePoint>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawReactant {
    name: String,
    atoms: Vec<RawAtom>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAtom {
    id: usize,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProduct {
    name: String,
    atoms: Vec<RawProductAtom>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProductAtom {
    id: usize,
    name: String,
    /// `[reactant, atom]` this product atom inherits id and coordinates from.
    from: [usize; 2],
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCriterion {
    kind: String,
    atoms: Vec<[usize; 2]>,
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTranslation {
    atom: [usize; 2],
    toward: [usize; 2],
    shift: f64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRatePoint {
    distance: f64,
    value: f64,
}

/// Loads one reaction template from a file.
pub fn load(path: impl AsRef<Path>) -> Result<ReactionTemplate, Error> {
    let path = path.as_ref();
    let mut text = String::new();
    File::open(path)
        .map_err(|e| Error::open(path.display().to_string(), e))?
        .read_to_string(&mut text)?;
    parse(&text)
}

/// Parses one reaction template from TOML text.
pub fn parse(text: &str) -> Result<ReactionTemplate, Error> {
    let raw: RawReaction = toml::from_str(text)?;

    let reactants = raw
        .reactants
        .into_iter()
        .map(|r| {
            let mut molecule = Molecule::new(0, r.name);
            for atom in r.atoms {
                molecule.add_atom(Atom::new(atom.id, atom.name));
            }
            molecule
        })
        .collect();

    let mut transitions = Vec::new();
    let products = raw
        .products
        .into_iter()
        .enumerate()
        .map(|(product_index, p)| {
            let mut molecule = Molecule::new(0, p.name);
            for atom in p.atoms {
                transitions.push(Transition {
                    from: to_index(atom.from),
                    to: (product_index, atom.id.saturating_sub(1)),
                });
                molecule.add_atom(Atom::new(atom.id, atom.name));
            }
            molecule
        })
        .collect();

    let criteria = raw
        .criteria
        .into_iter()
        .map(|c| {
            let kind = match c.kind.to_lowercase().as_str() {
                "dist" | "distance" => CriterionKind::Distance,
                "ang" | "angle" => CriterionKind::Angle,
                "dih" | "dihedral" => CriterionKind::Dihedral,
                other => {
                    return Err(Error::parse(
                        super::Format::Reaction,
                        0,
                        format!("unknown criterion kind '{other}'"),
                    ))
                }
            };
            Ok(Criterion {
                kind,
                atoms: c.atoms.into_iter().map(to_index).collect(),
                min: c.min,
                max: c.max,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let translations = raw
        .translations
        .into_iter()
        .map(|t| Translation {
            atom: to_index(t.atom),
            toward: to_index(t.toward),
            shift: t.shift,
        })
        .collect();

    let mut rate: Vec<(f64, f64)> = raw.rate.into_iter().map(|r| (r.distance, r.value)).collect();
    rate.sort_by(|lhs, rhs| lhs.0.total_cmp(&rhs.0));

    Ok(ReactionTemplate {
        name: raw.name,
        reactants,
        products,
        transitions,
        translations,
        criteria,
        reaction_energy: raw.energy,
        activation_energy: raw.activation,
        rate,
    })
}

fn to_index([molecule, atom]: [usize; 2]) -> (usize, usize) {
    (molecule.saturating_sub(1), atom.saturating_sub(1))
}

/// An annotated example template, for `rxstep example-reaction`.
pub fn example() -> &'static str {
    r#"# Example reaction template. Ids are 1-based and must match the atom
# order of the corresponding topology files. Units are the MD engine's own.

name = "dimerisation"

# Only used by the Metropolis acceptance test.
energy = -66.0
activation = 10.0

[[reactants]]
name = "MOL"
atoms = [
    { id = 1, name = "CM" },
    { id = 2, name = "HM" },
]

[[reactants]]
name = "MOL"
atoms = [
    { id = 1, name = "CM" },
    { id = 2, name = "HM" },
]

# Every product atom names the reactant atom it originates from.
[[products]]
name = "DIM"
atoms = [
    { id = 1, name = "CE", from = [1, 1] },
    { id = 2, name = "HE", from = [1, 2] },
    { id = 3, name = "CE", from = [2, 1] },
    { id = 4, name = "HE", from = [2, 2] },
]

# The first criterion should be the distance the rate table refers to.
[[criteria]]
kind = "distance"
atoms = [[1, 1], [2, 1]]
min = 0.0
max = 0.4

[[criteria]]
kind = "angle"
atoms = [[1, 2], [1, 1], [2, 1]]
min = 110.0
max = 150.0

# Optional: move product atoms along a connection axis after the reaction.
# Positive shifts move towards the reference atom.
[[translations]]
atom = [1, 1]
toward = [1, 3]
shift = 0.05

# Only used by the rate acceptance test: rate as a step function of the
# first criterion's distance.
[[rate]]
distance = 0.35
value = 0.2

[[rate]]
distance = 0.40
value = 0.06
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn example_parses_into_a_valid_template() {
        let template = parse(example()).unwrap();
        template.validate().unwrap();

        assert_eq!(template.name, "dimerisation");
        assert_eq!(template.reactants.len(), 2);
        assert_eq!(template.products.len(), 1);
        assert_eq!(template.products[0].atoms.len(), 4);
        assert_eq!(template.transitions.len(), 4);
        assert_eq!(template.reaction_energy, -66.0);
    }

    #[test]
    fn indices_convert_to_zero_based() {
        let template = parse(example()).unwrap();
        assert_eq!(template.criteria[0].atoms, vec![(0, 0), (1, 0)]);
        assert_eq!(template.transitions[2].from, (1, 0));
        assert_eq!(template.transitions[2].to, (0, 2));
        assert_eq!(template.translations[0].atom, (0, 0));
    }

    #[test]
    fn criteria_report_their_stage() {
        let template = parse(example()).unwrap();
        assert_eq!(template.criteria[0].stage(), 1);
        assert_eq!(template.criteria[1].stage(), 1);
    }

    #[test]
    fn rate_table_is_sorted_by_distance() {
        let shuffled = r#"
name = "r"
[[reactants]]
name = "A"
atoms = [{ id = 1, name = "C" }]
[[products]]
name = "B"
atoms = [{ id = 1, name = "C", from = [1, 1] }]
[[rate]]
distance = 0.5
value = 0.1
[[rate]]
distance = 0.3
value = 0.4
"#;
        let template = parse(shuffled).unwrap();
        assert_eq!(template.rate, vec![(0.3, 0.4), (0.5, 0.1)]);
    }

    #[test]
    fn unknown_criterion_kind_is_an_error() {
        let bad = r#"
name = "r"
[[reactants]]
name = "A"
atoms = [{ id = 1, name = "C" }]
[[products]]
name = "B"
atoms = [{ id = 1, name = "C", from = [1, 1] }]
[[criteria]]
kind = "torsionish"
atoms = [[1, 1]]
min = 0.0
max = 1.0
"#;
        assert!(matches!(parse(bad), Err(Error::Parse { .. })));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        assert!(matches!(
            parse("name = [[[ not toml"),
            Err(Error::Reaction(_))
        ));
    }
}
