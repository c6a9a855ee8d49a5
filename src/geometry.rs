//! Minimum-image geometry under periodic boundary conditions.
//!
//! Positions are unconstrained reals; the minimum-image convention is applied
//! at read time and never persisted. All angles are reported in degrees.

use crate::model::molecule::Molecule;

/// Shortest displacement from `a` to `b` under the periodic box `dimensions`.
pub fn displacement(a: [f64; 3], b: [f64; 3], dimensions: [f64; 3]) -> [f64; 3] {
    let mut d = [0.0; 3];
    for i in 0..3 {
        let raw = b[i] - a[i];
        d[i] = raw - dimensions[i] * (raw / dimensions[i]).round();
    }
    d
}

/// Minimum-image distance between two points.
pub fn distance(a: [f64; 3], b: [f64; 3], dimensions: [f64; 3]) -> f64 {
    norm(displacement(a, b, dimensions))
}

/// Angle (degrees) at `p2` between `p1 -- p2 -- p3`, minimum-image corrected.
pub fn angle(p1: [f64; 3], p2: [f64; 3], p3: [f64; 3], dimensions: [f64; 3]) -> f64 {
    let v1 = displacement(p1, p2, dimensions);
    let v2 = displacement(p2, p3, dimensions);
    let cos = dot(v1, v2) / (norm(v1) * norm(v2));
    cos.acos().to_degrees()
}

/// Signed dihedral angle (degrees) of the chain `p1 -- p2 -- p3 -- p4`,
/// minimum-image corrected.
pub fn dihedral(
    p1: [f64; 3],
    p2: [f64; 3],
    p3: [f64; 3],
    p4: [f64; 3],
    dimensions: [f64; 3],
) -> f64 {
    let v1 = displacement(p1, p2, dimensions);
    let v2 = displacement(p2, p3, dimensions);
    let v3 = displacement(p3, p4, dimensions);

    let n1 = unit_normal(v1, v2);
    let n2 = unit_normal(v2, v3);

    let x = dot(cross(n1, n2), scale(v2, 1.0 / norm(v2)));
    let y = dot(n1, n2);
    x.atan2(y).to_degrees()
}

/// Pulls every atom of a molecule to within half a box length of its first
/// atom, per axis. Applied to freshly assembled products whose atoms inherit
/// coordinates from opposite sides of a periodic wrap.
pub fn make_molecule_whole(molecule: &mut Molecule, dimensions: [f64; 3]) {
    let Some(reference) = molecule.atoms.first().map(|a| a.position) else {
        return;
    };
    for atom in &mut molecule.atoms {
        for i in 0..3 {
            let delta = atom.position[i] - reference[i];
            atom.position[i] -= (delta / (0.5 * dimensions[i])).trunc() * dimensions[i];
        }
    }
}

/// Unit normal of the plane spanned by `v1` and `v2`, or the zero vector for
/// collinear input.
fn unit_normal(v1: [f64; 3], v2: [f64; 3]) -> [f64; 3] {
    let n = cross(v1, v2);
    let len = norm(n);
    if len == 0.0 {
        return [0.0; 3];
    }
    scale(n, 1.0 / len)
}

#[inline]
fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
fn norm(v: [f64; 3]) -> f64 {
    dot(v, v).sqrt()
}

#[inline]
fn scale(v: [f64; 3], s: f64) -> [f64; 3] {
    [v[0] * s, v[1] * s, v[2] * s]
}
