use super::error::Error;
use crate::model::topology::Topology;

/// Uniform 3-D cell index over a topology snapshot.
///
/// Molecules are binned by the position of their first atom, reduced to the
/// primary box image. Each cell knows its 27-cell wrap-around neighbourhood
/// (including itself); for grids thinner than three cells the neighbour list
/// contains repeats, which the candidate search tolerates because emission is
/// deduplicated by id ordering.
#[derive(Debug)]
pub struct CellGrid {
    shape: [usize; 3],
    cells: Vec<Vec<usize>>,
    neighbours: Vec<Vec<usize>>,
    home_cell: Vec<usize>,
}

impl CellGrid {
    /// Bins every molecule of `topology` into the grid shape the topology
    /// carries.
    pub fn build(topology: &Topology) -> Result<Self, Error> {
        let shape = topology.cell_numbers();
        if shape.iter().any(|&n| n == 0) {
            return Err(Error::InvalidGrid { shape });
        }
        let dimensions = topology.dimensions();
        if dimensions.iter().any(|&d| d <= 0.0) {
            return Err(Error::InvalidBox { dimensions });
        }

        let cell_count = shape[0] * shape[1] * shape[2];
        let mut cells = vec![Vec::new(); cell_count];
        let mut home_cell = Vec::with_capacity(topology.molecule_count());

        for (index, molecule) in topology.molecules.iter().enumerate() {
            let first = molecule
                .atoms
                .first()
                .ok_or(Error::EmptyMolecule { id: molecule.id })?;
            let cell = Self::cell_of(first.position, dimensions, shape);
            cells[cell].push(index);
            home_cell.push(cell);
        }

        let neighbours = (0..cell_count)
            .map(|cell| Self::stencil(cell, shape))
            .collect();

        Ok(Self {
            shape,
            cells,
            neighbours,
            home_cell,
        })
    }

    fn cell_of(position: [f64; 3], dimensions: [f64; 3], shape: [usize; 3]) -> usize {
        let mut n = [0usize; 3];
        for i in 0..3 {
            let reduced = position[i] / dimensions[i];
            // frac in [0, 1) also for negative coordinates
            let frac = reduced - reduced.floor();
            n[i] = ((frac * shape[i] as f64) as usize).min(shape[i] - 1);
        }
        n[0] + n[1] * shape[0] + n[2] * shape[0] * shape[1]
    }

    /// The 3x3x3 wrap-around stencil around a cell, self included.
    fn stencil(cell: usize, shape: [usize; 3]) -> Vec<usize> {
        let [nx, ny, nz] = shape;
        let i = cell % nx;
        let j = (cell / nx) % ny;
        let k = cell / (nx * ny);

        let mut out = Vec::with_capacity(27);
        for dk in [0usize, 1, nz - 1] {
            for dj in [0usize, 1, ny - 1] {
                for di in [0usize, 1, nx - 1] {
                    let x = (i + di) % nx;
                    let y = (j + dj) % ny;
                    let z = (k + dk) % nz;
                    out.push(x + y * nx + z * nx * ny);
                }
            }
        }
        out
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Cell a molecule (by topology index) was binned into.
    #[inline]
    pub fn home_cell(&self, molecule_index: usize) -> usize {
        self.home_cell[molecule_index]
    }

    /// Molecule indices in `cell` whose molecule carries `name`.
    pub fn members<'t>(
        &'t self,
        topology: &'t Topology,
        cell: usize,
        name: &'t str,
    ) -> impl Iterator<Item = usize> + 't {
        self.cells[cell]
            .iter()
            .copied()
            .filter(move |&ix| topology.molecules[ix].name == name)
    }

    /// `(molecule index, source cell)` pairs across the whole neighbourhood
    /// of `cell`, filtered by molecule name.
    pub fn neighbour_members<'t>(
        &'t self,
        topology: &'t Topology,
        cell: usize,
        name: &'t str,
    ) -> impl Iterator<Item = (usize, usize)> + 't {
        self.neighbours[cell].iter().flat_map(move |&source| {
            self.members(topology, source, name)
                .map(move |ix| (ix, source))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{atom::Atom, molecule::Molecule};

    fn place(top: &mut Topology, id: usize, name: &str, position: [f64; 3]) {
        let mut m = Molecule::new(id, name);
        m.add_atom(Atom::at(1, "C", position));
        top.add_molecule(m);
    }

    fn grid_topology(cells: [usize; 3]) -> Topology {
        let mut top = Topology::new();
        top.set_dimensions([10.0, 10.0, 10.0]);
        top.set_cell_numbers(cells);
        top
    }

    #[test]
    fn bins_by_first_atom_position() {
        let mut top = grid_topology([4, 4, 4]);
        place(&mut top, 1, "A", [0.5, 0.5, 0.5]);
        place(&mut top, 2, "A", [9.5, 0.5, 0.5]);
        let grid = CellGrid::build(&top).unwrap();

        assert_eq!(grid.home_cell(0), 0);
        assert_eq!(grid.home_cell(1), 3);
    }

    #[test]
    fn negative_and_out_of_box_positions_wrap_into_the_grid() {
        let mut top = grid_topology([4, 4, 4]);
        place(&mut top, 1, "A", [-0.5, 0.0, 0.0]);
        place(&mut top, 2, "A", [10.5, 0.0, 0.0]);
        let grid = CellGrid::build(&top).unwrap();

        assert_eq!(grid.home_cell(0), 3);
        assert_eq!(grid.home_cell(1), 0);
    }

    #[test]
    fn stencil_covers_27_cells_and_wraps() {
        let mut top = grid_topology([4, 4, 4]);
        place(&mut top, 1, "A", [0.5, 0.5, 0.5]);
        let grid = CellGrid::build(&top).unwrap();

        let stencil = &grid.neighbours[0];
        assert_eq!(stencil.len(), 27);
        // Wrap-around: cell 0's x-neighbours are 1 and 3.
        assert!(stencil.contains(&1));
        assert!(stencil.contains(&3));

        let unique: std::collections::HashSet<_> = stencil.iter().collect();
        assert_eq!(unique.len(), 27);
    }

    #[test]
    fn thin_grid_keeps_duplicate_neighbours() {
        let mut top = grid_topology([2, 1, 1]);
        place(&mut top, 1, "A", [0.5, 0.5, 0.5]);
        let grid = CellGrid::build(&top).unwrap();

        let stencil = &grid.neighbours[0];
        assert_eq!(stencil.len(), 27);
        let unique: std::collections::HashSet<_> = stencil.iter().collect();
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn neighbourhood_closes_over_the_periodic_boundary() {
        let mut top = grid_topology([4, 4, 4]);
        place(&mut top, 1, "A", [0.05, 0.5, 0.5]);
        place(&mut top, 2, "A", [9.95, 0.5, 0.5]);
        let grid = CellGrid::build(&top).unwrap();

        // The molecules sit in different cells, yet each one's neighbourhood
        // contains the other.
        assert_ne!(grid.home_cell(0), grid.home_cell(1));
        let seen: Vec<usize> = grid
            .neighbour_members(&top, grid.home_cell(0), "A")
            .map(|(ix, _)| ix)
            .collect();
        assert!(seen.contains(&0));
        assert!(seen.contains(&1));
    }

    #[test]
    fn members_filter_by_name() {
        let mut top = grid_topology([1, 1, 1]);
        place(&mut top, 1, "A", [0.5, 0.5, 0.5]);
        place(&mut top, 2, "B", [0.6, 0.5, 0.5]);
        let grid = CellGrid::build(&top).unwrap();

        let a: Vec<usize> = grid.members(&top, 0, "A").collect();
        assert_eq!(a, [0]);
    }

    #[test]
    fn rejects_degenerate_input() {
        let mut top = grid_topology([0, 4, 4]);
        place(&mut top, 1, "A", [0.5, 0.5, 0.5]);
        assert!(matches!(
            CellGrid::build(&top),
            Err(Error::InvalidGrid { .. })
        ));

        let mut flat = grid_topology([4, 4, 4]);
        flat.set_dimensions([10.0, 0.0, 10.0]);
        place(&mut flat, 1, "A", [0.5, 0.5, 0.5]);
        assert!(matches!(
            CellGrid::build(&flat),
            Err(Error::InvalidBox { .. })
        ));

        let mut empty = grid_topology([2, 2, 2]);
        empty.add_molecule(Molecule::new(7, "A"));
        assert!(matches!(
            CellGrid::build(&empty),
            Err(Error::EmptyMolecule { id: 7 })
        ));
    }
}
