use ndarray::Array2;

/// Single coordinate axis used for grid rows, columns, and positions.
pub type Coord = u16;

/// Count type used for mine counts and total-cell counts.
pub type CellCount = u32;

/// Two-dimensional coordinates `(row, col)`.
pub type Coord2 = (Coord, Coord);

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn mult(a: Coord, b: Coord) -> CellCount {
    let a = a as CellCount;
    let b = b as CellCount;
    a.saturating_mul(b)
}

/// Grid size of an `ndarray` grid, clamped to the coordinate range.
pub fn grid_size<T>(grid: &Array2<T>) -> Coord2 {
    let (rows, cols) = grid.dim();
    (
        rows.try_into().unwrap_or(Coord::MAX),
        cols.try_into().unwrap_or(Coord::MAX),
    )
}

pub trait NeighborIterExt {
    fn iter_neighbors(&self, index: Coord2) -> NeighborIter;
}

impl<T> NeighborIterExt for Array2<T> {
    fn iter_neighbors(&self, index: Coord2) -> NeighborIter {
        NeighborIter::new(index, grid_size(self))
    }
}

pub trait NeighborCellIterExt<T>: NeighborIterExt {
    fn iter_neighbor_cells_with_index(&self, index: Coord2) -> impl Iterator<Item = (Coord2, T)>;

    fn iter_neighbor_cells(&self, index: Coord2) -> impl Iterator<Item = T> {
        self.iter_neighbor_cells_with_index(index)
            .map(|(_, cell)| cell)
    }
}

impl<T: Copy> NeighborCellIterExt<T> for Array2<T> {
    fn iter_neighbor_cells_with_index(&self, index: Coord2) -> impl Iterator<Item = (Coord2, T)> {
        self.iter_neighbors(index)
            .map(|index| (index, self[index.to_nd_index()]))
    }
}

/// Counts, for every cell, how many of its 8 neighbors are set in `mask`.
pub fn convolve(mask: &Array2<bool>) -> Array2<u8> {
    let mut counts = Array2::zeros(mask.dim());
    for ((row, col), &set) in mask.indexed_iter() {
        if !set {
            continue;
        }
        let Ok(coords) = to_coords(row, col) else {
            continue;
        };
        for pos in mask.iter_neighbors(coords) {
            counts[pos.to_nd_index()] += 1;
        }
    }
    counts
}

/// Number of in-bounds neighbors of every cell of a `size` grid.
pub fn neighbor_counts(size: Coord2) -> Array2<u8> {
    let mask = Array2::from_elem(size.to_nd_index(), true);
    convolve(&mask)
}

/// Iterates all coordinates of a `size` grid in row-major order.
pub fn iter_coords(size: Coord2) -> impl Iterator<Item = Coord2> {
    let (rows, cols) = size;
    (0..rows).flat_map(move |row| (0..cols).map(move |col| (row, col)))
}

fn to_coords(row: usize, col: usize) -> core::result::Result<Coord2, core::num::TryFromIntError> {
    Ok((row.try_into()?, col.try_into()?))
}

const DISPLACEMENTS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Applies `delta` to `coords`, returning a value only when it remains in bounds.
fn apply_delta(coords: Coord2, delta: (isize, isize), bounds: Coord2) -> Option<Coord2> {
    let (row, col) = coords;
    let (d_row, d_col) = delta;
    let (max_row, max_col) = bounds;

    let next_row = row.checked_add_signed(d_row.try_into().ok()?)?;
    if next_row >= max_row {
        return None;
    }

    let next_col = col.checked_add_signed(d_col.try_into().ok()?)?;
    if next_col >= max_col {
        return None;
    }

    Some((next_row, next_col))
}

#[derive(Debug)]
pub struct NeighborIter {
    center: Coord2,
    bounds: Coord2,
    index: u8,
}

impl NeighborIter {
    pub fn new(center: Coord2, bounds: Coord2) -> Self {
        Self {
            center,
            bounds,
            index: 0,
        }
    }
}

impl Iterator for NeighborIter {
    type Item = Coord2;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if usize::from(self.index) >= DISPLACEMENTS.len() {
                return None;
            }

            let next_item =
                apply_delta(self.center, DISPLACEMENTS[self.index as usize], self.bounds);
            self.index += 1;

            if next_item.is_some() {
                return next_item;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[test]
    fn neighbors_respect_bounds() {
        let corner: Vec<_> = NeighborIter::new((0, 0), (3, 3)).collect();
        assert_eq!(corner, [(0, 1), (1, 0), (1, 1)]);

        let edge = NeighborIter::new((0, 1), (3, 3)).count();
        assert_eq!(edge, 5);

        let interior = NeighborIter::new((1, 1), (3, 3)).count();
        assert_eq!(interior, 8);
    }

    #[test]
    fn single_cell_grid_has_no_neighbors() {
        assert_eq!(NeighborIter::new((0, 0), (1, 1)).count(), 0);
        assert_eq!(neighbor_counts((1, 1))[(0, 0)], 0);
    }

    #[test]
    fn neighbor_counts_on_thin_grid() {
        let counts = neighbor_counts((1, 4));
        assert_eq!(counts.as_slice().unwrap(), &[1, 2, 2, 1]);
    }

    #[test]
    fn convolve_counts_set_neighbors() {
        let mut mask = Array2::from_elem([3, 3], false);
        mask[(0, 0)] = true;
        mask[(2, 2)] = true;

        let counts = convolve(&mask);

        assert_eq!(counts[(1, 1)], 2);
        assert_eq!(counts[(0, 1)], 1);
        assert_eq!(counts[(0, 0)], 0);
        assert_eq!(counts[(2, 0)], 0);
    }

    #[test]
    fn iter_coords_is_row_major() {
        let coords: Vec<_> = iter_coords((2, 2)).collect();
        assert_eq!(coords, [(0, 0), (0, 1), (1, 0), (1, 1)]);
    }
}
