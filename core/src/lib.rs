#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use core::ops::Index;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

pub use agent::*;
pub use cell::*;
pub use engine::*;
pub use error::*;
pub use generator::*;
pub use session::*;
pub use types::*;

mod agent;
mod cell;
mod engine;
mod error;
mod generator;
mod session;
mod types;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub size: Coord2,
    pub mine_fraction: f32,
}

impl FieldConfig {
    pub const fn new_unchecked(size: Coord2, mine_fraction: f32) -> Self {
        Self {
            size,
            mine_fraction,
        }
    }

    pub fn new(size: Coord2, mine_fraction: f32) -> Result<Self> {
        if size.0 == 0 || size.1 == 0 {
            return Err(FieldError::InvalidSize);
        }
        if !(0.0..1.0).contains(&mine_fraction) {
            return Err(FieldError::InvalidMineFraction(mine_fraction));
        }
        Ok(Self::new_unchecked(size, mine_fraction))
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.size.0, self.size.1)
    }

    /// Number of mines a generated layout holds, `total * fraction` rounded to nearest.
    pub fn mine_count(&self) -> CellCount {
        let total = self.total_cells();
        let exact = f64::from(total) * f64::from(self.mine_fraction);
        // non-negative, so truncating `x + 0.5` rounds half up
        let rounded = (exact + 0.5) as CellCount;
        rounded.min(total)
    }
}

/// Ground truth of one episode: where the mines are and what every cell would reveal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MineLayout {
    mine_mask: Array2<bool>,
    counts: Array2<u8>,
    mine_count: CellCount,
}

impl MineLayout {
    pub fn from_mine_mask(mine_mask: Array2<bool>) -> Self {
        let mine_count = mine_mask
            .iter()
            .filter(|&&is_mine| is_mine)
            .count()
            .try_into()
            .unwrap_or(CellCount::MAX);
        let mut counts = convolve(&mine_mask);
        for (count, &is_mine) in counts.iter_mut().zip(mine_mask.iter()) {
            if is_mine {
                *count = BOMB;
            }
        }
        Self {
            mine_mask,
            counts,
            mine_count,
        }
    }

    pub fn from_mine_coords(size: Coord2, mine_coords: &[Coord2]) -> Result<Self> {
        if size.0 == 0 || size.1 == 0 {
            return Err(FieldError::InvalidSize);
        }
        let mut mine_mask: Array2<bool> = Array2::default(size.to_nd_index());

        for &coords in mine_coords {
            if coords.0 >= size.0 || coords.1 >= size.1 {
                return Err(FieldError::InvalidCoords);
            }
            mine_mask[coords.to_nd_index()] = true;
        }

        Ok(Self::from_mine_mask(mine_mask))
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let size = self.size();
        if coords.0 < size.0 && coords.1 < size.1 {
            Ok(coords)
        } else {
            Err(FieldError::InvalidCoords)
        }
    }

    pub fn size(&self) -> Coord2 {
        grid_size(&self.mine_mask)
    }

    pub fn safe_cell_count(&self) -> CellCount {
        self.total_cells() - self.mine_count
    }

    pub fn total_cells(&self) -> CellCount {
        self.mine_mask.len().try_into().unwrap_or(CellCount::MAX)
    }

    pub fn mine_count(&self) -> CellCount {
        self.mine_count
    }

    pub fn contains_mine(&self, coords: Coord2) -> bool {
        self[coords]
    }

    /// Neighbor-mine count at `coords`, or [`BOMB`] when the cell is a mine itself.
    pub fn count_at(&self, coords: Coord2) -> u8 {
        self.counts[coords.to_nd_index()]
    }

    pub fn counts(&self) -> &Array2<u8> {
        &self.counts
    }

    pub fn zero_cells(&self) -> Vec<Coord2> {
        iter_coords(self.size())
            .filter(|&coords| self.count_at(coords) == 0)
            .collect()
    }

    pub fn has_zero_cell(&self) -> bool {
        self.counts.iter().any(|&count| count == 0)
    }

    pub(crate) fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        self.mine_mask.iter_neighbors(coords)
    }
}

impl Index<Coord2> for MineLayout {
    type Output = bool;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.mine_mask[coords.to_nd_index()]
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Open,
    Mark,
}

/// One action aimed at one cell, used both for requests and for reporting what was applied.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub action: Action,
    pub coords: Coord2,
}

impl Move {
    pub const fn new(action: Action, coords: Coord2) -> Self {
        Self { action, coords }
    }

    pub const fn open(coords: Coord2) -> Self {
        Self::new(Action::Open, coords)
    }

    pub const fn mark(coords: Coord2) -> Self {
        Self::new(Action::Mark, coords)
    }
}
