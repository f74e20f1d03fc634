use alloc::collections::{BTreeSet, VecDeque};
use alloc::vec::Vec;
use ndarray::Array2;
use rand::prelude::*;

use crate::*;

/// How far the focus of [`TieBreak::Nearest`] moves toward each applied cell.
const FOCUS_DECAY: f32 = 0.05;

/// Which queued move is served next.
#[derive(Clone, Debug)]
pub enum TieBreak {
    /// Shuffle each batch, which avoids sweeping the grid in one direction.
    Shuffled(SmallRng),
    /// Keep the order deductions were found in, for reproducible fixtures.
    Fifo,
    /// Serve the queued move closest to `focus`, a `(row, col)` point trailing the applied moves.
    ///
    /// `rng` picks a fresh starting focus on every reset so runs head off in different directions.
    Nearest { rng: SmallRng, focus: (f32, f32) },
}

impl TieBreak {
    pub fn nearest(size: Coord2, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let focus = random_focus(size, &mut rng);
        Self::Nearest { rng, focus }
    }
}

fn random_focus(size: Coord2, rng: &mut SmallRng) -> (f32, f32) {
    (
        rng.random::<f32>() * f32::from(size.0),
        rng.random::<f32>() * f32::from(size.1),
    )
}

fn distance_sq(focus: (f32, f32), coords: Coord2) -> f32 {
    let d_row = f32::from(coords.0) - focus.0;
    let d_col = f32::from(coords.1) - focus.1;
    d_row * d_row + d_col * d_col
}

/// Solver that only ever sees the visible grid and only makes moves that follow from a single clue.
///
/// Instead of rescanning the grid every tick it keeps, per cell, how many neighbors are still hidden and how many are
/// known mines, and updates both from the moves the environment reports as applied.
#[derive(Clone, Debug)]
pub struct DeductionAgent {
    size: Coord2,
    pending: VecDeque<Move>,
    hidden_neighbors: Array2<u8>,
    marked_neighbors: Array2<u8>,
    tie_break: TieBreak,
}

impl DeductionAgent {
    pub fn new(size: Coord2, seed: u64) -> Self {
        Self::with_tie_break(size, TieBreak::Shuffled(SmallRng::seed_from_u64(seed)))
    }

    pub fn fifo(size: Coord2) -> Self {
        Self::with_tie_break(size, TieBreak::Fifo)
    }

    pub fn nearest(size: Coord2, seed: u64) -> Self {
        Self::with_tie_break(size, TieBreak::nearest(size, seed))
    }

    pub fn with_tie_break(size: Coord2, tie_break: TieBreak) -> Self {
        Self {
            size,
            pending: VecDeque::new(),
            hidden_neighbors: neighbor_counts(size),
            marked_neighbors: Array2::zeros(size.to_nd_index()),
            tie_break,
        }
    }

    pub fn size(&self) -> Coord2 {
        self.size
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.hidden_neighbors = neighbor_counts(self.size);
        self.marked_neighbors.fill(0);
        if let TieBreak::Nearest { rng, focus } = &mut self.tie_break {
            *focus = random_focus(self.size, rng);
        }
    }

    /// Folds in the moves applied since the last call and returns the next certain move, if there is one.
    ///
    /// Except under [`TieBreak::Nearest`], moves already queued are served before anything deduced from `applied`.
    /// `applied` is always absorbed so the neighbor counters never fall behind the grid.
    pub fn step(&mut self, grid: &Array2<Cell>, applied: &[Move]) -> Option<Move> {
        debug_assert_eq!(grid_size(grid), self.size);

        self.absorb(grid, applied);
        let mut batch = self.deduce(grid, applied);
        if let TieBreak::Shuffled(rng) = &mut self.tie_break {
            batch.shuffle(rng);
        }
        self.pending.extend(batch);

        self.pop_live(grid)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn hidden_neighbors(&self) -> &Array2<u8> {
        &self.hidden_neighbors
    }

    pub fn marked_neighbors(&self) -> &Array2<u8> {
        &self.marked_neighbors
    }

    pub fn tie_break(&self) -> &TieBreak {
        &self.tie_break
    }

    fn absorb(&mut self, grid: &Array2<Cell>, applied: &[Move]) {
        for mv in applied {
            if let TieBreak::Nearest { focus, .. } = &mut self.tie_break {
                focus.0 += (f32::from(mv.coords.0) - focus.0) * FOCUS_DECAY;
                focus.1 += (f32::from(mv.coords.1) - focus.1) * FOCUS_DECAY;
            }
            // a detonated mine is as good as a mark for the clues around it
            let known_mine = match mv.action {
                Action::Mark => true,
                Action::Open => grid[mv.coords.to_nd_index()] == Cell::Mine,
            };
            for pos in grid.iter_neighbors(mv.coords) {
                let index = pos.to_nd_index();
                self.hidden_neighbors[index] = self.hidden_neighbors[index].saturating_sub(1);
                if known_mine {
                    self.marked_neighbors[index] = self.marked_neighbors[index].saturating_add(1);
                }
            }
        }
    }

    fn deduce(&self, grid: &Array2<Cell>, applied: &[Move]) -> Vec<Move> {
        let clues: BTreeSet<Coord2> = applied
            .iter()
            .flat_map(|mv| core::iter::once(mv.coords).chain(grid.iter_neighbors(mv.coords)))
            .collect();

        let mut targets = BTreeSet::new();
        let mut batch = Vec::new();
        for clue in clues {
            let Some(action) = self.deduce_at(grid, clue) else {
                continue;
            };
            for (pos, cell) in grid.iter_neighbor_cells_with_index(clue) {
                if cell.is_hidden() && targets.insert(pos) {
                    batch.push(Move::new(action, pos));
                }
            }
        }
        batch
    }

    /// The action every hidden neighbor of `clue` must take, when its count settles them all.
    fn deduce_at(&self, grid: &Array2<Cell>, clue: Coord2) -> Option<Action> {
        let count = grid[clue.to_nd_index()].revealed_count()?;
        let index = clue.to_nd_index();
        let hidden = i16::from(self.hidden_neighbors[index]);
        if hidden == 0 {
            return None;
        }

        let unmarked = i16::from(count) - i16::from(self.marked_neighbors[index]);
        if unmarked == 0 {
            Some(Action::Open)
        } else if unmarked == hidden {
            Some(Action::Mark)
        } else {
            None
        }
    }

    fn pop_live(&mut self, grid: &Array2<Cell>) -> Option<Move> {
        if let TieBreak::Nearest { focus, .. } = &self.tie_break {
            let focus = *focus;
            self.pending.retain(|mv| grid[mv.coords.to_nd_index()].is_hidden());
            let (index, _) = self.pending.iter().enumerate().min_by(|(_, a), (_, b)| {
                distance_sq(focus, a.coords).total_cmp(&distance_sq(focus, b.coords))
            })?;
            return self.pending.remove(index);
        }

        while let Some(mv) = self.pending.pop_front() {
            if grid[mv.coords.to_nd_index()].is_hidden() {
                return Some(mv);
            }
        }
        None
    }
}

/// Uniformly random hidden cell, the fallback when no certain move exists.
pub fn random_hidden_cell(grid: &Array2<Cell>, rng: &mut SmallRng) -> Option<Coord2> {
    let hidden: Vec<Coord2> = iter_coords(grid_size(grid))
        .filter(|&coords| grid[coords.to_nd_index()].is_hidden())
        .collect();
    hidden.choose(rng).copied()
}
