use alloc::vec;
use alloc::vec::Vec;
use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::*;

/// Score reported when an opened cell held a mine.
pub const DETONATION_SCORE: i8 = -1;

/// What a single external action changed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// Every cell the action changed, in the order it changed.
    pub applied: Vec<Move>,
    /// `0` normally, [`DETONATION_SCORE`] when a mine went off.
    pub score: i8,
}

impl StepOutcome {
    pub fn has_update(&self) -> bool {
        !self.applied.is_empty()
    }

    pub const fn is_detonation(&self) -> bool {
        self.score < 0
    }
}

/// Owns the ground truth of an episode and the grid the player is allowed to see.
#[derive(Clone, Debug)]
pub struct GridEnvironment<G = RandomLayoutGenerator> {
    config: FieldConfig,
    generator: G,
    rng: SmallRng,
    /// `None` until the first [`reset`](Self::reset) generates a layout.
    mine_layout: Option<MineLayout>,
    visible: Array2<Cell>,
    revealed_count: CellCount,
    marked_count: CellCount,
}

impl GridEnvironment {
    pub fn new(config: FieldConfig, seed: u64) -> Result<Self> {
        Self::with_generator(config, RandomLayoutGenerator::default(), seed)
    }
}

impl GridEnvironment<FixedLayout> {
    /// Environment that replays `mine_layout` on every reset, with all cells hidden until then.
    pub fn from_layout(mine_layout: MineLayout, seed: u64) -> Self {
        let config = FieldConfig::new_unchecked(mine_layout.size(), 0.0);
        let mut env = Self::blank(config, FixedLayout(mine_layout.clone()), seed);
        env.mine_layout = Some(mine_layout);
        env
    }
}

impl<G: LayoutGenerator> GridEnvironment<G> {
    pub fn with_generator(config: FieldConfig, generator: G, seed: u64) -> Result<Self> {
        let config = FieldConfig::new(config.size, config.mine_fraction)?;
        Ok(Self::blank(config, generator, seed))
    }

    fn blank(config: FieldConfig, generator: G, seed: u64) -> Self {
        let size = config.size.to_nd_index();
        Self {
            config,
            generator,
            rng: SmallRng::seed_from_u64(seed),
            mine_layout: None,
            visible: Array2::default(size),
            revealed_count: 0,
            marked_count: 0,
        }
    }

    /// Starts a new episode: fresh layout, all cells hidden, then a flood reveal from a random zero-count cell.
    pub fn reset(&mut self) -> Result<StepOutcome> {
        self.visible.fill(Cell::Hidden);
        self.revealed_count = 0;
        self.marked_count = 0;
        self.mine_layout = None;
        let mine_layout = self.generator.generate(&self.config, &mut self.rng)?;

        let zeros = mine_layout.zero_cells();
        let Some(&start) = zeros.choose(&mut self.rng) else {
            return Err(FieldError::NoSafeStart { attempts: 1 });
        };
        log::debug!(
            "Reset {:?} field with {} mines, starting at {:?}",
            self.size(),
            mine_layout.mine_count(),
            start
        );
        self.mine_layout = Some(mine_layout);
        self.step(Move::open(start))
    }

    /// Applies one action. Targets that are no longer hidden are ignored.
    ///
    /// Fails with [`FieldError::NotStarted`] until a layout exists.
    pub fn step(&mut self, mv: Move) -> Result<StepOutcome> {
        let coords = self
            .mine_layout
            .as_ref()
            .ok_or(FieldError::NotStarted)?
            .validate_coords(mv.coords)?;

        if !self.cell_at(coords).is_hidden() {
            log::debug!("Ignoring {mv:?}, cell is already {:?}", self.cell_at(coords));
            return Ok(StepOutcome::default());
        }

        Ok(match mv.action {
            Action::Mark => self.mark(coords),
            Action::Open => self.open(coords),
        })
    }

    fn mark(&mut self, coords: Coord2) -> StepOutcome {
        if !self.has_mine_at(coords) {
            log::warn!("Marked {coords:?}, which is not a mine");
        }
        self.visible[coords.to_nd_index()] = Cell::Marked;
        self.marked_count += 1;
        StepOutcome {
            applied: vec![Move::mark(coords)],
            score: 0,
        }
    }

    fn open(&mut self, coords: Coord2) -> StepOutcome {
        let mut outcome = StepOutcome::default();
        let Some(mine_layout) = &self.mine_layout else {
            return outcome;
        };
        let mut to_visit = vec![coords];

        while let Some(visit_coords) = to_visit.pop() {
            let index = visit_coords.to_nd_index();
            if !self.visible[index].is_hidden() {
                continue;
            }

            let cell = Cell::from_count(mine_layout.count_at(visit_coords));
            self.visible[index] = cell;
            outcome.applied.push(Move::open(visit_coords));

            match cell {
                Cell::Mine => {
                    log::debug!("Detonated mine at {visit_coords:?}");
                    outcome.score = DETONATION_SCORE;
                }
                Cell::Revealed(count) => {
                    self.revealed_count += 1;
                    if count == 0 {
                        to_visit.extend(mine_layout.iter_neighbors(visit_coords));
                    }
                }
                Cell::Hidden | Cell::Marked => {}
            }
        }

        outcome
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }

    pub fn size(&self) -> Coord2 {
        self.config.size
    }

    /// The player-visible grid. Only [`step`](Self::step) and [`reset`](Self::reset) change it.
    pub fn visible(&self) -> &Array2<Cell> {
        &self.visible
    }

    pub fn cell_at(&self, coords: Coord2) -> Cell {
        self.visible[coords.to_nd_index()]
    }

    pub fn mine_layout(&self) -> Option<&MineLayout> {
        self.mine_layout.as_ref()
    }

    pub fn is_started(&self) -> bool {
        self.mine_layout.is_some()
    }

    pub fn has_mine_at(&self, coords: Coord2) -> bool {
        self.mine_layout
            .as_ref()
            .is_some_and(|mine_layout| mine_layout.contains_mine(coords))
    }

    pub fn revealed_count(&self) -> CellCount {
        self.revealed_count
    }

    pub fn marked_count(&self) -> CellCount {
        self.marked_count
    }

    /// Safe cells of the current layout, or the count the config implies before the first reset.
    pub fn safe_cell_count(&self) -> CellCount {
        match &self.mine_layout {
            Some(mine_layout) => mine_layout.safe_cell_count(),
            None => self.config.total_cells() - self.config.mine_count(),
        }
    }

    /// Whether every safe cell of the current layout has been opened.
    pub fn is_cleared(&self) -> bool {
        self.is_started() && self.revealed_count == self.safe_cell_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::collections::BTreeSet;
    use proptest::prelude::*;

    fn env(size: Coord2, mines: &[Coord2]) -> GridEnvironment<FixedLayout> {
        GridEnvironment::from_layout(MineLayout::from_mine_coords(size, mines).unwrap(), 0)
    }

    fn hidden_cells<G: LayoutGenerator>(env: &GridEnvironment<G>) -> BTreeSet<Coord2> {
        iter_coords(env.size())
            .filter(|&coords| env.cell_at(coords).is_hidden())
            .collect()
    }

    #[test]
    fn flood_fill_reveals_everything_but_isolated_mines() {
        let mut env = env((5, 5), &[(0, 0), (4, 4)]);

        let outcome = env.step(Move::open((2, 2))).unwrap();

        assert_eq!(outcome.score, 0);
        assert_eq!(outcome.applied.len(), 23);
        assert_eq!(hidden_cells(&env), BTreeSet::from([(0, 0), (4, 4)]));
        assert_eq!(env.cell_at((1, 1)), Cell::Revealed(1));
        assert_eq!(env.cell_at((3, 4)), Cell::Revealed(1));
        assert_eq!(env.cell_at((2, 2)), Cell::Revealed(0));
        assert!(env.is_cleared());
    }

    #[test]
    fn opening_a_mine_detonates_without_cascading() {
        let mut env = env((3, 3), &[(1, 1)]);

        let outcome = env.step(Move::open((1, 1))).unwrap();

        assert_eq!(outcome.score, DETONATION_SCORE);
        assert!(outcome.is_detonation());
        assert_eq!(outcome.applied, [Move::open((1, 1))]);
        assert_eq!(env.cell_at((1, 1)), Cell::Mine);
        assert_eq!(hidden_cells(&env).len(), 8);
    }

    #[test]
    fn opening_a_number_reveals_only_that_cell() {
        let mut env = env((3, 3), &[(0, 0)]);

        let outcome = env.step(Move::open((1, 1))).unwrap();

        assert_eq!(outcome.applied, [Move::open((1, 1))]);
        assert_eq!(env.cell_at((1, 1)), Cell::Revealed(1));
        assert_eq!(env.revealed_count(), 1);
    }

    #[test]
    fn mark_sets_marked_even_on_safe_cell() {
        let mut env = env((2, 2), &[(0, 0)]);

        let on_mine = env.step(Move::mark((0, 0))).unwrap();
        let on_safe = env.step(Move::mark((1, 1))).unwrap();

        assert_eq!(on_mine.applied, [Move::mark((0, 0))]);
        assert_eq!(on_safe.applied, [Move::mark((1, 1))]);
        assert_eq!(env.cell_at((1, 1)), Cell::Marked);
        assert_eq!(env.marked_count(), 2);
    }

    #[test]
    fn repeated_step_on_resolved_cell_is_noop() {
        let mut env = env((3, 3), &[(0, 0)]);
        env.step(Move::open((2, 2))).unwrap();
        let before = env.visible().clone();

        for mv in [Move::open((2, 2)), Move::open((2, 2)), Move::mark((2, 2))] {
            let outcome = env.step(mv).unwrap();
            assert_eq!(outcome, StepOutcome::default());
            assert_eq!(env.visible(), &before);
        }
    }

    #[test]
    fn out_of_bounds_is_rejected() {
        let mut env = env((2, 3), &[]);

        assert_eq!(env.step(Move::open((2, 0))), Err(FieldError::InvalidCoords));
        assert_eq!(env.step(Move::mark((0, 3))), Err(FieldError::InvalidCoords));
    }

    #[test]
    fn reset_starts_from_zero_cell() {
        let config = FieldConfig::new((12, 12), 0.15).unwrap();
        let mut env = GridEnvironment::new(config, 5).unwrap();

        for _ in 0..20 {
            let outcome = env.reset().unwrap();
            let start = outcome.applied[0].coords;
            assert_eq!(outcome.score, 0);
            assert_eq!(env.cell_at(start), Cell::Revealed(0));
            assert_eq!(env.mine_layout().unwrap().count_at(start), 0);
            assert_eq!(env.marked_count(), 0);
        }
    }

    #[test]
    fn fresh_environment_refuses_moves_until_reset() {
        let config = FieldConfig::new((4, 4), 0.5).unwrap();
        let mut env = GridEnvironment::new(config, 1).unwrap();

        assert!(!env.is_started());
        assert_eq!(env.step(Move::open((0, 0))), Err(FieldError::NotStarted));
        assert_eq!(env.step(Move::mark((0, 0))), Err(FieldError::NotStarted));
        assert!(env.visible().iter().all(|cell| cell.is_hidden()));
        assert!(!env.is_cleared());
        assert_eq!(env.safe_cell_count(), 8);

        let outcome = env.reset().unwrap();

        assert!(env.is_started());
        assert_eq!(env.mine_layout().unwrap().mine_count(), 8);
        assert_eq!(env.revealed_count() as usize, outcome.applied.len());
    }

    #[test]
    fn failed_reset_leaves_environment_unstarted() {
        let config = FieldConfig::new((2, 2), 0.5).unwrap();
        let mut env = GridEnvironment::with_generator(config, RandomLayoutGenerator::new(5), 3).unwrap();

        assert_eq!(env.reset(), Err(FieldError::NoSafeStart { attempts: 5 }));
        assert_eq!(env.step(Move::open((0, 0))), Err(FieldError::NotStarted));
    }

    #[test]
    fn reset_hides_previous_episode() {
        let mut env = env((3, 3), &[(0, 0)]);
        env.step(Move::open((0, 0))).unwrap();

        let outcome = env.reset().unwrap();

        assert_eq!(outcome.score, 0);
        assert_eq!(hidden_cells(&env), BTreeSet::from([(0, 0)]));
    }

    #[test]
    fn fixed_layout_without_zero_cell_fails_reset() {
        let mut env = env((2, 2), &[(0, 0)]);

        assert!(matches!(env.reset(), Err(FieldError::NoSafeStart { .. })));
    }

    /// Zero-count component of `start` plus the numbered cells bordering it.
    fn expected_flood(layout: &MineLayout, start: Coord2) -> BTreeSet<Coord2> {
        let mut seen = BTreeSet::from([start]);
        let mut queue = vec![start];
        while let Some(coords) = queue.pop() {
            if layout.count_at(coords) != 0 {
                continue;
            }
            for neighbor in layout.iter_neighbors(coords) {
                if seen.insert(neighbor) {
                    queue.push(neighbor);
                }
            }
        }
        seen
    }

    proptest! {
        #[test]
        fn flood_fill_opens_exactly_the_zero_component(
            rows in 1..=20u16,
            cols in 1..=20u16,
            mask in proptest::collection::vec(prop::bool::weighted(0.15), 400),
            pick in any::<prop::sample::Index>(),
        ) {
            let mine_mask = Array2::from_shape_fn(
                [usize::from(rows), usize::from(cols)],
                |(row, col)| mask[row * 20 + col],
            );
            let layout = MineLayout::from_mine_mask(mine_mask);
            let zeros = layout.zero_cells();
            prop_assume!(!zeros.is_empty());
            let start = zeros[pick.index(zeros.len())];

            let mut env = GridEnvironment::from_layout(layout.clone(), 0);
            let outcome = env.step(Move::open(start)).unwrap();

            let opened: BTreeSet<Coord2> = outcome.applied.iter().map(|mv| mv.coords).collect();
            prop_assert_eq!(opened.len(), outcome.applied.len());
            prop_assert_eq!(&opened, &expected_flood(&layout, start));
            prop_assert_eq!(outcome.score, 0);
            for coords in iter_coords(layout.size()) {
                let cell = env.cell_at(coords);
                if opened.contains(&coords) {
                    prop_assert_eq!(cell, Cell::from_count(layout.count_at(coords)));
                } else {
                    prop_assert_eq!(cell, Cell::Hidden);
                }
            }
        }
    }
}
