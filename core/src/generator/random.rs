use alloc::vec::Vec;
use rand::prelude::*;

use super::*;

/// Generation strategy that places `round(total * fraction)` mines uniformly at random and retries until the layout
/// has at least one zero-count cell to start from.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomLayoutGenerator {
    max_attempts: u32,
}

impl RandomLayoutGenerator {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 10_000;

    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RandomLayoutGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS)
    }
}

impl LayoutGenerator for RandomLayoutGenerator {
    fn generate(&mut self, config: &FieldConfig, rng: &mut SmallRng) -> Result<MineLayout> {
        let total_cells = config.total_cells();
        let mines = config.mine_count();
        let cols = CellCount::from(config.size.1);
        let mut cells: Vec<CellCount> = (0..total_cells).collect();

        for attempt in 1..=self.max_attempts {
            cells.shuffle(rng);

            let mut mine_mask: Array2<bool> = Array2::default(config.size.to_nd_index());
            for &cell in &cells[..mines as usize] {
                mine_mask[[(cell / cols) as usize, (cell % cols) as usize]] = true;
            }

            let layout = MineLayout::from_mine_mask(mine_mask);
            if layout.has_zero_cell() {
                if attempt > 1 {
                    log::debug!("Layout accepted after {attempt} attempts");
                }
                return Ok(layout);
            }
        }

        log::warn!(
            "Gave up generating a {:?} layout with {} mines after {} attempts",
            config.size,
            mines,
            self.max_attempts
        );
        Err(FieldError::NoSafeStart {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rng(seed: u64) -> SmallRng {
        SmallRng::seed_from_u64(seed)
    }

    #[test]
    fn places_rounded_mine_count() {
        let config = FieldConfig::new((20, 30), 0.15).unwrap();
        let layout = RandomLayoutGenerator::default()
            .generate(&config, &mut rng(7))
            .unwrap();

        assert_eq!(layout.size(), (20, 30));
        assert_eq!(layout.mine_count(), 90);
        assert!(layout.has_zero_cell());
    }

    #[test]
    fn empty_fraction_gives_all_zero_field() {
        let config = FieldConfig::new((3, 4), 0.0).unwrap();
        let layout = RandomLayoutGenerator::default()
            .generate(&config, &mut rng(1))
            .unwrap();

        assert_eq!(layout.mine_count(), 0);
        assert_eq!(layout.zero_cells().len(), 12);
    }

    #[test]
    fn dense_field_fails_after_cap() {
        // every cell of a 2x2 grid neighbors every other, so any mine rules out a zero
        let config = FieldConfig::new((2, 2), 0.5).unwrap();
        let result = RandomLayoutGenerator::new(25).generate(&config, &mut rng(3));

        assert_eq!(result, Err(FieldError::NoSafeStart { attempts: 25 }));
    }

    #[test]
    fn same_seed_same_layout() {
        let config = FieldConfig::new((16, 16), 0.2).unwrap();
        let mut generator = RandomLayoutGenerator::default();

        let first = generator.generate(&config, &mut rng(42)).unwrap();
        let second = generator.generate(&config, &mut rng(42)).unwrap();

        assert_eq!(first, second);
    }

    proptest! {
        #[test]
        fn counts_match_neighboring_mines(
            rows in 1..=50u16,
            cols in 1..=50u16,
            fraction in 0.0f32..0.3,
            seed in any::<u64>(),
        ) {
            let config = FieldConfig::new((rows, cols), fraction).unwrap();
            let generated = RandomLayoutGenerator::new(200).generate(&config, &mut rng(seed));
            prop_assume!(generated.is_ok());
            let layout = generated.unwrap();

            prop_assert_eq!(layout.mine_count(), config.mine_count());
            for coords in iter_coords((rows, cols)) {
                if layout.contains_mine(coords) {
                    prop_assert_eq!(layout.count_at(coords), BOMB);
                    continue;
                }
                let mut expected = 0u8;
                for row in coords.0.saturating_sub(1)..=(coords.0 + 1).min(rows - 1) {
                    for col in coords.1.saturating_sub(1)..=(coords.1 + 1).min(cols - 1) {
                        if (row, col) != coords && layout.contains_mine((row, col)) {
                            expected += 1;
                        }
                    }
                }
                prop_assert_eq!(layout.count_at(coords), expected);
            }
        }
    }
}
