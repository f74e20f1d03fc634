use rand::rngs::SmallRng;

use crate::*;
pub use random::*;

mod random;

/// Produces the ground-truth layout for a new episode.
///
/// Every layout returned holds at least one zero-count cell, so an episode can always start with a flood reveal.
pub trait LayoutGenerator {
    fn generate(&mut self, config: &FieldConfig, rng: &mut SmallRng) -> Result<MineLayout>;
}

/// Replays one predetermined layout on every reset.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedLayout(pub MineLayout);

impl LayoutGenerator for FixedLayout {
    fn generate(&mut self, config: &FieldConfig, _rng: &mut SmallRng) -> Result<MineLayout> {
        let actual = self.0.size();
        if actual != config.size {
            return Err(FieldError::SizeMismatch {
                expected: config.size,
                actual,
            });
        }
        if !self.0.has_zero_cell() {
            return Err(FieldError::NoSafeStart { attempts: 1 });
        }
        Ok(self.0.clone())
    }
}
