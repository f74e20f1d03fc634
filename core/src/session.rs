use alloc::vec::Vec;
use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

use crate::*;

/// What the driver does when the agent has no certain move.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fallback {
    /// End the episode as stalled.
    #[default]
    Stall,
    /// Open a uniformly random hidden cell.
    Guess,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub field: FieldConfig,
    pub seed: u64,
    /// Ticks an ended episode stays on screen before the next reset.
    pub cooldown_ticks: u32,
    pub fallback: Fallback,
}

impl SessionConfig {
    pub const DEFAULT_COOLDOWN_TICKS: u32 = 30;

    pub fn new(field: FieldConfig, seed: u64) -> Self {
        Self {
            field,
            seed,
            cooldown_ticks: Self::DEFAULT_COOLDOWN_TICKS,
            fallback: Fallback::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodeEnd {
    /// Every safe cell was opened.
    Cleared,
    /// No certain move was left and guessing was off.
    Stalled,
    /// A mine went off.
    Detonated,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Fresh,
    Running,
    Ended { end: EpisodeEnd, remaining: u32 },
}

/// Result of a single [`Session::tick`].
#[derive(Clone, Debug, PartialEq)]
pub enum Tick {
    /// A new episode started; carries the cells its initial flood revealed.
    Reset { revealed: usize },
    /// A move was applied; `guessed` is set when it came from the fallback rather than a deduction.
    Moved {
        mv: Move,
        guessed: bool,
        outcome: StepOutcome,
    },
    /// The episode just ended.
    Ended(EpisodeEnd),
    /// Cooling down after an ended episode.
    Waiting,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub ticks: u64,
    pub episodes: u64,
    pub cleared: u64,
    pub stalled: u64,
    pub detonated: u64,
    pub moves: u64,
    pub opens: u64,
    pub marks: u64,
    pub guesses: u64,
    pub cells_revealed: u64,
}

impl SessionStats {
    /// Episodes that have finished, as opposed to started.
    pub fn finished(&self) -> u64 {
        self.cleared + self.stalled + self.detonated
    }

    fn record_end(&mut self, end: EpisodeEnd) {
        match end {
            EpisodeEnd::Cleared => self.cleared += 1,
            EpisodeEnd::Stalled => self.stalled += 1,
            EpisodeEnd::Detonated => self.detonated += 1,
        }
    }
}

/// Drives one environment with one agent, one tick at a time, restarting both whenever an episode ends.
#[derive(Clone, Debug)]
pub struct Session<G = RandomLayoutGenerator> {
    config: SessionConfig,
    env: GridEnvironment<G>,
    agent: DeductionAgent,
    rng: SmallRng,
    phase: Phase,
    last_applied: Vec<Move>,
    stats: SessionStats,
}

impl Session {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let env = GridEnvironment::new(config.field, config.seed)?;
        Self::with_environment(config, env)
    }
}

impl<G: LayoutGenerator> Session<G> {
    pub fn with_environment(config: SessionConfig, env: GridEnvironment<G>) -> Result<Self> {
        let agent = DeductionAgent::new(env.size(), config.seed.wrapping_add(1));
        Self::with_parts(config, env, agent)
    }

    pub fn with_parts(
        config: SessionConfig,
        env: GridEnvironment<G>,
        agent: DeductionAgent,
    ) -> Result<Self> {
        if agent.size() != env.size() {
            return Err(FieldError::SizeMismatch {
                expected: env.size(),
                actual: agent.size(),
            });
        }
        Ok(Self {
            rng: SmallRng::seed_from_u64(config.seed.wrapping_add(2)),
            config,
            env,
            agent,
            phase: Phase::Fresh,
            last_applied: Vec::new(),
            stats: SessionStats::default(),
        })
    }

    pub fn tick(&mut self) -> Result<Tick> {
        self.stats.ticks += 1;
        match self.phase {
            Phase::Fresh => self.start_episode(),
            Phase::Running => self.advance(),
            Phase::Ended { remaining: 0, .. } => self.start_episode(),
            Phase::Ended { end, remaining } => {
                self.phase = Phase::Ended {
                    end,
                    remaining: remaining - 1,
                };
                Ok(Tick::Waiting)
            }
        }
    }

    fn start_episode(&mut self) -> Result<Tick> {
        let outcome = self.env.reset()?;
        self.agent.reset();
        self.stats.episodes += 1;
        self.stats.cells_revealed += u64::from(self.env.revealed_count());
        let revealed = outcome.applied.len();
        self.last_applied = outcome.applied;
        self.phase = Phase::Running;
        Ok(Tick::Reset { revealed })
    }

    fn advance(&mut self) -> Result<Tick> {
        let applied = core::mem::take(&mut self.last_applied);
        let (mv, guessed) = match self.agent.step(self.env.visible(), &applied) {
            Some(mv) => (mv, false),
            None if self.env.is_cleared() => return Ok(self.end_episode(EpisodeEnd::Cleared)),
            None => match self.config.fallback {
                Fallback::Stall => return Ok(self.end_episode(EpisodeEnd::Stalled)),
                Fallback::Guess => match random_hidden_cell(self.env.visible(), &mut self.rng) {
                    Some(coords) => (Move::open(coords), true),
                    None => return Ok(self.end_episode(EpisodeEnd::Stalled)),
                },
            },
        };

        let revealed_before = self.env.revealed_count();
        let outcome = self.env.step(mv)?;
        self.stats.moves += 1;
        match mv.action {
            Action::Open => self.stats.opens += 1,
            Action::Mark => self.stats.marks += 1,
        }
        if guessed {
            self.stats.guesses += 1;
        }
        // a detonated mine is applied but not revealed
        self.stats.cells_revealed += u64::from(self.env.revealed_count() - revealed_before);
        self.last_applied = outcome.applied.clone();

        if outcome.is_detonation() {
            self.end_episode(EpisodeEnd::Detonated);
        }
        Ok(Tick::Moved {
            mv,
            guessed,
            outcome,
        })
    }

    fn end_episode(&mut self, end: EpisodeEnd) -> Tick {
        log::info!(
            "Episode {} {:?}: {}/{} safe cells open, {} marked",
            self.stats.episodes,
            end,
            self.env.revealed_count(),
            self.env.safe_cell_count(),
            self.env.marked_count()
        );
        self.stats.record_end(end);
        self.phase = Phase::Ended {
            end,
            remaining: self.config.cooldown_ticks,
        };
        Tick::Ended(end)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn environment(&self) -> &GridEnvironment<G> {
        &self.env
    }

    /// Current visible grid, the snapshot a renderer should draw.
    pub fn grid(&self) -> &Array2<Cell> {
        self.env.visible()
    }
}
