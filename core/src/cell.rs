use serde::{Deserialize, Serialize};

/// Sentinel stored in the neighbor-count grid for cells that hold a mine.
pub const BOMB: u8 = 9;

/// Player-visible state of a single grid position.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Hidden,
    Marked,
    Revealed(u8),
    Mine,
}

impl Cell {
    /// Number of distinct symbols a renderer has to map.
    pub const SYMBOL_COUNT: u8 = 12;

    pub const fn is_hidden(self) -> bool {
        matches!(self, Self::Hidden)
    }

    /// Whether the cell is known to hold a mine, either marked or detonated.
    pub const fn is_known_mine(self) -> bool {
        matches!(self, Self::Marked | Self::Mine)
    }

    pub const fn revealed_count(self) -> Option<u8> {
        match self {
            Self::Revealed(count) => Some(count),
            _ => None,
        }
    }

    /// Builds the revealed state for a neighbor-count grid entry.
    pub const fn from_count(count: u8) -> Self {
        if count >= BOMB {
            Self::Mine
        } else {
            Self::Revealed(count)
        }
    }

    /// Stable ordinal: `0..=8` for revealed counts, then mine, hidden, marked.
    pub const fn symbol(self) -> u8 {
        match self {
            Self::Revealed(count) => count,
            Self::Mine => BOMB,
            Self::Hidden => 10,
            Self::Marked => 11,
        }
    }
}
