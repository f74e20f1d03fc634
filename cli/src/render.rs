use std::io::{self, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use autosweep_core::Cell;
use ndarray::Array2;

const CLEAR_SCREEN: &str = "\x1b[H\x1b[2J";

pub fn glyph(cell: Cell) -> char {
    match cell {
        Cell::Revealed(0) => '-',
        Cell::Revealed(count) => char::from(b'0' + count.min(8)),
        Cell::Mine => '*',
        Cell::Hidden => '#',
        Cell::Marked => '@',
    }
}

pub fn render_grid(grid: &Array2<Cell>) -> String {
    let mut out = String::with_capacity(grid.len() + grid.nrows());
    for row in grid.rows() {
        out.extend(row.iter().map(|&cell| glyph(cell)));
        out.push('\n');
    }
    out
}

#[derive(Debug, Default)]
struct SlotState {
    latest: Option<Array2<Cell>>,
    closed: bool,
}

/// Single-entry mailbox: a new snapshot replaces whatever has not been drawn yet.
#[derive(Debug, Default)]
struct Slot {
    state: Mutex<SlotState>,
    ready: Condvar,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, grid: Array2<Cell>) {
        self.lock().latest = Some(grid);
        self.ready.notify_one();
    }

    fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_one();
    }

    /// Blocks until a snapshot is available; `None` once closed and drained.
    fn take(&self) -> Option<Array2<Cell>> {
        let mut state = self.lock();
        loop {
            if let Some(grid) = state.latest.take() {
                return Some(grid);
            }
            if state.closed {
                return None;
            }
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

/// Draws the most recent published grid on a worker thread, skipping snapshots it could not keep up with.
pub struct Renderer {
    slot: Arc<Slot>,
    handle: JoinHandle<u64>,
}

impl Renderer {
    pub fn spawn() -> io::Result<Self> {
        let slot = Arc::new(Slot::default());
        let worker_slot = Arc::clone(&slot);
        let handle = thread::Builder::new()
            .name("renderer".into())
            .spawn(move || draw_loop(&worker_slot))?;
        Ok(Self { slot, handle })
    }

    pub fn publish(&self, grid: Array2<Cell>) {
        self.slot.publish(grid);
    }

    /// Stops the worker after its last frame and returns how many frames it drew.
    pub fn finish(self) -> u64 {
        self.slot.close();
        self.handle.join().unwrap_or_else(|_| {
            log::warn!("Renderer thread panicked");
            0
        })
    }
}

fn draw_loop(slot: &Slot) -> u64 {
    let mut frames = 0;
    while let Some(grid) = slot.take() {
        let frame = render_grid(&grid);
        let mut stdout = io::stdout().lock();
        if let Err(err) = write!(stdout, "{CLEAR_SCREEN}{frame}").and_then(|()| stdout.flush()) {
            log::warn!("Stopped rendering: {err}");
            break;
        }
        frames += 1;
    }
    frames
}
