//! Worker movement driver
//!
//! The labor engine only tracks how long a MOVE_TO task has left. Whoever
//! animates workers on the map implements this trait and gets told when a
//! walk starts or is abandoned.

use crate::core::types::{GridCoord, WorkerId};

pub trait MovementDriver: Send {
    /// A worker starts walking; `seconds` is the simulated walk time
    fn begin_move(&mut self, worker: WorkerId, from: GridCoord, to: GridCoord, seconds: f64);

    /// A walk was interrupted (worker unassigned or despawned)
    fn cancel(&mut self, _worker: WorkerId) {}
}

/// Driver for headless runs
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMovement;

impl MovementDriver for NullMovement {
    fn begin_move(&mut self, _worker: WorkerId, _from: GridCoord, _to: GridCoord, _seconds: f64) {}
}
