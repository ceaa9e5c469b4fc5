//! Footprint placement authority
//!
//! The spatial grid belongs to the placement authority, not the economy.
//! The economy only asks whether a footprint is free and, after paying,
//! reserves it.

use ahash::AHashMap;

use crate::core::types::{BuildingId, Footprint, GridCoord};

/// Owner of the spatial grid
pub trait PlacementAuthority: Send {
    /// Whether every cell of the footprint lies on the map
    fn in_bounds(&self, origin: GridCoord, footprint: Footprint) -> bool;

    /// Whether every cell of the footprint is unreserved
    fn is_free(&self, origin: GridCoord, footprint: Footprint) -> bool;

    /// Reserve a footprint for a building, false if any cell is taken
    fn reserve(&mut self, building: BuildingId, origin: GridCoord, footprint: Footprint) -> bool;

    /// Free every cell held by a building
    fn release(&mut self, building: BuildingId);
}

/// Bounded occupancy grid - one optional building per cell
#[derive(Debug, Clone)]
pub struct OccupancyGrid {
    pub width: u32,
    pub height: u32,
    cells: Vec<Option<BuildingId>>,
    reservations: AHashMap<BuildingId, (GridCoord, Footprint)>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
            reservations: AHashMap::new(),
        }
    }

    #[inline]
    fn cell_index(&self, cell: GridCoord) -> Option<usize> {
        if cell.x < 0 || cell.y < 0 {
            return None;
        }
        let (x, y) = (cell.x as u32, cell.y as u32);
        if x < self.width && y < self.height {
            Some(y as usize * self.width as usize + x as usize)
        } else {
            None
        }
    }

    /// Building occupying a cell, if any
    pub fn occupant(&self, cell: GridCoord) -> Option<BuildingId> {
        self.cell_index(cell).and_then(|i| self.cells[i])
    }

    pub fn reserved_count(&self) -> usize {
        self.reservations.len()
    }
}

impl PlacementAuthority for OccupancyGrid {
    fn in_bounds(&self, origin: GridCoord, footprint: Footprint) -> bool {
        footprint
            .cells(origin)
            .all(|cell| self.cell_index(cell).is_some())
    }

    fn is_free(&self, origin: GridCoord, footprint: Footprint) -> bool {
        footprint
            .cells(origin)
            .all(|cell| matches!(self.cell_index(cell), Some(i) if self.cells[i].is_none()))
    }

    fn reserve(&mut self, building: BuildingId, origin: GridCoord, footprint: Footprint) -> bool {
        if self.reservations.contains_key(&building) || !self.is_free(origin, footprint) {
            return false;
        }
        let indices: Vec<usize> = footprint
            .cells(origin)
            .filter_map(|cell| self.cell_index(cell))
            .collect();
        for i in indices {
            self.cells[i] = Some(building);
        }
        self.reservations.insert(building, (origin, footprint));
        true
    }

    fn release(&mut self, building: BuildingId) {
        let Some((origin, footprint)) = self.reservations.remove(&building) else {
            return;
        };
        let indices: Vec<usize> = footprint
            .cells(origin)
            .filter_map(|cell| self.cell_index(cell))
            .collect();
        for i in indices {
            if self.cells[i] == Some(building) {
                self.cells[i] = None;
            }
        }
    }
}
