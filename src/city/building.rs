//! Building registry with SoA layout

use ahash::AHashMap;
use serde::Serialize;

use crate::city::catalog::{BuildingType, Catalog};
use crate::city::construction::construction_fraction;
use crate::core::types::{BuildingId, BuildingTypeId, Footprint, GridCoord, ResourceId, Tick, WorkerId};

/// Current state of a building
///
/// Always derived from construction progress, worker count, resource
/// availability and capacity via [`derive_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildingState {
    /// Construction site - not yet usable
    Construction,
    /// Running normally
    Operational,
    /// Has worker slots but nobody assigned
    NeedsWorkers,
    /// An input resource was unavailable on the last pass
    NeedsResources,
    /// Non-productive building with housing or worker slots saturated
    FullCapacity,
}

/// Compute a building's state from its inputs
pub fn derive_state(
    building_type: &BuildingType,
    under_construction: bool,
    workers: u32,
    shortage: bool,
    residents: u32,
) -> BuildingState {
    if under_construction {
        return BuildingState::Construction;
    }
    if building_type.worker_capacity > 0 && workers == 0 {
        return BuildingState::NeedsWorkers;
    }
    if !building_type.is_productive() {
        let housing_full =
            building_type.housing_capacity > 0 && residents >= building_type.housing_capacity;
        let workers_full =
            building_type.worker_capacity > 0 && workers >= building_type.worker_capacity;
        if housing_full || workers_full {
            return BuildingState::FullCapacity;
        }
    }
    if shortage {
        return BuildingState::NeedsResources;
    }
    BuildingState::Operational
}

/// Plain-data view of one building for UI and save layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingSnapshot {
    pub id: BuildingId,
    pub type_id: String,
    pub origin: GridCoord,
    pub footprint: Footprint,
    pub level: u32,
    pub state: BuildingState,
    pub assigned_workers: Vec<WorkerId>,
    pub worker_capacity: u32,
    pub housing_residents: u32,
    pub housing_capacity: u32,
    pub construction_progress: f64,
    /// 0.0 to 1.0, 1.0 once built
    pub construction_fraction: f64,
    pub placed_tick: Tick,
    pub production_accumulator: Vec<(String, f64)>,
    pub consumption_accumulator: Vec<(String, f64)>,
}

/// What a removed building left behind
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedBuilding {
    pub id: BuildingId,
    pub type_id: BuildingTypeId,
    pub origin: GridCoord,
    pub was_complete: bool,
    pub assigned_workers: Vec<WorkerId>,
    pub housing_residents: u32,
}

/// Structure of Arrays for building instances
#[derive(Debug, Clone, Default)]
pub struct BuildingRegistry {
    pub ids: Vec<BuildingId>,
    pub type_ids: Vec<BuildingTypeId>,
    pub origins: Vec<GridCoord>,
    pub footprints: Vec<Footprint>,
    pub levels: Vec<u32>,
    pub states: Vec<BuildingState>,
    /// Worker set per building, never larger than the type's worker_capacity
    pub assigned_workers: Vec<Vec<WorkerId>>,
    pub housing_residents: Vec<u32>,
    /// Simulated seconds of construction done
    pub construction_progress: Vec<f64>,
    pub production_accumulators: Vec<AHashMap<ResourceId, f64>>,
    pub consumption_accumulators: Vec<AHashMap<ResourceId, f64>>,
    /// Whether the last production pass hit a missing input
    pub shortages: Vec<bool>,
    /// Tick the building was placed on
    pub placed_ticks: Vec<Tick>,
    index: AHashMap<BuildingId, usize>,
    next_id: u32,
}

impl BuildingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    /// Spawn a building record
    ///
    /// Types with a build time start as construction sites; the rest start
    /// in whatever state their staffing implies.
    pub fn spawn(
        &mut self,
        type_id: BuildingTypeId,
        building_type: &BuildingType,
        origin: GridCoord,
        tick: Tick,
    ) -> BuildingId {
        let id = BuildingId(self.next_id);
        self.next_id += 1;

        let under_construction = building_type.build_seconds > 0.0;
        let index = self.ids.len();
        self.ids.push(id);
        self.type_ids.push(type_id);
        self.origins.push(origin);
        self.footprints.push(building_type.footprint);
        self.levels.push(1);
        self.states
            .push(derive_state(building_type, under_construction, 0, false, 0));
        self.assigned_workers.push(Vec::new());
        self.housing_residents.push(0);
        self.construction_progress.push(0.0);
        self.production_accumulators.push(AHashMap::new());
        self.consumption_accumulators.push(AHashMap::new());
        self.shortages.push(false);
        self.placed_ticks.push(tick);
        self.index.insert(id, index);
        id
    }

    /// Remove a building record, swapping the last building into its slot
    pub fn despawn(&mut self, id: BuildingId) -> Option<RemovedBuilding> {
        let index = self.index.remove(&id)?;
        let removed = RemovedBuilding {
            id,
            type_id: self.type_ids[index],
            origin: self.origins[index],
            was_complete: self.states[index] != BuildingState::Construction,
            assigned_workers: std::mem::take(&mut self.assigned_workers[index]),
            housing_residents: self.housing_residents[index],
        };

        self.ids.swap_remove(index);
        self.type_ids.swap_remove(index);
        self.origins.swap_remove(index);
        self.footprints.swap_remove(index);
        self.levels.swap_remove(index);
        self.states.swap_remove(index);
        self.assigned_workers.swap_remove(index);
        self.housing_residents.swap_remove(index);
        self.construction_progress.swap_remove(index);
        self.production_accumulators.swap_remove(index);
        self.consumption_accumulators.swap_remove(index);
        self.shortages.swap_remove(index);
        self.placed_ticks.swap_remove(index);

        if let Some(moved) = self.ids.get(index) {
            self.index.insert(*moved, index);
        }
        Some(removed)
    }

    pub fn index_of(&self, id: BuildingId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn contains(&self, id: BuildingId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn is_complete(&self, index: usize) -> bool {
        self.states
            .get(index)
            .is_some_and(|s| *s != BuildingState::Construction)
    }

    /// Whether any building of this type has been placed (in any state)
    pub fn has_type(&self, type_id: BuildingTypeId) -> bool {
        self.type_ids.contains(&type_id)
    }

    pub fn worker_count(&self, index: usize) -> u32 {
        self.assigned_workers
            .get(index)
            .map(|w| w.len() as u32)
            .unwrap_or(0)
    }

    /// Total workers assigned across all buildings
    pub fn total_assigned(&self) -> u32 {
        self.assigned_workers.iter().map(|w| w.len() as u32).sum()
    }

    /// Add a worker to a building's set; false if full or already present
    pub fn add_worker(&mut self, index: usize, capacity: u32, worker: WorkerId) -> bool {
        let Some(set) = self.assigned_workers.get_mut(index) else {
            return false;
        };
        if set.len() as u32 >= capacity || set.contains(&worker) {
            return false;
        }
        set.push(worker);
        true
    }

    pub fn remove_worker(&mut self, index: usize, worker: WorkerId) -> bool {
        let Some(set) = self.assigned_workers.get_mut(index) else {
            return false;
        };
        match set.iter().position(|w| *w == worker) {
            Some(pos) => {
                set.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Recompute a building's state from its current inputs
    ///
    /// Returns the previous state when it changed.
    pub fn refresh_state(&mut self, index: usize, catalog: &Catalog) -> Option<BuildingState> {
        let building_type = catalog.building_type(*self.type_ids.get(index)?)?;
        let under_construction = self.states[index] == BuildingState::Construction
            && self.construction_progress[index] < building_type.build_seconds;
        let next = derive_state(
            building_type,
            under_construction,
            self.worker_count(index),
            self.shortages[index],
            self.housing_residents[index],
        );
        let previous = self.states[index];
        if previous == next {
            return None;
        }
        self.states[index] = next;
        Some(previous)
    }

    /// Iterate over completed buildings
    pub fn iter_complete(&self) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state != BuildingState::Construction)
            .map(|(i, _)| i)
    }

    /// Iterate over buildings under construction
    pub fn iter_under_construction(&self) -> impl Iterator<Item = usize> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == BuildingState::Construction)
            .map(|(i, _)| i)
    }

    /// Completed buildings with free worker slots, in registry order
    pub fn iter_open_slots<'a>(&'a self, catalog: &'a Catalog) -> impl Iterator<Item = usize> + 'a {
        self.iter_complete().filter(move |&i| {
            catalog
                .building_type(self.type_ids[i])
                .is_some_and(|bt| self.worker_count(i) < bt.worker_capacity)
        })
    }

    /// Housing capacity of all completed buildings
    pub fn total_housing_capacity(&self, catalog: &Catalog) -> u32 {
        self.iter_complete()
            .filter_map(|i| catalog.building_type(self.type_ids[i]))
            .map(|bt| bt.housing_capacity)
            .sum()
    }

    /// Spread `population` whole residents over completed housing in order
    ///
    /// Returns how many people found no bed.
    pub fn distribute_residents(&mut self, catalog: &Catalog, population: u32) -> u32 {
        let mut remaining = population;
        for i in 0..self.count() {
            let capacity = if self.is_complete(i) {
                catalog
                    .building_type(self.type_ids[i])
                    .map(|bt| bt.housing_capacity)
                    .unwrap_or(0)
            } else {
                0
            };
            let housed = remaining.min(capacity);
            self.housing_residents[i] = housed;
            remaining -= housed;
        }
        remaining
    }

    pub fn snapshot(&self, index: usize, catalog: &Catalog) -> Option<BuildingSnapshot> {
        let type_id = *self.type_ids.get(index)?;
        let building_type = catalog.building_type(type_id)?;
        let accumulator = |map: &AHashMap<ResourceId, f64>| {
            let mut rows: Vec<(String, f64)> = map
                .iter()
                .map(|(r, v)| (catalog.resource_name(*r).to_string(), *v))
                .collect();
            rows.sort_by(|a, b| a.0.cmp(&b.0));
            rows
        };
        Some(BuildingSnapshot {
            id: self.ids[index],
            type_id: building_type.id.clone(),
            origin: self.origins[index],
            footprint: self.footprints[index],
            level: self.levels[index],
            state: self.states[index],
            assigned_workers: self.assigned_workers[index].clone(),
            worker_capacity: building_type.worker_capacity,
            housing_residents: self.housing_residents[index],
            housing_capacity: building_type.housing_capacity,
            construction_progress: self.construction_progress[index],
            construction_fraction: construction_fraction(
                self.construction_progress[index],
                building_type.build_seconds,
            ),
            placed_tick: self.placed_ticks[index],
            production_accumulator: accumulator(&self.production_accumulators[index]),
            consumption_accumulator: accumulator(&self.consumption_accumulators[index]),
        })
    }

    /// Snapshots of every building, ordered by id
    pub fn snapshots(&self, catalog: &Catalog) -> Vec<BuildingSnapshot> {
        let mut all: Vec<_> = (0..self.count())
            .filter_map(|i| self.snapshot(i, catalog))
            .collect();
        all.sort_by_key(|b| b.id);
        all
    }
}
