//! Simulation context - owns every piece of settlement state
//!
//! Subsystems never reach for shared globals. Everything they touch is a
//! field here and gets passed down by reference.

use serde::Serialize;

use crate::city::building::{BuildingRegistry, BuildingSnapshot, RemovedBuilding};
use crate::city::catalog::Catalog;
use crate::city::ledger::{ResourceEntry, ResourceLedger};
use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimError};
use crate::core::types::{BuildingId, BuildingTypeId, GridCoord, Tick, WorkerId};
use crate::labor::cycle::WorkerRole;
use crate::labor::engine::{LaborEngine, LaborEvent, LaborWorld, WorkerSnapshot};
use crate::simulation::popularity::{Popularity, PopularityBreakdown, RationLevel, TaxLevel};
use crate::simulation::population::PopulationDynamics;
use crate::world::distance::{DistanceService, StraightLineDistance};
use crate::world::movement::{MovementDriver, NullMovement};
use crate::world::placement::{OccupancyGrid, PlacementAuthority};

/// What removing a building cost the settlement
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalReport {
    /// The removed record; `assigned_workers` lists the workers released
    pub removed: RemovedBuilding,
    /// People who lost their beds and left
    pub people_lost: f64,
    /// Stock discarded because storage shrank
    pub stock_lost: f64,
}

/// Plain-data view of the whole settlement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementSnapshot {
    pub tick: Tick,
    pub population: f64,
    pub housing_capacity: u32,
    pub popularity: PopularityBreakdown,
    pub resources: Vec<ResourceEntry>,
    pub buildings: Vec<BuildingSnapshot>,
    pub workers: Vec<WorkerSnapshot>,
}

pub struct SimulationContext {
    pub config: SimulationConfig,
    pub catalog: Catalog,
    pub ledger: ResourceLedger,
    pub buildings: BuildingRegistry,
    pub labor: LaborEngine,
    pub popularity: Popularity,
    pub population: PopulationDynamics,
    pub placement: Box<dyn PlacementAuthority>,
    pub distance: Box<dyn DistanceService>,
    pub movement: Box<dyn MovementDriver>,
    pub tick: Tick,
}

impl SimulationContext {
    /// Fresh settlement on an empty grid with straight-line distances
    pub fn new(config: SimulationConfig, catalog: Catalog) -> Self {
        let ledger = ResourceLedger::from_catalog(&catalog);
        let popularity = Popularity::new(&config);
        let placement = Box::new(OccupancyGrid::new(config.map_width, config.map_height));
        Self {
            ledger,
            popularity,
            placement,
            catalog,
            config,
            buildings: BuildingRegistry::new(),
            labor: LaborEngine::new(),
            population: PopulationDynamics::new(),
            distance: Box::new(StraightLineDistance),
            movement: Box::new(NullMovement),
            tick: 0,
        }
    }

    pub fn with_placement(mut self, placement: Box<dyn PlacementAuthority>) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_distance(mut self, distance: Box<dyn DistanceService>) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_movement(mut self, movement: Box<dyn MovementDriver>) -> Self {
        self.movement = movement;
        self
    }

    /// Split out the labor engine and the state it works against
    pub(crate) fn split_labor(&mut self) -> (&mut LaborEngine, LaborWorld<'_>, &mut ResourceLedger) {
        (
            &mut self.labor,
            LaborWorld {
                buildings: &mut self.buildings,
                catalog: &self.catalog,
                distance: self.distance.as_ref(),
                movement: self.movement.as_mut(),
                config: &self.config,
            },
            &mut self.ledger,
        )
    }

    fn resolve_type(&self, type_id: &str) -> Result<BuildingTypeId> {
        if type_id.trim().is_empty() {
            return Err(SimError::Validation("empty building type id".into()));
        }
        self.catalog
            .building_type_id(type_id)
            .ok_or_else(|| SimError::UnknownBuildingType(type_id.to_string()))
    }

    fn check_placement_inner(
        &self,
        type_id: &str,
        origin: GridCoord,
        check_cost: bool,
    ) -> Result<BuildingTypeId> {
        let id = self.resolve_type(type_id)?;
        let building_type = self
            .catalog
            .building_type(id)
            .ok_or_else(|| SimError::UnknownBuildingType(type_id.to_string()))?;

        if !self.placement.in_bounds(origin, building_type.footprint) {
            return Err(SimError::OutOfBounds(origin));
        }
        for required in &building_type.requires {
            if !self.buildings.has_type(*required) {
                let name = self
                    .catalog
                    .building_type(*required)
                    .map(|bt| bt.id.clone())
                    .unwrap_or_default();
                return Err(SimError::Prerequisite(name));
            }
        }
        if !self.placement.is_free(origin, building_type.footprint) {
            return Err(SimError::FootprintBlocked(origin));
        }
        if check_cost && !self.ledger.can_afford(&building_type.cost) {
            let cost = building_type
                .cost
                .iter()
                .map(|(r, amount)| format!("{} {}", amount, self.catalog.resource_name(*r)))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(SimError::ResourceShortfall(format!("{} needs {}", type_id, cost)));
        }
        Ok(id)
    }

    /// Why a building could not be placed, if it could not
    ///
    /// Checks run in order: type and bounds, prerequisites, footprint, cost.
    pub fn check_placement(&self, type_id: &str, origin: GridCoord) -> Result<BuildingTypeId> {
        self.check_placement_inner(type_id, origin, true)
    }

    pub fn can_place(&self, type_id: &str, origin: GridCoord) -> bool {
        self.check_placement(type_id, origin).is_ok()
    }

    /// Pay for, reserve, and create a building
    pub fn place(&mut self, type_id: &str, origin: GridCoord) -> Result<BuildingId> {
        self.place_inner(type_id, origin, true)
    }

    /// Create a building without paying its cost (scenario setup)
    pub fn place_free(&mut self, type_id: &str, origin: GridCoord) -> Result<BuildingId> {
        self.place_inner(type_id, origin, false)
    }

    fn place_inner(&mut self, type_id: &str, origin: GridCoord, pay: bool) -> Result<BuildingId> {
        let type_key = self.check_placement_inner(type_id, origin, pay)?;
        let building_type = self
            .catalog
            .building_type(type_key)
            .ok_or_else(|| SimError::UnknownBuildingType(type_id.to_string()))?;

        let id = self
            .buildings
            .spawn(type_key, building_type, origin, self.tick);
        if !self.placement.reserve(id, origin, building_type.footprint) {
            self.buildings.despawn(id);
            return Err(SimError::FootprintBlocked(origin));
        }
        if pay && !self.ledger.pay(&building_type.cost) {
            self.placement.release(id);
            self.buildings.despawn(id);
            return Err(SimError::ResourceShortfall(type_id.to_string()));
        }

        tracing::info!(building = id.0, kind = type_id, x = origin.x, y = origin.y, "building placed");
        if self
            .buildings
            .index_of(id)
            .is_some_and(|i| self.buildings.is_complete(i))
        {
            self.on_building_completed(id);
        }
        Ok(id)
    }

    /// Register a newly usable building's storage, housing and popularity
    pub fn on_building_completed(&mut self, id: BuildingId) {
        let Some(index) = self.buildings.index_of(id) else {
            return;
        };
        let Some(building_type) = self.catalog.building_type(self.buildings.type_ids[index]) else {
            return;
        };
        if building_type.storage_capacity > 0.0 {
            for category in &building_type.stores {
                for resource in self.catalog.resources_in(*category) {
                    self.ledger
                        .add_capacity(resource, building_type.storage_capacity);
                }
            }
        }
        if building_type.housing_capacity > 0 {
            self.refresh_housing();
        }
        self.refresh_factors();
    }

    /// Remove a building
    ///
    /// Workers are unassigned through the labor engine, housing and storage
    /// shrink, and popularity factors are re-derived. Nothing is refunded.
    pub fn remove(&mut self, id: BuildingId) -> Result<RemovalReport> {
        if !self.buildings.contains(id) {
            return Err(SimError::BuildingNotFound(id));
        }

        let released = {
            let (labor, mut world, _) = self.split_labor();
            labor.release_building(id, &mut world)
        };
        let mut removed = self
            .buildings
            .despawn(id)
            .ok_or(SimError::BuildingNotFound(id))?;
        removed.assigned_workers = released;
        self.placement.release(id);

        let mut stock_lost = 0.0;
        let mut people_lost = 0.0;
        if removed.was_complete {
            if let Some(building_type) = self.catalog.building_type(removed.type_id) {
                if building_type.storage_capacity > 0.0 {
                    for category in &building_type.stores {
                        for resource in self.catalog.resources_in(*category) {
                            stock_lost += self
                                .ledger
                                .add_capacity(resource, -building_type.storage_capacity);
                        }
                    }
                }
                if building_type.housing_capacity > 0 {
                    people_lost = self.refresh_housing();
                    if people_lost > 0.0 {
                        self.sync_workforce();
                    }
                }
            }
        }
        self.refresh_factors();

        tracing::info!(
            building = id.0,
            workers = removed.assigned_workers.len(),
            people_lost,
            stock_lost,
            "building removed"
        );
        Ok(RemovalReport {
            removed,
            people_lost,
            stock_lost,
        })
    }

    /// Re-derive population capacity from housing and rehouse everyone
    ///
    /// Returns the people lost because housing shrank below population.
    pub fn refresh_housing(&mut self) -> f64 {
        let housing = self.buildings.total_housing_capacity(&self.catalog);
        let population = self.catalog.population();
        let lost = self
            .ledger
            .set_derived_capacity(population, f64::from(housing));
        if lost > 0.0 {
            tracing::warn!(lost, housing, "population exceeded housing");
        }
        let people = self.ledger.amount(population).floor() as u32;
        self.buildings.distribute_residents(&self.catalog, people);
        for i in 0..self.buildings.count() {
            self.buildings.refresh_state(i, &self.catalog);
        }
        lost
    }

    /// Match the worker roster to whole population
    pub fn sync_workforce(&mut self) -> Vec<LaborEvent> {
        let target = self.population().floor() as u32;
        let (labor, mut world, _) = self.split_labor();
        let events = labor.sync_workforce(target, &mut world);
        self.refresh_factors();
        events
    }

    /// Recompute building-driven popularity factors
    pub fn refresh_factors(&mut self) {
        self.popularity
            .refresh_from_buildings(&self.buildings, &self.catalog);
    }

    pub fn assign(&mut self, worker: WorkerId, building: BuildingId, role: WorkerRole) -> Result<()> {
        let (labor, mut world, _) = self.split_labor();
        labor.assign(worker, building, role, &mut world)?;
        self.refresh_factors();
        Ok(())
    }

    pub fn unassign(&mut self, worker: WorkerId) -> Result<BuildingId> {
        let (labor, mut world, _) = self.split_labor();
        let building = labor.unassign(worker, &mut world)?;
        self.refresh_factors();
        Ok(building)
    }

    pub fn set_tax_level(&mut self, level: TaxLevel) {
        self.popularity.factors.tax_level = level;
        self.popularity.recalculate();
    }

    pub fn set_ration_level(&mut self, level: RationLevel) {
        self.popularity.factors.ration_level = level;
        self.popularity.recalculate();
    }

    pub fn population(&self) -> f64 {
        self.ledger.amount(self.catalog.population())
    }

    pub fn housing_capacity(&self) -> u32 {
        self.buildings.total_housing_capacity(&self.catalog)
    }

    pub fn building(&self, id: BuildingId) -> Option<BuildingSnapshot> {
        self.buildings
            .snapshot(self.buildings.index_of(id)?, &self.catalog)
    }

    pub fn snapshot(&self) -> SettlementSnapshot {
        SettlementSnapshot {
            tick: self.tick,
            population: self.population(),
            housing_capacity: self.housing_capacity(),
            popularity: self.popularity.breakdown(),
            resources: self.ledger.snapshot(),
            buildings: self.buildings.snapshots(&self.catalog),
            workers: self.labor.snapshots(),
        }
    }
}
