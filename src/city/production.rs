//! Production system - per-tick production and consumption pass
//!
//! The pass runs in two phases:
//! - Plan: for every completed building, work out how much each input and
//!   output accumulator should move this tick. Read-only against the ledger
//!   and registry, so it can run on rayon for large settlements.
//! - Merge: a single writer walks the plans in building order, advances the
//!   accumulators, and emits whole units to the ledger.
//!
//! Construction sites are advanced after the merge, so a building finishing
//! this tick starts producing on the next one.

use rayon::prelude::*;
use serde::Serialize;

use crate::city::building::{BuildingRegistry, BuildingState};
use crate::city::catalog::{BuildingType, Catalog};
use crate::city::construction::{apply_construction_work, ContributionResult};
use crate::city::ledger::ResourceLedger;
use crate::core::config::SimulationConfig;
use crate::core::types::{BuildingId, GridCoord, ResourceId};
use crate::world::distance::DistanceService;

/// Popularity-derived rate modifiers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProductionModifiers {
    /// Fear bonus, always >= 1.0
    pub multiplier: f64,
    /// Entertainment penalty, always <= 1.0
    pub penalty: f64,
}

impl Default for ProductionModifiers {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            penalty: 1.0,
        }
    }
}

/// Something observable that happened during a production pass
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ProductionEvent {
    Produced {
        building: BuildingId,
        resource: ResourceId,
        amount: f64,
    },
    Consumed {
        building: BuildingId,
        resource: ResourceId,
        amount: f64,
    },
    /// An input was missing; the building skipped it this tick
    Shortage {
        building: BuildingId,
        resource: ResourceId,
    },
    /// Output clamped at ledger capacity; `lost` units were discarded
    StorageFull {
        building: BuildingId,
        resource: ResourceId,
        lost: f64,
    },
    ConstructionComplete {
        building: BuildingId,
    },
    StateChanged {
        building: BuildingId,
        from: BuildingState,
        to: BuildingState,
    },
}

/// Travel efficiency for a given distance to the nearest deposit point
///
/// `None` (no deposit point, or unreachable) counts as the maximum distance.
pub fn travel_efficiency(distance: Option<f64>, config: &SimulationConfig) -> f64 {
    let max = config.max_travel_distance;
    let distance = distance.unwrap_or(max).clamp(0.0, max);
    let efficiency = 1.0 - distance / max * config.travel_penalty_factor;
    efficiency.max(config.min_travel_efficiency)
}

/// Origins of every completed deposit-point building
pub fn deposit_points(buildings: &BuildingRegistry, catalog: &Catalog) -> Vec<GridCoord> {
    buildings
        .iter_complete()
        .filter(|&i| {
            catalog
                .building_type(buildings.type_ids[i])
                .is_some_and(|bt| bt.is_deposit_point)
        })
        .map(|i| buildings.origins[i])
        .collect()
}

/// Nearest reachable deposit point and its distance
pub fn nearest_deposit(
    points: &[GridCoord],
    distance: &dyn DistanceService,
    from: GridCoord,
) -> Option<(GridCoord, f64)> {
    points
        .iter()
        .filter_map(|&p| distance.distance(from, p).map(|d| (p, d)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Accumulator increments for one building this tick
#[derive(Debug, Clone)]
struct BuildingPlan {
    index: usize,
    /// Processing building whose inputs were not all in stock
    gated: Vec<ResourceId>,
    inputs: Vec<(ResourceId, f64)>,
    outputs: Vec<(ResourceId, f64)>,
}

fn plan_building(
    index: usize,
    building_type: &BuildingType,
    buildings: &BuildingRegistry,
    ledger: &ResourceLedger,
    rate_factor: f64,
) -> BuildingPlan {
    let mut plan = BuildingPlan {
        index,
        gated: Vec::new(),
        inputs: Vec::new(),
        outputs: Vec::new(),
    };

    let workers = buildings.worker_count(index);
    let factor = building_type.worker_factor(workers) * rate_factor;

    if building_type.is_processing() {
        // Every input must cover at least one unit and whatever whole
        // units its accumulator will release this tick
        let accumulators = &buildings.consumption_accumulators[index];
        plan.gated = building_type
            .consumption_rate
            .iter()
            .filter(|(r, rate)| {
                let pending =
                    accumulators.get(r).copied().unwrap_or(0.0) + rate * factor.max(0.0);
                ledger.amount(*r) < whole_units(pending).max(1.0)
            })
            .map(|(r, _)| *r)
            .collect();
        if !plan.gated.is_empty() {
            return plan;
        }
    }

    if factor <= 0.0 {
        return plan;
    }

    plan.inputs = building_type
        .consumption_rate
        .iter()
        .map(|(r, rate)| (*r, rate * factor))
        .collect();
    plan.outputs = building_type
        .production_rate
        .iter()
        .map(|(r, rate)| (*r, rate * factor))
        .collect();
    plan
}

/// Process production and consumption for every completed building
///
/// Returns everything that happened, in building order.
pub fn tick_production(
    buildings: &mut BuildingRegistry,
    catalog: &Catalog,
    ledger: &mut ResourceLedger,
    modifiers: ProductionModifiers,
    distance: &dyn DistanceService,
    config: &SimulationConfig,
) -> Vec<ProductionEvent> {
    let mut events = Vec::new();
    let minutes = config.tick_seconds / 60.0;
    let deposits = deposit_points(buildings, catalog);

    let producing: Vec<usize> = buildings
        .iter_complete()
        .filter(|&i| {
            catalog
                .building_type(buildings.type_ids[i])
                .is_some_and(|bt| bt.is_productive())
        })
        .collect();

    let plans: Vec<BuildingPlan> = {
        let buildings = &*buildings;
        let ledger = &*ledger;
        let plan_one = |&i: &usize| -> Option<BuildingPlan> {
            let building_type = catalog.building_type(buildings.type_ids[i])?;
            let travel = if building_type.is_deposit_point {
                Some(0.0)
            } else {
                nearest_deposit(&deposits, distance, buildings.origins[i]).map(|(_, d)| d)
            };
            let rate_factor = building_type.efficiency
                * travel_efficiency(travel, config)
                * modifiers.multiplier
                * modifiers.penalty
                * minutes;
            Some(plan_building(i, building_type, buildings, ledger, rate_factor))
        };

        if producing.len() >= config.parallel_threshold {
            producing.par_iter().filter_map(plan_one).collect()
        } else {
            producing.iter().filter_map(plan_one).collect()
        }
    };

    for plan in plans {
        merge_plan(buildings, ledger, &plan, &mut events);
    }

    for i in 0..buildings.count() {
        if let Some(previous) = buildings.refresh_state(i, catalog) {
            events.push(ProductionEvent::StateChanged {
                building: buildings.ids[i],
                from: previous,
                to: buildings.states[i],
            });
        }
    }

    let sites: Vec<usize> = buildings.iter_under_construction().collect();
    for i in sites {
        if apply_construction_work(buildings, catalog, i, config.tick_seconds)
            == ContributionResult::Completed
        {
            let id = buildings.ids[i];
            tracing::info!(building = id.0, "construction complete");
            events.push(ProductionEvent::ConstructionComplete { building: id });
            events.push(ProductionEvent::StateChanged {
                building: id,
                from: BuildingState::Construction,
                to: buildings.states[i],
            });
        }
    }

    events
}

/// Whole units ready to leave an accumulator
fn whole_units(accumulator: f64) -> f64 {
    if accumulator >= 1.0 {
        accumulator.floor()
    } else {
        0.0
    }
}

fn merge_plan(
    buildings: &mut BuildingRegistry,
    ledger: &mut ResourceLedger,
    plan: &BuildingPlan,
    events: &mut Vec<ProductionEvent>,
) {
    let i = plan.index;
    let id = buildings.ids[i];

    if !plan.gated.is_empty() {
        if !buildings.shortages[i] {
            tracing::debug!(building = id.0, "processing building waiting on inputs");
        }
        buildings.shortages[i] = true;
        for resource in &plan.gated {
            events.push(ProductionEvent::Shortage {
                building: id,
                resource: *resource,
            });
        }
        return;
    }

    let processing = !plan.inputs.is_empty() && !plan.outputs.is_empty();
    let shortage = if processing {
        !draw_inputs_atomically(buildings, ledger, plan, events)
    } else {
        draw_inputs_independently(buildings, ledger, plan, events)
    };

    // A processing building that could not pay for its inputs makes nothing
    if !(processing && shortage) {
        for (resource, increment) in &plan.outputs {
            let acc = buildings.production_accumulators[i]
                .entry(*resource)
                .or_insert(0.0);
            *acc += increment;
            let whole = whole_units(*acc);
            if whole == 0.0 {
                continue;
            }
            *acc -= whole;
            let added = ledger.add_id(*resource, whole);
            if added > 0.0 {
                events.push(ProductionEvent::Produced {
                    building: id,
                    resource: *resource,
                    amount: added,
                });
            }
            if added < whole {
                events.push(ProductionEvent::StorageFull {
                    building: id,
                    resource: *resource,
                    lost: whole - added,
                });
            }
        }
    }

    if shortage && !buildings.shortages[i] {
        tracing::debug!(building = id.0, "building entered shortage");
    }
    buildings.shortages[i] = shortage;
}

/// Draw every input's whole units in one payment
///
/// Either all draws leave the ledger or none do; on failure no input
/// accumulator moves. Returns whether the inputs were paid.
fn draw_inputs_atomically(
    buildings: &mut BuildingRegistry,
    ledger: &mut ResourceLedger,
    plan: &BuildingPlan,
    events: &mut Vec<ProductionEvent>,
) -> bool {
    let i = plan.index;
    let id = buildings.ids[i];
    let accumulators = &mut buildings.consumption_accumulators[i];

    let draws: Vec<(ResourceId, f64)> = plan
        .inputs
        .iter()
        .map(|(r, increment)| {
            let pending = accumulators.get(r).copied().unwrap_or(0.0) + increment;
            (*r, whole_units(pending))
        })
        .filter(|(_, whole)| *whole > 0.0)
        .collect();

    if !ledger.pay(&draws) {
        for (resource, whole) in &draws {
            if ledger.amount(*resource) < *whole {
                events.push(ProductionEvent::Shortage {
                    building: id,
                    resource: *resource,
                });
            }
        }
        return false;
    }

    for (resource, increment) in &plan.inputs {
        *accumulators.entry(*resource).or_insert(0.0) += increment;
    }
    for (resource, whole) in draws {
        if let Some(acc) = accumulators.get_mut(&resource) {
            *acc -= whole;
        }
        events.push(ProductionEvent::Consumed {
            building: id,
            resource,
            amount: whole,
        });
    }
    true
}

/// Draw each input on its own; a missing one does not hold up the rest
///
/// Returns whether any input ran short.
fn draw_inputs_independently(
    buildings: &mut BuildingRegistry,
    ledger: &mut ResourceLedger,
    plan: &BuildingPlan,
    events: &mut Vec<ProductionEvent>,
) -> bool {
    let i = plan.index;
    let id = buildings.ids[i];
    let mut shortage = false;

    for (resource, increment) in &plan.inputs {
        let acc = buildings.consumption_accumulators[i]
            .entry(*resource)
            .or_insert(0.0);
        *acc += increment;
        let whole = whole_units(*acc);
        if whole == 0.0 {
            continue;
        }
        if ledger.consume_id(*resource, whole, false) {
            *acc -= whole;
            events.push(ProductionEvent::Consumed {
                building: id,
                resource: *resource,
                amount: whole,
            });
        } else {
            // Retry a single unit next tick rather than banking the debt
            *acc = acc.min(1.0);
            shortage = true;
            events.push(ProductionEvent::Shortage {
                building: id,
                resource: *resource,
            });
        }
    }
    shortage
}
