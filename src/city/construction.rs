//! Construction system - advances build progress on construction sites

use crate::city::building::{BuildingRegistry, BuildingState};
use crate::city::catalog::Catalog;

/// Result of advancing a construction site
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContributionResult {
    /// Work applied, building still under construction
    InProgress { progress: f64, required: f64 },
    /// Work applied, building is now complete
    Completed,
    /// Building is already complete
    AlreadyComplete,
    /// Building not found
    NotFound,
}

/// Fraction of construction done (1.0 when complete)
pub fn construction_fraction(progress: f64, required: f64) -> f64 {
    if required <= 0.0 {
        return 1.0;
    }
    (progress / required).clamp(0.0, 1.0)
}

/// Apply `seconds` of construction work to a building
///
/// On completion the building's state is re-derived, so it leaves
/// `Construction` for whatever its staffing implies.
pub fn apply_construction_work(
    buildings: &mut BuildingRegistry,
    catalog: &Catalog,
    building_idx: usize,
    seconds: f64,
) -> ContributionResult {
    if building_idx >= buildings.count() {
        return ContributionResult::NotFound;
    }

    if buildings.states[building_idx] != BuildingState::Construction {
        return ContributionResult::AlreadyComplete;
    }

    let Some(building_type) = catalog.building_type(buildings.type_ids[building_idx]) else {
        return ContributionResult::NotFound;
    };
    let required = building_type.build_seconds;
    buildings.construction_progress[building_idx] += seconds.max(0.0);
    let progress = buildings.construction_progress[building_idx];

    if progress >= required {
        buildings.construction_progress[building_idx] = required;
        buildings.refresh_state(building_idx, catalog);
        ContributionResult::Completed
    } else {
        ContributionResult::InProgress { progress, required }
    }
}
