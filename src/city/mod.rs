//! City layer - catalog, ledger, buildings, construction, and production

pub mod building;
pub mod catalog;
pub mod construction;
pub mod ledger;
pub mod production;

pub use building::{BuildingRegistry, BuildingSnapshot, BuildingState, RemovedBuilding};
pub use catalog::{BuildingType, Catalog, CatalogError, ResourceCategory, ResourceType};
pub use construction::{apply_construction_work, ContributionResult};
pub use ledger::{ResourceEntry, ResourceLedger};
pub use production::{tick_production, travel_efficiency, ProductionEvent, ProductionModifiers};
