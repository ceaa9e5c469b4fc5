pub mod config;
pub mod error;
pub mod types;

pub use config::SimulationConfig;
pub use error::{ErrorKind, Result, SimError};
pub use types::{BuildingId, BuildingTypeId, Footprint, GridCoord, ResourceId, Tick, WorkerId};
