//! External collaborators - placement grid, distance queries, movement

pub mod distance;
pub mod movement;
pub mod placement;

pub use distance::{DistanceService, ManhattanDistance, StraightLineDistance};
pub use movement::{MovementDriver, NullMovement};
pub use placement::{OccupancyGrid, PlacementAuthority};
