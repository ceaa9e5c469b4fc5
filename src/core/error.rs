use thiserror::Error;

use crate::core::types::{BuildingId, GridCoord, WorkerId};

/// Coarse error classes surfaced to callers and UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad identifiers, negative magnitudes, out-of-range coordinates
    Validation,
    /// Worker, housing, storage or footprint at its limit
    Capacity,
    /// A chain dependency is missing
    Prerequisite,
    /// Not enough resources to pay or process
    ResourceShortfall,
    /// Referenced building or worker does not exist
    NotFound,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unknown building type: {0}")]
    UnknownBuildingType(String),

    #[error("Origin {0:?} is outside the map")]
    OutOfBounds(GridCoord),

    #[error("Footprint blocked at {0:?}")]
    FootprintBlocked(GridCoord),

    #[error("Capacity reached: {0}")]
    Capacity(String),

    #[error("Building {0:?} is still under construction")]
    UnderConstruction(BuildingId),

    #[error("Missing prerequisite building: {0}")]
    Prerequisite(String),

    #[error("Cannot afford: {0}")]
    ResourceShortfall(String),

    #[error("Building not found: {0:?}")]
    BuildingNotFound(BuildingId),

    #[error("Worker not found: {0:?}")]
    WorkerNotFound(WorkerId),
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::Validation(_)
            | SimError::UnknownBuildingType(_)
            | SimError::OutOfBounds(_) => ErrorKind::Validation,
            SimError::FootprintBlocked(_)
            | SimError::Capacity(_)
            | SimError::UnderConstruction(_) => ErrorKind::Capacity,
            SimError::Prerequisite(_) => ErrorKind::Prerequisite,
            SimError::ResourceShortfall(_) => ErrorKind::ResourceShortfall,
            SimError::BuildingNotFound(_) | SimError::WorkerNotFound(_) => ErrorKind::NotFound,
        }
    }
}

pub type Result<T> = std::result::Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            SimError::Validation("empty id".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            SimError::OutOfBounds(GridCoord::new(-1, 0)).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            SimError::FootprintBlocked(GridCoord::new(1, 1)).kind(),
            ErrorKind::Capacity
        );
        assert_eq!(
            SimError::Prerequisite("quarry".into()).kind(),
            ErrorKind::Prerequisite
        );
        assert_eq!(
            SimError::ResourceShortfall("wood".into()).kind(),
            ErrorKind::ResourceShortfall
        );
        assert_eq!(
            SimError::WorkerNotFound(WorkerId(3)).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_error_display() {
        let err = SimError::Prerequisite("iron_mine".into());
        assert_eq!(err.to_string(), "Missing prerequisite building: iron_mine");
    }
}
