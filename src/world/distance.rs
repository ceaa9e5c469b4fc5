//! Distance and path-existence queries
//!
//! The economy never computes paths itself. It asks a distance service and
//! treats `None` as unreachable.

use crate::core::types::GridCoord;

/// Travel distance between two cells
///
/// Must be `Sync`: the production pass queries it from rayon workers.
pub trait DistanceService: Send + Sync {
    /// Travel distance in cells, `None` when no path exists
    fn distance(&self, from: GridCoord, to: GridCoord) -> Option<f64>;

    fn path_exists(&self, from: GridCoord, to: GridCoord) -> bool {
        self.distance(from, to).is_some()
    }
}

/// Euclidean distance between cells, everything reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineDistance;

impl DistanceService for StraightLineDistance {
    fn distance(&self, from: GridCoord, to: GridCoord) -> Option<f64> {
        Some(from.distance(&to))
    }
}

/// Grid-walk distance (no diagonals), everything reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct ManhattanDistance;

impl DistanceService for ManhattanDistance {
    fn distance(&self, from: GridCoord, to: GridCoord) -> Option<f64> {
        Some(f64::from((from.x - to.x).abs() + (from.y - to.y).abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line() {
        let d = StraightLineDistance.distance(GridCoord::new(0, 0), GridCoord::new(6, 8));
        assert_eq!(d, Some(10.0));
        assert!(StraightLineDistance.path_exists(GridCoord::new(0, 0), GridCoord::new(1, 1)));
    }

    #[test]
    fn test_manhattan() {
        let d = ManhattanDistance.distance(GridCoord::new(1, 1), GridCoord::new(4, -3));
        assert_eq!(d, Some(7.0));
    }

    struct Walled;

    impl DistanceService for Walled {
        fn distance(&self, _from: GridCoord, _to: GridCoord) -> Option<f64> {
            None
        }
    }

    #[test]
    fn test_default_path_exists_uses_distance() {
        assert!(!Walled.path_exists(GridCoord::new(0, 0), GridCoord::new(1, 0)));
    }
}
