//! Labor - worker roster, assignment, and cyclic work tasks

pub mod cycle;
pub mod engine;

pub use cycle::{CyclePlan, Payload, Task, TaskKind, TaskOutcome, WorkCycle, WorkerRole};
pub use engine::{Assignment, LaborEngine, LaborEvent, LaborWorld, WorkerSnapshot};
