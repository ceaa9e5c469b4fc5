//! Integration tests for labor
//!
//! Assignment limits, gatherer work cycles driving the ledger, and the
//! worker roster following population.

use std::sync::{Arc, Mutex};

use settlement_sim::city::building::BuildingState;
use settlement_sim::city::catalog::Catalog;
use settlement_sim::core::config::SimulationConfig;
use settlement_sim::core::error::ErrorKind;
use settlement_sim::core::types::{GridCoord, WorkerId};
use settlement_sim::labor::cycle::{TaskKind, WorkerRole};
use settlement_sim::simulation::context::SimulationContext;
use settlement_sim::simulation::tick::{run_simulation_tick, run_ticks};
use settlement_sim::world::movement::MovementDriver;

fn context() -> SimulationContext {
    SimulationContext::new(SimulationConfig::default(), Catalog::builtin().unwrap())
}

/// Records every walk the engine starts
#[derive(Clone, Default)]
struct RecordingMovement {
    walks: Arc<Mutex<Vec<(WorkerId, GridCoord, GridCoord, f64)>>>,
    cancelled: Arc<Mutex<Vec<WorkerId>>>,
}

impl MovementDriver for RecordingMovement {
    fn begin_move(&mut self, worker: WorkerId, from: GridCoord, to: GridCoord, seconds: f64) {
        self.walks.lock().unwrap().push((worker, from, to, seconds));
    }

    fn cancel(&mut self, worker: WorkerId) {
        self.cancelled.lock().unwrap().push(worker);
    }
}

/// Stockpile at the origin, quarry four cells east, a keep out of the way
fn quarry_settlement(movement: RecordingMovement) -> SimulationContext {
    let mut ctx = context().with_movement(Box::new(movement));
    ctx.place_free("stockpile", GridCoord::new(0, 0)).unwrap();
    ctx.place_free("keep", GridCoord::new(20, 20)).unwrap();
    ctx.ledger.add("bread", 50.0);
    ctx.ledger.add("population", 1.0);
    ctx
}

#[test]
fn test_second_worker_rejected_at_capacity() {
    let mut ctx = context();
    ctx.place_free("keep", GridCoord::new(0, 0)).unwrap();
    let cutter = ctx.place_free("woodcutter", GridCoord::new(10, 0)).unwrap();
    let w1 = ctx.labor.spawn_worker();
    let w2 = ctx.labor.spawn_worker();

    ctx.assign(w1, cutter, WorkerRole::Operator).unwrap();
    let err = ctx.assign(w2, cutter, WorkerRole::Operator).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Capacity);

    let snap = ctx.building(cutter).unwrap();
    assert_eq!(snap.assigned_workers, vec![w1]);
    assert_eq!(snap.state, BuildingState::Operational);
    assert!(ctx.labor.assignment(w2).is_none());
}

#[test]
fn test_gatherer_cycle_delivers_stone() {
    let movement = RecordingMovement::default();
    let mut ctx = quarry_settlement(movement.clone());
    let quarry = ctx.place_free("quarry", GridCoord::new(4, 0)).unwrap();
    let worker = ctx.labor.spawn_worker();
    ctx.assign(worker, quarry, WorkerRole::Gatherer).unwrap();

    // Walk 2s, act 8s, walk 2s, deposit 1s
    run_ticks(&mut ctx, 13);
    assert_eq!(ctx.ledger.get("stone"), 2.0);

    let assignment = ctx.labor.assignment(worker).unwrap();
    assert_eq!(assignment.cycle.completed_cycles, 1);
    assert_eq!(assignment.cycle.current().kind, TaskKind::MoveTo);

    let walks = movement.walks.lock().unwrap();
    assert!(walks.len() >= 2);
    assert!(walks.iter().all(|(w, _, _, seconds)| *w == worker && *seconds == 2.0));
}

#[test]
fn test_unassign_while_walking_cancels_move() {
    let movement = RecordingMovement::default();
    let mut ctx = quarry_settlement(movement.clone());
    let quarry = ctx.place_free("quarry", GridCoord::new(4, 0)).unwrap();
    let worker = ctx.labor.spawn_worker();
    ctx.assign(worker, quarry, WorkerRole::Gatherer).unwrap();

    run_simulation_tick(&mut ctx);
    assert_eq!(
        ctx.labor.assignment(worker).unwrap().cycle.current().kind,
        TaskKind::MoveTo
    );
    assert_eq!(ctx.unassign(worker).unwrap(), quarry);
    assert_eq!(*movement.cancelled.lock().unwrap(), vec![worker]);
    assert!(ctx.building(quarry).unwrap().assigned_workers.is_empty());
}

#[test]
fn test_workforce_follows_population() {
    let mut ctx = context();
    let keep = ctx.place_free("keep", GridCoord::new(0, 0)).unwrap();
    let cutter = ctx.place_free("woodcutter", GridCoord::new(10, 0)).unwrap();
    ctx.ledger.add("population", 5.0);
    ctx.sync_workforce();
    assert_eq!(ctx.labor.worker_count(), 5);
    assert_eq!(ctx.labor.idle_count(), 5);

    run_simulation_tick(&mut ctx);
    assert_eq!(ctx.labor.assigned_count(), 1);
    assert_eq!(ctx.building(cutter).unwrap().assigned_workers.len(), 1);

    // Losing the only housing sends everyone away, assigned workers included
    ctx.remove(keep).unwrap();
    assert_eq!(ctx.population(), 0.0);
    assert_eq!(ctx.labor.worker_count(), 0);
    assert!(ctx.building(cutter).unwrap().assigned_workers.is_empty());
    assert_eq!(ctx.building(cutter).unwrap().state, BuildingState::NeedsWorkers);
}

#[test]
fn test_removed_building_frees_its_workers() {
    let mut ctx = context();
    ctx.place_free("keep", GridCoord::new(0, 0)).unwrap();
    let cutter = ctx.place_free("woodcutter", GridCoord::new(10, 0)).unwrap();
    ctx.ledger.add("population", 2.0);
    ctx.sync_workforce();
    run_simulation_tick(&mut ctx);
    assert_eq!(ctx.labor.idle_count(), 1);

    let report = ctx.remove(cutter).unwrap();
    assert_eq!(report.removed.assigned_workers.len(), 1);
    assert_eq!(ctx.labor.worker_count(), 2);
    assert_eq!(ctx.labor.idle_count(), 2);
}
