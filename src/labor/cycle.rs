//! Work cycles - fixed four-task loops bound to one worker
//!
//! Every cycle has the same shape:
//! `MoveTo(building) -> Act -> MoveTo(deposit) -> Deposit`, then wraps.

use serde::Serialize;

use crate::core::types::{GridCoord, ResourceId};

/// What a task does when its duration runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    MoveTo,
    Act,
    Deposit,
}

/// Role a worker fills at its building
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum WorkerRole {
    /// Staffs the building; the building's own rates do the producing
    #[default]
    Operator,
    /// Harvests the building type's `harvest` resource and carries it home
    Gatherer,
}

/// One step in a cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Task {
    pub kind: TaskKind,
    pub target: GridCoord,
    /// Simulated seconds the task takes
    pub duration: f64,
    pub remaining: f64,
}

impl Task {
    fn new(kind: TaskKind, target: GridCoord, duration: f64) -> Self {
        Self {
            kind,
            target,
            duration,
            remaining: duration,
        }
    }
}

/// Gathered resource and how much of it moves per cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Payload {
    pub resource: ResourceId,
    pub per_act: f64,
    pub carry_capacity: f64,
}

/// Inputs for generating a cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclePlan {
    pub building: GridCoord,
    pub deposit: GridCoord,
    /// One-way walk time between building and deposit
    pub move_seconds: f64,
    pub act_seconds: f64,
    pub deposit_seconds: f64,
    pub payload: Option<Payload>,
}

/// What a finished task asks the engine to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskOutcome {
    Arrived { at: GridCoord },
    /// Units added to the carried load by an ACT
    Acted { credited: f64 },
    /// The carried load is ready to go into the ledger; the cycle wrapped
    Deposited { resource: Option<ResourceId>, amount: f64 },
}

/// Cyclic task sequence with a wrapping cursor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkCycle {
    tasks: [Task; 4],
    cursor: usize,
    pub payload: Option<Payload>,
    pub carried: f64,
    pub completed_cycles: u32,
}

impl WorkCycle {
    pub fn new(plan: &CyclePlan) -> Self {
        Self {
            tasks: [
                Task::new(TaskKind::MoveTo, plan.building, plan.move_seconds),
                Task::new(TaskKind::Act, plan.building, plan.act_seconds),
                Task::new(TaskKind::MoveTo, plan.deposit, plan.move_seconds),
                Task::new(TaskKind::Deposit, plan.deposit, plan.deposit_seconds),
            ],
            cursor: 0,
            payload: plan.payload,
            carried: 0.0,
            completed_cycles: 0,
        }
    }

    /// Start a fresh cycle of the same shape, keeping the cycle count
    pub fn regenerate(&mut self, plan: &CyclePlan) {
        let completed = self.completed_cycles;
        *self = Self::new(plan);
        self.completed_cycles = completed;
    }

    pub fn current(&self) -> &Task {
        &self.tasks[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Where the worker stands before the current task starts
    pub fn current_origin(&self) -> GridCoord {
        self.tasks[(self.cursor + self.tasks.len() - 1) % self.tasks.len()].target
    }

    /// Run `seconds` of the current task
    ///
    /// At most one task finishes per call. When the DEPOSIT finishes the
    /// cursor wraps to the first task and the carried load is handed back.
    pub fn advance(&mut self, seconds: f64) -> Option<TaskOutcome> {
        let task = &mut self.tasks[self.cursor];
        task.remaining -= seconds;
        if task.remaining > 1e-9 {
            return None;
        }
        task.remaining = 0.0;

        let outcome = match task.kind {
            TaskKind::MoveTo => TaskOutcome::Arrived { at: task.target },
            TaskKind::Act => {
                let credited = match self.payload {
                    Some(p) => {
                        let room = (p.carry_capacity - self.carried).max(0.0);
                        let credited = p.per_act.min(room);
                        self.carried += credited;
                        credited
                    }
                    None => 0.0,
                };
                TaskOutcome::Acted { credited }
            }
            TaskKind::Deposit => {
                let amount = std::mem::take(&mut self.carried);
                self.completed_cycles += 1;
                TaskOutcome::Deposited {
                    resource: self.payload.map(|p| p.resource),
                    amount,
                }
            }
        };

        self.cursor = (self.cursor + 1) % self.tasks.len();
        if self.cursor == 0 {
            for task in &mut self.tasks {
                task.remaining = task.duration;
            }
        }
        Some(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(payload: Option<Payload>) -> CyclePlan {
        CyclePlan {
            building: GridCoord::new(10, 0),
            deposit: GridCoord::new(0, 0),
            move_seconds: 2.0,
            act_seconds: 3.0,
            deposit_seconds: 1.0,
            payload,
        }
    }

    fn stone() -> Payload {
        Payload {
            resource: ResourceId(1),
            per_act: 2.0,
            carry_capacity: 4.0,
        }
    }

    #[test]
    fn test_cycle_shape() {
        let cycle = WorkCycle::new(&plan(None));
        let kinds: Vec<_> = cycle.tasks().iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TaskKind::MoveTo, TaskKind::Act, TaskKind::MoveTo, TaskKind::Deposit]
        );
        assert_eq!(cycle.current().target, GridCoord::new(10, 0));
        // First move starts from the deposit point
        assert_eq!(cycle.current_origin(), GridCoord::new(0, 0));
    }

    #[test]
    fn test_full_cycle_wraps_and_delivers() {
        let mut cycle = WorkCycle::new(&plan(Some(stone())));
        let mut outcomes = Vec::new();
        // 2 + 3 + 2 + 1 seconds
        for _ in 0..8 {
            if let Some(o) = cycle.advance(1.0) {
                outcomes.push(o);
            }
        }
        assert_eq!(outcomes.len(), 4);
        assert_eq!(outcomes[1], TaskOutcome::Acted { credited: 2.0 });
        assert_eq!(
            outcomes[3],
            TaskOutcome::Deposited {
                resource: Some(ResourceId(1)),
                amount: 2.0
            }
        );
        assert_eq!(cycle.cursor(), 0);
        assert_eq!(cycle.completed_cycles, 1);
        assert_eq!(cycle.carried, 0.0);
        // Durations restored for the next loop
        assert_eq!(cycle.current().remaining, 2.0);
    }

    #[test]
    fn test_act_bounded_by_carry_capacity() {
        let mut payload = stone();
        payload.per_act = 5.0;
        let mut cycle = WorkCycle::new(&plan(Some(payload)));
        cycle.advance(2.0);
        assert_eq!(cycle.advance(3.0), Some(TaskOutcome::Acted { credited: 4.0 }));
        assert_eq!(cycle.carried, 4.0);
    }

    #[test]
    fn test_operator_carries_nothing() {
        let mut cycle = WorkCycle::new(&plan(None));
        cycle.advance(2.0);
        assert_eq!(cycle.advance(3.0), Some(TaskOutcome::Acted { credited: 0.0 }));
        cycle.advance(2.0);
        assert_eq!(
            cycle.advance(1.0),
            Some(TaskOutcome::Deposited {
                resource: None,
                amount: 0.0
            })
        );
    }

    #[test]
    fn test_one_task_per_advance() {
        let mut cycle = WorkCycle::new(&plan(None));
        // A huge step still only finishes the current task
        assert!(matches!(cycle.advance(100.0), Some(TaskOutcome::Arrived { .. })));
        assert_eq!(cycle.current().kind, TaskKind::Act);
        assert_eq!(cycle.current().remaining, 3.0);
    }

    #[test]
    fn test_regenerate_keeps_count() {
        let mut cycle = WorkCycle::new(&plan(None));
        cycle.completed_cycles = 3;
        let mut other = plan(None);
        other.deposit = GridCoord::new(5, 5);
        cycle.regenerate(&other);
        assert_eq!(cycle.completed_cycles, 3);
        assert_eq!(cycle.tasks()[3].target, GridCoord::new(5, 5));
    }
}
