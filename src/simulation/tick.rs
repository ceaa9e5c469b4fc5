//! Tick system - orchestrates simulation updates
//!
//! Fixed order within one tick:
//! 1. Production pass (construction sites advance at its end)
//! 2. Labor pass (auto-match, then cycle advance)
//! 3. Tick counter advances
//! 4. Every `slow_tick_interval` ticks: taxes, rations, workforce sync,
//!    idle count, popularity, population, housing

use serde::Serialize;

use crate::city::production::{tick_production, ProductionEvent};
use crate::core::types::Tick;
use crate::labor::engine::LaborEvent;
use crate::simulation::context::SimulationContext;
use crate::simulation::population::{collect_taxes, settle_rations, RationSettlement};

/// Events generated during a simulation tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimulationEvent {
    Production(ProductionEvent),
    Labor(LaborEvent),
    TaxCollected {
        tick: Tick,
        amount: f64,
    },
    RationsSettled {
        tick: Tick,
        settlement: RationSettlement,
    },
    PopularityChanged {
        tick: Tick,
        from: f64,
        to: f64,
    },
    PopulationChanged {
        tick: Tick,
        from: f64,
        to: f64,
    },
}

/// Run one fast tick
pub fn run_simulation_tick(ctx: &mut SimulationContext) -> Vec<SimulationEvent> {
    let mut events = Vec::new();

    // 1. Production
    let modifiers = ctx.popularity.modifiers();
    let production = tick_production(
        &mut ctx.buildings,
        &ctx.catalog,
        &mut ctx.ledger,
        modifiers,
        ctx.distance.as_ref(),
        &ctx.config,
    );

    let mut factors_dirty = false;
    for event in &production {
        match event {
            ProductionEvent::ConstructionComplete { building } => {
                ctx.on_building_completed(*building);
            }
            ProductionEvent::StateChanged { .. } => factors_dirty = true,
            _ => {}
        }
    }
    if factors_dirty {
        ctx.refresh_factors();
    }
    events.extend(production.into_iter().map(SimulationEvent::Production));

    // 2. Labor
    let labor = {
        let (engine, mut world, ledger) = ctx.split_labor();
        engine.tick_labor(&mut world, ledger)
    };
    events.extend(labor.into_iter().map(SimulationEvent::Labor));

    // 3. Advance
    ctx.tick += 1;

    // 4. Slow tick
    if ctx.tick % ctx.config.slow_tick_interval == 0 {
        slow_tick(ctx, &mut events);
    }

    events
}

/// Run `count` fast ticks, returning every event in order
pub fn run_ticks(ctx: &mut SimulationContext, count: u64) -> Vec<SimulationEvent> {
    let mut events = Vec::new();
    for _ in 0..count {
        events.extend(run_simulation_tick(ctx));
    }
    events
}

fn slow_tick(ctx: &mut SimulationContext, events: &mut Vec<SimulationEvent>) {
    let tick = ctx.tick;
    let population = ctx.population();

    let amount = collect_taxes(
        ctx.popularity.factors.tax_level,
        population,
        &mut ctx.ledger,
        ctx.catalog.gold(),
    );
    if amount > 0.0 {
        events.push(SimulationEvent::TaxCollected { tick, amount });
    }

    let settlement = settle_rations(
        ctx.popularity.factors.ration_level,
        population,
        &mut ctx.ledger,
        &ctx.catalog,
        &ctx.config,
    );
    if settlement.shortage && !ctx.popularity.factors.food_shortage {
        tracing::warn!(needed = settlement.needed, eaten = settlement.eaten, "food shortage");
    }
    ctx.popularity.factors.food_shortage = settlement.shortage;
    events.push(SimulationEvent::RationsSettled { tick, settlement });

    events.extend(ctx.sync_workforce().into_iter().map(SimulationEvent::Labor));
    ctx.popularity.factors.idle_worker_count = ctx.labor.idle_count();

    ctx.refresh_factors();
    let previous = ctx.popularity.recalculate();
    let score = ctx.popularity.score();
    if (score - previous).abs() > f64::EPSILON {
        tracing::debug!(from = previous, to = score, "popularity changed");
        events.push(SimulationEvent::PopularityChanged {
            tick,
            from: previous,
            to: score,
        });
    }

    let population_id = ctx.catalog.population();
    let change = ctx
        .population
        .update(score, &mut ctx.ledger, population_id, &ctx.config);
    if change != 0.0 {
        let now = ctx.population();
        tracing::info!(from = population, to = now, popularity = score, "population changed");
        events.push(SimulationEvent::PopulationChanged {
            tick,
            from: population,
            to: now,
        });
    }

    let states_before = ctx.buildings.states.clone();
    ctx.refresh_housing();
    for (i, (before, after)) in states_before.iter().zip(&ctx.buildings.states).enumerate() {
        if before != after {
            events.push(SimulationEvent::Production(ProductionEvent::StateChanged {
                building: ctx.buildings.ids[i],
                from: *before,
                to: *after,
            }));
        }
    }
}
