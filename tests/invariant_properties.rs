//! Property tests for economy invariants
//!
//! Ledger bounds, atomic payment, worker slot limits, population within
//! housing, and the popularity range hold for arbitrary inputs.

use proptest::prelude::*;

use settlement_sim::city::catalog::Catalog;
use settlement_sim::city::ledger::ResourceLedger;
use settlement_sim::core::config::SimulationConfig;
use settlement_sim::core::types::{GridCoord, WorkerId};
use settlement_sim::labor::cycle::WorkerRole;
use settlement_sim::simulation::context::SimulationContext;
use settlement_sim::simulation::popularity::{Popularity, RationLevel, TaxLevel};
use settlement_sim::simulation::tick::run_ticks;

const RESOURCES: [&str; 4] = ["wood", "stone", "bread", "gold"];

fn context() -> SimulationContext {
    SimulationContext::new(SimulationConfig::default(), Catalog::builtin().unwrap())
}

fn assert_ledger_bounded(ledger: &ResourceLedger) -> Result<(), TestCaseError> {
    for entry in ledger.snapshot() {
        prop_assert!(entry.amount >= 0.0, "{} went negative", entry.id);
        prop_assert!(entry.amount <= entry.capacity, "{} over capacity", entry.id);
    }
    Ok(())
}

proptest! {
    #[test]
    fn property_ledger_stays_within_capacity(
        ops in prop::collection::vec((0_u8..4, 0_usize..4, -50.0_f64..400.0), 1..60),
    ) {
        let catalog = Catalog::builtin().unwrap();
        let mut ledger = ResourceLedger::from_catalog(&catalog);

        for (op, resource, amount) in ops {
            let name = RESOURCES[resource];
            match op {
                0 => {
                    ledger.add(name, amount);
                }
                1 => {
                    ledger.consume(name, amount, false);
                }
                2 => {
                    ledger.consume(name, amount, true);
                }
                _ => {
                    ledger.set_capacity(name, amount);
                }
            }
            assert_ledger_bounded(&ledger)?;
        }
    }

    #[test]
    fn property_pay_is_atomic(
        stock in prop::collection::vec(0.0_f64..100.0, 4),
        cost in prop::collection::vec((0_usize..4, 0.0_f64..120.0), 1..5),
    ) {
        let catalog = Catalog::builtin().unwrap();
        let mut ledger = ResourceLedger::from_catalog(&catalog);
        for (name, amount) in RESOURCES.iter().zip(&stock) {
            ledger.add(name, *amount);
        }
        let cost: Vec<_> = cost
            .into_iter()
            .map(|(r, amount)| (ledger.id(RESOURCES[r]).unwrap(), amount))
            .collect();

        let before = ledger.snapshot();
        let affordable = ledger.can_afford(&cost);
        prop_assert_eq!(ledger.pay(&cost), affordable);
        if affordable {
            for (id, amount) in &cost {
                let total: f64 = cost.iter().filter(|(r, _)| r == id).map(|(_, a)| a).sum();
                let was = before[id.index()].amount;
                prop_assert!((ledger.amount(*id) - (was - total)).abs() < 1e-9, "{} of {:?}", amount, id);
            }
        } else {
            prop_assert_eq!(ledger.snapshot(), before);
        }
    }

    #[test]
    fn property_worker_slots_never_exceeded(
        attempts in prop::collection::vec((0_u32..12, 0_usize..3), 1..40),
    ) {
        let mut ctx = context();
        ctx.place_free("stockpile", GridCoord::new(0, 0)).unwrap();
        let buildings = [
            ctx.place_free("woodcutter", GridCoord::new(10, 0)).unwrap(),
            ctx.place_free("quarry", GridCoord::new(20, 0)).unwrap(),
            ctx.place_free("wheat_farm", GridCoord::new(30, 0)).unwrap(),
        ];
        for _ in 0..12 {
            ctx.labor.spawn_worker();
        }

        for (worker, building) in attempts {
            let _ = ctx.assign(WorkerId(worker), buildings[building], WorkerRole::Operator);
        }
        for id in buildings {
            let snap = ctx.building(id).unwrap();
            prop_assert!(snap.assigned_workers.len() as u32 <= snap.worker_capacity);
        }
        prop_assert_eq!(
            ctx.labor.assigned_count(),
            ctx.buildings.total_assigned()
        );
    }

    #[test]
    fn property_population_within_housing(
        population in 0.0_f64..40.0,
        hovels in 0_i32..3,
        tax in 0_usize..5,
        rations in 0_usize..3,
        bread in 0.0_f64..100.0,
    ) {
        let mut ctx = context();
        ctx.place_free("keep", GridCoord::new(0, 0)).unwrap();
        for i in 0..hovels {
            ctx.place_free("hovel", GridCoord::new(10 + i * 4, 0)).unwrap();
        }
        ctx.set_tax_level(TaxLevel::ALL[tax]);
        ctx.set_ration_level(RationLevel::ALL[rations]);
        ctx.ledger.add("bread", bread);
        ctx.ledger.add("population", population);
        ctx.sync_workforce();

        for _ in 0..6 {
            run_ticks(&mut ctx, 10);
            prop_assert!(ctx.population() >= 0.0);
            prop_assert!(ctx.population() <= f64::from(ctx.housing_capacity()));
            let score = ctx.popularity.score();
            prop_assert!((0.0..=100.0).contains(&score));
            assert_ledger_bounded(&ctx.ledger)?;
        }
    }

    #[test]
    fn property_popularity_in_range(
        tax in 0_usize..5,
        rations in 0_usize..3,
        foods in 0_usize..5,
        fear in 0_u8..10,
        good in 0_u8..10,
        ale in 0_u32..50,
        idle in 0_u32..100,
        shortage in any::<bool>(),
    ) {
        let mut popularity = Popularity::new(&SimulationConfig::default());
        popularity.factors.tax_level = TaxLevel::ALL[tax];
        popularity.factors.ration_level = RationLevel::ALL[rations];
        popularity.factors.active_food_types =
            ["apples", "bread", "cheese", "meat"].iter().take(foods).map(|s| s.to_string()).collect();
        popularity.factors.fear_level = fear;
        popularity.factors.good_level = good;
        popularity.factors.ale_coverage = ale;
        popularity.factors.idle_worker_count = idle;
        popularity.factors.food_shortage = shortage;

        let score = popularity.calculate();
        prop_assert!((0.0..=100.0).contains(&score));
        prop_assert_eq!(score, popularity.calculate());
        prop_assert!(popularity.production_multiplier() >= 1.0);
        prop_assert!(popularity.production_penalty() <= 1.0);
    }
}
