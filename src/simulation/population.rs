//! Population dynamics and slow-tick settlement
//!
//! Population is the ledger's `population` entry. Its capacity is the
//! housing of completed buildings, so the ledger clamp keeps population
//! within housing. Growth and decline accumulate fractionally like
//! production and only emit whole people.

use serde::Serialize;

use crate::city::catalog::{Catalog, ResourceCategory};
use crate::city::ledger::ResourceLedger;
use crate::core::config::SimulationConfig;
use crate::core::types::ResourceId;
use crate::simulation::popularity::{RationLevel, TaxLevel};

/// Result of one food settlement
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RationSettlement {
    pub needed: f64,
    pub eaten: f64,
    pub shortage: bool,
}

/// Fractional growth and decline accumulators
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulationDynamics {
    growth: f64,
    decline: f64,
}

impl PopulationDynamics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn growth_accumulator(&self) -> f64 {
        self.growth
    }

    pub fn decline_accumulator(&self) -> f64 {
        self.decline
    }

    /// Apply one slow tick of growth or decline
    ///
    /// Above the baseline and below housing, people arrive; below the
    /// baseline they leave. Returns the whole-person change.
    pub fn update(
        &mut self,
        popularity: f64,
        ledger: &mut ResourceLedger,
        population: ResourceId,
        config: &SimulationConfig,
    ) -> f64 {
        let baseline = config.baseline_popularity;
        let current = ledger.amount(population);
        let housing = ledger.capacity_of(population);

        if popularity > baseline {
            self.decline = 0.0;
            if current >= housing {
                self.growth = 0.0;
                return 0.0;
            }
            self.growth += (popularity - baseline) * config.growth_per_point;
            let whole = self.growth.floor();
            if whole < 1.0 {
                return 0.0;
            }
            self.growth -= whole;
            let added = ledger.add_id(population, whole);
            if added < whole {
                // Housing filled up
                self.growth = 0.0;
            }
            added
        } else if popularity < baseline {
            self.growth = 0.0;
            self.decline += (baseline - popularity) * config.decline_per_point;
            let whole = self.decline.floor();
            if whole < 1.0 {
                return 0.0;
            }
            self.decline -= whole;
            let leaving = whole.min(current);
            if leaving > 0.0 {
                ledger.consume_id(population, leaving, false);
            }
            -leaving
        } else {
            0.0
        }
    }
}

/// Collect tax into gold, returns the amount credited
pub fn collect_taxes(
    tax: TaxLevel,
    population: f64,
    ledger: &mut ResourceLedger,
    gold: Option<ResourceId>,
) -> f64 {
    let income = tax.income_per_person() * population.max(0.0);
    match gold {
        Some(gold) if income > 0.0 => ledger.add_id(gold, income),
        _ => 0.0,
    }
}

/// Feed the population from every food resource in stock
///
/// The ration is split evenly across stocked food types; whatever one type
/// cannot cover is taken from the others.
pub fn settle_rations(
    ration: RationLevel,
    population: f64,
    ledger: &mut ResourceLedger,
    catalog: &Catalog,
    config: &SimulationConfig,
) -> RationSettlement {
    let needed = population.max(0.0) * config.food_per_person * ration.steps();
    let mut remaining = needed;
    let mut stocked: Vec<ResourceId> = catalog
        .resources_in(ResourceCategory::Food)
        .filter(|r| ledger.amount(*r) > 0.0)
        .collect();

    while remaining > 1e-9 && !stocked.is_empty() {
        let share = remaining / stocked.len() as f64;
        for food in &stocked {
            let take = share.min(ledger.amount(*food));
            if take > 0.0 && ledger.consume_id(*food, take, false) {
                remaining -= take;
            }
        }
        stocked.retain(|r| ledger.amount(*r) > 1e-9);
    }

    let remaining = remaining.max(0.0);
    RationSettlement {
        needed,
        eaten: needed - remaining,
        shortage: remaining > 1e-9,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Catalog, ResourceLedger, SimulationConfig) {
        let catalog = Catalog::builtin().unwrap();
        let mut ledger = ResourceLedger::from_catalog(&catalog);
        ledger.set_derived_capacity(catalog.population(), 20.0);
        (catalog, ledger, SimulationConfig::default())
    }

    #[test]
    fn test_growth_accumulates_fractionally() {
        let (catalog, mut ledger, config) = setup();
        let pop = catalog.population();
        let mut dynamics = PopulationDynamics::new();

        // 75 popularity: 25 points * 0.02 = 0.5 people per slow tick
        assert_eq!(dynamics.update(75.0, &mut ledger, pop, &config), 0.0);
        assert!((dynamics.growth_accumulator() - 0.5).abs() < 1e-9);
        assert_eq!(dynamics.update(75.0, &mut ledger, pop, &config), 1.0);
        assert_eq!(ledger.amount(pop), 1.0);
    }

    #[test]
    fn test_baseline_no_change() {
        let (catalog, mut ledger, config) = setup();
        let pop = catalog.population();
        ledger.add_id(pop, 10.0);
        let mut dynamics = PopulationDynamics::new();
        for _ in 0..50 {
            assert_eq!(dynamics.update(50.0, &mut ledger, pop, &config), 0.0);
        }
        assert_eq!(ledger.amount(pop), 10.0);
    }

    #[test]
    fn test_growth_stops_at_housing() {
        let (catalog, mut ledger, config) = setup();
        let pop = catalog.population();
        ledger.add_id(pop, 20.0);
        let mut dynamics = PopulationDynamics::new();
        for _ in 0..10 {
            dynamics.update(100.0, &mut ledger, pop, &config);
        }
        assert_eq!(ledger.amount(pop), 20.0);
        assert_eq!(dynamics.growth_accumulator(), 0.0);
    }

    #[test]
    fn test_decline_never_negative() {
        let (catalog, mut ledger, config) = setup();
        let pop = catalog.population();
        ledger.add_id(pop, 2.0);
        let mut dynamics = PopulationDynamics::new();
        let mut total = 0.0;
        for _ in 0..20 {
            total += dynamics.update(0.0, &mut ledger, pop, &config);
        }
        assert_eq!(ledger.amount(pop), 0.0);
        assert_eq!(total, -2.0);
    }

    #[test]
    fn test_collect_taxes() {
        let (catalog, mut ledger, _) = setup();
        let gold = catalog.gold();
        assert_eq!(collect_taxes(TaxLevel::NoTax, 10.0, &mut ledger, gold), 0.0);
        let income = collect_taxes(TaxLevel::Average, 10.0, &mut ledger, gold);
        assert!((income - 4.0).abs() < 1e-9);
        assert!((ledger.get("gold") - 4.0).abs() < 1e-9);
        assert_eq!(collect_taxes(TaxLevel::High, 10.0, &mut ledger, None), 0.0);
    }

    #[test]
    fn test_rations_spread_across_foods() {
        let (catalog, mut ledger, config) = setup();
        ledger.add("bread", 10.0);
        ledger.add("apples", 0.5);

        // 20 people * 0.1 * 2 steps = 4 units
        let settled = settle_rations(RationLevel::Extra, 20.0, &mut ledger, &catalog, &config);
        assert!(!settled.shortage);
        assert!((settled.eaten - 4.0).abs() < 1e-9);
        assert_eq!(ledger.get("apples"), 0.0);
        assert!((ledger.get("bread") - 6.5).abs() < 1e-9);
    }

    #[test]
    fn test_rations_shortage() {
        let (catalog, mut ledger, config) = setup();
        ledger.add("meat", 1.0);
        let settled = settle_rations(RationLevel::Normal, 20.0, &mut ledger, &catalog, &config);
        assert!(settled.shortage);
        assert!((settled.eaten - 1.0).abs() < 1e-9);
        assert_eq!(ledger.get("meat"), 0.0);

        // No rations means nothing to eat and no shortage
        let settled = settle_rations(RationLevel::None, 20.0, &mut ledger, &catalog, &config);
        assert!(!settled.shortage);
        assert_eq!(settled.needed, 0.0);
    }
}
