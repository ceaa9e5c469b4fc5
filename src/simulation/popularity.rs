//! Popularity - settlement mood aggregated from taxes, food, fear and fun
//!
//! The score starts at the baseline and sums bounded contributions, then
//! clamps to `[0, 100]`. It drives population growth and, through the fear
//! and good levels, the production multipliers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::city::building::{BuildingRegistry, BuildingState};
use crate::city::catalog::Catalog;
use crate::city::production::ProductionModifiers;
use crate::core::config::SimulationConfig;

/// Maximum fear or good level
pub const MAX_LEVEL: u8 = 5;

const FOOD_VARIETY_PER_TYPE: f64 = 2.0;
const FOOD_VARIETY_CAP: f64 = 10.0;
const ALE_PER_WORKER: f64 = 4.0;
const ALE_CAP: f64 = 20.0;
const FEAR_PER_LEVEL: f64 = 2.0;
const FEAR_CAP: f64 = 10.0;
const GOOD_PER_LEVEL: f64 = 5.0;
const GOOD_CAP: f64 = 25.0;
const IDLE_PER_WORKER: f64 = 1.0;
const IDLE_CAP: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxLevel {
    #[default]
    NoTax,
    Low,
    Average,
    High,
    Extortionate,
}

impl TaxLevel {
    pub const ALL: [TaxLevel; 5] = [
        TaxLevel::NoTax,
        TaxLevel::Low,
        TaxLevel::Average,
        TaxLevel::High,
        TaxLevel::Extortionate,
    ];

    /// Popularity contribution (0 to -35)
    pub fn popularity(self) -> f64 {
        match self {
            TaxLevel::NoTax => 0.0,
            TaxLevel::Low => -5.0,
            TaxLevel::Average => -12.0,
            TaxLevel::High => -22.0,
            TaxLevel::Extortionate => -35.0,
        }
    }

    /// Gold collected per person per slow tick
    pub fn income_per_person(self) -> f64 {
        match self {
            TaxLevel::NoTax => 0.0,
            TaxLevel::Low => 0.2,
            TaxLevel::Average => 0.4,
            TaxLevel::High => 0.6,
            TaxLevel::Extortionate => 1.0,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            TaxLevel::NoTax => "no_tax",
            TaxLevel::Low => "low",
            TaxLevel::Average => "average",
            TaxLevel::High => "high",
            TaxLevel::Extortionate => "extortionate",
        }
    }
}

impl fmt::Display for TaxLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        TaxLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| format!("unknown tax level '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RationLevel {
    None,
    #[default]
    Normal,
    Extra,
}

impl RationLevel {
    pub const ALL: [RationLevel; 3] = [RationLevel::None, RationLevel::Normal, RationLevel::Extra];

    /// Popularity contribution (-10 to +15)
    pub fn popularity(self) -> f64 {
        match self {
            RationLevel::None => -10.0,
            RationLevel::Normal => 0.0,
            RationLevel::Extra => 15.0,
        }
    }

    /// Portions eaten per person per slow tick
    pub fn steps(self) -> f64 {
        match self {
            RationLevel::None => 0.0,
            RationLevel::Normal => 1.0,
            RationLevel::Extra => 2.0,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            RationLevel::None => "none",
            RationLevel::Normal => "normal",
            RationLevel::Extra => "extra",
        }
    }
}

impl fmt::Display for RationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        RationLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| format!("unknown ration level '{s}'"))
    }
}

/// Inputs to the popularity score
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PopularityFactors {
    pub tax_level: TaxLevel,
    pub ration_level: RationLevel,
    pub active_food_types: BTreeSet<String>,
    pub fear_level: u8,
    pub good_level: u8,
    pub ale_coverage: u32,
    pub idle_worker_count: u32,
    /// Last food settlement could not feed everyone; rations score as none
    pub food_shortage: bool,
}

/// Each contribution to the score, for UI layers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularityBreakdown {
    pub baseline: f64,
    pub tax: f64,
    pub rations: f64,
    pub food_variety: f64,
    pub ale: f64,
    pub fear: f64,
    pub good: f64,
    pub idle: f64,
    pub food_shortage: bool,
    /// Clamped sum
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct Popularity {
    pub factors: PopularityFactors,
    score: f64,
    baseline: f64,
    idle_threshold: u32,
    fear_bonus: f64,
    good_penalty: f64,
}

impl Popularity {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            factors: PopularityFactors::default(),
            score: config.baseline_popularity,
            baseline: config.baseline_popularity,
            idle_threshold: config.idle_worker_threshold,
            fear_bonus: config.fear_production_bonus,
            good_penalty: config.good_production_penalty,
        }
    }

    /// Score as of the last recalculation
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn baseline(&self) -> f64 {
        self.baseline
    }

    pub fn breakdown(&self) -> PopularityBreakdown {
        let f = &self.factors;
        let rations = if f.food_shortage {
            RationLevel::None.popularity()
        } else {
            f.ration_level.popularity()
        };
        let variety = f.active_food_types.len().saturating_sub(1) as f64;
        let idle_over = f.idle_worker_count.saturating_sub(self.idle_threshold) as f64;

        let mut breakdown = PopularityBreakdown {
            baseline: self.baseline,
            tax: f.tax_level.popularity(),
            rations,
            food_variety: (variety * FOOD_VARIETY_PER_TYPE).min(FOOD_VARIETY_CAP),
            ale: (f64::from(f.ale_coverage) * ALE_PER_WORKER).min(ALE_CAP),
            fear: 0.0 - (f64::from(f.fear_level.min(MAX_LEVEL)) * FEAR_PER_LEVEL).min(FEAR_CAP),
            good: (f64::from(f.good_level.min(MAX_LEVEL)) * GOOD_PER_LEVEL).min(GOOD_CAP),
            idle: 0.0 - (idle_over * IDLE_PER_WORKER).min(IDLE_CAP),
            food_shortage: f.food_shortage,
            total: 0.0,
        };
        let sum = breakdown.baseline
            + breakdown.tax
            + breakdown.rations
            + breakdown.food_variety
            + breakdown.ale
            + breakdown.fear
            + breakdown.good
            + breakdown.idle;
        breakdown.total = sum.clamp(0.0, 100.0);
        breakdown
    }

    /// Score from the current factors, without storing it
    pub fn calculate(&self) -> f64 {
        self.breakdown().total
    }

    /// Recompute and store the score, returning the previous one
    pub fn recalculate(&mut self) -> f64 {
        let previous = self.score;
        self.score = self.calculate();
        previous
    }

    /// Fear bonus on production, >= 1.0
    pub fn production_multiplier(&self) -> f64 {
        1.0 + f64::from(self.factors.fear_level.min(MAX_LEVEL)) * self.fear_bonus
    }

    /// Entertainment penalty on production, <= 1.0
    pub fn production_penalty(&self) -> f64 {
        (1.0 - f64::from(self.factors.good_level.min(MAX_LEVEL)) * self.good_penalty).max(0.0)
    }

    pub fn modifiers(&self) -> ProductionModifiers {
        ProductionModifiers {
            multiplier: self.production_multiplier(),
            penalty: self.production_penalty(),
        }
    }

    /// Re-derive building-driven factors from completed buildings
    ///
    /// Food types come from food producers, fear and good levels sum over
    /// their sources, and ale coverage only counts sources that are running.
    pub fn refresh_from_buildings(&mut self, buildings: &BuildingRegistry, catalog: &Catalog) {
        let mut foods = BTreeSet::new();
        let mut fear: u32 = 0;
        let mut good: u32 = 0;
        let mut ale: u32 = 0;

        for i in buildings.iter_complete() {
            let Some(bt) = catalog.building_type(buildings.type_ids[i]) else {
                continue;
            };
            for food in catalog.food_outputs(bt) {
                foods.insert(catalog.resource_name(food).to_string());
            }
            fear += u32::from(bt.fear_level);
            good += u32::from(bt.good_level);
            if bt.is_ale_source() && buildings.states[i] == BuildingState::Operational {
                ale += bt.ale_coverage;
            }
        }

        self.factors.active_food_types = foods;
        self.factors.fear_level = fear.min(u32::from(MAX_LEVEL)) as u8;
        self.factors.good_level = good.min(u32::from(MAX_LEVEL)) as u8;
        self.factors.ale_coverage = ale;
    }
}
