//! Simulation configuration with documented constants
//!
//! All magic numbers are collected here with explanations of their purpose
//! and how they interact with each other.

use serde::Deserialize;
use std::path::Path;

/// Configuration for the simulation systems
///
/// Deserializes from TOML; any field left out keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // === TIME ===
    /// Simulated seconds per fast tick
    ///
    /// Production rates are per minute, so each fast tick accumulates
    /// `rate / 60 * tick_seconds`.
    pub tick_seconds: f64,

    /// Fast ticks per slow tick
    ///
    /// Popularity, population, taxes and rations settle once per slow tick.
    /// At 10 with one-second ticks, that is every ten simulated seconds.
    pub slow_tick_interval: u64,

    // === MAP ===
    /// Width of the placement grid in cells
    pub map_width: u32,

    /// Height of the placement grid in cells
    pub map_height: u32,

    // === TRAVEL EFFICIENCY ===
    /// Distance (cells) at which travel efficiency bottoms out
    ///
    /// Also used as the distance for buildings with no reachable
    /// deposit point.
    pub max_travel_distance: f64,

    /// Fraction of output lost at `max_travel_distance`
    pub travel_penalty_factor: f64,

    /// Floor for travel efficiency
    ///
    /// With penalty 0.5 and floor 0.7 the floor is reached at 60% of
    /// `max_travel_distance`.
    pub min_travel_efficiency: f64,

    // === POPULARITY ===
    /// Score with every factor neutral
    pub baseline_popularity: f64,

    /// Idle workers tolerated before the idle penalty starts
    pub idle_worker_threshold: u32,

    /// Production bonus per fear level (1.0 + level * bonus)
    pub fear_production_bonus: f64,

    /// Production penalty per good level (1.0 - level * penalty)
    pub good_production_penalty: f64,

    // === POPULATION ===
    /// People gained per slow tick for each popularity point above baseline
    ///
    /// At 0.02, a score of 100 adds one person per slow tick.
    pub growth_per_point: f64,

    /// People lost per slow tick for each popularity point below baseline
    pub decline_per_point: f64,

    /// Food eaten per person per ration step per slow tick
    ///
    /// Normal rations are one step, extra rations two.
    pub food_per_person: f64,

    // === LABOR ===
    /// Worker walking speed in cells per simulated second
    pub worker_speed: f64,

    /// ACT duration for roles whose building type does not set one
    pub default_act_seconds: f64,

    /// Time spent unloading at a deposit point
    pub deposit_seconds: f64,

    /// Carry capacity for gatherers whose harvest entry does not set one
    pub default_carry_capacity: f64,

    // === PARALLELIZATION ===
    /// Minimum building count before production uses rayon
    ///
    /// Below this threshold, thread overhead exceeds benefits.
    pub parallel_threshold: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0,
            slow_tick_interval: 10,

            map_width: 64,
            map_height: 64,

            max_travel_distance: 40.0,
            travel_penalty_factor: 0.5,
            min_travel_efficiency: 0.7,

            baseline_popularity: 50.0,
            idle_worker_threshold: 24,
            fear_production_bonus: 0.05,
            good_production_penalty: 0.05,

            growth_per_point: 0.02,
            decline_per_point: 0.02,
            food_per_person: 0.1,

            worker_speed: 2.0,
            default_act_seconds: 5.0,
            deposit_seconds: 1.0,
            default_carry_capacity: 1.0,

            parallel_threshold: 256,
        }
    }
}

impl SimulationConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a (possibly partial) TOML config and validate it
    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: SimulationConfig =
            toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML config file from disk
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_seconds <= 0.0 {
            return Err(format!("tick_seconds ({}) must be positive", self.tick_seconds));
        }
        if self.slow_tick_interval == 0 {
            return Err("slow_tick_interval must be at least 1".into());
        }
        if self.map_width == 0 || self.map_height == 0 {
            return Err("map dimensions must be non-zero".into());
        }
        if self.max_travel_distance <= 0.0 {
            return Err("max_travel_distance must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.travel_penalty_factor) {
            return Err(format!(
                "travel_penalty_factor ({}) must be within [0, 1]",
                self.travel_penalty_factor
            ));
        }
        if !(0.0..=1.0).contains(&self.min_travel_efficiency) {
            return Err(format!(
                "min_travel_efficiency ({}) must be within [0, 1]",
                self.min_travel_efficiency
            ));
        }
        if !(0.0..=100.0).contains(&self.baseline_popularity) {
            return Err("baseline_popularity must be within [0, 100]".into());
        }
        // Five good levels must not push the penalty multiplier below zero
        if self.good_production_penalty * 5.0 > 1.0 {
            return Err(format!(
                "good_production_penalty ({}) * 5 must not exceed 1.0",
                self.good_production_penalty
            ));
        }
        if self.fear_production_bonus < 0.0 || self.good_production_penalty < 0.0 {
            return Err("fear/good production modifiers must be non-negative".into());
        }
        if self.growth_per_point < 0.0 || self.decline_per_point < 0.0 {
            return Err("population rates must be non-negative".into());
        }
        if self.food_per_person < 0.0 {
            return Err("food_per_person must be non-negative".into());
        }
        if self.worker_speed <= 0.0 {
            return Err("worker_speed must be positive".into());
        }
        if self.default_act_seconds <= 0.0 || self.deposit_seconds <= 0.0 {
            return Err("task durations must be positive".into());
        }
        if self.default_carry_capacity <= 0.0 {
            return Err("default_carry_capacity must be positive".into());
        }
        Ok(())
    }

    /// Simulated seconds covered by one slow tick
    pub fn slow_tick_seconds(&self) -> f64 {
        self.tick_seconds * self.slow_tick_interval as f64
    }
}
