//! Scenario bootstrap - starting stock, population, policy and buildings
//!
//! Scenarios are TOML files:
//!
//! ```toml
//! free_placement = true
//! population = 6
//! tax = "low"
//! rations = "normal"
//!
//! [stock]
//! wood = 120
//!
//! [[buildings]]
//! type = "keep"
//! x = 2
//! y = 2
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::core::error::SimError;
use crate::core::types::{BuildingId, GridCoord};
use crate::simulation::context::SimulationContext;
use crate::simulation::popularity::{RationLevel, TaxLevel};

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Unknown resource in stock: {0}")]
    UnknownResource(String),
    #[error("Cannot place {kind} at ({x}, {y}): {source}")]
    Placement {
        kind: String,
        x: i32,
        y: i32,
        source: SimError,
    },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScenarioBuilding {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Skip building costs during setup
    pub free_placement: bool,
    pub population: f64,
    pub tax: TaxLevel,
    pub rations: RationLevel,
    pub stock: BTreeMap<String, f64>,
    pub buildings: Vec<ScenarioBuilding>,
}

impl Scenario {
    /// The starter settlement shipped in `data/scenario.toml`
    pub fn builtin() -> Result<Self, ScenarioError> {
        Self::parse_toml(include_str!("../data/scenario.toml"))
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(content)?)
    }

    /// Set up a context from this scenario
    ///
    /// Stock goes in first so paid placements can afford their costs;
    /// anything above base capacity is clamped. Buildings follow in file
    /// order, then population once housing exists.
    pub fn apply(&self, ctx: &mut SimulationContext) -> Result<Vec<BuildingId>, ScenarioError> {
        ctx.set_tax_level(self.tax);
        ctx.set_ration_level(self.rations);

        for (resource, amount) in &self.stock {
            if ctx.ledger.id(resource).is_none() {
                return Err(ScenarioError::UnknownResource(resource.clone()));
            }
            ctx.ledger.add(resource, *amount);
        }

        let mut placed = Vec::with_capacity(self.buildings.len());
        for b in &self.buildings {
            let origin = GridCoord::new(b.x, b.y);
            let result = if self.free_placement {
                ctx.place_free(&b.kind, origin)
            } else {
                ctx.place(&b.kind, origin)
            };
            let id = result.map_err(|source| ScenarioError::Placement {
                kind: b.kind.clone(),
                x: b.x,
                y: b.y,
                source,
            })?;
            placed.push(id);
        }

        // Storage placed above may have raised capacity; top up to the requested stock
        for (resource, amount) in &self.stock {
            let missing = amount - ctx.ledger.get(resource);
            if self.free_placement && missing > 0.0 {
                ctx.ledger.add(resource, missing);
            }
        }

        if self.population > 0.0 {
            let population = ctx.catalog.population();
            ctx.ledger.add_id(population, self.population);
        }
        ctx.refresh_housing();
        ctx.sync_workforce();
        ctx.popularity.recalculate();

        tracing::info!(
            buildings = placed.len(),
            population = ctx.population(),
            "scenario applied"
        );
        Ok(placed)
    }
}
