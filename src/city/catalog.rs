//! Static catalog - resource and building type tables
//!
//! Loaded once at startup from TOML. String ids are interned into
//! `ResourceId` / `BuildingTypeId` so the per-tick passes index by integer.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::core::types::{BuildingTypeId, Footprint, ResourceId};

/// Reserved resource id for the settlement's population
pub const POPULATION: &str = "population";

/// Resource id that receives tax income, when declared
pub const GOLD: &str = "gold";

/// Broad grouping of resources (storage rules, food variety)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    Material,
    Food,
    Drink,
    Weapon,
    Currency,
    People,
}

/// Broad grouping of buildings (informational, used by UI layers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingCategory {
    Castle,
    Housing,
    Storage,
    Industry,
    Farm,
    Food,
    Civic,
}

/// A resource type
#[derive(Debug, Clone, Serialize)]
pub struct ResourceType {
    pub id: String,
    pub name: String,
    pub category: ResourceCategory,
    /// Ledger capacity before any storage building adds to it
    pub base_capacity: f64,
}

/// Gathering behaviour for workers with the `Gatherer` role
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Harvest {
    pub resource: ResourceId,
    /// Units credited to the carried payload per ACT task
    pub per_act: f64,
    /// Maximum payload a worker carries back
    pub carry_capacity: f64,
}

/// A building type (immutable after load)
#[derive(Debug, Clone, Serialize)]
pub struct BuildingType {
    pub id: String,
    pub name: String,
    pub category: BuildingCategory,
    pub footprint: Footprint,
    pub cost: Vec<(ResourceId, f64)>,
    pub housing_capacity: u32,
    pub worker_capacity: u32,
    /// Capacity added to every resource in `stores`
    pub storage_capacity: f64,
    pub stores: Vec<ResourceCategory>,
    /// Units per minute at full staffing
    pub production_rate: Vec<(ResourceId, f64)>,
    /// Units per minute at full staffing
    pub consumption_rate: Vec<(ResourceId, f64)>,
    /// Fraction of the base rate each assigned worker contributes
    pub production_per_worker: f64,
    pub efficiency: f64,
    pub requires: Vec<BuildingTypeId>,
    pub fear_level: u8,
    pub good_level: u8,
    pub ale_coverage: u32,
    /// Simulated seconds of construction (0 = ready on placement)
    pub build_seconds: f64,
    /// Workers deposit here; production distance is measured to the nearest one
    pub is_deposit_point: bool,
    pub harvest: Option<Harvest>,
    /// ACT task duration override for this building's workers
    pub act_seconds: Option<f64>,
}

impl BuildingType {
    /// Multiplier from staffing
    ///
    /// Buildings without worker slots always run at 1.0. Staffed buildings
    /// scale linearly with assigned workers.
    pub fn worker_factor(&self, workers: u32) -> f64 {
        if self.worker_capacity == 0 {
            return 1.0;
        }
        f64::from(workers.min(self.worker_capacity)) * self.production_per_worker
    }

    /// Converts inputs into outputs
    pub fn is_processing(&self) -> bool {
        !self.production_rate.is_empty() && !self.consumption_rate.is_empty()
    }

    /// Has any production or consumption
    pub fn is_productive(&self) -> bool {
        !self.production_rate.is_empty() || !self.consumption_rate.is_empty()
    }

    pub fn is_ale_source(&self) -> bool {
        self.ale_coverage > 0
    }
}

/// Catalog of all resource and building types
#[derive(Debug, Clone)]
pub struct Catalog {
    resources: Vec<ResourceType>,
    buildings: Vec<BuildingType>,
    resource_index: AHashMap<String, ResourceId>,
    building_index: AHashMap<String, BuildingTypeId>,
    population: ResourceId,
    gold: Option<ResourceId>,
}

impl Catalog {
    /// The built-in catalog shipped in `data/catalog.toml`
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse_toml(include_str!("../../data/catalog.toml"))
    }

    /// Load a catalog from a TOML file
    pub fn load_from_toml(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_toml(&content)
    }

    /// Parse a catalog from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, CatalogError> {
        let data: TomlCatalog = toml::from_str(content)?;
        Self::from_toml_data(data)
    }

    fn from_toml_data(data: TomlCatalog) -> Result<Self, CatalogError> {
        let mut resources = Vec::with_capacity(data.resources.len() + 1);
        let mut resource_index = AHashMap::new();

        for res in data.resources {
            if res.id.trim().is_empty() {
                return Err(CatalogError::InvalidValue("resource with empty id".into()));
            }
            if res.base_capacity <= 0.0 {
                return Err(CatalogError::InvalidValue(format!(
                    "resource {} must have positive base_capacity",
                    res.id
                )));
            }
            if resource_index.contains_key(&res.id) {
                return Err(CatalogError::DuplicateId(res.id));
            }
            let id = ResourceId(resources.len() as u16);
            resource_index.insert(res.id.clone(), id);
            resources.push(ResourceType {
                name: res.name.unwrap_or_else(|| res.id.clone()),
                id: res.id,
                category: res.category,
                base_capacity: res.base_capacity,
            });
        }

        let population = match resource_index.get(POPULATION) {
            Some(id) => *id,
            None => {
                let id = ResourceId(resources.len() as u16);
                resource_index.insert(POPULATION.to_string(), id);
                resources.push(ResourceType {
                    id: POPULATION.to_string(),
                    name: "Population".to_string(),
                    category: ResourceCategory::People,
                    base_capacity: 1.0,
                });
                id
            }
        };
        let gold = resource_index.get(GOLD).copied();

        // Intern every building id first so `requires` may reference later entries
        let mut building_index = AHashMap::new();
        for (i, b) in data.buildings.iter().enumerate() {
            if b.id.trim().is_empty() {
                return Err(CatalogError::InvalidValue("building with empty id".into()));
            }
            if building_index
                .insert(b.id.clone(), BuildingTypeId(i as u16))
                .is_some()
            {
                return Err(CatalogError::DuplicateId(b.id.clone()));
            }
        }

        let mut buildings = Vec::with_capacity(data.buildings.len());
        for b in data.buildings {
            buildings.push(b.into_building_type(&resource_index, &building_index)?);
        }

        Ok(Self {
            resources,
            buildings,
            resource_index,
            building_index,
            population,
            gold,
        })
    }

    pub fn resource_id(&self, id: &str) -> Option<ResourceId> {
        self.resource_index.get(id).copied()
    }

    pub fn building_type_id(&self, id: &str) -> Option<BuildingTypeId> {
        self.building_index.get(id).copied()
    }

    pub fn resource(&self, id: ResourceId) -> Option<&ResourceType> {
        self.resources.get(id.index())
    }

    pub fn building_type(&self, id: BuildingTypeId) -> Option<&BuildingType> {
        self.buildings.get(id.index())
    }

    /// All resource types, in interned order
    pub fn resources(&self) -> &[ResourceType] {
        &self.resources
    }

    /// All building types, in interned order
    pub fn building_types(&self) -> &[BuildingType] {
        &self.buildings
    }

    pub fn population(&self) -> ResourceId {
        self.population
    }

    pub fn gold(&self) -> Option<ResourceId> {
        self.gold
    }

    pub fn resource_name(&self, id: ResourceId) -> &str {
        self.resources
            .get(id.index())
            .map(|r| r.id.as_str())
            .unwrap_or("?")
    }

    pub fn is_food(&self, id: ResourceId) -> bool {
        self.resources
            .get(id.index())
            .is_some_and(|r| r.category == ResourceCategory::Food)
    }

    /// Food resources a building type produces
    pub fn food_outputs<'a>(
        &'a self,
        building_type: &'a BuildingType,
    ) -> impl Iterator<Item = ResourceId> + 'a {
        building_type
            .production_rate
            .iter()
            .map(|(r, _)| *r)
            .filter(move |r| self.is_food(*r))
    }

    /// Resource ids in a category, in interned order
    pub fn resources_in(&self, category: ResourceCategory) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources
            .iter()
            .enumerate()
            .filter(move |(_, r)| r.category == category)
            .map(|(i, _)| ResourceId(i as u16))
    }
}

/// Error type for catalog loading
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Duplicate id: {0}")]
    DuplicateId(String),
    #[error("Building {building} references unknown resource {resource}")]
    UnknownResource { building: String, resource: String },
    #[error("Building {building} requires unknown building type {requires}")]
    UnknownBuildingType { building: String, requires: String },
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// TOML representation of a catalog file
#[derive(Debug, Deserialize)]
struct TomlCatalog {
    #[serde(default)]
    resources: Vec<TomlResource>,
    #[serde(default)]
    buildings: Vec<TomlBuilding>,
}

#[derive(Debug, Deserialize)]
struct TomlResource {
    id: String,
    name: Option<String>,
    category: ResourceCategory,
    base_capacity: f64,
}

#[derive(Debug, Deserialize)]
struct TomlHarvest {
    resource: String,
    per_act: f64,
    carry_capacity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TomlBuilding {
    id: String,
    name: Option<String>,
    category: BuildingCategory,
    #[serde(default = "default_footprint")]
    footprint: [u32; 2],
    #[serde(default)]
    cost: BTreeMap<String, f64>,
    #[serde(default)]
    housing_capacity: u32,
    #[serde(default)]
    worker_capacity: u32,
    #[serde(default)]
    storage_capacity: f64,
    #[serde(default)]
    stores: Vec<ResourceCategory>,
    #[serde(default)]
    production_rate: BTreeMap<String, f64>,
    #[serde(default)]
    consumption_rate: BTreeMap<String, f64>,
    production_per_worker: Option<f64>,
    #[serde(default = "default_efficiency")]
    efficiency: f64,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    fear_level: u8,
    #[serde(default)]
    good_level: u8,
    #[serde(default)]
    ale_coverage: u32,
    #[serde(default)]
    build_seconds: f64,
    #[serde(default)]
    is_deposit_point: bool,
    harvest: Option<TomlHarvest>,
    act_seconds: Option<f64>,
}

fn default_footprint() -> [u32; 2] {
    [1, 1]
}

fn default_efficiency() -> f64 {
    1.0
}

impl TomlBuilding {
    fn into_building_type(
        self,
        resources: &AHashMap<String, ResourceId>,
        buildings: &AHashMap<String, BuildingTypeId>,
    ) -> Result<BuildingType, CatalogError> {
        let resolve = |map: BTreeMap<String, f64>, what: &str| {
            map.into_iter()
                .map(|(name, amount)| {
                    if amount < 0.0 {
                        return Err(CatalogError::InvalidValue(format!(
                            "{} {} of {} is negative",
                            self.id, what, name
                        )));
                    }
                    match resources.get(&name) {
                        Some(id) => Ok((*id, amount)),
                        None => Err(CatalogError::UnknownResource {
                            building: self.id.clone(),
                            resource: name,
                        }),
                    }
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let cost = resolve(self.cost.clone(), "cost")?;
        let production_rate = resolve(self.production_rate.clone(), "production_rate")?;
        let consumption_rate = resolve(self.consumption_rate.clone(), "consumption_rate")?;

        let requires = self
            .requires
            .iter()
            .map(|name| {
                if *name == self.id {
                    return Err(CatalogError::InvalidValue(format!(
                        "{} requires itself",
                        self.id
                    )));
                }
                buildings
                    .get(name)
                    .copied()
                    .ok_or_else(|| CatalogError::UnknownBuildingType {
                        building: self.id.clone(),
                        requires: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let harvest = match self.harvest {
            Some(h) => {
                let resource =
                    resources
                        .get(&h.resource)
                        .copied()
                        .ok_or_else(|| CatalogError::UnknownResource {
                            building: self.id.clone(),
                            resource: h.resource.clone(),
                        })?;
                if h.per_act <= 0.0 {
                    return Err(CatalogError::InvalidValue(format!(
                        "{} harvest per_act must be positive",
                        self.id
                    )));
                }
                let carry_capacity = h.carry_capacity.unwrap_or(h.per_act);
                Some(Harvest {
                    resource,
                    per_act: h.per_act,
                    carry_capacity,
                })
            }
            None => None,
        };

        if self.footprint[0] == 0 || self.footprint[1] == 0 {
            return Err(CatalogError::InvalidValue(format!(
                "{} has an empty footprint",
                self.id
            )));
        }
        if self.efficiency <= 0.0 || self.build_seconds < 0.0 || self.storage_capacity < 0.0 {
            return Err(CatalogError::InvalidValue(format!(
                "{} has a negative efficiency, build time or storage",
                self.id
            )));
        }

        let production_per_worker = match self.production_per_worker {
            Some(p) if p < 0.0 => {
                return Err(CatalogError::InvalidValue(format!(
                    "{} production_per_worker is negative",
                    self.id
                )))
            }
            Some(p) => p,
            None if self.worker_capacity > 0 => 1.0 / f64::from(self.worker_capacity),
            None => 1.0,
        };

        Ok(BuildingType {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            category: self.category,
            footprint: Footprint::new(self.footprint[0], self.footprint[1]),
            cost,
            housing_capacity: self.housing_capacity,
            worker_capacity: self.worker_capacity,
            storage_capacity: self.storage_capacity,
            stores: self.stores,
            production_rate,
            consumption_rate,
            production_per_worker,
            efficiency: self.efficiency,
            requires,
            fear_level: self.fear_level.min(5),
            good_level: self.good_level.min(5),
            ale_coverage: self.ale_coverage,
            build_seconds: self.build_seconds,
            is_deposit_point: self.is_deposit_point,
            harvest,
            act_seconds: self.act_seconds,
        })
    }
}
