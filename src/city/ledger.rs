//! Resource ledger - settlement-level resource storage
//!
//! Every amount stays within `[0, capacity]`. Writes past the cap are
//! clamped, never rejected. Bad input (unknown or empty ids, negative or
//! non-finite magnitudes) is refused without touching any entry.

use ahash::AHashMap;
use serde::Serialize;

use crate::city::catalog::Catalog;
use crate::core::types::ResourceId;

/// One named resource quantity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceEntry {
    pub id: String,
    pub amount: f64,
    pub capacity: f64,
}

/// Named resource quantities with per-resource caps
#[derive(Debug, Clone, Default)]
pub struct ResourceLedger {
    names: AHashMap<String, ResourceId>,
    entries: Vec<ResourceEntry>,
    /// Capacity floor that storage removal can never go below
    base_capacity: Vec<f64>,
}

fn valid_magnitude(amount: f64) -> bool {
    amount.is_finite() && amount >= 0.0
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare every catalog resource at its base capacity
    ///
    /// Ids line up with the catalog's interned ids. Population starts with
    /// zero capacity; it is derived from housing.
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut ledger = Self::new();
        for res in catalog.resources() {
            ledger.declare(&res.id, res.base_capacity);
        }
        let pop = catalog.population();
        if let Some(entry) = ledger.entries.get_mut(pop.index()) {
            entry.capacity = 0.0;
        }
        if let Some(base) = ledger.base_capacity.get_mut(pop.index()) {
            *base = 0.0;
        }
        ledger
    }

    /// Declare a resource, returns its id (or the existing id if already declared)
    pub fn declare(&mut self, id: &str, capacity: f64) -> Option<ResourceId> {
        if id.trim().is_empty() || !capacity.is_finite() || capacity <= 0.0 {
            tracing::warn!(id, capacity, "rejected resource declaration");
            return None;
        }
        if let Some(existing) = self.names.get(id) {
            return Some(*existing);
        }
        let rid = ResourceId(self.entries.len() as u16);
        self.names.insert(id.to_string(), rid);
        self.entries.push(ResourceEntry {
            id: id.to_string(),
            amount: 0.0,
            capacity,
        });
        self.base_capacity.push(capacity);
        Some(rid)
    }

    /// Look up an interned id by name
    pub fn id(&self, name: &str) -> Option<ResourceId> {
        self.names.get(name).copied()
    }

    fn resolve(&self, name: &str) -> Option<ResourceId> {
        if name.trim().is_empty() {
            tracing::warn!("rejected empty resource id");
            return None;
        }
        let id = self.id(name);
        if id.is_none() {
            tracing::warn!(resource = name, "rejected unknown resource id");
        }
        id
    }

    pub fn entry(&self, id: ResourceId) -> Option<&ResourceEntry> {
        self.entries.get(id.index())
    }

    /// Current amount of a resource (0 for unknown ids)
    pub fn get(&self, name: &str) -> f64 {
        self.id(name).map(|id| self.amount(id)).unwrap_or(0.0)
    }

    pub fn amount(&self, id: ResourceId) -> f64 {
        self.entries.get(id.index()).map(|e| e.amount).unwrap_or(0.0)
    }

    /// Capacity of a resource (0 for unknown ids)
    pub fn capacity(&self, name: &str) -> f64 {
        self.id(name).map(|id| self.capacity_of(id)).unwrap_or(0.0)
    }

    pub fn capacity_of(&self, id: ResourceId) -> f64 {
        self.entries.get(id.index()).map(|e| e.capacity).unwrap_or(0.0)
    }

    /// Try to add resources, returns amount actually added
    pub fn add(&mut self, name: &str, amount: f64) -> f64 {
        match self.resolve(name) {
            Some(id) => self.add_id(id, amount),
            None => 0.0,
        }
    }

    pub fn add_id(&mut self, id: ResourceId, amount: f64) -> f64 {
        if !valid_magnitude(amount) {
            tracing::warn!(?id, amount, "rejected add with invalid magnitude");
            return 0.0;
        }
        let Some(entry) = self.entries.get_mut(id.index()) else {
            return 0.0;
        };
        let space = (entry.capacity - entry.amount).max(0.0);
        let added = amount.min(space);
        // `amount + (capacity - amount)` can round one ulp either side of capacity
        entry.amount = if amount >= space {
            entry.capacity
        } else {
            (entry.amount + added).min(entry.capacity)
        };
        added
    }

    /// Remove resources
    ///
    /// Without `allow_partial`, fails with no mutation if fewer than `amount`
    /// units are available. With it, takes what is there.
    pub fn consume(&mut self, name: &str, amount: f64, allow_partial: bool) -> bool {
        match self.resolve(name) {
            Some(id) => self.consume_id(id, amount, allow_partial),
            None => false,
        }
    }

    pub fn consume_id(&mut self, id: ResourceId, amount: f64, allow_partial: bool) -> bool {
        if !valid_magnitude(amount) {
            tracing::warn!(?id, amount, "rejected consume with invalid magnitude");
            return false;
        }
        let Some(entry) = self.entries.get_mut(id.index()) else {
            return false;
        };
        if entry.amount >= amount {
            entry.amount -= amount;
            return true;
        }
        if !allow_partial {
            return false;
        }
        let taken = entry.amount;
        entry.amount = 0.0;
        taken > 0.0
    }

    /// Check if the ledger holds every entry of a cost map
    pub fn can_afford(&self, cost: &[(ResourceId, f64)]) -> bool {
        let mut totals: Vec<(ResourceId, f64)> = Vec::with_capacity(cost.len());
        for (id, amount) in cost {
            if !valid_magnitude(*amount) || self.entry(*id).is_none() {
                return false;
            }
            match totals.iter_mut().find(|(r, _)| r == id) {
                Some((_, total)) => *total += amount,
                None => totals.push((*id, *amount)),
            }
        }
        totals.iter().all(|(id, total)| self.amount(*id) >= *total)
    }

    /// Deduct a cost map atomically - all entries or none
    pub fn pay(&mut self, cost: &[(ResourceId, f64)]) -> bool {
        if !self.can_afford(cost) {
            return false;
        }
        for (id, amount) in cost {
            if let Some(entry) = self.entries.get_mut(id.index()) {
                entry.amount = (entry.amount - amount).max(0.0);
            }
        }
        true
    }

    /// Set capacity for a resource, clamping the current amount down if needed
    pub fn set_capacity(&mut self, name: &str, new_capacity: f64) -> bool {
        match self.resolve(name) {
            Some(id) => self.set_capacity_id(id, new_capacity),
            None => false,
        }
    }

    pub fn set_capacity_id(&mut self, id: ResourceId, new_capacity: f64) -> bool {
        if !new_capacity.is_finite() || new_capacity <= 0.0 {
            tracing::warn!(?id, new_capacity, "rejected non-positive capacity");
            return false;
        }
        let Some(entry) = self.entries.get_mut(id.index()) else {
            return false;
        };
        entry.capacity = new_capacity;
        entry.amount = entry.amount.min(new_capacity);
        true
    }

    /// Set a capacity derived from other state (population from housing)
    ///
    /// Zero is allowed. Returns the amount lost to clamping.
    pub fn set_derived_capacity(&mut self, id: ResourceId, capacity: f64) -> f64 {
        if !valid_magnitude(capacity) {
            tracing::warn!(?id, capacity, "rejected derived capacity");
            return 0.0;
        }
        let Some(entry) = self.entries.get_mut(id.index()) else {
            return 0.0;
        };
        entry.capacity = capacity;
        let lost = (entry.amount - capacity).max(0.0);
        entry.amount = entry.amount.min(capacity);
        lost
    }

    /// Raise or lower capacity by `delta`, never below the declared base
    ///
    /// Returns the amount lost to clamping.
    pub fn add_capacity(&mut self, id: ResourceId, delta: f64) -> f64 {
        if !delta.is_finite() {
            return 0.0;
        }
        let base = self.base_capacity.get(id.index()).copied().unwrap_or(0.0);
        let Some(entry) = self.entries.get_mut(id.index()) else {
            return 0.0;
        };
        entry.capacity = (entry.capacity + delta).max(base);
        let lost = (entry.amount - entry.capacity).max(0.0);
        entry.amount = entry.amount.min(entry.capacity);
        lost
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Plain-data copy of every entry in declaration order
    pub fn snapshot(&self) -> Vec<ResourceEntry> {
        self.entries.clone()
    }
}
