//! Keyed, insertion-ordered resource store.
//!
//! RULE: A resource ID appears at most once, at all times.
//! Listing order is insertion order (or file order after a load).

use crate::{
    error::{RegistryError, RegistryResult},
    metrics::AggregateMetrics,
    resource::CityResource,
};
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct CityRepository {
    resources: Vec<CityResource>,
    ids: HashSet<String>,
}

impl CityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a repository from a loaded population, keeping its order.
    /// A repeated ID rejects the whole population.
    pub fn from_population(population: Vec<CityResource>) -> RegistryResult<Self> {
        let mut repository = Self::new();
        for resource in population {
            if !repository.ids.insert(resource.id().to_string()) {
                return Err(RegistryError::DuplicateId { id: resource.id().to_string() });
            }
            repository.resources.push(resource);
        }
        Ok(repository)
    }

    /// Append a resource and count it in the aggregate metrics.
    pub fn insert(&mut self, resource: CityResource, metrics: &mut AggregateMetrics) -> RegistryResult<()> {
        if self.ids.contains(resource.id()) {
            return Err(RegistryError::DuplicateId { id: resource.id().to_string() });
        }
        metrics.record_added(&resource);
        self.ids.insert(resource.id().to_string());
        self.resources.push(resource);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn get(&self, id: &str) -> Option<&CityResource> {
        self.resources.iter().find(|r| r.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut CityResource> {
        self.resources.iter_mut().find(|r| r.id() == id)
    }

    pub fn remove(&mut self, id: &str) -> Option<CityResource> {
        let index = self.resources.iter().position(|r| r.id() == id)?;
        self.ids.remove(id);
        Some(self.resources.remove(index))
    }

    /// Independent copy of the population for read-only consumers.
    pub fn list_all(&self) -> Vec<CityResource> {
        self.resources.clone()
    }

    pub fn as_slice(&self) -> &[CityResource] {
        &self.resources
    }

    pub fn iter(&self) -> impl Iterator<Item = &CityResource> {
        self.resources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut CityResource> {
        self.resources.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
