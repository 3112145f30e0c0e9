//! KnownLocations — именованные места, которые NPC знает
//!
//! Категории: Navigation (ориентиры), Interest, Danger, Resource, Shelter
//! (Flee ищет укрытия здесь). Близкие места одной категории сливаются
//! (`merge_distance`), переполнение вытесняет наименее приоритетное.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum LocationCategory {
    Navigation,
    Interest,
    Danger,
    Resource,
    Shelter,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KnownLocation {
    pub name: String,
    pub position: Vec3,
    pub category: LocationCategory,
    pub priority: f32,
    pub created_at: f64,
    pub updated_at: f64,
    pub visited_at: Option<f64>,
    pub visit_count: u32,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnownLocationsConfig {
    pub max_locations: usize,
    pub merge_distance: f32,
}

impl Default for KnownLocationsConfig {
    fn default() -> Self {
        Self {
            max_locations: 50,
            merge_distance: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KnownLocations {
    config: KnownLocationsConfig,
    // BTreeMap: детерминированный порядок итерации
    locations: BTreeMap<String, KnownLocation>,
}

impl KnownLocations {
    pub fn new(config: KnownLocationsConfig) -> Self {
        Self {
            config,
            locations: BTreeMap::new(),
        }
    }

    /// Добавить/обновить место; возвращает ключ, под которым оно хранится
    pub fn add(
        &mut self,
        name: impl Into<String>,
        position: Vec3,
        category: LocationCategory,
        priority: f32,
        now: f64,
        metadata: HashMap<String, String>,
    ) -> String {
        let name = name.into();

        let merge_key = if self.locations.contains_key(&name) {
            Some(name.clone())
        } else {
            self.locations
                .values()
                .filter(|l| l.category == category && l.position.distance(position) <= self.config.merge_distance)
                .min_by(|a, b| {
                    a.position
                        .distance(position)
                        .total_cmp(&b.position.distance(position))
                })
                .map(|l| l.name.clone())
        };

        if let Some(key) = merge_key {
            if let Some(location) = self.locations.get_mut(&key) {
                location.position = position;
                location.category = category;
                location.priority = location.priority.max(priority);
                location.updated_at = now;
                location.metadata.extend(metadata);
                return key;
            }
        }

        if self.locations.len() >= self.config.max_locations {
            self.evict_lowest_priority();
        }

        self.locations.insert(
            name.clone(),
            KnownLocation {
                name: name.clone(),
                position,
                category,
                priority,
                created_at: now,
                updated_at: now,
                visited_at: None,
                visit_count: 0,
                metadata,
            },
        );
        name
    }

    fn evict_lowest_priority(&mut self) {
        let victim = self
            .locations
            .values()
            .min_by(|a, b| {
                a.priority
                    .total_cmp(&b.priority)
                    .then(a.updated_at.total_cmp(&b.updated_at))
            })
            .map(|l| l.name.clone());

        if let Some(victim) = victim {
            logger::log(&format!("🗺️ KnownLocations: full, evicting '{}'", victim));
            self.locations.remove(&victim);
        }
    }

    pub fn get(&self, name: &str) -> Option<&KnownLocation> {
        self.locations.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<KnownLocation> {
        self.locations.remove(name)
    }

    pub fn mark_visited(&mut self, name: &str, now: f64) -> bool {
        match self.locations.get_mut(name) {
            Some(location) => {
                location.visited_at = Some(now);
                location.visit_count += 1;
                true
            }
            None => false,
        }
    }

    /// Ближайшее место (опционально одной категории)
    pub fn nearest(&self, position: Vec3, category: Option<LocationCategory>) -> Option<&KnownLocation> {
        self.locations
            .values()
            .filter(|l| category.map_or(true, |c| l.category == c))
            .min_by(|a, b| {
                a.position
                    .distance(position)
                    .total_cmp(&b.position.distance(position))
            })
    }

    pub fn by_category(&self, category: LocationCategory) -> Vec<&KnownLocation> {
        self.locations.values().filter(|l| l.category == category).collect()
    }

    /// Места категории в радиусе
    pub fn within(&self, position: Vec3, radius: f32, category: LocationCategory) -> Vec<&KnownLocation> {
        self.locations
            .values()
            .filter(|l| l.category == category && l.position.distance(position) <= radius)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnownLocation> {
        self.locations.values()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
