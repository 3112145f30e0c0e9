//! Blackboard — общее хранилище фактов одного NPC
//!
//! Две половины с разными правами записи:
//! - `facts` — восприятие и движение; пишет ТОЛЬКО Brain, один раз за
//!   decision tick (`refresh`), AI states читают
//! - `notes` — намерения и рабочие данные: points of interest, patrol,
//!   known locations, scratch key-value; states читают и пишут

use bevy::prelude::*;
use std::collections::HashMap;

use super::known_locations::{KnownLocations, KnownLocationsConfig};
use crate::vision::VisionStateKind;

/// POI ближе этого к существующему непосещённому — сливаются
const POI_MERGE_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTargetFact {
    pub entity: Entity,
    pub position: Vec3,
    pub velocity: Vec3,
    pub confidence: f32,
    pub threat_level: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RememberedTargetFact {
    pub entity: Entity,
    /// Воспринимаемая позиция (с шумом текущего VisionState)
    pub position: Vec3,
    pub confidence: f32,
    pub last_seen: f64,
}

/// Снимок восприятия/движения на decision tick
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlackboardFacts {
    pub position: Vec3,
    pub velocity: Vec3,
    pub facing: Vec3,
    /// Самые уверенные первыми
    pub visible_targets: Vec<VisibleTargetFact>,
    /// Сильнейшие воспоминания первыми (только невидимые сейчас)
    pub remembered_targets: Vec<RememberedTargetFact>,
    pub is_moving: bool,
    pub has_arrived: bool,
    pub is_path_blocked: bool,
    /// Самая уверенная видимая цель
    pub current_target: Option<Entity>,
    pub vision_state: VisionStateKind,
    pub updated_at: f64,
}

impl BlackboardFacts {
    pub fn visible(&self, entity: Entity) -> Option<&VisibleTargetFact> {
        self.visible_targets.iter().find(|t| t.entity == entity)
    }

    pub fn remembered(&self, entity: Entity) -> Option<&RememberedTargetFact> {
        self.remembered_targets.iter().find(|t| t.entity == entity)
    }

    pub fn has_visible_targets(&self) -> bool {
        !self.visible_targets.is_empty()
    }

    pub fn strongest_visible(&self) -> Option<&VisibleTargetFact> {
        self.visible_targets.first()
    }

    pub fn nearest_visible(&self) -> Option<&VisibleTargetFact> {
        self.visible_targets.iter().min_by(|a, b| {
            a.position
                .distance(self.position)
                .total_cmp(&b.position.distance(self.position))
        })
    }

    pub fn nearest_remembered(&self) -> Option<&RememberedTargetFact> {
        self.remembered_targets.iter().min_by(|a, b| {
            a.position
                .distance(self.position)
                .total_cmp(&b.position.distance(self.position))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiSource {
    /// Добавлен gameplay кодом / скриптом
    Manual,
    /// Последняя известная позиция потерянной цели
    LostTarget(Entity),
    /// Позиция из затухающей памяти
    Memory(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointOfInterest {
    pub id: u32,
    pub position: Vec3,
    pub priority: f32,
    pub visited: bool,
    pub created_at: f64,
    pub source: PoiSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlackboardValue {
    Bool(bool),
    Float(f32),
    Int(i64),
    Vec3(Vec3),
    Entity(Entity),
    Text(String),
}

#[derive(Debug, Clone, Default)]
pub struct BlackboardNotes {
    points_of_interest: Vec<PointOfInterest>,
    next_poi_id: u32,
    patrol_points: Vec<Vec3>,
    pub patrol_index: usize,
    pub patrol_forward: bool,
    pub known_locations: KnownLocations,
    scratch: HashMap<String, BlackboardValue>,
}

impl BlackboardNotes {
    pub fn new(locations: KnownLocationsConfig) -> Self {
        Self {
            patrol_forward: true,
            known_locations: KnownLocations::new(locations),
            ..Default::default()
        }
    }

    // --- Points of interest ----------------------------------------------

    /// Добавить POI; рядом с непосещённым — поднимает его приоритет
    pub fn add_point_of_interest(&mut self, position: Vec3, priority: f32, source: PoiSource, now: f64) -> u32 {
        if let Some(existing) = self
            .points_of_interest
            .iter_mut()
            .find(|p| !p.visited && p.position.distance(position) <= POI_MERGE_DISTANCE)
        {
            existing.priority = existing.priority.max(priority);
            existing.position = position;
            return existing.id;
        }

        let id = self.next_poi_id;
        self.next_poi_id += 1;
        self.points_of_interest.push(PointOfInterest {
            id,
            position,
            priority,
            visited: false,
            created_at: now,
            source,
        });
        id
    }

    /// Непосещённый POI с наибольшим приоритетом (при равенстве — старейший)
    pub fn best_point_of_interest(&self) -> Option<&PointOfInterest> {
        self.points_of_interest
            .iter()
            .filter(|p| !p.visited)
            .max_by(|a, b| a.priority.total_cmp(&b.priority).then(b.id.cmp(&a.id)))
    }

    pub fn point_of_interest(&self, id: u32) -> Option<&PointOfInterest> {
        self.points_of_interest.iter().find(|p| p.id == id)
    }

    pub fn mark_visited(&mut self, id: u32) -> bool {
        match self.points_of_interest.iter_mut().find(|p| p.id == id) {
            Some(poi) => {
                poi.visited = true;
                true
            }
            None => false,
        }
    }

    pub fn prune_visited(&mut self) {
        self.points_of_interest.retain(|p| !p.visited);
    }

    pub fn points_of_interest(&self) -> &[PointOfInterest] {
        &self.points_of_interest
    }

    pub fn has_unvisited_points(&self) -> bool {
        self.points_of_interest.iter().any(|p| !p.visited)
    }

    // --- Patrol ----------------------------------------------------------

    pub fn set_patrol_points(&mut self, points: Vec<Vec3>) {
        self.patrol_points = points;
        self.patrol_index = 0;
        self.patrol_forward = true;
    }

    pub fn patrol_points(&self) -> &[Vec3] {
        &self.patrol_points
    }

    pub fn current_patrol_point(&self) -> Option<Vec3> {
        self.patrol_points.get(self.patrol_index).copied()
    }

    // --- Scratch ---------------------------------------------------------

    pub fn set(&mut self, key: impl Into<String>, value: BlackboardValue) {
        self.scratch.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&BlackboardValue> {
        self.scratch.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<BlackboardValue> {
        self.scratch.remove(key)
    }

    pub fn get_float(&self, key: &str) -> Option<f32> {
        match self.scratch.get(key) {
            Some(BlackboardValue::Float(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.scratch.get(key) {
            Some(BlackboardValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_vec3(&self, key: &str) -> Option<Vec3> {
        match self.scratch.get(key) {
            Some(BlackboardValue::Vec3(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_entity(&self, key: &str) -> Option<Entity> {
        match self.scratch.get(key) {
            Some(BlackboardValue::Entity(value)) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Blackboard {
    facts: BlackboardFacts,
    pub notes: BlackboardNotes,
}

impl Blackboard {
    pub fn new(locations: KnownLocationsConfig) -> Self {
        Self {
            facts: BlackboardFacts::default(),
            notes: BlackboardNotes::new(locations),
        }
    }

    pub fn facts(&self) -> &BlackboardFacts {
        &self.facts
    }

    /// Единственная запись фактов за тик (вызывает Brain)
    pub(crate) fn refresh(&mut self, facts: BlackboardFacts) {
        self.facts = facts;
    }

    /// Факты на чтение + заметки на запись (для StateContext)
    pub fn split_mut(&mut self) -> (&BlackboardFacts, &mut BlackboardNotes) {
        (&self.facts, &mut self.notes)
    }
}
