//! Brain — decision loop одного NPC (Bevy component)
//!
//! Один decision tick (раз в `decision_interval`):
//! 1. Vision.tick
//! 2. ОДИН refresh фактов Blackboard
//! 3. события Vision/Motrix → callbacks states + POI (потерянная цель)
//! 4. угроза выше `flee_threat_level` → запрос Flee (interrupt по приоритету)
//! 5. внешние запросы state, затем AIStateManager.update
//!
//! Всё, что NPC "сказал" за тик, копится в outbox (`drain_events`).

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::blackboard::{Blackboard, BlackboardFacts, PoiSource, RememberedTargetFact, VisibleTargetFact};
use super::context::StateContext;
use super::events::{BrainEvent, CognitionEvent};
use super::known_locations::{KnownLocationsConfig, LocationCategory};
use super::manager::{AIStateManager, AIStateManagerConfig};
use super::states::{StateKind, StatesConfig};
use crate::events::EventQueue;
use crate::logger;
use crate::motrix::{Motrix, MotrixEvent};
use crate::vision::{Vision, VisionEvent};
use crate::world::{LightService, PhysicsQuery, TargetSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainConfig {
    /// Секунды между decision ticks
    pub decision_interval: f64,
    /// Видимая цель с threat_level ≥ этого → Flee
    pub flee_threat_level: f32,
    pub poi_from_lost_targets: bool,
    pub lost_target_poi_priority: f32,
    /// Затухающая память → ещё один POI (ниже приоритетом)
    pub poi_from_fading_memories: bool,
    pub fading_memory_poi_priority: f32,
    pub manager: AIStateManagerConfig,
    pub states: StatesConfig,
    pub known_locations: KnownLocationsConfig,
}

impl Default for BrainConfig {
    fn default() -> Self {
        Self {
            decision_interval: 0.2,
            flee_threat_level: 0.75,
            poi_from_lost_targets: true,
            lost_target_poi_priority: 5.0,
            poi_from_fading_memories: true,
            fading_memory_poi_priority: 2.0,
            manager: AIStateManagerConfig::default(),
            states: StatesConfig::default(),
            known_locations: KnownLocationsConfig::default(),
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct Brain {
    config: BrainConfig,
    manager: AIStateManager,
    blackboard: Blackboard,
    rng: ChaCha8Rng,
    next_decision_at: f64,
    pending_request: Option<String>,
    events: EventQueue<CognitionEvent>,
}

impl Brain {
    pub fn new(config: BrainConfig, seed: u64) -> Self {
        let mut config = config;
        if config.decision_interval < 0.0 {
            logger::log_warning("🧠 Brain: negative decision_interval clamped to 0");
            config.decision_interval = 0.0;
        }

        Self {
            manager: AIStateManager::new(config.manager.clone(), &config.states),
            blackboard: Blackboard::new(config.known_locations.clone()),
            rng: ChaCha8Rng::seed_from_u64(seed),
            next_decision_at: 0.0,
            pending_request: None,
            events: EventQueue::default(),
            config,
        }
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    /// Decision tick. false — ещё рано (decision_interval не прошёл).
    #[allow(clippy::too_many_arguments)]
    pub fn decision_tick(
        &mut self,
        now: f64,
        self_entity: Entity,
        position: Vec3,
        velocity: Vec3,
        vision: &mut Vision,
        motrix: &mut Motrix,
        targets: &TargetSnapshot,
        physics: &dyn PhysicsQuery,
        light: &mut LightService,
    ) -> bool {
        if now < self.next_decision_at {
            return false;
        }
        self.next_decision_at = now + self.config.decision_interval;

        vision.tick(now, self_entity, position, motrix.facing(), targets, physics, light);

        let facts = self.collect_facts(now, position, velocity, vision, motrix, targets);
        self.blackboard.refresh(facts);

        let vision_events = vision.drain_events();
        let motrix_events = motrix.drain_events();

        let (facts, notes) = self.blackboard.split_mut();
        let mut ctx = StateContext {
            now,
            self_entity,
            facts,
            notes,
            motrix,
            vision,
            physics,
            rng: &mut self.rng,
        };

        for event in &vision_events {
            match event {
                VisionEvent::TargetLost { target } => {
                    if self.config.poi_from_lost_targets {
                        let last_known = ctx
                            .vision
                            .memory()
                            .last_known_position(*target)
                            .or_else(|| ctx.facts.remembered(*target).map(|m| m.position));
                        if let Some(position) = last_known {
                            let priority = self.config.lost_target_poi_priority;
                            let id = ctx
                                .notes
                                .add_point_of_interest(position, priority, PoiSource::LostTarget(*target), now);
                            self.events
                                .push(BrainEvent::PointOfInterestAdded { id, position, priority }.into());
                        }
                    }
                    self.manager.on_target_lost(&mut ctx, *target);
                }
                VisionEvent::MemoryDeteriorated { target, .. } if self.config.poi_from_fading_memories => {
                    if let Some(position) = ctx.vision.memory().last_known_position(*target) {
                        let priority = self.config.fading_memory_poi_priority;
                        let id = ctx
                            .notes
                            .add_point_of_interest(position, priority, PoiSource::Memory(*target), now);
                        self.events
                            .push(BrainEvent::PointOfInterestAdded { id, position, priority }.into());
                    }
                }
                _ => {}
            }
        }

        for event in &motrix_events {
            match event {
                MotrixEvent::DestinationReached { .. } => self.manager.on_destination_reached(&mut ctx),
                MotrixEvent::ObstacleEncountered { position, .. } => {
                    self.manager.on_obstacle_encountered(&mut ctx, *position)
                }
                _ => {}
            }
        }

        let threat = ctx
            .facts
            .visible_targets
            .iter()
            .filter(|t| t.threat_level >= self.config.flee_threat_level)
            .max_by(|a, b| a.threat_level.total_cmp(&b.threat_level).then(b.entity.cmp(&a.entity)))
            .copied();
        if let Some(threat) = threat {
            if self.manager.current_state() != Some(StateKind::Flee) {
                self.events.push(
                    BrainEvent::ThreatDetected {
                        threat: threat.entity,
                        threat_level: threat.threat_level,
                    }
                    .into(),
                );
                self.pending_request = Some(StateKind::Flee.name().to_string());
            }
        }

        if let Some(name) = self.pending_request.take() {
            if let Err(error) = self.manager.set_state(&name, &mut ctx) {
                logger::log_warning(&format!("🧠 {:?}: state request '{}' rejected: {}", self_entity, name, error));
            }
        }

        self.manager.update(&mut ctx);

        // Команды этого тика могли породить события (MotionStateChanged)
        let motrix_events_after = ctx.motrix.drain_events();

        self.events.extend(vision_events.into_iter().map(CognitionEvent::from));
        self.events.extend(motrix_events.into_iter().map(CognitionEvent::from));
        self.events.extend(motrix_events_after.into_iter().map(CognitionEvent::from));
        self.events.extend(self.manager.drain_events().into_iter().map(CognitionEvent::from));
        true
    }

    fn collect_facts(
        &mut self,
        now: f64,
        position: Vec3,
        velocity: Vec3,
        vision: &Vision,
        motrix: &Motrix,
        targets: &TargetSnapshot,
    ) -> BlackboardFacts {
        let visible_targets: Vec<VisibleTargetFact> = vision
            .visible_targets()
            .into_iter()
            .map(|target| {
                let info = targets.get(target.entity);
                VisibleTargetFact {
                    entity: target.entity,
                    position: target.position,
                    velocity: info.map_or(Vec3::ZERO, |i| i.velocity),
                    confidence: target.confidence,
                    threat_level: info.map_or(0.0, |i| i.threat_level),
                }
            })
            .collect();

        let remembered: Vec<(Entity, Vec3, f32, f64)> = vision
            .remembered_targets()
            .into_iter()
            .filter(|memory| !vision.is_target_visible(memory.target))
            .map(|memory| (memory.target, memory.position, memory.confidence, memory.last_seen_time))
            .collect();
        let remembered_targets = remembered
            .into_iter()
            .map(|(entity, stored, confidence, last_seen)| RememberedTargetFact {
                entity,
                position: vision.perceived_position(entity, &mut self.rng).unwrap_or(stored),
                confidence,
                last_seen,
            })
            .collect();

        BlackboardFacts {
            position,
            velocity,
            facing: motrix.facing(),
            current_target: visible_targets.first().map(|t| t.entity),
            visible_targets,
            remembered_targets,
            is_moving: motrix.is_moving(),
            has_arrived: motrix.has_arrived(),
            is_path_blocked: motrix.is_path_blocked(),
            vision_state: vision.vision_state(),
            updated_at: now,
        }
    }

    // --- Helpers ---------------------------------------------------------

    pub fn add_point_of_interest(&mut self, position: Vec3, priority: f32, now: f64) -> u32 {
        let id = self
            .blackboard
            .notes
            .add_point_of_interest(position, priority, PoiSource::Manual, now);
        self.events
            .push(BrainEvent::PointOfInterestAdded { id, position, priority }.into());
        id
    }

    pub fn add_known_location(
        &mut self,
        name: impl Into<String>,
        position: Vec3,
        category: LocationCategory,
        priority: f32,
        now: f64,
    ) -> String {
        self.blackboard
            .notes
            .known_locations
            .add(name, position, category, priority, now, HashMap::new())
    }

    pub fn set_patrol_points(&mut self, points: Vec<Vec3>) {
        self.blackboard.notes.set_patrol_points(points);
    }

    /// Запрос state по имени, применяется на следующем decision tick
    pub fn request_state(&mut self, name: impl Into<String>) {
        self.pending_request = Some(name.into());
    }

    pub fn current_state(&self) -> Option<StateKind> {
        self.manager.current_state()
    }

    pub fn manager(&self) -> &AIStateManager {
        &self.manager
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    pub fn drain_events(&mut self) -> Vec<CognitionEvent> {
        self.events.drain()
    }
}
