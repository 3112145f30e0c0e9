//! Vision — единый perception API для AI
//!
//! Композиция (constructor injection через VisionBuilder):
//!   FieldOfView → RaycastVisibility? → IlluminationSampler? → TargetRecognition
//!   → VisualMemory, VisionStateMachine → PerceptionModifier → TargetRecognition
//!
//! Порядок одного tick:
//! 1. таймеры VisionState (revert, dark adaptation, blink, healing)
//! 2. ambient свет → переходы по свету
//! 3. PerceptionModifier → effective weights/threshold
//! 4. (по recognition.update_interval) FOV → LOS → свет → confidence → память
//! 5. (по memory.update_interval) decay pass

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::events::VisionEvent;
use super::field_of_view::{FieldOfView, FieldOfViewConfig};
use super::illumination::{IlluminationConfig, IlluminationSampler};
use super::memory::{Memory, VisualMemory, VisualMemoryConfig};
use super::modifier::{ImpairmentInputs, PerceptionModifier};
use super::raycast::{RaycastVisibility, RaycastVisibilityConfig};
use super::recognition::{RecognitionConfig, RecognitionWeights, TargetObservation, TargetRecognition};
use super::state::{VisionStateConfig, VisionStateKind, VisionStateMachine};
use crate::events::EventQueue;
use crate::world::{LightService, PhysicsQuery, TargetInfo, TargetSnapshot};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisionConfig {
    pub field_of_view: FieldOfViewConfig,
    pub raycast: RaycastVisibilityConfig,
    pub illumination: IlluminationConfig,
    pub recognition: RecognitionConfig,
    pub memory: VisualMemoryConfig,
    pub state: VisionStateConfig,
}

/// Распознанная цель (для Blackboard)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleTarget {
    pub entity: Entity,
    pub position: Vec3,
    pub confidence: f32,
}

pub struct VisionBuilder {
    config: VisionConfig,
    with_raycast: bool,
    with_illumination: bool,
    seed: u64,
}

impl VisionBuilder {
    pub fn new(config: VisionConfig) -> Self {
        Self {
            config,
            with_raycast: true,
            with_illumination: true,
            seed: 0,
        }
    }

    pub fn without_raycast(mut self) -> Self {
        self.with_raycast = false;
        self
    }

    pub fn without_illumination(mut self) -> Self {
        self.with_illumination = false;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> Vision {
        let config = self.config;
        let raycast = self
            .with_raycast
            .then(|| RaycastVisibility::new(config.raycast.clone()));
        let illumination = self
            .with_illumination
            .then(|| IlluminationSampler::new(config.illumination.clone()));

        let mut recognition_config = config.recognition.clone();
        if let Some(sampler) = &illumination {
            // Один источник истины для пола освещённости
            recognition_config.min_illumination = sampler.config().min_illumination;
        }

        Vision {
            field_of_view: FieldOfView::new(config.field_of_view.clone()),
            recognition: TargetRecognition::new(recognition_config, raycast.is_some(), illumination.is_some()),
            raycast,
            illumination,
            memory: VisualMemory::new(config.memory.clone()),
            state: VisionStateMachine::new(config.state.clone(), self.seed),
            modifier: PerceptionModifier::new(),
            events: EventQueue::default(),
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct Vision {
    field_of_view: FieldOfView,
    raycast: Option<RaycastVisibility>,
    illumination: Option<IlluminationSampler>,
    recognition: TargetRecognition,
    memory: VisualMemory,
    state: VisionStateMachine,
    modifier: PerceptionModifier,
    events: EventQueue<VisionEvent>,
}

impl Vision {
    pub fn builder(config: VisionConfig) -> VisionBuilder {
        VisionBuilder::new(config)
    }

    /// Полный стек со всеми факторами
    pub fn new(config: VisionConfig, seed: u64) -> Self {
        VisionBuilder::new(config).seed(seed).build()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn tick(
        &mut self,
        now: f64,
        observer: Entity,
        position: Vec3,
        forward: Vec3,
        targets: &TargetSnapshot,
        physics: &dyn PhysicsQuery,
        light: &mut LightService,
    ) {
        self.state.update(now);

        if let Some(sampler) = self.illumination.as_mut() {
            let ambient = sampler.ambient_level(light, position, now);
            self.state.update_light(ambient, now);
        }

        self.refresh_modifier();
        self.events.extend(self.state.drain_events());

        if self.recognition.is_due(now) {
            self.perceive(now, observer, position, forward, targets, physics, light);
        }

        if self.memory.is_due(now) {
            let decayed = self.memory.decay(now);
            self.events.extend(decayed);
        }
    }

    fn refresh_modifier(&mut self) {
        let inputs = ImpairmentInputs {
            state: self.state.state(),
            eye_damage: self.state.eye_damage(),
            blinking: self.state.is_blinking(),
        };
        if let Some(settings) = self.modifier.refresh(self.recognition.base_settings(), inputs) {
            self.recognition.apply_settings(settings);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn perceive(
        &mut self,
        now: f64,
        observer: Entity,
        position: Vec3,
        forward: Vec3,
        targets: &TargetSnapshot,
        physics: &dyn PhysicsQuery,
        light: &mut LightService,
    ) {
        let blocked = self.state.is_perception_blocked();

        if blocked {
            self.field_of_view.clear();
            if let Some(raycast) = self.raycast.as_mut() {
                raycast.clear();
            }
        } else {
            self.field_of_view.scan(observer, position, forward, targets.iter());
        }

        // Кандидаты: в FOV сейчас + уже отслеживаемые (недавно были в FOV)
        let mut candidates: Vec<&TargetInfo> = targets
            .iter()
            .filter(|t| t.entity != observer)
            .filter(|t| self.field_of_view.contains(t.entity) || self.recognition.target(t.entity).is_some())
            .collect();
        candidates.sort_by_key(|t| t.entity);

        if !blocked {
            if let Some(raycast) = self.raycast.as_mut() {
                // LOS только для целей в конусе
                let in_cone = candidates
                    .iter()
                    .copied()
                    .filter(|t| self.field_of_view.contains(t.entity));
                raycast.refresh(physics, observer, position, in_cone);
            }
        }

        let mut observations = Vec::with_capacity(candidates.len());
        for target in &candidates {
            let (in_fov, visible, light_level) = if blocked {
                (false, false, 0.0)
            } else {
                let in_fov = self.field_of_view.contains(target.entity);
                let visible = in_fov && self.raycast.as_ref().is_some_and(|r| r.is_visible(target.entity));
                let light_level = match self.illumination.as_mut() {
                    Some(sampler) => sampler.light_level(light, target.entity, target.position, now),
                    None => 0.0,
                };
                (in_fov, visible, light_level)
            };
            observations.push(TargetObservation {
                entity: target.entity,
                position: target.position,
                in_fov,
                visible,
                light_level,
            });
        }

        if let Some(sampler) = self.illumination.as_mut() {
            sampler.retain(|entity| targets.contains(entity));
        }

        let recognition_events = self.recognition.update(now, &observations);

        let mut memory_events = Vec::new();
        for event in &recognition_events {
            match event {
                VisionEvent::TargetLost { target } => {
                    let position = targets.get(*target).map(|t| t.position);
                    match position {
                        Some(position) => memory_events.extend(self.memory.remember(*target, position, false, now)),
                        None => self.memory.mark_unseen(*target),
                    }
                }
                VisionEvent::TargetPartiallyDetected { target, .. } => {
                    // Пока цель хоть как-то видна, запись не затухает
                    if let Some(info) = targets.get(*target) {
                        if !self.memory.keep_alive(*target, info.position, now) {
                            memory_events.extend(self.memory.remember(*target, info.position, false, now));
                        }
                    }
                }
                _ => {}
            }
        }

        let mut recognized: Vec<(Entity, Vec3)> = self
            .recognition
            .recognized_targets()
            .map(|t| (t.entity, t.position))
            .collect();
        recognized.sort_by_key(|(entity, _)| *entity);
        for (entity, position) in recognized {
            memory_events.extend(self.memory.remember(entity, position, true, now));
        }

        self.events.extend(recognition_events);
        self.events.extend(memory_events);
    }

    // --- Queries ---------------------------------------------------------

    /// Распознанные цели, самые уверенные первыми
    pub fn visible_targets(&self) -> Vec<VisibleTarget> {
        let mut visible: Vec<VisibleTarget> = self
            .recognition
            .recognized_targets()
            .map(|t| VisibleTarget {
                entity: t.entity,
                position: t.position,
                confidence: t.confidence,
            })
            .collect();
        visible.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then(a.entity.cmp(&b.entity)));
        visible
    }

    pub fn remembered_targets(&self) -> Vec<&Memory> {
        self.memory.memories()
    }

    pub fn is_target_visible(&self, entity: Entity) -> bool {
        self.recognition.is_recognized(entity)
    }

    pub fn target_confidence(&self, entity: Entity) -> f32 {
        self.recognition.target(entity).map_or(0.0, |t| t.confidence)
    }

    /// Где NPC "думает", что цель: точно если видит, иначе память + шум состояния
    pub fn perceived_position(&self, entity: Entity, rng: &mut impl Rng) -> Option<Vec3> {
        if let Some(target) = self.recognition.target(entity).filter(|t| t.recognized) {
            return Some(target.position);
        }
        self.memory
            .jittered_position(entity, self.state.position_uncertainty(), rng)
    }

    pub fn vision_state(&self) -> VisionStateKind {
        self.state.state()
    }

    pub fn position_uncertainty(&self) -> f32 {
        self.state.position_uncertainty()
    }

    pub fn eye_damage(&self) -> f32 {
        self.state.eye_damage()
    }

    pub fn is_blind(&self) -> bool {
        self.state.is_perception_blocked()
    }

    pub fn impairment_factor(&self) -> f32 {
        self.modifier.impairment_factor()
    }

    pub fn recognition(&self) -> &TargetRecognition {
        &self.recognition
    }

    pub fn memory(&self) -> &VisualMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut VisualMemory {
        &mut self.memory
    }

    pub fn state_machine(&self) -> &VisionStateMachine {
        &self.state
    }

    pub fn field_of_view(&self) -> &FieldOfView {
        &self.field_of_view
    }

    // --- Actions ---------------------------------------------------------

    pub fn apply_eye_damage(&mut self, amount: f32, now: f64) {
        self.state.apply_eye_damage(amount, now);
        self.refresh_modifier();
        self.events.extend(self.state.drain_events());
    }

    pub fn heal_eyes(&mut self, amount: f32, now: f64) {
        self.state.heal_eyes(amount, now);
        self.refresh_modifier();
        self.events.extend(self.state.drain_events());
    }

    pub fn set_obscured(&mut self, obscured: bool, now: f64) {
        self.state.set_obscured(obscured, now);
        self.refresh_modifier();
        self.events.extend(self.state.drain_events());
    }

    pub fn set_vision_state(&mut self, state: VisionStateKind, now: f64) {
        self.state.set_state(state, now);
        self.refresh_modifier();
        self.events.extend(self.state.drain_events());
    }

    /// Новые базовые веса; текущие нарушения накладываются заново
    pub fn set_recognition_weights(&mut self, weights: RecognitionWeights) {
        self.recognition.set_weights(weights);
        self.modifier.invalidate();
        self.refresh_modifier();
    }

    pub fn set_recognition_threshold(&mut self, threshold: f32) {
        self.recognition.set_threshold(threshold);
        self.modifier.invalidate();
        self.refresh_modifier();
    }

    /// Сбросить восприятие и память (телепорт, респавн)
    pub fn forget_all(&mut self) {
        for target in self.recognition.clear() {
            self.events.push(VisionEvent::TargetLost { target });
        }
        let forgotten = self.memory.clear();
        self.events.extend(forgotten);
        self.field_of_view.clear();
        if let Some(raycast) = self.raycast.as_mut() {
            raycast.clear();
        }
    }

    pub fn drain_events(&mut self) -> Vec<VisionEvent> {
        self.events.drain()
    }
}
