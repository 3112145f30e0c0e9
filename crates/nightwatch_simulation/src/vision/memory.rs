//! VisualMemory — цели, которые NPC видел, но уже не воспринимает
//!
//! Жизненный цикл записи:
//! 1. remember(visible=true) → confidence = initial, last_seen = now
//! 2. remember(visible=false) → только visible=false, confidence/позиция до decay
//! 3. decay pass: confidence = initial·(1 − (elapsed/duration)^curve)
//! 4. < 0.5 → MemoryDeteriorated (один раз); < forget_threshold или
//!    elapsed > duration → TargetForgotten, затем удаление
//!
//! Target хранится как Entity (weak lookup, не владение).

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::events::VisionEvent;

const DETERIORATION_LEVEL: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualMemoryConfig {
    /// Сколько живёт невидимая запись (секунды)
    pub memory_duration: f64,
    /// Показатель кривой затухания (1 = линейно, >1 — медленно в начале)
    pub decay_curve: f32,
    pub initial_memory_confidence: f32,
    pub forget_threshold: f32,
    /// Гистерезис позиции против дрожания (метры)
    pub position_update_threshold: f32,
    /// Период decay pass (секунды)
    pub update_interval: f64,
    pub max_memories: usize,
}

impl Default for VisualMemoryConfig {
    fn default() -> Self {
        Self {
            memory_duration: 10.0,
            decay_curve: 1.5,
            initial_memory_confidence: 1.0,
            forget_threshold: 0.1,
            position_update_threshold: 0.5,
            update_interval: 0.5,
            max_memories: 32,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Memory {
    pub target: Entity,
    pub position: Vec3,
    pub last_seen_time: f64,
    pub confidence: f32,
    pub visible: bool,
    /// Уже эмитили MemoryDeteriorated для текущего "невидимого" периода
    pub deteriorated: bool,
    pub tags: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct VisualMemory {
    config: VisualMemoryConfig,
    memories: HashMap<Entity, Memory>,
    last_decay: Option<f64>,
}

impl VisualMemory {
    pub fn new(mut config: VisualMemoryConfig) -> Self {
        config.initial_memory_confidence = config.initial_memory_confidence.clamp(0.0, 1.0);
        config.memory_duration = config.memory_duration.max(f64::EPSILON);
        config.decay_curve = config.decay_curve.max(f32::EPSILON);
        Self {
            config,
            memories: HashMap::new(),
            last_decay: None,
        }
    }

    pub fn config(&self) -> &VisualMemoryConfig {
        &self.config
    }

    /// Запомнить/обновить цель
    pub fn remember(&mut self, target: Entity, position: Vec3, visible: bool, now: f64) -> Vec<VisionEvent> {
        let mut events = Vec::new();
        let initial = self.config.initial_memory_confidence;
        let threshold = self.config.position_update_threshold;

        if let Some(memory) = self.memories.get_mut(&target) {
            if visible {
                memory.confidence = initial;
                memory.last_seen_time = now;
                memory.deteriorated = false;
                if memory.position.distance(position) > threshold {
                    memory.position = position;
                }
            }
            memory.visible = visible;
            return events;
        }

        if self.memories.len() >= self.config.max_memories {
            events.extend(self.evict_weakest());
        }

        self.memories.insert(
            target,
            Memory {
                target,
                position,
                last_seen_time: now,
                confidence: initial,
                visible,
                deteriorated: false,
                tags: HashMap::new(),
            },
        );
        events.push(VisionEvent::TargetRemembered { target, position });
        events
    }

    /// Цель всё ещё частично видна: затухание стоит на месте.
    /// Confidence не восстанавливается, позиция с гистерезисом.
    pub fn keep_alive(&mut self, target: Entity, position: Vec3, now: f64) -> bool {
        let threshold = self.config.position_update_threshold;
        let Some(memory) = self.memories.get_mut(&target) else {
            return false;
        };
        if !memory.visible {
            memory.last_seen_time = now;
            if memory.position.distance(position) > threshold {
                memory.position = position;
            }
        }
        true
    }

    /// Цель исчезла из мира: запись остаётся, начинает затухать
    pub fn mark_unseen(&mut self, target: Entity) {
        if let Some(memory) = self.memories.get_mut(&target) {
            memory.visible = false;
        }
    }

    pub fn is_due(&self, now: f64) -> bool {
        self.last_decay
            .map_or(true, |last| now - last >= self.config.update_interval)
    }

    /// Decay pass по всем невидимым записям
    pub fn decay(&mut self, now: f64) -> Vec<VisionEvent> {
        self.last_decay = Some(now);
        let mut events = Vec::new();
        let mut forgotten = Vec::new();

        let duration = self.config.memory_duration;
        let initial = self.config.initial_memory_confidence;

        let mut targets: Vec<Entity> = self.memories.keys().copied().collect();
        targets.sort();

        for target in targets {
            let Some(memory) = self.memories.get_mut(&target) else {
                continue;
            };
            if memory.visible {
                continue;
            }

            let elapsed = (now - memory.last_seen_time).max(0.0);
            if elapsed > duration {
                forgotten.push(target);
                continue;
            }

            let decay = ((elapsed / duration) as f32).powf(self.config.decay_curve);
            let decayed = (initial * (1.0 - decay)).clamp(0.0, 1.0);
            // Монотонно не возрастает пока цель не видна
            memory.confidence = memory.confidence.min(decayed);

            if !memory.deteriorated && memory.confidence < DETERIORATION_LEVEL {
                memory.deteriorated = true;
                events.push(VisionEvent::MemoryDeteriorated {
                    target,
                    confidence: memory.confidence,
                });
            }

            if memory.confidence < self.config.forget_threshold {
                forgotten.push(target);
            }
        }

        for target in forgotten {
            events.extend(self.forget(target));
        }
        events
    }

    /// Забыть цель: событие всегда ДО удаления
    pub fn forget(&mut self, target: Entity) -> Option<VisionEvent> {
        if !self.memories.contains_key(&target) {
            return None;
        }
        let event = VisionEvent::TargetForgotten { target };
        self.memories.remove(&target);
        Some(event)
    }

    pub fn clear(&mut self) -> Vec<VisionEvent> {
        let mut targets: Vec<Entity> = self.memories.keys().copied().collect();
        targets.sort();
        targets.into_iter().filter_map(|t| self.forget(t)).collect()
    }

    fn evict_weakest(&mut self) -> Option<VisionEvent> {
        let weakest = self
            .memories
            .values()
            .min_by(|a, b| {
                a.confidence
                    .total_cmp(&b.confidence)
                    .then(a.last_seen_time.total_cmp(&b.last_seen_time))
                    .then(a.target.cmp(&b.target))
            })
            .map(|m| m.target)?;
        self.forget(weakest)
    }

    pub fn get(&self, target: Entity) -> Option<&Memory> {
        self.memories.get(&target)
    }

    pub fn last_known_position(&self, target: Entity) -> Option<Vec3> {
        self.memories.get(&target).map(|m| m.position)
    }

    /// Все записи, сильнейшие первыми
    pub fn memories(&self) -> Vec<&Memory> {
        let mut memories: Vec<&Memory> = self.memories.values().collect();
        memories.sort_by(|a, b| b.confidence.total_cmp(&a.confidence).then(a.target.cmp(&b.target)));
        memories
    }

    pub fn len(&self) -> usize {
        self.memories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memories.is_empty()
    }

    pub fn set_tag(&mut self, target: Entity, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.memories.get_mut(&target) {
            Some(memory) => {
                memory.tags.insert(key.into(), value.into());
                true
            }
            None => false,
        }
    }

    pub fn tag(&self, target: Entity, key: &str) -> Option<&str> {
        self.memories
            .get(&target)
            .and_then(|m| m.tags.get(key))
            .map(String::as_str)
    }

    /// Последняя позиция + равномерный горизонтальный шум радиуса `uncertainty`
    pub fn jittered_position(&self, target: Entity, uncertainty: f32, rng: &mut impl Rng) -> Option<Vec3> {
        let position = self.last_known_position(target)?;
        if uncertainty <= 0.0 {
            return Some(position);
        }
        let angle = rng.gen::<f32>() * std::f32::consts::TAU;
        let radius = uncertainty * rng.gen::<f32>().sqrt();
        Some(position + Vec3::new(angle.cos() * radius, 0.0, angle.sin() * radius))
    }
}
