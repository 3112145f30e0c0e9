//! TargetRecognition — взвешенная confidence по FOV + LOS + свету
//!
//! confidence = w_fov·[in_fov] + w_los·[visible] + w_light·light·[light ≥ min_illumination]
//!
//! Гистерезис: recognized при confidence ≥ threshold, lost при
//! confidence < threshold − loss_margin. Между порогами состояние не меняется.
//!
//! Два набора settings:
//! - base — как сконфигурировано (после нормализации)
//! - effective — после PerceptionModifier (всегда выводится из base)

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::events::VisionEvent;
use crate::logger;

const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecognitionWeights {
    pub fov: f32,
    pub los: f32,
    pub light: f32,
}

impl Default for RecognitionWeights {
    fn default() -> Self {
        Self {
            fov: 0.3,
            los: 0.5,
            light: 0.2,
        }
    }
}

impl RecognitionWeights {
    pub fn new(fov: f32, los: f32, light: f32) -> Self {
        Self { fov, los, light }
    }

    pub fn sum(&self) -> f32 {
        self.fov + self.los + self.light
    }

    /// Веса с суммой 1.0; `None` если вектор вырожденный (все ≤ 0)
    pub fn normalized(&self) -> Option<Self> {
        let fov = self.fov.max(0.0);
        let los = self.los.max(0.0);
        let light = self.light.max(0.0);
        let sum = fov + los + light;
        if sum <= f32::EPSILON {
            return None;
        }
        Some(Self {
            fov: fov / sum,
            los: los / sum,
            light: light / sum,
        })
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
    }

    /// Нормализация с логированием коррекции; вырожденный вектор → defaults
    pub fn corrected(&self, context: &str) -> Self {
        match self.normalized() {
            Some(normalized) => {
                if !self.is_normalized() {
                    logger::log_warning(&format!(
                        "{}: recognition weights sum to {:.3}, normalized to fov={:.3} los={:.3} light={:.3}",
                        context,
                        self.sum(),
                        normalized.fov,
                        normalized.los,
                        normalized.light
                    ));
                }
                normalized
            }
            None => {
                logger::log_warning(&format!(
                    "{}: degenerate recognition weights {:?}, falling back to defaults",
                    context, self
                ));
                Self::default()
            }
        }
    }
}

/// Веса + порог распознавания (то, что переписывает PerceptionModifier)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecognitionSettings {
    pub weights: RecognitionWeights,
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// Период пересчёта confidence (секунды)
    pub update_interval: f64,
    pub weights: RecognitionWeights,
    pub recognition_threshold: f32,
    /// lost порог = threshold − loss_margin
    pub loss_margin: f32,
    /// Жёсткий пол: ниже — вклад света 0
    pub min_illumination: f32,
    /// Максимум одновременно отслеживаемых целей
    pub max_tracked: usize,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            update_interval: 0.2,
            weights: RecognitionWeights::default(),
            recognition_threshold: 0.7,
            loss_margin: 0.1,
            min_illumination: 0.3,
            max_tracked: 32,
        }
    }
}

/// Входные факторы одной цели на update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetObservation {
    pub entity: Entity,
    pub position: Vec3,
    pub in_fov: bool,
    pub visible: bool,
    pub light_level: f32,
}

/// Отслеживаемая цель
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerceivedTarget {
    pub entity: Entity,
    pub position: Vec3,
    pub in_fov: bool,
    pub visible: bool,
    pub illuminated: bool,
    pub light_level: f32,
    pub confidence: f32,
    pub recognized: bool,
    pub last_observed: f64,
}

#[derive(Debug, Clone)]
pub struct TargetRecognition {
    config: RecognitionConfig,
    base: RecognitionSettings,
    effective: RecognitionSettings,
    los_enabled: bool,
    light_enabled: bool,
    targets: HashMap<Entity, PerceivedTarget>,
    last_update: Option<f64>,
}

impl TargetRecognition {
    /// `los_enabled` / `light_enabled` = есть ли соответствующий sub-component.
    /// Отсутствующий фактор даёт 0, его вес НЕ перераспределяется.
    pub fn new(config: RecognitionConfig, los_enabled: bool, light_enabled: bool) -> Self {
        let weights = config.weights.corrected("TargetRecognition");
        let base = RecognitionSettings {
            weights,
            threshold: config.recognition_threshold.max(0.0),
        };

        if !los_enabled {
            logger::log_warning(&format!(
                "TargetRecognition: no RaycastVisibility, LOS factor disabled (weight {:.2} unused)",
                weights.los
            ));
        }
        if !light_enabled {
            logger::log_warning(&format!(
                "TargetRecognition: no IlluminationSampler, light factor disabled (weight {:.2} unused)",
                weights.light
            ));
        }

        Self {
            config,
            base,
            effective: base,
            los_enabled,
            light_enabled,
            targets: HashMap::new(),
            last_update: None,
        }
    }

    pub fn config(&self) -> &RecognitionConfig {
        &self.config
    }

    pub fn base_settings(&self) -> RecognitionSettings {
        self.base
    }

    pub fn effective_settings(&self) -> RecognitionSettings {
        self.effective
    }

    pub fn los_enabled(&self) -> bool {
        self.los_enabled
    }

    pub fn light_enabled(&self) -> bool {
        self.light_enabled
    }

    /// Новые базовые веса (нормализуются); effective сбрасывается на base
    pub fn set_weights(&mut self, weights: RecognitionWeights) {
        self.base.weights = weights.corrected("TargetRecognition::set_weights");
        self.effective = self.base;
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.base.threshold = threshold.max(0.0);
        self.effective = self.base;
    }

    /// Применить settings от PerceptionModifier
    pub fn apply_settings(&mut self, settings: RecognitionSettings) {
        self.effective = RecognitionSettings {
            weights: settings
                .weights
                .normalized()
                .unwrap_or(self.base.weights),
            threshold: settings.threshold.max(0.0),
        };
    }

    pub fn loss_threshold(&self) -> f32 {
        (self.effective.threshold - self.config.loss_margin).max(0.0)
    }

    /// Чистая функция confidence для текущих effective settings
    pub fn confidence(&self, in_fov: bool, visible: bool, light_level: f32) -> f32 {
        let weights = self.effective.weights;
        let light_level = light_level.clamp(0.0, 1.0);

        let mut confidence = 0.0;
        if in_fov {
            confidence += weights.fov;
        }
        if visible && self.los_enabled {
            confidence += weights.los;
        }
        if self.light_enabled && light_level >= self.config.min_illumination {
            confidence += weights.light * light_level;
        }
        confidence.clamp(0.0, 1.0)
    }

    pub fn is_due(&self, now: f64) -> bool {
        self.last_update
            .map_or(true, |last| now - last >= self.config.update_interval)
    }

    /// Пересчитать confidence всех наблюдений, вернуть события переходов.
    ///
    /// `observations` — все кандидаты, которые ещё существуют в мире.
    /// Отслеживаемая цель без наблюдения считается исчезнувшей.
    pub fn update(&mut self, now: f64, observations: &[TargetObservation]) -> Vec<VisionEvent> {
        self.last_update = Some(now);
        let mut events = Vec::new();

        let observed: HashSet<Entity> = observations.iter().map(|o| o.entity).collect();
        let mut gone: Vec<Entity> = self
            .targets
            .keys()
            .filter(|e| !observed.contains(e))
            .copied()
            .collect();
        gone.sort();
        for entity in gone {
            if let Some(target) = self.targets.remove(&entity) {
                if target.recognized {
                    events.push(VisionEvent::TargetLost { target: entity });
                }
            }
        }

        let threshold = self.effective.threshold;
        let loss_threshold = self.loss_threshold();

        for observation in observations {
            let confidence = self.confidence(observation.in_fov, observation.visible, observation.light_level);
            let illuminated = self.light_enabled && observation.light_level >= self.config.min_illumination;

            let target = self
                .targets
                .entry(observation.entity)
                .or_insert(PerceivedTarget {
                    entity: observation.entity,
                    position: observation.position,
                    in_fov: false,
                    visible: false,
                    illuminated: false,
                    light_level: 0.0,
                    confidence: 0.0,
                    recognized: false,
                    last_observed: now,
                });

            target.position = observation.position;
            target.in_fov = observation.in_fov;
            target.visible = observation.visible && self.los_enabled;
            target.illuminated = illuminated;
            target.light_level = observation.light_level.clamp(0.0, 1.0);
            target.confidence = confidence;
            target.last_observed = now;

            if !target.recognized && confidence >= threshold {
                target.recognized = true;
                events.push(VisionEvent::TargetRecognized {
                    target: observation.entity,
                    confidence,
                });
            } else if target.recognized && confidence < loss_threshold {
                target.recognized = false;
                events.push(VisionEvent::TargetLost {
                    target: observation.entity,
                });
            }

            if !target.recognized && (target.in_fov || target.visible) {
                events.push(VisionEvent::TargetPartiallyDetected {
                    target: observation.entity,
                    confidence,
                });
            }
        }

        // Нераспознанные цели вне FOV больше не отслеживаем
        self.targets.retain(|_, t| t.recognized || t.in_fov);

        self.enforce_capacity();
        events
    }

    fn enforce_capacity(&mut self) {
        while self.targets.len() > self.config.max_tracked {
            let weakest = self
                .targets
                .values()
                .filter(|t| !t.recognized)
                .min_by(|a, b| a.confidence.total_cmp(&b.confidence).then(a.entity.cmp(&b.entity)))
                .map(|t| t.entity);

            match weakest {
                Some(entity) => {
                    self.targets.remove(&entity);
                }
                None => break,
            }
        }
    }

    /// Сбросить всё (без событий — вызывающий сам решает, что эмитить)
    pub fn clear(&mut self) -> Vec<Entity> {
        let mut recognized: Vec<Entity> = self.recognized_targets().map(|t| t.entity).collect();
        recognized.sort();
        self.targets.clear();
        recognized
    }

    pub fn target(&self, entity: Entity) -> Option<&PerceivedTarget> {
        self.targets.get(&entity)
    }

    pub fn is_recognized(&self, entity: Entity) -> bool {
        self.targets.get(&entity).is_some_and(|t| t.recognized)
    }

    pub fn tracked_targets(&self) -> impl Iterator<Item = &PerceivedTarget> {
        self.targets.values()
    }

    pub fn recognized_targets(&self) -> impl Iterator<Item = &PerceivedTarget> {
        self.targets.values().filter(|t| t.recognized)
    }
}
