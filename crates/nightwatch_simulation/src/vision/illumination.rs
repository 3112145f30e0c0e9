//! IlluminationSampler — "освещена ли точка и насколько"
//!
//! Поверх общего LightSampleCache держит per-target последний sample:
//! engine light probe eventually-consistent, опрашиваем с poll_interval.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::world::LightService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IlluminationConfig {
    /// Ниже этого уровня цель считается неосвещённой
    pub min_illumination: f32,
    /// Период опроса одной цели (секунды)
    pub poll_interval: f64,
    /// Высота точки sampling над pivot (центр тела)
    pub sample_height: f32,
    /// Сдвиг цели, после которого sample устаревает досрочно
    pub resample_distance: f32,
}

impl Default for IlluminationConfig {
    fn default() -> Self {
        Self {
            min_illumination: 0.3,
            poll_interval: 0.25,
            sample_height: 1.0,
            resample_distance: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TargetSample {
    level: f32,
    position: Vec3,
    sampled_at: f64,
}

#[derive(Debug, Clone)]
pub struct IlluminationSampler {
    config: IlluminationConfig,
    samples: HashMap<Entity, TargetSample>,
    ambient: Option<TargetSample>,
}

impl IlluminationSampler {
    pub fn new(config: IlluminationConfig) -> Self {
        Self {
            config,
            samples: HashMap::new(),
            ambient: None,
        }
    }

    pub fn config(&self) -> &IlluminationConfig {
        &self.config
    }

    pub fn is_lit(&self, level: f32) -> bool {
        level >= self.config.min_illumination
    }

    fn is_fresh(&self, sample: &TargetSample, position: Vec3, now: f64) -> bool {
        now - sample.sampled_at < self.config.poll_interval
            && sample.position.distance(position) < self.config.resample_distance
    }

    /// Уровень света на цели (кэш per-target, затем общий кэш мира)
    pub fn light_level(&mut self, light: &mut LightService, entity: Entity, position: Vec3, now: f64) -> f32 {
        if let Some(sample) = self.samples.get(&entity) {
            if self.is_fresh(sample, position, now) {
                return sample.level;
            }
        }

        let level = light.sample(position + Vec3::Y * self.config.sample_height);
        self.samples.insert(
            entity,
            TargetSample {
                level,
                position,
                sampled_at: now,
            },
        );
        level
    }

    /// Освещённость вокруг самого наблюдателя (для VisionState переходов)
    pub fn ambient_level(&mut self, light: &mut LightService, position: Vec3, now: f64) -> f32 {
        if let Some(sample) = self.ambient {
            if self.is_fresh(&sample, position, now) {
                return sample.level;
            }
        }

        let level = light.sample(position + Vec3::Y * self.config.sample_height);
        self.ambient = Some(TargetSample {
            level,
            position,
            sampled_at: now,
        });
        level
    }

    /// Последний известный уровень ambient без нового sampling
    pub fn last_ambient_level(&self) -> Option<f32> {
        self.ambient.map(|s| s.level)
    }

    /// Убрать samples целей, которых больше нет
    pub fn retain(&mut self, mut keep: impl FnMut(Entity) -> bool) {
        self.samples.retain(|entity, _| keep(*entity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{HeadlessWorld, LightSampleCache};

    #[test]
    fn test_sample_reused_within_poll_interval() {
        let bright = HeadlessWorld::new(0.9);
        let dark = HeadlessWorld::new(0.05);
        let mut cache = LightSampleCache::default();
        let mut sampler = IlluminationSampler::new(IlluminationConfig::default());
        let target = Entity::from_raw(3);

        let level = sampler.light_level(&mut LightService::new(&bright, &mut cache), target, Vec3::ZERO, 0.0);
        assert!((level - 0.9).abs() < 1e-5);

        // Мир потемнел, но per-target sample ещё свежий
        cache.clear();
        let level = sampler.light_level(&mut LightService::new(&dark, &mut cache), target, Vec3::ZERO, 0.1);
        assert!((level - 0.9).abs() < 1e-5);

        let level = sampler.light_level(&mut LightService::new(&dark, &mut cache), target, Vec3::ZERO, 0.5);
        assert!((level - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_min_illumination_floor() {
        let sampler = IlluminationSampler::new(IlluminationConfig::default());
        assert!(sampler.is_lit(0.3));
        assert!(!sampler.is_lit(0.29));
    }
}
