//! Light sample cache — bounded LRU по квантованной позиции
//!
//! Sampling света дорогой (engine читает пиксели/шейдер), а NPC опрашивают
//! одни и те же точки. Кэш один на мир (Resource), вытеснение — LRU по frame id.
//! Доступ однопоточный (FixedUpdate chain), поэтому без блокировок.

use bevy::prelude::*;
use std::collections::HashMap;

use super::LightProbe;

#[derive(Debug, Clone, Copy)]
struct CachedSample {
    level: f32,
    sampled_frame: u64,
    last_used_frame: u64,
}

#[derive(Resource, Debug, Clone)]
pub struct LightSampleCache {
    /// Размер ячейки квантования (метры)
    pub cell_size: f32,
    /// Максимум записей
    pub capacity: usize,
    /// Запись старше стольки кадров пересэмплируется
    pub max_age_frames: u64,
    frame: u64,
    entries: HashMap<IVec3, CachedSample>,
    hits: u64,
    misses: u64,
}

impl Default for LightSampleCache {
    fn default() -> Self {
        Self::new(1.0, 256, 30)
    }
}

impl LightSampleCache {
    pub fn new(cell_size: f32, capacity: usize, max_age_frames: u64) -> Self {
        Self {
            cell_size: cell_size.max(0.01),
            capacity: capacity.max(1),
            max_age_frames,
            frame: 0,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn advance_frame(&mut self) {
        self.frame += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) для отладки
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn quantize(&self, position: Vec3) -> IVec3 {
        (position / self.cell_size).floor().as_ivec3()
    }

    /// Закэшированный уровень или свежий sample через probe
    pub fn sample(&mut self, probe: &dyn LightProbe, position: Vec3) -> f32 {
        let key = self.quantize(position);
        let frame = self.frame;

        if let Some(entry) = self.entries.get_mut(&key) {
            if frame.saturating_sub(entry.sampled_frame) <= self.max_age_frames {
                entry.last_used_frame = frame;
                self.hits += 1;
                return entry.level;
            }
        }

        self.misses += 1;
        let level = probe.sample_light(position).clamp(0.0, 1.0);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_least_recently_used();
        }

        self.entries.insert(
            key,
            CachedSample {
                level,
                sampled_frame: frame,
                last_used_frame: frame,
            },
        );
        level
    }

    fn evict_least_recently_used(&mut self) {
        let oldest = self
            .entries
            .iter()
            // При равном кадре — меньшая ячейка, иначе порядок HashMap решает
            .min_by_key(|(key, entry)| (entry.last_used_frame, key.x, key.y, key.z))
            .map(|(key, _)| *key);

        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Probe + общий кэш на время одного тика
pub struct LightService<'a> {
    probe: &'a dyn LightProbe,
    cache: &'a mut LightSampleCache,
}

impl<'a> LightService<'a> {
    pub fn new(probe: &'a dyn LightProbe, cache: &'a mut LightSampleCache) -> Self {
        Self { probe, cache }
    }

    pub fn sample(&mut self, position: Vec3) -> f32 {
        self.cache.sample(self.probe, position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProbe {
        calls: AtomicUsize,
        level: f32,
    }

    impl LightProbe for CountingProbe {
        fn sample_light(&self, _position: Vec3) -> f32 {
            self.calls.fetch_add(1, Ordering::Relaxed);
            self.level
        }
    }

    #[test]
    fn test_same_cell_hits_cache() {
        let probe = CountingProbe { calls: AtomicUsize::new(0), level: 0.6 };
        let mut cache = LightSampleCache::new(1.0, 8, 10);

        assert_eq!(cache.sample(&probe, Vec3::new(0.2, 0.0, 0.2)), 0.6);
        assert_eq!(cache.sample(&probe, Vec3::new(0.7, 0.5, 0.9)), 0.6);
        assert_eq!(probe.calls.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats(), (1, 1));
    }

    #[test]
    fn test_stale_entry_is_resampled() {
        let probe = CountingProbe { calls: AtomicUsize::new(0), level: 0.4 };
        let mut cache = LightSampleCache::new(1.0, 8, 2);

        cache.sample(&probe, Vec3::ZERO);
        for _ in 0..3 {
            cache.advance_frame();
        }
        cache.sample(&probe, Vec3::ZERO);
        assert_eq!(probe.calls.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let probe = CountingProbe { calls: AtomicUsize::new(0), level: 1.0 };
        let mut cache = LightSampleCache::new(1.0, 2, 100);

        cache.sample(&probe, Vec3::new(0.5, 0.0, 0.5)); // A @ frame 0
        cache.advance_frame();
        cache.sample(&probe, Vec3::new(5.5, 0.0, 0.5)); // B @ frame 1
        cache.advance_frame();
        cache.sample(&probe, Vec3::new(0.5, 0.0, 0.5)); // A touched @ frame 2
        cache.advance_frame();
        cache.sample(&probe, Vec3::new(9.5, 0.0, 0.5)); // C вытесняет B

        assert_eq!(cache.len(), 2);
        let calls_before = probe.calls.load(Ordering::Relaxed);
        cache.sample(&probe, Vec3::new(0.5, 0.0, 0.5)); // A всё ещё в кэше
        assert_eq!(probe.calls.load(Ordering::Relaxed), calls_before);
        cache.sample(&probe, Vec3::new(5.5, 0.0, 0.5)); // B пересэмплирован
        assert_eq!(probe.calls.load(Ordering::Relaxed), calls_before + 1);
    }

    #[test]
    fn test_eviction_tie_picks_lowest_cell() {
        // Все ячейки использованы в одном кадре: вытесняется всегда одна и та же
        for _ in 0..16 {
            let probe = CountingProbe { calls: AtomicUsize::new(0), level: 1.0 };
            let mut cache = LightSampleCache::new(1.0, 3, 100);

            cache.sample(&probe, Vec3::new(9.5, 0.0, 0.5));
            cache.sample(&probe, Vec3::new(-3.5, 0.0, 0.5));
            cache.sample(&probe, Vec3::new(2.5, 0.0, 0.5));
            cache.sample(&probe, Vec3::new(20.5, 0.0, 0.5)); // вытесняет (-4, 0, 0)

            let calls_before = probe.calls.load(Ordering::Relaxed);
            cache.sample(&probe, Vec3::new(9.5, 0.0, 0.5));
            cache.sample(&probe, Vec3::new(2.5, 0.0, 0.5));
            cache.sample(&probe, Vec3::new(20.5, 0.0, 0.5));
            assert_eq!(probe.calls.load(Ordering::Relaxed), calls_before);

            cache.sample(&probe, Vec3::new(-3.5, 0.0, 0.5));
            assert_eq!(probe.calls.load(Ordering::Relaxed), calls_before + 1);
        }
    }
}
