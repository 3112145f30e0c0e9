//! Tests for VisualMemory.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::super::events::VisionEvent;
    use super::super::memory::{VisualMemory, VisualMemoryConfig};

    fn target() -> Entity {
        Entity::from_raw(7)
    }

    #[test]
    fn test_remember_new_target_emits_event() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        let events = memory.remember(target(), Vec3::new(1.0, 0.0, 2.0), true, 0.0);

        assert_eq!(
            events,
            vec![VisionEvent::TargetRemembered {
                target: target(),
                position: Vec3::new(1.0, 0.0, 2.0),
            }]
        );
        assert_eq!(memory.get(target()).unwrap().confidence, 1.0);
    }

    #[test]
    fn test_confidence_never_increases_while_unseen() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        memory.remember(target(), Vec3::ZERO, true, 0.0);
        memory.remember(target(), Vec3::ZERO, false, 0.0);

        let mut previous = 1.0;
        for step in 1..18 {
            memory.decay(step as f64 * 0.5);
            let Some(entry) = memory.get(target()) else {
                break;
            };
            assert!(entry.confidence <= previous);
            previous = entry.confidence;
        }
    }

    #[test]
    fn test_visible_remember_resets_confidence() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        memory.remember(target(), Vec3::ZERO, true, 0.0);
        memory.remember(target(), Vec3::ZERO, false, 0.0);
        memory.decay(6.0);
        assert!(memory.get(target()).unwrap().confidence < 1.0);

        memory.remember(target(), Vec3::ZERO, true, 6.0);
        let entry = memory.get(target()).unwrap();
        assert_eq!(entry.confidence, 1.0);
        assert_eq!(entry.last_seen_time, 6.0);
        assert!(!entry.deteriorated);
    }

    #[test]
    fn test_deterioration_emitted_once() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        memory.remember(target(), Vec3::ZERO, true, 0.0);
        memory.remember(target(), Vec3::ZERO, false, 0.0);

        // (7/10)^1.5 ≈ 0.586 → confidence ≈ 0.414
        let events = memory.decay(7.0);
        assert!(matches!(
            events.as_slice(),
            [VisionEvent::MemoryDeteriorated { .. }]
        ));

        let events = memory.decay(7.5);
        assert!(events.is_empty());
    }

    #[test]
    fn test_forgotten_after_memory_duration() {
        let config = VisualMemoryConfig {
            // Порог 0 — забываем только по времени
            forget_threshold: 0.0,
            ..Default::default()
        };
        let mut memory = VisualMemory::new(config);
        memory.remember(target(), Vec3::ZERO, true, 0.0);
        memory.remember(target(), Vec3::ZERO, false, 0.0);

        let events = memory.decay(10.5);
        assert!(events.contains(&VisionEvent::TargetForgotten { target: target() }));
        assert!(memory.get(target()).is_none());
    }

    #[test]
    fn test_visible_memory_does_not_decay() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        memory.remember(target(), Vec3::ZERO, true, 0.0);

        let events = memory.decay(30.0);
        assert!(events.is_empty());
        assert_eq!(memory.get(target()).unwrap().confidence, 1.0);
    }

    #[test]
    fn test_keep_alive_freezes_decay() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        assert!(!memory.keep_alive(target(), Vec3::ZERO, 0.0));

        memory.remember(target(), Vec3::ZERO, false, 0.0);
        memory.decay(3.0);
        let frozen = memory.get(target()).unwrap().confidence;
        assert!(frozen < 1.0);

        for step in 7..40 {
            let now = step as f64 * 0.5;
            assert!(memory.keep_alive(target(), Vec3::new(0.2, 0.0, 0.0), now));
            assert!(memory.decay(now).is_empty());
        }

        let entry = memory.get(target()).unwrap();
        assert_eq!(entry.confidence, frozen);
        assert_eq!(entry.position, Vec3::ZERO);
        assert_eq!(entry.last_seen_time, 19.5);
    }

    #[test]
    fn test_position_hysteresis() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        memory.remember(target(), Vec3::ZERO, true, 0.0);

        memory.remember(target(), Vec3::new(0.3, 0.0, 0.0), true, 0.1);
        assert_eq!(memory.last_known_position(target()), Some(Vec3::ZERO));

        memory.remember(target(), Vec3::new(2.0, 0.0, 0.0), true, 0.2);
        assert_eq!(memory.last_known_position(target()), Some(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_capacity_evicts_weakest() {
        let config = VisualMemoryConfig {
            max_memories: 2,
            ..Default::default()
        };
        let mut memory = VisualMemory::new(config);
        memory.remember(Entity::from_raw(1), Vec3::ZERO, true, 0.0);
        memory.remember(Entity::from_raw(1), Vec3::ZERO, false, 0.0);
        memory.remember(Entity::from_raw(2), Vec3::ZERO, true, 0.0);
        memory.decay(5.0);

        let events = memory.remember(Entity::from_raw(3), Vec3::ZERO, true, 5.0);
        assert_eq!(events[0], VisionEvent::TargetForgotten { target: Entity::from_raw(1) });
        assert_eq!(memory.len(), 2);
    }

    #[test]
    fn test_clear_emits_forgotten_for_each() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        memory.remember(Entity::from_raw(1), Vec3::ZERO, true, 0.0);
        memory.remember(Entity::from_raw(2), Vec3::ZERO, true, 0.0);

        let events = memory.clear();
        assert_eq!(events.len(), 2);
        assert!(memory.is_empty());
    }

    #[test]
    fn test_tags() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        assert!(!memory.set_tag(target(), "faction", "raiders"));

        memory.remember(target(), Vec3::ZERO, true, 0.0);
        assert!(memory.set_tag(target(), "faction", "raiders"));
        assert_eq!(memory.tag(target(), "faction"), Some("raiders"));
    }

    #[test]
    fn test_jittered_position_within_uncertainty() {
        let mut memory = VisualMemory::new(VisualMemoryConfig::default());
        let position = Vec3::new(4.0, 1.0, -2.0);
        memory.remember(target(), position, true, 0.0);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(memory.jittered_position(target(), 0.0, &mut rng), Some(position));

        for _ in 0..20 {
            let jittered = memory.jittered_position(target(), 2.0, &mut rng).unwrap();
            assert!(jittered.distance(position) <= 2.0 + 1e-4);
            assert_eq!(jittered.y, position.y);
        }
    }
}
