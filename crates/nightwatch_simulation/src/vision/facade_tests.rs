//! Tests for the Vision facade (full perception pipeline on HeadlessWorld).

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::super::events::VisionEvent;
    use super::super::facade::{Vision, VisionConfig};
    use super::super::recognition::RecognitionWeights;
    use super::super::state::{BlinkConfig, VisionStateKind};
    use crate::world::{HeadlessObstacle, HeadlessWorld, LightSampleCache, LightService, TargetInfo, TargetSnapshot};

    fn observer() -> Entity {
        Entity::from_raw(1)
    }

    fn target() -> Entity {
        Entity::from_raw(2)
    }

    fn vision() -> Vision {
        let mut config = VisionConfig::default();
        config.state.blink = BlinkConfig {
            enabled: false,
            ..Default::default()
        };
        Vision::new(config, 5)
    }

    fn tick(vision: &mut Vision, now: f64, world: &HeadlessWorld, cache: &mut LightSampleCache, targets: &TargetSnapshot) {
        let mut light = LightService::new(world, cache);
        vision.tick(now, observer(), Vec3::ZERO, Vec3::X, targets, world, &mut light);
    }

    fn snapshot_at(position: Vec3) -> TargetSnapshot {
        TargetSnapshot::new(vec![TargetInfo::new(target(), position)])
    }

    #[test]
    fn test_lit_target_ahead_is_recognized_and_remembered() {
        let world = HeadlessWorld::new(1.0);
        let mut cache = LightSampleCache::default();
        let mut vision = vision();

        tick(&mut vision, 0.0, &world, &mut cache, &snapshot_at(Vec3::new(5.0, 0.0, 0.0)));

        assert!(vision.is_target_visible(target()));
        assert_eq!(vision.visible_targets().len(), 1);
        let events = vision.drain_events();
        assert!(events.iter().any(|e| matches!(e, VisionEvent::TargetRecognized { .. })));
        assert!(events.iter().any(|e| matches!(e, VisionEvent::TargetRemembered { .. })));
        assert!(vision.memory().get(target()).is_some_and(|m| m.visible));
    }

    #[test]
    fn test_target_behind_is_not_seen() {
        let world = HeadlessWorld::new(1.0);
        let mut cache = LightSampleCache::default();
        let mut vision = vision();

        tick(&mut vision, 0.0, &world, &mut cache, &snapshot_at(Vec3::new(-5.0, 0.0, 0.0)));

        assert!(!vision.is_target_visible(target()));
        assert!(vision.remembered_targets().is_empty());
    }

    #[test]
    fn test_wall_leaves_only_partial_detection() {
        let world = HeadlessWorld::new(1.0).with_obstacle(HeadlessObstacle::sphere(
            Entity::from_raw(900),
            Vec3::new(2.5, 0.8, 0.0),
            0.5,
        ));
        let mut cache = LightSampleCache::default();
        let mut vision = vision();

        tick(&mut vision, 0.0, &world, &mut cache, &snapshot_at(Vec3::new(5.0, 0.0, 0.0)));

        assert!(!vision.is_target_visible(target()));
        let events = vision.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, VisionEvent::TargetPartiallyDetected { .. })));
    }

    #[test]
    fn test_partially_detected_target_is_not_forgotten() {
        let world = HeadlessWorld::new(1.0).with_obstacle(HeadlessObstacle::sphere(
            Entity::from_raw(900),
            Vec3::new(2.5, 0.8, 0.0),
            0.5,
        ));
        let mut cache = LightSampleCache::default();
        let mut vision = vision();
        let targets = snapshot_at(Vec3::new(5.0, 0.0, 0.0));

        let mut events = Vec::new();
        for step in 0..=150 {
            tick(&mut vision, step as f64 * 0.1, &world, &mut cache, &targets);
            events.extend(vision.drain_events());
        }

        let remembered = events
            .iter()
            .filter(|e| matches!(e, VisionEvent::TargetRemembered { .. }))
            .count();
        assert_eq!(remembered, 1);
        assert!(!events.iter().any(|e| matches!(
            e,
            VisionEvent::TargetForgotten { .. } | VisionEvent::MemoryDeteriorated { .. }
        )));

        let memory = vision.memory().get(target()).unwrap();
        assert!(!memory.visible);
        assert!(memory.confidence > 0.9);
    }

    #[test]
    fn test_lost_target_stays_in_memory() {
        let world = HeadlessWorld::new(1.0);
        let mut cache = LightSampleCache::default();
        let mut vision = vision();

        let seen_at = Vec3::new(5.0, 0.0, 0.0);
        tick(&mut vision, 0.0, &world, &mut cache, &snapshot_at(seen_at));
        vision.drain_events();

        tick(&mut vision, 0.2, &world, &mut cache, &snapshot_at(Vec3::new(-5.0, 0.0, 0.0)));

        let events = vision.drain_events();
        assert!(events.contains(&VisionEvent::TargetLost { target: target() }));
        assert!(!vision.is_target_visible(target()));

        let memory = vision.memory().get(target()).unwrap();
        assert!(!memory.visible);
        assert_eq!(memory.position, seen_at);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(vision.perceived_position(target(), &mut rng), Some(seen_at));
    }

    #[test]
    fn test_blindness_blocks_perception() {
        let world = HeadlessWorld::new(1.0);
        let mut cache = LightSampleCache::default();
        let mut vision = vision();
        let targets = snapshot_at(Vec3::new(5.0, 0.0, 0.0));

        tick(&mut vision, 0.0, &world, &mut cache, &targets);
        assert!(vision.is_target_visible(target()));

        vision.apply_eye_damage(1.0, 0.1);
        assert!(vision.is_blind());
        assert_eq!(vision.impairment_factor(), 1.0);

        tick(&mut vision, 0.2, &world, &mut cache, &targets);
        assert!(!vision.is_target_visible(target()));
        assert_eq!(vision.remembered_targets().len(), 1);
    }

    #[test]
    fn test_impairment_raises_effective_threshold() {
        let mut vision = vision();
        let base = vision.recognition().effective_settings().threshold;

        vision.set_vision_state(VisionStateKind::Dazzled, 0.0);
        let dazzled = vision.recognition().effective_settings().threshold;
        assert!(dazzled > base);

        vision.set_vision_state(VisionStateKind::Normal, 0.1);
        let restored = vision.recognition().effective_settings().threshold;
        assert!((restored - base).abs() < 1e-6);
    }

    #[test]
    fn test_new_base_threshold_keeps_impairment() {
        let mut vision = vision();
        vision.set_vision_state(VisionStateKind::Dazzled, 0.0);

        vision.set_recognition_threshold(0.5);
        let threshold = vision.recognition().effective_settings().threshold;
        assert!((threshold - 0.5 * 1.6).abs() < 1e-5, "threshold = {}", threshold);

        vision.set_recognition_weights(RecognitionWeights::new(0.2, 0.4, 0.4));
        let settings = vision.recognition().effective_settings();
        assert!((settings.threshold - 0.5 * 1.6).abs() < 1e-5);
        assert!((settings.weights.los - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_darkness_adapts_vision() {
        let world = HeadlessWorld::new(0.05);
        let mut cache = LightSampleCache::default();
        let mut vision = vision();
        let targets = TargetSnapshot::default();

        tick(&mut vision, 0.0, &world, &mut cache, &targets);
        assert_eq!(vision.vision_state(), VisionStateKind::Normal);

        tick(&mut vision, 3.2, &world, &mut cache, &targets);
        assert_eq!(vision.vision_state(), VisionStateKind::DarkAdapted);
        assert_eq!(vision.position_uncertainty(), 0.5);
    }

    #[test]
    fn test_forget_all() {
        let world = HeadlessWorld::new(1.0);
        let mut cache = LightSampleCache::default();
        let mut vision = vision();

        tick(&mut vision, 0.0, &world, &mut cache, &snapshot_at(Vec3::new(5.0, 0.0, 0.0)));
        vision.drain_events();

        vision.forget_all();
        let events = vision.drain_events();
        assert!(events.contains(&VisionEvent::TargetLost { target: target() }));
        assert!(events.contains(&VisionEvent::TargetForgotten { target: target() }));
        assert!(vision.remembered_targets().is_empty());
    }
}
