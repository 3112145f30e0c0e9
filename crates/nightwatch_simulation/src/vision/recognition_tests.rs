//! Tests for TargetRecognition.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::events::VisionEvent;
    use super::super::recognition::{RecognitionConfig, RecognitionWeights, TargetObservation, TargetRecognition};

    fn observation(id: u32, in_fov: bool, visible: bool, light_level: f32) -> TargetObservation {
        TargetObservation {
            entity: Entity::from_raw(id),
            position: Vec3::new(5.0, 0.0, 0.0),
            in_fov,
            visible,
            light_level,
        }
    }

    fn recognition() -> TargetRecognition {
        TargetRecognition::new(RecognitionConfig::default(), true, true)
    }

    #[test]
    fn test_lit_target_in_view_is_recognized() {
        let mut recognition = recognition();

        // 0.3 + 0.5 + 0.2·0.5 = 0.9
        let confidence = recognition.confidence(true, true, 0.5);
        assert!((confidence - 0.9).abs() < 1e-5);

        let events = recognition.update(0.0, &[observation(1, true, true, 0.5)]);
        assert!(events.iter().any(|e| matches!(
            e,
            VisionEvent::TargetRecognized { target, .. } if *target == Entity::from_raw(1)
        )));
        assert!(recognition.is_recognized(Entity::from_raw(1)));
    }

    #[test]
    fn test_light_below_floor_only_zeroes_light_term() {
        let mut recognition = recognition();

        // 0.3 + 0.5 + 0 = 0.8
        let confidence = recognition.confidence(true, true, 0.1);
        assert!((confidence - 0.8).abs() < 1e-5);

        recognition.update(0.0, &[observation(1, true, true, 0.1)]);
        assert!(recognition.is_recognized(Entity::from_raw(1)));
        let target = recognition.target(Entity::from_raw(1)).unwrap();
        assert!(!target.illuminated);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let recognition = recognition();
        for &(fov, los, light) in &[(true, true, 5.0), (false, false, -1.0), (true, false, 1.0)] {
            let c = recognition.confidence(fov, los, light);
            assert!((0.0..=1.0).contains(&c), "confidence {} out of range", c);
        }
    }

    #[test]
    fn test_repeated_observation_is_idempotent() {
        let mut recognition = recognition();
        for &(fov, los, light) in &[(true, true, 0.7), (true, false, 0.35), (false, false, 0.9)] {
            let first = recognition.confidence(fov, los, light);
            assert_eq!(first.to_bits(), recognition.confidence(fov, los, light).to_bits());
        }

        let seen = observation(3, true, true, 0.7);
        let first = recognition.update(0.0, &[seen]);
        let confidence = recognition.target(Entity::from_raw(3)).unwrap().confidence;
        let second = recognition.update(0.2, &[seen]);

        assert_eq!(recognition.target(Entity::from_raw(3)).unwrap().confidence, confidence);
        let recognized = first
            .iter()
            .chain(second.iter())
            .filter(|e| matches!(e, VisionEvent::TargetRecognized { .. }))
            .count();
        assert_eq!(recognized, 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_hysteresis_between_thresholds() {
        let mut recognition = recognition();
        let target = Entity::from_raw(1);

        recognition.update(0.0, &[observation(1, true, true, 1.0)]);
        assert!(recognition.is_recognized(target));

        // Ровно 0.65: ниже threshold, но выше loss threshold (0.6)
        recognition.set_weights(RecognitionWeights::new(0.35, 0.3, 0.35));
        let events = recognition.update(0.2, &[observation(1, true, true, 0.0)]);
        assert!(recognition.is_recognized(target));
        assert!(!events.iter().any(|e| matches!(e, VisionEvent::TargetLost { .. })));

        // FOV только: 0.35 < 0.6
        let events = recognition.update(0.4, &[observation(1, true, false, 0.0)]);
        assert!(!recognition.is_recognized(target));
        assert!(events.contains(&VisionEvent::TargetLost { target }));
    }

    #[test]
    fn test_partial_detection_fires_every_update() {
        let mut recognition = recognition();

        for step in 0..3 {
            let events = recognition.update(step as f64 * 0.2, &[observation(1, true, false, 0.0)]);
            assert_eq!(events.len(), 1);
            match &events[0] {
                VisionEvent::TargetPartiallyDetected { target, confidence } => {
                    assert_eq!(*target, Entity::from_raw(1));
                    assert!((confidence - 0.3).abs() < 1e-5);
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
    }

    #[test]
    fn test_vanished_target_is_lost() {
        let mut recognition = recognition();
        recognition.update(0.0, &[observation(1, true, true, 1.0)]);

        let events = recognition.update(0.2, &[]);
        assert_eq!(events, vec![VisionEvent::TargetLost { target: Entity::from_raw(1) }]);
        assert!(recognition.target(Entity::from_raw(1)).is_none());
    }

    #[test]
    fn test_degenerate_weights_fall_back_to_defaults() {
        let config = RecognitionConfig {
            weights: RecognitionWeights::new(0.0, 0.0, 0.0),
            ..Default::default()
        };
        let recognition = TargetRecognition::new(config, true, true);
        assert_eq!(recognition.base_settings().weights, RecognitionWeights::default());
    }

    #[test]
    fn test_weights_are_normalized() {
        let config = RecognitionConfig {
            weights: RecognitionWeights::new(3.0, 5.0, 2.0),
            ..Default::default()
        };
        let recognition = TargetRecognition::new(config, true, true);
        let weights = recognition.base_settings().weights;
        assert!(weights.is_normalized());
        assert!((weights.los - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_missing_los_factor_contributes_nothing() {
        let recognition = TargetRecognition::new(RecognitionConfig::default(), false, true);
        // Вес LOS не перераспределяется
        let confidence = recognition.confidence(true, true, 1.0);
        assert!((confidence - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_update_interval() {
        let mut recognition = recognition();
        assert!(recognition.is_due(0.0));
        recognition.update(0.0, &[]);
        assert!(!recognition.is_due(0.1));
        assert!(recognition.is_due(0.2));
    }

    #[test]
    fn test_clear_returns_recognized_targets() {
        let mut recognition = recognition();
        recognition.update(
            0.0,
            &[observation(1, true, true, 1.0), observation(2, true, false, 0.0)],
        );
        let cleared = recognition.clear();
        assert_eq!(cleared, vec![Entity::from_raw(1)]);
        assert_eq!(recognition.tracked_targets().count(), 0);
    }
}
