//! Tests for Blackboard notes and facts.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::blackboard::{
        Blackboard, BlackboardFacts, BlackboardNotes, BlackboardValue, PoiSource, RememberedTargetFact,
        VisibleTargetFact,
    };
    use super::super::known_locations::KnownLocationsConfig;

    fn notes() -> BlackboardNotes {
        BlackboardNotes::new(KnownLocationsConfig::default())
    }

    fn visible(index: u32, position: Vec3, confidence: f32) -> VisibleTargetFact {
        VisibleTargetFact {
            entity: Entity::from_raw(index),
            position,
            velocity: Vec3::ZERO,
            confidence,
            threat_level: 0.0,
        }
    }

    #[test]
    fn test_close_points_of_interest_merge() {
        let mut notes = notes();
        let first = notes.add_point_of_interest(Vec3::ZERO, 2.0, PoiSource::Manual, 0.0);
        let second = notes.add_point_of_interest(Vec3::new(0.5, 0.0, 0.0), 4.0, PoiSource::Manual, 1.0);
        let third = notes.add_point_of_interest(Vec3::new(5.0, 0.0, 0.0), 1.0, PoiSource::Manual, 2.0);

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(notes.points_of_interest().len(), 2);
        assert_eq!(notes.point_of_interest(first).unwrap().priority, 4.0);
    }

    #[test]
    fn test_best_point_skips_visited() {
        let mut notes = notes();
        let low = notes.add_point_of_interest(Vec3::ZERO, 1.0, PoiSource::Manual, 0.0);
        let high = notes.add_point_of_interest(Vec3::new(10.0, 0.0, 0.0), 8.0, PoiSource::Manual, 0.0);

        assert_eq!(notes.best_point_of_interest().unwrap().id, high);

        assert!(notes.mark_visited(high));
        assert_eq!(notes.best_point_of_interest().unwrap().id, low);

        notes.prune_visited();
        assert_eq!(notes.points_of_interest().len(), 1);

        notes.mark_visited(low);
        assert!(notes.best_point_of_interest().is_none());
        assert!(!notes.has_unvisited_points());
    }

    #[test]
    fn test_equal_priority_prefers_oldest() {
        let mut notes = notes();
        let older = notes.add_point_of_interest(Vec3::ZERO, 3.0, PoiSource::Manual, 0.0);
        notes.add_point_of_interest(Vec3::new(10.0, 0.0, 0.0), 3.0, PoiSource::LostTarget(Entity::from_raw(2)), 1.0);

        assert_eq!(notes.best_point_of_interest().unwrap().id, older);
    }

    #[test]
    fn test_scratch_values_are_typed() {
        let mut notes = notes();
        notes.set("alert", BlackboardValue::Bool(true));
        notes.set("suspicion", BlackboardValue::Float(0.4));
        notes.set("last_noise", BlackboardValue::Vec3(Vec3::ONE));

        assert_eq!(notes.get_bool("alert"), Some(true));
        assert_eq!(notes.get_float("suspicion"), Some(0.4));
        assert_eq!(notes.get_vec3("last_noise"), Some(Vec3::ONE));
        // Неверный тип → None
        assert_eq!(notes.get_float("alert"), None);
        assert_eq!(notes.get_entity("missing"), None);

        assert_eq!(notes.remove("alert"), Some(BlackboardValue::Bool(true)));
        assert!(notes.get("alert").is_none());
    }

    #[test]
    fn test_set_patrol_points_resets_route() {
        let mut notes = notes();
        notes.patrol_index = 3;
        notes.patrol_forward = false;

        notes.set_patrol_points(vec![Vec3::ZERO, Vec3::X]);

        assert_eq!(notes.patrol_index, 0);
        assert!(notes.patrol_forward);
        assert_eq!(notes.current_patrol_point(), Some(Vec3::ZERO));
    }

    #[test]
    fn test_facts_queries() {
        let facts = BlackboardFacts {
            position: Vec3::ZERO,
            visible_targets: vec![
                visible(2, Vec3::new(10.0, 0.0, 0.0), 0.9),
                visible(3, Vec3::new(2.0, 0.0, 0.0), 0.75),
            ],
            remembered_targets: vec![RememberedTargetFact {
                entity: Entity::from_raw(4),
                position: Vec3::new(-3.0, 0.0, 0.0),
                confidence: 0.5,
                last_seen: 1.0,
            }],
            ..Default::default()
        };

        assert_eq!(facts.strongest_visible().unwrap().entity, Entity::from_raw(2));
        assert_eq!(facts.nearest_visible().unwrap().entity, Entity::from_raw(3));
        assert_eq!(facts.nearest_remembered().unwrap().entity, Entity::from_raw(4));
        assert!(facts.visible(Entity::from_raw(4)).is_none());
        assert!(facts.has_visible_targets());
    }

    #[test]
    fn test_refresh_replaces_facts() {
        let mut blackboard = Blackboard::new(KnownLocationsConfig::default());
        blackboard.refresh(BlackboardFacts {
            position: Vec3::X,
            updated_at: 2.0,
            ..Default::default()
        });

        let (facts, notes) = blackboard.split_mut();
        assert_eq!(facts.position, Vec3::X);
        notes.add_point_of_interest(Vec3::ZERO, 1.0, PoiSource::Manual, 2.0);

        assert_eq!(blackboard.facts().updated_at, 2.0);
        assert_eq!(blackboard.notes.points_of_interest().len(), 1);
    }
}
