//! Tests for KnownLocations.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;
    use std::collections::HashMap;

    use super::super::known_locations::{KnownLocations, KnownLocationsConfig, LocationCategory};

    fn locations(max_locations: usize) -> KnownLocations {
        KnownLocations::new(KnownLocationsConfig {
            max_locations,
            merge_distance: 2.0,
        })
    }

    #[test]
    fn test_nearby_same_category_merges() {
        let mut locations = locations(10);
        let first = locations.add("camp", Vec3::ZERO, LocationCategory::Shelter, 1.0, 0.0, HashMap::new());
        let second = locations.add("tent", Vec3::new(1.0, 0.0, 0.0), LocationCategory::Shelter, 3.0, 5.0, HashMap::new());

        assert_eq!(first, "camp");
        assert_eq!(second, "camp");
        assert_eq!(locations.len(), 1);

        let camp = locations.get("camp").unwrap();
        assert_eq!(camp.position, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(camp.priority, 3.0);
        assert_eq!(camp.created_at, 0.0);
        assert_eq!(camp.updated_at, 5.0);
    }

    #[test]
    fn test_other_category_does_not_merge() {
        let mut locations = locations(10);
        locations.add("camp", Vec3::ZERO, LocationCategory::Shelter, 1.0, 0.0, HashMap::new());
        locations.add("pit", Vec3::new(1.0, 0.0, 0.0), LocationCategory::Danger, 1.0, 0.0, HashMap::new());

        assert_eq!(locations.len(), 2);
        assert_eq!(locations.by_category(LocationCategory::Danger).len(), 1);
    }

    #[test]
    fn test_same_name_updates_and_keeps_higher_priority() {
        let mut locations = locations(10);
        let mut metadata = HashMap::new();
        metadata.insert("owner".to_string(), "guard".to_string());

        locations.add("well", Vec3::ZERO, LocationCategory::Resource, 4.0, 0.0, HashMap::new());
        locations.add("well", Vec3::new(30.0, 0.0, 0.0), LocationCategory::Resource, 1.0, 2.0, metadata);

        let well = locations.get("well").unwrap();
        assert_eq!(well.position, Vec3::new(30.0, 0.0, 0.0));
        assert_eq!(well.priority, 4.0);
        assert_eq!(well.metadata.get("owner").map(String::as_str), Some("guard"));
    }

    #[test]
    fn test_overflow_evicts_lowest_priority_then_oldest() {
        let mut locations = locations(3);
        locations.add("a", Vec3::new(0.0, 0.0, 0.0), LocationCategory::Interest, 1.0, 0.0, HashMap::new());
        locations.add("b", Vec3::new(10.0, 0.0, 0.0), LocationCategory::Interest, 1.0, 1.0, HashMap::new());
        locations.add("c", Vec3::new(20.0, 0.0, 0.0), LocationCategory::Interest, 5.0, 2.0, HashMap::new());

        locations.add("d", Vec3::new(30.0, 0.0, 0.0), LocationCategory::Interest, 2.0, 3.0, HashMap::new());

        assert_eq!(locations.len(), 3);
        assert!(locations.get("a").is_none());
        assert!(locations.get("b").is_some());
        assert!(locations.get("d").is_some());
    }

    #[test]
    fn test_nearest_filters_by_category() {
        let mut locations = locations(10);
        locations.add("near_danger", Vec3::new(1.0, 0.0, 0.0), LocationCategory::Danger, 1.0, 0.0, HashMap::new());
        locations.add("far_shelter", Vec3::new(9.0, 0.0, 0.0), LocationCategory::Shelter, 1.0, 0.0, HashMap::new());

        assert_eq!(locations.nearest(Vec3::ZERO, None).unwrap().name, "near_danger");
        assert_eq!(
            locations
                .nearest(Vec3::ZERO, Some(LocationCategory::Shelter))
                .unwrap()
                .name,
            "far_shelter"
        );
        assert!(locations
            .nearest(Vec3::ZERO, Some(LocationCategory::Resource))
            .is_none());

        assert_eq!(locations.within(Vec3::ZERO, 5.0, LocationCategory::Shelter).len(), 0);
        assert_eq!(locations.within(Vec3::ZERO, 10.0, LocationCategory::Shelter).len(), 1);
    }

    #[test]
    fn test_mark_visited_counts_visits() {
        let mut locations = locations(10);
        locations.add("gate", Vec3::ZERO, LocationCategory::Navigation, 1.0, 0.0, HashMap::new());

        assert!(locations.mark_visited("gate", 3.0));
        assert!(locations.mark_visited("gate", 4.0));
        assert!(!locations.mark_visited("nowhere", 4.0));

        let gate = locations.get("gate").unwrap();
        assert_eq!(gate.visit_count, 2);
        assert_eq!(gate.visited_at, Some(4.0));

        assert!(locations.remove("gate").is_some());
        assert!(locations.is_empty());
    }
}
