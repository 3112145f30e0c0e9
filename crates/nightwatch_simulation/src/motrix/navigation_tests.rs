//! Tests for Navigation and path simplification.

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::super::events::MotrixEvent;
    use super::super::navigation::{simplify_path, Navigation, NavigationConfig};
    use crate::error::NavigationError;
    use crate::world::{HeadlessObstacle, HeadlessWorld};

    #[test]
    fn test_collinear_short_points_are_merged() {
        let points = [
            Vec3::ZERO,
            Vec3::new(0.5, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.5, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
        ];
        let simplified = simplify_path(&points, 1.0, 45.0);
        assert_eq!(simplified, vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]);
    }

    #[test]
    fn test_sharp_turn_is_kept() {
        let points = [Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 5.0)];
        let simplified = simplify_path(&points, 1.0, 45.0);
        assert_eq!(simplified.len(), 3);
    }

    #[test]
    fn test_long_segment_is_kept() {
        let points = [Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.1)];
        let simplified = simplify_path(&points, 1.0, 45.0);
        assert_eq!(simplified.len(), 3);
    }

    #[test]
    fn test_endpoints_survive() {
        let points = [Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0)];
        assert_eq!(simplify_path(&points, 1.0, 45.0), points.to_vec());
    }

    #[test]
    fn test_unreachable_destination_fails() {
        let world = HeadlessWorld::new(1.0).with_obstacle(HeadlessObstacle::sphere(
            Entity::from_raw(900),
            Vec3::new(5.0, 0.0, 0.0),
            1.0,
        ));
        let mut navigation = Navigation::new(NavigationConfig::default());
        let to = Vec3::new(5.0, 0.0, 0.0);

        let result = navigation.request_path(&world, Vec3::ZERO, to);
        assert_eq!(result, Err(NavigationError::NoPath { from: Vec3::ZERO, to }));
        assert_eq!(navigation.drain_events(), vec![MotrixEvent::PathFailed { destination: to }]);
        assert!(navigation.destination().is_none());
    }

    #[test]
    fn test_steer_follows_path_until_arrival() {
        let world = HeadlessWorld::new(1.0);
        let mut navigation = Navigation::new(NavigationConfig::default());
        let to = Vec3::new(10.0, 0.0, 0.0);

        assert_eq!(navigation.request_path(&world, Vec3::ZERO, to), Ok(2));
        assert_eq!(navigation.steer(Vec3::ZERO), Some(Vec3::X));
        assert!((navigation.remaining_distance(Vec3::ZERO) - 10.0).abs() < 1e-5);

        assert_eq!(navigation.steer(Vec3::new(9.5, 0.0, 0.0)), None);
        assert!(navigation.is_finished());
    }

    #[test]
    fn test_detour_waypoint_is_visited() {
        let world = HeadlessWorld::new(1.0).with_obstacle(HeadlessObstacle::sphere(
            Entity::from_raw(900),
            Vec3::new(5.0, 0.0, 0.0),
            1.0,
        ));
        let mut navigation = Navigation::new(NavigationConfig::default());

        let waypoints = navigation
            .request_path(&world, Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0))
            .unwrap();
        assert_eq!(waypoints, 3);

        let direction = navigation.steer(Vec3::ZERO).unwrap();
        // Первый отрезок уходит в сторону от препятствия
        assert!(direction.z.abs() > 0.1);
    }

    #[test]
    fn test_cancel_clears_path() {
        let mut navigation = Navigation::new(NavigationConfig::default());
        navigation.set_direct(Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0));
        assert!(!navigation.is_finished());

        navigation.cancel();
        assert!(navigation.is_finished());
        assert!(navigation.destination().is_none());
    }
}
