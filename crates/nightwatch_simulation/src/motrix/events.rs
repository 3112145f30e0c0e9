//! Motrix events

use bevy::prelude::*;

use super::motion_state::MotionState;

#[derive(Debug, Clone, PartialEq)]
pub enum MotrixEvent {
    /// Дошли до destination (один раз на каждую destination)
    DestinationReached { position: Vec3 },

    /// Pathfinder вернул пустой путь
    PathFailed { destination: Vec3 },

    /// Новое препятствие попало в кольцо лучей
    ObstacleEncountered { collider: Entity, position: Vec3 },

    MotionStateChanged { from: MotionState, to: MotionState },
}
