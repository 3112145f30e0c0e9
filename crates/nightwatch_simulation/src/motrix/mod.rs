//! Motrix domain — передвижение NPC
//!
//! MotionState (режим + capabilities) → Navigation (путь) →
//! ObstacleAvoidance (отталкивание) → Locomotion (тело). `Motrix` — фасад.

pub mod avoidance;
pub mod events;
pub mod facade;
pub mod locomotion;
pub mod motion_state;
pub mod navigation;

pub use avoidance::{ObstacleAvoidance, ObstacleAvoidanceConfig, ObstacleRecord};
pub use events::MotrixEvent;
pub use facade::{Motrix, MotrixConfig};
pub use locomotion::{Locomotion, LocomotionConfig};
pub use motion_state::{MotionCapabilities, MotionState, MotionStateMachine};
pub use navigation::{simplify_path, Navigation, NavigationConfig};

#[cfg(test)]
mod navigation_tests;
