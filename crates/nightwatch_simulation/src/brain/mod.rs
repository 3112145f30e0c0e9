//! Brain domain — принятие решений NPC
//!
//! Blackboard (факты + заметки) → AIStateManager (приоритетный FSM над
//! Idle/Wander/Patrol/Investigate/Follow/Flee) → команды в Motrix.
//! `Brain` — компонент, который гоняет decision tick.

pub mod blackboard;
pub mod context;
pub mod events;
pub mod known_locations;
pub mod manager;
pub mod states;
pub mod system;

pub use blackboard::{
    Blackboard, BlackboardFacts, BlackboardNotes, BlackboardValue, PoiSource, PointOfInterest, RememberedTargetFact,
    VisibleTargetFact,
};
pub use context::StateContext;
pub use events::{BrainEvent, CognitionEvent};
pub use known_locations::{KnownLocation, KnownLocations, KnownLocationsConfig, LocationCategory};
pub use manager::{AIStateManager, AIStateManagerConfig, StateTransition};
pub use states::{AIState, StateBehavior, StateCore, StateKind, StatesConfig};
pub use system::{Brain, BrainConfig};

#[cfg(test)]
mod blackboard_tests;
#[cfg(test)]
mod known_locations_tests;
