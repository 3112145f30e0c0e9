//! Brain events + общий enum всего, что NPC выпускает наружу

use bevy::prelude::*;

use super::states::StateKind;
use crate::motrix::MotrixEvent;
use crate::vision::VisionEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum BrainEvent {
    StateChanged { from: StateKind, to: StateKind },

    /// Новый point of interest (вручную или из потерянной цели)
    PointOfInterestAdded { id: u32, position: Vec3, priority: f32 },

    /// Видимая цель выше flee_threat_level
    ThreatDetected { threat: Entity, threat_level: f32 },
}

/// Событие любого слоя когниции (то, что уходит в ECS как NpcEvent)
#[derive(Debug, Clone, PartialEq)]
pub enum CognitionEvent {
    Vision(VisionEvent),
    Motrix(MotrixEvent),
    Brain(BrainEvent),
}

impl From<VisionEvent> for CognitionEvent {
    fn from(event: VisionEvent) -> Self {
        CognitionEvent::Vision(event)
    }
}

impl From<MotrixEvent> for CognitionEvent {
    fn from(event: MotrixEvent) -> Self {
        CognitionEvent::Motrix(event)
    }
}

impl From<BrainEvent> for CognitionEvent {
    fn from(event: BrainEvent) -> Self {
        CognitionEvent::Brain(event)
    }
}
