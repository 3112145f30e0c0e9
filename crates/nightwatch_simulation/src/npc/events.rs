//! NPC Bevy events (ECS ⇄ cognition)

use bevy::prelude::*;

use crate::brain::CognitionEvent;

/// Всё, что NPC выпустил за тик (Vision/Motrix/Brain), для внешних систем
#[derive(Event, Debug, Clone, PartialEq)]
pub struct NpcEvent {
    pub npc: Entity,
    pub kind: CognitionEvent,
}

/// Внешний урон по глазам (вспышка, кислота). Применяется до decision tick.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct EyeDamageIntent {
    pub npc: Entity,
    pub amount: f32,
}
