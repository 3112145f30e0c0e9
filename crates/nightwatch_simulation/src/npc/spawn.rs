//! Спавн NPC со всем cognition стеком

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::components::{KinematicBody, NpcTag, Perceivable};
use crate::brain::{Brain, BrainConfig};
use crate::logger;
use crate::motrix::{Motrix, MotrixConfig};
use crate::vision::{Vision, VisionConfig};

/// Полный конфиг одного NPC (Vision + Motrix + Brain)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NpcConfig {
    pub vision: VisionConfig,
    pub motrix: MotrixConfig,
    pub brain: BrainConfig,
    /// Насколько этот NPC опасен для других NPC
    pub threat_level: f32,
}

/// Spawn NPC на позиции. Seed разводится на Vision и Brain (у каждого свой RNG).
pub fn spawn_npc(commands: &mut Commands, position: Vec3, config: &NpcConfig, seed: u64) -> Entity {
    let mut motrix = Motrix::new(config.motrix.clone());
    motrix.sync_body(position, Vec3::ZERO);

    let entity = commands
        .spawn((
            Transform::from_translation(position),
            NpcTag,
            KinematicBody::default(),
            Perceivable::new(config.threat_level),
            Vision::new(config.vision.clone(), seed),
            motrix,
            Brain::new(config.brain.clone(), seed.wrapping_add(1)),
        ))
        .id();

    logger::log(&format!("🧍 Spawned NPC {:?} at {:?} (seed {})", entity, position, seed));
    entity
}
