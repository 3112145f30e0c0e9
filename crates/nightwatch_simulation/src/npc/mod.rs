//! NPC ECS integration
//!
//! Склеивает Vision / Motrix / Brain с Bevy: спавн, fixed-tick системы,
//! проброс событий наружу (`NpcEvent`) и внешнего урона по глазам внутрь.

use bevy::prelude::*;

pub mod components;
pub mod events;
pub mod spawn;
pub mod systems;

pub use components::{KinematicBody, NpcBody, NpcTag, Perceivable};
pub use events::{EyeDamageIntent, NpcEvent};
pub use spawn::{spawn_npc, NpcConfig};
pub use systems::{
    advance_light_cache_frame, forward_npc_events, integrate_kinematic_bodies, npc_decision_tick, npc_physics_step,
    GROUND_HEIGHT,
};

use crate::world::{HeadlessWorld, LightSampleCache, WorldServices};

/// NPC Plugin
///
/// Регистрирует события, ресурсы и системы в FixedUpdate.
/// WorldServices вставляется только если engine слой не вставил свой
/// (по умолчанию — пустой освещённый HeadlessWorld).
pub struct NpcPlugin;

impl Plugin for NpcPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<NpcEvent>().add_event::<EyeDamageIntent>();

        app.init_resource::<LightSampleCache>();
        if !app.world().contains_resource::<WorldServices>() {
            app.insert_resource(WorldServices::headless(HeadlessWorld::new(1.0)));
        }

        app.add_systems(
            FixedUpdate,
            (
                advance_light_cache_frame,
                npc_decision_tick,
                npc_physics_step,
                integrate_kinematic_bodies,
                forward_npc_events,
            )
                .chain(), // Последовательное выполнение для детерминизма
        );
    }
}
