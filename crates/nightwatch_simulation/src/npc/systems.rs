//! NPC ECS systems (FixedUpdate, chained)
//!
//! Порядок за fixed tick:
//! 1. advance_light_cache_frame — новый frame id для LRU
//! 2. npc_decision_tick — EyeDamageIntent, затем Brain.decision_tick (Vision внутри)
//! 3. npc_physics_step — Motrix.physics_step каждый tick
//! 4. integrate_kinematic_bodies — velocity → Transform, пол на y = 0
//! 5. forward_npc_events — outbox Brain → NpcEvent

use bevy::prelude::*;

use super::components::{KinematicBody, NpcBody, NpcTag, Perceivable};
use super::events::{EyeDamageIntent, NpcEvent};
use crate::brain::Brain;
use crate::logger;
use crate::motrix::Motrix;
use crate::vision::Vision;
use crate::world::{LightSampleCache, LightService, TargetInfo, TargetSnapshot, WorldServices};

/// Высота пола для headless интеграции
pub const GROUND_HEIGHT: f32 = 0.0;

pub fn advance_light_cache_frame(mut cache: ResMut<LightSampleCache>) {
    cache.advance_frame();
}

/// Снимок всех Perceivable entities (сортирован по Entity для детерминизма)
fn collect_targets(targets: &Query<(Entity, &Transform, &Perceivable, Option<&KinematicBody>)>) -> TargetSnapshot {
    let mut infos: Vec<TargetInfo> = targets
        .iter()
        .map(|(entity, transform, perceivable, body)| {
            TargetInfo::new(entity, transform.translation)
                .with_velocity(body.map(|b| b.velocity).unwrap_or(Vec3::ZERO))
                .with_threat(perceivable.threat_level)
        })
        .collect();
    infos.sort_by_key(|info| info.entity);
    TargetSnapshot::new(infos)
}

/// System: decision tick всех NPC
///
/// Сначала внешний урон по глазам (влияет на восприятие уже в этом тике),
/// потом один snapshot целей на всех NPC.
#[allow(clippy::type_complexity)]
pub fn npc_decision_tick(
    mut eye_damage: EventReader<EyeDamageIntent>,
    mut npcs: Query<(Entity, &Transform, &KinematicBody, &mut Vision, &mut Motrix, &mut Brain), With<NpcTag>>,
    targets: Query<(Entity, &Transform, &Perceivable, Option<&KinematicBody>)>,
    services: Res<WorldServices>,
    mut light_cache: ResMut<LightSampleCache>,
    time: Res<Time<Fixed>>,
) {
    let now = time.elapsed_secs_f64();

    for intent in eye_damage.read() {
        let Ok((_, _, _, mut vision, _, _)) = npcs.get_mut(intent.npc) else {
            logger::log_warning(&format!("👁️ EyeDamageIntent for unknown NPC {:?}", intent.npc));
            continue;
        };
        vision.apply_eye_damage(intent.amount, now);
    }

    let snapshot = collect_targets(&targets);
    let mut light = LightService::new(services.light.as_ref(), &mut light_cache);

    for (entity, transform, body, mut vision, mut motrix, mut brain) in npcs.iter_mut() {
        brain.decision_tick(
            now,
            entity,
            transform.translation,
            body.velocity,
            &mut vision,
            &mut motrix,
            &snapshot,
            services.physics.as_ref(),
            &mut light,
        );
    }
}

/// System: locomotion шаг каждый fixed tick (не зависит от decision_interval)
pub fn npc_physics_step(
    mut npcs: Query<(Entity, &mut Transform, &mut KinematicBody, &mut Motrix), With<NpcTag>>,
    services: Res<WorldServices>,
    time: Res<Time<Fixed>>,
) {
    let now = time.elapsed_secs_f64();
    let dt = time.delta_secs();

    for (entity, mut transform, mut kinematic, mut motrix) in npcs.iter_mut() {
        {
            let mut body = NpcBody {
                transform: &transform,
                body: &mut kinematic,
            };
            motrix.physics_step(
                now,
                dt,
                entity,
                &mut body,
                services.physics.as_ref(),
                services.pathfinder.as_ref(),
            );
        }

        // Bevy forward = -Z
        transform.rotation = Quat::from_rotation_arc(Vec3::NEG_Z, motrix.facing());
    }
}

/// System: интеграция скорости в позицию
///
/// Гравитацию добавляет Locomotion (для NPC); здесь только перемещение и пол.
pub fn integrate_kinematic_bodies(mut bodies: Query<(&mut Transform, &mut KinematicBody)>, time: Res<Time<Fixed>>) {
    let delta = time.delta_secs();

    for (mut transform, mut body) in bodies.iter_mut() {
        transform.translation += body.velocity * delta;

        if transform.translation.y <= GROUND_HEIGHT {
            transform.translation.y = GROUND_HEIGHT;
            if body.velocity.y < 0.0 {
                body.velocity.y = 0.0;
            }
            body.grounded = true;
        } else {
            body.grounded = false;
        }
    }
}

/// System: outbox каждого Brain → Bevy events
pub fn forward_npc_events(mut npcs: Query<(Entity, &mut Brain), With<NpcTag>>, mut events: EventWriter<NpcEvent>) {
    for (npc, mut brain) in npcs.iter_mut() {
        for kind in brain.drain_events() {
            events.write(NpcEvent { npc, kind });
        }
    }
}
