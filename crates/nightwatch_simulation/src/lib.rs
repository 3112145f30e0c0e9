//! Nightwatch Simulation Core
//!
//! Когниция NPC на Bevy 0.16:
//! - vision — восприятие (FOV → LOS → свет → confidence → память)
//! - motrix — передвижение (режимы, путь, обход препятствий, тело)
//! - brain — решения (Blackboard + приоритетный FSM)
//! - npc — ECS склейка (компоненты, FixedUpdate системы, события)
//!
//! Physics / navmesh / свет — внешние collaborators (`world`), ядро про
//! engine ничего не знает.

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub mod brain;
pub mod error;
pub mod events;
pub mod logger;
pub mod motrix;
pub mod npc;
pub mod vision;
pub mod world;

// Re-export основных типов для удобства
pub use brain::{Brain, BrainConfig, BrainEvent, CognitionEvent, StateKind};
pub use error::{MotionError, NavigationError, TransitionError};
pub use logger::{init_logger, log, log_error, log_info, log_warning, set_log_level, LogLevel, LogPrinter};
pub use motrix::{Motrix, MotrixConfig, MotrixEvent};
pub use npc::{spawn_npc, EyeDamageIntent, KinematicBody, NpcConfig, NpcEvent, NpcPlugin, NpcTag, Perceivable};
pub use vision::{Vision, VisionConfig, VisionEvent, VisionStateKind};
pub use world::{HeadlessObstacle, HeadlessWorld, LightSampleCache, WorldServices};

/// Главный plugin симуляции
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .add_plugins(NpcPlugin);

        // Seed по умолчанию, если create_headless_app не вставил свой
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }
    }
}

/// Детерминистичный RNG resource (seeded)
///
/// Источник seed'ов для NPC: каждый NPC получает свой `ChaCha8Rng` через
/// `next_seed`, чтобы порядок решений одного NPC не зависел от других.
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn next_seed(&mut self) -> u64 {
        use rand::RngCore;
        self.rng.next_u64()
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

/// Snapshot мира для сравнения детерминизма
/// (Debug-представление компонентов, отсортированных по Entity)
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
