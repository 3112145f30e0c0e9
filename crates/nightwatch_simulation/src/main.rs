//! Headless симуляция Nightwatch
//!
//! Один NPC патрулирует, игрок проходит мимо. Пишет в консоль переходы
//! состояний и позиции, fixed tick = один app.update().

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use std::time::Duration;

use nightwatch_simulation::*;

const TICKS: usize = 1200;

/// Игрок для демо: идёт по прямой с постоянной скоростью
#[derive(Component)]
struct DemoPlayer {
    velocity: Vec3,
}

fn drive_player(mut players: Query<(&DemoPlayer, &mut KinematicBody)>) {
    for (player, mut body) in players.iter_mut() {
        body.velocity = player.velocity;
    }
}

fn report_npc_events(mut events: EventReader<NpcEvent>) {
    for event in events.read() {
        match &event.kind {
            CognitionEvent::Brain(BrainEvent::StateChanged { from, to }) => {
                log_info(&format!("📣 {:?}: {} → {}", event.npc, from, to));
            }
            CognitionEvent::Vision(VisionEvent::TargetRecognized { target, confidence }) => {
                log_info(&format!("📣 {:?} sees {:?} ({:.2})", event.npc, target, confidence));
            }
            CognitionEvent::Vision(VisionEvent::TargetLost { target }) => {
                log_info(&format!("📣 {:?} lost {:?}", event.npc, target));
            }
            _ => {}
        }
    }
}

fn main() {
    let seed = 42;
    println!("Starting Nightwatch headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    set_log_level(LogLevel::Info);

    // Мир: колонна между патрульными точками + фонарь у ворот
    let world = HeadlessWorld::new(0.3)
        .with_obstacle(HeadlessObstacle::sphere(Entity::from_raw(10_000), Vec3::new(0.0, 1.0, 6.0), 1.0))
        .with_light(Vec3::new(8.0, 3.0, 8.0), 10.0, 0.9);
    app.insert_resource(WorldServices::headless(world))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(1.0 / 60.0)))
        .add_plugins(SimulationPlugin)
        .add_systems(FixedUpdate, drive_player.before(npc::npc_decision_tick))
        .add_systems(Update, report_npc_events);

    let npc_seed = app.world_mut().resource_mut::<DeterministicRng>().next_seed();
    let npc = {
        let mut commands = app.world_mut().commands();
        spawn_npc(&mut commands, Vec3::ZERO, &NpcConfig::default(), npc_seed)
    };
    let player = app
        .world_mut()
        .spawn((
            Transform::from_xyz(-12.0, 0.0, 10.0),
            KinematicBody::default(),
            Perceivable::new(0.3),
            DemoPlayer {
                velocity: Vec3::new(1.2, 0.0, 0.0),
            },
        ))
        .id();
    app.world_mut().flush();

    if let Some(mut brain) = app.world_mut().get_mut::<Brain>(npc) {
        brain.set_patrol_points(vec![
            Vec3::new(0.0, 0.0, 12.0),
            Vec3::new(8.0, 0.0, 8.0),
            Vec3::new(8.0, 0.0, -4.0),
        ]);
        brain.request_state("patrol");
    }

    for tick in 0..TICKS {
        app.update();

        if tick % 120 == 0 {
            let world = app.world();
            let npc_position = world.get::<Transform>(npc).map(|t| t.translation);
            let player_position = world.get::<Transform>(player).map(|t| t.translation);
            let state = world.get::<Brain>(npc).and_then(|b| b.current_state());
            println!(
                "Tick {}: npc {:?} in {:?}, player {:?}",
                tick, npc_position, state, player_position
            );
        }
    }

    println!("Simulation complete!");
}
