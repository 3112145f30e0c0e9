//! AI states — шесть поведений NPC
//!
//! Жизненный цикл: enter → update* → exit (ведёт AIStateManager).
//! State сам не переключается: он только просит `transition_to`, а manager
//! проверяет запрос ДО следующего update.
//!
//! Отложенная работа (ожидание на точке, осмотр, safety check) хранится
//! как `fire_at` timestamps внутри state; `enter` их сбрасывает, поэтому
//! таймеры прошлой активации не срабатывают.

use bevy::prelude::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use super::context::StateContext;

pub mod flee;
pub mod follow;
pub mod idle;
pub mod investigate;
pub mod patrol;
pub mod wander;

pub use flee::{FleeConfig, FleeState};
pub use follow::{FollowConfig, FollowState};
pub use idle::{IdleConfig, IdleState};
pub use investigate::{InvestigateConfig, InvestigateState};
pub use patrol::{PatrolConfig, PatrolState};
pub use wander::{WanderConfig, WanderState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect, Serialize, Deserialize)]
pub enum StateKind {
    Idle,
    Wander,
    Patrol,
    Investigate,
    Follow,
    Flee,
}

impl StateKind {
    pub const ALL: [StateKind; 6] = [
        StateKind::Idle,
        StateKind::Wander,
        StateKind::Patrol,
        StateKind::Investigate,
        StateKind::Follow,
        StateKind::Flee,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Idle => "idle",
            StateKind::Wander => "wander",
            StateKind::Patrol => "patrol",
            StateKind::Investigate => "investigate",
            StateKind::Follow => "follow",
            StateKind::Flee => "flee",
        }
    }

    /// Регистр не важен: "Flee" == "flee"
    pub fn from_name(name: &str) -> Option<StateKind> {
        let name = name.trim();
        StateKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Общая часть каждого state: время входа + запрошенный переход
#[derive(Debug, Clone, Default)]
pub struct StateCore {
    entered_at: f64,
    pending: Option<StateKind>,
}

impl StateCore {
    pub fn reset(&mut self, now: f64) {
        self.entered_at = now;
        self.pending = None;
    }

    pub fn transition_to(&mut self, kind: StateKind) {
        self.pending = Some(kind);
    }

    pub fn take_pending(&mut self) -> Option<StateKind> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<StateKind> {
        self.pending
    }

    pub fn entered_at(&self) -> f64 {
        self.entered_at
    }

    pub fn elapsed(&self, now: f64) -> f64 {
        (now - self.entered_at).max(0.0)
    }
}

/// Поведение одного AI state
pub trait StateBehavior {
    fn kind(&self) -> StateKind;
    fn core(&self) -> &StateCore;
    fn core_mut(&mut self) -> &mut StateCore;

    fn enter(&mut self, ctx: &mut StateContext);
    fn update(&mut self, ctx: &mut StateContext);
    fn exit(&mut self, _ctx: &mut StateContext) {}

    fn on_destination_reached(&mut self, _ctx: &mut StateContext) {}
    fn on_target_lost(&mut self, _ctx: &mut StateContext, _target: Entity) {}
    fn on_obstacle_encountered(&mut self, _ctx: &mut StateContext, _position: Vec3) {}
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatesConfig {
    pub idle: IdleConfig,
    pub wander: WanderConfig,
    pub patrol: PatrolConfig,
    pub investigate: InvestigateConfig,
    pub follow: FollowConfig,
    pub flee: FleeConfig,
}

#[derive(Debug, Clone)]
pub enum AIState {
    Idle(IdleState),
    Wander(WanderState),
    Patrol(PatrolState),
    Investigate(InvestigateState),
    Follow(FollowState),
    Flee(FleeState),
}

impl AIState {
    pub fn from_kind(kind: StateKind, config: &StatesConfig) -> Self {
        match kind {
            StateKind::Idle => AIState::Idle(IdleState::new(config.idle.clone())),
            StateKind::Wander => AIState::Wander(WanderState::new(config.wander.clone())),
            StateKind::Patrol => AIState::Patrol(PatrolState::new(config.patrol.clone())),
            StateKind::Investigate => AIState::Investigate(InvestigateState::new(config.investigate.clone())),
            StateKind::Follow => AIState::Follow(FollowState::new(config.follow.clone())),
            StateKind::Flee => AIState::Flee(FleeState::new(config.flee.clone())),
        }
    }

    pub fn behavior(&self) -> &dyn StateBehavior {
        match self {
            AIState::Idle(state) => state,
            AIState::Wander(state) => state,
            AIState::Patrol(state) => state,
            AIState::Investigate(state) => state,
            AIState::Follow(state) => state,
            AIState::Flee(state) => state,
        }
    }

    pub fn behavior_mut(&mut self) -> &mut dyn StateBehavior {
        match self {
            AIState::Idle(state) => state,
            AIState::Wander(state) => state,
            AIState::Patrol(state) => state,
            AIState::Investigate(state) => state,
            AIState::Follow(state) => state,
            AIState::Flee(state) => state,
        }
    }

    pub fn kind(&self) -> StateKind {
        self.behavior().kind()
    }
}

/// Случайное горизонтальное направление (единичный вектор)
pub(crate) fn random_direction(rng: &mut impl Rng) -> Vec3 {
    let angle = rng.gen_range(0.0..TAU);
    Vec3::new(angle.cos(), 0.0, angle.sin())
}

/// Случайная точка в кольце [min_radius, max_radius] вокруг center (в плоскости XZ)
pub(crate) fn random_point_in_ring(center: Vec3, min_radius: f32, max_radius: f32, rng: &mut impl Rng) -> Vec3 {
    let min_radius = min_radius.max(0.0);
    let max_radius = max_radius.max(min_radius);
    let radius = if max_radius > min_radius {
        rng.gen_range(min_radius..max_radius)
    } else {
        min_radius
    };
    center + random_direction(rng) * radius
}

/// Точки по окружности вокруг center (search pattern), первая под случайным углом
pub(crate) fn ring_points(center: Vec3, radius: f32, count: usize, rng: &mut impl Rng) -> Vec<Vec3> {
    if count == 0 {
        return Vec::new();
    }
    let offset = rng.gen_range(0.0..TAU);
    (0..count)
        .map(|i| {
            let angle = offset + i as f32 * TAU / count as f32;
            center + Vec3::new(angle.cos(), 0.0, angle.sin()) * radius
        })
        .collect()
}
