//! Idle — стоим, иногда осматриваемся

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{random_direction, StateBehavior, StateCore, StateKind};
use crate::brain::context::StateContext;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdleConfig {
    /// Дольше этого стоять скучно → Wander
    pub max_idle_time: f64,
    pub look_interval: f64,
    /// Шанс повернуться на каждом look_interval
    pub look_chance: f64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            max_idle_time: 5.0,
            look_interval: 1.5,
            look_chance: 0.4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdleState {
    config: IdleConfig,
    core: StateCore,
    next_look_at: f64,
}

impl IdleState {
    pub fn new(config: IdleConfig) -> Self {
        Self {
            config,
            core: StateCore::default(),
            next_look_at: 0.0,
        }
    }
}

impl StateBehavior for IdleState {
    fn kind(&self) -> StateKind {
        StateKind::Idle
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter(&mut self, ctx: &mut StateContext) {
        ctx.motrix.stop();
        self.next_look_at = ctx.now + self.config.look_interval;
    }

    fn update(&mut self, ctx: &mut StateContext) {
        if ctx.facts.current_target.is_some() {
            self.core.transition_to(StateKind::Follow);
            return;
        }
        if ctx.notes.best_point_of_interest().is_some() {
            self.core.transition_to(StateKind::Investigate);
            return;
        }
        if self.core.elapsed(ctx.now) >= self.config.max_idle_time {
            self.core.transition_to(StateKind::Wander);
            return;
        }

        if ctx.now >= self.next_look_at {
            self.next_look_at = ctx.now + self.config.look_interval;
            if ctx.rng.gen_bool(self.config.look_chance.clamp(0.0, 1.0)) {
                let direction = random_direction(ctx.rng);
                ctx.motrix.face_direction(direction);
            }
        }
    }

    fn exit(&mut self, ctx: &mut StateContext) {
        ctx.motrix.clear_facing();
    }
}
