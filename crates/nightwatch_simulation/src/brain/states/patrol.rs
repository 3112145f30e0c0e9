//! Patrol — обход точек туда-обратно (ping-pong)
//!
//! На дальнем конце с шансом `restart_chance` начинаем заново с 0
//! вместо разворота.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{StateBehavior, StateCore, StateKind};
use crate::brain::blackboard::BlackboardNotes;
use crate::brain::context::StateContext;
use crate::logger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatrolConfig {
    pub wait_time: f64,
    pub restart_chance: f64,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            wait_time: 2.0,
            restart_chance: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PatrolState {
    config: PatrolConfig,
    core: StateCore,
    wait_until: Option<f64>,
}

impl PatrolState {
    pub fn new(config: PatrolConfig) -> Self {
        Self {
            config,
            core: StateCore::default(),
            wait_until: None,
        }
    }

    fn go_to_current(&self, ctx: &mut StateContext) {
        if let Some(point) = ctx.notes.current_patrol_point() {
            ctx.motrix.move_to(point);
        }
    }
}

/// Следующий индекс патруля (ping-pong с шансом рестарта)
pub(crate) fn advance_patrol_index(notes: &mut BlackboardNotes, restart_chance: f64, rng: &mut impl Rng) {
    let len = notes.patrol_points().len();
    if len <= 1 {
        notes.patrol_index = 0;
        return;
    }

    let index = notes.patrol_index.min(len - 1);
    if notes.patrol_forward {
        if index + 1 < len {
            notes.patrol_index = index + 1;
        } else if rng.gen_bool(restart_chance.clamp(0.0, 1.0)) {
            notes.patrol_index = 0;
        } else {
            notes.patrol_forward = false;
            notes.patrol_index = index - 1;
        }
    } else if index > 0 {
        notes.patrol_index = index - 1;
    } else {
        notes.patrol_forward = true;
        notes.patrol_index = 1;
    }
}

impl StateBehavior for PatrolState {
    fn kind(&self) -> StateKind {
        StateKind::Patrol
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter(&mut self, ctx: &mut StateContext) {
        self.wait_until = None;
        let len = ctx.notes.patrol_points().len();
        if len == 0 {
            self.core.transition_to(StateKind::Wander);
            return;
        }
        if ctx.notes.patrol_index >= len {
            ctx.notes.patrol_index = 0;
        }
        ctx.motrix.set_running(false);
        self.go_to_current(ctx);
    }

    fn update(&mut self, ctx: &mut StateContext) {
        if ctx.facts.current_target.is_some() {
            self.core.transition_to(StateKind::Follow);
            return;
        }
        if ctx.notes.patrol_points().is_empty() {
            self.core.transition_to(StateKind::Wander);
            return;
        }

        if let Some(until) = self.wait_until {
            if ctx.now >= until {
                self.wait_until = None;
                advance_patrol_index(ctx.notes, self.config.restart_chance, ctx.rng);
                self.go_to_current(ctx);
            }
            return;
        }

        if ctx.facts.has_arrived {
            self.wait_until = Some(ctx.now + self.config.wait_time);
            return;
        }

        // Точка недостижима → пропускаем её
        if !ctx.motrix.has_destination() {
            logger::log(&format!(
                "🛡️ Patrol: point #{} unreachable, skipping",
                ctx.notes.patrol_index
            ));
            advance_patrol_index(ctx.notes, self.config.restart_chance, ctx.rng);
            self.go_to_current(ctx);
        }
    }

    fn on_destination_reached(&mut self, ctx: &mut StateContext) {
        self.wait_until = Some(ctx.now + self.config.wait_time);
    }
}
