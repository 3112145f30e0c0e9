//! Wander — случайные точки в кольце вокруг себя

use serde::{Deserialize, Serialize};

use super::{random_point_in_ring, StateBehavior, StateCore, StateKind};
use crate::brain::context::StateContext;
use crate::logger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WanderConfig {
    pub min_radius: f32,
    pub max_radius: f32,
    /// Пауза на точке перед следующей
    pub idle_time: f64,
    /// Не двигаемся и не пришли столько секунд → новая точка
    pub stuck_timeout: f64,
}

impl Default for WanderConfig {
    fn default() -> Self {
        Self {
            min_radius: 5.0,
            max_radius: 15.0,
            idle_time: 2.0,
            stuck_timeout: 3.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WanderState {
    config: WanderConfig,
    core: StateCore,
    wait_until: Option<f64>,
    stationary_since: Option<f64>,
}

impl WanderState {
    pub fn new(config: WanderConfig) -> Self {
        Self {
            config,
            core: StateCore::default(),
            wait_until: None,
            stationary_since: None,
        }
    }

    fn pick_destination(&mut self, ctx: &mut StateContext) {
        let point = random_point_in_ring(
            ctx.facts.position,
            self.config.min_radius,
            self.config.max_radius,
            ctx.rng,
        );
        ctx.motrix.move_to(point);
        self.wait_until = None;
        self.stationary_since = None;
    }
}

impl StateBehavior for WanderState {
    fn kind(&self) -> StateKind {
        StateKind::Wander
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter(&mut self, ctx: &mut StateContext) {
        ctx.motrix.set_running(false);
        self.pick_destination(ctx);
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

        if let Some(until) = self.wait_until {
            if ctx.now >= until {
                self.pick_destination(ctx);
            }
            return;
        }

        // PathFailed сбрасывает destination
        if !ctx.motrix.has_destination() {
            self.pick_destination(ctx);
            return;
        }

        if ctx.facts.has_arrived {
            self.wait_until = Some(ctx.now + self.config.idle_time);
            return;
        }

        if ctx.facts.is_moving {
            self.stationary_since = None;
        } else {
            let since = *self.stationary_since.get_or_insert(ctx.now);
            if ctx.now - since >= self.config.stuck_timeout {
                logger::log(&format!("🚶 Wander: {:?} stuck, picking new point", ctx.self_entity));
                self.pick_destination(ctx);
            }
        }
    }

    fn on_destination_reached(&mut self, ctx: &mut StateContext) {
        self.wait_until = Some(ctx.now + self.config.idle_time);
        self.stationary_since = None;
    }
}
