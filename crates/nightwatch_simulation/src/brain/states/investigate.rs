//! Investigate — идём к самому важному POI и осматриваемся вокруг
//!
//! 1. выбираем непосещённый POI с наибольшим приоритетом, идём в центр
//! 2. пауза `point_delay`, затем обход кольца `search_points` точек
//! 3. POI → visited, выбираем следующий; больше нет → Wander
//!
//! Появившаяся цель перебивает POI только если её приоритет
//! (confidence × target_priority_scale) выше приоритета POI.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{ring_points, StateBehavior, StateCore, StateKind};
use crate::brain::context::StateContext;
use crate::logger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigateConfig {
    pub search_radius: f32,
    pub search_points: usize,
    /// Пауза на каждой точке осмотра
    pub point_delay: f64,
    pub target_priority_scale: f32,
}

impl Default for InvestigateConfig {
    fn default() -> Self {
        Self {
            search_radius: 3.0,
            search_points: 6,
            point_delay: 1.5,
            target_priority_scale: 10.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InvestigateState {
    config: InvestigateConfig,
    core: StateCore,
    poi: Option<u32>,
    poi_priority: f32,
    /// [центр POI, точки кольца...]
    route: Vec<Vec3>,
    route_index: usize,
    next_point_at: Option<f64>,
}

impl InvestigateState {
    pub fn new(config: InvestigateConfig) -> Self {
        Self {
            config,
            core: StateCore::default(),
            poi: None,
            poi_priority: 0.0,
            route: Vec::new(),
            route_index: 0,
            next_point_at: None,
        }
    }

    pub fn current_poi(&self) -> Option<u32> {
        self.poi
    }

    fn select_poi(&mut self, ctx: &mut StateContext) {
        self.route.clear();
        self.route_index = 0;
        self.next_point_at = None;

        let Some(poi) = ctx.notes.best_point_of_interest().copied() else {
            self.poi = None;
            self.poi_priority = 0.0;
            self.core.transition_to(StateKind::Wander);
            return;
        };

        self.poi = Some(poi.id);
        self.poi_priority = poi.priority;
        self.route.push(poi.position);
        self.route.extend(ring_points(
            poi.position,
            self.config.search_radius,
            self.config.search_points,
            ctx.rng,
        ));

        logger::log(&format!(
            "🔍 Investigate: POI #{} at {:?} (priority {:.1})",
            poi.id, poi.position, poi.priority
        ));
        ctx.motrix.move_to(poi.position);
    }

    /// Следующая точка маршрута или завершение POI
    fn advance(&mut self, ctx: &mut StateContext) {
        self.next_point_at = None;
        self.route_index += 1;

        match self.route.get(self.route_index).copied() {
            Some(point) => ctx.motrix.move_to(point),
            None => {
                if let Some(id) = self.poi.take() {
                    ctx.notes.mark_visited(id);
                    ctx.notes.prune_visited();
                }
                self.select_poi(ctx);
            }
        }
    }
}

impl StateBehavior for InvestigateState {
    fn kind(&self) -> StateKind {
        StateKind::Investigate
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn enter(&mut self, ctx: &mut StateContext) {
        ctx.motrix.set_running(false);
        self.select_poi(ctx);
    }

    fn update(&mut self, ctx: &mut StateContext) {
        if let Some(target) = ctx.facts.strongest_visible() {
            if target.confidence * self.config.target_priority_scale > self.poi_priority {
                self.core.transition_to(StateKind::Follow);
                return;
            }
        }

        if self.poi.is_none() {
            self.select_poi(ctx);
            return;
        }

        if let Some(at) = self.next_point_at {
            if ctx.now >= at {
                self.advance(ctx);
            }
            return;
        }

        if ctx.facts.has_arrived {
            self.next_point_at = Some(ctx.now + self.config.point_delay);
        } else if !ctx.motrix.has_destination() {
            // Точка осмотра недостижима — следующая
            self.advance(ctx);
        }
    }

    fn on_destination_reached(&mut self, ctx: &mut StateContext) {
        if self.poi.is_some() && self.next_point_at.is_none() {
            self.next_point_at = Some(ctx.now + self.config.point_delay);
        }
    }
}
