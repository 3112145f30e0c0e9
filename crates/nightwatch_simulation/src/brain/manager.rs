//! AIStateManager — приоритетный FSM поверх AI states
//!
//! Правила перехода (`set_state`):
//! - неизвестное / выключенное имя → fallback state (warning в лог);
//!   fallback тоже недоступен → `TransitionError::FallbackUnavailable`
//! - тот же state → no-op
//! - `min_state_duration` не истёк → `TransitionError::TooSoon`, КРОМЕ
//!   случая, когда приоритет нового state строго выше (interrupt)
//!
//! `update`: сначала запрос перехода от текущего state, потом его update.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::context::StateContext;
use super::events::BrainEvent;
use super::states::{AIState, StateKind, StatesConfig};
use crate::error::TransitionError;
use crate::events::EventQueue;
use crate::logger;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AIStateManagerConfig {
    pub default_state: String,
    pub fallback_state: String,
    pub min_state_duration: f64,
    pub history_size: usize,
    pub priorities: BTreeMap<StateKind, i32>,
    pub enabled_states: Vec<StateKind>,
}

impl Default for AIStateManagerConfig {
    fn default() -> Self {
        let priorities = StateKind::ALL
            .into_iter()
            .zip([0, 1, 2, 3, 4, 5])
            .collect();

        Self {
            default_state: "idle".to_string(),
            fallback_state: "idle".to_string(),
            min_state_duration: 1.0,
            history_size: 10,
            priorities,
            enabled_states: StateKind::ALL.to_vec(),
        }
    }
}

/// Запись истории переходов
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateTransition {
    pub from: StateKind,
    pub to: StateKind,
    pub at: f64,
}

#[derive(Debug, Clone)]
pub struct AIStateManager {
    config: AIStateManagerConfig,
    states: BTreeMap<StateKind, AIState>,
    current: Option<StateKind>,
    history: VecDeque<StateTransition>,
    events: EventQueue<BrainEvent>,
}

impl AIStateManager {
    pub fn new(config: AIStateManagerConfig, states_config: &StatesConfig) -> Self {
        let states = config
            .enabled_states
            .iter()
            .map(|kind| (*kind, AIState::from_kind(*kind, states_config)))
            .collect();

        Self {
            config,
            states,
            current: None,
            history: VecDeque::new(),
            events: EventQueue::default(),
        }
    }

    pub fn config(&self) -> &AIStateManagerConfig {
        &self.config
    }

    pub fn current_state(&self) -> Option<StateKind> {
        self.current
    }

    pub fn state(&self, kind: StateKind) -> Option<&AIState> {
        self.states.get(&kind)
    }

    pub fn is_registered(&self, kind: StateKind) -> bool {
        self.states.contains_key(&kind)
    }

    pub fn priority(&self, kind: StateKind) -> i32 {
        self.config.priorities.get(&kind).copied().unwrap_or(0)
    }

    /// Сколько секунд в текущем state
    pub fn time_in_state(&self, now: f64) -> f64 {
        self.current
            .and_then(|kind| self.states.get(&kind))
            .map_or(0.0, |state| state.behavior().core().elapsed(now))
    }

    /// Войти в default state, если ещё ни в каком
    pub fn start(&mut self, ctx: &mut StateContext) {
        if self.current.is_some() {
            return;
        }
        let default_state = self.config.default_state.clone();
        if let Err(error) = self.set_state(&default_state, ctx) {
            logger::log_error(&format!("🧠 AIStateManager: cannot start: {}", error));
        }
    }

    /// Запрос перехода по имени. Ok — state, который теперь активен.
    pub fn set_state(&mut self, name: &str, ctx: &mut StateContext) -> Result<StateKind, TransitionError> {
        let target = match StateKind::from_name(name).filter(|kind| self.is_registered(*kind)) {
            Some(kind) => kind,
            None => {
                let fallback = StateKind::from_name(&self.config.fallback_state)
                    .filter(|kind| self.is_registered(*kind))
                    .ok_or_else(|| TransitionError::FallbackUnavailable {
                        requested: name.to_string(),
                        fallback: self.config.fallback_state.clone(),
                    })?;
                logger::log_warning(&format!(
                    "🧠 AIStateManager: unknown state '{}', falling back to '{}'",
                    name, fallback
                ));
                fallback
            }
        };

        if self.current == Some(target) {
            return Ok(target);
        }

        if let Some(current) = self.current {
            let elapsed = self.time_in_state(ctx.now);
            let interrupts = self.priority(target) > self.priority(current);
            if elapsed < self.config.min_state_duration && !interrupts {
                return Err(TransitionError::TooSoon {
                    current,
                    requested: target,
                    elapsed,
                    min_duration: self.config.min_state_duration,
                });
            }
        }

        self.switch_to(target, ctx);
        Ok(target)
    }

    pub fn set_state_kind(&mut self, kind: StateKind, ctx: &mut StateContext) -> Result<StateKind, TransitionError> {
        self.set_state(kind.name(), ctx)
    }

    fn switch_to(&mut self, target: StateKind, ctx: &mut StateContext) {
        let previous = self.current;

        if let Some(previous) = previous {
            if let Some(state) = self.states.get_mut(&previous) {
                state.behavior_mut().exit(ctx);
            }
            self.history.push_back(StateTransition {
                from: previous,
                to: target,
                at: ctx.now,
            });
            while self.history.len() > self.config.history_size {
                self.history.pop_front();
            }
        }

        self.current = Some(target);
        if let Some(state) = self.states.get_mut(&target) {
            let behavior = state.behavior_mut();
            behavior.core_mut().reset(ctx.now);
            behavior.enter(ctx);
        }

        match previous {
            Some(from) => {
                logger::log_info(&format!("🧠 {:?}: {} → {}", ctx.self_entity, from, target));
                self.events.push(BrainEvent::StateChanged { from, to: target });
            }
            None => logger::log(&format!("🧠 {:?}: start in {}", ctx.self_entity, target)),
        }
    }

    /// Один decision tick FSM
    pub fn update(&mut self, ctx: &mut StateContext) {
        self.start(ctx);
        let Some(current) = self.current else {
            return;
        };

        let pending = self
            .states
            .get_mut(&current)
            .and_then(|state| state.behavior_mut().core_mut().take_pending());

        if let Some(requested) = pending {
            match self.set_state_kind(requested, ctx) {
                Ok(active) if active != current => return,
                Ok(_) => {}
                Err(error) => logger::log(&format!("🧠 {:?}: transition rejected: {}", ctx.self_entity, error)),
            }
        }

        if let Some(state) = self.current.and_then(|kind| self.states.get_mut(&kind)) {
            state.behavior_mut().update(ctx);
        }
    }

    // --- Callbacks -------------------------------------------------------

    pub fn on_destination_reached(&mut self, ctx: &mut StateContext) {
        if let Some(state) = self.current_mut() {
            state.behavior_mut().on_destination_reached(ctx);
        }
    }

    pub fn on_target_lost(&mut self, ctx: &mut StateContext, target: Entity) {
        if let Some(state) = self.current_mut() {
            state.behavior_mut().on_target_lost(ctx, target);
        }
    }

    pub fn on_obstacle_encountered(&mut self, ctx: &mut StateContext, position: Vec3) {
        if let Some(state) = self.current_mut() {
            state.behavior_mut().on_obstacle_encountered(ctx, position);
        }
    }

    fn current_mut(&mut self) -> Option<&mut AIState> {
        let kind = self.current?;
        self.states.get_mut(&kind)
    }

    // --- History ---------------------------------------------------------

    /// Переходы, старые первыми
    pub fn history(&self) -> impl Iterator<Item = &StateTransition> {
        self.history.iter()
    }

    /// Был ли NPC в `kind` среди последних `count` предыдущих states
    pub fn was_recently_in(&self, kind: StateKind, count: usize) -> bool {
        self.history.iter().rev().take(count).any(|t| t.from == kind)
    }

    pub fn drain_events(&mut self) -> Vec<BrainEvent> {
        self.events.drain()
    }
}
