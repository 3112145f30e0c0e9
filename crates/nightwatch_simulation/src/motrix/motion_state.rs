//! MotionState — плоский FSM режима передвижения
//!
//! Каждое состояние требует capability (кроме Idle/Fall). Если capability
//! выключена — `set_state` отклоняется. Выключение capability активного
//! состояния роняет NPC в Walk (или Idle, если и ходить нельзя).

use bevy::prelude::*;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::events::MotrixEvent;
use crate::error::MotionError;
use crate::events::EventQueue;
use crate::logger;

bitflags! {
    /// Что этот NPC вообще умеет
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MotionCapabilities: u16 {
        const WALK   = 1 << 0;
        const RUN    = 1 << 1;
        const SPRINT = 1 << 2;
        const CROUCH = 1 << 3;
        const JUMP   = 1 << 4;
        const SWIM   = 1 << 5;
        const CLIMB  = 1 << 6;
        const DASH   = 1 << 7;
    }
}

impl Default for MotionCapabilities {
    fn default() -> Self {
        Self::WALK | Self::RUN | Self::SPRINT | Self::CROUCH | Self::JUMP
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Idle,
    Walk,
    Run,
    Sprint,
    Crouch,
    Jump,
    Fall,
    Swim,
    Climb,
    Dash,
}

impl MotionState {
    /// Множитель base_speed
    pub fn speed_multiplier(&self) -> f32 {
        match self {
            MotionState::Idle => 0.0,
            MotionState::Walk => 1.0,
            MotionState::Run => 1.8,
            MotionState::Sprint => 2.5,
            MotionState::Crouch => 0.5,
            MotionState::Jump => 1.0,
            MotionState::Fall => 0.8,
            MotionState::Swim => 0.6,
            MotionState::Climb => 0.4,
            MotionState::Dash => 3.5,
        }
    }

    /// Capability, без которой состояние недоступно (пустой набор — всегда доступно)
    pub fn required_capability(&self) -> MotionCapabilities {
        match self {
            MotionState::Idle | MotionState::Fall => MotionCapabilities::empty(),
            MotionState::Walk => MotionCapabilities::WALK,
            MotionState::Run => MotionCapabilities::RUN,
            MotionState::Sprint => MotionCapabilities::RUN | MotionCapabilities::SPRINT,
            MotionState::Crouch => MotionCapabilities::CROUCH,
            MotionState::Jump => MotionCapabilities::JUMP,
            MotionState::Swim => MotionCapabilities::SWIM,
            MotionState::Climb => MotionCapabilities::CLIMB,
            MotionState::Dash => MotionCapabilities::DASH,
        }
    }

    /// Состояние сам по себе предполагает движение по земле
    pub fn is_grounded_locomotion(&self) -> bool {
        matches!(
            self,
            MotionState::Walk | MotionState::Run | MotionState::Sprint | MotionState::Crouch | MotionState::Dash
        )
    }

    pub fn is_airborne(&self) -> bool {
        matches!(self, MotionState::Jump | MotionState::Fall)
    }
}

#[derive(Debug, Clone)]
pub struct MotionStateMachine {
    state: MotionState,
    capabilities: MotionCapabilities,
    base_speed: f32,
    events: EventQueue<MotrixEvent>,
}

impl MotionStateMachine {
    pub fn new(base_speed: f32, capabilities: MotionCapabilities) -> Self {
        Self {
            state: MotionState::Idle,
            capabilities,
            base_speed: base_speed.max(0.0),
            events: EventQueue::default(),
        }
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn capabilities(&self) -> MotionCapabilities {
        self.capabilities
    }

    pub fn base_speed(&self) -> f32 {
        self.base_speed
    }

    pub fn can_enter(&self, state: MotionState) -> bool {
        self.capabilities.contains(state.required_capability())
    }

    /// Текущая скорость = base_speed × multiplier
    pub fn speed(&self) -> f32 {
        self.base_speed * self.state.speed_multiplier()
    }

    /// Скорость, которую дало бы состояние (без перехода)
    pub fn speed_for(&self, state: MotionState) -> f32 {
        self.base_speed * state.speed_multiplier()
    }

    pub fn set_state(&mut self, state: MotionState) -> Result<(), MotionError> {
        if !self.can_enter(state) {
            return Err(MotionError::CapabilityDisabled(state));
        }
        self.transition(state);
        Ok(())
    }

    fn transition(&mut self, state: MotionState) {
        if state == self.state {
            return;
        }
        let from = self.state;
        self.state = state;
        logger::log_with_level(
            logger::LogLevel::Debug,
            &format!("🦶 MotionState: {:?} → {:?}", from, state),
        );
        self.events.push(MotrixEvent::MotionStateChanged { from, to: state });
    }

    /// Включить/выключить capability
    pub fn set_capability(&mut self, capability: MotionCapabilities, enabled: bool) {
        self.capabilities.set(capability, enabled);

        if !self.can_enter(self.state) {
            let fallback = if self.can_enter(MotionState::Walk) {
                MotionState::Walk
            } else {
                MotionState::Idle
            };
            self.transition(fallback);
        }
    }

    pub fn drain_events(&mut self) -> Vec<MotrixEvent> {
        self.events.drain()
    }
}
