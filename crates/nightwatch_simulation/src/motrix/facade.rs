//! Motrix — единый movement API для AI
//!
//! AI states отдают команды (`move_to`, `stop`, `face_direction`, ...),
//! а физический шаг (`physics_step`, каждый FixedUpdate) их исполняет:
//!
//! 1. отложенный запрос пути → Navigation (без Navigation — прямая линия)
//! 2. steering по waypoints, детект прибытия (DestinationReached один раз)
//! 3. ObstacleAvoidance: scan + смешивание направлений
//! 4. прыжок, Locomotion.drive, поворот facing

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::avoidance::{ObstacleAvoidance, ObstacleAvoidanceConfig};
use super::events::MotrixEvent;
use super::locomotion::{Locomotion, LocomotionConfig};
use super::motion_state::{MotionCapabilities, MotionState, MotionStateMachine};
use super::navigation::{Navigation, NavigationConfig};
use crate::error::MotionError;
use crate::events::EventQueue;
use crate::world::{flatten, horizontal_distance, BodyController, Pathfinder, PhysicsQuery};

/// Горизонтальная скорость, ниже которой тело считается стоящим (м/с)
const MOVING_SPEED_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotrixConfig {
    pub capabilities: MotionCapabilities,
    pub locomotion: LocomotionConfig,
    pub navigation: NavigationConfig,
    pub avoidance: ObstacleAvoidanceConfig,
    /// false — ходим по прямой без pathfinder'а
    pub navigation_enabled: bool,
    pub avoidance_enabled: bool,
}

impl Default for MotrixConfig {
    fn default() -> Self {
        Self {
            capabilities: MotionCapabilities::default(),
            locomotion: LocomotionConfig::default(),
            navigation: NavigationConfig::default(),
            avoidance: ObstacleAvoidanceConfig::default(),
            navigation_enabled: true,
            avoidance_enabled: true,
        }
    }
}

#[derive(Component, Debug, Clone)]
pub struct Motrix {
    config: MotrixConfig,
    motion: MotionStateMachine,
    navigation: Option<Navigation>,
    avoidance: Option<ObstacleAvoidance>,
    locomotion: Locomotion,
    destination: Option<Vec3>,
    /// Destination, для которой путь ещё не запрошен
    pending_path: Option<Vec3>,
    arrived: bool,
    running: bool,
    target_facing: Option<Vec3>,
    pending_jump: bool,
    position: Vec3,
    velocity: Vec3,
    events: EventQueue<MotrixEvent>,
}

impl Motrix {
    pub fn new(config: MotrixConfig) -> Self {
        let navigation = config
            .navigation_enabled
            .then(|| Navigation::new(config.navigation.clone()));
        let avoidance = config
            .avoidance_enabled
            .then(|| ObstacleAvoidance::new(config.avoidance.clone()));

        Self {
            motion: MotionStateMachine::new(config.locomotion.base_speed, config.capabilities),
            locomotion: Locomotion::new(config.locomotion.clone()),
            navigation,
            avoidance,
            destination: None,
            pending_path: None,
            arrived: false,
            running: false,
            target_facing: None,
            pending_jump: false,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            events: EventQueue::default(),
            config,
        }
    }

    pub fn config(&self) -> &MotrixConfig {
        &self.config
    }

    // --- Commands --------------------------------------------------------

    /// Идти к точке (путь резолвится на следующем physics step)
    pub fn move_to(&mut self, destination: Vec3) {
        self.destination = Some(destination);
        self.pending_path = Some(destination);
        self.arrived = false;
        self.target_facing = None;
        let moving = self.moving_state();
        self.apply_motion_state(moving);
    }

    pub fn stop(&mut self) {
        self.destination = None;
        self.pending_path = None;
        if let Some(navigation) = self.navigation.as_mut() {
            navigation.cancel();
        }
        self.apply_motion_state(MotionState::Idle);
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
        if self.has_destination() && !self.arrived {
            let moving = self.moving_state();
            self.apply_motion_state(moving);
        }
    }

    pub fn set_motion_state(&mut self, state: MotionState) -> Result<(), MotionError> {
        self.motion.set_state(state)?;
        self.collect_events();
        Ok(())
    }

    pub fn set_capability(&mut self, capability: MotionCapabilities, enabled: bool) {
        self.motion.set_capability(capability, enabled);
        self.collect_events();
    }

    /// Держать facing в направлении (перекрывает направление движения)
    pub fn face_direction(&mut self, direction: Vec3) {
        self.target_facing = flatten(direction).try_normalize();
    }

    pub fn look_at(&mut self, point: Vec3) {
        self.face_direction(point - self.position);
    }

    pub fn clear_facing(&mut self) {
        self.target_facing = None;
    }

    pub fn jump(&mut self) {
        self.pending_jump = true;
    }

    /// Синхронизировать позицию с телом без шага (спавн)
    pub fn sync_body(&mut self, position: Vec3, velocity: Vec3) {
        self.position = position;
        self.velocity = velocity;
    }

    fn moving_state(&self) -> MotionState {
        if self.running && self.motion.can_enter(MotionState::Run) {
            MotionState::Run
        } else if self.motion.can_enter(MotionState::Walk) {
            MotionState::Walk
        } else {
            MotionState::Idle
        }
    }

    fn apply_motion_state(&mut self, state: MotionState) {
        // Недоступное состояние = остаёмся в текущем; moving_state уже учёл capabilities
        if self.motion.set_state(state).is_ok() {
            self.collect_events();
        }
    }

    // --- Physics step ----------------------------------------------------

    pub fn physics_step(
        &mut self,
        now: f64,
        dt: f32,
        self_entity: Entity,
        body: &mut dyn BodyController,
        physics: &dyn PhysicsQuery,
        pathfinder: &dyn Pathfinder,
    ) {
        let position = body.position();
        self.position = position;

        self.resolve_pending_path(pathfinder, position);
        let mut desired = self.steer(position);

        if let Some(avoidance) = self.avoidance.as_mut() {
            let travel = if desired != Vec3::ZERO {
                desired
            } else {
                self.locomotion.facing()
            };
            avoidance.scan(physics, self_entity, position, travel, now);
            if desired != Vec3::ZERO {
                desired = avoidance.avoid(desired, dt);
            }
        }

        if self.pending_jump {
            self.pending_jump = false;
            if self.motion.can_enter(MotionState::Jump) && self.locomotion.jump(body) {
                self.apply_motion_state(MotionState::Jump);
            }
        }
        self.update_airborne_state(body);

        let speed = if desired == Vec3::ZERO { 0.0 } else { self.motion.speed() };
        self.locomotion.drive(body, desired, speed, dt);

        if let Some(facing) = self.target_facing.or((desired != Vec3::ZERO).then_some(desired)) {
            self.locomotion.face(facing, dt);
        }

        self.velocity = body.velocity();
        self.collect_events();
    }

    fn resolve_pending_path(&mut self, pathfinder: &dyn Pathfinder, position: Vec3) {
        let Some(destination) = self.pending_path.take() else {
            return;
        };
        let Some(navigation) = self.navigation.as_mut() else {
            return;
        };
        if navigation.request_path(pathfinder, position, destination).is_err() {
            self.destination = None;
            self.apply_motion_state(MotionState::Idle);
        }
    }

    /// Направление движения; ZERO если стоим или уже пришли
    fn steer(&mut self, position: Vec3) -> Vec3 {
        let Some(destination) = self.destination else {
            return Vec3::ZERO;
        };
        if self.arrived {
            return Vec3::ZERO;
        }

        let arrival_distance = self.config.navigation.arrival_distance;
        let direction = match self.navigation.as_mut() {
            Some(navigation) => navigation.steer(position),
            None => flatten(destination - position).try_normalize(),
        };

        let close_enough = horizontal_distance(position, destination) <= arrival_distance;
        match direction {
            Some(direction) if !close_enough => direction,
            _ => {
                self.arrived = true;
                self.events.push(MotrixEvent::DestinationReached { position: destination });
                self.apply_motion_state(MotionState::Idle);
                Vec3::ZERO
            }
        }
    }

    fn update_airborne_state(&mut self, body: &dyn BodyController) {
        let state = self.motion.state();
        if body.is_grounded() {
            // Только что прыгнули: тело ещё на земле, но уже летит вверх
            if state.is_airborne() && body.velocity().y <= 0.0 {
                let next = if self.has_destination() && !self.arrived {
                    self.moving_state()
                } else {
                    MotionState::Idle
                };
                self.apply_motion_state(next);
            }
        } else if state != MotionState::Jump && body.velocity().y < 0.0 {
            self.apply_motion_state(MotionState::Fall);
        }
    }

    fn collect_events(&mut self) {
        self.events.extend(self.motion.drain_events());
        if let Some(navigation) = self.navigation.as_mut() {
            self.events.extend(navigation.drain_events());
        }
        if let Some(avoidance) = self.avoidance.as_mut() {
            self.events.extend(avoidance.drain_events());
        }
    }

    // --- Queries ---------------------------------------------------------

    pub fn destination(&self) -> Option<Vec3> {
        self.destination
    }

    pub fn has_destination(&self) -> bool {
        self.destination.is_some()
    }

    pub fn has_arrived(&self) -> bool {
        self.destination.is_some() && self.arrived
    }

    /// Тело реально движется по горизонтали
    pub fn is_moving(&self) -> bool {
        flatten(self.velocity).length() > MOVING_SPEED_THRESHOLD
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn facing(&self) -> Vec3 {
        self.locomotion.facing()
    }

    pub fn target_facing(&self) -> Option<Vec3> {
        self.target_facing
    }

    pub fn is_path_blocked(&self) -> bool {
        self.avoidance.as_ref().is_some_and(|a| a.is_path_blocked())
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion.state()
    }

    pub fn speed(&self) -> f32 {
        self.motion.speed()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    pub fn avoidance(&self) -> Option<&ObstacleAvoidance> {
        self.avoidance.as_ref()
    }

    pub fn drain_events(&mut self) -> Vec<MotrixEvent> {
        self.collect_events();
        self.events.drain()
    }
}
