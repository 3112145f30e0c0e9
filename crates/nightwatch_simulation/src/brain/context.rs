//! StateContext — всё, что AI state видит за один decision tick

use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::blackboard::{BlackboardFacts, BlackboardNotes};
use crate::motrix::Motrix;
use crate::vision::Vision;
use crate::world::PhysicsQuery;

/// Факты только на чтение, Motrix на запись (команды движения),
/// Vision только на чтение (tick уже прошёл в Brain).
pub struct StateContext<'a> {
    pub now: f64,
    pub self_entity: Entity,
    pub facts: &'a BlackboardFacts,
    pub notes: &'a mut BlackboardNotes,
    pub motrix: &'a mut Motrix,
    pub vision: &'a Vision,
    pub physics: &'a dyn PhysicsQuery,
    pub rng: &'a mut ChaCha8Rng,
}
