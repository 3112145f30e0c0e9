//! Vision events — наружу для game logic / UI / audio

use bevy::prelude::*;

use super::state::VisionStateKind;

#[derive(Debug, Clone, PartialEq)]
pub enum VisionEvent {
    /// Confidence пересекла recognition_threshold снизу вверх
    TargetRecognized { target: Entity, confidence: f32 },

    /// Confidence упала ниже порога потери (или цель исчезла из мира)
    TargetLost { target: Entity },

    /// Цель в FOV или в LOS, но ниже порога (каждый recognition update)
    TargetPartiallyDetected { target: Entity, confidence: f32 },

    /// Новая запись в VisualMemory
    TargetRemembered { target: Entity, position: Vec3 },

    /// Confidence памяти впервые упала ниже 0.5
    MemoryDeteriorated { target: Entity, confidence: f32 },

    /// Запись памяти удалена (всегда ДО удаления)
    TargetForgotten { target: Entity },

    VisionStateChanged { from: VisionStateKind, to: VisionStateKind },

    EyeDamageChanged { level: f32 },

    BlinkStarted,

    BlinkEnded,
}
