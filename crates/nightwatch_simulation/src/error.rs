//! Typed errors для отклонённых операций.
//!
//! Ни одна из них не фатальна: вызывающий код деградирует (остаётся в текущем
//! состоянии, выбирает другую цель, идёт по прямой).

use thiserror::Error;

use crate::brain::StateKind;
use crate::motrix::MotionState;

/// Отказ AIStateManager::set_state
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    /// Ни запрошенное состояние, ни fallback не зарегистрированы
    #[error("state '{requested}' is unknown and fallback '{fallback}' is unavailable")]
    FallbackUnavailable { requested: String, fallback: String },

    /// min_state_duration не истёк, а приоритет нового состояния не выше
    #[error("cannot leave {current:?} for {requested:?}: {elapsed:.2}s < min {min_duration:.2}s")]
    TooSoon {
        current: StateKind,
        requested: StateKind,
        elapsed: f64,
        min_duration: f64,
    },
}

/// Отказ MotionStateMachine::set_state
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum MotionError {
    #[error("motion state {0:?} requires a disabled capability")]
    CapabilityDisabled(MotionState),
}

/// Отказ Navigation::request_path
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum NavigationError {
    #[error("no path from {from:?} to {to:?}")]
    NoPath {
        from: bevy::math::Vec3,
        to: bevy::math::Vec3,
    },
}
