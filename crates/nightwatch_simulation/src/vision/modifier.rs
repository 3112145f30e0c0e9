//! PerceptionModifier — VisionState + урон глаз + моргание → recognition settings
//!
//! Чистая функция от текущих нарушений. Всегда считается от ОРИГИНАЛЬНЫХ
//! settings, поэтому повторные вызовы не накапливают эффект.

use serde::{Deserialize, Serialize};

use super::recognition::{RecognitionSettings, RecognitionWeights};
use super::state::VisionStateKind;

/// Доля веса, которую съедает полное нарушение
const IMPAIRMENT_WEIGHT_PENALTY: f32 = 0.7;
/// Во сколько раз DarkAdapted усиливает вес света
const DARK_ADAPTED_LIGHT_BOOST: f32 = 1.5;
/// Вклад урона в порог: × (1 + damage·0.5)
const DAMAGE_THRESHOLD_FACTOR: f32 = 0.5;

/// Минимальное нарушение, которое даёт само состояние
pub fn impairment_floor(state: VisionStateKind) -> f32 {
    match state {
        VisionStateKind::Blurred => 0.5,
        VisionStateKind::Dazzled => 0.7,
        VisionStateKind::Obscured => 0.4,
        VisionStateKind::Blind => 1.0,
        VisionStateKind::Normal | VisionStateKind::DarkAdapted | VisionStateKind::Blinking => 0.0,
    }
}

/// Множитель recognition threshold (Blind = фактически недостижимо)
pub fn threshold_multiplier(state: VisionStateKind) -> f32 {
    match state {
        VisionStateKind::Normal => 1.0,
        VisionStateKind::Blurred => 1.3,
        VisionStateKind::DarkAdapted => 1.1,
        VisionStateKind::Dazzled => 1.6,
        VisionStateKind::Obscured => 1.4,
        VisionStateKind::Blinking => 2.0,
        VisionStateKind::Blind => 10.0,
    }
}

/// Вход модификатора
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpairmentInputs {
    pub state: VisionStateKind,
    pub eye_damage: f32,
    pub blinking: bool,
}

impl Default for ImpairmentInputs {
    fn default() -> Self {
        Self {
            state: VisionStateKind::Normal,
            eye_damage: 0.0,
            blinking: false,
        }
    }
}

impl ImpairmentInputs {
    pub fn impairment_factor(&self) -> f32 {
        let damage = self.eye_damage.clamp(0.0, 1.0);
        let blink = if self.blinking { 1.0 } else { 0.0 };
        damage.max(blink).max(impairment_floor(self.state)).clamp(0.0, 1.0)
    }
}

/// Применить нарушения к оригинальным settings
pub fn modify_settings(original: RecognitionSettings, inputs: ImpairmentInputs) -> RecognitionSettings {
    let impairment = inputs.impairment_factor();
    let scale = 1.0 - impairment * IMPAIRMENT_WEIGHT_PENALTY;

    let mut weights = RecognitionWeights {
        fov: original.weights.fov * scale,
        los: original.weights.los * scale,
        light: original.weights.light * scale,
    };
    if inputs.state == VisionStateKind::DarkAdapted {
        weights.light *= DARK_ADAPTED_LIGHT_BOOST;
    }
    let weights = weights.normalized().unwrap_or(original.weights);

    let damage = inputs.eye_damage.clamp(0.0, 1.0);
    let threshold = original.threshold
        * threshold_multiplier(inputs.state)
        * (1.0 + damage * DAMAGE_THRESHOLD_FACTOR);

    RecognitionSettings { weights, threshold }
}

/// Держит последние входы; пересчитывает только при изменении
#[derive(Debug, Clone, Default)]
pub struct PerceptionModifier {
    last_inputs: Option<ImpairmentInputs>,
    current: Option<RecognitionSettings>,
}

impl PerceptionModifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Some(settings)` если входы изменились (нужно применить к recognition)
    pub fn refresh(&mut self, original: RecognitionSettings, inputs: ImpairmentInputs) -> Option<RecognitionSettings> {
        if self.last_inputs == Some(inputs) {
            return None;
        }
        let settings = modify_settings(original, inputs);
        self.last_inputs = Some(inputs);
        self.current = Some(settings);
        Some(settings)
    }

    /// Сбросить кэш (после смены оригинальных settings)
    pub fn invalidate(&mut self) {
        self.last_inputs = None;
    }

    pub fn impairment_factor(&self) -> f32 {
        self.last_inputs.map_or(0.0, |i| i.impairment_factor())
    }

    pub fn current_settings(&self) -> Option<RecognitionSettings> {
        self.current
    }
}
