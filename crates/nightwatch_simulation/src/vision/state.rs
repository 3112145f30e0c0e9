//! VisionState — FSM перцептивных нарушений
//!
//! Normal ⇄ Blurred/Dazzled (auto-revert по таймеру), DarkAdapted (по свету),
//! Obscured (дым/туман), Blinking (моргание), Blind (урон глазам).
//!
//! Отложенные переходы = данные (`fire_at`), не корутины:
//! - revert Blurred/Dazzled → Normal штампуется epoch'ом; любой переход
//!   увеличивает epoch, и устаревший revert молча отбрасывается
//! - DarkAdapted через dark_adapt_duration после падения света; отменяется
//!   если свет вернулся или NPC ослеп
//!
//! Blind блокирует восприятие, но не терминален для FSM (лечение → Normal).

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::events::VisionEvent;
use crate::events::EventQueue;
use crate::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum VisionStateKind {
    #[default]
    Normal,
    Blurred,
    DarkAdapted,
    Dazzled,
    Obscured,
    Blinking,
    Blind,
}

impl VisionStateKind {
    /// Радиус шума позиций, которые NPC "помнит" в этом состоянии (метры)
    pub fn position_uncertainty(&self) -> f32 {
        match self {
            VisionStateKind::Normal => 0.0,
            VisionStateKind::Blurred => 1.0,
            VisionStateKind::DarkAdapted => 0.5,
            VisionStateKind::Dazzled => 2.0,
            VisionStateKind::Obscured => 1.5,
            VisionStateKind::Blinking => 0.25,
            VisionStateKind::Blind => 3.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VisionStateKind::Normal => "normal",
            VisionStateKind::Blurred => "blurred",
            VisionStateKind::DarkAdapted => "dark_adapted",
            VisionStateKind::Dazzled => "dazzled",
            VisionStateKind::Obscured => "obscured",
            VisionStateKind::Blinking => "blinking",
            VisionStateKind::Blind => "blind",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkConfig {
    pub enabled: bool,
    pub interval_min: f64,
    pub interval_max: f64,
    pub duration: f64,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_min: 3.0,
            interval_max: 6.0,
            duration: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionStateConfig {
    pub blur_duration: f64,
    pub dazzle_duration: f64,
    pub dark_adapt_duration: f64,
    /// Свет ниже → через dark_adapt_duration DarkAdapted
    pub dark_threshold: f32,
    /// Свет выше в DarkAdapted → сразу Dazzled
    pub bright_threshold: f32,
    /// Свет выше в DarkAdapted → обратно Normal (плавное возвращение)
    pub light_adapt_threshold: f32,
    pub blind_damage_threshold: f32,
    /// Урон ниже → Blind снимается
    pub blind_recovery_threshold: f32,
    pub blur_damage_threshold: f32,
    /// Пассивное восстановление глаз (единиц урона в секунду)
    pub eye_heal_rate: f32,
    pub blink: BlinkConfig,
}

impl Default for VisionStateConfig {
    fn default() -> Self {
        Self {
            blur_duration: 2.0,
            dazzle_duration: 1.5,
            dark_adapt_duration: 3.0,
            dark_threshold: 0.2,
            bright_threshold: 0.8,
            light_adapt_threshold: 0.5,
            blind_damage_threshold: 1.0,
            blind_recovery_threshold: 0.5,
            blur_damage_threshold: 0.2,
            eye_heal_rate: 0.05,
            blink: BlinkConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RevertTimer {
    fire_at: f64,
    epoch: u64,
}

#[derive(Debug, Clone, Copy)]
struct BlinkCycle {
    next_blink_at: f64,
    ends_at: Option<f64>,
    resume_state: VisionStateKind,
}

#[derive(Debug, Clone)]
pub struct VisionStateMachine {
    config: VisionStateConfig,
    state: VisionStateKind,
    previous: VisionStateKind,
    entered_at: f64,
    epoch: u64,
    revert: Option<RevertTimer>,
    pending_dark_at: Option<f64>,
    eye_damage: f32,
    blink: BlinkCycle,
    last_update: Option<f64>,
    rng: ChaCha8Rng,
    events: EventQueue<VisionEvent>,
}

impl VisionStateMachine {
    pub fn new(config: VisionStateConfig, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let first_blink = Self::blink_interval(&config.blink, &mut rng);
        Self {
            config,
            state: VisionStateKind::Normal,
            previous: VisionStateKind::Normal,
            entered_at: 0.0,
            epoch: 0,
            revert: None,
            pending_dark_at: None,
            eye_damage: 0.0,
            blink: BlinkCycle {
                next_blink_at: first_blink,
                ends_at: None,
                resume_state: VisionStateKind::Normal,
            },
            last_update: None,
            rng,
            events: EventQueue::default(),
        }
    }

    fn blink_interval(config: &BlinkConfig, rng: &mut ChaCha8Rng) -> f64 {
        let min = config.interval_min.max(0.01);
        let max = config.interval_max.max(min);
        if max > min {
            rng.gen_range(min..max)
        } else {
            min
        }
    }

    pub fn config(&self) -> &VisionStateConfig {
        &self.config
    }

    pub fn state(&self) -> VisionStateKind {
        self.state
    }

    pub fn previous_state(&self) -> VisionStateKind {
        self.previous
    }

    pub fn entered_at(&self) -> f64 {
        self.entered_at
    }

    pub fn eye_damage(&self) -> f32 {
        self.eye_damage
    }

    pub fn is_blinking(&self) -> bool {
        self.blink.ends_at.is_some()
    }

    pub fn is_perception_blocked(&self) -> bool {
        self.state == VisionStateKind::Blind
    }

    pub fn position_uncertainty(&self) -> f32 {
        self.state.position_uncertainty()
    }

    /// Есть ли запланированная адаптация к темноте
    pub fn is_dark_adaptation_pending(&self) -> bool {
        self.pending_dark_at.is_some()
    }

    /// Состояние без учёта моргания
    fn base_state(&self) -> VisionStateKind {
        if self.state == VisionStateKind::Blinking {
            self.blink.resume_state
        } else {
            self.state
        }
    }

    pub fn drain_events(&mut self) -> Vec<VisionEvent> {
        self.events.drain()
    }

    /// Явный переход (flash-bang → Dazzled, скрипт → Blind, ...)
    pub fn set_state(&mut self, new_state: VisionStateKind, now: f64) -> bool {
        if self.is_blinking() && new_state != VisionStateKind::Blinking {
            self.finish_blink(now, false);
        }
        self.transition(new_state, now)
    }

    fn transition(&mut self, new_state: VisionStateKind, now: f64) -> bool {
        if new_state == self.state {
            return false;
        }

        let from = self.state;
        self.previous = from;
        self.state = new_state;
        self.entered_at = now;
        self.epoch += 1;
        self.revert = None;

        match new_state {
            VisionStateKind::Blurred => {
                self.revert = Some(RevertTimer {
                    fire_at: now + self.config.blur_duration,
                    epoch: self.epoch,
                });
            }
            VisionStateKind::Dazzled => {
                self.revert = Some(RevertTimer {
                    fire_at: now + self.config.dazzle_duration,
                    epoch: self.epoch,
                });
            }
            VisionStateKind::Blind | VisionStateKind::DarkAdapted => {
                self.pending_dark_at = None;
            }
            _ => {}
        }

        logger::log(&format!("👁️ VisionState: {} → {}", from.name(), new_state.name()));
        self.events.push(VisionEvent::VisionStateChanged { from, to: new_state });
        true
    }

    /// Новый sample освещённости вокруг NPC
    pub fn update_light(&mut self, level: f32, now: f64) {
        let level = level.clamp(0.0, 1.0);
        let base = self.base_state();

        if base == VisionStateKind::Blind {
            self.pending_dark_at = None;
            return;
        }

        // Не только на спуске через порог: после Blind в темноте таймер тоже нужен
        if level < self.config.dark_threshold {
            if base != VisionStateKind::DarkAdapted && self.pending_dark_at.is_none() {
                self.pending_dark_at = Some(now + self.config.dark_adapt_duration);
            }
            return;
        }

        // Свет вернулся — отложенная адаптация отменяется
        self.pending_dark_at = None;

        if base == VisionStateKind::DarkAdapted {
            if level > self.config.bright_threshold {
                self.finish_blink(now, false);
                self.transition(VisionStateKind::Dazzled, now);
            } else if level >= self.config.light_adapt_threshold {
                self.finish_blink(now, false);
                self.transition(VisionStateKind::Normal, now);
            }
        }
    }

    /// Урон глазам (0..1 накопительно)
    pub fn apply_eye_damage(&mut self, amount: f32, now: f64) {
        if amount <= 0.0 {
            return;
        }
        self.eye_damage = (self.eye_damage + amount).clamp(0.0, 1.0);
        self.events.push(VisionEvent::EyeDamageChanged { level: self.eye_damage });

        if self.eye_damage >= self.config.blind_damage_threshold {
            self.set_state(VisionStateKind::Blind, now);
        } else if self.eye_damage >= self.config.blur_damage_threshold
            && matches!(
                self.base_state(),
                VisionStateKind::Normal | VisionStateKind::DarkAdapted | VisionStateKind::Blurred
            )
        {
            // Повторный урон в Blurred перезапускает таймер
            if self.state == VisionStateKind::Blurred {
                self.revert = Some(RevertTimer {
                    fire_at: now + self.config.blur_duration,
                    epoch: self.epoch,
                });
            } else {
                self.set_state(VisionStateKind::Blurred, now);
            }
        }
    }

    pub fn heal_eyes(&mut self, amount: f32, now: f64) {
        if amount <= 0.0 || self.eye_damage <= 0.0 {
            return;
        }
        self.eye_damage = (self.eye_damage - amount).clamp(0.0, 1.0);
        self.events.push(VisionEvent::EyeDamageChanged { level: self.eye_damage });
        self.check_recovery(now);
    }

    fn check_recovery(&mut self, now: f64) {
        if self.state == VisionStateKind::Blind && self.eye_damage < self.config.blind_recovery_threshold {
            self.transition(VisionStateKind::Normal, now);
        }
    }

    pub fn set_obscured(&mut self, obscured: bool, now: f64) {
        match (obscured, self.base_state()) {
            (true, VisionStateKind::Blind) | (true, VisionStateKind::Obscured) => {}
            (true, _) => {
                self.set_state(VisionStateKind::Obscured, now);
            }
            (false, VisionStateKind::Obscured) => {
                self.set_state(VisionStateKind::Normal, now);
            }
            (false, _) => {}
        }
    }

    /// Таймеры: revert, dark adaptation, passive healing, blink cycle
    pub fn update(&mut self, now: f64) {
        let dt = self.last_update.map_or(0.0, |last| (now - last).max(0.0));
        self.last_update = Some(now);

        if self.eye_damage > 0.0 && dt > 0.0 {
            self.eye_damage = (self.eye_damage - self.config.eye_heal_rate * dt as f32).max(0.0);
            if self.eye_damage == 0.0 {
                self.events.push(VisionEvent::EyeDamageChanged { level: 0.0 });
            }
            self.check_recovery(now);
        }

        if let Some(timer) = self.revert {
            if now >= timer.fire_at {
                self.revert = None;
                let still_current = timer.epoch == self.epoch
                    && matches!(self.state, VisionStateKind::Blurred | VisionStateKind::Dazzled);
                if still_current {
                    self.transition(VisionStateKind::Normal, now);
                }
            }
        }

        if let Some(fire_at) = self.pending_dark_at {
            if now >= fire_at {
                self.pending_dark_at = None;
                match self.state {
                    VisionStateKind::Blind | VisionStateKind::DarkAdapted => {}
                    VisionStateKind::Blinking => self.blink.resume_state = VisionStateKind::DarkAdapted,
                    _ => {
                        self.transition(VisionStateKind::DarkAdapted, now);
                    }
                }
            }
        }

        self.update_blink(now);
    }

    fn update_blink(&mut self, now: f64) {
        if let Some(ends_at) = self.blink.ends_at {
            if now >= ends_at {
                self.finish_blink(now, true);
            }
            return;
        }

        if !self.config.blink.enabled || now < self.blink.next_blink_at {
            return;
        }

        if matches!(self.state, VisionStateKind::Normal | VisionStateKind::DarkAdapted) {
            self.blink.resume_state = self.state;
            self.blink.ends_at = Some(now + self.config.blink.duration);
            self.events.push(VisionEvent::BlinkStarted);
            self.transition(VisionStateKind::Blinking, now);
        }
        self.blink.next_blink_at = now + Self::blink_interval(&self.config.blink, &mut self.rng);
    }

    /// Закончить моргание; `resume` — вернуться в прерванное состояние,
    /// иначе следующий переход делает вызывающий
    fn finish_blink(&mut self, now: f64, resume: bool) {
        if self.blink.ends_at.take().is_none() {
            return;
        }
        self.events.push(VisionEvent::BlinkEnded);
        if resume && self.state == VisionStateKind::Blinking {
            let resume_state = self.blink.resume_state;
            self.transition(resume_state, now);
        }
    }
}
