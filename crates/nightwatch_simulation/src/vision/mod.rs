//! Vision domain — восприятие NPC
//!
//! Pipeline: FieldOfView → RaycastVisibility → IlluminationSampler →
//! TargetRecognition → VisualMemory. VisionState + PerceptionModifier
//! ухудшают восприятие на лету. `Vision` — фасад для AI.

pub mod events;
pub mod facade;
pub mod field_of_view;
pub mod illumination;
pub mod memory;
pub mod modifier;
pub mod raycast;
pub mod recognition;
pub mod state;

pub use events::VisionEvent;
pub use facade::{Vision, VisionBuilder, VisionConfig, VisibleTarget};
pub use field_of_view::{FieldOfView, FieldOfViewConfig, FovScan};
pub use illumination::{IlluminationConfig, IlluminationSampler};
pub use memory::{Memory, VisualMemory, VisualMemoryConfig};
pub use modifier::{impairment_floor, modify_settings, threshold_multiplier, ImpairmentInputs, PerceptionModifier};
pub use raycast::{RaycastVisibility, RaycastVisibilityConfig};
pub use recognition::{
    PerceivedTarget, RecognitionConfig, RecognitionSettings, RecognitionWeights, TargetObservation, TargetRecognition,
};
pub use state::{BlinkConfig, VisionStateConfig, VisionStateKind, VisionStateMachine};

#[cfg(test)]
mod facade_tests;
#[cfg(test)]
mod memory_tests;
#[cfg(test)]
mod recognition_tests;
