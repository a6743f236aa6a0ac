//! Hand-gesture calculator engine.
//!
//! Landmark frames from an external hand tracker are classified into
//! symbols, debounced, and captured into a two-operand calculation.

pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod gestures;
pub mod history;
pub mod landmarks;
pub mod narrate;
pub mod stability;
pub mod timer;

pub use capture::{CalculationState, CaptureMachine, CompletedCalculation, Slot, Stage};
pub use engine::{Engine, EngineConfig, EngineStatus, Mode, Tick};
pub use error::EngineError;
pub use evaluator::{Operator, evaluate};
pub use gestures::{ClassifierConfig, OperatorGesture, Symbol, classify};
pub use landmarks::{FrameInput, FrameMessage, Landmark, LandmarkFrame};
pub use stability::StabilityFilter;
