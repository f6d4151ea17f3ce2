// castor_core/src/error.rs

use thiserror::Error;

/// Failures raised by the adaptive grid solver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    #[error("step size {step:e} fell below the minimum {min_step:e} at t = {time}")]
    StepSizeUnderflow { time: f64, step: f64, min_step: f64 },

    #[error("step budget of {max_steps} exhausted at t = {time}")]
    StepBudgetExhausted { time: f64, max_steps: usize },

    #[error("non-finite state produced at t = {time}")]
    NonFinite { time: f64 },
}

/// The error taxonomy of the model core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// A physical constant or geometry value would make the model meaningless
    /// (e.g. a zero mass in a denominator). Raised before any integration.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A sample required to build the initial state was never received.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// A produced state contained NaN or infinity.
    #[error("state diverged after {completed_steps} completed steps (t = {time})")]
    NumericDivergence { completed_steps: usize, time: f64 },

    #[error("invalid time grid: {0}")]
    InvalidTimeGrid(String),

    #[error(transparent)]
    Integration(#[from] IntegrationError),
}
