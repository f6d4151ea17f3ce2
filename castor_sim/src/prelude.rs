// castor_sim/src/prelude.rs

// Re-export the entire castor_core prelude so you can easily access
// pure types like `Dynamics`, `Trajectory`, `PhysicalConstants`, etc.
pub use castor_core::prelude::*;

// Re-export common simulation-specific types.
pub use crate::error::SimError;
pub use crate::simulation::config::structs::*;
pub use crate::simulation::config::{load_scenario, parse_scenario};
pub use crate::simulation::output::{write_prediction, write_prediction_file};
pub use crate::simulation::runner::{run_scenario, Prediction};
pub use crate::simulation::validation::{
    compare, load_measurements, ChannelError, MeasuredSample, ValidationReport,
};
