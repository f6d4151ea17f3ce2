// castor_sim/src/lib.rs

// This prelude is for convenience for other files WITHIN the castor_sim crate.
pub mod prelude;

pub mod cli;
pub mod error;

// This module contains all the scenario-specific logic.
pub mod simulation;
