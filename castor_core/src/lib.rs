// castor_core/src/lib.rs

//! Friction-based dynamics model of a two-wheel-drive, two-caster wheelchair,
//! with fixed-step and adaptive integration of its state trajectory.

pub mod angles;
pub mod error;
pub mod models;
pub mod params;
pub mod prelude;
pub mod simulator;
pub mod state;
pub mod utils;
