// castor_sim/src/simulation/mod.rs

pub mod config;
pub mod output;
pub mod runner;
pub mod validation;
