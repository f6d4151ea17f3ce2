// castor_core/src/utils/mod.rs

pub mod adaptive;
pub mod integrators;
