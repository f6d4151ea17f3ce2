// castor_core/src/prelude.rs

// --- Core Abstractions ---
pub use crate::models::dynamics::Dynamics;
pub use crate::utils::integrators::{FixedStepScheme, Integrator, RK1, RK2, RK3, RK4};

// --- Configuration and Errors ---
pub use crate::error::{IntegrationError, ModelError};
pub use crate::params::{CasterGeometry, ContactGeometry, PhysicalConstants, WheelCommand};

// --- State ---
pub use crate::state::{
    CasterReading, CasterState, ChassisState, InitialCondition, MeasuredPose, StateVariable,
    CASTER_LAYOUT, CASTER_STATE_DIM, CHASSIS_LAYOUT, CHASSIS_STATE_DIM,
};

// --- Concrete Models ---
pub use crate::models::dynamics::friction::{
    CasterDynamics, CasterSource, ChassisDynamics, FrictionDynamics,
};
pub use crate::models::force::{ForceModel, GeneralizedForces};

// --- Simulation ---
pub use crate::angles::{al_to_th, angle_difference, delta, normalize_angle, th_to_al};
pub use crate::simulator::{
    relative_divergence, simulate_fixed_step, simulate_on_grid, uniform_grid, SimulationRun,
    Trajectory,
};
pub use crate::utils::adaptive::DormandPrince45;
