// castor_core/src/models/dynamics/mod.rs

use crate::state::StateVariable;
use crate::utils::integrators::Integrator;
use nalgebra::SVector;
use std::fmt::Debug;

// --- DYNAMICS MODEL TRAIT ---
// The state-derivative map of a model. `x_dot = f(x, t)`
/// Represents the physics of the robot as a first-order ODE over an
/// `N`-dimensional state. Implementations must be pure: the same `(x, t)`
/// always yields the same derivative.
pub trait Dynamics<const N: usize>: Debug + Send + Sync {
    /// Returns the complete layout of the state vector for this specific model.
    /// The order of the array defines the indices for the state vector `x`.
    fn get_state_layout(&self) -> [StateVariable; N];

    /// Returns the total number of states (the length of the state vector `x`).
    fn get_state_dim(&self) -> usize {
        N
    }

    /// Computes the time derivative of the state vector: `x_dot = f(x, t)`.
    ///
    /// # Arguments
    /// * `x`: Current state vector.
    /// * `t`: Current simulation time in seconds.
    ///
    /// # Returns
    /// The time derivative of the state vector, same dimension as `x`.
    fn get_derivatives(&self, x: &SVector<f64, N>, t: f64) -> SVector<f64, N>;

    /// Propagates the state forward in time using a numerical integrator.
    /// This method provides a default implementation using the `Integrator` trait.
    ///
    /// # Arguments
    /// * `x`: Current state vector.
    /// * `t`: Current simulation time.
    /// * `dt`: Time step duration. Must be positive.
    /// * `integrator`: Any fixed-step scheme (e.g., `RK4`).
    ///
    /// # Returns
    /// The estimated state vector at time `t + dt`.
    fn propagate<I: Integrator>(
        &self,
        x: &SVector<f64, N>,
        t: f64,
        dt: f64,
        integrator: &I,
    ) -> SVector<f64, N>
    where
        Self: Sized,
    {
        debug_assert!(dt > 0.0, "Dynamics::propagate: dt must be positive");

        // Define the closure f(x, t) for the integrator.
        let func = |func_x: &SVector<f64, N>, func_t: f64| -> SVector<f64, N> {
            self.get_derivatives(func_x, func_t)
        };

        // Perform the integration step.
        integrator.step(&func, x, t, t + dt)
    }
}

pub mod friction;
