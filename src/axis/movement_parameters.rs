use serde::{Deserialize, Serialize};

/// Run parameters written to the axis before a move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovementParams {
    /// Run frequency in Hz (P14).
    pub velocity: Option<f64>,
    /// Ramp in Hz/s (P15).
    pub acceleration: Option<f64>,
}

impl MovementParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    pub fn with_acceleration(mut self, acceleration: f64) -> Self {
        self.acceleration = Some(acceleration);
        self
    }
}
