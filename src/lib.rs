//! Protocol engine for Phytron MCC-2 stepper motor controllers.
//!
//! Frames requests for the MCC-2 serial protocol, decodes the answers and
//! tracks the state of each axis. The [`axis::Axis`] and
//! [`motor_controller::MotorController`] traits are the seam towards the
//! remote-control framework that exposes the axes.

pub mod axis;
pub mod config;
pub mod configurator;
pub mod error;
pub mod motor_controller;
pub mod protocol;
pub mod registry;
pub mod status;
pub mod transport;

pub use axis::client::Mcc2Axis;
pub use config::BusConfig;
pub use error::{Error, Result};
pub use motor_controller::Mcc2Module;
