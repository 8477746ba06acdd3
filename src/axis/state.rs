use serde::Serialize;

use crate::protocol::opcode::Opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceState {
    /// Not initialized, or the transport could not be opened.
    Off,
    On,
    Moving,
    /// The last exchange was rejected or failed on the link.
    Fault,
}

/// Tracks the device state of one axis from command outcomes and polls.
///
/// Every input is level-triggered: feeding the same poll result twice
/// leaves the state unchanged.
#[derive(Debug, Clone)]
pub struct AxisStateMachine {
    state: DeviceState,
    last_error: Option<String>,
}

impl AxisStateMachine {
    pub fn new() -> Self {
        Self {
            state: DeviceState::Off,
            last_error: None,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn initialized(&mut self) {
        if self.state == DeviceState::Off {
            self.state = DeviceState::On;
            self.last_error = None;
        }
    }

    pub fn init_failed(&mut self, reason: impl Into<String>) {
        self.state = DeviceState::Off;
        self.last_error = Some(reason.into());
    }

    /// The controller acknowledged `opcode`.
    pub fn acknowledged(&mut self, opcode: Opcode) {
        if self.state == DeviceState::Off {
            return;
        }
        if opcode.is_motion() {
            self.state = DeviceState::Moving;
        } else if opcode.is_halt() || self.state == DeviceState::Fault {
            self.state = DeviceState::On;
        }
        self.last_error = None;
    }

    /// A command was rejected or the link failed.
    pub fn failed(&mut self, reason: impl Into<String>) {
        if self.state != DeviceState::Off {
            self.state = DeviceState::Fault;
        }
        self.last_error = Some(reason.into());
    }

    /// Apply the motion flag of a fresh status poll.
    pub fn status_polled(&mut self, moving: bool) {
        self.state = match (self.state, moving) {
            (DeviceState::On, true) => DeviceState::Moving,
            (DeviceState::Moving, false) => DeviceState::On,
            (state, _) => state,
        };
    }
}

impl Default for AxisStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
