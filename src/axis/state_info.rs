use serde::Serialize;

use super::limit_switches::LimitSwitches;
use super::state::DeviceState;

#[derive(Debug, Clone, Serialize)]
pub struct AxisStateInfo {
    pub state: DeviceState,
    pub message: Option<String>,
    pub limit_switches: LimitSwitches,
}

impl AxisStateInfo {
    pub fn new(state: DeviceState) -> Self {
        Self {
            state,
            message: None,
            limit_switches: LimitSwitches::None,
        }
    }

    pub fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }

    pub fn with_limit_switches(mut self, limit_switches: LimitSwitches) -> Self {
        self.limit_switches = limit_switches;
        self
    }

    pub fn is_moving(&self) -> bool {
        self.state == DeviceState::Moving
    }

    pub fn is_faulted(&self) -> bool {
        self.state == DeviceState::Fault
    }

    pub fn is_ready(&self) -> bool {
        self.state == DeviceState::On && !self.limit_switches.any_active()
    }
}
