use serde::Serialize;

use crate::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LimitSwitches {
    None,
    Upper,
    Lower,
    Both,
}

impl LimitSwitches {
    pub fn from_flags(lower: bool, upper: bool) -> Self {
        match (lower, upper) {
            (false, false) => LimitSwitches::None,
            (true, false) => LimitSwitches::Lower,
            (false, true) => LimitSwitches::Upper,
            (true, true) => LimitSwitches::Both,
        }
    }

    pub fn from_status(status: &Status) -> Self {
        Self::from_flags(status.limit_minus, status.limit_plus)
    }

    pub fn has_upper(&self) -> bool {
        matches!(self, LimitSwitches::Upper | LimitSwitches::Both)
    }

    pub fn has_lower(&self) -> bool {
        matches!(self, LimitSwitches::Lower | LimitSwitches::Both)
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, LimitSwitches::None)
    }

    pub fn any_active(&self) -> bool {
        !self.is_clear()
    }
}
