//! In-process stand-in for a bus of MCC-2 modules.
//!
//! Answers requests the way the controller does, which lets the whole stack
//! run without hardware. Motions complete instantly unless a number of
//! "still moving" status polls is configured; jogs run until stopped.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use super::Transport;
use crate::configurator::DEFAULT_CONFIG;
use crate::error::{Error, ProtocolError, Result};
use crate::protocol::frame::{AxisSelector, Literal, ModuleAddress, Request, Target};
use crate::protocol::opcode::{Direction, Opcode};
use crate::protocol::{encode_ack, encode_nak, parse_request};
use crate::registry::position::{FirmwareGeneration, PositionRegisters};

const COUNTERS: [u8; 4] = [19, 20, 21, 22];

#[derive(Debug, Clone)]
struct SimAxis {
    registers: BTreeMap<u8, f64>,
    moving: bool,
    jogging: bool,
    polls_left: u32,
    limit_minus: bool,
    limit_plus: bool,
}

impl SimAxis {
    fn new() -> Self {
        Self {
            registers: DEFAULT_CONFIG.iter().map(|d| (d.register, d.value)).collect(),
            moving: false,
            jogging: false,
            polls_left: 0,
            limit_minus: false,
            limit_plus: false,
        }
    }

    fn start_motion(&mut self, delta: f64, polls: u32) {
        for counter in COUNTERS {
            if let Some(value) = self.registers.get_mut(&counter) {
                *value += delta;
            }
        }
        self.moving = true;
        self.polls_left = polls;
    }
}

#[derive(Debug, Clone)]
struct SimModule {
    firmware: String,
    axes: [SimAxis; 2],
}

impl SimModule {
    fn registers(&self) -> PositionRegisters {
        PositionRegisters::for_firmware(
            FirmwareGeneration::from_version(&self.firmware).unwrap_or_default(),
        )
    }

    fn status_answer(&mut self) -> String {
        let mut digits = [b'0'; 8];
        digits[0] = b'E';
        for (axis, (motion_at, limit_at)) in self.axes.iter_mut().zip([(1, 2), (5, 6)]) {
            let moving = if axis.jogging {
                true
            } else if axis.moving && axis.polls_left > 0 {
                axis.polls_left -= 1;
                true
            } else {
                axis.moving = false;
                false
            };
            digits[motion_at] = if moving { b'0' } else { b'1' };
            digits[limit_at] = b'0' + u8::from(axis.limit_minus) + 2 * u8::from(axis.limit_plus);
        }
        String::from_utf8_lossy(&digits).into_owned()
    }
}

#[derive(Debug, Default)]
struct SimState {
    modules: HashMap<ModuleAddress, SimModule>,
    log: Vec<String>,
    reject_next: usize,
    silent: bool,
    fail_open: bool,
    motion_polls: u32,
}

/// Handle used to script and inspect the simulated bus.
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_module(self, address: ModuleAddress, firmware: &str) -> Self {
        self.lock().modules.insert(
            address,
            SimModule {
                firmware: firmware.to_string(),
                axes: [SimAxis::new(), SimAxis::new()],
            },
        );
        self
    }

    /// Transport end of the bus; all transports share this handle's state.
    pub fn transport(&self) -> SimulatedTransport {
        SimulatedTransport {
            bus: self.clone(),
            open: false,
        }
    }

    /// Not-acknowledge the next `count` requests.
    pub fn reject_next(&self, count: usize) {
        self.lock().reject_next = count;
    }

    /// Stop answering entirely, as a disconnected bus would.
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    /// Number of status polls that still report motion after a move.
    pub fn set_motion_polls(&self, polls: u32) {
        self.lock().motion_polls = polls;
    }

    pub fn set_limits(&self, address: ModuleAddress, axis: AxisSelector, minus: bool, plus: bool) {
        if let Some(module) = self.lock().modules.get_mut(&address) {
            let axis = &mut module.axes[axis.index()];
            axis.limit_minus = minus;
            axis.limit_plus = plus;
        }
    }

    pub fn set_register(&self, address: ModuleAddress, axis: AxisSelector, register: u8, value: f64) {
        if let Some(module) = self.lock().modules.get_mut(&address) {
            module.axes[axis.index()].registers.insert(register, value);
        }
    }

    pub fn register(&self, address: ModuleAddress, axis: AxisSelector, register: u8) -> Option<f64> {
        self.lock()
            .modules
            .get(&address)
            .and_then(|m| m.axes[axis.index()].registers.get(&register).copied())
    }

    pub fn is_moving(&self, address: ModuleAddress, axis: AxisSelector) -> bool {
        self.lock()
            .modules
            .get(&address)
            .is_some_and(|m| m.axes[axis.index()].moving || m.axes[axis.index()].jogging)
    }

    /// Command texts received so far, e.g. `0XP41S25`.
    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    pub fn clear_log(&self) {
        self.lock().log.clear();
    }

    fn handle(&self, raw: &[u8]) -> Option<Vec<u8>> {
        let mut state = self.lock();
        if state.silent {
            return None;
        }

        let request = match parse_request(raw) {
            Ok(request) => request,
            Err(_) => return Some(encode_nak()),
        };
        state.log.push(request.command_text());

        if state.reject_next > 0 {
            state.reject_next -= 1;
            return Some(encode_nak());
        }

        let motion_polls = state.motion_polls;
        let module = state.modules.get_mut(&request.address)?;
        Some(match execute(module, &request, motion_polls) {
            Some(payload) => encode_ack(&payload),
            None => encode_nak(),
        })
    }
}

fn format_value(value: f64) -> String {
    Literal::exact(value).to_string()
}

/// Run one request against a module; `None` means not acknowledged.
fn execute(module: &mut SimModule, request: &Request, motion_polls: u32) -> Option<String> {
    let selector = match request.target {
        Target::Module => {
            return match request.opcode {
                Opcode::FirmwareVersion => Some(module.firmware.clone()),
                Opcode::ExtendedStatus => Some(module.status_answer()),
                Opcode::SaveParameters => Some(String::new()),
                _ => None,
            };
        }
        Target::Axis(selector) => selector,
    };

    let counters = module.registers();
    let axis = &mut module.axes[selector.index()];
    let literal = request.literal.map(Literal::as_f64);

    match request.opcode {
        Opcode::ReadRegister(n) => axis.registers.get(&n).map(|v| format_value(*v)),
        Opcode::WriteRegister(n) => {
            let slot = axis.registers.get_mut(&n)?;
            *slot = literal?;
            Some(String::new())
        }
        Opcode::MoveAbsolute => {
            let current = axis.registers.get(&counters.mechanical_zero).copied()?;
            axis.start_motion(literal? - current, motion_polls);
            Some(String::new())
        }
        Opcode::MoveRelative(direction) => {
            let distance = literal?;
            let delta = match direction {
                Direction::Plus => distance,
                Direction::Minus => -distance,
            };
            axis.start_motion(delta, motion_polls);
            Some(String::new())
        }
        Opcode::Jog(_) => {
            axis.jogging = true;
            axis.moving = true;
            Some(String::new())
        }
        Opcode::Home { .. } => {
            let current = axis.registers.get(&counters.mechanical_zero).copied()?;
            axis.start_motion(-current, motion_polls);
            Some(String::new())
        }
        Opcode::Stop | Opcode::Abort => {
            axis.jogging = false;
            axis.moving = false;
            axis.polls_left = 0;
            Some(String::new())
        }
        _ => None,
    }
}

/// [`Transport`] end of a [`SimulatedBus`].
pub struct SimulatedTransport {
    bus: SimulatedBus,
    open: bool,
}

#[async_trait::async_trait]
impl Transport for SimulatedTransport {
    async fn open(&mut self) -> Result<()> {
        if self.bus.lock().fail_open {
            return Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "simulated port unavailable",
            )));
        }
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn write_read(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        if !self.open {
            return Err(Error::Transport(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "simulated port is not open",
            )));
        }
        let response = self.bus.handle(request);
        debug!(request = ?String::from_utf8_lossy(request), response = ?response, "Simulated exchange");
        response.ok_or_else(|| ProtocolError::Timeout(timeout).into())
    }
}
