use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::protocol::codec::ResponseCodec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    /// XON/XOFF
    Software,
    /// RTS/CTS
    Hardware,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub port: String,
    pub baud_rate: u32,
    /// 5 to 8.
    pub data_bits: u8,
    pub parity: Parity,
    /// 1 or 2.
    pub stop_bits: u8,
    pub flow_control: FlowControl,
    /// Turnaround the controller needs between request and answer.
    pub settle_delay_ms: u64,
    /// Hard upper bound for waiting on a complete answer.
    pub read_timeout_ms: u64,
    pub max_frame_len: usize,
}

impl TransportConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyMCC".to_string(),
            baud_rate: 115_200,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: 1,
            flow_control: FlowControl::None,
            settle_delay_ms: 20,
            read_timeout_ms: 500,
            max_frame_len: ResponseCodec::DEFAULT_MAX_LENGTH,
        }
    }
}
