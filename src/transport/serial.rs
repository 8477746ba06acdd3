use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use super::config::{FlowControl, Parity, TransportConfig};
use super::Transport;
use crate::error::{ConfigurationError, Error, ProtocolError, Result};
use crate::protocol::codec::ResponseCodec;

fn data_bits(bits: u8) -> Result<tokio_serial::DataBits, ConfigurationError> {
    match bits {
        5 => Ok(tokio_serial::DataBits::Five),
        6 => Ok(tokio_serial::DataBits::Six),
        7 => Ok(tokio_serial::DataBits::Seven),
        8 => Ok(tokio_serial::DataBits::Eight),
        other => Err(ConfigurationError::InvalidLineSetting(format!(
            "{} data bits",
            other
        ))),
    }
}

fn stop_bits(bits: u8) -> Result<tokio_serial::StopBits, ConfigurationError> {
    match bits {
        1 => Ok(tokio_serial::StopBits::One),
        2 => Ok(tokio_serial::StopBits::Two),
        other => Err(ConfigurationError::InvalidLineSetting(format!(
            "{} stop bits",
            other
        ))),
    }
}

fn parity(parity: Parity) -> tokio_serial::Parity {
    match parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    }
}

fn flow_control(flow: FlowControl) -> tokio_serial::FlowControl {
    match flow {
        FlowControl::None => tokio_serial::FlowControl::None,
        FlowControl::Software => tokio_serial::FlowControl::Software,
        FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
    }
}

/// Request/answer exchange over a byte stream framed with [`ResponseCodec`].
///
/// After a timeout the controller may still deliver the late answer. The
/// next exchange first waits one settle period and throws away whatever
/// arrives, so that answer is never taken for the reply to a new request.
pub(crate) struct FramedLink<S> {
    framed: Framed<S, ResponseCodec>,
    settle: Duration,
    desynced: bool,
}

impl<S> FramedLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub(crate) fn new(stream: S, codec: ResponseCodec, settle: Duration) -> Self {
        Self {
            framed: Framed::new(stream, codec),
            settle,
            desynced: false,
        }
    }

    async fn resync(&mut self) {
        let mut discarded = 0;
        while let Ok(Some(frame)) = tokio::time::timeout(self.settle, self.framed.next()).await {
            discarded += frame.map_or(0, |bytes| bytes.len());
        }
        discarded += self.framed.read_buffer().len();
        self.framed.read_buffer_mut().clear();
        if discarded > 0 {
            warn!(discarded, "Discarded late answer after timeout");
        }
        self.desynced = false;
    }

    pub(crate) async fn write_read(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        if self.desynced {
            self.resync().await;
        } else if !self.framed.read_buffer().is_empty() {
            warn!(
                stale = self.framed.read_buffer().len(),
                "Discarding unread bytes before request"
            );
            self.framed.read_buffer_mut().clear();
        }

        self.framed.send(request.to_vec()).await?;
        tokio::time::sleep(self.settle).await;

        match tokio::time::timeout(timeout, self.framed.next()).await {
            Ok(Some(Ok(response))) => {
                debug!(bytes = response.len(), "Received response");
                Ok(response)
            }
            Ok(Some(Err(e))) => Err(e.into()),
            Ok(None) => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "serial stream closed",
            )
            .into()),
            Err(_) => {
                self.desynced = true;
                Err(ProtocolError::Timeout(timeout).into())
            }
        }
    }
}

/// RS-232/RS-485 link to the MCC-2 bus, 8N1 without flow control unless
/// configured otherwise.
pub struct SerialTransport {
    config: TransportConfig,
    link: Option<FramedLink<SerialStream>>,
}

impl SerialTransport {
    pub fn new(config: TransportConfig) -> Self {
        Self { config, link: None }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

fn not_connected(port: &str) -> Error {
    Error::Transport(std::io::Error::new(
        std::io::ErrorKind::NotConnected,
        format!("serial port {} is not open", port),
    ))
}

#[async_trait::async_trait]
impl Transport for SerialTransport {
    async fn open(&mut self) -> Result<()> {
        let port = tokio_serial::new(&self.config.port, self.config.baud_rate)
            .data_bits(data_bits(self.config.data_bits)?)
            .parity(parity(self.config.parity))
            .stop_bits(stop_bits(self.config.stop_bits)?)
            .flow_control(flow_control(self.config.flow_control))
            .open_native_async()
            .map_err(std::io::Error::from)?;

        let codec = ResponseCodec::with_max_length(self.config.max_frame_len);
        self.link = Some(FramedLink::new(port, codec, self.config.settle_delay()));
        info!(
            port = %self.config.port,
            baud_rate = self.config.baud_rate,
            data_bits = self.config.data_bits,
            parity = ?self.config.parity,
            stop_bits = self.config.stop_bits,
            flow_control = ?self.config.flow_control,
            "Opened MCC-2 serial port"
        );
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.link.take().is_some() {
            info!(port = %self.config.port, "Closed MCC-2 serial port");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.link.is_some()
    }

    async fn write_read(&mut self, request: &[u8], timeout: Duration) -> Result<Vec<u8>> {
        let link = self
            .link
            .as_mut()
            .ok_or_else(|| not_connected(&self.config.port))?;
        link.write_read(request, timeout).await
    }
}
