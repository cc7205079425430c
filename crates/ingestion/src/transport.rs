//! Transport layer for the serial link

use std::io::{self, Read, Write};
use std::time::Duration;

use contracts::LinkConfig;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::info;

use crate::error::{IngestionError, Result};

/// Byte transport to the radar
///
/// `read` blocks for at most the transport's read timeout and returns `Ok(0)`
/// when it expires without data.
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Flush any pending writes (blocking until complete)
    fn flush(&mut self) -> io::Result<()>;

    /// Current upper bound of a single read, if the transport has one
    fn read_timeout(&self) -> Option<Duration> {
        None
    }

    /// Change the upper bound of a single read
    fn set_read_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    /// Write the whole buffer
    fn write_all(&mut self, mut data: &[u8]) -> io::Result<()> {
        while !data.is_empty() {
            match self.write(data)? {
                0 => return Err(io::ErrorKind::WriteZero.into()),
                n => data = &data[n..],
            }
        }
        self.flush()
    }
}

/// Opens the link from inside the reader thread
pub trait LinkOpener: Send + 'static {
    /// Endpoint description for logs
    fn endpoint(&self) -> String;

    fn open(&self) -> Result<Box<dyn Transport>>;
}

/// Serial transport for UART communication
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Open a serial port at 8N1 without flow control
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyAMA0")
    /// * `baud_rate` - Baud rate (the radar ships at 256000)
    /// * `timeout` - Upper bound for a single read
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()
            .map_err(|e| IngestionError::link_open(path, e.to_string()))?;

        info!(path, baud_rate, "opened serial port");
        Ok(SerialTransport { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        match self.port.read(buffer) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.port.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn read_timeout(&self) -> Option<Duration> {
        Some(self.port.timeout())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(io::Error::from)
    }
}

/// Opens a [`SerialTransport`] from link configuration
#[derive(Debug, Clone)]
pub struct SerialOpener {
    config: LinkConfig,
}

impl SerialOpener {
    pub fn new(config: LinkConfig) -> Self {
        Self { config }
    }
}

impl LinkOpener for SerialOpener {
    fn endpoint(&self) -> String {
        format!("{}@{}", self.config.path, self.config.baud_rate)
    }

    fn open(&self) -> Result<Box<dyn Transport>> {
        let transport = SerialTransport::open(
            &self.config.path,
            self.config.baud_rate,
            self.config.read_timeout(),
        )?;
        Ok(Box::new(transport))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let opener = SerialOpener::new(LinkConfig {
            path: "/dev/radar-link-does-not-exist".to_string(),
            ..Default::default()
        });
        assert_eq!(opener.endpoint(), "/dev/radar-link-does-not-exist@256000");

        let err = opener.open().err().unwrap();
        assert!(matches!(err, IngestionError::LinkOpenFailed { .. }));
    }
}
