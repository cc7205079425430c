//! ControlChannel - tracking-mode command exchange over the shared link

use std::time::{Duration, Instant};

use contracts::ControlConfig;
use ingestion::{LinkStateHandle, SharedLink, Transport};
use metrics::counter;
use protocol::{ack_for, decode_ack, encode_command, Command};
use tracing::{debug, info, instrument, warn};

use crate::error::ControlError;
use crate::response::{LinkStatus, TrackingResponse};

/// Read size while waiting for an ack
const REPLY_CHUNK: usize = 64;

/// Reply bytes kept while searching for an ack; report traffic beyond this is shed
const REPLY_WINDOW: usize = 1024;

/// Control channel settings
#[derive(Debug, Clone)]
pub struct ControlSettings {
    /// How long to wait for each ack
    ///
    /// Reads while waiting are shortened to the time left, so a transport with
    /// a settable read timeout never overruns it.
    pub ack_timeout: Duration,

    /// Wrap the command in enable / end configuration commands
    pub use_config_mode: bool,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self::from(&ControlConfig::default())
    }
}

impl From<&ControlConfig> for ControlSettings {
    fn from(config: &ControlConfig) -> Self {
        Self {
            ack_timeout: config.ack_timeout(),
            use_config_mode: config.use_config_mode,
        }
    }
}

/// Sends tracking commands to the radar
///
/// Blocking; async callers use [`ControlChannel::set_tracking_async`]. The link
/// is held for one whole exchange, so report reads pause meanwhile. Link state
/// is only read here, never written.
#[derive(Debug, Clone)]
pub struct ControlChannel {
    link: SharedLink,
    state: LinkStateHandle,
    settings: ControlSettings,
}

impl ControlChannel {
    pub fn new(link: SharedLink, state: LinkStateHandle, settings: ControlSettings) -> Self {
        Self {
            link,
            state,
            settings,
        }
    }

    /// Current connection status
    pub fn status(&self) -> LinkStatus {
        LinkStatus {
            connected: self.state.is_connected(),
        }
    }

    /// Select multi-target (`true`) or single-target (`false`) tracking
    ///
    /// Returns the sensor's verdict: `Ok(false)` means it answered with a
    /// failure status.
    #[instrument(name = "control_set_tracking", skip(self))]
    pub fn set_tracking(&self, enable: bool) -> Result<bool, ControlError> {
        let result = self.try_set_tracking(enable);

        let status = match &result {
            Ok(true) => "success",
            Ok(false) => "rejected",
            Err(e) => e.status_label(),
        };
        counter!("radar_link_tracking_commands_total", "status" => status).increment(1);

        match &result {
            Ok(acked) => info!(enable, acked, "tracking command answered"),
            Err(e) => warn!(enable, error = %e, "tracking command failed"),
        }
        result
    }

    /// [`set_tracking`](Self::set_tracking) on the blocking pool
    pub async fn set_tracking_async(&self, enable: bool) -> Result<bool, ControlError> {
        let channel = self.clone();
        tokio::task::spawn_blocking(move || channel.set_tracking(enable))
            .await
            .map_err(|_| ControlError::Interrupted)?
    }

    /// Run a request and shape the reply for the caller
    pub async fn handle_request(&self, enable: bool) -> TrackingResponse {
        let result = self.set_tracking_async(enable).await;
        TrackingResponse::from_result(enable, &result)
    }

    fn try_set_tracking(&self, enable: bool) -> Result<bool, ControlError> {
        if !self.state.is_connected() {
            return Err(ControlError::LinkNotConnected);
        }

        self.link
            .exchange(|transport| self.exchange_wrapped(transport, enable))
            .unwrap_or(Err(ControlError::LinkNotConnected))
    }

    fn exchange_wrapped(
        &self,
        transport: &mut dyn Transport,
        enable: bool,
    ) -> Result<bool, ControlError> {
        if !self.settings.use_config_mode {
            return self.send_tracking(transport, enable);
        }

        let result = match self.exchange(transport, Command::EnableConfiguration) {
            Ok(true) => self.send_tracking(transport, enable),
            Ok(false) => {
                warn!("radar refused configuration mode");
                Ok(false)
            }
            Err(e) => return Err(e),
        };

        // Always try to resume reporting
        match self.exchange(transport, Command::EndConfiguration) {
            Ok(true) => {}
            Ok(false) => warn!("radar refused to end configuration mode"),
            Err(e) => warn!(error = %e, "failed to end configuration mode"),
        }
        result
    }

    fn send_tracking(&self, transport: &mut dyn Transport, enable: bool) -> Result<bool, ControlError> {
        let reply = self.send(transport, Command::tracking(enable))?;
        Ok(decode_ack(&reply, enable))
    }

    /// Write a configuration command and report whether it was accepted
    fn exchange(&self, transport: &mut dyn Transport, command: Command) -> Result<bool, ControlError> {
        let reply = self.send(transport, command)?;
        Ok(ack_for(&reply, command).is_some_and(|ack| ack.is_success()))
    }

    /// Write one command and collect the reply up to its ack
    fn send(&self, transport: &mut dyn Transport, command: Command) -> Result<Vec<u8>, ControlError> {
        let frame = encode_command(command);
        transport
            .write_all(&frame)
            .map_err(|source| ControlError::CommandWriteFailed { command, source })?;
        debug!(?command, bytes = frame.len(), "command written");

        let read_timeout = transport.read_timeout();
        let reply = self.await_reply(transport, command, read_timeout);

        if let Some(timeout) = read_timeout {
            if let Err(e) = transport.set_read_timeout(timeout) {
                warn!(error = %e, "failed to restore link read timeout");
            }
        }
        reply
    }

    fn await_reply(
        &self,
        transport: &mut dyn Transport,
        command: Command,
        read_timeout: Option<Duration>,
    ) -> Result<Vec<u8>, ControlError> {
        let started = Instant::now();
        let mut reply: Vec<u8> = Vec::with_capacity(REPLY_CHUNK * 2);
        let mut chunk = [0u8; REPLY_CHUNK];

        loop {
            if let Some(status) = ack_for(&reply, command).map(|ack| ack.status) {
                debug!(?command, status, "ack received");
                return Ok(reply);
            }

            let waited = started.elapsed();
            let remaining = self.settings.ack_timeout.saturating_sub(waited);
            if remaining.is_zero() {
                return Err(ControlError::AckTimeout { command, waited });
            }

            let bound = read_timeout.map_or(remaining, |timeout| timeout.min(remaining));
            let n = transport
                .set_read_timeout(bound)
                .and_then(|()| transport.read(&mut chunk))
                .map_err(|source| ControlError::ReplyReadFailed { command, source })?;
            reply.extend_from_slice(&chunk[..n]);

            if reply.len() > REPLY_WINDOW {
                let excess = reply.len() - REPLY_WINDOW / 2;
                reply.drain(..excess);
            }
        }
    }
}
