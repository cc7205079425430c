//! Link Reader
//!
//! Dedicated OS thread: opens the link, reads it one bounded read at a time,
//! cuts the stream into candidate frames and enqueues them. Sole writer of
//! [`LinkState`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use contracts::{LinkState, RawFrame};
use metrics::counter;
use protocol::FrameDelimiter;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{IngestionMetrics, ReaderSettings};
use crate::error::{IngestionError, Result};
use crate::link::SharedLink;
use crate::queue::{FrameSender, SendOutcome};
use crate::state::{link_state, LinkStateHandle, LinkStateWriter};
use crate::transport::LinkOpener;

/// Why the reader thread ended
#[derive(Debug)]
pub enum ReaderExit {
    /// `stop()` was requested
    Stopped,
    /// Every queue consumer went away
    ConsumerGone,
    /// The link could not be opened; nothing was read
    OpenFailed(IngestionError),
    /// A read failed; the link was closed
    ReadFailed(IngestionError),
    /// The link was removed by someone else
    LinkClosed,
    /// The reader thread panicked
    Panicked,
}

impl ReaderExit {
    /// Whether the exit was caused by a link fault
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::OpenFailed(_) | Self::ReadFailed(_) | Self::Panicked)
    }
}

/// Handle to the running reader thread
#[derive(Debug)]
pub struct LinkReader {
    handle: Option<JoinHandle<ReaderExit>>,
    stop: Arc<AtomicBool>,
    link: SharedLink,
    state: LinkStateHandle,
    metrics: Arc<IngestionMetrics>,
}

impl LinkReader {
    /// Spawn the reader thread
    ///
    /// Returns immediately; the link is opened on the reader thread and the
    /// state flips to `Connected` once that succeeds. An open failure leaves the
    /// state `Disconnected` and ends the thread without retrying.
    #[instrument(name = "link_reader_spawn", skip_all, fields(endpoint = %opener.endpoint()))]
    pub fn spawn<O: LinkOpener>(
        opener: O,
        settings: ReaderSettings,
        tx: FrameSender,
        metrics: Arc<IngestionMetrics>,
    ) -> Result<Self> {
        let (writer, state) = link_state();
        let link = SharedLink::new();
        let stop = Arc::new(AtomicBool::new(false));

        let worker = ReaderLoop {
            link: link.clone(),
            state: writer,
            tx,
            stop: stop.clone(),
            metrics: metrics.clone(),
            delimiter: FrameDelimiter::new(settings.max_frame_len),
            epoch: 0,
            buffer: vec![0u8; settings.read_chunk.max(1)],
        };

        let handle = std::thread::Builder::new()
            .name("link-reader".to_string())
            .spawn(move || worker.run(opener))
            .map_err(|source| IngestionError::SpawnFailed { source })?;

        Ok(Self {
            handle: Some(handle),
            stop,
            link,
            state,
            metrics,
        })
    }

    /// Shared link handle for the control channel
    pub fn link(&self) -> SharedLink {
        self.link.clone()
    }

    /// Link state reader
    pub fn state(&self) -> LinkStateHandle {
        self.state.clone()
    }

    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Ask the thread to stop after its current read
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Whether the thread has ended
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(|h| h.is_finished())
    }

    /// Wait for the thread to end
    pub fn join(mut self) -> ReaderExit {
        self.join_inner()
    }

    /// Stop and wait
    pub fn shutdown(mut self) -> ReaderExit {
        self.stop();
        self.join_inner()
    }

    fn join_inner(&mut self) -> ReaderExit {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(ReaderExit::Panicked),
            None => ReaderExit::Stopped,
        }
    }
}

impl Drop for LinkReader {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop();
            let _ = self.join_inner();
        }
    }
}

struct ReaderLoop {
    link: SharedLink,
    state: LinkStateWriter,
    tx: FrameSender,
    stop: Arc<AtomicBool>,
    metrics: Arc<IngestionMetrics>,
    delimiter: FrameDelimiter,
    /// Link epoch at the previous read
    epoch: u64,
    buffer: Vec<u8>,
}

impl ReaderLoop {
    fn run<O: LinkOpener>(mut self, opener: O) -> ReaderExit {
        let endpoint = opener.endpoint();

        match opener.open() {
            Ok(transport) => {
                self.link.install(transport);
                self.state.set(LinkState::Connected);
                info!(endpoint = %endpoint, "link reader connected");
            }
            Err(e) => {
                error!(endpoint = %endpoint, error = %e, "failed to open link");
                self.state.set(LinkState::Disconnected);
                return ReaderExit::OpenFailed(e);
            }
        }

        let exit = self.read_loop();
        match &exit {
            ReaderExit::ReadFailed(e) => warn!(endpoint = %endpoint, error = %e, "link lost"),
            other => debug!(endpoint = %endpoint, exit = ?other, "link reader finished"),
        }

        self.state.set(LinkState::Disconnected);
        drop(self.link.take());
        exit
    }

    fn read_loop(&mut self) -> ReaderExit {
        loop {
            if self.stop.load(Ordering::Acquire) {
                return ReaderExit::Stopped;
            }
            if self.tx.consumer_gone() {
                return ReaderExit::ConsumerGone;
            }

            let buffer = &mut self.buffer;
            let (epoch, read) = match self.link.with_epoch(|transport| transport.read(buffer)) {
                Some(read) => read,
                None => return ReaderExit::LinkClosed,
            };
            if epoch != self.epoch {
                // A control exchange consumed bytes since the last read
                self.epoch = epoch;
                if self.delimiter.pending() > 0 {
                    debug!(pending = self.delimiter.pending(), "dropping partial frame");
                    self.delimiter.clear();
                }
            }

            match read {
                Ok(0) => continue,
                Ok(n) => {
                    if let Some(exit) = self.ingest(n) {
                        return exit;
                    }
                }
                Err(source) => {
                    // Close before anyone else can touch the dead port
                    self.state.set(LinkState::Disconnected);
                    drop(self.link.take());
                    return ReaderExit::ReadFailed(IngestionError::LinkReadFailed { source });
                }
            }
        }
    }

    fn ingest(&mut self, n: usize) -> Option<ReaderExit> {
        self.metrics.record_bytes(n);
        self.delimiter.push(&self.buffer[..n]);

        let overflows_before = self.delimiter.overflow_count();
        while let Some(candidate) = self.delimiter.next_frame() {
            self.metrics.record_received();
            counter!("radar_link_frames_received_total").increment(1);

            if self.tx.send(RawFrame::new(candidate)) == SendOutcome::Closed {
                return Some(ReaderExit::ConsumerGone);
            }
        }

        let overflows = self.delimiter.overflow_count() - overflows_before;
        if overflows > 0 {
            self.metrics.record_overflows(overflows);
            counter!("radar_link_frames_dropped_total", "reason" => "overflow")
                .increment(overflows);
            debug!(pending = self.delimiter.pending(), "discarded bytes without frame tail");
        }
        None
    }
}
