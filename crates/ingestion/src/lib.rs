//! # Ingestion
//!
//! Serial link ingestion.
//!
//! Responsibilities:
//! - Open the radar link (serial port or mock) on a dedicated reader thread
//! - Cut the byte stream into candidate frames on the report tail marker
//! - Backpressure management and drop policy
//! - Send to downstream via async-channel
//! - Publish `LinkState` (single writer)
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{frame_queue, LinkReader, ReaderSettings, SerialOpener};
//!
//! let metrics = Arc::new(IngestionMetrics::new());
//! let (tx, rx) = frame_queue(&BackpressureConfig::from(&blueprint.pipeline), metrics.clone());
//! let reader = LinkReader::spawn(
//!     SerialOpener::new(blueprint.link.clone()),
//!     ReaderSettings::from_config(&blueprint.link, &blueprint.pipeline),
//!     tx,
//!     metrics,
//! )?;
//!
//! while let Ok(frame) = rx.recv().await {
//!     // Decode and publish
//! }
//! ```
//!
//! ## Mock Testing
//!
//! ```ignore
//! use ingestion::MockTransport;
//!
//! let mock = MockTransport::new();
//! mock.push_data(&frame_bytes);
//! let reader = LinkReader::spawn(mock.opener(), settings, tx, metrics)?;
//! ```

mod config;
mod error;
mod link;
mod mock;
mod queue;
mod reader;
mod state;
mod transport;

// Re-exports
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot, ReaderSettings};
pub use error::{IngestionError, Result};
pub use link::SharedLink;
pub use mock::{MockOpener, MockTransport};
pub use queue::{frame_queue, FrameReceiver, FrameSender, SendOutcome};
pub use reader::{LinkReader, ReaderExit};
pub use state::{link_state, LinkStateHandle, LinkStateWriter};
pub use transport::{LinkOpener, SerialOpener, SerialTransport, Transport};
