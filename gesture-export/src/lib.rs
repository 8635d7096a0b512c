//! Gesture export pipeline
//!
//! Turns pre-segmented gesture recordings into per-gesture JSON records that
//! pair the measured lamp power with the simulated power of both
//! [`radiometry::PowerModel`] variants, calibrated onto the measured range.

pub mod config;
pub mod exporter;
pub mod record;
pub mod segment;
pub mod writer;

pub use config::{ConfigError, ExportConfig, GestureRequest, ParseGestureRequestError};
pub use exporter::{
    error_chain, BatchSummary, ExportDiagnostics, ExportError, ExportOutcome, ExportedGesture,
    FailedGesture, GestureExporter,
};
pub use record::{ExportRecord, RecordError, SimulatedSeries};
pub use segment::{
    InMemorySegmentSource, JsonSegmentSource, Segment, SegmentData, SegmentError, SegmentFile,
    SegmentSource, SegmentSourceError,
};
pub use writer::{JsonRecordWriter, RecordWriter, WriteError};
