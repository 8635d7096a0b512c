//! Gesture segments and the sources that provide them.
//!
//! A [`Segment`] is one recorded instance of a gesture: the tracked receiver
//! poses and the power measured at each pose. Cutting raw recordings into
//! segments happens upstream; this module only defines the validated
//! in-memory form, the [`SegmentSource`] seam, and two sources:
//!
//! - [`JsonSegmentSource`] reads pre-segmented `<gesture>.segments.json` files
//! - [`InMemorySegmentSource`] holds segments built in code

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use nalgebra::Vector3;
use radiometry::TrajectorySample;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural problems with a segment
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    #[error("Segment has no samples")]
    Empty,
    #[error("Segment has {expected} samples but {actual} {field} values")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Duration must be finite and non-negative, got {0}")]
    InvalidDuration(f64),
}

/// Failures while fetching segments for a gesture
#[derive(Error, Debug)]
pub enum SegmentSourceError {
    #[error("No segment data for gesture '{0}'")]
    UnknownGesture(String),
    #[error("Failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Segment {index} of gesture '{gesture}' is malformed")]
    Malformed {
        gesture: String,
        index: usize,
        #[source]
        source: SegmentError,
    },
}

/// One recorded gesture instance with paired motion and measured power
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    gesture: String,
    index: usize,
    duration_s: f64,
    samples: Vec<TrajectorySample>,
    measured_power: Vec<f64>,
}

impl Segment {
    /// Build a segment, checking that every sample has a measured power value.
    pub fn new(
        gesture: impl Into<String>,
        index: usize,
        duration_s: f64,
        samples: Vec<TrajectorySample>,
        measured_power: Vec<f64>,
    ) -> Result<Self, SegmentError> {
        if samples.is_empty() {
            return Err(SegmentError::Empty);
        }
        if measured_power.len() != samples.len() {
            return Err(SegmentError::LengthMismatch {
                field: "measured power",
                expected: samples.len(),
                actual: measured_power.len(),
            });
        }
        if !(duration_s.is_finite() && duration_s >= 0.0) {
            return Err(SegmentError::InvalidDuration(duration_s));
        }

        Ok(Self {
            gesture: gesture.into(),
            index,
            duration_s,
            samples,
            measured_power,
        })
    }

    pub fn gesture(&self) -> &str {
        &self.gesture
    }

    /// Position of this segment within its gesture recording
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn duration_s(&self) -> f64 {
        self.duration_s
    }

    pub fn samples(&self) -> &[TrajectorySample] {
        &self.samples
    }

    pub fn measured_power(&self) -> &[f64] {
        &self.measured_power
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed segment
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Provider of segments for named gestures
pub trait SegmentSource {
    /// All segments of `gesture`, in recording order.
    fn segments(&self, gesture: &str) -> Result<Vec<Segment>, SegmentSourceError>;
}

/// On-disk form of one segment, column oriented
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentData {
    /// Segment duration in seconds
    pub duration: f64,
    pub positions: Vec<[f64; 3]>,
    /// Either empty (no orientation tracked) or one entry per position
    #[serde(default)]
    pub normals: Vec<Option<[f64; 3]>>,
    pub measured_power: Vec<f64>,
}

impl SegmentData {
    fn into_segment(self, gesture: &str, index: usize) -> Result<Segment, SegmentError> {
        if !self.normals.is_empty() && self.normals.len() != self.positions.len() {
            return Err(SegmentError::LengthMismatch {
                field: "normal",
                expected: self.positions.len(),
                actual: self.normals.len(),
            });
        }

        let samples = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, &position)| TrajectorySample {
                position: Vector3::from(position),
                normal: self.normals.get(i).copied().flatten().map(Vector3::from),
            })
            .collect();

        Segment::new(gesture, index, self.duration, samples, self.measured_power)
    }
}

impl From<&Segment> for SegmentData {
    fn from(segment: &Segment) -> Self {
        let normals = if segment.samples.iter().any(|s| s.normal.is_some()) {
            segment
                .samples
                .iter()
                .map(|s| s.normal.map(Into::into))
                .collect()
        } else {
            Vec::new()
        };

        Self {
            duration: segment.duration_s,
            positions: segment.samples.iter().map(|s| s.position.into()).collect(),
            normals,
            measured_power: segment.measured_power.clone(),
        }
    }
}

/// On-disk form of all segments of one gesture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentFile {
    pub segments: Vec<SegmentData>,
}

/// Reads `<data_dir>/<gesture>.segments.json`
#[derive(Debug, Clone)]
pub struct JsonSegmentSource {
    data_dir: PathBuf,
}

impl JsonSegmentSource {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File holding the segments of `gesture`
    pub fn path_for(&self, gesture: &str) -> PathBuf {
        self.data_dir.join(format!("{gesture}.segments.json"))
    }

    /// Store segments for `gesture`, replacing any existing file.
    pub fn write_segments(&self, gesture: &str, segments: &[Segment]) -> io::Result<PathBuf> {
        std::fs::create_dir_all(&self.data_dir)?;
        let file = SegmentFile {
            segments: segments.iter().map(SegmentData::from).collect(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let path = self.path_for(gesture);
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

impl SegmentSource for JsonSegmentSource {
    fn segments(&self, gesture: &str) -> Result<Vec<Segment>, SegmentSourceError> {
        let path = self.path_for(gesture);
        let json = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                SegmentSourceError::UnknownGesture(gesture.to_string())
            } else {
                SegmentSourceError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let file: SegmentFile = serde_json::from_str(&json)
            .map_err(|source| SegmentSourceError::Parse { path, source })?;

        file.segments
            .into_iter()
            .enumerate()
            .map(|(index, data)| {
                data.into_segment(gesture, index)
                    .map_err(|source| SegmentSourceError::Malformed {
                        gesture: gesture.to_string(),
                        index,
                        source,
                    })
            })
            .collect()
    }
}

/// Segments held in memory, keyed by gesture name
#[derive(Debug, Clone, Default)]
pub struct InMemorySegmentSource {
    gestures: HashMap<String, Vec<Segment>>,
}

impl InMemorySegmentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment to its gesture's list
    pub fn insert(&mut self, segment: Segment) {
        self.gestures
            .entry(segment.gesture.clone())
            .or_default()
            .push(segment);
    }
}

impl SegmentSource for InMemorySegmentSource {
    fn segments(&self, gesture: &str) -> Result<Vec<Segment>, SegmentSourceError> {
        self.gestures
            .get(gesture)
            .cloned()
            .ok_or_else(|| SegmentSourceError::UnknownGesture(gesture.to_string()))
    }
}
