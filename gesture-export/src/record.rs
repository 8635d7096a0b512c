//! The per-gesture export record.

use std::io;
use std::path::Path;

use radiometry::{GeometryParameters, LightSource, LightSourceDescriptor, PowerModel};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::segment::Segment;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Record has {expected} samples but {field} has {actual} values")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Raw and calibrated power for one model
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedSeries {
    pub model: PowerModel,
    pub raw: Vec<f64>,
    pub calibrated: Vec<f64>,
}

/// Everything exported for one gesture segment.
///
/// Field names are the JSON keys downstream plotting reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub segment_index: usize,
    /// Segment duration in seconds
    pub duration: f64,
    pub num_samples: usize,
    /// Samples per second
    pub sampling_rate: f64,
    pub positions: Vec<[f64; 3]>,
    pub normals: Vec<Option<[f64; 3]>>,
    pub real_power: Vec<f64>,
    pub sim_oriented_raw: Vec<f64>,
    pub sim_oriented: Vec<f64>,
    pub sim_parallel_raw: Vec<f64>,
    pub sim_parallel: Vec<f64>,
    pub a_values: Vec<f64>,
    #[serde(rename = "H_values")]
    pub h_values: Vec<f64>,
    pub light_source: LightSourceDescriptor,
}

impl ExportRecord {
    /// Assemble a record and check that every per-sample array matches the
    /// segment's sample count.
    ///
    /// `segment_index` is the position the segment was selected at, which is
    /// what gets recorded; the segment's own index is not trusted.
    pub fn assemble(
        segment: &Segment,
        segment_index: usize,
        sampling_rate: f64,
        light_source: &LightSource,
        geometry: &[GeometryParameters],
        oriented: SimulatedSeries,
        parallel: SimulatedSeries,
    ) -> Result<Self, RecordError> {
        let samples = segment.samples();
        let record = Self {
            name: segment.gesture().to_string(),
            segment_index,
            duration: segment.duration_s(),
            num_samples: segment.len(),
            sampling_rate,
            positions: samples.iter().map(|s| s.position.into()).collect(),
            normals: samples.iter().map(|s| s.normal.map(Into::into)).collect(),
            real_power: segment.measured_power().to_vec(),
            sim_oriented_raw: oriented.raw,
            sim_oriented: oriented.calibrated,
            sim_parallel_raw: parallel.raw,
            sim_parallel: parallel.calibrated,
            a_values: geometry.iter().map(|g| g.lateral_offset).collect(),
            h_values: geometry.iter().map(|g| g.axial_separation).collect(),
            light_source: light_source.descriptor(),
        };

        record.validate()?;
        Ok(record)
    }

    /// Check the equal-length invariant across all per-sample arrays
    pub fn validate(&self) -> Result<(), RecordError> {
        let lengths = [
            ("positions", self.positions.len()),
            ("normals", self.normals.len()),
            ("real_power", self.real_power.len()),
            ("sim_oriented_raw", self.sim_oriented_raw.len()),
            ("sim_oriented", self.sim_oriented.len()),
            ("sim_parallel_raw", self.sim_parallel_raw.len()),
            ("sim_parallel", self.sim_parallel.len()),
            ("a_values", self.a_values.len()),
            ("H_values", self.h_values.len()),
        ];

        match lengths.iter().find(|(_, len)| *len != self.num_samples) {
            Some(&(field, actual)) => Err(RecordError::LengthMismatch {
                field,
                expected: self.num_samples,
                actual,
            }),
            None => Ok(()),
        }
    }

    /// Raw and calibrated series of `model`
    pub fn series(&self, model: PowerModel) -> (&[f64], &[f64]) {
        match model {
            PowerModel::OrientedDisk => (&self.sim_oriented_raw, &self.sim_oriented),
            PowerModel::Parallel => (&self.sim_parallel_raw, &self.sim_parallel),
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use radiometry::TrajectorySample;

    fn segment() -> Segment {
        Segment::new(
            "Circle",
            0,
            0.02,
            vec![
                TrajectorySample::new(Vector3::new(0.0, 9.0, 0.0)),
                TrajectorySample::with_normal(Vector3::new(0.0, 8.0, 0.0), -Vector3::y()),
            ],
            vec![1.0, 2.0],
        )
        .unwrap()
    }

    fn series(model: PowerModel, raw: Vec<f64>) -> SimulatedSeries {
        SimulatedSeries {
            model,
            calibrated: raw.clone(),
            raw,
        }
    }

    fn geometry() -> Vec<GeometryParameters> {
        vec![
            GeometryParameters {
                lateral_offset: 0.0,
                axial_separation: 1.0,
            },
            GeometryParameters {
                lateral_offset: 0.0,
                axial_separation: 2.0,
            },
        ]
    }

    #[test]
    fn test_assemble_copies_segment() {
        let source = LightSource::new(Vector3::new(0.0, 10.0, 0.0), 2.0, Vector3::y()).unwrap();
        let record = ExportRecord::assemble(
            &segment(),
            0,
            100.0,
            &source,
            &geometry(),
            series(PowerModel::OrientedDisk, vec![0.5, 0.2]),
            series(PowerModel::Parallel, vec![0.5, 0.2]),
        )
        .unwrap();

        assert_eq!(record.name, "Circle");
        assert_eq!(record.num_samples, 2);
        assert_eq!(record.normals, vec![None, Some([0.0, -1.0, 0.0])]);
        assert_eq!(record.h_values, vec![1.0, 2.0]);
        assert_eq!(record.series(PowerModel::Parallel).0, &[0.5, 0.2]);
    }

    #[test]
    fn test_assemble_rejects_short_series() {
        let result = ExportRecord::assemble(
            &segment(),
            0,
            100.0,
            &LightSource::default(),
            &geometry(),
            series(PowerModel::OrientedDisk, vec![0.5]),
            series(PowerModel::Parallel, vec![0.5, 0.2]),
        );

        assert_eq!(
            result,
            Err(RecordError::LengthMismatch {
                field: "sim_oriented_raw",
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_json_keys() {
        let record = ExportRecord::assemble(
            &segment(),
            0,
            100.0,
            &LightSource::default(),
            &geometry(),
            series(PowerModel::OrientedDisk, vec![0.1, 0.2]),
            series(PowerModel::Parallel, vec![0.3, 0.4]),
        )
        .unwrap();
        let value = serde_json::to_value(&record).unwrap();

        for key in [
            "name",
            "segment_index",
            "duration",
            "num_samples",
            "sampling_rate",
            "positions",
            "normals",
            "real_power",
            "sim_oriented",
            "sim_parallel",
            "a_values",
            "H_values",
            "light_source",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert!(value["light_source"].get("position").is_some());
        assert!(value["light_source"].get("diameter").is_some());
    }
}
