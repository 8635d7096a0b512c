//! Per-segment calibration of simulated power onto measured power.
//!
//! Simulated power is relative, measured power is in sensor units. Each
//! segment is made comparable by a min/max affine remap:
//!
//! ```text
//! calibrated[i] = real_min + (sim[i] − sim_min) / (sim_max − sim_min) · (real_max − real_min)
//! ```
//!
//! The remap is monotone non-decreasing, keeps ties as ties, and never leaves
//! `[real_min, real_max]`. A constant simulated series has no shape to map;
//! what it becomes is set by [`DegeneratePolicy`].

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algo::min_max_scan::{MinMaxError, MinMaxScan, ValueRange};

/// Errors raised by [`SegmentCalibrator::calibrate`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Simulated series: {0}")]
    Simulated(MinMaxError),
    #[error("Measured series: {0}")]
    Measured(MinMaxError),
    #[error("Series range [{min}, {max}] is not finite")]
    NonFiniteRange { min: f64, max: f64 },
    #[error("Simulated series has {simulated} samples but measured series has {measured}")]
    LengthMismatch { simulated: usize, measured: usize },
}

/// Value assigned to every sample when the simulated series is constant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Minimum of the measured series
    #[default]
    Minimum,
    /// Midpoint of the measured range
    Midpoint,
}

/// A calibrated series
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub values: Vec<f64>,
    /// Range of the measured series the values were mapped into
    pub measured_range: ValueRange<f64>,
    /// True when the simulated series was constant and the fallback was used
    pub degenerate: bool,
}

/// Min/max calibrator for one segment at a time
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentCalibrator {
    pub degenerate_policy: DegeneratePolicy,
}

fn finite_range(
    series: &[f64],
    wrap: fn(MinMaxError) -> CalibrationError,
) -> Result<ValueRange<f64>, CalibrationError> {
    let range = MinMaxScan::new(series).range().map_err(wrap)?;
    if range.min.is_finite() && range.max.is_finite() {
        Ok(range)
    } else {
        Err(CalibrationError::NonFiniteRange {
            min: range.min,
            max: range.max,
        })
    }
}

impl SegmentCalibrator {
    pub fn new(degenerate_policy: DegeneratePolicy) -> Self {
        Self { degenerate_policy }
    }

    /// Map `simulated` onto the range of `measured`.
    ///
    /// Both series must be non-empty and NaN-free. Only the range of
    /// `measured` is used, so its length may differ; the output has the
    /// length of `simulated`. Use [`calibrate_paired`](Self::calibrate_paired)
    /// when the two series describe the same samples.
    ///
    /// # Example
    /// ```
    /// use radiometry::SegmentCalibrator;
    ///
    /// let cal = SegmentCalibrator::default()
    ///     .calibrate(&[0.0, 0.5, 1.0], &[10.0, 30.0, 20.0])
    ///     .unwrap();
    /// assert_eq!(cal.values, vec![10.0, 20.0, 30.0]);
    /// ```
    pub fn calibrate(
        &self,
        simulated: &[f64],
        measured: &[f64],
    ) -> Result<Calibration, CalibrationError> {
        let sim_range = finite_range(simulated, CalibrationError::Simulated)?;
        let real_range = finite_range(measured, CalibrationError::Measured)?;

        let values: Option<Vec<f64>> = simulated
            .iter()
            .map(|&value| sim_range.normalize(value).map(|t| real_range.interpolate(t)))
            .collect();

        if let Some(values) = values {
            return Ok(Calibration {
                values,
                measured_range: real_range,
                degenerate: false,
            });
        }

        let fill = match self.degenerate_policy {
            DegeneratePolicy::Minimum => real_range.min,
            DegeneratePolicy::Midpoint => real_range.midpoint(),
        };
        warn!(
            "Simulated series is constant ({}); filling {} samples with {:?} value {}",
            sim_range.min,
            simulated.len(),
            self.degenerate_policy,
            fill
        );
        Ok(Calibration {
            values: vec![fill; simulated.len()],
            measured_range: real_range,
            degenerate: true,
        })
    }

    /// Like [`calibrate`](Self::calibrate), for a simulated and a measured
    /// series taken at the same samples. Fails unless both have equal length.
    pub fn calibrate_paired(
        &self,
        simulated: &[f64],
        measured: &[f64],
    ) -> Result<Calibration, CalibrationError> {
        if simulated.len() != measured.len() {
            return Err(CalibrationError::LengthMismatch {
                simulated: simulated.len(),
                measured: measured.len(),
            });
        }
        self.calibrate(simulated, measured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_constant_simulation_falls_back_to_minimum() {
        let cal = SegmentCalibrator::default()
            .calibrate(&[5.0, 5.0, 5.0], &[2.0, 8.0])
            .unwrap();

        assert_eq!(cal.values, vec![2.0, 2.0, 2.0]);
        assert!(cal.degenerate);
    }

    #[test]
    fn test_constant_simulation_midpoint_policy() {
        let cal = SegmentCalibrator::new(DegeneratePolicy::Midpoint)
            .calibrate(&[0.0, 0.0], &[2.0, 8.0, 4.0])
            .unwrap();

        assert_eq!(cal.values, vec![5.0, 5.0]);
        assert!(cal.degenerate);
    }

    #[test]
    fn test_values_stay_in_measured_range() {
        let simulated = [0.013, 0.4, 0.2, 0.0001, 0.399_999_9, 0.25];
        let measured = [1.7, 3.3, 2.9, 1.9, 2.2, 2.0];
        let cal = SegmentCalibrator::default()
            .calibrate(&simulated, &measured)
            .unwrap();

        assert_eq!(cal.values.len(), simulated.len());
        for &v in &cal.values {
            assert!((1.7..=3.3).contains(&v), "{v} out of range");
        }
        // Extremes map onto the measured extremes
        assert_relative_eq!(cal.values[1], 3.3);
        assert_relative_eq!(cal.values[3], 1.7);
        assert!(!cal.degenerate);
    }

    #[test]
    fn test_increasing_input_gives_non_decreasing_output() {
        let simulated: Vec<f64> = (0..50).map(|i| (i as f64 * 0.1).exp()).collect();
        let measured = [0.25, 0.26, 0.251];
        let cal = SegmentCalibrator::default()
            .calibrate(&simulated, &measured)
            .unwrap();

        for pair in cal.values.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn test_ties_map_to_ties() {
        let cal = SegmentCalibrator::default()
            .calibrate(&[0.1, 0.3, 0.1, 0.2], &[0.0, 10.0])
            .unwrap();

        assert_eq!(cal.values[0], cal.values[2]);
        assert_relative_eq!(cal.values[3], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_identity_when_ranges_coincide() {
        let series = [2.0, 4.5, 3.0, 8.0];
        let cal = SegmentCalibrator::default()
            .calibrate(&series, &[8.0, 2.0])
            .unwrap();

        for (calibrated, original) in cal.values.iter().zip(series) {
            assert_relative_eq!(*calibrated, original, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_and_nan_inputs_rejected() {
        let calibrator = SegmentCalibrator::default();

        assert_eq!(
            calibrator.calibrate(&[], &[1.0]),
            Err(CalibrationError::Simulated(MinMaxError::NoData))
        );
        assert_eq!(
            calibrator.calibrate(&[1.0], &[]),
            Err(CalibrationError::Measured(MinMaxError::NoData))
        );
        assert_eq!(
            calibrator.calibrate(&[1.0, 2.0], &[1.0, f64::NAN]),
            Err(CalibrationError::Measured(MinMaxError::NaNEncountered(1)))
        );
        assert!(matches!(
            calibrator.calibrate(&[1.0, f64::INFINITY], &[1.0, 2.0]),
            Err(CalibrationError::NonFiniteRange { .. })
        ));
    }

    #[test]
    fn test_paired_calibration_requires_equal_lengths() {
        let calibrator = SegmentCalibrator::default();

        assert_eq!(
            calibrator.calibrate_paired(&[5.0, 5.0, 5.0], &[2.0, 8.0]),
            Err(CalibrationError::LengthMismatch {
                simulated: 3,
                measured: 2
            })
        );

        let cal = calibrator
            .calibrate_paired(&[0.0, 1.0, 0.5], &[2.0, 8.0, 4.0])
            .unwrap();
        assert_eq!(cal.values, vec![2.0, 8.0, 5.0]);
    }
}
