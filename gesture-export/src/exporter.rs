//! Gesture export orchestration.
//!
//! For each requested gesture: fetch its segments, pick the requested one,
//! simulate both power models, calibrate each against the measured power and
//! assemble an [`ExportRecord`]. A batch keeps going when a gesture fails; the
//! failure is logged and listed in the [`BatchSummary`].

use std::error::Error as StdError;
use std::path::PathBuf;

use log::{error, info, warn};
use radiometry::{
    CalibrationError, GeometryParameters, LightSource, PowerModel, SegmentCalibrator,
    SimulationDiagnostics, ViewFactorIntegrator,
};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::{ExportConfig, GestureRequest};
use crate::record::{ExportRecord, RecordError, SimulatedSeries};
use crate::segment::{Segment, SegmentSource, SegmentSourceError};
use crate::writer::{RecordWriter, WriteError};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Could not load segments")]
    Source(#[from] SegmentSourceError),
    #[error("Gesture '{0}' has no segments")]
    NoSegments(String),
    #[error("Calibration of the {model} series failed")]
    Calibration {
        model: PowerModel,
        #[source]
        source: CalibrationError,
    },
    #[error("Inconsistent record")]
    Record(#[from] RecordError),
    #[error("Could not write record")]
    Write(#[from] WriteError),
}

/// Format an error followed by each of its sources, `outer: inner: root`.
pub fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Fallbacks and substitutions that happened while exporting one gesture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportDiagnostics {
    pub requested_index: usize,
    pub used_index: usize,
    pub oriented: SimulationDiagnostics,
    pub parallel: SimulationDiagnostics,
    /// Oriented series was constant and got the fallback value
    pub oriented_degenerate_calibration: bool,
    pub parallel_degenerate_calibration: bool,
}

impl ExportDiagnostics {
    pub fn substituted_index(&self) -> bool {
        self.requested_index != self.used_index
    }

    /// True when no fallback was needed anywhere
    pub fn is_clean(&self) -> bool {
        !self.substituted_index()
            && self.oriented.is_clean()
            && self.parallel.is_clean()
            && !self.oriented_degenerate_calibration
            && !self.parallel_degenerate_calibration
    }
}

/// A record together with how it was produced
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub record: ExportRecord,
    pub diagnostics: ExportDiagnostics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportedGesture {
    pub name: String,
    pub segment_index: usize,
    pub num_samples: usize,
    pub path: PathBuf,
    pub diagnostics: ExportDiagnostics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailedGesture {
    pub name: String,
    /// Error message including its source chain
    pub error: String,
}

/// Result of a batch, in request order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub exported: Vec<ExportedGesture>,
    pub failed: Vec<FailedGesture>,
}

impl BatchSummary {
    /// True when every requested gesture was exported
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn log(&self) {
        info!(
            "Export finished: {} exported, {} failed",
            self.exported.len(),
            self.failed.len()
        );
        for gesture in &self.exported {
            info!(
                "  {} (segment {}, {} samples) -> {}",
                gesture.name,
                gesture.segment_index,
                gesture.num_samples,
                gesture.path.display()
            );
        }
        for gesture in &self.failed {
            warn!("  {} failed: {}", gesture.name, gesture.error);
        }
    }

    fn push(&mut self, request: &GestureRequest, result: Result<ExportedGesture, ExportError>) {
        match result {
            Ok(exported) => self.exported.push(exported),
            Err(e) => {
                let message = error_chain(&e);
                error!("Failed to export gesture '{}': {}", request.name, message);
                self.failed.push(FailedGesture {
                    name: request.name.clone(),
                    error: message,
                });
            }
        }
    }
}

/// Runs the simulate/calibrate/assemble pipeline over a [`SegmentSource`].
#[derive(Debug, Clone)]
pub struct GestureExporter<S> {
    source: S,
    light_source: LightSource,
    integrator: ViewFactorIntegrator,
    calibrator: SegmentCalibrator,
    sampling_rate_hz: f64,
}

impl<S: SegmentSource> GestureExporter<S> {
    /// Exporter with default integrator, calibrator and a 100 Hz sampling rate
    pub fn new(source: S, light_source: LightSource) -> Self {
        Self {
            source,
            light_source,
            integrator: ViewFactorIntegrator::default(),
            calibrator: SegmentCalibrator::default(),
            sampling_rate_hz: 100.0,
        }
    }

    pub fn from_config(source: S, config: &ExportConfig) -> Self {
        Self {
            source,
            light_source: config.light_source.clone(),
            integrator: config.integrator,
            calibrator: SegmentCalibrator::new(config.degenerate_policy),
            sampling_rate_hz: config.sampling_rate_hz,
        }
    }

    pub fn with_integrator(mut self, integrator: ViewFactorIntegrator) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn with_calibrator(mut self, calibrator: SegmentCalibrator) -> Self {
        self.calibrator = calibrator;
        self
    }

    pub fn with_sampling_rate(mut self, sampling_rate_hz: f64) -> Self {
        self.sampling_rate_hz = sampling_rate_hz;
        self
    }

    pub fn light_source(&self) -> &LightSource {
        &self.light_source
    }

    /// Build the record for one gesture.
    ///
    /// A segment index past the end of the gesture's segments falls back to
    /// segment 0 with a warning.
    pub fn export(&self, request: &GestureRequest) -> Result<ExportOutcome, ExportError> {
        info!(
            "Processing gesture '{}' segment {}",
            request.name, request.segment_index
        );

        let mut segments = self.source.segments(&request.name)?;
        if segments.is_empty() {
            return Err(ExportError::NoSegments(request.name.clone()));
        }

        let used_index = if request.segment_index < segments.len() {
            request.segment_index
        } else {
            warn!(
                "Segment {} out of range for '{}' ({} segments), using segment 0",
                request.segment_index,
                request.name,
                segments.len()
            );
            0
        };
        let segment = segments.swap_remove(used_index);

        let oriented = self.run_model(PowerModel::OrientedDisk, &segment)?;
        let parallel = self.run_model(PowerModel::Parallel, &segment)?;
        let diagnostics = ExportDiagnostics {
            requested_index: request.segment_index,
            used_index,
            oriented: oriented.diagnostics,
            parallel: parallel.diagnostics,
            oriented_degenerate_calibration: oriented.degenerate,
            parallel_degenerate_calibration: parallel.degenerate,
        };

        let record = ExportRecord::assemble(
            &segment,
            used_index,
            self.sampling_rate_hz,
            &self.light_source,
            &oriented.geometry,
            oriented.series,
            parallel.series,
        )?;

        Ok(ExportOutcome {
            record,
            diagnostics,
        })
    }

    fn run_model(&self, model: PowerModel, segment: &Segment) -> Result<ModelRun, ExportError> {
        let simulation = model.simulate(segment.samples(), &self.light_source, &self.integrator);
        if !simulation.diagnostics.is_clean() {
            warn!(
                "'{}' {} model used fallbacks: {:?}",
                segment.gesture(),
                model,
                simulation.diagnostics
            );
        }

        let calibration = self
            .calibrator
            .calibrate_paired(&simulation.power, segment.measured_power())
            .map_err(|source| ExportError::Calibration { model, source })?;

        Ok(ModelRun {
            series: SimulatedSeries {
                model,
                raw: simulation.power,
                calibrated: calibration.values,
            },
            geometry: simulation.geometry,
            diagnostics: simulation.diagnostics,
            degenerate: calibration.degenerate,
        })
    }

    fn export_and_write<W: RecordWriter>(
        &self,
        request: &GestureRequest,
        writer: &W,
    ) -> Result<ExportedGesture, ExportError> {
        let outcome = self.export(request)?;
        let path = writer.write(&outcome.record)?;
        info!(
            "Saved '{}' ({} samples) to {}",
            outcome.record.name,
            outcome.record.num_samples,
            path.display()
        );

        Ok(ExportedGesture {
            name: outcome.record.name,
            segment_index: outcome.record.segment_index,
            num_samples: outcome.record.num_samples,
            path,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Export and write every request in turn.
    pub fn export_batch<W: RecordWriter>(
        &self,
        requests: &[GestureRequest],
        writer: &W,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for request in requests {
            let result = self.export_and_write(request, writer);
            summary.push(request, result);
        }
        summary
    }
}

impl<S: SegmentSource + Sync> GestureExporter<S> {
    /// Like [`export_batch`](Self::export_batch), with gestures processed on
    /// the rayon pool. The summary keeps request order.
    pub fn export_batch_parallel<W: RecordWriter>(
        &self,
        requests: &[GestureRequest],
        writer: &W,
    ) -> BatchSummary {
        let results: Vec<_> = requests
            .par_iter()
            .map(|request| self.export_and_write(request, writer))
            .collect();

        let mut summary = BatchSummary::default();
        for (request, result) in requests.iter().zip(results) {
            summary.push(request, result);
        }
        summary
    }
}

/// Simulated and calibrated output of one model for one segment
struct ModelRun {
    series: SimulatedSeries,
    geometry: Vec<GeometryParameters>,
    diagnostics: SimulationDiagnostics,
    degenerate: bool,
}
