//! Received-power models for a moving receiver under a disk lamp.
//!
//! Both models share one path per sample: decompose the receiver position
//! into [`GeometryParameters`], evaluate the disk view factor, clamp it into
//! `[0, 1]`. The oriented model then applies a cosine-law orientation factor
//! from the receiver normal; for the parallel model that step is a no-op and
//! the receiver is assumed to face the lamp squarely.
//!
//! Outputs are relative: they carry no physical unit and are only meaningful
//! after calibration against a measured series.

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::geometry::GeometryParameters;
use crate::light_source::LightSource;
use crate::view_factor::{ViewFactorIntegrator, ViewFactorStatus};

/// Geometric power model variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerModel {
    /// Receiver always faces the lamp; power is the view factor alone
    Parallel,
    /// View factor attenuated by the cosine between receiver facing and lamp direction
    OrientedDisk,
}

impl fmt::Display for PowerModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One tracked receiver pose
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub position: Vector3<f64>,
    /// Tracker normal of the receiver mount. The sensing face points the
    /// opposite way, so a normal aimed at the lamp means the sensor faces away.
    pub normal: Option<Vector3<f64>>,
}

impl TrajectorySample {
    pub fn new(position: Vector3<f64>) -> Self {
        Self {
            position,
            normal: None,
        }
    }

    pub fn with_normal(position: Vector3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            position,
            normal: Some(normal),
        }
    }
}

/// Outcome of the orientation step for one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrientationCorrection {
    /// Parallel model, or no normal for this sample
    NotApplied,
    /// Factor in `[0, 1]` that multiplied the view factor
    Applied(f64),
    /// Zero-length normal or receiver at the disk center; correction skipped
    Degenerate,
}

/// Cosine-law factor between the sensing face and the lamp direction.
///
/// The sensing face is `-normal`. Returns `None` when either vector has zero
/// length. Facing away from the lamp gives exactly 0, never a negative value.
pub fn orientation_factor(normal: &Vector3<f64>, to_source: &Vector3<f64>) -> Option<f64> {
    let facing = -normal;
    let facing_norm = facing.norm();
    let distance = to_source.norm();
    if facing_norm > 0.0 && distance > 0.0 {
        let cos_theta = facing.dot(to_source) / (facing_norm * distance);
        Some(cos_theta.max(0.0))
    } else {
        None
    }
}

/// Full breakdown of one simulated sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePower {
    pub power: f64,
    pub geometry: GeometryParameters,
    pub view_factor: ViewFactorStatus,
    pub orientation: OrientationCorrection,
}

/// Counts of fallback values used during a simulation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationDiagnostics {
    /// Samples whose view factor integration failed and was replaced by 0
    pub integration_failures: usize,
    /// Samples at or behind the disk plane
    pub no_view_samples: usize,
    /// Samples where the orientation factor could not be formed
    pub degenerate_orientations: usize,
}

impl SimulationDiagnostics {
    /// True when no fallback value was used
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    fn record(&mut self, sample: &SamplePower) {
        match sample.view_factor {
            ViewFactorStatus::Computed => {}
            ViewFactorStatus::NoView => self.no_view_samples += 1,
            ViewFactorStatus::IntegrationFailed => self.integration_failures += 1,
        }
        if sample.orientation == OrientationCorrection::Degenerate {
            self.degenerate_orientations += 1;
        }
    }
}

/// Raw simulated series for one model
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub model: PowerModel,
    /// Raw relative power per sample, each in `[0, 1]`
    pub power: Vec<f64>,
    pub geometry: Vec<GeometryParameters>,
    pub diagnostics: SimulationDiagnostics,
}

impl Simulation {
    pub fn len(&self) -> usize {
        self.power.len()
    }

    pub fn is_empty(&self) -> bool {
        self.power.is_empty()
    }

    /// Lateral offsets `a`
    pub fn a_values(&self) -> Vec<f64> {
        self.geometry.iter().map(|g| g.lateral_offset).collect()
    }

    /// Axial separations `H`
    pub fn h_values(&self) -> Vec<f64> {
        self.geometry.iter().map(|g| g.axial_separation).collect()
    }
}

impl PowerModel {
    pub const ALL: [PowerModel; 2] = [PowerModel::OrientedDisk, PowerModel::Parallel];

    pub fn name(&self) -> &'static str {
        match self {
            PowerModel::Parallel => "parallel",
            PowerModel::OrientedDisk => "oriented_disk",
        }
    }

    /// Simulate a single receiver pose.
    pub fn sample_power(
        &self,
        sample: &TrajectorySample,
        source: &LightSource,
        integrator: &ViewFactorIntegrator,
    ) -> SamplePower {
        let geometry = GeometryParameters::between(&sample.position, source);
        let estimate = integrator.evaluate(
            geometry.lateral_offset,
            geometry.axial_separation,
            source.diameter(),
        );
        let view_factor = estimate.value.clamp(0.0, 1.0);

        let orientation = match (self, sample.normal) {
            (PowerModel::OrientedDisk, Some(normal)) => {
                match orientation_factor(&normal, &source.offset_from(&sample.position)) {
                    Some(factor) => OrientationCorrection::Applied(factor),
                    None => OrientationCorrection::Degenerate,
                }
            }
            _ => OrientationCorrection::NotApplied,
        };

        let power = match orientation {
            OrientationCorrection::Applied(factor) => view_factor * factor,
            _ => view_factor,
        };

        SamplePower {
            power,
            geometry,
            view_factor: estimate.status,
            orientation,
        }
    }

    /// Simulate a whole trajectory.
    ///
    /// The returned series all have the same length as `samples`.
    pub fn simulate(
        &self,
        samples: &[TrajectorySample],
        source: &LightSource,
        integrator: &ViewFactorIntegrator,
    ) -> Simulation {
        let mut diagnostics = SimulationDiagnostics::default();
        let mut power = Vec::with_capacity(samples.len());
        let mut geometry = Vec::with_capacity(samples.len());

        for sample in samples {
            let result = self.sample_power(sample, source, integrator);
            diagnostics.record(&result);
            power.push(result.power);
            geometry.push(result.geometry);
        }

        Simulation {
            model: *self,
            power,
            geometry,
            diagnostics,
        }
    }
}
