//! Disk-source radiometry for moving point receivers
//!
//! This crate estimates the optical power a small receiver picks up from a
//! fixed, flat, circular emitter and rescales the simulated signal onto a
//! measured one so the two can be compared sample by sample:
//!
//! - **View factor** - exact disk-to-point view factor by adaptive double
//!   quadrature, with a closed-form cross-check
//! - **Power models** - orientation-agnostic (`parallel`) and
//!   orientation-aware (`oriented_disk`) received-power series
//! - **Calibration** - per-segment min/max affine remap onto a measured range
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use radiometry::{LightSource, PowerModel, TrajectorySample, ViewFactorIntegrator};
//!
//! let lamp = LightSource::new(Vector3::new(0.0, 10.0, 0.0), 2.0, Vector3::y()).unwrap();
//! let samples = vec![TrajectorySample::new(Vector3::new(0.0, 9.0, 0.0))];
//!
//! let sim = PowerModel::Parallel.simulate(&samples, &lamp, &ViewFactorIntegrator::default());
//! assert!((sim.power[0] - 0.5).abs() < 1e-3);
//! ```

pub mod algo;
pub mod calibration;
pub mod geometry;
pub mod light_source;
pub mod power_model;
pub mod view_factor;

pub use algo::min_max_scan::{MinMaxError, MinMaxScan, ValueRange};
pub use algo::quadrature::{Quadrature, QuadratureConfig, QuadratureError};
pub use calibration::{Calibration, CalibrationError, DegeneratePolicy, SegmentCalibrator};
pub use geometry::GeometryParameters;
pub use light_source::{LightSource, LightSourceDescriptor, LightSourceError};
pub use power_model::{
    orientation_factor, OrientationCorrection, PowerModel, SamplePower, Simulation,
    SimulationDiagnostics, TrajectorySample,
};
pub use view_factor::{
    closed_form_view_factor, disk_kernel, IntegrationMethod, ViewFactorEstimate,
    ViewFactorIntegrator, ViewFactorStatus,
};
