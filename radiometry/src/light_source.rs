//! Fixed disk emitter description.
//!
//! A [`LightSource`] is a flat circular emitter with a center position, a
//! diameter and an orientation axis (the disk normal). Offsets and heights of
//! a receiver are always measured relative to that axis, so the axis is an
//! explicit parameter rather than an assumption about which coordinate points
//! up in the tracking frame.
//!
//! The axis points from the illuminated half-space toward the disk: a
//! receiver at `p` sees the emitting face when `(position - p) · axis > 0`.

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a [`LightSource`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LightSourceError {
    #[error("Diameter must be positive and finite, got {0}")]
    InvalidDiameter(f64),
    #[error("Position must be finite, got {0:?}")]
    NonFinitePosition([f64; 3]),
    #[error("Orientation axis must be a finite non-zero vector, got {0:?}")]
    DegenerateAxis([f64; 3]),
}

/// Plain serializable form of a [`LightSource`].
///
/// This is the shape stored in configuration files and export records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightSourceDescriptor {
    /// Disk center in tracking coordinates
    pub position: [f64; 3],
    /// Disk diameter, same length unit as `position`
    pub diameter: f64,
    /// Disk normal pointing from the lit side toward the disk; need not be normalized
    #[serde(default = "default_axis")]
    pub axis: [f64; 3],
}

fn default_axis() -> [f64; 3] {
    [0.0, 1.0, 0.0]
}

/// A validated disk emitter. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LightSourceDescriptor", into = "LightSourceDescriptor")]
pub struct LightSource {
    position: Vector3<f64>,
    diameter: f64,
    axis: Unit<Vector3<f64>>,
}

impl LightSource {
    /// Build a light source, normalizing `axis`.
    pub fn new(
        position: Vector3<f64>,
        diameter: f64,
        axis: Vector3<f64>,
    ) -> Result<Self, LightSourceError> {
        if !(diameter.is_finite() && diameter > 0.0) {
            return Err(LightSourceError::InvalidDiameter(diameter));
        }
        if !position.iter().all(|c| c.is_finite()) {
            return Err(LightSourceError::NonFinitePosition(position.into()));
        }
        if !axis.iter().all(|c| c.is_finite()) {
            return Err(LightSourceError::DegenerateAxis(axis.into()));
        }
        let axis = Unit::try_new(axis, f64::EPSILON)
            .ok_or(LightSourceError::DegenerateAxis(axis.into()))?;

        Ok(Self {
            position,
            diameter,
            axis,
        })
    }

    /// The lamp used for the recorded gesture sessions: a 200 mm disk hanging
    /// above the tracking volume and shining down, so the axis is +Y.
    pub fn reference_lamp() -> Self {
        Self {
            position: Vector3::new(-159.81, 868.82, 168.23),
            diameter: 200.0,
            axis: Vector3::y_axis(),
        }
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.position
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn radius(&self) -> f64 {
        0.5 * self.diameter
    }

    /// Unit disk normal
    pub fn axis(&self) -> &Unit<Vector3<f64>> {
        &self.axis
    }

    /// Vector from `receiver` to the disk center
    pub fn offset_from(&self, receiver: &Vector3<f64>) -> Vector3<f64> {
        self.position - receiver
    }

    pub fn descriptor(&self) -> LightSourceDescriptor {
        LightSourceDescriptor {
            position: self.position.into(),
            diameter: self.diameter,
            axis: self.axis.into_inner().into(),
        }
    }
}

impl Default for LightSource {
    fn default() -> Self {
        Self::reference_lamp()
    }
}

impl TryFrom<LightSourceDescriptor> for LightSource {
    type Error = LightSourceError;

    fn try_from(descriptor: LightSourceDescriptor) -> Result<Self, Self::Error> {
        Self::new(
            Vector3::from(descriptor.position),
            descriptor.diameter,
            Vector3::from(descriptor.axis),
        )
    }
}

impl From<LightSource> for LightSourceDescriptor {
    fn from(source: LightSource) -> Self {
        source.descriptor()
    }
}
