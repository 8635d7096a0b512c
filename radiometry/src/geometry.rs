//! Receiver geometry relative to the disk axis.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::light_source::LightSource;

/// Per-sample geometry of a receiver relative to a [`LightSource`].
///
/// The receiver-to-source vector `v` is split against the unit disk axis `n̂`:
///
/// ```text
/// H = v · n̂              (axial separation)
/// a = |v - H n̂|          (lateral offset)
/// ```
///
/// `H > 0` means the receiver sits on the emitting side of the disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryParameters {
    /// Distance from the receiver to the disk axis
    pub lateral_offset: f64,
    /// Signed distance from the receiver to the disk plane along the axis
    pub axial_separation: f64,
}

impl GeometryParameters {
    /// Decompose the receiver-to-source vector for `receiver`.
    pub fn between(receiver: &Vector3<f64>, source: &LightSource) -> Self {
        let axis = source.axis().into_inner();
        let to_source = source.offset_from(receiver);
        let axial_separation = to_source.dot(&axis);
        let lateral = to_source - axis * axial_separation;

        Self {
            lateral_offset: lateral.norm(),
            axial_separation,
        }
    }

    /// True when the receiver can see the emitting face at all
    pub fn has_view(&self) -> bool {
        self.axial_separation > 0.0
    }
}
