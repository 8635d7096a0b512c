//! Numerical building blocks shared by the radiometric models
//!
//! This module provides adaptive quadrature for the view-factor integral and
//! NaN-aware range scanning for series calibration.

pub mod min_max_scan;
pub mod quadrature;

pub use min_max_scan::{MinMaxError, MinMaxScan, ValueRange};
pub use quadrature::{Quadrature, QuadratureConfig, QuadratureError};
