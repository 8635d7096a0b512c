//! View factor between a differential receiver and a disk emitter.
//!
//! For a receiver element parallel to a disk of radius `R`, offset laterally
//! by `a` from the disk axis and separated from the disk plane by `H`, the view
//! factor is the polar double integral
//!
//! ```text
//!            H²   R   2π            r'
//!      F  =  --  ∫   ∫   ------------------------------ dφ dr'
//!            π   0   0   (r'² − 2 a r' cos φ + a² + H²)²
//! ```
//!
//! On the axis (`a = 0`) this reduces to `R² / (R² + H²)`. Off the axis it
//! has the closed form
//!
//! ```text
//!      F = ½ [ 1 − (H² + a² − R²) / √((H² + (a − R)²)(H² + (a + R)²)) ]
//! ```
//!
//! which [`closed_form_view_factor`] evaluates and which is used to check the
//! quadrature.
//!
//! # Failure policy
//!
//! A receiver at or behind the disk plane (`H ≤ 0`) has no view and gets
//! `F = 0`. A quadrature that does not converge also yields `F = 0`: one bad
//! sample must not stop a batch. [`ViewFactorIntegrator::evaluate`] reports
//! which of these happened so callers can count the fallbacks.

use std::f64::consts::{PI, TAU};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::algo::quadrature::{QuadratureConfig, QuadratureError};

/// Evaluation strategy for the view factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Adaptive double quadrature of the disk kernel
    #[default]
    Quadrature,
    /// Analytic off-axis expression
    ClosedForm,
}

impl std::fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrationMethod::Quadrature => write!(f, "quadrature"),
            IntegrationMethod::ClosedForm => write!(f, "closed_form"),
        }
    }
}

/// How a view factor value came about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewFactorStatus {
    /// Computed normally
    Computed,
    /// `H ≤ 0`: receiver at or behind the disk plane
    NoView,
    /// Numerical evaluation failed; value replaced by zero
    IntegrationFailed,
}

/// A view factor together with its provenance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFactorEstimate {
    pub value: f64,
    pub status: ViewFactorStatus,
}

impl ViewFactorEstimate {
    fn zero(status: ViewFactorStatus) -> Self {
        Self { value: 0.0, status }
    }
}

/// The disk kernel `r' / (r'² − 2 a r' cos φ + a² + H²)²`.
///
/// A denominator of exactly zero contributes nothing instead of dividing by
/// zero; it only happens at `r' = a, φ = 0, H = 0`.
pub fn disk_kernel(r_prime: f64, phi: f64, a: f64, h: f64) -> f64 {
    let base = r_prime * r_prime - 2.0 * a * r_prime * phi.cos() + a * a + h * h;
    let denominator = base * base;
    if denominator == 0.0 {
        0.0
    } else {
        r_prime / denominator
    }
}

/// Analytic view factor from a parallel differential element to a disk.
///
/// Returns 0 for `H ≤ 0`.
pub fn closed_form_view_factor(a: f64, h: f64, diameter: f64) -> f64 {
    if !(h > 0.0) {
        return 0.0;
    }
    let r = 0.5 * diameter;
    let h2 = h * h;
    let near = h2 + (a - r) * (a - r);
    let far = h2 + (a + r) * (a + r);

    0.5 * (1.0 - (h2 + a * a - r * r) / (near * far).sqrt())
}

/// View factor engine.
///
/// Defaults to adaptive quadrature with the standard QUADPACK tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewFactorIntegrator {
    pub method: IntegrationMethod,
    #[serde(flatten)]
    pub quadrature: QuadratureConfig,
}

impl ViewFactorIntegrator {
    pub fn new(method: IntegrationMethod, quadrature: QuadratureConfig) -> Self {
        Self { method, quadrature }
    }

    /// Integrator using the analytic expression only
    pub fn closed_form() -> Self {
        Self {
            method: IntegrationMethod::ClosedForm,
            ..Default::default()
        }
    }

    /// View factor for offset `a`, separation `h` and disk `diameter`.
    ///
    /// Never fails: degenerate geometry and integration failures give 0.
    ///
    /// # Example
    /// ```
    /// use radiometry::ViewFactorIntegrator;
    ///
    /// // On axis, R = 1, H = 1: F = R² / (R² + H²) = 0.5
    /// let f = ViewFactorIntegrator::default().view_factor(0.0, 1.0, 2.0);
    /// assert!((f - 0.5).abs() < 1e-6);
    /// ```
    pub fn view_factor(&self, a: f64, h: f64, diameter: f64) -> f64 {
        self.evaluate(a, h, diameter).value
    }

    /// Like [`view_factor`](Self::view_factor), but also reports whether a
    /// fallback value was used.
    pub fn evaluate(&self, a: f64, h: f64, diameter: f64) -> ViewFactorEstimate {
        if !(h > 0.0) {
            return ViewFactorEstimate::zero(ViewFactorStatus::NoView);
        }

        let value = match self.method {
            IntegrationMethod::ClosedForm => Ok(closed_form_view_factor(a, h, diameter)),
            IntegrationMethod::Quadrature => self.integrate(a, h, diameter),
        };

        match value {
            Ok(value) if value.is_finite() => ViewFactorEstimate {
                value,
                status: ViewFactorStatus::Computed,
            },
            Ok(value) => {
                debug!("View factor non-finite ({value}) at a={a}, H={h}, D={diameter}");
                ViewFactorEstimate::zero(ViewFactorStatus::IntegrationFailed)
            }
            Err(e) => {
                debug!("View factor integration failed at a={a}, H={h}, D={diameter}: {e}");
                ViewFactorEstimate::zero(ViewFactorStatus::IntegrationFailed)
            }
        }
    }

    /// Raw quadrature of the disk integral, without any fallback.
    pub fn integrate(&self, a: f64, h: f64, diameter: f64) -> Result<f64, QuadratureError> {
        let radius = 0.5 * diameter;
        let integral = self.quadrature.integrate_2d(
            |r_prime, phi| disk_kernel(r_prime, phi, a, h),
            (0.0, radius),
            (0.0, TAU),
        )?;

        Ok(h * h / PI * integral.value)
    }
}
