//! MinMaxScan - range of a sampled power series
//!
//! Scans a series of floating point samples once and keeps the smallest and
//! largest values seen. A NaN anywhere in the series poisons the result: the
//! index of the first NaN is reported instead of a range, since a calibration
//! built on a partial range would silently misplace every sample.

use num_traits::float::Float;
use std::fmt;
use thiserror::Error;

/// Error types for MinMaxScan operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MinMaxError {
    #[error("NaN value encountered at index {0}")]
    NaNEncountered(usize),
    #[error("No data provided (empty series)")]
    NoData,
}

/// Closed interval `[min, max]` covered by a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange<T: Float> {
    pub min: T,
    pub max: T,
}

impl<T: Float> ValueRange<T> {
    /// Width of the interval
    pub fn span(&self) -> T {
        self.max - self.min
    }

    /// True when every sample in the series had the same value
    pub fn is_flat(&self) -> bool {
        self.max <= self.min
    }

    /// Position of `value` inside the interval, 0 at `min` and 1 at `max`.
    ///
    /// Returns `None` for a flat range, where the position is undefined.
    pub fn normalize(&self, value: T) -> Option<T> {
        if self.is_flat() {
            None
        } else {
            Some((value - self.min) / self.span())
        }
    }

    /// Inverse of [`normalize`](Self::normalize), clamped into the interval.
    pub fn interpolate(&self, t: T) -> T {
        (self.min + t * self.span()).max(self.min).min(self.max)
    }

    /// Midpoint of the interval
    pub fn midpoint(&self) -> T {
        self.min + self.span() / (T::one() + T::one())
    }
}

/// A single-pass scanner for the range of a sample series
#[derive(Debug, Clone)]
pub struct MinMaxScan<T: Float> {
    min_value: Option<T>,
    max_value: Option<T>,
    nan_index: Option<usize>,
}

impl<T: Float + fmt::Debug> MinMaxScan<T> {
    /// Scan a series of samples.
    ///
    /// # Example
    /// ```
    /// use radiometry::algo::min_max_scan::MinMaxScan;
    ///
    /// let scan = MinMaxScan::<f64>::new(&[0.2, 0.9, 0.4]);
    /// let range = scan.range().unwrap();
    /// assert_eq!((range.min, range.max), (0.2, 0.9));
    /// ```
    pub fn new(data: &[T]) -> Self {
        let mut min_value: Option<T> = None;
        let mut max_value: Option<T> = None;
        let mut nan_index = None;

        for (index, &value) in data.iter().enumerate() {
            if value.is_nan() {
                nan_index.get_or_insert(index);
                continue;
            }

            min_value = Some(min_value.map_or(value, |min| min.min(value)));
            max_value = Some(max_value.map_or(value, |max| max.max(value)));
        }

        Self {
            min_value,
            max_value,
            nan_index,
        }
    }

    /// Smallest sample, or the reason there is none
    pub fn min(&self) -> Result<T, MinMaxError> {
        self.check_nan()?;
        self.min_value.ok_or(MinMaxError::NoData)
    }

    /// Largest sample, or the reason there is none
    pub fn max(&self) -> Result<T, MinMaxError> {
        self.check_nan()?;
        self.max_value.ok_or(MinMaxError::NoData)
    }

    /// Both extremes as a [`ValueRange`]
    pub fn range(&self) -> Result<ValueRange<T>, MinMaxError> {
        Ok(ValueRange {
            min: self.min()?,
            max: self.max()?,
        })
    }

    /// Check if NaN values were encountered during the scan
    pub fn has_nan(&self) -> bool {
        self.nan_index.is_some()
    }

    fn check_nan(&self) -> Result<(), MinMaxError> {
        match self.nan_index {
            Some(index) => Err(MinMaxError::NaNEncountered(index)),
            None => Ok(()),
        }
    }
}
