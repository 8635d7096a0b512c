//! Run configuration for the gesture export.
//!
//! Stored as JSON. Every field has a default, so a config file only needs the
//! values it changes:
//!
//! ```json
//! {
//!   "light_source": { "position": [0.0, 900.0, 0.0], "diameter": 150.0 },
//!   "gestures": [{ "name": "Circle" }, { "name": "One", "segment_index": 6 }],
//!   "integrator": { "method": "closed_form" }
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use radiometry::{DegeneratePolicy, LightSource, ViewFactorIntegrator};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse config {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to write config {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Sampling rate must be positive and finite, got {0} Hz")]
    InvalidSamplingRate(f64),
    #[error("Gesture '{0}' is requested more than once; its records would share one output file")]
    DuplicateGesture(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseGestureRequestError {
    #[error("Gesture name is empty")]
    EmptyName,
    #[error("Invalid segment index '{0}'")]
    InvalidIndex(String),
}

/// A gesture and which of its segments to export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureRequest {
    pub name: String,
    #[serde(default)]
    pub segment_index: usize,
}

impl GestureRequest {
    pub fn new(name: impl Into<String>, segment_index: usize) -> Self {
        Self {
            name: name.into(),
            segment_index,
        }
    }
}

impl fmt::Display for GestureRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.segment_index)
    }
}

/// Parses `NAME` or `NAME:INDEX`
impl FromStr for GestureRequest {
    type Err = ParseGestureRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, index) = match s.rsplit_once(':') {
            Some((name, index)) => {
                let index = index
                    .trim()
                    .parse()
                    .map_err(|_| ParseGestureRequestError::InvalidIndex(index.to_string()))?;
                (name.trim(), index)
            }
            None => (s.trim(), 0),
        };

        if name.is_empty() {
            return Err(ParseGestureRequestError::EmptyName);
        }
        Ok(Self::new(name, index))
    }
}

/// Gestures exported when none are configured
pub fn default_gestures() -> Vec<GestureRequest> {
    vec![
        GestureRequest::new("Circle", 0),
        GestureRequest::new("One", 6),
        GestureRequest::new("Two", 0),
        GestureRequest::new("Three", 0),
        GestureRequest::new("Triangle", 0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub light_source: LightSource,
    /// Tracker and power meter sampling rate
    pub sampling_rate_hz: f64,
    /// Directory holding `<gesture>.segments.json` files
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub gestures: Vec<GestureRequest>,
    pub integrator: ViewFactorIntegrator,
    pub degenerate_policy: DegeneratePolicy,
    /// Process gestures on the rayon thread pool
    pub parallel: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            light_source: LightSource::reference_lamp(),
            sampling_rate_hz: 100.0,
            data_dir: PathBuf::from("data/segments"),
            output_dir: PathBuf::from("data/export"),
            gestures: default_gestures(),
            integrator: ViewFactorIntegrator::default(),
            degenerate_policy: DegeneratePolicy::default(),
            parallel: false,
        }
    }
}

impl ExportConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        serde_json::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            .and_then(|json| std::fs::write(path, json))
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Check values serde cannot check on its own.
    ///
    /// The light source validates itself while deserializing. Gesture names
    /// must be unique, since each gesture is written to `<name>.json`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sampling_rate_hz.is_finite() && self.sampling_rate_hz > 0.0) {
            return Err(ConfigError::InvalidSamplingRate(self.sampling_rate_hz));
        }

        let mut seen = HashSet::new();
        for request in &self.gestures {
            if !seen.insert(request.name.to_lowercase()) {
                return Err(ConfigError::DuplicateGesture(request.name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radiometry::IntegrationMethod;

    #[test]
    fn test_parse_gesture_request() {
        assert_eq!(
            "Circle".parse::<GestureRequest>().unwrap(),
            GestureRequest::new("Circle", 0)
        );
        assert_eq!(
            "One:6".parse::<GestureRequest>().unwrap(),
            GestureRequest::new("One", 6)
        );
        assert_eq!(
            "One:x".parse::<GestureRequest>(),
            Err(ParseGestureRequestError::InvalidIndex("x".to_string()))
        );
        assert_eq!(
            ":3".parse::<GestureRequest>(),
            Err(ParseGestureRequestError::EmptyName)
        );
        assert_eq!(GestureRequest::new("Two", 1).to_string(), "Two:1");
    }

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();

        assert_eq!(config.sampling_rate_hz, 100.0);
        assert_eq!(config.gestures.len(), 5);
        assert_eq!(config.gestures[1], GestureRequest::new("One", 6));
        assert_eq!(config.light_source.diameter(), 200.0);
        assert_eq!(config.degenerate_policy, DegeneratePolicy::Minimum);
        assert!(!config.parallel);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "light_source": { "position": [0.0, 900.0, 0.0], "diameter": 150.0 },
            "gestures": [{ "name": "Circle" }],
            "integrator": { "method": "closed_form" },
            "degenerate_policy": "midpoint"
        }"#;
        let config: ExportConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.light_source.diameter(), 150.0);
        assert_eq!(config.light_source.axis().into_inner(), nalgebra::Vector3::y());
        assert_eq!(config.gestures, vec![GestureRequest::new("Circle", 0)]);
        assert_eq!(config.integrator.method, IntegrationMethod::ClosedForm);
        assert_eq!(config.degenerate_policy, DegeneratePolicy::Midpoint);
        assert_eq!(config.sampling_rate_hz, 100.0);
    }

    #[test]
    fn test_invalid_light_source_rejected() {
        let json = r#"{ "light_source": { "position": [0.0, 1.0, 0.0], "diameter": -1.0 } }"#;
        assert!(serde_json::from_str::<ExportConfig>(json).is_err());
    }

    #[test]
    fn test_duplicate_gesture_names_rejected() {
        let config = ExportConfig {
            gestures: vec![
                GestureRequest::new("One", 0),
                GestureRequest::new("Two", 0),
                GestureRequest::new("one", 6),
            ],
            ..Default::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateGesture(name)) if name == "one"
        ));
        assert!(ExportConfig::default().validate().is_ok());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        let config = ExportConfig {
            parallel: true,
            gestures: vec![GestureRequest::new("Triangle", 2)],
            ..Default::default()
        };

        config.save_to_file(&path).unwrap();
        assert_eq!(ExportConfig::load_from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        assert!(matches!(
            ExportConfig::load_from_file(&path),
            Err(ConfigError::Read { .. })
        ));

        std::fs::write(&path, r#"{ "sampling_rate_hz": 0.0 }"#).unwrap();
        assert!(matches!(
            ExportConfig::load_from_file(&path),
            Err(ConfigError::InvalidSamplingRate(_))
        ));

        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(
            ExportConfig::load_from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
