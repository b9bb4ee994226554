//! Finite-impulse-response smoothing for raw sensor channels.
//!
//! Every physical channel (each wheel encoder, each beacon axis) owns its
//! own [`FirFilter`]; windows are never shared between channels.
//!
//! Coefficient sets are resolved by name through a [`CoefficientSource`]
//! once, at construction.  A missing or malformed set is a construction
//! error, never a per-cycle one.
//!
//! # Example
//!
//! ```rust
//! use rovnav_perception::filter::{FirFilter, StaticSource};
//!
//! let source = StaticSource::new().with("avg2", vec![0.5, 0.5]);
//! let mut filter = FirFilter::load(&source, "avg2").unwrap();
//!
//! assert!((filter.filter(4.0) - 2.0).abs() < 1e-6);
//! assert!((filter.filter(4.0) - 4.0).abs() < 1e-6);
//! ```

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use rovnav_types::NavError;
use tracing::debug;

/// File extension used by [`DirectorySource`].
pub const COEFFICIENT_EXTENSION: &str = "ffc";

// ────────────────────────────────────────────────────────────────────────────
// Coefficient sources
// ────────────────────────────────────────────────────────────────────────────

/// Resolves a named coefficient set.
pub trait CoefficientSource {
    /// Return the ordered coefficients for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::FilterCoefficients`] when the resource is missing
    /// or cannot be parsed.
    fn load(&self, name: &str) -> Result<Vec<f32>, NavError>;
}

/// Reads `<root>/<name>.ffc` text files.
///
/// The format is a list of floats separated by whitespace, newlines or
/// commas; `#` starts a comment that runs to the end of the line.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the file backing `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.{COEFFICIENT_EXTENSION}"))
    }
}

impl CoefficientSource for DirectorySource {
    fn load(&self, name: &str) -> Result<Vec<f32>, NavError> {
        let path = self.path_for(name);
        let raw = fs::read_to_string(&path).map_err(|e| NavError::FilterCoefficients {
            resource: name.to_string(),
            details: format!("failed to read {}: {e}", path.display()),
        })?;
        parse_coefficients(name, &raw)
    }
}

/// In-memory coefficient sets.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    sets: HashMap<String, Vec<f32>>,
}

impl StaticSource {
    /// An empty source; every lookup fails until sets are added.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the set called `name`.
    pub fn with(mut self, name: impl Into<String>, coefficients: Vec<f32>) -> Self {
        self.sets.insert(name.into(), coefficients);
        self
    }

    /// Default sets for the standard channel names: a 3-tap moving average
    /// for the wheel encoders (`we`) and a 4-tap moving average for each
    /// beacon axis (`ns_x`, `ns_y`, `ns_theta`).
    pub fn builtin() -> Self {
        Self::new()
            .with("we", vec![1.0 / 3.0; 3])
            .with("ns_x", vec![0.25; 4])
            .with("ns_y", vec![0.25; 4])
            .with("ns_theta", vec![0.25; 4])
    }
}

impl CoefficientSource for StaticSource {
    fn load(&self, name: &str) -> Result<Vec<f32>, NavError> {
        self.sets
            .get(name)
            .cloned()
            .ok_or_else(|| NavError::FilterCoefficients {
                resource: name.to_string(),
                details: "no such coefficient set".to_string(),
            })
    }
}

/// Parse the `.ffc` text format.
pub fn parse_coefficients(resource: &str, raw: &str) -> Result<Vec<f32>, NavError> {
    let mut coefficients = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        for token in content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
        {
            let value: f32 = token.parse().map_err(|_| NavError::FilterCoefficients {
                resource: resource.to_string(),
                details: format!("line {}: '{token}' is not a number", line_no + 1),
            })?;
            coefficients.push(value);
        }
    }
    Ok(coefficients)
}

// ────────────────────────────────────────────────────────────────────────────
// FirFilter
// ────────────────────────────────────────────────────────────────────────────

/// Sliding-window FIR filter.
///
/// The window holds the most recent samples, newest first, and starts out
/// zero-filled.  Output is `Σ coefficients[i] * window[i]`, so the newest
/// sample is weighted by `coefficients[0]`.
#[derive(Debug, Clone)]
pub struct FirFilter {
    coefficients: Vec<f32>,
    window: VecDeque<f32>,
}

impl FirFilter {
    /// Build a filter from an explicit coefficient sequence.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::FilterCoefficients`] for an empty sequence or a
    /// non-finite coefficient.
    pub fn new(coefficients: Vec<f32>) -> Result<Self, NavError> {
        Self::validated("<inline>", coefficients)
    }

    /// Resolve `name` through `source` and build a filter from it.
    pub fn load(source: &dyn CoefficientSource, name: &str) -> Result<Self, NavError> {
        let coefficients = source.load(name)?;
        let filter = Self::validated(name, coefficients)?;
        debug!(resource = name, taps = filter.len(), "filter coefficients loaded");
        Ok(filter)
    }

    fn validated(resource: &str, coefficients: Vec<f32>) -> Result<Self, NavError> {
        if coefficients.is_empty() {
            return Err(NavError::FilterCoefficients {
                resource: resource.to_string(),
                details: "coefficient sequence is empty".to_string(),
            });
        }
        if let Some(bad) = coefficients.iter().find(|c| !c.is_finite()) {
            return Err(NavError::FilterCoefficients {
                resource: resource.to_string(),
                details: format!("non-finite coefficient {bad}"),
            });
        }
        let window = VecDeque::from(vec![0.0; coefficients.len()]);
        Ok(Self {
            coefficients,
            window,
        })
    }

    /// Push `sample` into the window and return the filtered value.
    pub fn filter(&mut self, sample: f32) -> f32 {
        self.window.pop_back();
        self.window.push_front(sample);
        self.coefficients
            .iter()
            .zip(self.window.iter())
            .map(|(c, s)| c * s)
            .sum()
    }

    /// Zero the sample history.
    pub fn reset(&mut self) {
        self.window.iter_mut().for_each(|s| *s = 0.0);
    }

    /// Number of taps (equal to the window length).
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// Always `false`; an empty filter cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }
}
