//! Parameter metadata for detectors and level finders
//!
//! Lets callers discover tunable parameters, build instances from a
//! string-keyed map and enumerate parameter grids for backtest sweeps.
//!
//! # Example
//!
//! ```rust
//! use candle_signals::params::{parameter_grid, ParameterizedDetector};
//! use candle_signals::prelude::*;
//!
//! for param in FibonacciTimingDetector::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let grid = parameter_grid(KeyLevelConfig::param_meta());
//! let configs: Vec<KeyLevelConfig> = grid
//!     .iter()
//!     .filter_map(|p| KeyLevelConfig::with_params(p).ok())
//!     .collect();
//! assert_eq!(configs.len(), grid.len());
//! ```

use std::collections::HashMap;

use crate::{PatternError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Ratio value in 0.0..=1.0
  Ratio,
  /// Period or lookback offset (positive integer)
  Period,
}

/// Metadata for a single parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "step_two")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  /// All values from `min` to `max` inclusive, `step` apart.
  ///
  /// Values are computed as `min + k * step` so long grids do not drift.
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 {
      return vec![min];
    }
    let count = ((max - min) / step + 1e-9).floor() as usize + 1;
    (0..count).map(|k| min + k as f64 * step).collect()
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(PatternError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Types whose numeric parameters can be discovered and set by name
pub trait ParameterizedDetector: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates an instance from a map; missing parameters use their defaults.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Returns the pattern ID string
  fn pattern_id_str() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value < 0.0 || value.fract() != 0.0 {
    return Err(PatternError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Cartesian product of every parameter's grid.
pub fn parameter_grid(meta: &'static [ParamMeta]) -> Vec<HashMap<&'static str, f64>> {
  meta.iter().fold(vec![HashMap::new()], |combos, param| {
    let values = param.generate_grid();
    combos
      .iter()
      .flat_map(|combo| {
        values.iter().map(move |&v| {
          let mut next = combo.clone();
          next.insert(param.name, v);
          next
        })
      })
      .collect()
  })
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  static TWO_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("step", 5.0, (2.0, 4.0, 1.0), "Lookback"),
    ParamMeta::ratio("tolerance", 0.01, (0.01, 0.02, 0.01), "Tolerance"),
  ];

  #[test]
  fn test_param_meta_constructors() {
    let ratio = ParamMeta::ratio("touch_tolerance", 0.015, (0.005, 0.05, 0.005), "Touch");
    assert_eq!(ratio.param_type, ParamType::Ratio);
    assert_eq!(ratio.default, 0.015);

    let period = ParamMeta::period("atr_period", 14.0, (5.0, 30.0, 1.0), "ATR");
    assert_eq!(period.param_type, ParamType::Period);
    assert_eq!(period.name, "atr_period");
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.2), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.3).abs() < 1e-12);
    assert!((grid[1] - 0.5).abs() < 1e-12);
    assert!((grid[2] - 0.7).abs() < 1e-12);
  }

  #[test]
  fn test_generate_grid_fine_step() {
    let meta = ParamMeta::ratio("touch_tolerance", 0.015, (0.005, 0.05, 0.005), "Touch");
    assert_eq!(meta.generate_grid().len(), 10);
  }

  #[test]
  fn test_validate_ratio() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.1), "Test");

    assert!(meta.validate(0.5).is_ok());
    assert!(meta.validate(0.3).is_ok());
    assert!(meta.validate(0.7).is_ok());
    assert!(meta.validate(0.2).is_err());
    assert!(meta.validate(0.8).is_err());
  }

  #[test]
  fn test_validate_period() {
    let meta = ParamMeta::period("count", 8.0, (3.0, 13.0, 1.0), "Test");

    assert!(meta.validate(8.0).is_ok());
    assert!(meta.validate(3.0).is_ok());
    assert!(meta.validate(13.0).is_ok());
    assert!(meta.validate(8.5).is_err());
    assert!(meta.validate(2.0).is_err());
    assert!(meta.validate(14.0).is_err());
  }

  #[test]
  fn test_get_ratio_helper() {
    let mut params = HashMap::new();
    params.insert("key1", 0.8);

    assert!((get_ratio(&params, "key1", 0.5).unwrap().get() - 0.8).abs() < f64::EPSILON);
    assert!((get_ratio(&params, "key2", 0.5).unwrap().get() - 0.5).abs() < f64::EPSILON);
  }

  #[test]
  fn test_get_period_helper() {
    let mut params = HashMap::new();
    params.insert("key1", 20.0);
    params.insert("neg", -3.0);
    params.insert("frac", 2.5);

    assert_eq!(get_period(&params, "key1", 14).unwrap().get(), 20);
    assert_eq!(get_period(&params, "key2", 14).unwrap().get(), 14);
    assert!(get_period(&params, "neg", 14).is_err());
    assert!(get_period(&params, "frac", 14).is_err());
  }

  #[test]
  fn test_parameter_grid_is_cartesian() {
    let grid = parameter_grid(TWO_PARAMS);
    assert_eq!(grid.len(), 3 * 2);
    assert!(grid.iter().all(|p| p.len() == 2));
    assert!(grid.iter().any(|p| p["step"] == 4.0 && (p["tolerance"] - 0.02).abs() < 1e-12));
  }
}
