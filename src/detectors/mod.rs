//! Candle pattern detectors
//!
//! Every detector consumes a whole candle sequence and returns one output per
//! candle.
//!
//! # Pattern Categories
//!
//! - **Differential (2)**: reversal and continuation variants comparing closes
//!   with the true low / true high of the last three candles.
//! - **Anti-differential (1)**: five-candle zig-zag of closes.
//! - **Fibonacci timing (1)**: bull/bear streak counters over lagged closes.

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod anti_differential;
pub mod differential;
pub mod fibonacci;

impl_with_defaults!(
  anti_differential::AntiDifferentialDetector,
  differential::DifferentialDetector,
  fibonacci::FibonacciTimingDetector,
);

// Re-export all detectors for convenience
pub use anti_differential::*;
pub use differential::*;
pub use fibonacci::*;
pub use helpers::*;
