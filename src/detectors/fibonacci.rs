//! Fibonacci timing pattern
//!
//! A bullish pattern needs `count` consecutive closes each lower than the
//! closes `step`, `step_two` and `step_three` candles back; the bearish pattern
//! needs them higher. A close back on the wrong side of the `step` close
//! restarts the streak.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  params::{get_period, ParamMeta, ParamType, ParameterizedDetector},
  PatternError, PatternId, Period, Result, SeriesDetector, OHLCV,
};

use super::helpers::require_history;

// ============================================================
// OUTPUT
// ============================================================

/// Per-candle streak counters of the Fibonacci timing pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FibonacciSignal {
  /// 0 or negative: -n on the n-th qualifying candle of a bullish streak
  pub bull_signal: i32,
  /// 0 or positive: n on the n-th qualifying candle of a bearish streak
  pub bear_signal: i32,
  /// Serialized as `datetime`, the field name of the candle feed
  #[serde(rename = "datetime", alias = "timestamp")]
  pub timestamp: Option<i64>,
  /// The bullish streak reached `count` on this candle
  pub bull_complete: bool,
  /// The bearish streak reached `count` on this candle
  pub bear_complete: bool,
}

// ============================================================
// STREAK STATE MACHINE
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
  Bull,
  Bear,
}

impl Side {
  fn sign(self) -> i32 {
    match self {
      Side::Bull => -1,
      Side::Bear => 1,
    }
  }
}

/// State of one streak counter. Magnitudes: Idle 1, Accumulating n, Complete 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreakState {
  Idle,
  Accumulating(usize),
  Complete,
}

impl StreakState {
  fn magnitude(self) -> usize {
    match self {
      StreakState::Idle => 1,
      StreakState::Accumulating(n) => n,
      StreakState::Complete => 0,
    }
  }
}

#[derive(Debug, Clone, Copy)]
struct StreakCounter {
  side: Side,
  state: StreakState,
  count: usize,
}

impl StreakCounter {
  fn new(side: Side, count: usize) -> Self {
    Self { side, state: StreakState::Idle, count }
  }

  /// Feed one close and its lagged closes `[step, step_two, step_three]`.
  /// Returns the recorded value and whether the streak completed here.
  fn observe(&mut self, close: f64, lagged: [f64; 3]) -> (i32, bool) {
    let (qualifies, resets) = match self.side {
      Side::Bull => (lagged.iter().all(|&p| close < p), close >= lagged[0]),
      Side::Bear => (lagged.iter().all(|&p| close > p), close <= lagged[0]),
    };

    if qualifies {
      let recorded = self.state.magnitude();
      let next = recorded + 1;
      self.state = if next == self.count + 1 {
        StreakState::Complete
      } else if next == 1 {
        StreakState::Idle
      } else {
        StreakState::Accumulating(next)
      };
      // recorded <= count <= MAX_COUNT
      (self.side.sign() * recorded as i32, self.state == StreakState::Complete)
    } else if resets {
      self.state = StreakState::Idle;
      (self.side.sign(), false)
    } else {
      (0, false)
    }
  }
}

// ============================================================
// DETECTOR
// ============================================================

/// Largest `count` whose counters still fit the `i32` output fields
pub const MAX_COUNT: usize = i32::MAX as usize;

/// Fibonacci timing pattern detector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FibonacciTimingDetector {
  /// Streak length that completes the pattern
  pub count: Period,
  pub step: Period,
  pub step_two: Period,
  pub step_three: Period,
}

impl Default for FibonacciTimingDetector {
  fn default() -> Self {
    Self {
      count: Period::new_const(8),
      step: Period::new_const(5),
      step_two: Period::new_const(3),
      step_three: Period::new_const(2),
    }
  }
}

impl FibonacciTimingDetector {
  pub fn new(count: usize, step: usize, step_two: usize, step_three: usize) -> Result<Self> {
    let detector = Self {
      count: Period::new(count)?,
      step: Period::new(step)?,
      step_two: Period::new(step_two)?,
      step_three: Period::new(step_three)?,
    };
    detector.validate_config()?;
    Ok(detector)
  }

  /// Longest lookback offset; earlier candles are warm-up.
  pub fn max_lookback(&self) -> usize {
    self.step.get().max(self.step_two.get()).max(self.step_three.get())
  }
}

impl SeriesDetector for FibonacciTimingDetector {
  type Output = FibonacciSignal;

  fn id(&self) -> PatternId {
    PatternId::FIBONACCI_TIMING
  }

  fn min_bars(&self) -> usize {
    self.max_lookback() + 1
  }

  fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<FibonacciSignal>> {
    self.validate_config()?;
    require_history(self.min_bars(), bars.len())?;

    let warmup = self.max_lookback();
    let (step, step_two, step_three) = (self.step.get(), self.step_two.get(), self.step_three.get());
    let mut bull = StreakCounter::new(Side::Bull, self.count.get());
    let mut bear = StreakCounter::new(Side::Bear, self.count.get());

    let mut signals = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
      let mut signal = FibonacciSignal { timestamp: bar.timestamp(), ..Default::default() };

      if i >= warmup {
        let close = bar.close();
        let lagged = [
          bars[i - step].close(),
          bars[i - step_two].close(),
          bars[i - step_three].close(),
        ];
        (signal.bull_signal, signal.bull_complete) = bull.observe(close, lagged);
        (signal.bear_signal, signal.bear_complete) = bear.observe(close, lagged);
      }

      signals.push(signal);
    }

    Ok(signals)
  }

  fn validate_config(&self) -> Result<()> {
    let count = self.count.get();
    if count > MAX_COUNT {
      return Err(PatternError::OutOfRange {
        field: "count",
        value: count as f64,
        min: 1.0,
        max: MAX_COUNT as f64,
      });
    }
    Ok(())
  }
}

// ============================================================
// PARAMETERS
// ============================================================

static FIBONACCI_TIMING_PARAMS: &[ParamMeta] = &[
  ParamMeta {
    name: "count",
    param_type: ParamType::Period,
    default: 8.0,
    range: (3.0, 13.0, 1.0),
    description: "Qualifying closes needed to complete the streak",
  },
  ParamMeta {
    name: "step",
    param_type: ParamType::Period,
    default: 5.0,
    range: (2.0, 13.0, 1.0),
    description: "First lookback offset, also the reset reference",
  },
  ParamMeta {
    name: "step_two",
    param_type: ParamType::Period,
    default: 3.0,
    range: (1.0, 8.0, 1.0),
    description: "Second lookback offset",
  },
  ParamMeta {
    name: "step_three",
    param_type: ParamType::Period,
    default: 2.0,
    range: (1.0, 5.0, 1.0),
    description: "Third lookback offset",
  },
];

impl ParameterizedDetector for FibonacciTimingDetector {
  fn param_meta() -> &'static [ParamMeta] {
    FIBONACCI_TIMING_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    let detector = Self {
      count: get_period(params, "count", 8)?,
      step: get_period(params, "step", 5)?,
      step_two: get_period(params, "step_two", 3)?,
      step_three: get_period(params, "step_three", 2)?,
    };
    detector.validate_config()?;
    Ok(detector)
  }

  fn pattern_id_str() -> &'static str {
    "FIBONACCI_TIMING"
  }
}
