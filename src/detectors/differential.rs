//! Differential and reverse-differential patterns
//!
//! Both watch three consecutive closes moving in one direction while the true
//! low / true high of the last candle shifts against the one before it. The
//! reversal variant reads a compressing true range as exhaustion; the
//! continuation variant reads an expanding one as follow-through.

use serde::{Deserialize, Serialize};

use crate::{PatternId, Result, SeriesDetector, Signal, OHLCV};

use super::helpers::{close_run, require_history, true_high, true_low, CloseRun};

/// How the true low / true high moved from candle i-1 to candle i
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeShift {
  /// true_low rose and true_high fell
  Compressing,
  /// true_low fell and true_high rose
  Expanding,
}

fn range_shift<T: OHLCV>(bars: &[T], index: usize) -> Option<RangeShift> {
  let prev = index.checked_sub(1)?;
  let low = true_low(bars, index)?;
  let prev_low = true_low(bars, prev)?;
  let high = true_high(bars, index)?;
  let prev_high = true_high(bars, prev)?;

  if low > prev_low && high < prev_high {
    Some(RangeShift::Compressing)
  } else if low < prev_low && high > prev_high {
    Some(RangeShift::Expanding)
  } else {
    None
  }
}

/// Which reading of the true-range shift the detector emits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifferentialMode {
  /// Short-term reversal (differential pattern)
  #[default]
  Reversal,
  /// Trend continuation (reverse differential pattern)
  Continuation,
}

/// Differential / reverse differential pattern detector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifferentialDetector {
  pub mode: DifferentialMode,
}

impl DifferentialDetector {
  pub fn new(mode: DifferentialMode) -> Self {
    Self { mode }
  }

  pub fn reversal() -> Self {
    Self::new(DifferentialMode::Reversal)
  }

  pub fn continuation() -> Self {
    Self::new(DifferentialMode::Continuation)
  }

  /// Classify candle `index`; `Neutral` inside the lookback window or past the end.
  pub fn classify<T: OHLCV>(&self, bars: &[T], index: usize) -> Signal {
    let Some(run) = close_run(bars, index) else {
      return Signal::Neutral;
    };
    let Some(shift) = range_shift(bars, index) else {
      return Signal::Neutral;
    };

    match (self.mode, run, shift) {
      (DifferentialMode::Reversal, CloseRun::Falling, RangeShift::Compressing)
      | (DifferentialMode::Continuation, CloseRun::Falling, RangeShift::Expanding) => Signal::Buy,
      (DifferentialMode::Reversal, CloseRun::Rising, RangeShift::Expanding)
      | (DifferentialMode::Continuation, CloseRun::Rising, RangeShift::Compressing) => {
        Signal::Short
      },
      _ => Signal::Neutral,
    }
  }
}

impl SeriesDetector for DifferentialDetector {
  type Output = Signal;

  fn id(&self) -> PatternId {
    match self.mode {
      DifferentialMode::Reversal => PatternId::DIFFERENTIAL,
      DifferentialMode::Continuation => PatternId::REVERSE_DIFFERENTIAL,
    }
  }

  fn min_bars(&self) -> usize {
    3
  }

  fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Signal>> {
    require_history(self.min_bars(), bars.len())?;

    let mut signals = vec![Signal::Neutral; 2];
    signals.extend((2..bars.len()).map(|i| self.classify(bars, i)));
    Ok(signals)
  }
}
