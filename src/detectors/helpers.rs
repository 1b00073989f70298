//! Common helper functions for candle pattern detection
//!
//! Lookback guards and the true-low / true-high measures shared by the detector modules.

use crate::{PatternError, Result, OHLCV};

/// Reject sequences shorter than a detector's lookback window.
#[inline]
pub fn require_history(need: usize, got: usize) -> Result<()> {
  if got < need {
    return Err(PatternError::InsufficientHistory { need, got });
  }
  Ok(())
}

/// Close offset from the lower of the current and prior lows.
///
/// `None` when `index` is 0 or past the end of `bars`.
#[inline]
pub fn true_low<T: OHLCV>(bars: &[T], index: usize) -> Option<f64> {
  let prev = bars.get(index.checked_sub(1)?)?;
  let cur = bars.get(index)?;
  Some(cur.close() - cur.low().min(prev.low()))
}

/// Close offset from the higher of the current and prior highs.
///
/// `None` when `index` is 0 or past the end of `bars`.
#[inline]
pub fn true_high<T: OHLCV>(bars: &[T], index: usize) -> Option<f64> {
  let prev = bars.get(index.checked_sub(1)?)?;
  let cur = bars.get(index)?;
  Some(cur.close() - cur.high().max(prev.high()))
}

/// Direction of three consecutive closes ending at `index`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRun {
  /// close(i) < close(i-1) < close(i-2)
  Falling,
  /// close(i) > close(i-1) > close(i-2)
  Rising,
}

/// Classify the three closes ending at `index`.
///
/// `None` when the closes are not strictly ordered or fewer than three
/// candles end at `index`.
#[inline]
pub fn close_run<T: OHLCV>(bars: &[T], index: usize) -> Option<CloseRun> {
  let window = bars.get(index.checked_sub(2)?..=index)?;
  let (prev2, prev, cur) = (window[0].close(), window[1].close(), window[2].close());

  if cur < prev && prev < prev2 {
    Some(CloseRun::Falling)
  } else if cur > prev && prev > prev2 {
    Some(CloseRun::Rising)
  } else {
    None
  }
}
