//! True range, ATR and NATR
//!
//! ATR uses Wilder smoothing seeded with the simple mean of the first `period`
//! true ranges. The first candle's true range is its high-low range since it
//! has no prior close.

use crate::{detectors::require_history, Period, Result, OHLCV};

/// True range of candle `index`.
#[inline]
pub fn true_range<T: OHLCV>(bars: &[T], index: usize) -> f64 {
  let bar = &bars[index];
  let hl = bar.high() - bar.low();
  if index == 0 {
    return hl;
  }
  let prev_close = bars[index - 1].close();
  hl.max((bar.high() - prev_close).abs()).max((bar.low() - prev_close).abs())
}

/// Average true range aligned with `bars`; `None` before index `period - 1`.
pub fn atr<T: OHLCV>(bars: &[T], period: Period) -> Result<Vec<Option<f64>>> {
  let n = period.get();
  require_history(n, bars.len())?;

  let mut out = vec![None; bars.len()];
  let seed = (0..n).map(|i| true_range(bars, i)).sum::<f64>() / n as f64;
  out[n - 1] = Some(seed);

  let mut value = seed;
  for (i, slot) in out.iter_mut().enumerate().skip(n) {
    value = (value * (n - 1) as f64 + true_range(bars, i)) / n as f64;
    *slot = Some(value);
  }
  Ok(out)
}

/// Normalized ATR: `100 * atr / close`. `None` where ATR is undefined or close is zero.
pub fn natr<T: OHLCV>(bars: &[T], period: Period) -> Result<Vec<Option<f64>>> {
  let atr = atr(bars, period)?;
  Ok(
    atr
      .into_iter()
      .zip(bars)
      .map(|(a, bar)| {
        let close = bar.close();
        a.filter(|_| close != 0.0).map(|a| 100.0 * a / close)
      })
      .collect(),
  )
}
