//! Anti-differential pattern
//!
//! Short-term reversal read from closes alone: two falling closes, a bounce,
//! then a close back below the bounce (buy), or the mirrored shape (short).

use serde::{Deserialize, Serialize};

use crate::{PatternId, Result, SeriesDetector, Signal, OHLCV};

use super::helpers::require_history;

/// Anti-differential pattern detector
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AntiDifferentialDetector;

impl AntiDifferentialDetector {
  /// Classify candle `index`; `Neutral` inside the lookback window or past the end.
  pub fn classify<T: OHLCV>(&self, bars: &[T], index: usize) -> Signal {
    let Some(window) = index.checked_sub(4).and_then(|start| bars.get(start..=index)) else {
      return Signal::Neutral;
    };
    let c4 = window[0].close();
    let c3 = window[1].close();
    let c2 = window[2].close();
    let c1 = window[3].close();
    let c0 = window[4].close();

    if c0 < c1 && c1 > c2 && c2 < c3 && c3 < c4 {
      Signal::Buy
    } else if c0 > c1 && c1 < c2 && c2 > c3 && c3 > c4 {
      Signal::Short
    } else {
      Signal::Neutral
    }
  }
}

impl SeriesDetector for AntiDifferentialDetector {
  type Output = Signal;

  fn id(&self) -> PatternId {
    PatternId::ANTI_DIFFERENTIAL
  }

  fn min_bars(&self) -> usize {
    5
  }

  fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Signal>> {
    require_history(self.min_bars(), bars.len())?;

    let mut signals = vec![Signal::Neutral; 4];
    signals.extend((4..bars.len()).map(|i| self.classify(bars, i)));
    Ok(signals)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Candle, PatternError};

  fn closes(values: &[f64]) -> Vec<Candle> {
    values
      .iter()
      .enumerate()
      .map(|(i, &c)| Candle::new(i as i64, c, c, c, c, 0))
      .collect()
  }

  #[test]
  fn test_buy_shape() {
    let signals = AntiDifferentialDetector.detect(&closes(&[7.0, 6.0, 4.0, 5.0, 3.0])).unwrap();
    assert_eq!(signals[4], Signal::Buy);
    assert!(signals[..4].iter().all(|s| s.is_neutral()));
  }

  #[test]
  fn test_short_shape() {
    let signals = AntiDifferentialDetector.detect(&closes(&[3.0, 4.0, 6.0, 5.0, 7.0])).unwrap();
    assert_eq!(signals[4], Signal::Short);
  }

  #[test]
  fn test_broken_chain_is_neutral() {
    // close(i-3) = 6 is not below close(i-4) = 5
    let signals = AntiDifferentialDetector.detect(&closes(&[5.0, 6.0, 4.0, 5.0, 3.0])).unwrap();
    assert_eq!(signals[4], Signal::Neutral);
  }

  #[test]
  fn test_equal_closes_never_match() {
    let signals = AntiDifferentialDetector.detect(&closes(&[7.0, 6.0, 4.0, 4.0, 3.0])).unwrap();
    assert_eq!(signals[4], Signal::Neutral);
  }

  #[test]
  fn test_classify_inside_lookback_is_neutral() {
    let bars = closes(&[7.0, 6.0, 4.0, 5.0, 3.0, 2.0]);
    for i in 0..4 {
      assert_eq!(AntiDifferentialDetector.classify(&bars, i), Signal::Neutral);
    }
    assert_eq!(AntiDifferentialDetector.classify(&bars, 4), Signal::Buy);
    assert_eq!(AntiDifferentialDetector.classify(&bars, 6), Signal::Neutral);
  }

  #[test]
  fn test_too_short() {
    assert_eq!(
      AntiDifferentialDetector.detect(&closes(&[1.0, 2.0, 3.0, 4.0])),
      Err(PatternError::InsufficientHistory { need: 5, got: 4 })
    );
  }
}
