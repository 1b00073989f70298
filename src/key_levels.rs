//! Support and resistance key levels
//!
//! Pivots come from four- and five-candle fractals on lows (support) and highs
//! (resistance). With filtering on, a pivot within one trailing ATR of a level
//! already found on the same side is treated as noise. Each level then counts
//! how many later levels on its side sit within the touch tolerance.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
  detectors::require_history,
  params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
  volatility::atr,
  OHLCVExt, Period, Ratio, Result, OHLCV,
};

/// Candles a fractal spans around its pivot
const FRACTAL_BARS: usize = 5;

/// Key level search settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyLevelConfig {
  pub atr_period: Period,
  /// Drop pivots closer than one ATR to an already accepted level
  pub filter: bool,
  /// Relative distance under which two levels count as the same price
  pub touch_tolerance: Ratio,
}

impl Default for KeyLevelConfig {
  fn default() -> Self {
    Self { atr_period: Period::new_const(14), filter: true, touch_tolerance: Ratio::new_const(0.015) }
  }
}

/// A support or resistance price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
  pub price: f64,
  pub timestamp: Option<i64>,
  /// Index of the pivot candle
  pub index: usize,
  /// 1 plus the number of later levels on the same side within tolerance
  pub touches: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyLevels {
  pub support: Vec<KeyLevel>,
  pub resistance: Vec<KeyLevel>,
}

fn is_support<T: OHLCV>(bars: &[T], i: usize) -> bool {
  let low = |k: usize| bars[k].low();
  low(i) <= low(i - 1)
    && low(i) <= low(i + 1)
    && (low(i + 1) <= low(i + 2) || low(i - 1) <= low(i - 2))
}

fn is_resistance<T: OHLCV>(bars: &[T], i: usize) -> bool {
  let high = |k: usize| bars[k].high();
  high(i) >= high(i - 1)
    && high(i) >= high(i + 1)
    && (high(i + 1) >= high(i + 2) || high(i - 1) >= high(i - 2))
}

/// Trailing ATR seen at each pivot, from the history before it
enum NoiseBand {
  Trailing { series: Vec<Option<f64>>, period: usize },
  Flat(f64),
}

impl NoiseBand {
  fn new<T: OHLCV>(bars: &[T], period: Period) -> Result<Self> {
    if bars.len() > period.get() {
      return Ok(NoiseBand::Trailing { series: atr(bars, period)?, period: period.get() });
    }
    let mean_range = bars.iter().map(|b| b.range()).sum::<f64>() / bars.len() as f64;
    tracing::debug!(
      candles = bars.len(),
      atr_period = period.get(),
      mean_range,
      "too few candles for ATR, filtering key levels by mean range"
    );
    Ok(NoiseBand::Flat(mean_range))
  }

  fn at(&self, i: usize) -> f64 {
    match self {
      NoiseBand::Trailing { series, period } => {
        series[i.max(period + 1) - 1].unwrap_or_default()
      },
      NoiseBand::Flat(width) => *width,
    }
  }
}

fn count_touches(levels: &mut [KeyLevel], tolerance: f64) {
  for idx in 0..levels.len() {
    let price = levels[idx].price;
    let later = levels[idx + 1..]
      .iter()
      .filter(|other| (price / other.price - 1.0).abs() < tolerance)
      .count();
    levels[idx].touches = 1 + later;
  }
}

/// Find support and resistance levels in `bars`.
pub fn find_key_levels<T: OHLCV>(bars: &[T], config: &KeyLevelConfig) -> Result<KeyLevels> {
  require_history(FRACTAL_BARS, bars.len())?;

  let band = if config.filter { Some(NoiseBand::new(bars, config.atr_period)?) } else { None };
  let mut levels = KeyLevels::default();

  for i in 2..bars.len() - 2 {
    let (side, price) = if is_support(bars, i) {
      (&mut levels.support, bars[i].low())
    } else if is_resistance(bars, i) {
      (&mut levels.resistance, bars[i].high())
    } else {
      continue;
    };

    if let Some(band) = &band {
      let width = band.at(i);
      if side.iter().any(|lvl| (price - lvl.price).abs() < width) {
        tracing::trace!(index = i, price, width, "pivot within noise band, skipped");
        continue;
      }
    }

    side.push(KeyLevel { price, timestamp: bars[i].timestamp(), index: i, touches: 1 });
  }

  let tolerance = config.touch_tolerance.get();
  count_touches(&mut levels.support, tolerance);
  count_touches(&mut levels.resistance, tolerance);

  tracing::debug!(
    support = levels.support.len(),
    resistance = levels.resistance.len(),
    "key levels found"
  );
  Ok(levels)
}

static KEY_LEVEL_PARAMS: &[ParamMeta] = &[
  ParamMeta {
    name: "atr_period",
    param_type: ParamType::Period,
    default: 14.0,
    range: (5.0, 30.0, 1.0),
    description: "ATR period for the noise filter",
  },
  ParamMeta {
    name: "touch_tolerance",
    param_type: ParamType::Ratio,
    default: 0.015,
    range: (0.005, 0.05, 0.005),
    description: "Relative distance for two levels to count as one touch",
  },
];

impl ParameterizedDetector for KeyLevelConfig {
  fn param_meta() -> &'static [ParamMeta] {
    KEY_LEVEL_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Ok(Self {
      atr_period: get_period(params, "atr_period", 14)?,
      filter: true,
      touch_tolerance: get_ratio(params, "touch_tolerance", 0.015)?,
    })
  }

  fn pattern_id_str() -> &'static str {
    "KEY_LEVELS"
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{Candle, PatternError};

  fn from_lows(lows: &[f64]) -> Vec<Candle> {
    lows
      .iter()
      .enumerate()
      .map(|(i, &l)| Candle::new(i as i64 * 60_000, l + 0.5, l + 1.0, l, l + 0.5, 10))
      .collect()
  }

  /// Lows 10, 9, 8, 9 repeated: support pivots at 8, resistance pivots at high 11
  fn zigzag(n: usize) -> Vec<Candle> {
    let cycle = [10.0, 9.0, 8.0, 9.0];
    from_lows(&(0..n).map(|i| cycle[i % 4]).collect::<Vec<_>>())
  }

  fn unfiltered() -> KeyLevelConfig {
    KeyLevelConfig { filter: false, ..Default::default() }
  }

  #[test]
  fn test_single_support() {
    let levels = find_key_levels(&from_lows(&[5.0, 4.0, 3.0, 4.0, 5.0]), &unfiltered()).unwrap();
    assert_eq!(levels.support.len(), 1);
    assert_eq!(levels.support[0].price, 3.0);
    assert_eq!(levels.support[0].index, 2);
    assert_eq!(levels.support[0].timestamp, Some(120_000));
    assert!(levels.resistance.is_empty());
  }

  #[test]
  fn test_single_resistance() {
    let levels = find_key_levels(&from_lows(&[4.0, 5.0, 6.0, 5.0, 4.0]), &unfiltered()).unwrap();
    assert!(levels.support.is_empty());
    assert_eq!(levels.resistance.len(), 1);
    assert_eq!(levels.resistance[0].price, 7.0);
  }

  #[test]
  fn test_four_candle_fractal() {
    // right side keeps falling: only the left two-candle leg confirms
    let levels = find_key_levels(&from_lows(&[5.0, 4.0, 3.0, 3.5, 3.2]), &unfiltered()).unwrap();
    assert_eq!(levels.support.len(), 1);
  }

  #[test]
  fn test_unfiltered_touch_counts() {
    let levels = find_key_levels(&zigzag(18), &unfiltered()).unwrap();

    let support_idx: Vec<usize> = levels.support.iter().map(|l| l.index).collect();
    assert_eq!(support_idx, vec![2, 6, 10, 14]);
    let touches: Vec<usize> = levels.support.iter().map(|l| l.touches).collect();
    assert_eq!(touches, vec![4, 3, 2, 1]);

    let resistance_idx: Vec<usize> = levels.resistance.iter().map(|l| l.index).collect();
    assert_eq!(resistance_idx, vec![4, 8, 12]);
    assert!(levels.resistance.iter().all(|l| l.price == 11.0));
  }

  #[test]
  fn test_filter_drops_repeated_levels() {
    let config = KeyLevelConfig { atr_period: Period::new(3).unwrap(), ..Default::default() };
    let levels = find_key_levels(&zigzag(18), &config).unwrap();
    assert_eq!(levels.support.len(), 1);
    assert_eq!(levels.support[0].index, 2);
    assert_eq!(levels.resistance.len(), 1);
    assert_eq!(levels.resistance[0].index, 4);
  }

  #[test]
  fn test_filter_falls_back_on_short_history() {
    let levels =
      find_key_levels(&from_lows(&[5.0, 4.0, 3.0, 4.0, 5.0]), &KeyLevelConfig::default()).unwrap();
    assert_eq!(levels.support.len(), 1);
  }

  #[test]
  fn test_too_short() {
    assert_eq!(
      find_key_levels(&from_lows(&[5.0, 4.0, 3.0, 4.0]), &KeyLevelConfig::default()),
      Err(PatternError::InsufficientHistory { need: 5, got: 4 })
    );
  }

  #[test]
  fn test_with_params() {
    let mut params = HashMap::new();
    params.insert("atr_period", 7.0);
    let config = KeyLevelConfig::with_params(&params).unwrap();
    assert_eq!(config.atr_period.get(), 7);
    assert_eq!(config.touch_tolerance.get(), 0.015);
    assert!(config.filter);
  }
}
