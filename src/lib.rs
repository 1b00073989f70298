//! # candle-signals
//!
//! Candle pattern signals for technical analysis: differential, reverse
//! differential, anti-differential and Fibonacci timing detectors, plus ATR/NATR
//! volatility and fractal key levels.
//!
//! ## Quick Start
//!
//! ```rust
//! use candle_signals::prelude::*;
//!
//! let candles: Vec<Candle> = (0..20)
//!     .map(|i| {
//!         let base = 100.0 - i as f64;
//!         Candle::new(1_600_000_000_000 + i * 60_000, base, base + 1.0, base - 1.0, base - 0.5, 1_000)
//!     })
//!     .collect();
//!
//! let engine = EngineBuilder::new()
//!     .with_all_defaults()
//!     .validate_data(true)
//!     .build()
//!     .unwrap();
//!
//! let outputs = engine.scan(&candles).unwrap();
//! assert_eq!(outputs.len(), 4);
//! assert!(outputs.iter().all(|o| o.series.len() == candles.len()));
//! ```

pub mod detectors;
pub mod key_levels;
pub mod params;
pub mod volatility;

pub mod prelude {
    pub use crate::{
        // Detectors
        detectors::*,
        // Key levels
        key_levels::{find_key_levels, KeyLevel, KeyLevelConfig, KeyLevels},
        // Parameters
        params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
        // Parallel
        scan_parallel,
        // Engine
        validate_candles,
        BuiltinDetector,
        Candle,
        DetectorOutput,
        EngineBuilder,
        EngineConfig,
        OHLCVExt,
        // Errors
        PatternError,
        PatternId,
        PatternKind,
        Period,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        // Core traits
        SeriesDetector,
        Signal,
        SignalEngine,
        SignalSeries,
        OHLCV,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors that can occur during signal detection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient history: need {need} candles, got {got}")]
    InsufficientHistory { need: usize, got: usize },

    #[error("Malformed candle at index {index}: {reason}")]
    MalformedCandle { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period or lookback offset (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;

    /// Candle open time in epoch milliseconds
    fn timestamp(&self) -> Option<i64> {
        None
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) {
            return Err(PatternError::MalformedCandle {
                index: 0,
                reason: "NaN in OHLC",
            });
        }
        if prices.iter().any(|p| p.is_infinite()) {
            return Err(PatternError::MalformedCandle {
                index: 0,
                reason: "Infinite value in OHLC",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::MalformedCandle {
                index: 0,
                reason: "high < low",
            });
        }
        if self.volume().is_nan() || self.volume() < 0.0 {
            return Err(PatternError::MalformedCandle {
                index: 0,
                reason: "volume must be a non-negative number",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Validate every candle and the strictly increasing timestamp order.
///
/// Timestamps are only compared when both neighbours carry one.
pub fn validate_candles<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            PatternError::MalformedCandle { reason, .. } => {
                PatternError::MalformedCandle { index: i, reason }
            }
            other => other,
        })?;

        if i > 0 {
            if let (Some(prev), Some(cur)) = (bars[i - 1].timestamp(), bar.timestamp()) {
                if cur <= prev {
                    return Err(PatternError::MalformedCandle {
                        index: i,
                        reason: "timestamp not strictly increasing",
                    });
                }
            }
        }
    }
    Ok(())
}

// ============================================================
// CANDLE
// ============================================================

/// Owned OHLCV price bar
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Candle {
    /// Epoch milliseconds
    #[serde(alias = "datetime")]
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Candle {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Candle {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume as f64
    }

    fn timestamp(&self) -> Option<i64> {
        Some(self.timestamp)
    }
}

// ============================================================
// SIGNALS
// ============================================================

/// Per-candle classification emitted by the directional detectors
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Signal {
    Buy,
    Short,
    #[default]
    Neutral,
}

impl Signal {
    #[inline]
    pub fn is_buy(self) -> bool {
        matches!(self, Signal::Buy)
    }

    #[inline]
    pub fn is_short(self) -> bool {
        matches!(self, Signal::Short)
    }

    #[inline]
    pub fn is_neutral(self) -> bool {
        matches!(self, Signal::Neutral)
    }
}

/// What a pattern tells about the price move it follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    /// Short-term trend reversal
    Reversal,
    /// Trend continuation
    Continuation,
    /// Streak counting toward an exhaustion point
    Timing,
}

/// Unique identifier for a pattern type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub &'static str);

impl PatternId {
    pub const DIFFERENTIAL: PatternId = PatternId("DIFFERENTIAL");
    pub const REVERSE_DIFFERENTIAL: PatternId = PatternId("REVERSE_DIFFERENTIAL");
    pub const ANTI_DIFFERENTIAL: PatternId = PatternId("ANTI_DIFFERENTIAL");
    pub const FIBONACCI_TIMING: PatternId = PatternId("FIBONACCI_TIMING");

    /// Returns the string identifier
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Returns the kind of move this pattern signals, `None` for unknown ids.
    pub fn kind(&self) -> Option<PatternKind> {
        match self.0 {
            "DIFFERENTIAL" | "ANTI_DIFFERENTIAL" => Some(PatternKind::Reversal),
            "REVERSE_DIFFERENTIAL" => Some(PatternKind::Continuation),
            "FIBONACCI_TIMING" => Some(PatternKind::Timing),
            _ => None,
        }
    }
}

/// Output sequence of one detector, aligned index-for-index with the input
#[derive(Debug, Clone, PartialEq)]
pub enum SignalSeries {
    Directional(Vec<Signal>),
    Timing(Vec<FibonacciSignal>),
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        match self {
            Self::Directional(s) => s.len(),
            Self::Timing(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_directional(&self) -> Option<&[Signal]> {
        match self {
            Self::Directional(s) => Some(s),
            Self::Timing(_) => None,
        }
    }

    pub fn as_timing(&self) -> Option<&[FibonacciSignal]> {
        match self {
            Self::Timing(s) => Some(s),
            Self::Directional(_) => None,
        }
    }

    /// Directional reading at `index`. Timing series map a completed bull
    /// streak to `Buy` and a completed bear streak to `Short`.
    pub fn signal_at(&self, index: usize) -> Option<Signal> {
        match self {
            Self::Directional(s) => s.get(index).copied(),
            Self::Timing(s) => s.get(index).map(|f| {
                if f.bull_complete {
                    Signal::Buy
                } else if f.bear_complete {
                    Signal::Short
                } else {
                    Signal::Neutral
                }
            }),
        }
    }
}

impl From<Vec<Signal>> for SignalSeries {
    fn from(signals: Vec<Signal>) -> Self {
        Self::Directional(signals)
    }
}

impl From<Vec<FibonacciSignal>> for SignalSeries {
    fn from(signals: Vec<FibonacciSignal>) -> Self {
        Self::Timing(signals)
    }
}

// ============================================================
// SERIES DETECTOR TRAIT
// ============================================================

/// A detector that classifies every candle of a sequence in one pass.
///
/// Implementations reject sequences shorter than [`SeriesDetector::min_bars`]
/// with [`PatternError::InsufficientHistory`] and otherwise return exactly one
/// output per input candle.
pub trait SeriesDetector: Send + Sync {
    type Output;

    fn id(&self) -> PatternId;
    fn min_bars(&self) -> usize;
    fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<Self::Output>>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - enum dispatch
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<SignalSeries> {
                match self {
                    $(Self::$variant(d) => SeriesDetector::detect(d, bars).map(SignalSeries::from)),*
                }
            }

            #[inline]
            pub fn id(&self) -> PatternId {
                match self {
                    $(Self::$variant(d) => SeriesDetector::id(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => SeriesDetector::min_bars(d)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => SeriesDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    Differential(DifferentialDetector),
    AntiDifferential(AntiDifferentialDetector),
    FibonacciTiming(FibonacciTimingDetector),
}

// ============================================================
// SIGNAL ENGINE
// ============================================================

/// Engine configuration, loadable from any serde format
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reject malformed candles before running detectors
    pub validate_data: bool,
    /// Detectors to run, in order
    pub detectors: Vec<BuiltinDetector>,
}

/// Result of one detector over a candle sequence
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorOutput {
    pub pattern_id: PatternId,
    pub series: SignalSeries,
}

/// Runs a fixed set of builtin detectors over candle sequences
#[derive(Debug, Clone)]
pub struct SignalEngine {
    builtin: Vec<BuiltinDetector>,
    validate_data: bool,
    pattern_filter: Option<Vec<PatternId>>,
}

impl SignalEngine {
    /// Detectors registered with this engine, in scan order
    pub fn detectors(&self) -> &[BuiltinDetector] {
        &self.builtin
    }

    /// Largest lookback any registered detector needs
    pub fn min_bars(&self) -> usize {
        self.builtin
            .iter()
            .filter(|d| self.should_run(d))
            .map(|d| d.min_bars())
            .max()
            .unwrap_or(0)
    }

    /// Run every detector over `bars`.
    ///
    /// The first detector failure is returned; outputs are all-or-nothing.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<DetectorOutput>> {
        if self.validate_data {
            validate_candles(bars)?;
        }

        tracing::debug!(
            candles = bars.len(),
            detectors = self.builtin.len(),
            "scanning candles"
        );

        self.builtin
            .iter()
            .filter(|detector| self.should_run(detector))
            .map(|detector| {
                let series = detector.detect(bars)?;
                tracing::trace!(pattern = detector.id().as_str(), "detector finished");
                Ok(DetectorOutput {
                    pattern_id: detector.id(),
                    series,
                })
            })
            .collect()
    }

    /// Signals of every detector at a single candle index.
    pub fn signals_at(outputs: &[DetectorOutput], index: usize) -> Vec<(PatternId, Signal)> {
        outputs
            .iter()
            .filter_map(|o| o.series.signal_at(index).map(|s| (o.pattern_id, s)))
            .collect()
    }

    fn should_run(&self, detector: &BuiltinDetector) -> bool {
        match self.pattern_filter {
            Some(ref filter) => filter.contains(&detector.id()),
            None => true,
        }
    }

    fn validate(&self) -> Result<()> {
        for d in &self.builtin {
            d.validate_config()?;
        }
        Ok(())
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating SignalEngine instances
#[derive(Debug, Default)]
pub struct EngineBuilder {
    builtin: Vec<BuiltinDetector>,
    validate_data: bool,
    pattern_filter: Option<Vec<PatternId>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a deserialized configuration
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            builtin: config.detectors,
            validate_data: config.validate_data,
            pattern_filter: None,
        }
    }

    /// Add all four builtin patterns with default configurations
    pub fn with_all_defaults(mut self) -> Self {
        self.builtin.extend([
            BuiltinDetector::Differential(DifferentialDetector::reversal()),
            BuiltinDetector::Differential(DifferentialDetector::continuation()),
            BuiltinDetector::AntiDifferential(AntiDifferentialDetector::with_defaults()),
            BuiltinDetector::FibonacciTiming(FibonacciTimingDetector::with_defaults()),
        ]);
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.builtin.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.builtin.push(detector);
        Ok(self)
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.validate_data = enable;
        self
    }

    /// Run only detectors whose id is listed
    pub fn only_patterns(mut self, ids: impl IntoIterator<Item = PatternId>) -> Self {
        self.pattern_filter = Some(ids.into_iter().collect());
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<SignalEngine> {
        if self.builtin.is_empty() {
            return Err(PatternError::InvalidConfig(
                "engine needs at least one detector".to_string(),
            ));
        }
        let engine = SignalEngine {
            builtin: self.builtin,
            validate_data: self.validate_data,
            pattern_filter: self.pattern_filter,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of scanning a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub outputs: Vec<DetectorOutput>,
}

/// Error from scanning a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Parallel scanning of multiple instruments
pub fn scan_parallel<'a, T, I>(engine: &SignalEngine, instruments: I) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            engine
                .scan(bars)
                .map(|outputs| ScanResult {
                    symbol: symbol.to_string(),
                    outputs,
                })
                .map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => {
                tracing::debug!(symbol = %e.symbol, error = %e.error, "instrument scan failed");
                errors.push(e)
            }
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
