//! Technical indicator calculations
//!
//! Every function takes bars most-recent-first, the order
//! [`MarketDataPayload::bars`](crate::market::MarketDataPayload::bars)
//! guarantees. Indicators that cannot be computed from the available history
//! return `None`.

use crate::market::PriceBar;
use serde::{Deserialize, Serialize};
use ta::{
    Next,
    indicators::{BollingerBands, ExponentialMovingAverage, SimpleMovingAverage},
};

/// Trading days per year used to annualize volatility
pub const TRADING_DAYS: f64 = 252.0;

/// Minimum history for MACD: slow EMA plus signal EMA
pub const MACD_MIN_BARS: usize = 35;

/// MACD line, signal line and histogram as of the latest bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Bollinger band levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

fn closes(bars: &[PriceBar]) -> impl DoubleEndedIterator<Item = f64> + '_ {
    bars.iter().map(|bar| bar.close)
}

/// Simple moving average of the most recent `period` closes
pub fn sma(bars: &[PriceBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let mut sma = SimpleMovingAverage::new(period).ok()?;
    closes(bars).take(period).map(|close| sma.next(close)).last()
}

/// Relative strength index using simple average gains and losses
pub fn rsi(bars: &[PriceBar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() <= period {
        return None;
    }

    let (gains, losses) = bars
        .windows(2)
        .take(period)
        .map(|pair| pair[0].close - pair[1].close)
        .fold((0.0, 0.0), |(gains, losses), change| {
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses - change)
            }
        });

    let period = period as f64;
    let avg_gain = gains / period;
    let avg_loss = losses / period;
    if avg_loss <= 0.0 {
        return Some(100.0);
    }
    Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
}

/// MACD (12, 26, 9) computed oldest to newest
pub fn macd(bars: &[PriceBar]) -> Option<Macd> {
    if bars.len() < MACD_MIN_BARS {
        return None;
    }

    let mut fast = ExponentialMovingAverage::new(12).ok()?;
    let mut slow = ExponentialMovingAverage::new(26).ok()?;
    let mut signal_ema = ExponentialMovingAverage::new(9).ok()?;

    let (macd, signal) = closes(bars)
        .rev()
        .map(|close| {
            let line = fast.next(close) - slow.next(close);
            (line, signal_ema.next(line))
        })
        .last()?;

    Some(Macd {
        macd,
        signal,
        histogram: macd - signal,
    })
}

/// Bollinger bands over the most recent `period` closes
///
/// The band width uses the population standard deviation.
pub fn bollinger_bands(bars: &[PriceBar], period: usize, multiplier: f64) -> Option<Bollinger> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let mut bands = BollingerBands::new(period, multiplier).ok()?;
    let output = closes(bars).take(period).map(|close| bands.next(close)).last()?;
    Some(Bollinger {
        upper: output.upper,
        middle: output.average,
        lower: output.lower,
    })
}

/// Annualized volatility of daily log returns
///
/// Returns 0 when fewer than two returns are available. Pairs with a
/// non-positive close are skipped.
pub fn volatility(bars: &[PriceBar]) -> f64 {
    let returns: Vec<f64> = bars
        .windows(2)
        .filter(|pair| pair[0].close > 0.0 && pair[1].close > 0.0)
        .map(|pair| (pair[0].close / pair[1].close).ln())
        .collect();

    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt() * TRADING_DAYS.sqrt()
}

/// Largest peak-to-trough decline, in percent
///
/// Bars are re-sorted by date, so the result does not depend on input order.
pub fn max_drawdown(bars: &[PriceBar]) -> f64 {
    let mut ordered: Vec<&PriceBar> = bars.iter().collect();
    ordered.sort_by_key(|bar| bar.date);

    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for bar in ordered {
        peak = peak.max(bar.close);
        if peak > 0.0 {
            worst = worst.min((bar.close - peak) / peak);
        }
    }
    worst.abs() * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    /// Bars from closes listed oldest first, returned most recent first
    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut bars: Vec<PriceBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                PriceBar::flat(start.checked_add_days(Days::new(i as u64)).unwrap(), close)
            })
            .collect();
        bars.reverse();
        bars
    }

    fn rising(n: usize) -> Vec<PriceBar> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        bars(&closes)
    }

    #[test]
    fn test_sma() {
        let bars = bars(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        // most recent three: 5, 4, 3
        assert!((sma(&bars, 3).unwrap() - 4.0).abs() < 1e-9);
        assert!((sma(&bars, 5).unwrap() - 3.0).abs() < 1e-9);
        assert_eq!(sma(&bars, 6), None);
        assert_eq!(sma(&bars, 0), None);
    }

    #[test]
    fn test_rsi_bounds() {
        assert_eq!(rsi(&rising(15), 14), Some(100.0));
        assert_eq!(rsi(&rising(14), 14), None);

        let falling: Vec<f64> = (0..20).map(|i| 200.0 - f64::from(i)).collect();
        let value = rsi(&bars(&falling), 14).unwrap();
        assert!(value.abs() < 1e-9);

        let mixed = bars(&[10.0, 11.0, 10.5, 11.5, 11.0, 12.0, 11.8, 12.5, 12.2, 13.0, 12.7, 13.4,
            13.1, 13.8, 13.5, 14.0]);
        let value = rsi(&mixed, 14).unwrap();
        assert!(value > 0.0 && value < 100.0);
    }

    #[test]
    fn test_rsi_flat_series_is_100() {
        let flat = bars(&[50.0; 20]);
        assert_eq!(rsi(&flat, 14), Some(100.0));
    }

    #[test]
    fn test_macd_requires_history() {
        assert_eq!(macd(&rising(34)), None);
        let value = macd(&rising(60)).unwrap();
        // steady uptrend: fast EMA above slow EMA
        assert!(value.macd > 0.0);
        assert!((value.histogram - (value.macd - value.signal)).abs() < 1e-9);
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let value = macd(&bars(&[42.0; 40])).unwrap();
        assert!(value.macd.abs() < 1e-9);
        assert!(value.signal.abs() < 1e-9);
    }

    #[test]
    fn test_bollinger_bands() {
        let flat = bollinger_bands(&bars(&[10.0; 25]), 20, 2.0).unwrap();
        assert!((flat.upper - 10.0).abs() < 1e-9);
        assert!((flat.lower - 10.0).abs() < 1e-9);

        let value = bollinger_bands(&rising(30), 20, 2.0).unwrap();
        // most recent 20 closes are 110..=129
        assert!((value.middle - 119.5).abs() < 1e-6);
        assert!(value.upper > value.middle && value.middle > value.lower);
        assert!(((value.upper - value.middle) - (value.middle - value.lower)).abs() < 1e-6);

        assert_eq!(bollinger_bands(&rising(19), 20, 2.0), None);
    }

    #[test]
    fn test_volatility() {
        assert!(volatility(&rising(2)).abs() < f64::EPSILON);
        assert!(volatility(&bars(&[10.0; 10])).abs() < 1e-12);

        let choppy = bars(&[100.0, 110.0, 99.0, 108.0, 97.0, 112.0]);
        assert!(volatility(&choppy) > volatility(&rising(6)));
    }

    #[test]
    fn test_volatility_skips_non_positive_closes() {
        let with_zero = bars(&[100.0, 0.0, 101.0, 102.0, 103.0]);
        assert!(volatility(&with_zero).is_finite());
    }

    #[test]
    fn test_max_drawdown() {
        assert!(max_drawdown(&rising(10)).abs() < f64::EPSILON);

        let series = bars(&[100.0, 120.0, 90.0, 110.0, 60.0, 80.0]);
        // peak 120, trough 60
        assert!((max_drawdown(&series) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_max_drawdown_ignores_input_order() {
        let series = bars(&[100.0, 80.0, 120.0, 90.0]);
        let mut shuffled = series.clone();
        shuffled.swap(0, 3);
        shuffled.swap(1, 2);
        assert!((max_drawdown(&series) - max_drawdown(&shuffled)).abs() < 1e-12);
        assert!((max_drawdown(&series) - 25.0).abs() < 1e-9);
    }
}
