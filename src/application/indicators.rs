//! Technical indicators over a raw close series.
//!
//! Windowed series indicators return `None` until the trailing window is
//! satisfied; the feature builder drops those warm-up rows. The trailing
//! snapshot helpers at the bottom serve the heuristic strategy, which pads
//! short input instead of failing.

use statrs::statistics::Statistics;
use ta::Next;
use ta::indicators::{
    BollingerBands, MovingAverageConvergenceDivergence, RelativeStrengthIndex, SimpleMovingAverage,
};

/// Simple moving average over a trailing window.
pub fn sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut indicator = SimpleMovingAverage::new(window).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let value = indicator.next(close);
            if i + 1 >= window { Some(value) } else { None }
        })
        .collect()
}

/// Relative Strength Index, bounded to [0, 100] by construction.
pub fn rsi(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut indicator = RelativeStrengthIndex::new(window).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let value = indicator.next(close);
            if i >= window { Some(value) } else { None }
        })
        .collect()
}

/// Fractional change vs the previous close. Undefined at index 0.
pub fn returns(closes: &[f64]) -> Vec<Option<f64>> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            if i == 0 {
                return None;
            }
            let prev = closes[i - 1];
            if prev == 0.0 {
                None
            } else {
                Some((close - prev) / prev)
            }
        })
        .collect()
}

/// Sample standard deviation of returns over a trailing window.
pub fn rolling_volatility(rets: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..rets.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let defined: Vec<f64> = rets[i + 1 - window..=i].iter().filter_map(|r| *r).collect();
            if defined.len() == window {
                Some(defined.iter().std_dev())
            } else {
                None
            }
        })
        .collect()
}

/// MACD line and its smoothed signal line.
pub fn macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut indicator = MovingAverageConvergenceDivergence::new(fast, slow, signal).unwrap();
    let mut line = Vec::with_capacity(closes.len());
    let mut signal_line = Vec::with_capacity(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        let out = indicator.next(close);
        line.push(if i + 1 >= slow { Some(out.macd) } else { None });
        signal_line.push(if i + 1 >= slow + signal {
            Some(out.signal)
        } else {
            None
        });
    }
    (line, signal_line)
}

/// Bollinger bands: moving average plus/minus `k` rolling standard deviations.
pub fn bollinger(closes: &[f64], window: usize, k: f64) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let mut indicator = BollingerBands::new(window, k).unwrap();
    let mut upper = Vec::with_capacity(closes.len());
    let mut lower = Vec::with_capacity(closes.len());
    for (i, &close) in closes.iter().enumerate() {
        let out = indicator.next(close);
        upper.push(if i + 1 >= window { Some(out.upper) } else { None });
        lower.push(if i + 1 >= window { Some(out.lower) } else { None });
    }
    (upper, lower)
}

/// Mean of the trailing `window` values; uses the whole slice when shorter.
/// An empty slice yields 0.0.
pub fn trailing_mean(values: &[f64], window: usize) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len().min(window);
    let tail = &values[values.len() - n..];
    tail.iter().sum::<f64>() / n as f64
}

/// Simple-average RSI over the trailing `window` of per-step changes.
///
/// Gains and losses are zero-filled, so a flat window averages to zero on
/// both sides and falls through to RS = 1, i.e. RSI = 50. The small positive
/// floor stands in for an empty change series.
pub fn trailing_rsi(values: &[f64], window: usize) -> f64 {
    let mut gains = Vec::new();
    let mut losses = Vec::new();
    for pair in values.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(change.abs());
        }
    }

    let avg_gain = if gains.is_empty() {
        0.01
    } else {
        trailing_mean(&gains, window)
    };
    let avg_loss = if losses.is_empty() {
        0.01
    } else {
        trailing_mean(&losses, window)
    };

    let rs = if avg_loss == 0.0 { 1.0 } else { avg_gain / avg_loss };
    100.0 - 100.0 / (1.0 + rs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_closes(len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| 150.0 + (i as f64 * 0.7).sin() * 2.0)
            .collect()
    }

    #[test]
    fn sma_is_undefined_during_warm_up() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = sma(&closes, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(2.0));
        assert_eq!(out[4], Some(4.0));
    }

    #[test]
    fn rsi_stays_within_bounds() {
        let closes = sample_closes(120);
        for value in rsi(&closes, 14).into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "rsi out of bounds: {value}");
        }
    }

    #[test]
    fn returns_undefined_at_first_index() {
        let out = returns(&[100.0, 101.0, 99.99]);
        assert_eq!(out[0], None);
        assert!((out[1].unwrap() - 0.01).abs() < 1e-12);
        assert!(out[2].unwrap() < 0.0);
    }

    #[test]
    fn volatility_needs_a_full_window_of_returns() {
        let closes = sample_closes(30);
        let rets = returns(&closes);
        let vol = rolling_volatility(&rets, 20);
        // returns[0] is undefined, so the first full window ends at index 20
        assert!(vol[..20].iter().all(|v| v.is_none()));
        assert!(vol[20].is_some());
        assert!(vol[20].unwrap() >= 0.0);
    }

    #[test]
    fn volatility_of_flat_series_is_zero() {
        let closes = vec![150.0; 40];
        let rets = returns(&closes);
        let vol = rolling_volatility(&rets, 20);
        assert!(vol.last().unwrap().unwrap().abs() < 1e-12);
    }

    #[test]
    fn macd_warm_up_masks_both_lines() {
        let closes = sample_closes(60);
        let (line, signal) = macd(&closes, 12, 26, 9);
        assert!(line[24].is_none());
        assert!(line[25].is_some());
        assert!(signal[33].is_none());
        assert!(signal[34].is_some());
    }

    #[test]
    fn bollinger_brackets_the_average() {
        let closes = sample_closes(60);
        let (upper, lower) = bollinger(&closes, 20, 2.0);
        let mid = sma(&closes, 20);
        for i in 19..closes.len() {
            assert!(upper[i].unwrap() >= mid[i].unwrap());
            assert!(lower[i].unwrap() <= mid[i].unwrap());
        }
    }

    #[test]
    fn trailing_mean_uses_short_slices() {
        assert_eq!(trailing_mean(&[150.0, 152.0], 5), 151.0);
        assert_eq!(trailing_mean(&[1.0, 2.0, 3.0, 4.0, 5.0], 2), 4.5);
    }

    #[test]
    fn trailing_rsi_is_fifty_for_flat_window() {
        let flat = vec![150.0; 20];
        assert!((trailing_rsi(&flat, 14) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn trailing_rsi_is_zero_for_pure_losses() {
        let falling: Vec<f64> = (0..20).map(|i| 150.0 - i as f64 * 0.1).collect();
        assert!(trailing_rsi(&falling, 14).abs() < 1e-9);
    }

    #[test]
    fn trailing_rsi_stays_within_bounds() {
        let mixed = sample_closes(50);
        let value = trailing_rsi(&mixed, 14);
        assert!((0.0..=100.0).contains(&value));
    }
}
