//! Parabolic SAR (Wilder), acceleration 0.02 step / 0.02 start, 0.2 maximum.
//!
//! Stateful: tracks trend direction, extreme point (EP) and acceleration
//! factor (AF). The initial direction comes from the first two closes.
//! SAR[i] = SAR[i-1] + AF * (EP - SAR[i-1]), clamped so it never crosses the
//! two previous lows (uptrend) or highs (downtrend); a breach flips the trend
//! and resets SAR to the prior EP.
//! Warmup: 1.

use crate::domain::indicator::undefined;
use crate::domain::ohlcv::Candle;

pub const DEFAULT_ACCELERATION: f64 = 0.02;
pub const DEFAULT_MAXIMUM: f64 = 0.2;

pub fn sar(candles: &[Candle], acceleration: f64, maximum: f64) -> Vec<f64> {
    let n = candles.len();
    let mut out = undefined(n);
    if n < 2 {
        return out;
    }

    let mut is_long = candles[1].close >= candles[0].close;
    let mut af = acceleration;
    let (mut sar, mut ep) = if is_long {
        (candles[0].low, candles[1].high)
    } else {
        (candles[0].high, candles[1].low)
    };
    out[1] = sar;

    for i in 2..n {
        let mut next = sar + af * (ep - sar);
        if is_long {
            next = next.min(candles[i - 1].low).min(candles[i - 2].low);
            if candles[i].low < next {
                is_long = false;
                next = ep;
                ep = candles[i].low;
                af = acceleration;
            } else if candles[i].high > ep {
                ep = candles[i].high;
                af = (af + acceleration).min(maximum);
            }
        } else {
            next = next.max(candles[i - 1].high).max(candles[i - 2].high);
            if candles[i].high > next {
                is_long = true;
                next = ep;
                ep = candles[i].high;
                af = acceleration;
            } else if candles[i].low < ep {
                ep = candles[i].low;
                af = (af + acceleration).min(maximum);
            }
        }
        sar = next;
        out[i] = sar;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn candles(hl: &[(f64, f64)]) -> Vec<Candle> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        hl.iter()
            .enumerate()
            .map(|(i, &(high, low))| Candle {
                timestamp: start + Duration::minutes(5 * i as i64),
                open: (high + low) / 2.0,
                high,
                low,
                close: (high + low) / 2.0,
                volume: 1.0,
            })
            .collect()
    }

    #[test]
    fn sar_below_price_in_uptrend() {
        let bars: Vec<(f64, f64)> = (0..30)
            .map(|i| (11.0 + i as f64, 9.0 + i as f64))
            .collect();
        let out = sar(&candles(&bars), DEFAULT_ACCELERATION, DEFAULT_MAXIMUM);
        assert!(out[0].is_nan());
        for i in 2..30 {
            assert!(out[i] < bars[i].1, "sar {} above low at {}", out[i], i);
        }
    }

    #[test]
    fn sar_first_value_is_first_low() {
        let out = sar(
            &candles(&[(11.0, 9.0), (12.0, 10.0)]),
            DEFAULT_ACCELERATION,
            DEFAULT_MAXIMUM,
        );
        assert_eq!(out[1], 9.0);
    }

    #[test]
    fn sar_flips_on_breakdown() {
        let mut bars: Vec<(f64, f64)> = (0..10)
            .map(|i| (11.0 + i as f64, 9.0 + i as f64))
            .collect();
        bars.push((10.0, 2.0));
        let out = sar(&candles(&bars), DEFAULT_ACCELERATION, DEFAULT_MAXIMUM);
        // reversal resets SAR to the prior extreme (highest high 20)
        assert_eq!(out[10], 20.0);
    }
}
