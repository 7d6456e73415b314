//! RSI (Relative Strength Index) and CMO (Chande Momentum Oscillator).
//!
//! Both use Wilder's smoothing for average gain/loss:
//! - First average: simple mean of gains/losses over the first n changes
//! - Subsequent: avg = (prev_avg * (n-1) + current) / n
//!
//! RSI = 100 * avg_gain / (avg_gain + avg_loss), which equals
//! 100 - 100 / (1 + avg_gain / avg_loss). A flat window gives 0.
//! CMO = 100 * (avg_gain - avg_loss) / (avg_gain + avg_loss).
//!
//! Warmup: first n values are undefined (n price changes are needed).

pub fn rsi(values: &[f64], period: usize) -> Vec<f64> {
    smoothed_moves(values, period)
        .into_iter()
        .map(|m| match m {
            Some((gain, loss)) if gain + loss > 0.0 => 100.0 * gain / (gain + loss),
            Some(_) => 0.0,
            None => f64::NAN,
        })
        .collect()
}

pub fn cmo(values: &[f64], period: usize) -> Vec<f64> {
    smoothed_moves(values, period)
        .into_iter()
        .map(|m| match m {
            Some((gain, loss)) if gain + loss > 0.0 => 100.0 * (gain - loss) / (gain + loss),
            Some(_) => 0.0,
            None => f64::NAN,
        })
        .collect()
}

/// Wilder-smoothed (average gain, average loss) per index.
fn smoothed_moves(values: &[f64], period: usize) -> Vec<Option<(f64, f64)>> {
    let mut out = vec![None; values.len()];
    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    if period == 0 || values.len() <= start + period {
        return out;
    }

    let change = |i: usize| values[i] - values[i - 1];
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in (start + 1)..=(start + period) {
        let c = change(i);
        if c > 0.0 {
            avg_gain += c;
        } else {
            avg_loss -= c;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[start + period] = Some((avg_gain, avg_loss));

    let n = period as f64;
    for i in (start + period + 1)..values.len() {
        let c = change(i);
        let (gain, loss) = if c > 0.0 { (c, 0.0) } else { (0.0, -c) };
        avg_gain = (avg_gain * (n - 1.0) + gain) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss) / n;
        out[i] = Some((avg_gain, avg_loss));
    }
    out
}
