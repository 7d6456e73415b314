//! Hilbert transform cycle indicators (Ehlers).
//!
//! One recursive pass produces every output:
//! 1. price smoothed with a 4-bar WMA (weights 4,3,2,1)
//! 2. detrender, in-phase (I1) and quadrature (Q1) components from the
//!    Hilbert FIR (0.0962, 0.5769) scaled by 0.075 * period + 0.54
//! 3. phasor-advanced I2/Q2 and a homodyne discriminator giving the dominant
//!    cycle period, clamped to [0.67, 1.5] of its previous value and
//!    [6, 50] bars, then smoothed
//! 4. dominant cycle phase from a DFT of the smoothed price over one period
//!
//! Outputs:
//! - trendline: WMA(4,3,2,1) of the average price over one dominant cycle
//! - sine / leadsine: sin(phase), sin(phase + 45°)
//! - inphase / quadrature: I1 and Q1
//!
//! Warmup: 63 for trendline and sine, 32 for the phasor components.

use crate::domain::indicator::undefined;
use std::f64::consts::PI;

pub const TRENDLINE_LOOKBACK: usize = 63;
pub const PHASOR_LOOKBACK: usize = 32;

const A: f64 = 0.0962;
const B: f64 = 0.5769;

#[derive(Debug, Clone, PartialEq)]
pub struct HilbertCycle {
    pub trendline: Vec<f64>,
    pub sine: Vec<f64>,
    pub leadsine: Vec<f64>,
    pub inphase: Vec<f64>,
    pub quadrature: Vec<f64>,
}

/// Value at `i - lag`, zero before the start of the series.
fn lag(series: &[f64], i: usize, lag: usize) -> f64 {
    i.checked_sub(lag).map(|j| series[j]).unwrap_or(0.0)
}

fn fir(series: &[f64], i: usize) -> f64 {
    A * lag(series, i, 0) + B * lag(series, i, 2) - B * lag(series, i, 4) - A * lag(series, i, 6)
}

pub fn hilbert(values: &[f64]) -> HilbertCycle {
    let n = values.len();
    let mut result = HilbertCycle {
        trendline: undefined(n),
        sine: undefined(n),
        leadsine: undefined(n),
        inphase: undefined(n),
        quadrature: undefined(n),
    };
    if values.iter().any(|v| v.is_nan()) {
        return result;
    }

    let mut smooth = vec![0.0; n];
    let mut detrender = vec![0.0; n];
    let mut i1 = vec![0.0; n];
    let mut q1 = vec![0.0; n];

    let (mut prev_i2, mut prev_q2) = (0.0, 0.0);
    let (mut re, mut im) = (0.0, 0.0);
    let mut period = 0.0f64;
    let mut smooth_period = 0.0f64;
    let mut dc_phase = 0.0f64;
    let mut trend_hist = [0.0f64; 3];

    let to_deg = 180.0 / PI;

    for i in 0..n {
        smooth[i] = (4.0 * values[i]
            + 3.0 * lag(values, i, 1)
            + 2.0 * lag(values, i, 2)
            + lag(values, i, 3))
            / 10.0;

        let adjusted = 0.075 * period + 0.54;
        detrender[i] = fir(&smooth, i) * adjusted;
        q1[i] = fir(&detrender, i) * adjusted;
        i1[i] = lag(&detrender, i, 3);

        let j_i = fir(&i1, i) * adjusted;
        let j_q = fir(&q1, i) * adjusted;

        let q2 = 0.2 * (q1[i] + j_i) + 0.8 * prev_q2;
        let i2 = 0.2 * (i1[i] - j_q) + 0.8 * prev_i2;
        re = 0.2 * (i2 * prev_i2 + q2 * prev_q2) + 0.8 * re;
        im = 0.2 * (i2 * prev_q2 - q2 * prev_i2) + 0.8 * im;
        prev_q2 = q2;
        prev_i2 = i2;

        let previous = period;
        if im != 0.0 && re != 0.0 {
            period = 360.0 / ((im / re).atan() * to_deg);
        }
        period = period.min(1.5 * previous).max(0.67 * previous).clamp(6.0, 50.0);
        period = 0.2 * period + 0.8 * previous;
        smooth_period = 0.33 * period + 0.67 * smooth_period;

        let dc_period = (smooth_period + 0.5) as usize;
        let mut real_part = 0.0;
        let mut imag_part = 0.0;
        let mut sum = 0.0;
        for j in 0..dc_period {
            let angle = j as f64 * 2.0 * PI / dc_period as f64;
            let price = lag(&smooth, i, j);
            real_part += angle.sin() * price;
            imag_part += angle.cos() * price;
            sum += lag(values, i, j);
        }

        if imag_part.abs() > 0.0 {
            dc_phase = (real_part / imag_part).atan() * to_deg;
        } else if real_part < 0.0 {
            dc_phase -= 90.0;
        } else if real_part > 0.0 {
            dc_phase += 90.0;
        }
        dc_phase += 90.0;
        if smooth_period > 0.0 {
            dc_phase += 360.0 / smooth_period;
        }
        if imag_part < 0.0 {
            dc_phase += 180.0;
        }
        if dc_phase > 315.0 {
            dc_phase -= 360.0;
        }

        let average = if dc_period > 0 {
            sum / dc_period as f64
        } else {
            values[i]
        };
        let trend =
            (4.0 * average + 3.0 * trend_hist[0] + 2.0 * trend_hist[1] + trend_hist[2]) / 10.0;
        trend_hist = [average, trend_hist[0], trend_hist[1]];

        if i >= PHASOR_LOOKBACK {
            result.inphase[i] = i1[i];
            result.quadrature[i] = q1[i];
        }
        if i >= TRENDLINE_LOOKBACK {
            result.trendline[i] = trend;
            result.sine[i] = (dc_phase / to_deg).sin();
            result.leadsine[i] = ((dc_phase + 45.0) / to_deg).sin();
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::leading_undefined;

    fn cycle(n: usize, length: f64) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 5.0 * (2.0 * PI * i as f64 / length).sin())
            .collect()
    }

    #[test]
    fn warmups() {
        let out = hilbert(&cycle(200, 20.0));
        assert_eq!(leading_undefined(&out.trendline), TRENDLINE_LOOKBACK);
        assert_eq!(leading_undefined(&out.sine), TRENDLINE_LOOKBACK);
        assert_eq!(leading_undefined(&out.leadsine), TRENDLINE_LOOKBACK);
        assert_eq!(leading_undefined(&out.inphase), PHASOR_LOOKBACK);
        assert_eq!(leading_undefined(&out.quadrature), PHASOR_LOOKBACK);
    }

    #[test]
    fn trendline_tracks_flat_price() {
        let out = hilbert(&vec![42.0; 150]);
        assert!((out.trendline[149] - 42.0).abs() < 1e-6);
        assert!(out.inphase[149].abs() < 1e-9);
    }

    #[test]
    fn trendline_centres_on_cycle_mean() {
        let out = hilbert(&cycle(400, 20.0));
        assert!((out.trendline[399] - 100.0).abs() < 2.5);
    }

    #[test]
    fn sine_outputs_are_bounded() {
        let out = hilbert(&cycle(300, 15.0));
        for i in TRENDLINE_LOOKBACK..300 {
            assert!(out.sine[i].abs() <= 1.0);
            assert!(out.leadsine[i].abs() <= 1.0);
        }
    }

    #[test]
    fn short_input_is_undefined() {
        let out = hilbert(&[1.0; 20]);
        assert!(out.trendline.iter().all(|v| v.is_nan()));
    }
}
