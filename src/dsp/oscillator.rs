//! Anti-aliased oscillators using PolyBLEP.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// Stroke colors that select a non-sine waveform.
const COLOR_WAVEFORMS: [(&str, Waveform); 3] = [
    ("#ff0000", Waveform::Square),
    ("#0000ff", Waveform::Sawtooth),
    ("#008000", Waveform::Triangle),
];

impl Waveform {
    /// Pick a waveform from a stroke color. Exact, case-insensitive match on
    /// red/blue/green; every other color is a sine.
    pub fn from_color(color: &str) -> Waveform {
        COLOR_WAVEFORMS
            .iter()
            .find(|(hex, _)| hex.eq_ignore_ascii_case(color))
            .map(|&(_, w)| w)
            .unwrap_or(Waveform::Sine)
    }
}

/// A band-limited oscillator with anti-aliasing (PolyBLEP).
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            frequency,
            phase: 0.0,
            sample_rate,
        }
    }

    fn phase_inc(&self) -> f64 {
        self.frequency / self.sample_rate
    }

    /// Generate the next sample.
    pub fn next_sample(&mut self) -> f64 {
        let inc = self.phase_inc();
        let sample = match self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Sawtooth => 2.0 * self.phase - 1.0 - poly_blep(self.phase, inc),
            Waveform::Square => {
                let naive = if self.phase < 0.5 { 1.0 } else { -1.0 };
                naive + poly_blep(self.phase, inc) - poly_blep((self.phase + 0.5) % 1.0, inc)
            }
            // Piecewise linear: -1→+1 over the first half, +1→-1 over the second
            Waveform::Triangle => {
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };

        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }

        sample
    }
}

/// PolyBLEP (Polynomial Band-Limited Step) correction at a discontinuity.
///
/// `t` is the phase [0, 1), `dt` the phase increment per sample.
fn poly_blep(t: f64, dt: f64) -> f64 {
    if t < dt {
        let t = t / dt;
        2.0 * t - t * t - 1.0
    } else if t > 1.0 - dt {
        let t = (t - 1.0) / dt;
        t * t + 2.0 * t + 1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_colors() {
        assert_eq!(Waveform::from_color("#ff0000"), Waveform::Square);
        assert_eq!(Waveform::from_color("#0000ff"), Waveform::Sawtooth);
        assert_eq!(Waveform::from_color("#008000"), Waveform::Triangle);
        assert_eq!(Waveform::from_color("#123456"), Waveform::Sine);
    }

    #[test]
    fn color_match_ignores_case() {
        assert_eq!(Waveform::from_color("#FF0000"), Waveform::Square);
        assert_eq!(Waveform::from_color("#0000FF"), Waveform::Sawtooth);
    }

    #[test]
    fn near_colors_do_not_interpolate() {
        assert_eq!(Waveform::from_color("#fe0000"), Waveform::Sine);
        assert_eq!(Waveform::from_color("#00ff00"), Waveform::Sine);
        assert_eq!(Waveform::from_color("red"), Waveform::Sine);
        assert_eq!(Waveform::from_color(" #ff0000"), Waveform::Sine);
        assert_eq!(Waveform::from_color("#ff0000 "), Waveform::Sine);
    }

    #[test]
    fn sine_starts_at_zero() {
        let mut osc = Oscillator::new(Waveform::Sine, 440.0, 44100.0);
        assert!(osc.next_sample().abs() < 1e-10);
    }

    #[test]
    fn outputs_stay_bounded() {
        for waveform in [Waveform::Sine, Waveform::Square, Waveform::Sawtooth, Waveform::Triangle] {
            let mut osc = Oscillator::new(waveform, 1200.0, 44100.0);
            for _ in 0..44100 {
                let s = osc.next_sample();
                assert!(s.abs() <= 1.5, "{waveform:?} out of range: {s}");
            }
        }
    }

    #[test]
    fn waveform_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Waveform::Sawtooth).unwrap(), "\"sawtooth\"");
    }
}
