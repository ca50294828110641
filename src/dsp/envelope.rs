//! Gain automation evaluator.
//!
//! Evaluates a [`GainAutomation`] list at an arbitrary time using the same
//! rules as WebAudio's `AudioParam`, so offline renders match what a
//! browser host plays.

use super::graph::{GainAutomation, RampKind};

/// Level before the first event.
const DEFAULT_GAIN: f64 = 1.0;

/// Stateless cursor over an automation list.
#[derive(Debug, Clone)]
pub struct Envelope<'a> {
    automation: &'a GainAutomation,
}

impl<'a> Envelope<'a> {
    pub fn new(automation: &'a GainAutomation) -> Self {
        Envelope { automation }
    }

    /// Gain at absolute time `t`.
    ///
    /// - Before the first event the level is [`DEFAULT_GAIN`], unless the
    ///   first event is a ramp, which ramps from the default.
    /// - A `SetImmediate` event holds its value until the next event.
    /// - An `ExponentialRamp` event interpolates geometrically from the
    ///   previous event's (time, value) to its own.
    /// - After the last event the last value holds.
    pub fn value_at(&self, t: f64) -> f64 {
        let events = self.automation.events();
        let mut prev_time = 0.0;
        let mut prev_value = DEFAULT_GAIN;

        for event in events {
            if t < event.time {
                return match event.ramp {
                    RampKind::SetImmediate => prev_value,
                    RampKind::ExponentialRamp => {
                        exponential(prev_time, prev_value, event.time, event.value, t)
                    }
                };
            }
            prev_time = event.time;
            prev_value = event.value;
        }
        prev_value
    }

    /// Time of the last automation event, if any.
    pub fn end_time(&self) -> Option<f64> {
        self.automation.events().last().map(|e| e.time)
    }
}

fn exponential(t0: f64, v0: f64, t1: f64, v1: f64, t: f64) -> f64 {
    if t <= t0 {
        return v0;
    }
    // Sign change or zero endpoint: WebAudio holds the previous value.
    if v0 <= 0.0 || v1 <= 0.0 || t1 <= t0 {
        return v0;
    }
    let ratio = (t - t0) / (t1 - t0);
    v0 * (v1 / v0).powf(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_automation_is_unity() {
        let a = GainAutomation::new();
        let env = Envelope::new(&a);
        assert_eq!(env.value_at(0.0), 1.0);
        assert_eq!(env.value_at(10.0), 1.0);
        assert_eq!(env.end_time(), None);
    }

    #[test]
    fn set_holds_until_next_event() {
        let a = GainAutomation::new().set_at(1.0, 0.5).set_at(2.0, 0.25);
        let env = Envelope::new(&a);
        assert_eq!(env.value_at(0.5), 1.0);
        assert_eq!(env.value_at(1.0), 0.5);
        assert_eq!(env.value_at(1.99), 0.5);
        assert_eq!(env.value_at(2.5), 0.25);
    }

    #[test]
    fn exponential_ramp_is_geometric() {
        let a = GainAutomation::new().set_at(0.0, 1.0).exponential_ramp_to(1.0, 0.01);
        let env = Envelope::new(&a);
        // Halfway through a 1 → 0.01 ramp is sqrt(0.01) = 0.1
        assert!((env.value_at(0.5) - 0.1).abs() < 1e-9);
        assert!((env.value_at(1.0) - 0.01).abs() < 1e-12);
        assert!((env.value_at(3.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn ramp_is_monotonic_when_decaying() {
        let a = GainAutomation::new().set_at(0.0, 0.8).exponential_ramp_to(0.4, 0.001);
        let env = Envelope::new(&a);
        let mut last = f64::INFINITY;
        for i in 0..=40 {
            let v = env.value_at(i as f64 * 0.01);
            assert!(v <= last + 1e-12);
            last = v;
        }
    }

    #[test]
    fn chained_ramps() {
        let a = GainAutomation::new()
            .set_at(0.0, 0.8)
            .exponential_ramp_to(0.5, 0.1)
            .exponential_ramp_to(1.0, 0.001);
        let env = Envelope::new(&a);
        assert!((env.value_at(0.5) - 0.1).abs() < 1e-12);
        assert!((env.value_at(0.75) - 0.01).abs() < 1e-9);
        assert_eq!(env.end_time(), Some(1.0));
    }
}
