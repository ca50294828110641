//! Note graphs — the unit of work handed to a synthesis substrate.
//!
//! A note graph is one or more sound sources, each optionally routed through
//! its own fixed gain stage, summed into a master gain whose level is driven
//! by an automation list. Sources start and stop at absolute substrate times.
//!
//! ```text
//!   source ─▶ [partial gain] ─┐
//!   source ─▶ [partial gain] ─┼─▶ master gain (automated) ─▶ destination
//!   source ───────────────────┘
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::error::ScheduleError;

use super::oscillator::Waveform;
use super::sampler::SampleBuffer;

// ── Gain Automation ─────────────────────────────────────────

/// How the gain reaches an automation event's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RampKind {
    /// Jump to the value at the event time (WebAudio `setValueAtTime`).
    SetImmediate,
    /// Approach the value geometrically from the previous event
    /// (WebAudio `exponentialRampToValueAtTime`).
    ExponentialRamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GainEvent {
    pub time: f64,
    pub value: f64,
    pub ramp: RampKind,
}

/// An ordered list of gain events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GainAutomation {
    events: Vec<GainEvent>,
}

impl GainAutomation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_at(mut self, time: f64, value: f64) -> Self {
        self.events.push(GainEvent { time, value, ramp: RampKind::SetImmediate });
        self
    }

    pub fn exponential_ramp_to(mut self, time: f64, value: f64) -> Self {
        self.events.push(GainEvent { time, value, ramp: RampKind::ExponentialRamp });
        self
    }

    pub fn events(&self) -> &[GainEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ── Sources ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Source {
    Oscillator {
        waveform: Waveform,
        frequency: f64,
    },
    /// Plays a recorded sample at `playback_rate` times its native speed.
    Buffer {
        #[serde(rename = "note")]
        note_name: String,
        #[serde(rename = "playbackRate")]
        playback_rate: f64,
        /// Audio data for offline rendering. A browser host looks the
        /// buffer up by note name instead.
        #[serde(skip)]
        buffer: Arc<SampleBuffer>,
    },
}

/// A source plus its optional fixed gain stage before the master gain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partial {
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
}

impl Partial {
    pub fn direct(source: Source) -> Self {
        Partial { source, gain: None }
    }

    pub fn with_gain(source: Source, gain: f64) -> Self {
        Partial { source, gain: Some(gain) }
    }

    /// Linear gain applied before the master stage.
    pub fn level(&self) -> f64 {
        self.gain.unwrap_or(1.0)
    }
}

// ── Note Graph ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteGraph {
    pub partials: Vec<Partial>,
    pub master_gain: GainAutomation,
    /// Absolute start time of every source.
    pub start: f64,
    /// Absolute stop time of every source.
    pub stop: f64,
}

impl NoteGraph {
    /// Reject graphs the substrate would choke on: non-finite values,
    /// non-positive pitches, exponential ramps to or from zero, events out
    /// of order, or a stop before the start.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        finite_positive("start time", self.start, true)?;
        finite_positive("stop time", self.stop, true)?;
        if self.stop <= self.start {
            return Err(ScheduleError::InvalidParameter { name: "stop time", value: self.stop });
        }

        for partial in &self.partials {
            match &partial.source {
                Source::Oscillator { frequency, .. } => {
                    finite_positive("frequency", *frequency, false)?;
                }
                Source::Buffer { playback_rate, .. } => {
                    finite_positive("playback rate", *playback_rate, false)?;
                }
            }
            if let Some(g) = partial.gain {
                finite_positive("partial gain", g, true)?;
            }
        }

        let mut last_time = f64::NEG_INFINITY;
        for event in self.master_gain.events() {
            finite_positive("automation time", event.time, true)?;
            if event.time < last_time {
                return Err(ScheduleError::InvalidParameter {
                    name: "automation time",
                    value: event.time,
                });
            }
            last_time = event.time;
            match event.ramp {
                RampKind::SetImmediate => finite_positive("gain", event.value, true)?,
                RampKind::ExponentialRamp => finite_positive("ramp target", event.value, false)?,
            }
        }
        Ok(())
    }
}

fn finite_positive(name: &'static str, value: f64, allow_zero: bool) -> Result<(), ScheduleError> {
    let ok = value.is_finite() && if allow_zero { value >= 0.0 } else { value > 0.0 };
    if ok {
        Ok(())
    } else {
        Err(ScheduleError::InvalidParameter { name, value })
    }
}
