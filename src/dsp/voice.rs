//! Voices — the four timbres a drawing can be played with.
//!
//! Each voice turns one segment's [`SynthesisParameters`] into a
//! [`NoteGraph`] and commits it to the substrate. The set is closed; adding
//! a voice means adding a variant here and handling it in every match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::mapper::SynthesisParameters;

use super::graph::{GainAutomation, NoteGraph, Partial, Source};
use super::oscillator::Waveform;
use super::sampler::SampleTable;
use super::substrate::SynthesisSubstrate;

/// Organ partials: (frequency ratio, gain).
const ORGAN_PARTIALS: [(f64, f64); 3] = [(1.0, 0.4), (2.0, 0.3), (1.5, 0.2)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Voice {
    /// Single oscillator; the stroke color picks the waveform.
    #[default]
    Oscillator,
    /// Triangle an octave up with a fast two-stage decay.
    MusicBox,
    /// Additive fundamental + octave + fifth.
    Organ,
    /// Pitched samples when loaded, otherwise a percussive triangle.
    Piano,
}

/// Render-time inputs that don't come from the segment itself.
#[derive(Debug, Clone, Copy)]
pub struct VoiceContext<'a> {
    /// Target of "decay to silence" ramps.
    pub gain_floor: f64,
    /// Samples available right now. Only the piano looks at this.
    pub samples: &'a SampleTable,
}

impl Voice {
    pub const ALL: [Voice; 4] = [Voice::Oscillator, Voice::MusicBox, Voice::Organ, Voice::Piano];

    /// Selector name used by the UI and the WASM bindings.
    pub fn name(&self) -> &'static str {
        match self {
            Voice::Oscillator => "oscillator",
            Voice::MusicBox => "musicBox",
            Voice::Organ => "organ",
            Voice::Piano => "piano",
        }
    }

    /// Scales the mapped note duration.
    pub fn duration_multiplier(&self) -> f64 {
        match self {
            Voice::Oscillator => 1.0,
            Voice::MusicBox => 0.8,
            Voice::Organ => 1.5,
            Voice::Piano => 1.2,
        }
    }

    /// One-line description for the instrument picker.
    pub fn description(&self) -> &'static str {
        match self {
            Voice::Oscillator => {
                "Basic waveforms: red is square, blue is sawtooth, green is triangle, anything else is sine."
            }
            Voice::MusicBox => "Music box: a high triangle tone with a quick decay.",
            Voice::Organ => "Organ (simplified): several sine partials mixed into a fuller tone.",
            Voice::Piano => {
                "Piano: uses loaded piano samples when available, otherwise a synthesized stand-in."
            }
        }
    }

    /// Build the graph for one note. `params.note_duration` must already
    /// include [`duration_multiplier`](Self::duration_multiplier).
    pub fn build_graph(&self, params: &SynthesisParameters, color: &str, ctx: VoiceContext<'_>) -> NoteGraph {
        match self {
            Voice::Oscillator => oscillator_graph(params, color, ctx.gain_floor),
            Voice::MusicBox => music_box_graph(params, ctx.gain_floor),
            Voice::Organ => organ_graph(params, ctx.gain_floor),
            Voice::Piano => piano_graph(params, ctx),
        }
    }

    /// Build, check and schedule one note.
    pub fn render(
        &self,
        params: &SynthesisParameters,
        color: &str,
        ctx: VoiceContext<'_>,
        substrate: &mut dyn SynthesisSubstrate,
    ) -> Result<(), ScheduleError> {
        let graph = self.build_graph(params, color, ctx);
        graph.validate()?;
        substrate.schedule(graph)?;
        Ok(())
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Voice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Voice::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| format!("unknown voice '{s}'"))
    }
}

// ── Graph builders ──────────────────────────────────────────

fn oscillator_graph(p: &SynthesisParameters, color: &str, floor: f64) -> NoteGraph {
    let (start, end) = (p.play_time, p.play_time + p.note_duration);
    NoteGraph {
        partials: vec![Partial::direct(Source::Oscillator {
            waveform: Waveform::from_color(color),
            frequency: p.frequency,
        })],
        master_gain: GainAutomation::new()
            .set_at(start, p.volume)
            .exponential_ramp_to(end, floor),
        start,
        stop: end,
    }
}

fn music_box_graph(p: &SynthesisParameters, floor: f64) -> NoteGraph {
    let (start, end) = (p.play_time, p.play_time + p.note_duration);
    NoteGraph {
        partials: vec![Partial::direct(Source::Oscillator {
            waveform: Waveform::Triangle,
            frequency: p.frequency * 2.0,
        })],
        master_gain: GainAutomation::new()
            .set_at(start, p.volume * 0.8)
            .exponential_ramp_to(start + p.note_duration * 0.5, (p.volume * 0.1).max(floor))
            .exponential_ramp_to(end, floor),
        start,
        stop: end,
    }
}

fn organ_graph(p: &SynthesisParameters, floor: f64) -> NoteGraph {
    let (start, end) = (p.play_time, p.play_time + p.note_duration);
    let partials = ORGAN_PARTIALS
        .iter()
        .map(|&(ratio, gain)| {
            Partial::with_gain(
                Source::Oscillator {
                    waveform: Waveform::Sine,
                    frequency: p.frequency * ratio,
                },
                gain,
            )
        })
        .collect();

    NoteGraph {
        partials,
        master_gain: GainAutomation::new()
            .set_at(start, p.volume)
            .set_at(start + p.note_duration * 0.8, p.volume * 0.9)
            .exponential_ramp_to(end, floor),
        start,
        stop: end,
    }
}

fn piano_graph(p: &SynthesisParameters, ctx: VoiceContext<'_>) -> NoteGraph {
    let floor = ctx.gain_floor;
    let start = p.play_time;

    if let Some(sample) = ctx.samples.nearest(p.frequency) {
        let end = start + p.note_duration * 1.5;
        return NoteGraph {
            partials: vec![Partial::direct(Source::Buffer {
                note_name: sample.note_name,
                playback_rate: sample.playback_rate,
                buffer: sample.buffer,
            })],
            master_gain: GainAutomation::new()
                .set_at(start, p.volume)
                .exponential_ramp_to(end, floor),
            start,
            stop: end,
        };
    }

    tracing::debug!(frequency = p.frequency, "no piano samples loaded, using synthesized piano");
    let d = p.note_duration;
    NoteGraph {
        partials: vec![Partial::direct(Source::Oscillator {
            waveform: Waveform::Triangle,
            frequency: p.frequency,
        })],
        master_gain: GainAutomation::new()
            .set_at(start, p.volume)
            .exponential_ramp_to(start + d * 0.2, (p.volume * 0.3).max(floor))
            .exponential_ramp_to(start + d * 0.8, (p.volume * 0.1).max(floor))
            .exponential_ramp_to(start + d, floor),
        start,
        // Let the tail ring a little past the envelope.
        stop: start + d * 1.2,
    }
}
