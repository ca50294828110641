//! Offline substrate — renders scheduled note graphs to samples.
//!
//! Accepts graphs like any other substrate, then mixes them into a mono
//! buffer on demand. The clock never advances on its own: `current_time`
//! stays at 0 so a playback's onsets land at `lead_in + i * time_step`.

use crate::error::SubstrateError;

use super::envelope::Envelope;
use super::graph::{NoteGraph, Source};
use super::oscillator::Oscillator;
use super::sampler::SampleBuffer;
use super::substrate::{SubstrateState, SynthesisSubstrate};

/// Silence appended after the last stop time.
const TAIL_SECONDS: f64 = 0.1;

pub struct OfflineSubstrate {
    pub sample_rate: f64,
    /// Gain applied to the summed graphs before soft clipping.
    pub master_gain: f64,
    graphs: Vec<NoteGraph>,
}

impl OfflineSubstrate {
    pub fn new(sample_rate: f64) -> Self {
        OfflineSubstrate {
            sample_rate,
            master_gain: 0.8,
            graphs: Vec::new(),
        }
    }

    pub fn graphs(&self) -> &[NoteGraph] {
        &self.graphs
    }

    /// Seconds of audio `render` will produce.
    pub fn duration(&self) -> f64 {
        self.graphs
            .iter()
            .map(|g| g.stop)
            .fold(0.0, f64::max)
            + TAIL_SECONDS
    }

    /// Mix every scheduled graph into mono f64 samples in [-1, 1].
    pub fn render(&self) -> Vec<f64> {
        let total = (self.duration() * self.sample_rate).ceil() as usize;
        let mut mix = vec![0.0_f64; total];
        for graph in &self.graphs {
            self.render_graph(graph, &mut mix);
        }
        mix.iter_mut().for_each(|s| *s = soft_clip(*s * self.master_gain));
        mix
    }

    /// Render to interleaved stereo i16 PCM (for WAV export).
    pub fn render_pcm_i16(&self) -> Vec<i16> {
        let mono = self.render();
        let mut stereo = Vec::with_capacity(mono.len() * 2);
        for &s in &mono {
            let sample = (s * 32767.0).round().clamp(-32768.0, 32767.0) as i16;
            stereo.push(sample); // L
            stereo.push(sample); // R
        }
        stereo
    }

    fn render_graph(&self, graph: &NoteGraph, out: &mut [f64]) {
        let first = (graph.start * self.sample_rate).round() as usize;
        let last = ((graph.stop * self.sample_rate).round() as usize).min(out.len());
        if first >= last {
            return;
        }

        let envelope = Envelope::new(&graph.master_gain);
        let mut sources: Vec<SourceCursor<'_>> = graph
            .partials
            .iter()
            .map(|p| SourceCursor::new(&p.source, p.level(), self.sample_rate))
            .collect();

        for (i, slot) in out[first..last].iter_mut().enumerate() {
            let t = (first + i) as f64 / self.sample_rate;
            let sum: f64 = sources.iter_mut().map(|s| s.next_sample()).sum();
            *slot += sum * envelope.value_at(t);
        }
    }
}

impl SynthesisSubstrate for OfflineSubstrate {
    fn current_time(&self) -> f64 {
        0.0
    }

    fn state(&self) -> SubstrateState {
        SubstrateState::Running
    }

    fn resume(&mut self) -> Result<(), SubstrateError> {
        Ok(())
    }

    fn schedule(&mut self, graph: NoteGraph) -> Result<(), SubstrateError> {
        self.graphs.push(graph);
        Ok(())
    }
}

/// Per-partial playback state.
enum SourceCursor<'a> {
    Oscillator { osc: Oscillator, level: f64 },
    Buffer { buffer: &'a SampleBuffer, position: f64, step: f64, level: f64 },
}

impl<'a> SourceCursor<'a> {
    fn new(source: &'a Source, level: f64, sample_rate: f64) -> Self {
        match source {
            Source::Oscillator { waveform, frequency } => SourceCursor::Oscillator {
                osc: Oscillator::new(*waveform, *frequency, sample_rate),
                level,
            },
            Source::Buffer { playback_rate, buffer, .. } => SourceCursor::Buffer {
                buffer: buffer.as_ref(),
                position: 0.0,
                // Resample from the buffer's native rate to ours, then pitch-shift.
                step: playback_rate * buffer.sample_rate as f64 / sample_rate,
                level,
            },
        }
    }

    fn next_sample(&mut self) -> f64 {
        match self {
            SourceCursor::Oscillator { osc, level } => osc.next_sample() * *level,
            SourceCursor::Buffer { buffer, position, step, level } => {
                let s = buffer.read_interpolated(*position);
                *position += *step;
                s * *level
            }
        }
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}
