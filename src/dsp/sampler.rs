//! Pitched sample table for the piano voice.
//!
//! Samples are keyed by note name ("C4", "F#3", "Bb5") and carry the
//! frequency they were recorded at. Playing another pitch resamples the
//! nearest recording at `target / reference` speed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

/// A single sample buffer loaded into memory.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Mono f64 samples.
    pub data: Vec<f64>,
    /// Native sample rate of the audio.
    pub sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(data: Vec<f64>, sample_rate: u32) -> Self {
        SampleBuffer { data, sample_rate }
    }

    /// Create from 16-bit signed PCM data.
    pub fn from_i16(pcm: &[i16], sample_rate: u32) -> Self {
        let data = pcm.iter().map(|&s| s as f64 / 32768.0).collect();
        SampleBuffer { data, sample_rate }
    }

    /// Create from f32 samples.
    pub fn from_f32(samples: &[f32], sample_rate: u32) -> Self {
        let data = samples.iter().map(|&s| s as f64).collect();
        SampleBuffer { data, sample_rate }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Length in seconds at native speed.
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.sample_rate as f64
    }

    /// Read a sample with linear interpolation at a fractional position.
    /// Out-of-range positions read as silence.
    pub fn read_interpolated(&self, position: f64) -> f64 {
        if position < 0.0 || !position.is_finite() {
            return 0.0;
        }
        let idx = position as usize;
        match (self.data.get(idx), self.data.get(idx + 1)) {
            (Some(&a), Some(&b)) => {
                let frac = position - idx as f64;
                a * (1.0 - frac) + b * frac
            }
            (Some(&a), None) => a,
            _ => 0.0,
        }
    }
}

// ── Note names ──────────────────────────────────────────────

/// Parse a note name (e.g. "C4", "F#3", "Bb5") into a MIDI note number.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let mut chars = note.chars();
    let mut semitone = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let octave_str = if let Some(r) = rest.strip_prefix('#') {
        semitone += 1;
        r
    } else if let Some(r) = rest.strip_prefix('b') {
        semitone -= 1;
        r
    } else {
        rest
    };

    let octave: i32 = octave_str.parse().ok()?;
    // C4 = 60
    Some((octave + 1) * 12 + semitone)
}

/// Equal-tempered frequency of a MIDI note, A4 (69) = 440 Hz.
pub fn midi_to_frequency(midi: i32) -> f64 {
    440.0 * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

pub fn note_to_frequency(note: &str) -> Option<f64> {
    note_to_midi(note).map(midi_to_frequency)
}

// ── Sample Table ────────────────────────────────────────────

/// A recorded note and the pitch it was recorded at.
#[derive(Debug, Clone)]
pub struct PitchSample {
    pub reference_frequency: f64,
    pub buffer: Arc<SampleBuffer>,
}

/// The sample chosen for a target pitch.
#[derive(Debug, Clone)]
pub struct SampleMatch {
    pub note_name: String,
    pub reference_frequency: f64,
    /// `target / reference`: resampling speed that lands on the target pitch.
    pub playback_rate: f64,
    pub buffer: Arc<SampleBuffer>,
}

#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    samples: HashMap<String, PitchSample>,
}

/// Table shared between loader tasks (writers) and the piano voice (reader).
pub type SharedSampleTable = Arc<RwLock<SampleTable>>;

impl SampleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSampleTable {
        Arc::new(RwLock::new(Self::new()))
    }

    /// Insert a sample under a note name, deriving its reference pitch from
    /// the name. Returns `false` (and stores nothing) if the name is not a
    /// valid note.
    pub fn insert(&mut self, note_name: &str, buffer: SampleBuffer) -> bool {
        match note_to_frequency(note_name) {
            Some(freq) => {
                self.insert_with_frequency(note_name, freq, buffer);
                true
            }
            None => false,
        }
    }

    pub fn insert_with_frequency(&mut self, note_name: &str, reference_frequency: f64, buffer: SampleBuffer) {
        self.samples.insert(
            note_name.to_string(),
            PitchSample { reference_frequency, buffer: Arc::new(buffer) },
        );
    }

    pub fn get(&self, note_name: &str) -> Option<&PitchSample> {
        self.samples.get(note_name)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Closest sample to `target_frequency` by absolute Hz difference.
    ///
    /// Ties go to whichever entry the map yields first; `HashMap` order is
    /// unspecified, so equidistant samples may resolve either way.
    pub fn nearest(&self, target_frequency: f64) -> Option<SampleMatch> {
        let mut best: Option<(&String, &PitchSample, f64)> = None;
        for (name, sample) in &self.samples {
            if sample.buffer.is_empty() || sample.reference_frequency <= 0.0 {
                continue;
            }
            let diff = (sample.reference_frequency - target_frequency).abs();
            if best.as_ref().is_none_or(|&(_, _, d)| diff < d) {
                best = Some((name, sample, diff));
            }
        }

        best.map(|(name, sample, _)| SampleMatch {
            note_name: name.clone(),
            reference_frequency: sample.reference_frequency,
            playback_rate: target_frequency / sample.reference_frequency,
            buffer: Arc::clone(&sample.buffer),
        })
    }
}
