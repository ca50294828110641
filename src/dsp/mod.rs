//! DSP layer: note graphs, voices and the substrates that play them.
//!
//! Voices describe each note as a [`graph::NoteGraph`]; a
//! [`substrate::SynthesisSubstrate`] accepts those graphs. The offline
//! substrate in [`engine`] renders them to samples so the same graphs power
//! both live playback (via the host's audio API) and WAV export.

pub mod engine;
pub mod envelope;
pub mod graph;
pub mod oscillator;
pub mod renderer;
pub mod sampler;
pub mod substrate;
pub mod voice;
