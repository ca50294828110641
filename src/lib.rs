pub mod config;
pub mod dsp;
pub mod error;
pub mod mapper;
#[cfg(feature = "samples")]
pub mod provider;
pub mod scheduler;
pub mod segment;

use crate::config::PlaybackConfig;
use crate::dsp::graph::NoteGraph;
use crate::dsp::sampler::{SampleBuffer, SampleTable};
use crate::dsp::substrate::RecordingSubstrate;
use crate::dsp::voice::Voice;
use crate::error::{SampleLoadError, SketchToneError};
use crate::scheduler::Scheduler;
use crate::segment::{Drawing, Segment};
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the sketchtone-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// Parse a JSON array of segments into a drawing.
pub fn parse_segments_json(json: &str) -> Result<Drawing, SketchToneError> {
    let segments: Vec<Segment> =
        serde_json::from_str(json).map_err(|e| SketchToneError::Config(format!("invalid segments: {e}")))?;
    Ok(segments.into())
}

/// Voice by name; anything unrecognized plays as the oscillator.
pub fn voice_or_default(name: &str) -> Voice {
    name.parse().unwrap_or_default()
}

fn drawing_from_js(segments: JsValue) -> Result<Drawing, JsValue> {
    let segments: Vec<Segment> =
        serde_wasm_bindgen::from_value(segments).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    Ok(segments.into())
}

fn js_err(e: SketchToneError) -> JsValue {
    JsValue::from_str(&format!("{e}"))
}

// ── Engine ──────────────────────────────────────────────────

/// A scheduler plus the samples registered with it. Hosts keep one of
/// these alive so piano samples registered once are used by every call.
#[wasm_bindgen]
pub struct SketchToneEngine {
    scheduler: Scheduler,
}

#[wasm_bindgen]
impl SketchToneEngine {
    #[wasm_bindgen(constructor)]
    pub fn new() -> SketchToneEngine {
        SketchToneEngine { scheduler: Scheduler::new(PlaybackConfig::default(), SampleTable::shared()) }
    }

    /// Build an engine from a JSON `PlaybackConfig` (camelCase keys).
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(config_json: &str) -> Result<SketchToneEngine, JsValue> {
        SketchToneEngine::from_config_json(config_json).map_err(js_err)
    }

    /// Register decoded mono PCM for a note (e.g. "C4"). Replaces any
    /// sample already registered under that note.
    #[wasm_bindgen(js_name = registerSample)]
    pub fn register_sample(&mut self, note: &str, samples: &[f32], sample_rate: u32) -> Result<(), JsValue> {
        self.add_sample(note, samples, sample_rate).map_err(js_err)
    }

    #[wasm_bindgen(js_name = sampleCount)]
    pub fn sample_count(&self) -> usize {
        self.scheduler.samples().read().len()
    }

    /// Map a drawing to note graphs starting at `base_time`.
    pub fn schedule(&self, segments: JsValue, voice: &str, canvas_height: f64, base_time: f64) -> Result<JsValue, JsValue> {
        let drawing = drawing_from_js(segments)?;
        let graphs = self
            .schedule_graphs(&drawing, voice_or_default(voice), canvas_height, base_time)
            .map_err(js_err)?;
        serde_wasm_bindgen::to_value(&graphs).map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    #[wasm_bindgen(js_name = renderWav)]
    pub fn render_wav(&self, segments: JsValue, voice: &str, canvas_height: f64, sample_rate: u32) -> Result<Vec<u8>, JsValue> {
        let drawing = drawing_from_js(segments)?;
        dsp::renderer::render_wav(&self.scheduler, &drawing, voice_or_default(voice), canvas_height, sample_rate)
            .map_err(js_err)
    }

    #[wasm_bindgen(js_name = renderSamples)]
    pub fn render_samples(&self, segments: JsValue, voice: &str, canvas_height: f64, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
        let drawing = drawing_from_js(segments)?;
        self.render_mono(&drawing, voice_or_default(voice), canvas_height, sample_rate)
            .map_err(js_err)
    }
}

impl Default for SketchToneEngine {
    fn default() -> Self {
        SketchToneEngine::new()
    }
}

impl SketchToneEngine {
    pub fn from_config_json(config_json: &str) -> Result<SketchToneEngine, SketchToneError> {
        let config = PlaybackConfig::from_json(config_json)?;
        Ok(SketchToneEngine { scheduler: Scheduler::try_new(config, SampleTable::shared())? })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn add_sample(&mut self, note: &str, samples: &[f32], sample_rate: u32) -> Result<(), SketchToneError> {
        let locator = "registered";
        if samples.is_empty() || sample_rate == 0 {
            return Err(SampleLoadError::EmptyBuffer { locator: locator.to_string(), note: note.to_string() }.into());
        }
        let buffer = SampleBuffer::from_f32(samples, sample_rate);
        if !self.scheduler.samples().write().insert(note, buffer) {
            return Err(SampleLoadError::Decode {
                locator: locator.to_string(),
                note: note.to_string(),
                reason: format!("'{note}' is not a note name"),
            }
            .into());
        }
        tracing::info!(note, frames = samples.len(), sample_rate, "sample registered");
        Ok(())
    }

    pub fn schedule_graphs(
        &self,
        drawing: &Drawing,
        voice: Voice,
        canvas_height: f64,
        base_time: f64,
    ) -> Result<Vec<NoteGraph>, SketchToneError> {
        let mut substrate = RecordingSubstrate::starting_at(base_time);
        self.scheduler.schedule(drawing, voice, canvas_height, base_time, &mut substrate)?;
        Ok(substrate.into_graphs())
    }

    pub fn render_mono(
        &self,
        drawing: &Drawing,
        voice: Voice,
        canvas_height: f64,
        sample_rate: u32,
    ) -> Result<Vec<f32>, SketchToneError> {
        let (engine, _) = dsp::renderer::render_drawing(&self.scheduler, drawing, voice, canvas_height, sample_rate)?;
        Ok(engine.render().iter().map(|&s| s as f32).collect())
    }
}

// ── One-shot exports ────────────────────────────────────────

/// WASM-exposed: map a drawing to note graphs starting at `base_time`,
/// with no samples registered.
#[wasm_bindgen]
pub fn schedule_drawing(
    segments: JsValue,
    voice: &str,
    canvas_height: f64,
    base_time: f64,
) -> Result<JsValue, JsValue> {
    SketchToneEngine::new().schedule(segments, voice, canvas_height, base_time)
}

/// WASM-exposed: render a drawing to a WAV byte array.
#[wasm_bindgen]
pub fn render_drawing_wav(
    segments: JsValue,
    voice: &str,
    canvas_height: f64,
    sample_rate: u32,
) -> Result<Vec<u8>, JsValue> {
    SketchToneEngine::new().render_wav(segments, voice, canvas_height, sample_rate)
}

/// WASM-exposed: render a drawing to mono f32 samples.
/// Returns the raw audio buffer for AudioWorklet playback.
#[wasm_bindgen]
pub fn render_drawing_samples(
    segments: JsValue,
    voice: &str,
    canvas_height: f64,
    sample_rate: u32,
) -> Result<Vec<f32>, JsValue> {
    SketchToneEngine::new().render_samples(segments, voice, canvas_height, sample_rate)
}
