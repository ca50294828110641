//! WAV renderer — plays a drawing through the offline substrate.

use crate::dsp::voice::Voice;
use crate::error::SketchToneError;
use crate::scheduler::{PlaybackReport, Scheduler};
use crate::segment::Drawing;

use super::engine::OfflineSubstrate;
use super::substrate::SynthesisSubstrate;

/// Schedule `drawing` on a fresh offline substrate and return it ready to
/// render, with the scheduling report.
///
/// Fails with [`SketchToneError::Config`] when the result would run longer
/// than `max_render_seconds`.
pub fn render_drawing(
    scheduler: &Scheduler,
    drawing: &Drawing,
    voice: Voice,
    canvas_height: f64,
    sample_rate: u32,
) -> Result<(OfflineSubstrate, PlaybackReport), SketchToneError> {
    let mut engine = OfflineSubstrate::new(sample_rate as f64);
    let base_time = engine.current_time() + scheduler.config().lead_in;
    let report = scheduler.schedule(drawing, voice, canvas_height, base_time, &mut engine)?;

    let limit = scheduler.config().max_render_seconds;
    if engine.duration() > limit {
        return Err(SketchToneError::Config(format!(
            "render would last {:.1}s, longer than maxRenderSeconds ({limit}s)",
            engine.duration()
        )));
    }
    Ok((engine, report))
}

/// Render a drawing to a WAV file as bytes (16-bit stereo PCM).
pub fn render_wav(
    scheduler: &Scheduler,
    drawing: &Drawing,
    voice: Voice,
    canvas_height: f64,
    sample_rate: u32,
) -> Result<Vec<u8>, SketchToneError> {
    let (engine, _) = render_drawing(scheduler, drawing, voice, canvas_height, sample_rate)?;
    Ok(encode_wav(&engine.render_pcm_i16(), sample_rate, 2))
}

/// Encode interleaved i16 PCM samples to a WAV byte buffer.
fn encode_wav(samples: &[i16], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample as u32 / 8);
    let block_align = channels * (bits_per_sample / 8);
    let data_size = (samples.len() * 2) as u32;
    let file_size = 36 + data_size;

    let mut buf = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&file_size.to_le_bytes());
    buf.extend_from_slice(b"WAVE");

    // fmt chunk
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&channels.to_le_bytes());
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&byte_rate.to_le_bytes());
    buf.extend_from_slice(&block_align.to_le_bytes());
    buf.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    for &sample in samples {
        buf.extend_from_slice(&sample.to_le_bytes());
    }

    buf
}
