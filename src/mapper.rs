//! Segment → synthesis parameter mapping.
//!
//! Pure and deterministic: the same segment, index, canvas and base time
//! always produce the same parameters.

use serde::{Deserialize, Serialize};

use crate::config::PlaybackConfig;
use crate::segment::Segment;

/// Sound parameters derived from one segment at playback time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisParameters {
    /// Hz, within `[min_freq, max_freq]`.
    pub frequency: f64,
    /// Peak gain in `[0, 1]`.
    pub volume: f64,
    /// Seconds, before any voice multiplier.
    pub note_duration: f64,
    /// Absolute substrate time of the note onset.
    pub play_time: f64,
}

impl SynthesisParameters {
    /// Same parameters with the duration scaled by a voice multiplier.
    pub fn with_duration_scale(self, factor: f64) -> Self {
        SynthesisParameters {
            note_duration: self.note_duration * factor,
            ..self
        }
    }
}

/// Higher on the canvas (smaller y) means higher pitch.
pub fn frequency_for(mid_y: f64, canvas_height: f64, config: &PlaybackConfig) -> f64 {
    let height = if canvas_height > 0.0 { canvas_height } else { 1.0 };
    let normalized_y = 1.0 - mid_y / height;
    let f = config.min_freq + normalized_y * (config.max_freq - config.min_freq);
    f.clamp(config.min_freq, config.max_freq)
}

/// Thicker strokes are louder, with a floor so hairlines stay audible.
pub fn volume_for(line_width: f64, config: &PlaybackConfig) -> f64 {
    let v = config.volume_floor + (line_width / config.max_line_width) * (1.0 - config.volume_floor);
    v.clamp(0.0, 1.0)
}

pub fn duration_for(length: f64, config: &PlaybackConfig) -> f64 {
    config.base_duration + (length / config.length_unit) * config.duration_per_length
}

/// Onset of the `index`-th segment. Spacing is fixed; how fast the user drew
/// doesn't matter.
pub fn start_time_for(index: usize, schedule_base: f64, config: &PlaybackConfig) -> f64 {
    schedule_base + index as f64 * config.time_step
}

/// Map one segment to its synthesis parameters.
pub fn map_segment(
    segment: &Segment,
    index: usize,
    canvas_height: f64,
    schedule_base: f64,
    config: &PlaybackConfig,
) -> SynthesisParameters {
    SynthesisParameters {
        frequency: frequency_for(segment.mid_y(), canvas_height, config),
        volume: volume_for(segment.line_width, config),
        note_duration: duration_for(segment.length(), config),
        play_time: start_time_for(index, schedule_base, config),
    }
}
