//! Playback tuning constants and the user-selected session settings.

use serde::{Deserialize, Serialize};

use crate::dsp::voice::Voice;
use crate::error::SketchToneError;

// ── Playback Config ─────────────────────────────────────────

/// Constants used by the parameter mapper and the scheduler.
///
/// Every field has a default, so a partial JSON object (or `{}`) is a
/// valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaybackConfig {
    /// Pitch at the bottom of the canvas, in Hz.
    pub min_freq: f64,
    /// Pitch at the top of the canvas, in Hz.
    pub max_freq: f64,
    /// Note length of a zero-length segment, in seconds.
    pub base_duration: f64,
    /// Seconds added per `length_unit` pixels of segment length.
    pub duration_per_length: f64,
    /// Pixel length that adds `duration_per_length` seconds.
    pub length_unit: f64,
    /// Spacing between consecutive segment onsets, in seconds.
    pub time_step: f64,
    /// Volume of a zero-width stroke.
    pub volume_floor: f64,
    /// Line width that reaches full volume.
    pub max_line_width: f64,
    /// Delay between the substrate clock and the first note, in seconds.
    pub lead_in: f64,
    /// Target of exponential decays. Exponential ramps cannot reach 0.
    pub gain_floor: f64,
    /// Longest audio the offline renderer will produce, in seconds.
    pub max_render_seconds: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        PlaybackConfig {
            min_freq: 100.0,
            max_freq: 1200.0,
            base_duration: 0.20,
            duration_per_length: 0.15,
            length_unit: 150.0,
            time_step: 0.08,
            volume_floor: 0.15,
            max_line_width: 20.0,
            lead_in: 0.1,
            gain_floor: 0.001,
            max_render_seconds: 600.0,
        }
    }
}

impl PlaybackConfig {
    /// Parse a config from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self, SketchToneError> {
        let config: PlaybackConfig =
            serde_json::from_str(json).map_err(|e| SketchToneError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SketchToneError> {
        let fields = [
            ("minFreq", self.min_freq),
            ("maxFreq", self.max_freq),
            ("baseDuration", self.base_duration),
            ("durationPerLength", self.duration_per_length),
            ("lengthUnit", self.length_unit),
            ("timeStep", self.time_step),
            ("volumeFloor", self.volume_floor),
            ("maxLineWidth", self.max_line_width),
            ("leadIn", self.lead_in),
            ("gainFloor", self.gain_floor),
            ("maxRenderSeconds", self.max_render_seconds),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SketchToneError::Config(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.min_freq <= 0.0 || self.min_freq >= self.max_freq {
            return Err(SketchToneError::Config(format!(
                "frequency range [{}, {}] is empty or non-positive",
                self.min_freq, self.max_freq
            )));
        }
        if self.base_duration <= 0.0 {
            return Err(SketchToneError::Config("baseDuration must be > 0".to_string()));
        }
        if self.time_step <= 0.0 {
            return Err(SketchToneError::Config("timeStep must be > 0".to_string()));
        }
        if self.max_render_seconds <= 0.0 {
            return Err(SketchToneError::Config("maxRenderSeconds must be > 0".to_string()));
        }
        if self.length_unit == 0.0 || self.max_line_width == 0.0 {
            return Err(SketchToneError::Config(
                "lengthUnit and maxLineWidth must be > 0".to_string(),
            ));
        }
        if self.gain_floor == 0.0 || self.gain_floor >= 1.0 {
            return Err(SketchToneError::Config(
                "gainFloor must be in (0, 1)".to_string(),
            ));
        }
        if self.volume_floor > 1.0 {
            return Err(SketchToneError::Config("volumeFloor must be <= 1".to_string()));
        }
        Ok(())
    }
}

// ── Session Settings ────────────────────────────────────────

/// What the user has currently picked in the UI. Read at the moment of use;
/// the recorder stamps `color`/`line_width` on each new segment and the
/// scheduler reads `voice` when play is pressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionSettings {
    pub voice: Voice,
    pub color: String,
    pub line_width: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            voice: Voice::Oscillator,
            color: "#000000".to_string(),
            line_width: 5.0,
        }
    }
}

// ── Canvas ──────────────────────────────────────────────────

/// Drawing surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const MAX_WIDTH: f64 = 600.0;
    pub const MAX_HEIGHT: f64 = 400.0;

    pub fn new(width: f64, height: f64) -> Self {
        CanvasSize { width, height }
    }

    /// Size the canvas to a viewport: 20px margin each side, at most half
    /// the viewport tall, capped at 600x400.
    pub fn fit(viewport_width: f64, viewport_height: f64) -> Self {
        CanvasSize {
            width: (viewport_width - 40.0).min(Self::MAX_WIDTH),
            height: (viewport_height / 2.0).min(Self::MAX_HEIGHT),
        }
    }
}

impl Default for CanvasSize {
    fn default() -> Self {
        CanvasSize::new(Self::MAX_WIDTH, Self::MAX_HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(PlaybackConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PlaybackConfig::from_json(r#"{"timeStep": 0.05}"#).unwrap();
        assert_eq!(config.time_step, 0.05);
        assert_eq!(config.min_freq, 100.0);
        assert_eq!(config.max_freq, 1200.0);
    }

    #[test]
    fn inverted_range_rejected() {
        let err = PlaybackConfig::from_json(r#"{"minFreq": 2000}"#).unwrap_err();
        assert!(matches!(err, SketchToneError::Config(_)));
    }

    #[test]
    fn negative_field_rejected() {
        let config = PlaybackConfig { time_step: -0.1, ..PlaybackConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_time_step_rejected() {
        let err = PlaybackConfig::from_json(r#"{"timeStep": 0}"#).unwrap_err();
        assert!(matches!(err, SketchToneError::Config(msg) if msg.contains("timeStep")));
    }

    #[test]
    fn zero_render_cap_rejected() {
        let config = PlaybackConfig { max_render_seconds: 0.0, ..PlaybackConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_json_is_config_error() {
        assert!(matches!(
            PlaybackConfig::from_json("{"),
            Err(SketchToneError::Config(_))
        ));
    }

    #[test]
    fn session_settings_parse_voice_names() {
        let s: SessionSettings =
            serde_json::from_str(r##"{"voice": "musicBox", "color": "#ff0000"}"##).unwrap();
        assert_eq!(s.voice, Voice::MusicBox);
        assert_eq!(s.color, "#ff0000");
        assert_eq!(s.line_width, 5.0);
    }

    #[test]
    fn canvas_fits_viewport() {
        assert_eq!(CanvasSize::fit(1920.0, 1080.0), CanvasSize::new(600.0, 400.0));
        assert_eq!(CanvasSize::fit(400.0, 600.0), CanvasSize::new(360.0, 300.0));
    }
}
