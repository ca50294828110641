//! Stroke segments and the recorder that captures them.
//!
//! The recorder is the only writer of the segment list. Playback never
//! borrows it: [`SegmentRecorder::snapshot`] hands out an immutable
//! [`Drawing`] that survives a later `clear()`.

use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::SessionSettings;

/// One straight-line increment of a drawn stroke.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub x: f64,
    pub y: f64,
    pub new_x: f64,
    pub new_y: f64,
    /// Stroke color, usually a `#rrggbb` hex string.
    pub color: String,
    #[serde(deserialize_with = "deserialize_line_width")]
    pub line_width: f64,
}

impl Segment {
    pub fn new(
        from: (f64, f64),
        to: (f64, f64),
        color: impl Into<String>,
        line_width: f64,
    ) -> Self {
        Segment {
            x: from.0,
            y: from.1,
            new_x: to.0,
            new_y: to.1,
            color: color.into(),
            line_width,
        }
    }

    /// Euclidean length in pixels.
    pub fn length(&self) -> f64 {
        let dx = self.new_x - self.x;
        let dy = self.new_y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Vertical midpoint in canvas pixels.
    pub fn mid_y(&self) -> f64 {
        (self.y + self.new_y) / 2.0
    }
}

/// Browser inputs hand the width over as a string ("5"), so accept both.
fn deserialize_line_width<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Width {
        Number(f64),
        Text(String),
    }

    match Width::deserialize(deserializer)? {
        Width::Number(n) => Ok(n),
        Width::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid lineWidth '{s}'"))),
    }
}

// ── Drawing (immutable snapshot) ────────────────────────────

/// An immutable, cheaply cloneable list of segments in recorded order.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawing {
    segments: Arc<[Segment]>,
}

impl Drawing {
    pub fn empty() -> Self {
        Drawing { segments: Arc::from(Vec::new()) }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl Deref for Drawing {
    type Target = [Segment];

    fn deref(&self) -> &[Segment] {
        &self.segments
    }
}

impl From<Vec<Segment>> for Drawing {
    fn from(segments: Vec<Segment>) -> Self {
        Drawing { segments: Arc::from(segments) }
    }
}

impl FromIterator<Segment> for Drawing {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Drawing { segments: iter.into_iter().collect() }
    }
}

// ── Recorder ────────────────────────────────────────────────

/// Turns pointer events into segments.
///
/// `begin_stroke` / `move_to` / `end_stroke` mirror pointer down / move /
/// up (or leave / cancel). Each `move_to` during an active stroke appends
/// one segment from the previous pointer position.
#[derive(Debug, Default)]
pub struct SegmentRecorder {
    segments: Vec<Segment>,
    /// Last pointer position while a stroke is active.
    pen: Option<(f64, f64)>,
}

impl SegmentRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_stroke(&mut self, x: f64, y: f64) {
        self.pen = Some((x, y));
    }

    /// Extend the active stroke to `(x, y)` using the current pen settings.
    /// Returns the recorded segment, or `None` if no stroke is active.
    pub fn move_to(&mut self, x: f64, y: f64, settings: &SessionSettings) -> Option<&Segment> {
        let from = self.pen?;
        self.segments.push(Segment::new(
            from,
            (x, y),
            settings.color.clone(),
            settings.line_width,
        ));
        self.pen = Some((x, y));
        self.segments.last()
    }

    pub fn end_stroke(&mut self) {
        self.pen = None;
    }

    pub fn is_drawing(&self) -> bool {
        self.pen.is_some()
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        tracing::info!("drawing cleared");
    }

    /// Copy the current segments into an immutable [`Drawing`].
    pub fn snapshot(&self) -> Drawing {
        Drawing::from(self.segments.clone())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pen(color: &str, width: f64) -> SessionSettings {
        SessionSettings {
            color: color.to_string(),
            line_width: width,
            ..SessionSettings::default()
        }
    }

    #[test]
    fn segment_geometry() {
        let s = Segment::new((0.0, 0.0), (3.0, 4.0), "#000000", 1.0);
        assert!((s.length() - 5.0).abs() < 1e-12);
        assert!((s.mid_y() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn zero_length_segment_is_valid() {
        let s = Segment::new((10.0, 10.0), (10.0, 10.0), "#000000", 1.0);
        assert_eq!(s.length(), 0.0);
    }

    #[test]
    fn parses_recorder_json() {
        let json = r##"{"x":1,"y":2,"newX":3,"newY":4,"color":"#ff0000","lineWidth":"7"}"##;
        let s: Segment = serde_json::from_str(json).unwrap();
        assert_eq!(s, Segment::new((1.0, 2.0), (3.0, 4.0), "#ff0000", 7.0));

        let numeric = r##"{"x":1,"y":2,"newX":3,"newY":4,"color":"#ff0000","lineWidth":7.5}"##;
        let s: Segment = serde_json::from_str(numeric).unwrap();
        assert_eq!(s.line_width, 7.5);
    }

    #[test]
    fn rejects_non_numeric_width() {
        let json = r##"{"x":1,"y":2,"newX":3,"newY":4,"color":"#ff0000","lineWidth":"wide"}"##;
        assert!(serde_json::from_str::<Segment>(json).is_err());
    }

    #[test]
    fn moves_outside_stroke_are_ignored() {
        let mut rec = SegmentRecorder::new();
        assert!(rec.move_to(5.0, 5.0, &pen("#000000", 2.0)).is_none());
        assert!(rec.is_empty());
    }

    #[test]
    fn records_consecutive_segments() {
        let mut rec = SegmentRecorder::new();
        rec.begin_stroke(0.0, 0.0);
        rec.move_to(10.0, 0.0, &pen("#ff0000", 2.0));
        rec.move_to(10.0, 10.0, &pen("#0000ff", 4.0));
        rec.end_stroke();
        rec.move_to(50.0, 50.0, &pen("#0000ff", 4.0));

        let drawing = rec.snapshot();
        assert_eq!(drawing.len(), 2);
        assert_eq!(drawing[0], Segment::new((0.0, 0.0), (10.0, 0.0), "#ff0000", 2.0));
        // Second segment starts where the first ended and picks up the new pen.
        assert_eq!(drawing[1], Segment::new((10.0, 0.0), (10.0, 10.0), "#0000ff", 4.0));
        assert!(!rec.is_drawing());
    }

    #[test]
    fn snapshot_survives_clear() {
        let mut rec = SegmentRecorder::new();
        rec.begin_stroke(0.0, 0.0);
        for i in 1..=3 {
            rec.move_to(i as f64, 0.0, &pen("#000000", 1.0));
        }
        let drawing = rec.snapshot();
        rec.clear();
        assert!(rec.is_empty());
        assert_eq!(drawing.len(), 3);
    }
}
