//! Playback scheduling — turns a drawing into committed note graphs.
//!
//! [`Scheduler`] does the per-segment work against a substrate it is
//! handed. [`Player`] wraps it with the session lifecycle and the two
//! user-facing notices (no audio, nothing to play).

use crate::config::PlaybackConfig;
use crate::dsp::sampler::SharedSampleTable;
use crate::dsp::substrate::{AudioSession, SynthesisSubstrate};
use crate::dsp::voice::{Voice, VoiceContext};
use crate::error::{ScheduleError, SketchToneError, SubstrateError};
use crate::mapper::{SynthesisParameters, map_segment};
use crate::segment::Drawing;

// ── Notices ─────────────────────────────────────────────────

/// Messages shown to the user as a blocking alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    AudioUnavailable,
    NothingToPlay,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::AudioUnavailable => "Audio playback is not supported or was blocked in this browser.",
            Notice::NothingToPlay => "Please draw something on the canvas first!",
        }
    }
}

pub trait Notifier {
    fn notify(&mut self, notice: Notice);
}

/// Collects notices instead of showing them.
impl Notifier for Vec<Notice> {
    fn notify(&mut self, notice: Notice) {
        self.push(notice);
    }
}

// ── Reports ─────────────────────────────────────────────────

/// A segment whose note could not be scheduled.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFailure {
    pub index: usize,
    pub voice: Voice,
    pub params: SynthesisParameters,
    pub error: ScheduleError,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    /// Notes committed to the substrate.
    pub scheduled: usize,
    /// Segments that were skipped, in segment order.
    pub failures: Vec<SegmentFailure>,
    /// Onset of the first segment.
    pub base_time: f64,
}

impl PlaybackReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackOutcome {
    NothingToPlay,
    Scheduled(PlaybackReport),
}

// ── Scheduler ───────────────────────────────────────────────

pub struct Scheduler {
    config: PlaybackConfig,
    samples: SharedSampleTable,
}

impl Scheduler {
    /// Build a scheduler without checking `config`. An invalid config (say a
    /// zero `gain_floor`) makes every segment fail; use
    /// [`try_new`](Self::try_new) for configs from outside the crate.
    pub fn new(config: PlaybackConfig, samples: SharedSampleTable) -> Self {
        Scheduler { config, samples }
    }

    pub fn try_new(config: PlaybackConfig, samples: SharedSampleTable) -> Result<Self, SketchToneError> {
        config.validate()?;
        Ok(Scheduler { config, samples })
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn samples(&self) -> &SharedSampleTable {
        &self.samples
    }

    /// Schedule every segment of `drawing` with `voice`, the first onset at
    /// `base_time` and the rest `time_step` apart.
    ///
    /// A segment that fails is logged and recorded in the report; the
    /// remaining segments are still scheduled. An empty drawing returns
    /// [`SketchToneError::EmptyPlaybackRequest`] without touching the
    /// substrate.
    pub fn schedule(
        &self,
        drawing: &Drawing,
        voice: Voice,
        canvas_height: f64,
        base_time: f64,
        substrate: &mut dyn SynthesisSubstrate,
    ) -> Result<PlaybackReport, SketchToneError> {
        if drawing.is_empty() {
            return Err(SketchToneError::EmptyPlaybackRequest);
        }

        // Loads that land after this point are heard on the next play.
        let samples = self.samples.read().clone();
        let ctx = VoiceContext { gain_floor: self.config.gain_floor, samples: &samples };

        let mut report = PlaybackReport { scheduled: 0, failures: Vec::new(), base_time };
        for (index, segment) in drawing.iter().enumerate() {
            let params = map_segment(segment, index, canvas_height, base_time, &self.config)
                .with_duration_scale(voice.duration_multiplier());

            match voice.render(&params, &segment.color, ctx, substrate) {
                Ok(()) => report.scheduled += 1,
                Err(error) => {
                    tracing::error!(
                        index,
                        voice = %voice,
                        frequency = params.frequency,
                        play_time = params.play_time,
                        volume = params.volume,
                        duration = params.note_duration,
                        "error scheduling note: {error}"
                    );
                    report.failures.push(SegmentFailure { index, voice, params, error });
                }
            }
        }

        tracing::info!(
            segments = drawing.len(),
            scheduled = report.scheduled,
            voice = %voice,
            "playback scheduled"
        );
        Ok(report)
    }
}

// ── Player ──────────────────────────────────────────────────

/// Session-level play action: brings the substrate up, then schedules.
pub struct Player<S, F>
where
    F: FnMut() -> Result<S, SubstrateError>,
{
    session: AudioSession<S, F>,
    scheduler: Scheduler,
}

impl<S, F> Player<S, F>
where
    S: SynthesisSubstrate,
    F: FnMut() -> Result<S, SubstrateError>,
{
    pub fn new(session: AudioSession<S, F>, scheduler: Scheduler) -> Self {
        Player { session, scheduler }
    }

    pub fn session(&self) -> &AudioSession<S, F> {
        &self.session
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Make sure the substrate exists and is running. Call this from the
    /// first pointer-down so audio is unlocked before play is pressed.
    pub fn prepare(&mut self, notifier: &mut dyn Notifier) -> Result<(), SketchToneError> {
        match self.session.ensure_ready() {
            Ok(_) => Ok(()),
            Err(e) => Err(audio_unavailable(e, notifier)),
        }
    }

    /// Play `drawing` with `voice`, starting `lead_in` seconds from now on
    /// the substrate clock.
    ///
    /// - No substrate: one [`Notice::AudioUnavailable`], then
    ///   `Err(SubstrateUnavailable)`; nothing is scheduled.
    /// - Empty drawing: one [`Notice::NothingToPlay`], then
    ///   `Ok(PlaybackOutcome::NothingToPlay)`.
    pub fn play(
        &mut self,
        drawing: Drawing,
        voice: Voice,
        canvas_height: f64,
        notifier: &mut dyn Notifier,
    ) -> Result<PlaybackOutcome, SketchToneError> {
        let substrate = match self.session.ensure_ready() {
            Ok(s) => s,
            Err(e) => return Err(audio_unavailable(e, notifier)),
        };

        let base_time = substrate.current_time() + self.scheduler.config.lead_in;
        match self.scheduler.schedule(&drawing, voice, canvas_height, base_time, substrate) {
            Ok(report) => Ok(PlaybackOutcome::Scheduled(report)),
            Err(SketchToneError::EmptyPlaybackRequest) => {
                notifier.notify(Notice::NothingToPlay);
                Ok(PlaybackOutcome::NothingToPlay)
            }
            Err(e) => Err(e),
        }
    }
}

fn audio_unavailable(e: SubstrateError, notifier: &mut dyn Notifier) -> SketchToneError {
    tracing::error!("error initializing audio: {e}");
    notifier.notify(Notice::AudioUnavailable);
    SketchToneError::SubstrateUnavailable(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::graph::{NoteGraph, Source};
    use crate::dsp::sampler::{SampleBuffer, SampleTable};
    use crate::dsp::substrate::{RecordingSubstrate, SubstrateState};
    use crate::segment::Segment;
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::fmt;
    use std::sync::Arc;
    use tracing::Level;
    use tracing::field::{Field, Visit};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Rejects the graphs whose onset matches one of `fail_at`.
    struct FaultySubstrate {
        inner: RecordingSubstrate,
        fail_at: Vec<f64>,
    }

    impl SynthesisSubstrate for FaultySubstrate {
        fn current_time(&self) -> f64 {
            self.inner.current_time()
        }

        fn state(&self) -> SubstrateState {
            self.inner.state()
        }

        fn resume(&mut self) -> Result<(), SubstrateError> {
            self.inner.resume()
        }

        fn schedule(&mut self, graph: NoteGraph) -> Result<(), SubstrateError> {
            if self.fail_at.iter().any(|t| (t - graph.start).abs() < 1e-9) {
                return Err(SubstrateError::Rejected("injected fault".to_string()));
            }
            self.inner.schedule(graph)
        }
    }

    /// Collects every event as (level, field name → value).
    #[derive(Clone, Default)]
    struct CapturedEvents(Arc<Mutex<Vec<(Level, BTreeMap<String, String>)>>>);

    struct FieldMap(BTreeMap<String, String>);

    impl Visit for FieldMap {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.insert(field.name().to_string(), format!("{value:?}"));
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for CapturedEvents {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut fields = FieldMap(BTreeMap::new());
            event.record(&mut fields);
            self.0.lock().push((*event.metadata().level(), fields.0));
        }
    }

    fn drawing(n: usize) -> Drawing {
        (0..n)
            .map(|i| {
                let x = i as f64 * 10.0;
                Segment::new((x, 100.0), (x + 10.0, 120.0), "#ff0000", 5.0)
            })
            .collect()
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(PlaybackConfig::default(), SampleTable::shared())
    }

    fn recording_player() -> Player<RecordingSubstrate, impl FnMut() -> Result<RecordingSubstrate, SubstrateError>> {
        Player::new(AudioSession::new(|| Ok(RecordingSubstrate::starting_at(5.0))), scheduler())
    }

    #[test]
    fn start_times_step_from_base_for_every_voice() {
        for voice in Voice::ALL {
            let mut substrate = RecordingSubstrate::new();
            let report = scheduler().schedule(&drawing(6), voice, 400.0, 1.0, &mut substrate).unwrap();
            assert_eq!(report.scheduled, 6);
            for (i, g) in substrate.graphs().iter().enumerate() {
                let expected = 1.0 + i as f64 * 0.08;
                assert!((g.start - expected).abs() < 1e-12, "{voice}: segment {i} at {}", g.start);
            }
        }
    }

    #[test]
    fn voice_multiplier_applied() {
        let seg = Segment::new((0.0, 200.0), (0.0, 200.0), "#000000", 5.0);
        let d = Drawing::from(vec![seg]);
        let mut substrate = RecordingSubstrate::new();
        scheduler().schedule(&d, Voice::Organ, 400.0, 0.0, &mut substrate).unwrap();
        let g = &substrate.graphs()[0];
        assert!((g.stop - g.start - 0.30).abs() < 1e-12);
    }

    #[test]
    fn try_new_rejects_invalid_config() {
        let config = PlaybackConfig { gain_floor: 0.0, ..PlaybackConfig::default() };
        let err = Scheduler::try_new(config, SampleTable::shared()).err().unwrap();
        assert!(matches!(err, SketchToneError::Config(_)));
        assert!(Scheduler::try_new(PlaybackConfig::default(), SampleTable::shared()).is_ok());
    }

    #[test]
    fn empty_drawing_is_an_empty_request() {
        let mut substrate = RecordingSubstrate::new();
        let err = scheduler()
            .schedule(&Drawing::empty(), Voice::Oscillator, 400.0, 0.0, &mut substrate)
            .unwrap_err();
        assert!(matches!(err, SketchToneError::EmptyPlaybackRequest));
    }

    #[test]
    fn failing_segment_does_not_stop_the_rest() {
        let base = 1.0;
        let third_onset = base + 2.0 * 0.08;
        let mut substrate = FaultySubstrate { inner: RecordingSubstrate::new(), fail_at: vec![third_onset] };

        let report = scheduler()
            .schedule(&drawing(5), Voice::Oscillator, 400.0, base, &mut substrate)
            .unwrap();

        assert_eq!(report.scheduled, 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 2);
        assert!(matches!(
            report.failures[0].error,
            ScheduleError::Substrate(SubstrateError::Rejected(_))
        ));

        let starts: Vec<f64> = substrate.inner.graphs().iter().map(|g| g.start).collect();
        let expected = [0, 1, 3, 4].map(|i| base + i as f64 * 0.08);
        assert_eq!(starts.len(), expected.len());
        for (s, e) in starts.iter().zip(expected) {
            assert!((s - e).abs() < 1e-12);
        }
    }

    #[test]
    fn failing_segment_logs_one_error_with_context() {
        let captured = CapturedEvents::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let base = 1.0;
        let mut substrate = FaultySubstrate { inner: RecordingSubstrate::new(), fail_at: vec![base + 2.0 * 0.08] };

        tracing::subscriber::with_default(subscriber, || {
            scheduler()
                .schedule(&drawing(5), Voice::Oscillator, 400.0, base, &mut substrate)
                .unwrap();
        });

        let events = captured.0.lock();
        let errors: Vec<_> = events.iter().filter(|(level, _)| *level == Level::ERROR).collect();
        assert_eq!(errors.len(), 1, "{events:?}");
        let fields = &errors[0].1;
        assert_eq!(fields["index"], "2");
        assert_eq!(fields["voice"], "oscillator");
        for key in ["frequency", "play_time", "volume", "duration", "message"] {
            assert!(fields.contains_key(key), "missing {key}: {fields:?}");
        }
        let play_time: f64 = fields["play_time"].parse().unwrap();
        assert!((play_time - (base + 0.16)).abs() < 1e-9);
    }

    #[test]
    fn invalid_segment_is_isolated() {
        let mut segs: Vec<Segment> = drawing(3).to_vec();
        segs[1].y = f64::NAN;
        segs[1].new_y = f64::NAN;
        let mut substrate = RecordingSubstrate::new();
        let report = scheduler()
            .schedule(&Drawing::from(segs), Voice::MusicBox, 400.0, 0.0, &mut substrate)
            .unwrap();
        assert_eq!(report.scheduled, 2);
        assert_eq!(report.failures[0].index, 1);
        assert!(!report.is_complete());
    }

    #[test]
    fn piano_picks_up_samples_loaded_between_plays() {
        let sched = scheduler();
        let d = drawing(1);

        let mut first = RecordingSubstrate::new();
        sched.schedule(&d, Voice::Piano, 400.0, 0.0, &mut first).unwrap();
        assert!(matches!(first.graphs()[0].partials[0].source, Source::Oscillator { .. }));

        sched.samples().write().insert("A4", SampleBuffer::new(vec![0.2; 128], 44100));

        let mut second = RecordingSubstrate::new();
        sched.schedule(&d, Voice::Piano, 400.0, 0.0, &mut second).unwrap();
        assert!(matches!(second.graphs()[0].partials[0].source, Source::Buffer { .. }));
    }

    #[test]
    fn play_empty_notifies_once() {
        let mut player = recording_player();
        let mut notices: Vec<Notice> = Vec::new();
        let outcome = player.play(Drawing::empty(), Voice::Oscillator, 400.0, &mut notices).unwrap();
        assert_eq!(outcome, PlaybackOutcome::NothingToPlay);
        assert_eq!(notices, vec![Notice::NothingToPlay]);
        assert!(player.session().substrate().unwrap().graphs().is_empty());
    }

    #[test]
    fn play_uses_substrate_clock_plus_lead_in() {
        let mut player = recording_player();
        let mut notices: Vec<Notice> = Vec::new();
        let outcome = player.play(drawing(3), Voice::Piano, 400.0, &mut notices).unwrap();
        let PlaybackOutcome::Scheduled(report) = outcome else {
            panic!("expected a scheduled playback");
        };
        assert!((report.base_time - 5.1).abs() < 1e-12);
        assert_eq!(report.scheduled, 3);
        assert!(notices.is_empty());
        let graphs = player.session().substrate().unwrap().graphs();
        assert!((graphs[2].start - (5.1 + 0.16)).abs() < 1e-12);
    }

    #[test]
    fn play_without_audio_fails_fast() {
        let mut attempts = 0;
        let mut player = Player::new(
            AudioSession::new(|| -> Result<RecordingSubstrate, SubstrateError> {
                attempts += 1;
                Err(SubstrateError::Unsupported("no AudioContext".to_string()))
            }),
            scheduler(),
        );
        let mut notices: Vec<Notice> = Vec::new();
        let err = player.play(drawing(4), Voice::Organ, 400.0, &mut notices).unwrap_err();
        assert!(matches!(err, SketchToneError::SubstrateUnavailable(SubstrateError::Unsupported(_))));
        assert_eq!(notices, vec![Notice::AudioUnavailable]);
        assert!(!player.session().is_initialized());
        drop(player);
        assert_eq!(attempts, 1);
    }

    #[test]
    fn prepare_unlocks_suspended_audio() {
        let mut player = Player::new(AudioSession::new(|| Ok(RecordingSubstrate::suspended())), scheduler());
        let mut notices: Vec<Notice> = Vec::new();
        player.prepare(&mut notices).unwrap();
        assert_eq!(player.session().substrate().unwrap().state(), SubstrateState::Running);
        assert!(notices.is_empty());
    }

    #[test]
    fn snapshot_is_independent_of_recorder() {
        use crate::config::SessionSettings;
        use crate::segment::SegmentRecorder;

        let mut rec = SegmentRecorder::new();
        let pen = SessionSettings::default();
        rec.begin_stroke(0.0, 0.0);
        rec.move_to(10.0, 10.0, &pen);
        rec.move_to(20.0, 20.0, &pen);
        let snapshot = rec.snapshot();
        rec.clear();

        let mut player = recording_player();
        let mut notices: Vec<Notice> = Vec::new();
        let outcome = player.play(snapshot, Voice::Oscillator, 400.0, &mut notices).unwrap();
        assert!(matches!(outcome, PlaybackOutcome::Scheduled(PlaybackReport { scheduled: 2, .. })));
    }
}
