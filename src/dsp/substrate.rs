//! The synthesis substrate seam and the session that owns it.
//!
//! A substrate is whatever actually makes sound from [`NoteGraph`]s: a
//! browser `AudioContext` driven from JS, the offline renderer in
//! [`super::engine`], or the [`RecordingSubstrate`] used to hand graphs
//! across the WASM boundary.

use crate::error::SubstrateError;

use super::graph::NoteGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubstrateState {
    Running,
    /// Created but not yet allowed to play (autoplay policy).
    Suspended,
    Closed,
}

pub trait SynthesisSubstrate {
    /// Current time on the substrate's own clock, in seconds.
    fn current_time(&self) -> f64;

    fn state(&self) -> SubstrateState;

    fn resume(&mut self) -> Result<(), SubstrateError>;

    /// Commit a note graph to the substrate timeline. Once accepted the
    /// graph cannot be retracted.
    fn schedule(&mut self, graph: NoteGraph) -> Result<(), SubstrateError>;
}

// ── Audio Session ───────────────────────────────────────────

/// Owns the session's one substrate. It is created lazily on the first
/// [`ensure_ready`](Self::ensure_ready) call (which must come from a user
/// gesture), resumed when suspended, and recreated only if it was closed.
pub struct AudioSession<S, F>
where
    F: FnMut() -> Result<S, SubstrateError>,
{
    factory: F,
    substrate: Option<S>,
}

impl<S, F> AudioSession<S, F>
where
    S: SynthesisSubstrate,
    F: FnMut() -> Result<S, SubstrateError>,
{
    pub fn new(factory: F) -> Self {
        AudioSession { factory, substrate: None }
    }

    /// Create or resume the substrate so it can accept graphs.
    pub fn ensure_ready(&mut self) -> Result<&mut S, SubstrateError> {
        let needs_create = self
            .substrate
            .as_ref()
            .is_none_or(|s| s.state() == SubstrateState::Closed);
        if needs_create {
            let created = (self.factory)()?;
            tracing::info!("audio substrate created");
            self.substrate = Some(created);
        }

        let Some(substrate) = self.substrate.as_mut() else {
            return Err(SubstrateError::Closed);
        };
        if substrate.state() == SubstrateState::Suspended {
            substrate.resume()?;
            tracing::debug!("audio substrate resumed");
        }
        Ok(substrate)
    }

    pub fn substrate(&self) -> Option<&S> {
        self.substrate.as_ref()
    }

    pub fn substrate_mut(&mut self) -> Option<&mut S> {
        self.substrate.as_mut()
    }

    pub fn is_initialized(&self) -> bool {
        self.substrate.is_some()
    }
}

// ── Recording Substrate ─────────────────────────────────────

/// Keeps every accepted graph in schedule order. The WASM bindings use it
/// to hand graphs to a browser host, and tests use it to inspect what was
/// scheduled.
#[derive(Debug, Clone)]
pub struct RecordingSubstrate {
    clock: f64,
    state: SubstrateState,
    graphs: Vec<NoteGraph>,
}

impl RecordingSubstrate {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(clock: f64) -> Self {
        RecordingSubstrate {
            clock,
            state: SubstrateState::Running,
            graphs: Vec::new(),
        }
    }

    pub fn suspended() -> Self {
        RecordingSubstrate {
            state: SubstrateState::Suspended,
            ..Self::new()
        }
    }

    pub fn advance(&mut self, seconds: f64) {
        self.clock += seconds;
    }

    pub fn close(&mut self) {
        self.state = SubstrateState::Closed;
    }

    pub fn graphs(&self) -> &[NoteGraph] {
        &self.graphs
    }

    pub fn into_graphs(self) -> Vec<NoteGraph> {
        self.graphs
    }
}

impl Default for RecordingSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

impl SynthesisSubstrate for RecordingSubstrate {
    fn current_time(&self) -> f64 {
        self.clock
    }

    fn state(&self) -> SubstrateState {
        self.state
    }

    fn resume(&mut self) -> Result<(), SubstrateError> {
        match self.state {
            SubstrateState::Closed => Err(SubstrateError::Closed),
            _ => {
                self.state = SubstrateState::Running;
                Ok(())
            }
        }
    }

    fn schedule(&mut self, graph: NoteGraph) -> Result<(), SubstrateError> {
        if self.state == SubstrateState::Closed {
            return Err(SubstrateError::Closed);
        }
        self.graphs.push(graph);
        Ok(())
    }
}
