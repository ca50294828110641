use std::fmt;

#[derive(Debug)]
pub enum SketchToneError {
    SubstrateUnavailable(SubstrateError),
    EmptyPlaybackRequest,
    Schedule(ScheduleError),
    SampleLoad(SampleLoadError),
    Config(String),
}

/// Failures raised by the synthesis substrate itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SubstrateError {
    /// The platform has no audio backend we can drive.
    Unsupported(String),
    /// The backend exists but refused to start or resume (autoplay policy etc).
    Blocked(String),
    /// A node graph was handed over and the backend refused it.
    Rejected(String),
    Closed,
}

/// A single segment's note graph could not be scheduled.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleError {
    Substrate(SubstrateError),
    InvalidParameter { name: &'static str, value: f64 },
}

#[derive(Debug)]
pub enum SampleLoadError {
    Fetch { locator: String, note: String, reason: String },
    Io { locator: String, note: String, source: std::io::Error },
    Decode { locator: String, note: String, reason: String },
    EmptyBuffer { locator: String, note: String },
}

impl fmt::Display for SketchToneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SketchToneError::SubstrateUnavailable(e) => write!(f, "Audio unavailable: {e}"),
            SketchToneError::EmptyPlaybackRequest => write!(f, "Nothing to play: the drawing is empty"),
            SketchToneError::Schedule(e) => write!(f, "Schedule error: {e}"),
            SketchToneError::SampleLoad(e) => write!(f, "Sample load error: {e}"),
            SketchToneError::Config(msg) => write!(f, "Config error: {msg}"),
        }
    }
}

impl std::error::Error for SketchToneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SketchToneError::SubstrateUnavailable(e) => Some(e),
            SketchToneError::Schedule(e) => Some(e),
            SketchToneError::SampleLoad(e) => Some(e),
            SketchToneError::EmptyPlaybackRequest | SketchToneError::Config(_) => None,
        }
    }
}

impl fmt::Display for SubstrateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstrateError::Unsupported(why) => write!(f, "audio backend unsupported ({why})"),
            SubstrateError::Blocked(why) => write!(f, "audio backend blocked ({why})"),
            SubstrateError::Rejected(why) => write!(f, "node graph rejected ({why})"),
            SubstrateError::Closed => write!(f, "audio backend is closed"),
        }
    }
}

impl std::error::Error for SubstrateError {}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleError::Substrate(e) => write!(f, "{e}"),
            ScheduleError::InvalidParameter { name, value } => {
                write!(f, "invalid {name} '{value}'")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

impl fmt::Display for SampleLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleLoadError::Fetch { locator, note, reason } => {
                write!(f, "could not fetch sample {note} from {locator}: {reason}")
            }
            SampleLoadError::Io { locator, note, source } => {
                write!(f, "could not read sample {note} from {locator}: {source}")
            }
            SampleLoadError::Decode { locator, note, reason } => {
                write!(f, "could not decode sample {note} from {locator}: {reason}")
            }
            SampleLoadError::EmptyBuffer { locator, note } => {
                write!(f, "sample {note} from {locator} decoded to zero frames")
            }
        }
    }
}

impl std::error::Error for SampleLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SampleLoadError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<SubstrateError> for ScheduleError {
    fn from(e: SubstrateError) -> Self {
        ScheduleError::Substrate(e)
    }
}

impl From<ScheduleError> for SketchToneError {
    fn from(e: ScheduleError) -> Self {
        SketchToneError::Schedule(e)
    }
}

impl From<SampleLoadError> for SketchToneError {
    fn from(e: SampleLoadError) -> Self {
        SketchToneError::SampleLoad(e)
    }
}
