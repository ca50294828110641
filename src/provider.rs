//! Asynchronous piano sample loading.
//!
//! Loads are best-effort: a sample that cannot be fetched or decoded is
//! logged and left out of the table, and the piano voice keeps using its
//! synthesized fallback for pitches no sample covers.

use std::io::Cursor;

use crate::dsp::sampler::{SampleBuffer, SharedSampleTable, note_to_frequency};
use crate::error::SampleLoadError;

/// Notes the piano voice is tuned around, and the file names we expect.
pub const DEFAULT_PIANO_NOTES: [&str; 3] = ["C4", "G4", "A4"];

#[derive(Clone)]
pub struct SampleProvider {
    table: SharedSampleTable,
    client: reqwest::Client,
}

impl SampleProvider {
    pub fn new(table: SharedSampleTable) -> Self {
        SampleProvider {
            table,
            client: reqwest::Client::new(),
        }
    }

    pub fn table(&self) -> &SharedSampleTable {
        &self.table
    }

    /// Load `note_name` from `locator` into the table. Failures are logged
    /// and swallowed; returns whether the sample was stored.
    pub async fn load_sample(&self, locator: &str, note_name: &str) -> bool {
        match self.try_load_sample(locator, note_name).await {
            Ok(()) => {
                tracing::info!(note = note_name, locator, "sample loaded");
                true
            }
            Err(e) => {
                tracing::error!(note = note_name, locator, "{e}");
                false
            }
        }
    }

    /// Like [`load_sample`](Self::load_sample) but reports the error.
    pub async fn try_load_sample(&self, locator: &str, note_name: &str) -> Result<(), SampleLoadError> {
        let reference_frequency = note_to_frequency(note_name).ok_or_else(|| SampleLoadError::Decode {
            locator: locator.to_string(),
            note: note_name.to_string(),
            reason: format!("'{note_name}' is not a note name"),
        })?;

        let bytes = self.fetch(locator, note_name).await?;
        let buffer = decode_audio(&bytes, locator, note_name)?;
        self.table
            .write()
            .insert_with_frequency(note_name, reference_frequency, buffer);
        Ok(())
    }

    /// Fire-and-forget load on the current tokio runtime.
    pub fn spawn_load(&self, locator: impl Into<String>, note_name: impl Into<String>) -> tokio::task::JoinHandle<bool> {
        let provider = self.clone();
        let locator = locator.into();
        let note_name = note_name.into();
        tokio::spawn(async move { provider.load_sample(&locator, &note_name).await })
    }

    /// Load `piano_<note>.wav` for each of [`DEFAULT_PIANO_NOTES`] from
    /// `base` (a directory or URL prefix). Returns how many loaded.
    pub async fn load_default_piano(&self, base: &str) -> usize {
        let base = base.trim_end_matches('/');
        let mut loaded = 0;
        for note in DEFAULT_PIANO_NOTES {
            if self.load_sample(&format!("{base}/piano_{note}.wav"), note).await {
                loaded += 1;
            }
        }
        tracing::info!(loaded, attempted = DEFAULT_PIANO_NOTES.len(), "piano samples processed");
        loaded
    }

    async fn fetch(&self, locator: &str, note_name: &str) -> Result<Vec<u8>, SampleLoadError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            let fetch_err = |e: reqwest::Error| SampleLoadError::Fetch {
                locator: locator.to_string(),
                note: note_name.to_string(),
                reason: e.to_string(),
            };
            let response = self
                .client
                .get(locator)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(fetch_err)?;
            let bytes = response.bytes().await.map_err(fetch_err)?;
            Ok(bytes.to_vec())
        } else {
            tokio::fs::read(locator).await.map_err(|source| SampleLoadError::Io {
                locator: locator.to_string(),
                note: note_name.to_string(),
                source,
            })
        }
    }
}

/// Decode WAV (by RIFF/WAVE header) or MP3 bytes into a mono buffer.
pub fn decode_audio(bytes: &[u8], locator: &str, note_name: &str) -> Result<SampleBuffer, SampleLoadError> {
    let decode_err = |reason: String| SampleLoadError::Decode {
        locator: locator.to_string(),
        note: note_name.to_string(),
        reason,
    };

    let is_wav = bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE";
    let buffer = if is_wav {
        decode_wav(bytes).map_err(decode_err)?
    } else {
        decode_mp3(bytes).map_err(decode_err)?
    };

    if buffer.is_empty() {
        return Err(SampleLoadError::EmptyBuffer {
            locator: locator.to_string(),
            note: note_name.to_string(),
        });
    }
    Ok(buffer)
}

fn decode_wav(bytes: &[u8]) -> Result<SampleBuffer, String> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
    let spec = reader.spec();
    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(|v| v as f64))
            .collect::<Result<_, _>>()
            .map_err(|e| e.to_string())?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f64;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f64 / scale))
                .collect::<Result<_, _>>()
                .map_err(|e| e.to_string())?
        }
    };
    Ok(SampleBuffer::new(downmix(&interleaved, spec.channels as usize), spec.sample_rate))
}

fn decode_mp3(bytes: &[u8]) -> Result<SampleBuffer, String> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(bytes));
    let mut data = Vec::new();
    let mut sample_rate = 0;
    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = frame.sample_rate as u32;
                let pcm: Vec<f64> = frame.data.iter().map(|&s| s as f64 / 32768.0).collect();
                data.extend(downmix(&pcm, frame.channels));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(format!("{e:?}")),
        }
    }
    Ok(SampleBuffer::new(data, sample_rate))
}

/// Average interleaved channels down to mono.
fn downmix(interleaved: &[f64], channels: usize) -> Vec<f64> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f64>() / channels as f64)
        .collect()
}
