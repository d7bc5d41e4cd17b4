/// Recordings read from disk
///
/// WAV files are decoded and re-emitted as raw little-endian PCM; anything
/// else is assumed to already be raw PCM and is passed through unchanged.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use hound::{SampleFormat, WavReader};
use tracing::{debug, warn};

use crate::assessment::{AssessmentError, AssessmentResult};
use crate::pipeline::providers::AudioSource;

/// Sample rate the service expects
pub const EXPECTED_SAMPLE_RATE: u32 = 16_000;

/// Audio source backed by a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAudioSource {
    path: PathBuf,
}

impl FileAudioSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the file
    ///
    /// # Errors
    /// Returns `AssessmentError::InvalidInput` when the file is missing, empty,
    /// unreadable, or a WAV file that is not mono 16-bit PCM
    pub async fn read(&self) -> AssessmentResult<Vec<u8>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AssessmentError::InvalidInput(format!(
                    "audio file not found: {}",
                    self.path.display()
                ))
            } else {
                AssessmentError::InvalidInput(format!(
                    "cannot read audio file {}: {}",
                    self.path.display(),
                    e
                ))
            }
        })?;

        if bytes.is_empty() {
            return Err(AssessmentError::InvalidInput(format!(
                "audio file is empty: {}",
                self.path.display()
            )));
        }

        debug!(path = %self.path.display(), "Read {} bytes of audio", bytes.len());
        decode_audio(bytes)
    }
}

#[async_trait]
impl AudioSource for FileAudioSource {
    async fn capture(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.read().await?)
    }
}

/// Check for a RIFF/WAVE header
pub fn is_wav(bytes: &[u8]) -> bool {
    bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE"
}

/// Convert file contents to raw PCM
///
/// # Errors
/// Returns `AssessmentError::InvalidInput` for malformed WAV data, unsupported
/// sample layouts, or a WAV file without samples
pub fn decode_audio(bytes: Vec<u8>) -> AssessmentResult<Vec<u8>> {
    if !is_wav(&bytes) {
        return Ok(bytes);
    }

    let reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| AssessmentError::InvalidInput(format!("invalid WAV file: {}", e)))?;
    let spec = reader.spec();

    if spec.channels != 1 || spec.bits_per_sample != 16 || spec.sample_format != SampleFormat::Int
    {
        return Err(AssessmentError::InvalidInput(format!(
            "expected mono 16-bit PCM WAV, got {} ch / {} bits / {:?}",
            spec.channels, spec.bits_per_sample, spec.sample_format
        )));
    }

    if spec.sample_rate != EXPECTED_SAMPLE_RATE {
        warn!(
            "WAV sample rate is {} Hz, service expects {} Hz",
            spec.sample_rate, EXPECTED_SAMPLE_RATE
        );
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<i16>, _>>()
        .map_err(|e| AssessmentError::InvalidInput(format!("corrupt WAV samples: {}", e)))?;

    if samples.is_empty() {
        return Err(AssessmentError::InvalidInput(
            "WAV file contains no samples".to_string(),
        ));
    }

    debug!("Decoded {} samples from WAV", samples.len());
    Ok(samples.iter().flat_map(|s| s.to_le_bytes()).collect())
}
