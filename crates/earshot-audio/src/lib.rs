//! Encoded audio accessors for earshot.
//!
//! Transcription providers never look at raw samples. They ask an
//! [`AudioSource`] for a payload in the encoding their backend accepts, e.g.
//! "FLAC at 16 kHz" or "WAV at the native rate".

mod pcm;

pub use pcm::PcmAudio;
use thiserror::Error;

/// Errors that can occur while producing encoded audio.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("FLAC encoding failed: {0}")]
    Flac(String),

    #[error("Unsupported audio layout: {0}")]
    Unsupported(String),
}

/// Result type for audio operations.
pub type Result<T> = std::result::Result<T, AudioError>;

/// Captured audio, exposed only through encoding accessors.
pub trait AudioSource: Send + Sync {
    /// Native sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Audio as a 16-bit PCM WAV file, optionally resampled to `convert_rate`.
    fn wav_data(&self, convert_rate: Option<u32>) -> Result<Vec<u8>>;

    /// Audio as a FLAC stream, optionally resampled to `convert_rate`.
    fn flac_data(&self, convert_rate: Option<u32>) -> Result<Vec<u8>>;
}
