//! In-memory 16-bit PCM audio.

use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::path::Path;
use std::time::Duration;

use flacenc::component::BitRepr;
use flacenc::error::Verify;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::{AudioError, AudioSource, Result};

const BITS_PER_SAMPLE: u16 = 16;

/// Interleaved 16-bit samples with their layout.
#[derive(Debug, Clone)]
pub struct PcmAudio {
    samples: Vec<i16>,
    sample_rate: u32,
    channels: u16,
}

impl PcmAudio {
    /// Wrap interleaved samples.
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::Unsupported(format!(
                "{channels} channel(s) at {sample_rate} Hz"
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Decode a WAV file held in memory.
    pub fn from_wav_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(WavReader::new(Cursor::new(bytes))?)
    }

    /// Decode a WAV file from disk.
    pub fn from_wav_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(WavReader::open(path)?)
    }

    fn from_reader<R: Read>(reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        let samples = match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Int, bits) if bits <= 16 => {
                reader.into_samples::<i16>().collect::<std::result::Result<Vec<_>, _>>()?
            }
            (SampleFormat::Int, bits) if bits <= 32 => reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| (v >> (bits - 16)) as i16))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            (SampleFormat::Float, 32) => reader
                .into_samples::<f32>()
                .map(|s| s.map(|v| (v.clamp(-1.0, 1.0) * i16::MAX as f32) as i16))
                .collect::<std::result::Result<Vec<_>, _>>()?,
            (format, bits) => {
                return Err(AudioError::Unsupported(format!(
                    "{bits}-bit {format:?} samples"
                )));
            }
        };

        Self::new(samples, spec.sample_rate, spec.channels)
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    /// Length of the recording.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() / self.channels as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    fn at_rate(&self, convert_rate: Option<u32>) -> Result<(Cow<'_, [i16]>, u32)> {
        match convert_rate {
            Some(0) => Err(AudioError::Unsupported("conversion to 0 Hz".to_string())),
            Some(rate) if rate != self.sample_rate => Ok((
                Cow::Owned(resample(&self.samples, self.channels, self.sample_rate, rate)),
                rate,
            )),
            _ => Ok((Cow::Borrowed(&self.samples), self.sample_rate)),
        }
    }
}

impl AudioSource for PcmAudio {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn wav_data(&self, convert_rate: Option<u32>) -> Result<Vec<u8>> {
        let (samples, sample_rate) = self.at_rate(convert_rate)?;
        let spec = WavSpec {
            channels: self.channels,
            sample_rate,
            bits_per_sample: BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for sample in samples.iter() {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;

        Ok(cursor.into_inner())
    }

    fn flac_data(&self, convert_rate: Option<u32>) -> Result<Vec<u8>> {
        let (samples, sample_rate) = self.at_rate(convert_rate)?;
        if samples.is_empty() {
            return Err(AudioError::Unsupported("empty recording".to_string()));
        }

        let widened: Vec<i32> = samples.iter().map(|&s| i32::from(s)).collect();
        let config = flacenc::config::Encoder::default()
            .into_verified()
            .map_err(|(_, e)| AudioError::Flac(format!("{e:?}")))?;
        let source = flacenc::source::MemSource::from_samples(
            &widened,
            self.channels as usize,
            BITS_PER_SAMPLE as usize,
            sample_rate as usize,
        );
        let stream = flacenc::encode_with_fixed_block_size(&config, source, config.block_size)
            .map_err(|e| AudioError::Flac(format!("{e:?}")))?;

        let mut sink = flacenc::bitsink::ByteSink::new();
        stream
            .write(&mut sink)
            .map_err(|_| AudioError::Flac("failed to serialize stream".to_string()))?;

        debug!(
            sample_rate,
            channels = self.channels,
            flac_bytes = sink.as_slice().len(),
            "Encoded FLAC payload"
        );
        Ok(sink.as_slice().to_vec())
    }
}

/// Linear-interpolation resampler over interleaved frames.
fn resample(samples: &[i16], channels: u16, from: u32, to: u32) -> Vec<i16> {
    let channels = channels as usize;
    let frames = samples.len() / channels;
    if frames == 0 || from == to {
        return samples.to_vec();
    }

    let out_frames = ((frames as u64 * to as u64) / from as u64).max(1) as usize;
    let step = from as f64 / to as f64;
    let mut out = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let position = i as f64 * step;
        let index = (position.floor() as usize).min(frames - 1);
        let next = (index + 1).min(frames - 1);
        let fraction = position - index as f64;
        for c in 0..channels {
            let a = samples[index * channels + c] as f64;
            let b = samples[next * channels + c] as f64;
            out.push((a + (b - a) * fraction).round() as i16);
        }
    }

    out
}
