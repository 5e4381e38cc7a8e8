//! Audio utilities for `shopvox`.
//!
//! Decodes uploaded audio (any container symphonia can probe), mixes it down
//! to mono and resamples it to the rate the speech encoder expects.

use anyhow::{Context, Result};
use rubato::{FftFixedIn, Resampler};
use symphonia::core::{
    audio::SampleBuffer, codecs::DecoderOptions, errors::Error as SymphoniaError,
    formats::FormatOptions, io::MediaSourceStream, meta::MetadataOptions, probe::Hint,
};

/// Rate the speech encoder consumes.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

const RESAMPLE_CHUNK: usize = 1024;
const RESAMPLE_SUB_CHUNKS: usize = 2;

/// Decoded PCM audio. Samples are interleaved when `channels > 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    /// Decode audio bytes using `symphonia`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let cursor = std::io::Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("unrecognised audio format")?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| anyhow::anyhow!("no supported audio tracks"))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| anyhow::anyhow!("unknown sample rate"))?;
        #[allow(clippy::cast_possible_truncation)]
        let channels = codec_params.channels.map(|c| c.count() as u16).unwrap_or(1);
        let mut decoder =
            symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }
            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let mut buf =
                        SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                // A corrupt frame is skipped, the rest of the stream is still usable.
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if samples.is_empty() {
            anyhow::bail!("audio stream contained no samples");
        }

        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Convert multi channel audio to mono by averaging channels.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Mix down to mono and resample to `target_rate`.
    pub fn resample(&self, target_rate: u32) -> Result<Self> {
        anyhow::ensure!(target_rate > 0, "target sample rate must be positive");
        anyhow::ensure!(self.sample_rate > 0, "source sample rate must be positive");

        let mono = self.to_mono();
        if self.sample_rate == target_rate || mono.is_empty() {
            return Ok(Self {
                samples: mono,
                sample_rate: target_rate,
                channels: 1,
            });
        }

        let mut resampler = FftFixedIn::<f32>::new(
            self.sample_rate as usize,
            target_rate as usize,
            RESAMPLE_CHUNK,
            RESAMPLE_SUB_CHUNKS,
            1,
        )
        .context("failed to initialise resampler")?;

        let delay = resampler.output_delay();
        let expected =
            (mono.len() as u64 * u64::from(target_rate) / u64::from(self.sample_rate)) as usize;
        let mut output = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK);

        let mut chunks = mono.chunks_exact(RESAMPLE_CHUNK);
        for chunk in chunks.by_ref() {
            let wave_in: [&[f32]; 1] = [chunk];
            let frames = resampler.process(&wave_in[..], None)?;
            output.extend_from_slice(&frames[0]);
        }
        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            let wave_in: [&[f32]; 1] = [remainder];
            let frames = resampler.process_partial(Some(&wave_in[..]), None)?;
            output.extend_from_slice(&frames[0]);
        }
        // Flush whatever the resampler still holds back.
        while output.len() < expected + delay {
            let frames = resampler.process_partial::<&[f32]>(None, None)?;
            if frames[0].is_empty() {
                break;
            }
            output.extend_from_slice(&frames[0]);
        }

        let samples = output.into_iter().skip(delay).take(expected).collect();
        Ok(Self {
            samples,
            sample_rate: target_rate,
            channels: 1,
        })
    }
}
