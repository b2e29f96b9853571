//! Audio decoding to mono f32 PCM
//!
//! Uses symphonia for format-agnostic decoding (MP3, FLAC, WAV, AIFF, ...)

use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoded audio result
#[derive(Debug)]
pub struct DecodedAudio {
    /// Mono samples, range [-1.0, 1.0]
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Original channel count
    pub channels: usize,
}

impl DecodedAudio {
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Decode audio file to mono f32 samples
///
/// Channels are averaged per frame. Corrupt packets are skipped; a file
/// whose container cannot be probed is an error.
pub fn decode_audio_file(file_path: &Path) -> Result<DecodedAudio> {
    tracing::debug!(path = %file_path.display(), "Decoding audio file");

    let file = std::fs::File::open(file_path)
        .with_context(|| format!("Failed to open audio file: {}", file_path.display()))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = file_path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .with_context(|| format!("Unsupported or corrupt audio file: {}", file_path.display()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found in file")?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Sample rate unknown")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .with_context(|| format!("Failed to create decoder for: {}", file_path.display()))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut channels = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(anyhow::anyhow!("Error reading packet: {}", e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::debug!(path = %file_path.display(), error = %e, "Skipping corrupt packet");
                continue;
            }
            Err(e) => return Err(anyhow::anyhow!("Failed to decode packet: {}", e)),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count().max(1);

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);

        mono.extend(
            buf.samples()
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    tracing::debug!(
        path = %file_path.display(),
        total_samples = mono.len(),
        sample_rate,
        "Audio decoding complete"
    );

    Ok(DecodedAudio {
        samples: mono,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_sine(path: &Path, channels: u16, seconds: f32) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        let total = (seconds * 22050.0) as usize;
        for i in 0..total {
            let t = i as f32 / 22050.0;
            let sample = (0.5 * (2.0 * std::f32::consts::PI * 440.0 * t).sin() * i16::MAX as f32) as i16;
            for _ in 0..channels {
                writer.write_sample(sample).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_decode_stereo_wav_to_mono() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tone.wav");
        write_sine(&path, 2, 1.0);

        let decoded = decode_audio_file(&path).unwrap();
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples.len(), 22050);
        assert!((decoded.duration_seconds() - 1.0).abs() < 0.01);

        let peak = decoded.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.45 && peak < 0.55, "peak was {}", peak);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.wav");
        std::fs::write(&path, b"this is not audio at all").unwrap();

        assert!(decode_audio_file(&path).is_err());
    }

    #[test]
    fn test_decode_missing_file() {
        let err = decode_audio_file(Path::new("/nonexistent/file.wav")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open audio file"));
    }
}
