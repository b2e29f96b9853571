//! Default analysis engine

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::decoder::decode_audio_file;
use super::features::{estimate_bpm, estimate_energy, estimate_key};
use super::{AnalysisEngine, AnalysisError, TrackFeatures};

/// Decodes with symphonia and runs the feature estimators on a blocking thread
#[derive(Debug, Default, Clone)]
pub struct SignalEngine;

impl SignalEngine {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous analysis of one file
    pub fn analyze_file(path: &Path) -> Result<TrackFeatures, AnalysisError> {
        let decoded =
            decode_audio_file(path).map_err(|e| AnalysisError::Decode(format!("{:#}", e)))?;

        if decoded.samples.is_empty() {
            return Err(AnalysisError::NoAudio);
        }

        let bpm = estimate_bpm(&decoded.samples, decoded.sample_rate);
        let key = estimate_key(&decoded.samples, decoded.sample_rate);
        let energy = estimate_energy(&decoded.samples);

        tracing::debug!(
            path = %path.display(),
            duration_seconds = format!("{:.2}", decoded.duration_seconds()),
            bpm,
            key = %key,
            energy,
            "Track features estimated"
        );

        Ok(TrackFeatures { bpm, key, energy })
    }
}

#[async_trait]
impl AnalysisEngine for SignalEngine {
    fn name(&self) -> &'static str {
        "signal"
    }

    async fn analyze(&self, path: &Path) -> Result<TrackFeatures, AnalysisError> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::analyze_file(&path))
            .await
            .map_err(|e| AnalysisError::Internal(format!("analysis task aborted: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tone(path: &Path, frequency: f32, seconds: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..(seconds * 44100.0) as usize {
            let t = i as f32 / 44100.0;
            let s = 0.4 * (2.0 * std::f32::consts::PI * frequency * t).sin();
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[tokio::test]
    async fn test_analyze_tone_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("a440.wav");
        write_tone(&path, 440.0, 2.0);

        let features = SignalEngine::new().analyze(&path).await.unwrap();
        assert_eq!(features.key, "11B");
        assert!(features.energy > 0.0);
    }

    #[tokio::test]
    async fn test_analyze_empty_wav_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("empty.wav");
        write_tone(&path, 440.0, 0.0);

        let err = SignalEngine::new().analyze(&path).await.unwrap_err();
        assert!(matches!(err, AnalysisError::NoAudio | AnalysisError::Decode(_)));
    }

    #[tokio::test]
    async fn test_analyze_non_audio_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("notes.mp3");
        std::fs::write(&path, b"definitely not an mp3").unwrap();

        let err = SignalEngine::new().analyze(&path).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_) | AnalysisError::NoAudio));
    }
}
