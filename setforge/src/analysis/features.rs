//! Tempo, key and energy estimation on mono f32 samples
//!
//! Tempo comes from onset-envelope autocorrelation and key from a Goertzel
//! pitch-class profile. Energy is a statistic over frame RMS.

use std::f32::consts::PI;

/// Frame length for RMS energy
const ENERGY_FRAME: usize = 2048;
/// Hop between energy frames, also the onset envelope resolution
const HOP: usize = 512;

const MIN_BPM: f64 = 60.0;
const MAX_BPM: f64 = 200.0;

/// Frame length for pitch-class estimation
const KEY_FRAME: usize = 4096;
/// Upper bound on frames inspected for key estimation
const KEY_MAX_FRAMES: usize = 200;
/// MIDI notes C3..B5
const KEY_NOTES: std::ops::RangeInclusive<u8> = 48..=83;

/// Key returned when no pitch class stands out
pub const UNKNOWN_KEY: &str = "Unknown";

const PITCH_CLASSES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];
const CAMELOT: [&str; 12] = [
    "8B", "3B", "10B", "5B", "12B", "7B", "2B", "9B", "4B", "11B", "6B", "1B",
];

/// Camelot code for a pitch class name ("A" → "11B")
pub fn camelot_for(pitch_class: &str) -> Option<&'static str> {
    PITCH_CLASSES
        .iter()
        .position(|p| *p == pitch_class)
        .map(|idx| CAMELOT[idx])
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Peak-normalized copy of the signal
fn normalize(samples: &[f32]) -> Vec<f32> {
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    if peak <= f32::EPSILON {
        return samples.to_vec();
    }
    samples.iter().map(|s| s / peak).collect()
}

/// RMS of each frame, hopping by `hop`
pub fn frame_rms(samples: &[f32], frame: usize, hop: usize) -> Vec<f32> {
    if samples.is_empty() || frame == 0 || hop == 0 {
        return Vec::new();
    }
    if samples.len() <= frame {
        let sum: f32 = samples.iter().map(|s| s * s).sum();
        return vec![(sum / samples.len() as f32).sqrt()];
    }

    (0..=(samples.len() - frame))
        .step_by(hop)
        .map(|start| {
            let window = &samples[start..start + frame];
            let sum: f32 = window.iter().map(|s| s * s).sum();
            (sum / frame as f32).sqrt()
        })
        .collect()
}

/// Energy: mean(frame RMS) * 10 + var(frame RMS) * 5 on the normalized signal
pub fn estimate_energy(samples: &[f32]) -> f64 {
    let rms = frame_rms(&normalize(samples), ENERGY_FRAME, HOP);
    if rms.is_empty() {
        return 0.0;
    }

    let n = rms.len() as f64;
    let mean = rms.iter().map(|&r| r as f64).sum::<f64>() / n;
    let variance = rms.iter().map(|&r| (r as f64 - mean).powi(2)).sum::<f64>() / n;

    round_to(mean * 10.0 + variance * 5.0, 3)
}

/// Half-wave rectified energy difference per hop block
fn onset_envelope(samples: &[f32]) -> Vec<f64> {
    let energies: Vec<f64> = samples
        .chunks(HOP)
        .map(|block| block.iter().map(|&s| (s as f64) * (s as f64)).sum())
        .collect();

    energies
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).max(0.0))
        .collect()
}

/// Tempo in BPM, 0.0 when no periodicity is found
pub fn estimate_bpm(samples: &[f32], sample_rate: u32) -> f64 {
    if samples.is_empty() || sample_rate == 0 {
        return 0.0;
    }

    let onset = onset_envelope(samples);
    let frame_rate = sample_rate as f64 / HOP as f64;
    let min_lag = ((frame_rate * 60.0 / MAX_BPM).floor() as usize).max(1);
    let max_lag = (frame_rate * 60.0 / MIN_BPM).ceil() as usize;

    if onset.len() <= max_lag + 1 {
        return 0.0;
    }

    let mean = onset.iter().sum::<f64>() / onset.len() as f64;
    let centered: Vec<f64> = onset.iter().map(|v| v - mean).collect();
    if centered.iter().all(|v| v.abs() <= f64::EPSILON) {
        return 0.0;
    }

    let autocorr = |lag: usize| -> f64 {
        centered
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum()
    };

    let scores: Vec<f64> = (min_lag - 1..=max_lag + 1).map(autocorr).collect();
    // scores[i] corresponds to lag (min_lag - 1 + i)
    let (best_idx, best_score) = scores[1..scores.len() - 1]
        .iter()
        .enumerate()
        .map(|(i, &s)| (i + 1, s))
        .fold((0usize, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

    if best_idx == 0 || best_score <= 0.0 {
        return 0.0;
    }

    // Parabolic interpolation around the peak
    let (prev, next) = (scores[best_idx - 1], scores[best_idx + 1]);
    let denom = prev - 2.0 * best_score + next;
    let offset = if denom.abs() > f64::EPSILON {
        (0.5 * (prev - next) / denom).clamp(-0.5, 0.5)
    } else {
        0.0
    };
    let lag = (min_lag - 1 + best_idx) as f64 + offset;

    round_to(60.0 * frame_rate / lag, 2)
}

/// Goertzel power of `frequency` in a windowed frame
fn goertzel_power(frame: &[f32], frequency: f32, sample_rate: f32) -> f32 {
    let coeff = 2.0 * (2.0 * PI * frequency / sample_rate).cos();
    let (mut s1, mut s2) = (0.0f32, 0.0f32);
    for &x in frame {
        let s0 = x + coeff * s1 - s2;
        s2 = s1;
        s1 = s0;
    }
    s1 * s1 + s2 * s2 - coeff * s1 * s2
}

/// Summed pitch-class energy over C3..B5
pub fn pitch_class_profile(samples: &[f32], sample_rate: u32) -> [f32; 12] {
    let mut profile = [0.0f32; 12];
    if samples.len() < KEY_FRAME || sample_rate == 0 {
        return profile;
    }

    let sr = sample_rate as f32;
    let window: Vec<f32> = (0..KEY_FRAME)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (KEY_FRAME - 1) as f32).cos())
        .collect();

    let span = samples.len() - KEY_FRAME;
    let step = (span / KEY_MAX_FRAMES).max(KEY_FRAME);
    let mut frame = vec![0.0f32; KEY_FRAME];

    for start in (0..=span).step_by(step) {
        for (dst, (&s, &w)) in frame
            .iter_mut()
            .zip(samples[start..start + KEY_FRAME].iter().zip(&window))
        {
            *dst = s * w;
        }

        for note in KEY_NOTES {
            let frequency = 440.0 * 2f32.powf((note as f32 - 69.0) / 12.0);
            if frequency >= sr / 2.0 {
                continue;
            }
            profile[(note % 12) as usize] += goertzel_power(&frame, frequency, sr);
        }
    }

    profile
}

/// Musical key in Camelot notation, or "Unknown"
pub fn estimate_key(samples: &[f32], sample_rate: u32) -> String {
    let profile = pitch_class_profile(samples, sample_rate);
    let total: f32 = profile.iter().sum();
    if total <= f32::EPSILON {
        return UNKNOWN_KEY.to_string();
    }

    let (idx, &max) = profile
        .iter()
        .enumerate()
        .fold((0, &0.0f32), |best, cur| if cur.1 > best.1 { cur } else { best });

    // A flat profile carries no tonal information
    if max < 1.5 * (total / 12.0) {
        return UNKNOWN_KEY.to_string();
    }

    CAMELOT[idx].to_string()
}
