//! Acoustic summary features per speech sample
//!
//! Computes fixed-size spectral/cepstral statistics from the 16kHz mono
//! waveform: 40 cepstral coefficients reduced over time to mean and standard
//! deviation vectors, plus scalar means of spectral rolloff and zero-crossing
//! rate. These ride along in the feature bundle for audit; they are not part
//! of the fused model vector.

use realfft::RealFftPlanner;
use serde::Serialize;
use thiserror::Error;

/// Number of cepstral coefficients retained per frame.
const N_MFCC: usize = 40;
/// STFT window length in samples.
const N_FFT: usize = 1024;
/// STFT hop length in samples.
const HOP_LENGTH: usize = 512;
/// Mel filterbank size feeding the cepstral transform.
const N_MELS: usize = 128;
/// Fraction of spectral energy below the rolloff frequency.
const ROLLOFF_FRACTION: f32 = 0.85;

/// Per-sample acoustic summary statistics.
#[derive(Debug, Clone, Serialize)]
pub struct AcousticFeatures {
    /// Mean of each cepstral coefficient over time (40 values)
    pub mfcc_mean: Vec<f32>,
    /// Standard deviation of each cepstral coefficient over time (40 values)
    pub mfcc_std: Vec<f32>,
    /// Mean spectral rolloff frequency in Hz
    pub spectral_rolloff_mean: f32,
    /// Mean zero-crossing rate per frame
    pub zero_cross_mean: f32,
}

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error("audio too short for feature extraction: {0} samples")]
    TooShort(usize),
}

/// Extract acoustic summary features from a mono waveform.
pub fn extract_features(samples: &[f32], sample_rate: u32) -> Result<AcousticFeatures, FeatureError> {
    if samples.len() < N_FFT {
        return Err(FeatureError::TooShort(samples.len()));
    }

    let window = hann_window(N_FFT);
    let filterbank = mel_filterbank(N_MELS, N_FFT, sample_rate as f32);
    let dct = dct_matrix(N_MFCC, N_MELS);

    let mut planner = RealFftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(N_FFT);
    let mut scratch = fft.make_scratch_vec();
    let mut spectrum = fft.make_output_vec();

    let n_frames = (samples.len() - N_FFT) / HOP_LENGTH + 1;
    let mut mfcc_frames: Vec<[f32; N_MFCC]> = Vec::with_capacity(n_frames);
    let mut rolloff_sum = 0.0f32;
    let mut zcr_sum = 0.0f32;

    let bin_hz = sample_rate as f32 / N_FFT as f32;
    let mut frame = vec![0.0f32; N_FFT];

    for frame_idx in 0..n_frames {
        let start = frame_idx * HOP_LENGTH;
        let slice = &samples[start..start + N_FFT];

        // Zero-crossing rate on the raw frame
        zcr_sum += zero_crossing_rate(slice);

        for (dst, (&s, &w)) in frame.iter_mut().zip(slice.iter().zip(window.iter())) {
            *dst = s * w;
        }

        fft.process_with_scratch(&mut frame, &mut spectrum, &mut scratch)
            .expect("FFT length is fixed at plan time");

        // Power spectrum, N_FFT/2+1 bins
        let power: Vec<f32> = spectrum
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im) / N_FFT as f32)
            .collect();

        rolloff_sum += spectral_rolloff(&power, bin_hz);

        // Mel energies with log compression
        let mut log_mel = [0.0f32; N_MELS];
        for (band, filter) in filterbank.iter().enumerate() {
            let energy: f32 = filter
                .iter()
                .zip(power.iter())
                .map(|(&coeff, &p)| coeff * p)
                .sum();
            log_mel[band] = (energy.max(1e-10)).ln();
        }

        // DCT-II to cepstral coefficients
        let mut coeffs = [0.0f32; N_MFCC];
        for (k, row) in dct.iter().enumerate() {
            coeffs[k] = row
                .iter()
                .zip(log_mel.iter())
                .map(|(&d, &m)| d * m)
                .sum();
        }
        mfcc_frames.push(coeffs);
    }

    let n = mfcc_frames.len() as f32;
    let mut mfcc_mean = vec![0.0f32; N_MFCC];
    for coeffs in &mfcc_frames {
        for (acc, &c) in mfcc_mean.iter_mut().zip(coeffs.iter()) {
            *acc += c;
        }
    }
    for m in &mut mfcc_mean {
        *m /= n;
    }

    let mut mfcc_std = vec![0.0f32; N_MFCC];
    for coeffs in &mfcc_frames {
        for ((acc, &c), &mean) in mfcc_std.iter_mut().zip(coeffs.iter()).zip(mfcc_mean.iter()) {
            let d = c - mean;
            *acc += d * d;
        }
    }
    for s in &mut mfcc_std {
        *s = (*s / n).sqrt();
    }

    Ok(AcousticFeatures {
        mfcc_mean,
        mfcc_std,
        spectral_rolloff_mean: rolloff_sum / n,
        zero_cross_mean: zcr_sum / n,
    })
}

/// Fraction of sign changes within a frame.
fn zero_crossing_rate(frame: &[f32]) -> f32 {
    let crossings = frame
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    crossings as f32 / frame.len() as f32
}

/// Frequency below which `ROLLOFF_FRACTION` of the spectral energy lies.
fn spectral_rolloff(power: &[f32], bin_hz: f32) -> f32 {
    let total: f32 = power.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let threshold = total * ROLLOFF_FRACTION;
    let mut cumulative = 0.0f32;
    for (bin, &p) in power.iter().enumerate() {
        cumulative += p;
        if cumulative >= threshold {
            return bin as f32 * bin_hz;
        }
    }
    (power.len() - 1) as f32 * bin_hz
}

/// Generate a Hann window of given size.
pub(crate) fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Create a triangular mel filterbank: `n_bands` filters over N/2+1 bins.
pub(crate) fn mel_filterbank(n_bands: usize, frame_size: usize, sample_rate: f32) -> Vec<Vec<f32>> {
    let n_bins = frame_size / 2 + 1;
    let f_max = sample_rate / 2.0;

    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(f_max);

    let n_points = n_bands + 2;
    let mel_points: Vec<f32> = (0..n_points)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (n_points - 1) as f32)
        .collect();

    let bin_points: Vec<f32> = mel_points
        .iter()
        .map(|&m| mel_to_hz(m) * frame_size as f32 / sample_rate)
        .collect();

    let mut filterbank = Vec::with_capacity(n_bands);
    for band in 0..n_bands {
        let mut filter = vec![0.0f32; n_bins];
        let left = bin_points[band];
        let center = bin_points[band + 1];
        let right = bin_points[band + 2];

        for (bin, value) in filter.iter_mut().enumerate() {
            let bin_f = bin as f32;
            if bin_f >= left && bin_f <= center && (center - left) > 0.0 {
                *value = (bin_f - left) / (center - left);
            } else if bin_f > center && bin_f <= right && (right - center) > 0.0 {
                *value = (right - bin_f) / (right - center);
            }
        }
        filterbank.push(filter);
    }

    filterbank
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Orthonormal DCT-II matrix mapping `n_input` mel bands to `n_output`
/// cepstral coefficients.
fn dct_matrix(n_output: usize, n_input: usize) -> Vec<Vec<f32>> {
    let mut matrix = Vec::with_capacity(n_output);
    let norm0 = (1.0 / n_input as f32).sqrt();
    let norm = (2.0 / n_input as f32).sqrt();
    for k in 0..n_output {
        let mut row = Vec::with_capacity(n_input);
        for n in 0..n_input {
            let angle =
                std::f32::consts::PI * k as f32 * (2.0 * n as f32 + 1.0) / (2.0 * n_input as f32);
            let scale = if k == 0 { norm0 } else { norm };
            row.push(scale * angle.cos());
        }
        matrix.push(row);
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, secs: f32, rate: u32) -> Vec<f32> {
        (0..(rate as f32 * secs) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn feature_dimensions_are_fixed() {
        let samples = sine(440.0, 1.0, 16_000);
        let features = extract_features(&samples, 16_000).unwrap();
        assert_eq!(features.mfcc_mean.len(), N_MFCC);
        assert_eq!(features.mfcc_std.len(), N_MFCC);
    }

    #[test]
    fn too_short_input_fails() {
        let err = extract_features(&[0.0; 100], 16_000).unwrap_err();
        assert!(matches!(err, FeatureError::TooShort(100)));
    }

    #[test]
    fn rolloff_within_nyquist() {
        let samples = sine(1000.0, 1.0, 16_000);
        let features = extract_features(&samples, 16_000).unwrap();
        assert!(features.spectral_rolloff_mean >= 0.0);
        assert!(features.spectral_rolloff_mean <= 8000.0);
    }

    #[test]
    fn higher_pitch_crosses_zero_more() {
        let low = extract_features(&sine(200.0, 1.0, 16_000), 16_000).unwrap();
        let high = extract_features(&sine(2000.0, 1.0, 16_000), 16_000).unwrap();
        assert!(
            high.zero_cross_mean > low.zero_cross_mean,
            "2kHz should cross zero more than 200Hz: {} vs {}",
            high.zero_cross_mean,
            low.zero_cross_mean
        );
    }

    #[test]
    fn pure_tone_zcr_matches_frequency() {
        // A 1kHz tone crosses zero 2000 times per second;
        // at 16kHz that's a rate of 0.125 per sample.
        let features = extract_features(&sine(1000.0, 1.0, 16_000), 16_000).unwrap();
        assert!(
            (features.zero_cross_mean - 0.125).abs() < 0.01,
            "got {}",
            features.zero_cross_mean
        );
    }

    #[test]
    fn silence_has_flat_cepstrum_std() {
        let features = extract_features(&vec![0.0f32; 16_000], 16_000).unwrap();
        // Constant log-floor input: no variance over time
        assert!(features.mfcc_std.iter().all(|&s| s < 1e-3));
    }

    #[test]
    fn mel_hz_roundtrip() {
        let hz = 1000.0;
        let back = mel_to_hz(hz_to_mel(hz));
        assert!((back - hz).abs() < 0.1);
    }

    #[test]
    fn dct_rows_are_orthonormal() {
        let dct = dct_matrix(N_MFCC, N_MELS);
        let dot: f32 = dct[1].iter().zip(dct[2].iter()).map(|(a, b)| a * b).sum();
        assert!(dot.abs() < 1e-4, "distinct rows should be orthogonal: {dot}");
        let norm: f32 = dct[1].iter().map(|a| a * a).sum();
        assert!((norm - 1.0).abs() < 1e-4, "rows should be unit norm: {norm}");
    }
}
