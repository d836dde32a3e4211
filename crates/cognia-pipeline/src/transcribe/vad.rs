//! Energy-based voice activity filtering
//!
//! Removes long silent spans before mel computation so the decoder doesn't
//! hallucinate text over silence. Frames are classified by RMS energy
//! against a threshold relative to the loudest frame; short pauses between
//! words are kept so the decode window stays natural.

/// Frame length for energy analysis (30ms at 16kHz).
const FRAME_SAMPLES: usize = 480;

/// Frames quieter than this fraction of the loudest frame count as silence.
const ENERGY_FLOOR: f32 = 0.03;

/// Silent runs shorter than this many frames (~0.5s) are kept.
const MIN_SILENCE_FRAMES: usize = 16;

/// Drop long silent spans from a mono waveform, preserving order.
///
/// Returns an empty vector when no frame carries speech energy.
pub fn filter_silence(samples: &[f32]) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let rms: Vec<f32> = samples
        .chunks(FRAME_SAMPLES)
        .map(|frame| {
            let sum_sq: f32 = frame.iter().map(|&s| s * s).sum();
            (sum_sq / frame.len() as f32).sqrt()
        })
        .collect();

    let peak = rms.iter().cloned().fold(0.0f32, f32::max);
    if peak <= 0.0 {
        return Vec::new();
    }
    let threshold = peak * ENERGY_FLOOR;

    let voiced: Vec<bool> = rms.iter().map(|&e| e > threshold).collect();
    if !voiced.iter().any(|&v| v) {
        return Vec::new();
    }

    // Keep voiced frames plus short silent gaps between them
    let mut keep = vec![false; voiced.len()];
    let mut idx = 0;
    while idx < voiced.len() {
        if voiced[idx] {
            keep[idx] = true;
            idx += 1;
            continue;
        }
        // Measure this silent run
        let run_start = idx;
        while idx < voiced.len() && !voiced[idx] {
            idx += 1;
        }
        let bounded = run_start > 0 && idx < voiced.len();
        if bounded && idx - run_start < MIN_SILENCE_FRAMES {
            for k in keep.iter_mut().take(idx).skip(run_start) {
                *k = true;
            }
        }
    }

    let mut output = Vec::with_capacity(samples.len());
    for (frame_idx, frame) in samples.chunks(FRAME_SAMPLES).enumerate() {
        if keep[frame_idx] {
            output.extend_from_slice(frame);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(secs: f32) -> Vec<f32> {
        (0..(16_000.0 * secs) as usize)
            .map(|i| (i as f32 * 0.2).sin() * 0.5)
            .collect()
    }

    #[test]
    fn silence_filters_to_empty() {
        assert!(filter_silence(&vec![0.0; 16_000]).is_empty());
        assert!(filter_silence(&[]).is_empty());
    }

    #[test]
    fn speech_passes_through() {
        let speech = tone(2.0);
        let filtered = filter_silence(&speech);
        let ratio = filtered.len() as f32 / speech.len() as f32;
        assert!(ratio > 0.95, "speech should be kept: {ratio}");
    }

    #[test]
    fn long_leading_silence_is_dropped() {
        let mut audio = vec![0.0f32; 16_000 * 3]; // 3s silence
        audio.extend(tone(1.0));
        let filtered = filter_silence(&audio);
        assert!(
            filtered.len() < audio.len() / 2,
            "got {} of {}",
            filtered.len(),
            audio.len()
        );
    }

    #[test]
    fn short_pause_between_words_is_kept() {
        let mut audio = tone(1.0);
        audio.extend(vec![0.0f32; FRAME_SAMPLES * 4]); // ~0.12s pause
        audio.extend(tone(1.0));
        let filtered = filter_silence(&audio);
        let ratio = filtered.len() as f32 / audio.len() as f32;
        assert!(ratio > 0.95, "pause should survive: {ratio}");
    }
}
