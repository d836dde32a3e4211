//! Audio loading: decode any common format to 16kHz mono f32
//!
//! Symphonia handles container/codec probing; channels are downmixed by
//! averaging and the result is resampled with rubato when the source rate
//! differs from the model rate. Decode failures surface as errors the
//! orchestrator treats as a per-sample skip, never as a fatal condition.

use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Sample rate every downstream model expects.
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// Errors that can occur while loading a speech sample.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("failed to open audio file: {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("audio decode error: {0}")]
    Decode(String),

    #[error("resample error: {0}")]
    Resample(String),

    #[error("no audio samples decoded from {0}")]
    Empty(PathBuf),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Decode an audio file to mono f32 at [`TARGET_SAMPLE_RATE`].
///
/// Returns the samples together with the rate (always the target rate).
pub fn load_audio(path: &Path) -> Result<(Vec<f32>, u32)> {
    let file = File::open(path).map_err(|e| AudioError::Open {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::UnsupportedFormat("no audio track found".into()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params.sample_rate.unwrap_or(TARGET_SAMPLE_RATE);
    let channels = codec_params.channels.map_or(1, |c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(AudioError::Decode(format!("packet read: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(e) => {
                // A single corrupt packet is tolerable; a fully corrupt
                // stream ends up in the Empty check below.
                log::warn!("error decoding packet in {:?}: {}", path, e);
                continue;
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }

        if let Some(ref mut buf) = sample_buf {
            buf.copy_interleaved_ref(decoded);
            // Downmix interleaved frames to mono
            if channels > 1 {
                for chunk in buf.samples().chunks(channels) {
                    samples.push(chunk.iter().sum::<f32>() / channels as f32);
                }
            } else {
                samples.extend_from_slice(buf.samples());
            }
        }
    }

    if samples.is_empty() {
        return Err(AudioError::Empty(path.to_path_buf()));
    }

    if source_rate != TARGET_SAMPLE_RATE {
        samples = resample(&samples, source_rate, TARGET_SAMPLE_RATE)?;
    }

    Ok((samples, TARGET_SAMPLE_RATE))
}

/// Resample mono audio between rates using rubato's sinc resampler.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
        WindowFunction,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let chunk_size = 1024;

    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| AudioError::Resample(format!("init: {e}")))?;

    let mut output = Vec::with_capacity((samples.len() as f64 * ratio) as usize + 1024);

    for chunk in samples.chunks(chunk_size) {
        let input = if chunk.len() < chunk_size {
            let mut padded = chunk.to_vec();
            padded.resize(chunk_size, 0.0);
            vec![padded]
        } else {
            vec![chunk.to_vec()]
        };

        let resampled = resampler
            .process(&input, None)
            .map_err(|e| AudioError::Resample(format!("process: {e}")))?;

        if let Some(channel) = resampled.first() {
            output.extend_from_slice(channel);
        }
    }

    Ok(output)
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_wav(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = load_audio(Path::new("/nonexistent/sample.wav")).unwrap_err();
        assert!(matches!(err, AudioError::Open { .. }));
    }

    #[test]
    fn garbage_file_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(&dir, "garbage.wav", b"definitely not audio");
        assert!(load_audio(&path).is_err());
    }

    #[test]
    fn decodes_wav_at_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let wav = test_support::generate_wav(16_000, 1, 1600);
        let path = write_wav(&dir, "mono16k.wav", &wav);
        let (samples, rate) = load_audio(&path).unwrap();
        assert_eq!(rate, TARGET_SAMPLE_RATE);
        assert_eq!(samples.len(), 1600);
    }

    #[test]
    fn stereo_44k_is_downmixed_and_resampled() {
        let dir = tempfile::tempdir().unwrap();
        // 0.5s of 44.1kHz stereo
        let wav = test_support::generate_wav(44_100, 2, 22_050);
        let path = write_wav(&dir, "stereo44k.wav", &wav);
        let (samples, rate) = load_audio(&path).unwrap();
        assert_eq!(rate, TARGET_SAMPLE_RATE);
        // ~0.5s at 16kHz
        let ratio = samples.len() as f64 / 8000.0;
        assert!((ratio - 1.0).abs() < 0.2, "got {} samples", samples.len());
    }

    #[test]
    fn resample_downsamples_by_three() {
        let samples: Vec<f32> = (0..48_000).map(|i| (i as f32 / 48_000.0).sin()).collect();
        let result = resample(&samples, 48_000, 16_000).unwrap();
        let ratio = result.len() as f64 / samples.len() as f64;
        assert!((ratio - 1.0 / 3.0).abs() < 0.05, "ratio: {ratio}");
    }
}
