//! Sample rate conversion for decoded clips.
//!
//! One-shot conversion of a whole mono buffer using rubato's FFT
//! resampler. Recorded clips rarely match the model's mandated rate
//! (browsers capture at 44.1/48 kHz, speech models want 16 kHz), so
//! every decoded clip passes through here before feature extraction.

use rubato::{FftFixedInOut, Resampler as RubatoResampler};

use crate::VocalError;

/// Frames per processing block.
const CHUNK_SIZE: usize = 1024;

/// Resamples a mono f32 buffer from `src_rate` to `dst_rate`.
///
/// Returns the input unchanged when the rates already match. The tail
/// block is zero-padded internally and the output is trimmed to the
/// expected converted length.
pub fn resample(samples: &[f32], src_rate: u32, dst_rate: u32) -> Result<Vec<f32>, VocalError> {
    if src_rate == dst_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if src_rate == 0 || dst_rate == 0 {
        return Err(VocalError::Resample("zero sample rate".into()));
    }

    let mut resampler =
        FftFixedInOut::<f32>::new(src_rate as usize, dst_rate as usize, CHUNK_SIZE, 1)?;

    let expected = (samples.len() as u64 * dst_rate as u64).div_ceil(src_rate as u64) as usize;
    let mut out = Vec::with_capacity(expected + CHUNK_SIZE);

    let mut input = vec![Vec::<f32>::new()];
    let mut output = vec![vec![0.0f32; resampler.output_frames_max()]];

    let mut pos = 0;
    while pos < samples.len() {
        let need = resampler.input_frames_next();
        let take = need.min(samples.len() - pos);

        input[0].clear();
        input[0].extend_from_slice(&samples[pos..pos + take]);
        input[0].resize(need, 0.0);
        pos += take;

        output[0].resize(resampler.output_frames_next(), 0.0);
        let (_, written) = resampler.process_into_buffer(&input, &mut output, None)?;
        out.extend_from_slice(&output[0][..written]);
    }

    out.truncate(expected);
    Ok(out)
}
