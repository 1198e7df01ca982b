//! Minimal RIFF/WAVE decoder for recorded speech clips.
//!
//! Handles the formats browsers and recorders actually produce for raw
//! captures: PCM 8/16-bit and IEEE float 32-bit, mono or multi-channel.
//! Multi-channel audio is downmixed to mono by averaging. Compressed
//! WAV variants are rejected as malformed input.

use crate::VocalError;

/// PCM integer sample format.
const FORMAT_PCM: u16 = 1;
/// IEEE 754 float sample format.
const FORMAT_IEEE_FLOAT: u16 = 3;

struct FmtChunk {
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

/// Decodes WAV bytes into normalized mono f32 samples in `[-1, 1]`
/// plus the source sample rate.
pub fn decode_wav(data: &[u8]) -> Result<(Vec<f32>, u32), VocalError> {
    if data.len() < 12 || &data[0..4] != b"RIFF" || &data[8..12] != b"WAVE" {
        return Err(VocalError::Decode("not a RIFF/WAVE stream".into()));
    }

    let mut fmt: Option<FmtChunk> = None;
    let mut pcm: Option<&[u8]> = None;

    let mut pos = 12;
    while pos + 8 <= data.len() {
        let id = &data[pos..pos + 4];
        let size = u32::from_le_bytes([
            data[pos + 4],
            data[pos + 5],
            data[pos + 6],
            data[pos + 7],
        ]) as usize;
        let body_start = pos + 8;
        let body_end = body_start
            .checked_add(size)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| VocalError::Decode("truncated chunk".into()))?;
        let body = &data[body_start..body_end];

        match id {
            b"fmt " => {
                if body.len() < 16 {
                    return Err(VocalError::Decode("fmt chunk too short".into()));
                }
                fmt = Some(FmtChunk {
                    audio_format: u16::from_le_bytes([body[0], body[1]]),
                    channels: u16::from_le_bytes([body[2], body[3]]),
                    sample_rate: u32::from_le_bytes([body[4], body[5], body[6], body[7]]),
                    bits_per_sample: u16::from_le_bytes([body[14], body[15]]),
                });
            }
            b"data" => pcm = Some(body),
            _ => {} // LIST, fact, cue, etc. carry no audio
        }

        // Chunk bodies are word-aligned.
        pos = body_end + (size & 1);
    }

    let fmt = fmt.ok_or_else(|| VocalError::Decode("missing fmt chunk".into()))?;
    let pcm = pcm.ok_or_else(|| VocalError::Decode("missing data chunk".into()))?;

    if fmt.channels == 0 {
        return Err(VocalError::Decode("zero channels".into()));
    }
    if fmt.sample_rate == 0 {
        return Err(VocalError::Decode("zero sample rate".into()));
    }

    let samples = match (fmt.audio_format, fmt.bits_per_sample) {
        (FORMAT_PCM, 16) => decode_pcm16(pcm),
        (FORMAT_PCM, 8) => decode_pcm8(pcm),
        (FORMAT_IEEE_FLOAT, 32) => decode_f32(pcm)?,
        (format, bits) => {
            return Err(VocalError::Decode(format!(
                "unsupported sample format: format={format} bits={bits}"
            )))
        }
    };

    Ok((downmix(&samples, fmt.channels as usize), fmt.sample_rate))
}

fn decode_pcm16(pcm: &[u8]) -> Vec<f32> {
    pcm.chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
        .collect()
}

fn decode_pcm8(pcm: &[u8]) -> Vec<f32> {
    // 8-bit WAV is unsigned with a 128 midpoint.
    pcm.iter().map(|&b| (b as f32 - 128.0) / 128.0).collect()
}

fn decode_f32(pcm: &[u8]) -> Result<Vec<f32>, VocalError> {
    if pcm.len() % 4 != 0 {
        return Err(VocalError::Decode("float data not 4-byte aligned".into()));
    }
    Ok(pcm
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Averages interleaved channels into mono.
fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

#[cfg(test)]
pub(crate) fn encode_wav_pcm16(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = samples.len() * 2;
    let mut out = Vec::with_capacity(44 + data_len);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}
