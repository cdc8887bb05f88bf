//! 16-bit PCM framing for the live voice bridge.
//!
//! Samples travel as little-endian signed 16-bit integers, base64-encoded.

use crate::constants::PCM_SCALE;
use crate::error::{CoreError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// MIME tag for a PCM16 stream at `rate` Hz.
pub fn mime_type(rate: u32) -> String {
    format!("audio/pcm;rate={}", rate)
}

#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let clamped = if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    (clamped * PCM_SCALE).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / PCM_SCALE
}

pub fn encode_pcm16(samples: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        bytes.extend_from_slice(&f32_to_i16(s).to_le_bytes());
    }
    bytes
}

pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(CoreError::OddByteLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|c| i16_to_f32(i16::from_le_bytes([c[0], c[1]])))
        .collect())
}

/// Capture block → transport payload.
pub fn encode_frame(samples: &[f32]) -> String {
    STANDARD.encode(encode_pcm16(samples))
}

/// Transport payload → playback samples.
pub fn decode_frame(data: &str) -> Result<Vec<f32>> {
    let bytes = STANDARD.decode(data.trim())?;
    decode_pcm16(&bytes)
}

/// Playback length of `frames` mono samples at `rate` Hz.
#[inline]
pub fn duration_sec(frames: usize, rate: u32) -> f64 {
    if rate == 0 {
        return 0.0;
    }
    frames as f64 / rate as f64
}
