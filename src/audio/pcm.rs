//! Raw interleaved s16le PCM I/O and the file conversion loop.

use std::io::{self, Read, Write};

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use tracing::{debug, warn};

use crate::audio::constants::INT16_SCALE;
use crate::audio::resample::{Resampler, Sample};
use crate::common::types::AnyResult;

/// Sample types that can be loaded from and stored as 16-bit PCM.
pub trait Pcm16: Sample {
    fn from_pcm16(value: i16) -> Self;
    fn to_pcm16(self) -> i16;
}

impl Pcm16 for f32 {
    #[inline]
    fn from_pcm16(value: i16) -> Self {
        value as f32 / INT16_SCALE
    }

    #[inline]
    fn to_pcm16(self) -> i16 {
        (self * INT16_SCALE)
            .round()
            .clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }
}

impl Pcm16 for i16 {
    #[inline]
    fn from_pcm16(value: i16) -> Self {
        value
    }

    #[inline]
    fn to_pcm16(self) -> i16 {
        self
    }
}

/// Reads whole interleaved frames, reusing one byte buffer.
pub struct PcmReader<R> {
    inner: R,
    channels: usize,
    bytes: Vec<u8>,
}

impl<R: Read> PcmReader<R> {
    pub fn new(inner: R, channels: usize) -> Self {
        Self {
            inner,
            channels,
            bytes: Vec::new(),
        }
    }

    /// Replace `out` with up to `frames` frames. Returns the number of frames
    /// read; 0 means end of input. A trailing partial frame is dropped.
    pub fn read_frames<S: Pcm16>(&mut self, frames: usize, out: &mut Vec<S>) -> io::Result<usize> {
        let frame_bytes = 2 * self.channels;
        self.bytes.clear();
        (&mut self.inner)
            .take((frames * frame_bytes) as u64)
            .read_to_end(&mut self.bytes)?;

        let whole = self.bytes.len() / frame_bytes;
        let used = whole * frame_bytes;
        if used < self.bytes.len() {
            warn!(
                bytes = self.bytes.len() - used,
                "Dropping trailing partial PCM frame"
            );
        }

        out.clear();
        out.extend(
            self.bytes[..used]
                .chunks_exact(2)
                .map(|b| S::from_pcm16(LittleEndian::read_i16(b))),
        );
        Ok(whole)
    }
}

pub fn write_pcm16<W: Write, S: Pcm16>(writer: &mut W, samples: &[S]) -> io::Result<()> {
    for &s in samples {
        writer.write_i16::<LittleEndian>(s.to_pcm16())?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub frames_in: usize,
    pub frames_out: usize,
}

/// Stream a whole PCM file through `resampler`.
///
/// The filter tail is flushed with `input_latency()` frames of silence. If
/// the resampler skips the leading zeros the output is cut to exactly
/// `ceil(frames_in * out / in)` frames.
pub fn convert<S: Pcm16, R: Read, W: Write>(
    resampler: &mut Resampler<S>,
    reader: R,
    writer: &mut W,
    chunk_frames: usize,
) -> AnyResult<ConvertStats> {
    let channels = resampler.channels();
    let chunk_frames = chunk_frames.max(1);
    let (num, den) = resampler.ratio();

    let out_frames = (chunk_frames as u64 * den as u64).div_ceil(num as u64) as usize + 1;
    let mut output = vec![S::default(); out_frames * channels];
    let mut input = Vec::with_capacity(chunk_frames * channels);
    let mut pcm = PcmReader::new(reader, channels);
    let mut stats = ConvertStats::default();

    loop {
        let frames = pcm.read_frames(chunk_frames, &mut input)?;
        if frames == 0 {
            break;
        }
        stats.frames_in += frames;

        let mut pos = 0;
        while pos < frames {
            let done = resampler.process_interleaved(&input[pos * channels..], &mut output)?;
            write_pcm16(writer, &output[..done.produced * channels])?;
            stats.frames_out += done.produced;
            pos += done.consumed;
            if done.consumed == 0 && done.produced == 0 {
                break;
            }
        }
    }

    let target = (stats.frames_in as u64 * den as u64).div_ceil(num as u64) as usize;
    let mut silence = resampler.input_latency();
    while silence > 0 {
        let done = resampler.drain_interleaved(silence, &mut output)?;
        let keep = if resampler.is_primed() {
            done.produced.min(target.saturating_sub(stats.frames_out))
        } else {
            done.produced
        };
        write_pcm16(writer, &output[..keep * channels])?;
        stats.frames_out += keep;
        silence -= done.consumed;
        if done.consumed == 0 && done.produced == 0 {
            break;
        }
    }

    debug!(
        frames_in = stats.frames_in,
        frames_out = stats.frames_out,
        "PCM stream converted"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::resample::{FixedResampler, FloatResampler};
    use std::io::Cursor;

    fn encode(samples: &[i16]) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_pcm16(&mut bytes, samples).unwrap();
        bytes
    }

    fn decode(bytes: &[u8]) -> Vec<i16> {
        bytes.chunks_exact(2).map(LittleEndian::read_i16).collect()
    }

    #[test]
    fn float_conversion_saturates() {
        assert_eq!(f32::from_pcm16(-32_768), -1.0);
        assert_eq!(1.5f32.to_pcm16(), i16::MAX);
        assert_eq!((-2.0f32).to_pcm16(), i16::MIN);
        assert_eq!(0.5f32.to_pcm16(), 16_384);
    }

    #[test]
    fn writes_little_endian() {
        assert_eq!(encode(&[1, -2]), vec![0x01, 0x00, 0xfe, 0xff]);
    }

    #[test]
    fn reader_drops_partial_frame() {
        let mut bytes = encode(&[1, 2, 3, 4, 5]);
        bytes.push(0x7f);
        let mut reader = PcmReader::new(Cursor::new(bytes), 2);
        let mut out: Vec<i16> = Vec::new();

        assert_eq!(reader.read_frames(1, &mut out).unwrap(), 1);
        assert_eq!(out, vec![1, 2]);
        assert_eq!(reader.read_frames(8, &mut out).unwrap(), 1);
        assert_eq!(out, vec![3, 4]);
        assert_eq!(reader.read_frames(8, &mut out).unwrap(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn skip_zeros_gives_exact_length() {
        let frames = 1_001;
        let samples: Vec<i16> = (0..frames * 2).map(|i| ((i * 37) % 2_000) as i16 - 1_000).collect();

        let mut r = FloatResampler::new(2, 8_000, 16_000, 4).unwrap();
        r.skip_zeros();
        let mut out = Vec::new();
        let stats = convert(&mut r, Cursor::new(encode(&samples)), &mut out, 128).unwrap();

        assert_eq!(stats.frames_in, frames);
        assert_eq!(stats.frames_out, 2 * frames);
        assert_eq!(out.len(), 2 * frames * 2 * 2);
    }

    #[test]
    fn fixed_unity_conversion_keeps_dc() {
        let samples = vec![4_000i16; 600];
        let mut r = FixedResampler::new(1, 16_000, 16_000, 3).unwrap();
        r.skip_zeros();
        let mut out = Vec::new();
        let stats = convert(&mut r, Cursor::new(encode(&samples)), &mut out, 100).unwrap();
        assert_eq!(stats.frames_out, 600);

        let pcm = decode(&out);
        let settle = r.filter_len();
        assert!(pcm[settle..600 - settle].iter().all(|&v| (v as i32 - 4_000).abs() <= 8));
    }

    #[test]
    fn without_skip_zeros_the_tail_is_flushed() {
        let samples = vec![1_000i16; 300];
        let mut r = FloatResampler::new(1, 48_000, 48_000, 2).unwrap();
        let mut out = Vec::new();
        let stats = convert(&mut r, Cursor::new(encode(&samples)), &mut out, 64).unwrap();
        assert_eq!(stats.frames_out, 300 + r.input_latency());
    }
}
