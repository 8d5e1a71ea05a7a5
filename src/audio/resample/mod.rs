//! Streaming polyphase sample-rate conversion.
//!
//! | Module | Role |
//! |---|---|
//! | [`ratio`] | Reduced `input : output` fraction and fixed-point step |
//! | [`filter`] | Quality presets, Kaiser-windowed sinc design, tap tables |
//! | [`interpolator`] | Cubic reconstruction of taps between table entries |
//! | [`channel`] | Per-channel history, cursor and magic samples |
//! | [`engine`] | The convolve-and-advance loop |
//!
//! [`Resampler`] ties them together. It is generic over the sample
//! representation: [`FloatResampler`] works on `f32`, [`FixedResampler`] on
//! Q15 `i16`.

pub mod channel;
pub mod engine;
pub mod filter;
pub mod interpolator;
pub mod ratio;
pub mod sample;

pub use channel::ChannelState;
pub use engine::Processed;
pub use filter::{FilterSpec, FilterTable, QualityPreset, TableLayout, Window};
pub use ratio::{Ratio, Step};
pub use sample::Sample;

use tracing::{debug, info};

use crate::audio::constants::QUALITY_MAX;
use crate::common::errors::{ResamplerError, Result};
use engine::{Sink, Source};

pub type FloatResampler = Resampler<f32>;
pub type FixedResampler = Resampler<i16>;

/// Multi-channel resampler with one shared filter table.
///
/// All channels advance independently; feeding them the same number of
/// samples keeps them in lockstep.
pub struct Resampler<S: Sample> {
    in_rate: u32,
    out_rate: u32,
    ratio: Ratio,
    quality: u8,
    input_stride: usize,
    output_stride: usize,
    table: FilterTable<S>,
    channels: Vec<ChannelState<S>>,
    /// Any channel has seen input since creation or the last reset.
    started: bool,
    /// `skip_zeros` was requested for the current stream.
    primed: bool,
}

impl<S: Sample> Resampler<S> {
    /// Integer input and output rates in Hz.
    pub fn new(channels: usize, in_rate: u32, out_rate: u32, quality: u8) -> Result<Self> {
        Self::new_fractional(channels, in_rate, out_rate, in_rate, out_rate, quality)
    }

    /// Arbitrary rational ratio `num : den` (input : output). `in_rate` and
    /// `out_rate` are the rates rounded to whole Hz, kept for reporting.
    pub fn new_fractional(
        channels: usize,
        num: u32,
        den: u32,
        in_rate: u32,
        out_rate: u32,
        quality: u8,
    ) -> Result<Self> {
        if channels == 0 {
            return Err(ResamplerError::InvalidChannelCount);
        }
        if quality > QUALITY_MAX {
            return Err(ResamplerError::InvalidQuality(quality));
        }
        validate_rates(in_rate, out_rate)?;
        let ratio = Ratio::new(num, den)?;

        let spec = FilterSpec::design(quality, ratio)?;
        let table = FilterTable::build(spec, ratio).map_err(|_| ResamplerError::AllocationFailure)?;

        let mut states = Vec::new();
        states
            .try_reserve_exact(channels)
            .map_err(|_| ResamplerError::AllocationFailure)?;
        for _ in 0..channels {
            states.push(ChannelState::new(table.len())?);
        }

        info!(
            channels,
            in_rate,
            out_rate,
            num = ratio.num(),
            den = ratio.den(),
            quality,
            filter_len = table.len(),
            "Resampler initialized"
        );

        Ok(Self {
            in_rate,
            out_rate,
            ratio,
            quality,
            input_stride: 1,
            output_stride: 1,
            table,
            channels: states,
            started: false,
            primed: false,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels.len()
    }

    /// Resample one channel. `input` and `output` are read and written at the
    /// configured strides; the returned counts are in strided samples.
    pub fn process(&mut self, channel: usize, input: &[S], output: &mut [S]) -> Result<Processed> {
        Ok(self.channel_mut(channel)?.process(input, output))
    }

    /// Feed `len` samples of silence into one channel, typically to flush
    /// the last `input_latency()` samples at the end of a stream.
    pub fn process_silence(
        &mut self,
        channel: usize,
        len: usize,
        output: &mut [S],
    ) -> Result<Processed> {
        Ok(self.channel_mut(channel)?.process_silence(len, output))
    }

    /// Resample interleaved frames. Counts are per channel; the configured
    /// strides are ignored in favour of the channel count.
    ///
    /// Every channel is run over the same buffers, so the counts of the last
    /// channel are returned.
    pub fn process_interleaved(&mut self, input: &[S], output: &mut [S]) -> Result<Processed> {
        let stride = self.channels.len();
        let frames = input.len() / stride;
        let end = frames * stride;
        self.run_interleaved(output, move |ch| {
            let data = &input[ch.min(end)..end];
            (Source::Slice { data, stride }, frames)
        })
    }

    /// Interleaved counterpart of [`Resampler::process_silence`].
    pub fn drain_interleaved(&mut self, frames: usize, output: &mut [S]) -> Result<Processed> {
        self.run_interleaved(output, |_| (Source::Silence, frames))
    }

    fn run_interleaved<'i>(
        &mut self,
        output: &mut [S],
        source: impl Fn(usize) -> (Source<'i, S>, usize),
    ) -> Result<Processed> {
        let stride = self.channels.len();
        let end = (output.len() / stride) * stride;
        let output = &mut output[..end];
        self.started = true;

        let mut done = Processed::default();
        for (ch, state) in self.channels.iter_mut().enumerate() {
            let (input, in_len) = source(ch);
            let mut sink = Sink::new(&mut output[ch.min(end)..], stride);
            done = engine::process_channel(&self.table, self.ratio, state, input, in_len, &mut sink);
        }
        Ok(done)
    }

    /// Disjoint handles onto every channel, sharing the filter table. The
    /// handles can be moved to different threads; reconfiguration needs
    /// `&mut self` again and therefore waits for all of them.
    pub fn channels_mut(&mut self) -> Vec<ChannelMut<'_, S>> {
        self.started = true;
        let table = &self.table;
        let (ratio, input_stride, output_stride) = (self.ratio, self.input_stride, self.output_stride);
        self.channels
            .iter_mut()
            .map(|state| ChannelMut {
                table,
                ratio,
                input_stride,
                output_stride,
                state,
            })
            .collect()
    }

    fn channel_mut(&mut self, index: usize) -> Result<ChannelMut<'_, S>> {
        let channels = self.channels.len();
        let state = self
            .channels
            .get_mut(index)
            .ok_or(ResamplerError::InvalidChannel { index, channels })?;
        self.started = true;
        Ok(ChannelMut {
            table: &self.table,
            ratio: self.ratio,
            input_stride: self.input_stride,
            output_stride: self.output_stride,
            state,
        })
    }

    pub fn set_rate(&mut self, in_rate: u32, out_rate: u32) -> Result<()> {
        self.set_rate_fractional(in_rate, out_rate, in_rate, out_rate)
    }

    pub fn rate(&self) -> (u32, u32) {
        (self.in_rate, self.out_rate)
    }

    pub fn set_rate_fractional(
        &mut self,
        num: u32,
        den: u32,
        in_rate: u32,
        out_rate: u32,
    ) -> Result<()> {
        validate_rates(in_rate, out_rate)?;
        let ratio = Ratio::new(num, den)?;
        if ratio != self.ratio {
            self.reconfigure(ratio, self.quality)?;
        }
        self.in_rate = in_rate;
        self.out_rate = out_rate;
        Ok(())
    }

    /// Reduced `(num, den)`, input side first.
    pub fn ratio(&self) -> (u32, u32) {
        self.ratio.parts()
    }

    pub fn set_quality(&mut self, quality: u8) -> Result<()> {
        if quality > QUALITY_MAX {
            return Err(ResamplerError::InvalidQuality(quality));
        }
        if quality != self.quality {
            self.reconfigure(self.ratio, quality)?;
        }
        Ok(())
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn set_input_stride(&mut self, stride: usize) -> Result<()> {
        if stride == 0 {
            return Err(ResamplerError::InvalidStride);
        }
        self.input_stride = stride;
        Ok(())
    }

    pub fn input_stride(&self) -> usize {
        self.input_stride
    }

    pub fn set_output_stride(&mut self, stride: usize) -> Result<()> {
        if stride == 0 {
            return Err(ResamplerError::InvalidStride);
        }
        self.output_stride = stride;
        Ok(())
    }

    pub fn output_stride(&self) -> usize {
        self.output_stride
    }

    /// Remove the initial `input_latency()` delay so the first output lines
    /// up with the first input sample. Meant for whole-file conversion
    /// before any input was processed; real-time streams should keep the
    /// constant delay instead.
    pub fn skip_zeros(&mut self) {
        let len = self.table.len();
        self.channels.iter_mut().for_each(|ch| ch.prime(len));
        self.primed = true;
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Forget all stream state but keep the configuration.
    pub fn reset(&mut self) {
        let len = self.table.len();
        self.channels.iter_mut().for_each(|ch| ch.reset(len));
        self.started = false;
        self.primed = false;
        debug!(channels = self.channels.len(), "Resampler state reset");
    }

    /// Delay in input samples between an input and its output.
    pub fn input_latency(&self) -> usize {
        self.table.len() / 2
    }

    /// [`Resampler::input_latency`] converted to output samples, rounded.
    pub fn output_latency(&self) -> usize {
        let (num, den) = (self.ratio.num() as u64, self.ratio.den() as u64);
        ((self.input_latency() as u64 * den + num / 2) / num) as usize
    }

    pub fn filter_len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if no conversion is needed (source == target rate).
    pub fn is_passthrough(&self) -> bool {
        self.ratio.parts() == (1, 1)
    }

    /// Build the new table and make room in every channel first; only then
    /// commit, so a failure leaves the resampler exactly as it was.
    fn reconfigure(&mut self, ratio: Ratio, quality: u8) -> Result<()> {
        let spec = FilterSpec::design(quality, ratio)?;
        let table = FilterTable::build(spec, ratio)?;

        let (old_len, new_len) = (self.table.len(), table.len());
        for ch in &mut self.channels {
            ch.reserve_for(old_len, new_len)?;
        }

        let old_den = self.ratio.den();
        for ch in &mut self.channels {
            if self.started {
                ch.fraction = ratio.rescale_fraction(ch.fraction, old_den);
                ch.adapt(old_len, new_len);
            } else {
                ch.reset(new_len);
                if self.primed {
                    ch.prime(new_len);
                }
            }
        }

        debug!(
            num = ratio.num(),
            den = ratio.den(),
            quality,
            old_len,
            new_len,
            started = self.started,
            "Resampler reconfigured"
        );

        self.ratio = ratio;
        self.quality = quality;
        self.table = table;
        Ok(())
    }
}

fn validate_rates(in_rate: u32, out_rate: u32) -> Result<()> {
    if in_rate == 0 || out_rate == 0 {
        return Err(ResamplerError::InvalidRatio {
            num: in_rate,
            den: out_rate,
        });
    }
    Ok(())
}

/// One channel of a [`Resampler`], borrowed for processing.
pub struct ChannelMut<'a, S: Sample> {
    table: &'a FilterTable<S>,
    ratio: Ratio,
    input_stride: usize,
    output_stride: usize,
    state: &'a mut ChannelState<S>,
}

impl<S: Sample> ChannelMut<'_, S> {
    pub fn process(&mut self, input: &[S], output: &mut [S]) -> Processed {
        let in_len = input.len().div_ceil(self.input_stride);
        let source = Source::Slice {
            data: input,
            stride: self.input_stride,
        };
        let mut sink = Sink::new(output, self.output_stride);
        engine::process_channel(self.table, self.ratio, self.state, source, in_len, &mut sink)
    }

    pub fn process_silence(&mut self, len: usize, output: &mut [S]) -> Processed {
        let mut sink = Sink::new(output, self.output_stride);
        engine::process_channel(self.table, self.ratio, self.state, Source::Silence, len, &mut sink)
    }
}
