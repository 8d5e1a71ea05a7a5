//! `resample/engine.rs`: the per-channel convolve-and-advance loop.
//!
//! Output sample `k` is centred `len/2` input samples behind the cursor, so
//! the newest sample under the filter is `last_sample`. Window positions
//! before the current input block come from the channel history. After each
//! call the history is refilled with the newest `len − 1` consumed samples,
//! which makes the result independent of how the stream is chunked.

use super::{
    channel::ChannelState,
    filter::{FilterTable, TableLayout},
    interpolator::TapInterpolator,
    ratio::Ratio,
    sample::Sample,
};

/// Counts reported back by every process call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Processed {
    /// Input samples (per channel) that may be dropped by the caller.
    pub consumed: usize,
    /// Output samples (per channel) written.
    pub produced: usize,
}

/// Where input samples come from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a, S: Sample> {
    Slice { data: &'a [S], stride: usize },
    /// Virtual zeros, used to drain the filter tail.
    Silence,
}

impl<S: Sample> Source<'_, S> {
    #[inline]
    fn get(&self, index: usize) -> S {
        match self {
            Self::Slice { data, stride } => data[index * stride],
            Self::Silence => S::default(),
        }
    }
}

/// Strided output window.
pub struct Sink<'a, S: Sample> {
    data: &'a mut [S],
    stride: usize,
    capacity: usize,
}

impl<'a, S: Sample> Sink<'a, S> {
    pub fn new(data: &'a mut [S], stride: usize) -> Self {
        let capacity = data.len().div_ceil(stride);
        Self {
            data,
            stride,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn write(&mut self, index: usize, value: S) {
        self.data[index * self.stride] = value;
    }
}

/// Run one channel over `in_len` samples of `input`, first draining any magic
/// samples left behind by a filter change.
pub fn process_channel<S: Sample>(
    table: &FilterTable<S>,
    ratio: Ratio,
    state: &mut ChannelState<S>,
    input: Source<'_, S>,
    in_len: usize,
    sink: &mut Sink<'_, S>,
) -> Processed {
    let history_len = table.len() - 1;
    let mut produced = 0;

    if state.magic_samples > 0 {
        let pending = state.history.split_off(history_len);
        state.magic_samples = 0;

        let magic = Source::Slice {
            data: &pending,
            stride: 1,
        };
        let drained = run(table, ratio, state, magic, pending.len(), sink, 0);
        produced = drained.produced;

        if drained.consumed < pending.len() {
            // Output is full; fresh input has to wait behind the rest.
            state.history.extend_from_slice(&pending[drained.consumed..]);
            state.magic_samples = pending.len() - drained.consumed;
            return Processed {
                consumed: 0,
                produced,
            };
        }
    }

    let rest = run(table, ratio, state, input, in_len, sink, produced);
    Processed {
        consumed: rest.consumed,
        produced: produced + rest.produced,
    }
}

fn run<S: Sample>(
    table: &FilterTable<S>,
    ratio: Ratio,
    state: &mut ChannelState<S>,
    input: Source<'_, S>,
    in_len: usize,
    sink: &mut Sink<'_, S>,
    first: usize,
) -> Processed {
    let n = table.len();
    let den = ratio.den();
    let step = ratio.step();
    let capacity = sink.capacity().saturating_sub(first);

    let mut last = state.last_sample;
    let mut fraction = state.fraction;
    let mut produced = 0;

    while last < in_len && produced < capacity {
        let value = match table.layout() {
            TableLayout::Direct => {
                convolve_direct(table.row(fraction), &state.history, &input, last)
            }
            TableLayout::Interpolated => {
                let taps = TapInterpolator::new(table.coeffs(), table.oversample(), fraction, den);
                convolve_interpolated(&taps, n, &state.history, &input, last)
            }
        };
        sink.write(first + produced, value);
        produced += 1;
        step.advance(&mut last, &mut fraction, den);
    }

    let consumed = last.min(in_len);
    state.last_sample = last - consumed;
    state.fraction = fraction;
    refill_history(&mut state.history[..n - 1], &input, consumed);

    Processed { consumed, produced }
}

/// Number of leading window taps that read from history.
#[inline]
fn history_taps(n: usize, last: usize) -> usize {
    (n - 1).saturating_sub(last)
}

#[inline]
fn convolve_direct<S: Sample>(row: &[S], history: &[S], input: &Source<'_, S>, last: usize) -> S {
    let n = row.len();
    let split = history_taps(n, last);
    let mut acc = S::Acc::default();
    for j in 0..split {
        acc = S::mac(acc, history[last + j], row[j]);
    }
    for j in split..n {
        acc = S::mac(acc, input.get(last + j + 1 - n), row[j]);
    }
    S::from_acc(acc)
}

#[inline]
fn convolve_interpolated<S: Sample>(
    taps: &TapInterpolator<'_, S>,
    n: usize,
    history: &[S],
    input: &Source<'_, S>,
    last: usize,
) -> S {
    let split = history_taps(n, last);
    let mut accum = [S::Acc::default(); 4];
    for j in 0..split {
        taps.accumulate(&mut accum, j, history[last + j]);
    }
    for j in split..n {
        taps.accumulate(&mut accum, j, input.get(last + j + 1 - n));
    }
    taps.finish(accum)
}

/// Shift `consumed` input samples into the history tail.
fn refill_history<S: Sample>(history: &mut [S], input: &Source<'_, S>, consumed: usize) {
    let len = history.len();
    let keep = len.saturating_sub(consumed);
    if keep > 0 {
        history.copy_within(consumed.., 0);
    }
    for (j, slot) in history.iter_mut().enumerate().skip(keep) {
        *slot = input.get(j + consumed - len);
    }
}
