//! `resample/channel.rs`: per-channel stream state.
//!
//! `history` always holds `filter_len − 1 + magic_samples` samples: the tail
//! of consumed input followed by any "magic" samples, i.e. input that a
//! filter change pushed back out of the history and that still has to be
//! fed through the new filter before fresh input.

use tracing::debug;

use super::sample::Sample;
use crate::common::errors::{ResamplerError, Result};

#[derive(Debug, Clone)]
pub struct ChannelState<S: Sample> {
    pub(crate) history: Vec<S>,
    /// Index (relative to the next input block) of the newest sample under
    /// the filter for the next output.
    pub(crate) last_sample: usize,
    /// Fractional cursor in units of `1 / den`.
    pub(crate) fraction: u32,
    pub(crate) magic_samples: usize,
}

impl<S: Sample> ChannelState<S> {
    pub fn new(filter_len: usize) -> Result<Self> {
        let mut history = Vec::new();
        history
            .try_reserve_exact(filter_len.saturating_sub(1))
            .map_err(|_| ResamplerError::AllocationFailure)?;
        history.resize(filter_len.saturating_sub(1), S::default());
        Ok(Self {
            history,
            last_sample: 0,
            fraction: 0,
            magic_samples: 0,
        })
    }

    pub fn magic_samples(&self) -> usize {
        self.magic_samples
    }

    /// Back to the start-of-stream condition for `filter_len`.
    pub fn reset(&mut self, filter_len: usize) {
        self.history.clear();
        self.history.resize(filter_len.saturating_sub(1), S::default());
        self.last_sample = 0;
        self.fraction = 0;
        self.magic_samples = 0;
    }

    /// Start the cursor at the filter centre so the first output is aligned
    /// with the first input sample instead of the zeroed history.
    pub fn prime(&mut self, filter_len: usize) {
        self.last_sample = filter_len / 2;
    }

    /// Make sure a later [`ChannelState::adapt`] to `new_len` cannot fail.
    pub fn reserve_for(&mut self, old_len: usize, new_len: usize) -> Result<()> {
        let worst = new_len.max(old_len) + 2 * self.magic_samples;
        let additional = worst.saturating_sub(self.history.len());
        self.history
            .try_reserve(additional)
            .map_err(|_| ResamplerError::AllocationFailure)
    }

    /// Rework history and cursor for a filter length change on a running
    /// stream, keeping the output time of the next sample where it was.
    pub fn adapt(&mut self, old_len: usize, new_len: usize) {
        if new_len > old_len {
            self.grow(old_len, new_len);
        } else if new_len < old_len {
            self.shrink(old_len, new_len);
        }
    }

    fn grow(&mut self, old_len: usize, new_len: usize) {
        // Fold pending magic samples back in as if they had been consumed,
        // centring the old filter on the same output time.
        let magic = std::mem::take(&mut self.magic_samples);
        let effective_len = old_len + 2 * magic;
        if magic > 0 {
            self.history
                .splice(0..0, std::iter::repeat_n(S::default(), magic));
        }

        if new_len > effective_len {
            let pad = new_len - effective_len;
            self.history
                .splice(0..0, std::iter::repeat_n(S::default(), pad));
            self.last_sample += pad / 2;
        } else {
            // Still shorter than the augmented filter: hand the excess back
            // as magic samples.
            let excess = (effective_len - new_len) / 2;
            self.history.drain(..excess);
            self.magic_samples = excess;
        }

        debug!(
            old_len,
            new_len,
            magic = self.magic_samples,
            last_sample = self.last_sample,
            "Channel history grown"
        );
    }

    fn shrink(&mut self, old_len: usize, new_len: usize) {
        let dropped = (old_len - new_len) / 2;
        self.history.drain(..dropped);
        self.magic_samples += dropped;

        debug!(
            old_len,
            new_len,
            magic = self.magic_samples,
            "Channel history shrunk"
        );
    }
}
