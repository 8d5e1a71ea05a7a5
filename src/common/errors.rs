use thiserror::Error;

/// Everything a resampler operation can reject.
///
/// Undersized buffers are not an error: process calls report partial
/// consumption/production through [`crate::Processed`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResamplerError {
    /// Memory for channel state could not be reserved.
    #[error("not enough memory for resampler state")]
    AllocationFailure,

    /// A new filter table could not be built; the previous one is still live.
    #[error("failed to build filter table")]
    FilterBuildFailed,

    #[error("invalid rate ratio {num}/{den}")]
    InvalidRatio { num: u32, den: u32 },

    #[error("quality {0} is outside 0..=10")]
    InvalidQuality(u8),

    #[error("channel {index} out of range (resampler has {channels})")]
    InvalidChannel { index: usize, channels: usize },

    #[error("a resampler needs at least one channel")]
    InvalidChannelCount,

    #[error("stride must be at least 1")]
    InvalidStride,
}

pub type Result<T> = std::result::Result<T, ResamplerError>;
