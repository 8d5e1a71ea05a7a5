pub mod constants;
pub mod pcm;
pub mod resample;

pub use pcm::{ConvertStats, Pcm16, PcmReader, convert, write_pcm16};
pub use resample::{FixedResampler, FloatResampler, Processed, Resampler};
