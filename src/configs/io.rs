use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::audio::constants::DEFAULT_CHUNK_FRAMES;

/// Files the `rateshift` binary reads and writes. Both hold raw interleaved
/// signed 16-bit little-endian PCM without a header.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct IoConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub chunk_frames: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input.raw"),
            output: PathBuf::from("output.raw"),
            chunk_frames: DEFAULT_CHUNK_FRAMES,
        }
    }
}
