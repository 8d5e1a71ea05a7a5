//! Central constants for the resampling engine.
//!
//! All tuning numbers in `src/audio/**` live here so they can be tuned in one
//! place and remain consistent across modules.

// ── Quality ──────────────────────────────────────────────────────────────────

/// Lowest quality level (shortest filter, cheapest).
pub const QUALITY_MIN: u8 = 0;

/// Highest quality level (longest filter, best alias rejection).
pub const QUALITY_MAX: u8 = 10;

/// Quality used when nothing else is requested.
pub const QUALITY_DEFAULT: u8 = 4;

/// Good enough for narrowband speech.
pub const QUALITY_VOIP: u8 = 3;

/// Music playback on a desktop machine.
pub const QUALITY_DESKTOP: u8 = 5;

// ── Filter table ─────────────────────────────────────────────────────────────

/// Guard entries on each side of an interpolated table.
pub const TABLE_PADDING: usize = 4;

/// Upper bound on coefficients in a single table (64 Mi entries).
/// Extreme decimation ratios beyond this are refused instead of allocated.
pub const MAX_TABLE_LEN: usize = 1 << 26;

/// Below this magnitude the sinc argument is treated as zero.
pub const SINC_EPSILON: f64 = 1e-6;

/// Terms after which the I0 series is considered converged.
pub const BESSEL_MAX_TERMS: usize = 64;

// ── Fixed point ──────────────────────────────────────────────────────────────

/// Q15 unity.
pub const Q15_ONE: i64 = 1 << 15;

/// Rounding offset for a Q15 right shift.
pub const Q15_HALF: i64 = 1 << 14;

// ── PCM streaming (binary) ───────────────────────────────────────────────────

/// Frames handed to the resampler per call when converting files.
pub const DEFAULT_CHUNK_FRAMES: usize = 4_096;

/// Scale between i16 PCM and normalized floats.
pub const INT16_SCALE: f32 = 32_768.0;
