pub mod base;
pub mod io;
pub mod logging;
pub mod resampler;

pub use base::*;
pub use io::*;
pub use logging::*;
pub use resampler::*;
