use serde::{Deserialize, Serialize};

/// `[logging]` section. Ignored when `RUST_LOG` is set.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LoggingConfig {
    /// Base level, e.g. `"info"` or `"debug"`.
    pub level: Option<String>,
    /// Extra `EnvFilter` directives such as `"rateshift::audio=trace"`.
    pub filters: Option<String>,
}
