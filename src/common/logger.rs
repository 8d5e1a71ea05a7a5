use tracing_subscriber::{EnvFilter, fmt::{self, time::LocalTime}, prelude::*};

use crate::configs::Config;

/// Build the filter directive from `[logging]`: the base level followed by
/// any extra per-target filters.
fn directives(config: &Config) -> String {
  let log_level = config
    .logging
    .as_ref()
    .and_then(|l| l.level.as_deref())
    .unwrap_or("info");

  let filters = config
    .logging
    .as_ref()
    .and_then(|l| l.filters.as_deref())
    .unwrap_or("");

  if filters.is_empty() {
    log_level.to_string()
  } else {
    format!("{},{}", log_level, filters)
  }
}

/// Install the global subscriber. `RUST_LOG` overrides the config.
pub fn init(config: &Config) {
  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(config)));

  let stderr_layer = fmt::layer()
    .with_writer(std::io::stderr)
    .with_timer(LocalTime::rfc_3339())
    .with_target(true)
    .with_thread_ids(true)
    .with_line_number(true)
    .with_file(false);

  tracing_subscriber::registry()
    .with(env_filter)
    .with(stderr_layer)
    .init();
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::configs::LoggingConfig;

  #[test]
  fn directives_default_to_info() {
    assert_eq!(directives(&Config::default()), "info");
  }

  #[test]
  fn directives_append_filters() {
    let config = Config {
      logging: Some(LoggingConfig {
        level: Some("warn".into()),
        filters: Some("rateshift::audio::resample=debug".into()),
      }),
      ..Default::default()
    };
    assert_eq!(directives(&config), "warn,rateshift::audio::resample=debug");
  }
}
