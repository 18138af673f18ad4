//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

use crate::store::DEFAULT_INDENT;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("debounce_ms", 0_i64)?
        .set_default("indent", DEFAULT_INDENT as i64)?
        .set_default("logging.level", "warn")?
        .set_default("logging.output", "stderr")
}
