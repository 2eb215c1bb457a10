pub mod builder;
pub mod defaults;
pub mod filter;
pub mod merge;
pub mod types;


pub use builder::ConfigBuilder;
pub use filter::ObjectFilter;
pub use types::*;

use anyhow::Result;
use std::path::Path;

/// Load `pgdiff.yaml` (or the `--config-file` path), falling back to
/// `ConfigInput::default()` when no file exists yet. Returns the directory
/// containing the config file alongside it — callers resolve schema-file
/// and export paths relative to this root, not the process's cwd.
pub fn load_config(config_file: &str) -> Result<(ConfigInput, std::path::PathBuf)> {
    let config_dir = Path::new(config_file)
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    let config_input = if Path::new(config_file).exists() {
        let contents = std::fs::read_to_string(config_file)?;
        serde_yaml::from_str(&contents)?
    } else {
        ConfigInput::default()
    };

    Ok((config_input, config_dir))
}
