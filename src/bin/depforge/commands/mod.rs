//! Command implementations

pub mod build;
pub mod completions;
pub mod doctor;
pub mod install;
pub mod platforms;

use depforge::util::config::{global_config_path, load_config, project_config_path};
use depforge::util::Config;

/// Global config merged with the config of the current directory.
pub fn load_merged_config() -> anyhow::Result<Config> {
    let cwd = std::env::current_dir()?;
    let global = global_config_path();
    Ok(load_config(global.as_deref(), &project_config_path(&cwd)))
}
