//! `depforge install` command

use anyhow::{Context, Result};

use crate::cli::InstallArgs;
use crate::commands::load_merged_config;
use depforge::core::platform::{host_arch, host_os, require_platform, Distribution};
use depforge::util::SystemRunner;

pub fn execute(args: InstallArgs) -> Result<()> {
    let config = load_merged_config()?;

    let distribution = match args.distribution {
        Some(name) => Some(name.parse::<Distribution>()?),
        None => config.distribution()?,
    };

    let family = require_platform(host_os())?;
    let arch = family.require_architecture(host_arch())?;
    let platform = family.instantiate_with(arch, family.package_types(), distribution)?;

    for package in &args.packages {
        platform
            .install_package(package, &SystemRunner)
            .with_context(|| format!("failed to install `{}`", package))?;
    }

    Ok(())
}
