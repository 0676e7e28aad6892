//! `depforge build` command

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::cli::BuildArgs;
use crate::commands::load_merged_config;
use depforge::core::platform::{host_arch, host_os, Distribution};
use depforge::ops::{BuildRequest, BuildRequestOptions, Recipe};
use depforge::util::SystemRunner;
use depforge::{BuildSystemSpec, NetworkFetcher};

pub fn execute(args: BuildArgs) -> Result<()> {
    let config = load_merged_config()?;

    let recipes = args
        .recipes
        .iter()
        .map(|name| name.parse::<Recipe>())
        .collect::<Result<Vec<_>, _>>()?;
    if recipes.contains(&Recipe::Openssl) && args.openssl_version.is_none() {
        bail!("building openssl requires `--openssl-version`");
    }

    let platform = args.platform.unwrap_or_else(|| host_os().to_string());
    let arch = args.arch.unwrap_or_else(|| host_arch().to_string());
    let jobs = args.jobs.or(config.build.jobs);

    let mut options = BuildRequestOptions::new(platform, arch, args.dir);
    options.prefix = args.prefix;
    options.patch_dir = args.patch_dir.or_else(|| config.build.patch_dir.clone());
    options.distribution = match args.distribution {
        Some(name) => Some(name.parse::<Distribution>()?),
        None => config.distribution()?,
    };
    options.cmake_build_system = select_build_system(
        args.cmake_build_system.as_deref(),
        config.cmake_build_system()?,
        BuildSystemSpec::ninja(),
        jobs,
    )?;
    options.configure_build_system = select_build_system(
        args.configure_build_system.as_deref(),
        config.configure_build_system()?,
        BuildSystemSpec::make(),
        jobs,
    )?;
    if let Some(build_type) = args.build_type.or_else(|| config.build.build_type.clone()) {
        options.build_type = build_type;
    }
    options.git_url_template = config.git_url_template().to_string();
    options.openssl_url_root = config.openssl_url_root().to_string();
    options.strip_vcs = !args.keep_git;

    let fetcher = NetworkFetcher::new()
        .with_checksums(config.sources.checksums.clone().into_iter().collect());
    let request = BuildRequest::new(options, Arc::new(SystemRunner), Arc::new(fetcher))?;

    for recipe in &recipes {
        request
            .build_recipe(*recipe, args.with_qt, args.openssl_version.as_deref())
            .with_context(|| format!("failed to build `{}`", recipe))?;
    }

    tracing::info!(
        "Built {} librar{} into {}",
        recipes.len(),
        if recipes.len() == 1 { "y" } else { "ies" },
        request.prefix().display()
    );

    Ok(())
}

/// Command-line choice, else configured choice, else `default`.
fn select_build_system(
    flag: Option<&str>,
    configured: Option<BuildSystemSpec>,
    default: BuildSystemSpec,
    jobs: Option<usize>,
) -> Result<BuildSystemSpec> {
    let spec = match flag {
        Some(name) => name.parse::<BuildSystemSpec>()?,
        None => configured.unwrap_or(default),
    };
    Ok(match jobs {
        Some(jobs) => spec.with_jobs(jobs),
        None => spec,
    })
}
