//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// depforge - build third-party C/C++ dependencies for a target platform
#[derive(Parser)]
#[command(name = "depforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch, build and install libraries
    Build(BuildArgs),

    /// List supported platforms and architectures
    Platforms(PlatformsArgs),

    /// Install system packages with the host's package manager
    Install(InstallArgs),

    /// Check that the native build tools are installed
    Doctor,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct BuildArgs {
    /// Recipes to build (snappy, jsonc, libev, cpuid, common, openssl)
    #[arg(required = true)]
    pub recipes: Vec<String>,

    /// Target platform family (defaults to the host)
    #[arg(long)]
    pub platform: Option<String>,

    /// Target architecture (defaults to the host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Build directory; removed and recreated
    #[arg(long, default_value = "build")]
    pub dir: PathBuf,

    /// Install prefix (defaults to the architecture's prefix)
    #[arg(long, env = "DEPFORGE_PREFIX")]
    pub prefix: Option<PathBuf>,

    /// Root directory of patch sets
    #[arg(long)]
    pub patch_dir: Option<PathBuf>,

    /// OpenSSL release to build
    #[arg(long)]
    pub openssl_version: Option<String>,

    /// Build common with Qt support
    #[arg(long)]
    pub with_qt: bool,

    /// Build system for CMake recipes (ninja, make, gmake)
    #[arg(long)]
    pub cmake_build_system: Option<String>,

    /// Build system for configure recipes (make, gmake)
    #[arg(long)]
    pub configure_build_system: Option<String>,

    /// Number of parallel jobs for make
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// CMake build type
    #[arg(long)]
    pub build_type: Option<String>,

    /// Linux distribution to assume (debian, redhat, arch)
    #[arg(long)]
    pub distribution: Option<String>,

    /// Keep `.git` in cloned sources
    #[arg(long)]
    pub keep_git: bool,
}

#[derive(Args)]
pub struct PlatformsArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct InstallArgs {
    /// Packages to install
    #[arg(required = true)]
    pub packages: Vec<String>,

    /// Linux distribution to assume (debian, redhat, arch)
    #[arg(long)]
    pub distribution: Option<String>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
