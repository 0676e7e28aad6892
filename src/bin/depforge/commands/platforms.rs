//! `depforge platforms` command

use anyhow::Result;

use crate::cli::PlatformsArgs;
use depforge::core::platform::{host_arch, host_os, supported_platforms};

pub fn execute(args: PlatformsArgs) -> Result<()> {
    let platforms = supported_platforms();

    if args.json {
        println!("{}", serde_json::to_string_pretty(platforms)?);
        return Ok(());
    }

    for family in platforms {
        let packages: Vec<_> = family.package_types().iter().map(|p| p.as_str()).collect();
        let host = if family.name() == host_os() { " (host)" } else { "" };
        println!("{}{}  [{}]", family.name(), host, packages.join(", "));

        for arch in family.architectures() {
            let marker = if !host.is_empty() && arch.name() == host_arch() {
                "*"
            } else {
                " "
            };
            println!(
                "  {} {:<8} {}-bit  {}",
                marker,
                arch.name(),
                arch.bit_width().bits(),
                arch.default_install_prefix().display()
            );
        }
    }

    Ok(())
}
