//! `depforge doctor` command

use anyhow::Result;

use depforge::ops::{doctor, format_report};
use depforge::util::SystemRunner;

pub fn execute(verbose: bool) -> Result<()> {
    let report = doctor(&SystemRunner);

    print!("{}", format_report(&report, verbose));

    // Exit with error code if required checks failed
    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}
