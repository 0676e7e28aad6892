//! Host tool health checks.
//!
//! The `doctor` command verifies that the native tools the build drivers
//! invoke are installed.
//!
//! ## Usage
//!
//! ```bash
//! depforge doctor           # Quick check
//! depforge doctor --verbose # Detailed output
//! ```
//!
//! ## Checks Performed
//!
//! - CMake
//! - Build tool (ninja, make, gmake)
//! - patch and sh
//! - autotools bootstrap (autoreconf, libtoolize or glibtoolize), optional
//! - ldconfig, optional
//! - Linux distribution detection

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::core::platform::{host_arch, host_os, Distribution};
use crate::util::process::CommandRunner;

/// Result of a single health check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check
    pub name: String,

    /// Whether the check passed
    pub passed: bool,

    /// Human-readable status message
    pub message: String,

    /// Path to the tool (if applicable)
    pub path: Option<PathBuf>,

    /// How long the check took
    pub duration: Duration,

    /// Whether this check is required or optional
    pub required: bool,
}

impl CheckResult {
    /// Create a passing check result.
    pub fn pass(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: true,
            message: message.into(),
            path: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Create a failing check result.
    pub fn fail(name: impl Into<String>, message: impl Into<String>) -> Self {
        CheckResult {
            name: name.into(),
            passed: false,
            message: message.into(),
            path: None,
            duration: Duration::ZERO,
            required: true,
        }
    }

    /// Mark this check as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }
}

/// Summary of all health checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    /// Individual check results
    pub checks: Vec<CheckResult>,

    /// Total time taken
    pub total_duration: Duration,

    /// Environment information
    pub environment: BTreeMap<String, String>,
}

impl DoctorReport {
    pub fn new() -> Self {
        DoctorReport::default()
    }

    pub fn add(&mut self, check: CheckResult) {
        self.checks.push(check);
    }

    /// Check if all required checks passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }

    pub fn passed_count(&self) -> usize {
        self.checks.iter().filter(|c| c.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.checks.iter().filter(|c| !c.passed).count()
    }

    pub fn required_failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.required && !c.passed)
            .count()
    }
}

/// Run every check, looking tools up through `runner`.
pub fn doctor(runner: &dyn CommandRunner) -> DoctorReport {
    let start = Instant::now();
    let mut report = DoctorReport::new();

    let os = host_os();
    report.environment.insert("os".to_string(), os.to_string());
    report
        .environment
        .insert("arch".to_string(), host_arch().to_string());

    report.add(check_tool(runner, "CMake", &["cmake"], "required for CMake recipes"));
    report.add(check_tool(
        runner,
        "Build Tool",
        &["ninja", "make", "gmake"],
        "install ninja or make",
    ));
    report.add(check_tool(runner, "patch", &["patch"], "required to apply source patches"));
    report.add(check_tool(runner, "sh", &["sh"], "required for autogen.sh"));

    let libtoolize = if os == "macosx" { "glibtoolize" } else { "libtoolize" };
    report.add(
        check_tool(runner, "autoreconf", &["autoreconf"], "needed by libev and cpuid").optional(),
    );
    report.add(check_tool(runner, "libtoolize", &[libtoolize], "needed by cpuid").optional());
    report.add(
        check_tool(runner, "ldconfig", &["ldconfig"], "linker cache is not refreshed").optional(),
    );

    if os == "linux" {
        let check = match Distribution::detect() {
            Ok(distribution) => {
                report
                    .environment
                    .insert("distribution".to_string(), distribution.to_string());
                CheckResult::pass("Distribution", format!("Detected {}", distribution))
            }
            Err(e) => CheckResult::fail(
                "Distribution",
                format!("{} (set [platform] distribution in config)", e),
            ),
        };
        report.add(check);
    }

    report.total_duration = start.elapsed();
    report
}

/// Pass when the first of `candidates` is found.
fn check_tool(
    runner: &dyn CommandRunner,
    name: &str,
    candidates: &[&str],
    hint: &str,
) -> CheckResult {
    let start = Instant::now();

    for candidate in candidates {
        if let Some(path) = runner.find_program(candidate) {
            return CheckResult::pass(name, format!("Found {}", candidate))
                .with_path(path)
                .with_duration(start.elapsed());
        }
    }

    CheckResult::fail(
        name,
        format!("Not found (tried {}): {}", candidates.join(", "), hint),
    )
    .with_duration(start.elapsed())
}

/// Format the doctor report for display.
pub fn format_report(report: &DoctorReport, verbose: bool) -> String {
    use std::fmt::Write;

    let mut output = String::new();

    let _ = writeln!(output, "depforge doctor");
    let _ = writeln!(output, "===============\n");

    if verbose {
        let unknown = "unknown".to_string();
        let _ = writeln!(output, "Environment:");
        let _ = writeln!(
            output,
            "  OS: {} ({})",
            report.environment.get("os").unwrap_or(&unknown),
            report.environment.get("arch").unwrap_or(&unknown)
        );
        if let Some(distribution) = report.environment.get("distribution") {
            let _ = writeln!(output, "  Distribution: {}", distribution);
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output, "Checks:");
    for check in &report.checks {
        let status = if check.passed { "[OK]" } else { "[!!]" };
        let required = if check.required { "" } else { " (optional)" };

        let _ = writeln!(output, "  {} {}{}", status, check.name, required);

        if verbose || !check.passed {
            let _ = writeln!(output, "      {}", check.message);
        }
        if verbose {
            if let Some(path) = &check.path {
                let _ = writeln!(output, "      Path: {}", path.display());
            }
        }
    }

    let _ = writeln!(output);

    let passed = report.passed_count();
    let failed = report.failed_count();
    let required_failed = report.required_failed_count();

    let _ = writeln!(output, "Summary: {} passed, {} failed", passed, failed);

    if required_failed > 0 {
        let _ = writeln!(
            output,
            "\nWarning: {} required check(s) failed. Some recipes will not build.",
            required_failed
        );
    } else if failed > 0 {
        let _ = writeln!(
            output,
            "\nAll required checks passed. {} optional check(s) failed.",
            failed
        );
    } else {
        let _ = writeln!(output, "\nAll checks passed.");
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingRunner;

    #[test]
    fn test_check_result_optional() {
        let result = CheckResult::pass("test", "passed").optional();
        assert!(result.passed);
        assert!(!result.required);
    }

    #[test]
    fn test_doctor_report_optional_failed() {
        let mut report = DoctorReport::new();
        report.add(CheckResult::pass("required", "ok"));
        report.add(CheckResult::fail("optional", "missing").optional());

        assert!(report.all_required_passed());
        assert_eq!(report.passed_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.required_failed_count(), 0);
    }

    #[test]
    fn test_build_tool_falls_back_to_make() {
        let runner = RecordingRunner::new().with_program("make", "/usr/bin/make");

        let check = check_tool(&runner, "Build Tool", &["ninja", "make", "gmake"], "");

        assert!(check.passed);
        assert_eq!(check.path, Some(PathBuf::from("/usr/bin/make")));
        assert_eq!(check.message, "Found make");
    }

    #[test]
    fn test_missing_tools_fail_required_checks() {
        let runner = RecordingRunner::new();

        let report = doctor(&runner);

        assert!(!report.all_required_passed());
        let cmake = report.checks.iter().find(|c| c.name == "CMake").unwrap();
        assert!(!cmake.passed && cmake.required);
        let ldconfig = report.checks.iter().find(|c| c.name == "ldconfig").unwrap();
        assert!(!ldconfig.required);
    }

    #[test]
    fn test_all_tools_present() {
        let mut runner = RecordingRunner::new();
        for tool in ["cmake", "ninja", "patch", "sh"] {
            runner = runner.with_program(tool, format!("/usr/bin/{}", tool));
        }

        let report = doctor(&runner);

        let required: Vec<_> = report
            .checks
            .iter()
            .filter(|c| c.required && c.name != "Distribution")
            .collect();
        assert!(required.iter().all(|c| c.passed));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_format_report() {
        let mut report = DoctorReport::new();
        report.add(CheckResult::pass("CMake", "Found cmake").with_path(PathBuf::from("/usr/bin/cmake")));
        report.add(CheckResult::fail("ldconfig", "Not found").optional());

        let quiet = format_report(&report, false);
        assert!(quiet.contains("[OK] CMake"));
        assert!(quiet.contains("[!!] ldconfig (optional)"));
        assert!(!quiet.contains("/usr/bin/cmake"));
        assert!(quiet.contains("1 optional check(s) failed"));

        let verbose = format_report(&report, true);
        assert!(verbose.contains("Path: /usr/bin/cmake"));
    }
}
