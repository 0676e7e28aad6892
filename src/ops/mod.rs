//! High-level operations.
//!
//! This module contains the build session behind `depforge build` and the
//! host checks behind `depforge doctor`.

pub mod doctor;
pub mod request;

pub use doctor::{doctor, format_report, CheckResult, DoctorReport};
pub use request::{BuildRequest, BuildRequestOptions, Recipe};
