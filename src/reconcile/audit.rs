//! Audit mode
//!
//! Compares the quota policy against a usage snapshot and reports every
//! discrepancy without mutating anything.

use serde::Serialize;
use std::path::Path;

use crate::backend::QuotaSample;
use crate::config::Settings;
use crate::error::ServiceError;

use super::walk::{VolumeFolder, volume_folders};

/// Usage may exceed the configured quota by this factor before the audit
/// reports an overage.
pub const OVERAGE_TOLERANCE: f64 = 1.1;

/// Classification of an audit finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    RootVolumeMissing,
    QuotaAbsent,
    QuotaMismatch,
    Overage,
}

/// One audit finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    pub path: String,
    pub message: String,
    pub kind: ProblemKind,
}

/// Walk every root volume and diff policy against the usage snapshot.
///
/// The snapshot is taken once by the caller, so findings may lag mutations
/// still sitting in the queue; the next audit pass picks those up.
pub fn audit_volumes(
    settings: &Settings,
    samples: &[QuotaSample],
) -> Result<Vec<Problem>, ServiceError> {
    let mut problems = Vec::new();

    for (name, volume) in &settings.root_volumes {
        let root = volume.root_path();
        if !root.is_dir() {
            problems.push(Problem {
                path: volume.path.clone(),
                message: format!("Could not find '{}'", name),
                kind: ProblemKind::RootVolumeMissing,
            });
            continue;
        }

        for folder in volume_folders(root)? {
            let sample = samples.iter().find(|s| {
                s.root_volume == *name && Path::new(&s.relative_path) == folder.relative
            });
            match folder.depth {
                1 => check_folder(
                    volume.per_user_quota,
                    "No user-id level quota found",
                    &folder,
                    sample,
                    &mut problems,
                ),
                2 => check_folder(
                    volume.per_volume_quota,
                    "No volume level quota found",
                    &folder,
                    sample,
                    &mut problems,
                ),
                _ => {}
            }
        }
    }

    Ok(problems)
}

fn check_folder(
    expected: u64,
    absent_message: &str,
    folder: &VolumeFolder,
    sample: Option<&QuotaSample>,
    problems: &mut Vec<Problem>,
) {
    let existing_quota = sample.map(|s| s.bytes_quota).unwrap_or(0);

    if expected > 0 && sample.is_none() {
        problems.push(Problem {
            path: folder.path.display().to_string(),
            message: absent_message.to_string(),
            kind: ProblemKind::QuotaAbsent,
        });
    } else if expected != existing_quota {
        problems.push(Problem {
            path: folder.path.display().to_string(),
            message: format!(
                "Expect a quota of {} bytes, but the quota is set to {} bytes",
                expected, existing_quota
            ),
            kind: ProblemKind::QuotaMismatch,
        });
    }

    // Usage is only known for folders that have a quota set, so it
    // defaults to zero here.
    let bytes_used = sample.map(|s| s.bytes_used).unwrap_or(0);
    if bytes_used as f64 > OVERAGE_TOLERANCE * expected as f64 {
        problems.push(Problem {
            path: folder.path.display().to_string(),
            message: format!(
                "A quota of {} bytes is exceeded by over 10%. {} bytes are in use.",
                expected, bytes_used
            ),
            kind: ProblemKind::Overage,
        });
    }
}
